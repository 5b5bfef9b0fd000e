use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::traits::PlaceAutocomplete;
use crate::clients::types::{Prediction, ResolvedAddress};
use crate::error::{Error, Result};
use crate::models::Coordinates;

const PLACES_BASE: &str = "https://maps.googleapis.com/maps/api/place";

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

/// Google Places autocomplete + details
pub struct GooglePlaces {
    client: Client,
    api_key: String,
}

impl GooglePlaces {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

fn check_status(status: &str, error_message: Option<String>) -> Result<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => {
            warn!(status = other, "Places API error");
            Err(Error::Network(
                error_message.unwrap_or_else(|| format!("places API status {}", other)),
            ))
        }
    }
}

/// Map address components onto the listing's location fields
pub(crate) fn resolve_components(
    components: &[AddressComponent],
    coordinates: Option<Coordinates>,
) -> ResolvedAddress {
    let find = |kind: &str| {
        components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
            .unwrap_or_default()
    };

    let number = find("street_number");
    let route = find("route");
    let street = match (number.is_empty(), route.is_empty()) {
        (false, false) => format!("{} {}", number, route),
        (true, _) => route,
        (false, true) => number,
    };
    let city = match find("locality") {
        city if city.is_empty() => find("postal_town"),
        city => city,
    };

    ResolvedAddress {
        street,
        postal_code: find("postal_code"),
        city,
        country: find("country"),
        coordinates,
    }
}

#[async_trait]
impl PlaceAutocomplete for GooglePlaces {
    async fn autocomplete(&self, text: &str, country: &str) -> Result<Vec<Prediction>> {
        debug!(text, "Address autocomplete");
        let response: AutocompleteResponse = self
            .client
            .get(format!("{}/autocomplete/json", PLACES_BASE))
            .query(&[
                ("input", text.to_string()),
                ("components", format!("country:{}", country)),
                ("types", "address".to_string()),
                ("language", "fr".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .json()
            .await?;

        check_status(&response.status, response.error_message)?;
        Ok(response.predictions)
    }

    async fn details(&self, place_id: &str) -> Result<ResolvedAddress> {
        let response: DetailsResponse = self
            .client
            .get(format!("{}/details/json", PLACES_BASE))
            .query(&[
                ("place_id", place_id),
                ("fields", "address_component,geometry"),
                ("language", "fr"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        check_status(&response.status, response.error_message)?;
        let result = response
            .result
            .ok_or_else(|| Error::not_found("places", place_id))?;

        Ok(resolve_components(
            &result.address_components,
            result.geometry.map(|g| g.location),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(json: &str) -> Vec<AddressComponent> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn maps_full_street_address() {
        let parts = components(
            r#"[
                { "long_name": "12", "types": ["street_number"] },
                { "long_name": "Avenue Jean Médecin", "types": ["route"] },
                { "long_name": "Nice", "types": ["locality", "political"] },
                { "long_name": "06000", "types": ["postal_code"] },
                { "long_name": "France", "types": ["country", "political"] }
            ]"#,
        );

        let address = resolve_components(&parts, Some(Coordinates { lat: 43.7, lng: 7.27 }));
        assert_eq!(address.street, "12 Avenue Jean Médecin");
        assert_eq!(address.postal_code, "06000");
        assert_eq!(address.city, "Nice");
        assert_eq!(address.country, "France");
        assert!(address.coordinates.is_some());
    }

    #[test]
    fn route_only_and_postal_town_fallback() {
        let parts = components(
            r#"[
                { "long_name": "High Street", "types": ["route"] },
                { "long_name": "Oxford", "types": ["postal_town"] }
            ]"#,
        );

        let address = resolve_components(&parts, None);
        assert_eq!(address.street, "High Street");
        assert_eq!(address.city, "Oxford");
        assert_eq!(address.postal_code, "");
    }

    #[test]
    fn status_handling() {
        assert!(check_status("ZERO_RESULTS", None).is_ok());
        assert!(matches!(
            check_status("REQUEST_DENIED", Some("bad key".into())),
            Err(Error::Network(msg)) if msg == "bad key"
        ));
    }
}
