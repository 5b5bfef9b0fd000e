pub mod draft;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use draft::{ListingDraft, MediaRef};

/// Collection holding listing records
pub const LISTINGS: &str = "listings";
/// Collection holding user profiles (verification flag, favorites)
pub const USERS: &str = "users";

/// Moderation status of a listing record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Pending,
    Active,
    Blocked,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Studio,
}

impl PropertyType {
    pub const ALL: [PropertyType; 3] = [
        PropertyType::Apartment,
        PropertyType::House,
        PropertyType::Studio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Studio => "studio",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apartment" | "appartement" => Ok(PropertyType::Apartment),
            "house" | "maison" => Ok(PropertyType::House),
            "studio" => Ok(PropertyType::Studio),
            other => Err(format!("unknown property type: {}", other)),
        }
    }
}

/// The fixed set of amenities a listing can advertise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Service {
    Wifi,
    HandicapAccess,
    Kitchenware,
    Microwave,
    Laundry,
    BikeParking,
    Linens,
    WashingMachine,
    Tv,
    DoubleBed,
    Elevator,
    Parking,
}

impl Service {
    pub const ALL: [Service; 12] = [
        Service::Wifi,
        Service::HandicapAccess,
        Service::Kitchenware,
        Service::Microwave,
        Service::Laundry,
        Service::BikeParking,
        Service::Linens,
        Service::WashingMachine,
        Service::Tv,
        Service::DoubleBed,
        Service::Elevator,
        Service::Parking,
    ];

    /// Key used on the wire and in query strings
    pub fn key(&self) -> &'static str {
        match self {
            Service::Wifi => "wifi",
            Service::HandicapAccess => "handicapAccess",
            Service::Kitchenware => "kitchenware",
            Service::Microwave => "microwave",
            Service::Laundry => "laundry",
            Service::BikeParking => "bikeParking",
            Service::Linens => "linens",
            Service::WashingMachine => "washingMachine",
            Service::Tv => "tv",
            Service::DoubleBed => "doubleBed",
            Service::Elevator => "elevator",
            Service::Parking => "parking",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Service::Wifi => "Wifi inclus",
            Service::HandicapAccess => "Accès handicapé",
            Service::Kitchenware => "Kit vaisselle",
            Service::Microwave => "Four micro-ondes",
            Service::Laundry => "Laverie",
            Service::BikeParking => "Parking vélo",
            Service::Linens => "Linge fourni",
            Service::WashingMachine => "Lave-linge",
            Service::Tv => "TV",
            Service::DoubleBed => "Lit double",
            Service::Elevator => "Ascenseur",
            Service::Parking => "Parking",
        }
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::ALL
            .iter()
            .copied()
            .find(|service| service.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown service: {}", s))
    }
}

/// Service flags of a listing; a key missing from a stored record reads as `false`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Services(BTreeMap<Service, bool>);

impl<'de> Deserialize<'de> for Services {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Unknown keys and non-boolean values are dropped rather than rejecting the record
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut services = Services::default();
        for (key, value) in raw {
            if let (Ok(service), Some(enabled)) = (key.parse::<Service>(), value.as_bool()) {
                services.set(service, enabled);
            }
        }
        Ok(services)
    }
}

impl Default for Services {
    fn default() -> Self {
        Self(Service::ALL.iter().map(|s| (*s, false)).collect())
    }
}

impl Services {
    pub fn has(&self, service: Service) -> bool {
        self.0.get(&service).copied().unwrap_or(false)
    }

    pub fn set(&mut self, service: Service, enabled: bool) {
        self.0.insert(service, enabled);
    }

    pub fn enabled(&self) -> impl Iterator<Item = Service> + '_ {
        self.0.iter().filter(|(_, on)| **on).map(|(s, _)| *s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Finite and inside the WGS84 bounds; (0, 0) is treated as "never geocoded"
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
            && !(self.lat == 0.0 && self.lng == 0.0)
    }
}

/// Location information for a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Housing {
    pub total_roommates: i64,
    pub bathrooms: i64,
    pub private_area: f64,
    pub total_area: f64,
    pub rooms: i64,
    pub floor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Details {
    #[serde(deserialize_with = "lenient_property_type")]
    pub property_type: Option<PropertyType>,
    pub furnished: bool,
    pub available_date: String,
    pub rent: f64,
    pub title: String,
    pub description: String,
}

fn lenient_property_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<PropertyType>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, rename = "userPhotoURL")]
    pub user_photo_url: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Persisted listing document, owned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub housing: Housing,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub services: Services,
    #[serde(default)]
    pub contact: Contact,
    pub metadata: Metadata,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl ListingRecord {
    /// Whether browsing users may see this record
    pub fn is_published(&self) -> bool {
        self.status == ListingStatus::Active && self.is_visible
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.metadata.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_reads_camel_case_document() {
        let doc = json!({
            "location": { "street": "12 rue Masséna", "postalCode": "06000", "city": "Nice", "country": "France",
                          "coordinates": { "lat": 43.7, "lng": 7.26 } },
            "housing": { "totalRoommates": 3, "bathrooms": 1, "privateArea": 12, "totalArea": 70, "rooms": 4 },
            "details": { "propertyType": "apartment", "furnished": true, "availableDate": "2024-09-01",
                         "rent": 550.0, "title": "Chambre lumineuse", "description": "Proche tram" },
            "photos": ["https://res.cloudinary.com/colocation/a.jpg"],
            "services": { "wifi": true, "parking": false },
            "contact": { "contactName": "Léa", "contactPhone": "0600000000", "contactEmail": "lea@example.com" },
            "metadata": { "userId": "u1", "userName": "Léa", "userPhotoURL": null,
                          "createdAt": 1_700_000_000_000i64, "updatedAt": 1_700_000_000_000i64 },
            "status": "active",
            "isVisible": true
        });

        let record: ListingRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.location.city, "Nice");
        assert_eq!(record.housing.total_area, 70.0);
        assert_eq!(record.housing.floor, 0);
        assert_eq!(record.details.property_type, Some(PropertyType::Apartment));
        assert!(record.services.has(Service::Wifi));
        assert!(!record.services.has(Service::Elevator));
        assert!(record.is_published());
    }

    #[test]
    fn record_tolerates_legacy_free_text_fields() {
        let doc = json!({
            "details": { "propertyType": "", "title": "T2" },
            "services": { "wifi": true, "pool": true, "tv": "yes" },
            "metadata": { "userId": "u1", "createdAt": 0, "updatedAt": 0 }
        });

        let record: ListingRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.details.property_type, None);
        assert!(record.services.has(Service::Wifi));
        assert!(!record.services.has(Service::Tv));
        assert_eq!(record.status, ListingStatus::Pending);
        assert!(record.is_visible);
    }

    #[test]
    fn services_default_lists_all_twelve_keys_off() {
        let services = Services::default();
        let value = serde_json::to_value(&services).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 12);
        assert_eq!(map["washingMachine"], json!(false));
        assert_eq!(services.enabled().count(), 0);
    }

    #[test]
    fn coordinates_validity() {
        assert!(Coordinates { lat: 48.85, lng: 2.35 }.is_valid());
        assert!(!Coordinates { lat: 0.0, lng: 0.0 }.is_valid());
        assert!(!Coordinates { lat: 120.0, lng: 2.0 }.is_valid());
        assert!(!Coordinates { lat: f64::NAN, lng: 2.0 }.is_valid());
    }

    #[test]
    fn property_type_parses_french_and_english() {
        assert_eq!("Maison".parse::<PropertyType>(), Ok(PropertyType::House));
        assert_eq!(" studio ".parse::<PropertyType>(), Ok(PropertyType::Studio));
        assert!("loft".parse::<PropertyType>().is_err());
    }
}
