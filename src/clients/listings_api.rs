use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::traits::ListingsApi;
use crate::clients::types::ApiQuery;
use crate::error::{Error, Result};
use crate::models::ListingRecord;

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    success: bool,
    #[serde(default)]
    listings: Vec<ListingRecord>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the companion REST API (`GET /api/listings`)
pub struct HttpListingsApi {
    client: Client,
    base_url: String,
}

impl HttpListingsApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coloc-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ListingsApi for HttpListingsApi {
    async fn list(&self, query: &ApiQuery, bearer: Option<&str>) -> Result<Vec<ListingRecord>> {
        let url = format!("{}/api/listings", self.base_url);
        debug!(url = %url, page = query.page, limit = query.limit, "Requesting listings page");

        let mut request = self
            .client
            .get(&url)
            .query(&[("page", query.page), ("limit", query.limit)])
            .query(&query.params);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Listings API returned status: {}", status);
            return Err(Error::Network(format!("listings API returned {}", status)));
        }

        parse_listings(&response.text().await?)
    }
}

fn parse_listings(body: &str) -> Result<Vec<ListingRecord>> {
    let parsed: ListingsResponse = serde_json::from_str(body)?;
    if !parsed.success {
        return Err(Error::Network(
            parsed
                .error
                .unwrap_or_else(|| "listings API reported failure".to_string()),
        ));
    }
    Ok(parsed.listings)
}
