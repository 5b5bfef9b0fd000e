//! Page-1 snapshot persisted in the local key-value store

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::KeyValueStore;
use crate::error::Result;
use crate::models::ListingRecord;

pub const CACHE_KEY: &str = "listingsCache";
pub const CACHE_TIME_KEY: &str = "listingsCacheTime";

pub struct ListingsCache {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ListingsCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv: store, ttl }
    }

    /// Cached items if younger than the TTL. Unreadable or corrupt entries count as a miss.
    pub async fn load(&self) -> Option<Vec<ListingRecord>> {
        self.load_at(Utc::now().timestamp_millis()).await
    }

    pub async fn load_at(&self, now_millis: i64) -> Option<Vec<ListingRecord>> {
        let stamp = match self.kv.get(CACHE_TIME_KEY).await {
            Ok(Some(raw)) => raw.trim().parse::<i64>().ok()?,
            Ok(None) => return None,
            Err(e) => {
                warn!("Listings cache timestamp unreadable: {}", e);
                return None;
            }
        };

        let age = now_millis.saturating_sub(stamp);
        if age < 0 || age as u128 >= self.ttl.as_millis() {
            debug!(age_ms = age, "Listings cache expired");
            return None;
        }

        let raw = match self.kv.get(CACHE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Listings cache unreadable: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("Discarding corrupt listings cache: {}", e);
                None
            }
        }
    }

    pub async fn store(&self, items: &[ListingRecord]) -> Result<()> {
        self.store_at(items, Utc::now().timestamp_millis()).await
    }

    pub async fn store_at(&self, items: &[ListingRecord], now_millis: i64) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.kv.set(CACHE_KEY, &json).await?;
        self.kv.set(CACHE_TIME_KEY, &now_millis.to_string()).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(CACHE_KEY).await?;
        self.kv.remove(CACHE_TIME_KEY).await
    }
}
