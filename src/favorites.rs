//! Favorite listings, stored as an id list on the user's profile

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::clients::RecordStore;
use crate::error::{Error, Result};
use crate::models::{ListingRecord, LISTINGS, USERS};
use crate::session::Session;

pub struct Favorites {
    session: Session,
    store: Arc<dyn RecordStore>,
}

impl Favorites {
    pub fn new(session: Session, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }

    pub async fn ids(&self) -> Result<Vec<String>> {
        let user = self.session.require_user()?;
        let profile = self.store.get(USERS, &user.id).await?;
        Ok(profile
            .data
            .get("favorites")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn is_favorite(&self, listing_id: &str) -> Result<bool> {
        Ok(self.ids().await?.iter().any(|id| id == listing_id))
    }

    /// Add or remove a listing; returns whether it is a favorite afterwards
    pub async fn toggle(&self, listing_id: &str) -> Result<bool> {
        let mut ids = self.ids().await?;
        let now_favorite = match ids.iter().position(|id| id == listing_id) {
            Some(index) => {
                ids.remove(index);
                false
            }
            None => {
                ids.push(listing_id.to_string());
                true
            }
        };

        let user = self.session.require_user()?;
        self.store
            .update(USERS, &user.id, json!({ "favorites": ids }))
            .await?;
        debug!(listing_id, now_favorite, "Favorite toggled");
        Ok(now_favorite)
    }

    /// Favorite listings in the order they were added; deleted ones are skipped
    pub async fn listings(&self) -> Result<Vec<ListingRecord>> {
        let mut listings = Vec::new();
        for id in self.ids().await? {
            match self.store.get(LISTINGS, &id).await {
                Ok(doc) => listings.push(doc.into_typed()?),
                Err(Error::NotFound { .. }) => debug!(listing_id = %id, "Favorite no longer exists"),
                Err(e) => return Err(e),
            }
        }
        Ok(listings)
    }
}
