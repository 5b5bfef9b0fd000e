//! The signed-in user's own listings

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{Order, Predicate, RecordStore};
use crate::error::{Error, Result};
use crate::models::{ListingRecord, LISTINGS};
use crate::session::Session;

pub struct MyListings {
    session: Session,
    store: Arc<dyn RecordStore>,
}

impl MyListings {
    pub fn new(session: Session, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }

    /// Every listing the user authored, whatever its moderation status, newest first
    pub async fn list(&self) -> Result<Vec<ListingRecord>> {
        let user = self.session.require_user()?;
        let docs = self
            .store
            .query(
                LISTINGS,
                &[Predicate::equals("metadata.userId", user.id.as_str())],
                Some(&Order::desc("metadata.createdAt")),
                None,
            )
            .await?;

        let mut listings = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.id.clone();
            match doc.into_typed() {
                Ok(record) => listings.push(record),
                Err(e) => warn!(listing_id = %id, "Skipping malformed listing: {}", e),
            }
        }
        Ok(listings)
    }

    pub async fn delete(&self, listing_id: &str) -> Result<()> {
        self.owned(listing_id).await?;
        self.store.delete(LISTINGS, listing_id).await?;
        info!(listing_id, "Listing deleted by its owner");
        Ok(())
    }

    /// Hide a listing from browsing without deleting it, or show it again
    pub async fn set_visibility(&self, listing_id: &str, visible: bool) -> Result<()> {
        self.owned(listing_id).await?;
        self.store
            .update(LISTINGS, listing_id, json!({ "isVisible": visible }))
            .await?;
        info!(listing_id, visible, "Listing visibility changed");
        Ok(())
    }

    async fn owned(&self, listing_id: &str) -> Result<ListingRecord> {
        let user = self.session.require_user()?;
        let record: ListingRecord = self.store.get(LISTINGS, listing_id).await?.into_typed()?;
        if !record.is_owned_by(&user.id) {
            return Err(Error::Forbidden(format!(
                "listing {} belongs to another user",
                listing_id
            )));
        }
        Ok(record)
    }
}
