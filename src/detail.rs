//! A single listing opened from the browse list, and abuse reports against it

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clients::RecordStore;
use crate::error::{Error, Result};
use crate::models::{ListingRecord, ListingStatus, LISTINGS, USERS};
use crate::session::Session;

pub const DEFAULT_REPORT_REASON: &str = "Contenu inapproprié";

/// One entry of a listing's `reports` array
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingReport {
    pub user_id: String,
    pub user_name: String,
    pub reason: String,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ListingView {
    pub listing: ListingRecord,
    /// The signed-in viewer already reported this listing
    pub reported: bool,
}

pub struct ListingDetail {
    session: Session,
    store: Arc<dyn RecordStore>,
}

fn reports_of(data: &Value) -> Vec<Value> {
    data.get("reports")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn reported_by(reports: &[Value], user_id: &str) -> bool {
    reports
        .iter()
        .any(|r| r.get("userId").and_then(Value::as_str) == Some(user_id))
}

impl ListingDetail {
    pub fn new(session: Session, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }

    /// Missing listings fail with `NotFound`. Blocked ones fail with
    /// `Unavailable` unless the viewer owns the listing or is an admin.
    pub async fn load(&self, listing_id: &str) -> Result<ListingView> {
        let doc = self.store.get(LISTINGS, listing_id).await?;
        let reports = reports_of(&doc.data);
        let listing: ListingRecord = doc.into_typed()?;

        if listing.status == ListingStatus::Blocked && !self.may_see_blocked(&listing).await? {
            debug!(listing_id, "Blocked listing hidden from viewer");
            return Err(Error::Unavailable);
        }

        let reported = self
            .session
            .user()
            .map(|u| reported_by(&reports, &u.id))
            .unwrap_or(false);
        Ok(ListingView { listing, reported })
    }

    /// Append a report from the signed-in user; each user reports a listing once
    pub async fn report(&self, listing_id: &str, reason: &str) -> Result<()> {
        let user = self.session.require_user()?;
        let doc = self.store.get(LISTINGS, listing_id).await?;

        let mut reports = reports_of(&doc.data);
        if reported_by(&reports, &user.id) {
            return Err(Error::AlreadyReported);
        }

        let user_name = user
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.email.clone());
        let report = ListingReport {
            user_id: user.id.clone(),
            user_name,
            reason: reason.to_string(),
            reported_at: Utc::now(),
        };
        reports.push(serde_json::to_value(&report)?);
        let count = reports.len();

        self.store
            .update(LISTINGS, listing_id, json!({ "reports": reports }))
            .await?;
        info!(listing_id, reports = count, "Listing reported");
        Ok(())
    }

    async fn may_see_blocked(&self, listing: &ListingRecord) -> Result<bool> {
        let Some(user) = self.session.user() else {
            return Ok(false);
        };
        if listing.metadata.user_id == user.id {
            return Ok(true);
        }
        match self.store.get(USERS, &user.id).await {
            Ok(profile) => Ok(profile
                .data
                .get("isAdmin")
                .and_then(Value::as_bool)
                .unwrap_or(false)),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
