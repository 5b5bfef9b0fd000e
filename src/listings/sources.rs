//! Ordered data-source strategies for listing pages
//!
//! The remote API is tried first under a timeout; when it fails the record
//! store is queried directly and the filters are applied client-side.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clients::{ApiQuery, ListingsApi, Order, Predicate, RecordStore};
use crate::error::{Error, Result, SourceFailure};
use crate::listings::filters::ListingFilters;
use crate::models::{ListingRecord, LISTINGS};

/// One page requested by the pipeline
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub filters: &'a ListingFilters,
    pub bearer: Option<&'a str>,
}

/// What a source produced for a page request
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
    pub records: Vec<ListingRecord>,
    /// The source returned a full page, so more may follow
    pub full: bool,
}

/// A place listing pages can be fetched from
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<SourcePage>;

    /// Name used in logs and failure reports
    fn source_name(&self) -> &'static str;
}

/// Primary path: the companion REST API, filters pushed down
pub struct RemoteApiSource {
    api: Arc<dyn ListingsApi>,
    timeout: Duration,
}

impl RemoteApiSource {
    pub fn new(api: Arc<dyn ListingsApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }
}

#[async_trait]
impl ListingSource for RemoteApiSource {
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<SourcePage> {
        let query = ApiQuery {
            page: request.page,
            limit: request.page_size,
            params: request.filters.query_params(),
        };

        let records = tokio::time::timeout(self.timeout, self.api.list(&query, request.bearer))
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let full = records.len() >= request.page_size as usize;
        Ok(SourcePage { records, full })
    }

    fn source_name(&self) -> &'static str {
        "remote-api"
    }
}

/// Fallback path: query the record store for published listings.
///
/// The store cannot filter on ranges or service subsets, so it returns the
/// newest `page × page_size` published records and filters them here.
pub struct StoreFallbackSource {
    store: Arc<dyn RecordStore>,
}

impl StoreFallbackSource {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ListingSource for StoreFallbackSource {
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<SourcePage> {
        let limit = request.page as usize * request.page_size as usize;
        let predicates = [
            Predicate::equals("status", "active"),
            Predicate::equals("isVisible", true),
        ];
        let docs = self
            .store
            .query(
                LISTINGS,
                &predicates,
                Some(&Order::desc("metadata.createdAt")),
                Some(limit),
            )
            .await?;

        let fetched = docs.len();
        let records: Vec<ListingRecord> = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match doc.into_typed::<ListingRecord>() {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(listing_id = %id, "Skipping malformed listing: {}", e);
                        None
                    }
                }
            })
            .filter(|record| request.filters.matches(record))
            .collect();

        debug!(fetched, kept = records.len(), "Fallback query filtered client-side");
        Ok(SourcePage {
            records,
            full: fetched >= limit,
        })
    }

    fn source_name(&self) -> &'static str {
        "record-store"
    }
}

/// Sources tried in order until one answers
#[derive(Clone, Default)]
pub struct SourceChain {
    sources: Vec<Arc<dyn ListingSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn ListingSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Remote API first, record store second
    pub fn standard(api: Arc<dyn ListingsApi>, store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self::new()
            .with(Arc::new(RemoteApiSource::new(api, timeout)))
            .with(Arc::new(StoreFallbackSource::new(store)))
    }

    /// Remote API alone, for callers with no direct record-store access
    pub fn remote_only(api: Arc<dyn ListingsApi>, timeout: Duration) -> Self {
        Self::new().with(Arc::new(RemoteApiSource::new(api, timeout)))
    }

    /// Returns the answering source's name with its page, or every failure
    pub async fn fetch(&self, request: &PageRequest<'_>) -> Result<(&'static str, SourcePage)> {
        let mut failures = Vec::new();

        for source in &self.sources {
            match source.fetch(request).await {
                Ok(page) => {
                    if !failures.is_empty() {
                        info!(
                            source = source.source_name(),
                            page = request.page,
                            "Served listings from fallback source"
                        );
                    }
                    return Ok((source.source_name(), page));
                }
                Err(e) => {
                    warn!(source = source.source_name(), page = request.page, "Listing source failed: {}", e);
                    failures.push(SourceFailure {
                        source: source.source_name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(Error::AllSourcesFailed(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryStore;
    use crate::listings::filters::Bounds;
    use crate::models::ListingStatus;
    use crate::testing::{listing_record, FakeApi};
    use serde_json::json;

    fn request(filters: &ListingFilters, page: u32) -> PageRequest<'_> {
        PageRequest {
            page,
            page_size: 2,
            filters,
            bearer: None,
        }
    }

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for i in 1..=5 {
            let mut record = listing_record(&format!("l{}", i), i);
            record.details.rent = 100.0 * i as f64;
            store.insert(LISTINGS, &record.id, serde_json::to_value(&record).unwrap());
        }
        let mut pending = listing_record("pending", 10);
        pending.status = ListingStatus::Pending;
        store.insert(LISTINGS, "pending", serde_json::to_value(&pending).unwrap());
        let mut hidden = listing_record("hidden", 11);
        hidden.is_visible = false;
        store.insert(LISTINGS, "hidden", serde_json::to_value(&hidden).unwrap());
        store.insert(LISTINGS, "broken", json!({ "status": "active", "isVisible": true }));
        store
    }

    #[tokio::test]
    async fn fallback_returns_newest_published_prefix() {
        let source = StoreFallbackSource::new(seeded_store());
        let filters = ListingFilters::default();

        let page = source.fetch(&request(&filters, 2)).await.unwrap();
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        // "broken" sorts last (no createdAt) and falls outside the limit
        assert_eq!(ids, vec!["l5", "l4", "l3", "l2"]);
        assert!(page.full);
    }

    #[tokio::test]
    async fn fallback_applies_filters_client_side() {
        let source = StoreFallbackSource::new(seeded_store());
        let filters = ListingFilters {
            price: Bounds::between(0.0, 250.0),
            ..Default::default()
        };

        let page = source.fetch(&request(&filters, 5)).await.unwrap();
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["l2", "l1"]);
        assert!(!page.full);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_api_times_out_and_chain_falls_back() {
        let api = Arc::new(FakeApi::new(vec![listing_record("api", 1)]).with_delay(Duration::from_secs(30)));
        let chain = SourceChain::standard(api.clone(), seeded_store(), Duration::from_secs(5));
        let filters = ListingFilters::default();

        let (source, page) = chain.fetch(&request(&filters, 1)).await.unwrap();
        assert_eq!(source, "record-store");
        assert_eq!(page.records[0].id, "l5");
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn api_answer_wins_when_available() {
        let api = Arc::new(FakeApi::new(vec![listing_record("a", 2), listing_record("b", 1)]));
        let chain = SourceChain::standard(api, seeded_store(), Duration::from_secs(5));
        let filters = ListingFilters::default();

        let (source, page) = chain.fetch(&request(&filters, 1)).await.unwrap();
        assert_eq!(source, "remote-api");
        assert_eq!(page.records.len(), 2);
        assert!(page.full);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_failure() {
        let chain = SourceChain::new().with(Arc::new(RemoteApiSource::new(
            Arc::new(FakeApi::new(Vec::new()).failing()),
            Duration::from_secs(5),
        )));
        let filters = ListingFilters::default();

        match chain.fetch(&request(&filters, 1)).await {
            Err(Error::AllSourcesFailed(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].source, "remote-api");
            }
            other => panic!("expected AllSourcesFailed, got {:?}", other.map(|(s, _)| s)),
        }
    }
}
