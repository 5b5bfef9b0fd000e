//! Listings screen state: fetch, paginate, filter, search

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::listings::cache::ListingsCache;
use crate::listings::filters::{matches_search, ListingFilters};
use crate::listings::sources::{PageRequest, SourceChain, SourcePage};
use crate::models::{Coordinates, ListingRecord};
use crate::session::Session;

/// Where the current page-1 items came from
pub const FROM_CACHE: &str = "cache";

/// One pin on the map view
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: String,
    pub title: String,
    pub rent: f64,
    pub coordinates: Coordinates,
}

/// Read-only view of the query state
#[derive(Debug, Clone, PartialEq)]
pub struct ListingsSnapshot {
    pub items: Vec<ListingRecord>,
    pub page: u32,
    pub has_more: bool,
    pub filters: ListingFilters,
    pub search_query: String,
    pub loading: bool,
    pub error: Option<String>,
    pub source: Option<&'static str>,
}

#[derive(Default)]
struct QueryState {
    items: Vec<ListingRecord>,
    seen: HashSet<String>,
    page: u32,
    has_more: bool,
    filters: ListingFilters,
    search_query: String,
    loading: bool,
    error: Option<String>,
    source: Option<&'static str>,
    /// Bumped whenever a new pagination session starts (page-1 fetch)
    generation: u64,
}

impl QueryState {
    fn replace(&mut self, records: Vec<ListingRecord>) {
        self.items.clear();
        self.seen.clear();
        self.append(records);
    }

    /// Returns how many records were new
    fn append(&mut self, records: Vec<ListingRecord>) -> usize {
        let before = self.items.len();
        for record in records {
            if self.seen.insert(record.id.clone()) {
                self.items.push(record);
            }
        }
        self.items.len() - before
    }
}

/// Query pipeline bound to one listings screen
pub struct ListingsQuery {
    session: Session,
    sources: SourceChain,
    cache: ListingsCache,
    config: PipelineConfig,
    state: Mutex<QueryState>,
    alive: AtomicBool,
}

impl ListingsQuery {
    pub fn new(session: Session, sources: SourceChain, cache: ListingsCache, config: PipelineConfig) -> Self {
        Self {
            session,
            sources,
            cache,
            config,
            state: Mutex::new(QueryState {
                has_more: true,
                ..Default::default()
            }),
            alive: AtomicBool::new(true),
        }
    }

    /// Screen shown: serve a fresh cache if there is one, otherwise fetch page 1
    pub async fn mount(&self) -> Result<()> {
        self.fetch(1, false).await
    }

    /// Pull-to-refresh: always goes to the network
    pub async fn refresh(&self) -> Result<()> {
        self.fetch(1, true).await
    }

    /// Scroll reached the end. Returns `false` when nothing was requested
    /// because a fetch is pending or the last page was short.
    pub async fn load_more(&self) -> Result<bool> {
        let next = {
            let state = self.state.lock();
            if state.loading || !state.has_more || state.page == 0 {
                return Ok(false);
            }
            state.page + 1
        };
        self.fetch(next, false).await?;
        Ok(true)
    }

    /// New filters restart pagination and bypass the cache. If no source
    /// answers, the previous filters stay in effect alongside their items.
    pub async fn apply_filters(&self, filters: ListingFilters) -> Result<()> {
        let previous = std::mem::replace(&mut self.state.lock().filters, filters.clone());
        let result = self.fetch(1, true).await;
        if result.is_err() {
            let mut state = self.state.lock();
            if state.filters == filters {
                state.filters = previous;
            }
        }
        result
    }

    /// Narrow the loaded items; never triggers a fetch
    pub fn set_search(&self, query: &str) {
        self.state.lock().search_query = query.to_string();
    }

    /// Loaded items matching the search text, in fetch order
    pub fn visible(&self) -> Vec<ListingRecord> {
        let state = self.state.lock();
        state
            .items
            .iter()
            .filter(|r| matches_search(r, &state.search_query))
            .cloned()
            .collect()
    }

    /// Visible items that can be placed on the map
    pub fn map_markers(&self) -> Vec<MapMarker> {
        self.visible()
            .into_iter()
            .filter_map(|r| {
                let coordinates = r.location.coordinates.filter(|c| c.is_valid())?;
                Some(MapMarker {
                    id: r.id,
                    title: r.details.title,
                    rent: r.details.rent,
                    coordinates,
                })
            })
            .collect()
    }

    pub fn snapshot(&self) -> ListingsSnapshot {
        let state = self.state.lock();
        ListingsSnapshot {
            items: state.items.clone(),
            page: state.page,
            has_more: state.has_more,
            filters: state.filters.clone(),
            search_query: state.search_query.clone(),
            loading: state.loading,
            error: state.error.clone(),
            source: state.source,
        }
    }

    /// Screen left: in-flight fetches finish without touching state
    pub fn unmount(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn fetch(&self, page: u32, force: bool) -> Result<()> {
        let (generation, filters) = {
            let mut state = self.state.lock();
            if !self.is_alive() {
                return Err(Error::Closed);
            }
            if page == 1 {
                state.generation += 1;
            }
            state.loading = true;
            state.error = None;
            (state.generation, state.filters.clone())
        };

        let cacheable = page == 1 && filters.is_default();
        if cacheable && !force {
            if let Some(cached) = self.cache.load().await {
                info!(count = cached.len(), "Serving listings from cache");
                let page_size = self.config.page_size as usize;
                let has_more = cached.len() >= page_size;
                self.apply(generation, 1, FROM_CACHE, SourcePage { records: cached, full: has_more });
                return Ok(());
            }
            debug!("Listings cache miss");
        }

        let bearer = self.session.token().await;
        let request = PageRequest {
            page,
            page_size: self.config.page_size,
            filters: &filters,
            bearer: bearer.as_deref(),
        };

        match self.sources.fetch(&request).await {
            Ok((source, result)) => {
                let fresh = cacheable.then(|| result.records.clone());
                if self.apply(generation, page, source, result) {
                    if let Some(items) = fresh {
                        if let Err(e) = self.cache.store(&items).await {
                            warn!("Could not write listings cache: {}", e);
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.lock();
                if self.is_alive() && state.generation == generation {
                    state.loading = false;
                    state.error = Some(e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Merge a page into the state; returns `false` if the result was stale
    fn apply(&self, generation: u64, page: u32, source: &'static str, result: SourcePage) -> bool {
        let mut state = self.state.lock();
        if !self.is_alive() {
            debug!(page, "Listings screen gone; dropping fetched page");
            return false;
        }
        if state.generation != generation {
            debug!(page, generation, latest = state.generation, "Discarding stale listings page");
            return false;
        }

        let received = result.records.len();
        if page == 1 {
            state.replace(result.records);
        } else {
            let added = state.append(result.records);
            debug!(page, received, added, "Appended listings page");
        }
        state.page = page;
        state.has_more = result.full;
        state.loading = false;
        state.source = Some(source);
        true
    }
}
