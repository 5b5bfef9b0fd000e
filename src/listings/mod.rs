//! Browsing published listings

pub mod cache;
pub mod filters;
pub mod pipeline;
pub mod sources;

pub use cache::ListingsCache;
pub use filters::{matches_search, Bounds, Furnished, ListingFilters};
pub use pipeline::{ListingsQuery, ListingsSnapshot, MapMarker};
pub use sources::{ListingSource, PageRequest, RemoteApiSource, SourceChain, SourcePage, StoreFallbackSource};
