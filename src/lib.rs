//! Client core of a room-rental marketplace: the listing-creation wizard and
//! the listings browse pipeline, over pluggable backend clients.

pub mod clients;
pub mod config;
pub mod detail;
pub mod error;
pub mod favorites;
pub mod listings;
pub mod models;
pub mod owner;
pub mod session;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, PipelineConfig, WizardConfig};
pub use detail::ListingDetail;
pub use error::{Error, Result, SourceFailure};
pub use favorites::Favorites;
pub use listings::{ListingFilters, ListingsQuery};
pub use models::{ListingDraft, ListingRecord};
pub use owner::MyListings;
pub use session::Session;
pub use wizard::{ListingWizard, WizardClients};
