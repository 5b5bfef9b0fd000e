use async_trait::async_trait;
use serde_json::Value;

use crate::clients::types::{
    ApiQuery, AuthUser, Document, Order, Predicate, Prediction, ResolvedAddress, SignUpFields,
};
use crate::error::Result;
use crate::models::{ListingRecord, MediaRef};

/// Authentication provider (sign-in, session, token issuance)
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_up(&self, fields: &SignUpFields) -> Result<AuthUser>;

    async fn current_user(&self) -> Option<AuthUser>;

    /// Bearer token for the signed-in user, `None` when anonymous
    async fn get_token(&self) -> Result<Option<String>>;

    async fn sign_out(&self) -> Result<()>;
}

/// Document database holding listings and user profiles
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with `Error::NotFound` when the document does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Document>;

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
        order: Option<&Order>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// Returns the id of the new document
    async fn create(&self, collection: &str, data: Value) -> Result<String>;

    /// Merge `patch` into the document; keys may be dotted paths
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Companion REST API serving pre-filtered listing pages
#[async_trait]
pub trait ListingsApi: Send + Sync {
    async fn list(&self, query: &ApiQuery, bearer: Option<&str>) -> Result<Vec<ListingRecord>>;
}

/// Image host; turns a local photo into a durable URL
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, media: &MediaRef) -> Result<String>;
}

#[async_trait]
pub trait PlaceAutocomplete: Send + Sync {
    async fn autocomplete(&self, text: &str, country: &str) -> Result<Vec<Prediction>>;

    async fn details(&self, place_id: &str) -> Result<ResolvedAddress>;
}

/// Small persisted string store backing the listings cache
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}
