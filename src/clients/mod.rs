pub mod cloudinary;
pub mod file_cache;
pub mod firebase_auth;
pub mod listings_api;
pub mod memory;
pub mod places;
pub mod traits;
pub mod types;

pub use cloudinary::CloudinaryUploader;
pub use file_cache::FileKvStore;
pub use firebase_auth::FirebaseAuth;
pub use listings_api::HttpListingsApi;
pub use memory::{InMemoryStore, MemoryKvStore};
pub use places::GooglePlaces;
pub use traits::{
    AuthClient, KeyValueStore, ListingsApi, MediaUploader, PlaceAutocomplete, RecordStore,
};
pub use types::{
    ApiQuery, AuthUser, Document, Order, Predicate, Prediction, ResolvedAddress, SignUpFields,
};
