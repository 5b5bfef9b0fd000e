use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Coordinates;

/// Signed-in user as reported by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub display_name: Option<String>,
    pub email: String,
    pub photo_url: Option<String>,
}

/// Fields collected by the sign-up form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpFields {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// A stored document and its id
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the document body, carrying the id into an `id` field
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> serde_json::Result<T> {
        let mut data = self.data;
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), Value::String(self.id));
        }
        serde_json::from_value(data)
    }
}

/// Equality constraint on a dotted field path (e.g. `metadata.userId`)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }
}

/// Parameters of `GET /api/listings`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiQuery {
    pub page: u32,
    pub limit: u32,
    pub params: Vec<(&'static str, String)>,
}

/// One autocomplete suggestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub place_id: String,
    pub description: String,
}

/// Structured address of a place, already mapped onto the listing's location fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResolvedAddress {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
}
