//! Filter predicates and free-text search over listing records

use std::collections::BTreeSet;

use crate::models::{ListingRecord, PropertyType, Service};

/// Tri-state furnished filter; `All` imposes no constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Furnished {
    #[default]
    All,
    Yes,
    No,
}

/// Inclusive numeric range, open on any side left as `None`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Filters chosen in the filter sheet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingFilters {
    /// Monthly rent
    pub price: Bounds,
    /// Total area of the dwelling, m²
    pub area: Bounds,
    /// `None` means every property type
    pub property_type: Option<PropertyType>,
    pub furnished: Furnished,
    /// Every selected service must be offered
    pub services: BTreeSet<Service>,
}

impl ListingFilters {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &ListingRecord) -> bool {
        if !self.price.contains(record.details.rent) {
            return false;
        }
        if !self.area.contains(record.housing.total_area) {
            return false;
        }
        if let Some(kind) = self.property_type {
            if record.details.property_type != Some(kind) {
                return false;
            }
        }
        match self.furnished {
            Furnished::All => {}
            Furnished::Yes if !record.details.furnished => return false,
            Furnished::No if record.details.furnished => return false,
            _ => {}
        }
        self.services.iter().all(|s| record.services.has(*s))
    }

    /// Query-string parameters understood by `GET /api/listings`
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |name: &'static str, value: Option<f64>| {
            if let Some(v) = value {
                params.push((name, v.to_string()));
            }
        };
        push("price_min", self.price.min);
        push("price_max", self.price.max);
        push("area_min", self.area.min);
        push("area_max", self.area.max);

        if let Some(kind) = self.property_type {
            params.push(("propertyType", kind.as_str().to_string()));
        }
        match self.furnished {
            Furnished::All => {}
            Furnished::Yes => params.push(("furnished", "true".to_string())),
            Furnished::No => params.push(("furnished", "false".to_string())),
        }
        if !self.services.is_empty() {
            let keys: Vec<&str> = self.services.iter().map(|s| s.key()).collect();
            params.push(("services", keys.join(",")));
        }
        params.push(("sort", "newest".to_string()));
        params
    }
}

/// Case-insensitive substring match over the searchable text fields.
/// A blank query matches everything.
pub fn matches_search(record: &ListingRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let property_type = record
        .details
        .property_type
        .map(|k| k.as_str())
        .unwrap_or_default();

    [
        record.location.city.as_str(),
        record.location.street.as_str(),
        record.location.country.as_str(),
        record.details.title.as_str(),
        record.details.description.as_str(),
        property_type,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}
