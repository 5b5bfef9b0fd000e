use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Coordinates, ListingRecord, PropertyType, Services};

/// A photo attached to a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MediaRef {
    /// Device file still waiting to be uploaded
    Local(PathBuf),
    /// Already hosted, e.g. when editing an existing listing
    Durable(String),
}

impl MediaRef {
    /// Classify a picker result: http(s) URLs are durable, anything else is a local file
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            MediaRef::Durable(trimmed.to_string())
        } else {
            let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
            MediaRef::Local(Path::new(path).to_path_buf())
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, MediaRef::Durable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftLocation {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
}

/// Numeric inputs are kept as typed text until submission
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftHousing {
    pub total_roommates: String,
    pub bathrooms: String,
    pub private_area: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftDetails {
    pub property_type: Option<PropertyType>,
    pub total_area: String,
    pub rooms: String,
    pub floor: String,
    pub furnished: bool,
    pub available_date: String,
    pub rent: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftContact {
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub accept_terms: bool,
}

/// In-memory listing being composed by the wizard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingDraft {
    pub location: DraftLocation,
    pub housing: DraftHousing,
    pub details: DraftDetails,
    pub photos: Vec<MediaRef>,
    pub services: Services,
    pub contact: DraftContact,
}

impl ListingDraft {
    /// Fresh draft with contact prefilled from the author and today's availability date
    pub fn new(contact_name: &str, contact_email: &str, today: NaiveDate) -> Self {
        let mut draft = Self::default();
        draft.details.available_date = today.format("%Y-%m-%d").to_string();
        draft.contact.contact_name = contact_name.to_string();
        draft.contact.contact_email = contact_email.to_string();
        draft
    }

    pub fn for_today(contact_name: &str, contact_email: &str) -> Self {
        Self::new(contact_name, contact_email, Utc::now().date_naive())
    }

    /// Re-open a stored record for editing; its photos are already hosted
    pub fn from_record(record: &ListingRecord) -> Self {
        let number = |n: i64| if n == 0 { String::new() } else { n.to_string() };
        let decimal = |v: f64| if v == 0.0 { String::new() } else { v.to_string() };

        Self {
            location: DraftLocation {
                street: record.location.street.clone(),
                postal_code: record.location.postal_code.clone(),
                city: record.location.city.clone(),
                country: record.location.country.clone(),
                coordinates: record.location.coordinates,
            },
            housing: DraftHousing {
                total_roommates: number(record.housing.total_roommates),
                bathrooms: number(record.housing.bathrooms),
                private_area: decimal(record.housing.private_area),
            },
            details: DraftDetails {
                property_type: record.details.property_type,
                total_area: decimal(record.housing.total_area),
                rooms: number(record.housing.rooms),
                floor: number(record.housing.floor),
                furnished: record.details.furnished,
                available_date: record.details.available_date.clone(),
                rent: decimal(record.details.rent),
                title: record.details.title.clone(),
                description: record.details.description.clone(),
            },
            photos: record
                .photos
                .iter()
                .map(|url| MediaRef::Durable(url.clone()))
                .collect(),
            services: record.services.clone(),
            contact: DraftContact {
                contact_name: record.contact.contact_name.clone(),
                contact_phone: record.contact.contact_phone.clone(),
                contact_email: record.contact.contact_email.clone(),
                // Terms must be accepted again for every publication
                accept_terms: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_ref_classification() {
        assert_eq!(
            MediaRef::parse("https://res.cloudinary.com/colocation/image/upload/a.jpg"),
            MediaRef::Durable("https://res.cloudinary.com/colocation/image/upload/a.jpg".into())
        );
        assert_eq!(
            MediaRef::parse("file:///data/user/0/cache/IMG_001.jpg"),
            MediaRef::Local(PathBuf::from("/data/user/0/cache/IMG_001.jpg"))
        );
        assert!(!MediaRef::parse("photos/room.png").is_durable());
    }

    #[test]
    fn new_draft_is_prefilled() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let draft = ListingDraft::new("Léa Martin", "lea@example.com", today);

        assert_eq!(draft.details.available_date, "2024-03-07");
        assert_eq!(draft.contact.contact_name, "Léa Martin");
        assert_eq!(draft.contact.contact_email, "lea@example.com");
        assert!(draft.photos.is_empty());
        assert!(!draft.contact.accept_terms);
    }
}
