//! Draft-to-record pipeline: upload pending photos, then assemble the record

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::clients::{AuthUser, MediaUploader};
use crate::error::{Error, Result};
use crate::models::draft::ListingDraft;
use crate::models::{
    Contact, Details, Housing, ListingRecord, ListingStatus, Location, MediaRef, Metadata,
};

/// Integer field typed as text. Leading digits win ("3.5" is 3); no digits at all becomes 0
pub fn parse_int(raw: &str) -> i64 {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Decimal field typed as text, accepting a comma separator; anything unparseable becomes 0
pub fn parse_decimal(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Upload every local photo and return durable URLs in the draft's photo order.
///
/// Durable entries pass through untouched. If any upload fails the whole call
/// fails with one aggregated `Error::Upload` and no URL list is produced.
pub async fn upload_photos(uploader: &dyn MediaUploader, photos: &[MediaRef]) -> Result<Vec<String>> {
    let pending = photos.iter().filter(|p| !p.is_durable()).count();
    debug!(total = photos.len(), pending, "Uploading listing photos");

    let results = join_all(photos.iter().map(|photo| async move {
        match photo {
            MediaRef::Durable(url) => Ok(url.clone()),
            MediaRef::Local(_) => uploader.upload(photo).await,
        }
    }))
    .await;

    let mut urls = Vec::with_capacity(photos.len());
    let mut failures = Vec::new();
    for (photo, result) in photos.iter().zip(results) {
        match result {
            Ok(url) => urls.push(url),
            Err(e) => {
                let name = match photo {
                    MediaRef::Local(path) => path.display().to_string(),
                    MediaRef::Durable(url) => url.clone(),
                };
                warn!(photo = %name, "Photo upload failed: {}", e);
                failures.push(format!("{}: {}", name, e));
            }
        }
    }

    if failures.is_empty() {
        Ok(urls)
    } else {
        Err(Error::Upload {
            failed: failures.len(),
            total: pending,
            details: failures.join("; "),
        })
    }
}

/// Materialize the draft as a pending, visible record stamped with its author
pub fn assemble_record(
    draft: &ListingDraft,
    photo_urls: Vec<String>,
    author: &AuthUser,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ListingRecord {
    let user_name = author
        .display_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| draft.contact.contact_name.clone());

    ListingRecord {
        id: String::new(),
        location: Location {
            street: draft.location.street.trim().to_string(),
            postal_code: draft.location.postal_code.trim().to_string(),
            city: draft.location.city.trim().to_string(),
            country: draft.location.country.trim().to_string(),
            coordinates: draft.location.coordinates.filter(|c| c.is_valid()),
        },
        housing: Housing {
            total_roommates: parse_int(&draft.housing.total_roommates),
            bathrooms: parse_int(&draft.housing.bathrooms),
            private_area: parse_decimal(&draft.housing.private_area),
            total_area: parse_decimal(&draft.details.total_area),
            rooms: parse_int(&draft.details.rooms),
            floor: parse_int(&draft.details.floor),
        },
        details: Details {
            property_type: draft.details.property_type,
            furnished: draft.details.furnished,
            available_date: draft.details.available_date.trim().to_string(),
            rent: parse_decimal(&draft.details.rent),
            title: draft.details.title.trim().to_string(),
            description: draft.details.description.trim().to_string(),
        },
        photos: photo_urls,
        services: draft.services.clone(),
        contact: Contact {
            contact_name: draft.contact.contact_name.trim().to_string(),
            contact_phone: draft.contact.contact_phone.trim().to_string(),
            contact_email: draft.contact.contact_email.trim().to_string(),
        },
        metadata: Metadata {
            user_id: author.id.clone(),
            user_name,
            user_photo_url: author.photo_url.clone(),
            created_at,
            updated_at: now,
        },
        status: ListingStatus::Pending,
        is_visible: true,
    }
}
