//! Hand-written collaborator fakes shared by the unit tests

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::clients::{
    ApiQuery, AuthClient, AuthUser, ListingsApi, MediaUploader, PlaceAutocomplete, Prediction,
    ResolvedAddress, SignUpFields,
};
use crate::error::{Error, Result};
use crate::listings::{Furnished, ListingFilters};
use crate::models::{
    Contact, Coordinates, Details, Housing, ListingDraft, ListingRecord, ListingStatus, Location,
    MediaRef, Metadata, PropertyType, Service, Services,
};

/// A draft that passes every step
pub fn complete_draft() -> ListingDraft {
    let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    let mut draft = ListingDraft::new("Léa Martin", "lea@example.com", today);

    draft.location.street = "12 avenue Jean Médecin".into();
    draft.location.postal_code = "06000".into();
    draft.location.city = "Nice".into();
    draft.location.country = "France".into();
    draft.location.coordinates = Some(Coordinates { lat: 43.70, lng: 7.27 });

    draft.housing.total_roommates = "3".into();
    draft.housing.bathrooms = "1".into();
    draft.housing.private_area = "14".into();

    draft.details.property_type = Some(PropertyType::Studio);
    draft.details.total_area = "65".into();
    draft.details.rooms = "4".into();
    draft.details.floor = "2".into();
    draft.details.rent = "520".into();
    draft.details.title = "Chambre meublée près de la gare".into();
    draft.details.description = "Grande chambre dans une colocation calme".into();
    draft.details.furnished = true;

    draft.photos = vec![
        MediaRef::parse("/tmp/room1.jpg"),
        MediaRef::parse("https://res.cloudinary.com/colocation/image/upload/salon.jpg"),
    ];

    draft.contact.contact_phone = "06 12 34 56 78".into();
    draft.contact.accept_terms = true;
    draft
}

/// Active, visible record created `n` minutes after a fixed epoch
pub fn listing_record(id: &str, n: i64) -> ListingRecord {
    let created = Utc
        .timestamp_millis_opt(1_700_000_000_000 + n * 60_000)
        .unwrap();
    ListingRecord {
        id: id.to_string(),
        location: Location {
            street: "5 rue de la République".into(),
            postal_code: "69002".into(),
            city: "Lyon".into(),
            country: "France".into(),
            coordinates: None,
        },
        housing: Housing {
            total_roommates: 3,
            bathrooms: 1,
            private_area: 12.0,
            total_area: 60.0,
            rooms: 4,
            floor: 1,
        },
        details: Details {
            property_type: Some(PropertyType::Apartment),
            furnished: false,
            available_date: "2024-09-01".into(),
            rent: 450.0,
            title: format!("Chambre {}", id),
            description: "Colocation calme".into(),
        },
        photos: vec![format!("https://cdn.test/{}.jpg", id)],
        services: Services::default(),
        contact: Contact {
            contact_name: "Paul".into(),
            contact_phone: "0600000000".into(),
            contact_email: "paul@example.com".into(),
        },
        metadata: Metadata {
            user_id: "owner".into(),
            user_name: "Paul".into(),
            user_photo_url: None,
            created_at: created,
            updated_at: created,
        },
        status: ListingStatus::Active,
        is_visible: true,
    }
}

/// Auth provider with a fixed user; the token is `token-<id>`
pub struct StaticAuth {
    user: Mutex<Option<AuthUser>>,
}

impl StaticAuth {
    pub fn anonymous() -> Self {
        Self {
            user: Mutex::new(None),
        }
    }

    pub fn signed_in(id: &str, name: &str, email: &str) -> Self {
        Self {
            user: Mutex::new(Some(AuthUser {
                id: id.to_string(),
                display_name: Some(name.to_string()),
                email: email.to_string(),
                photo_url: None,
            })),
        }
    }
}

#[async_trait]
impl AuthClient for StaticAuth {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthUser> {
        let user = AuthUser {
            id: format!("id-{}", email),
            display_name: None,
            email: email.to_string(),
            photo_url: None,
        };
        *self.user.lock() = Some(user.clone());
        Ok(user)
    }

    async fn sign_up(&self, fields: &SignUpFields) -> Result<AuthUser> {
        let user = AuthUser {
            id: format!("id-{}", fields.email),
            display_name: Some(fields.display_name.clone()),
            email: fields.email.clone(),
            photo_url: None,
        };
        *self.user.lock() = Some(user.clone());
        Ok(user)
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.user.lock().clone()
    }

    async fn get_token(&self) -> Result<Option<String>> {
        Ok(self.user.lock().as_ref().map(|u| format!("token-{}", u.id)))
    }

    async fn sign_out(&self) -> Result<()> {
        *self.user.lock() = None;
        Ok(())
    }
}

/// Uploader returning `https://cdn.test/<file name>`
#[derive(Default)]
pub struct FakeUploader {
    failing_on: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.failing_on = Some(file_name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn uploads(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaUploader for FakeUploader {
    async fn upload(&self, media: &MediaRef) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let path = match media {
            MediaRef::Durable(url) => return Ok(url.clone()),
            MediaRef::Local(path) => path,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing_on.as_deref() == Some(name.as_str()) {
            return Err(Error::Network("502 Bad Gateway".into()));
        }
        Ok(format!("https://cdn.test/{}", name))
    }
}

/// Place lookup answering every query with one prediction in Nice
#[derive(Default)]
pub struct FakePlaces {
    delay: Option<Duration>,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl FakePlaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Autocomplete texts in the order they were requested
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    async fn pause(&self) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(Error::Network("OVER_QUERY_LIMIT".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaceAutocomplete for FakePlaces {
    async fn autocomplete(&self, text: &str, _country: &str) -> Result<Vec<Prediction>> {
        self.queries.lock().push(text.to_string());
        self.pause().await?;
        Ok(vec![Prediction {
            place_id: "place-1".into(),
            description: format!("{}, France", text),
        }])
    }

    async fn details(&self, _place_id: &str) -> Result<ResolvedAddress> {
        self.pause().await?;
        Ok(ResolvedAddress {
            street: "12 Avenue Jean Médecin".into(),
            postal_code: "06000".into(),
            city: "Nice".into(),
            country: "France".into(),
            coordinates: Some(Coordinates { lat: 43.70, lng: 7.27 }),
        })
    }
}

/// Listings API serving pages of a fixed corpus, honouring the filter parameters
pub struct FakeApi {
    corpus: Vec<ListingRecord>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeApi {
    pub fn new(corpus: Vec<ListingRecord>) -> Self {
        Self {
            corpus,
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn filters_from_params(params: &[(&'static str, String)]) -> ListingFilters {
    let mut filters = ListingFilters::default();
    for (name, value) in params {
        let number = value.parse::<f64>().ok();
        match *name {
            "price_min" => filters.price.min = number,
            "price_max" => filters.price.max = number,
            "area_min" => filters.area.min = number,
            "area_max" => filters.area.max = number,
            "propertyType" => filters.property_type = value.parse().ok(),
            "furnished" => {
                filters.furnished = if value == "true" {
                    Furnished::Yes
                } else {
                    Furnished::No
                }
            }
            "services" => {
                filters.services = value
                    .split(',')
                    .filter_map(|s| s.parse::<Service>().ok())
                    .collect()
            }
            _ => {}
        }
    }
    filters
}

#[async_trait]
impl ListingsApi for FakeApi {
    async fn list(&self, query: &ApiQuery, _bearer: Option<&str>) -> Result<Vec<ListingRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Network("connection refused".into()));
        }

        let filters = filters_from_params(&query.params);
        let limit = query.limit as usize;
        let skip = (query.page.saturating_sub(1)) as usize * limit;
        Ok(self
            .corpus
            .iter()
            .filter(|r| filters.matches(r))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}
