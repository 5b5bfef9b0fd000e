//! Multi-step listing creation
//!
//! `state` holds the pure reducer, `validate` the per-step rules, `address`
//! the street autocomplete and `submit` the upload-then-persist pipeline.
//! [`ListingWizard`] ties them to the external clients for one wizard screen.

pub mod address;
pub mod state;
pub mod submit;
pub mod validate;

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{MediaUploader, PlaceAutocomplete, RecordStore};
use crate::config::WizardConfig;
use crate::error::{Error, Result};
use crate::models::{ListingDraft, ListingRecord, LISTINGS, USERS};
use crate::session::Session;

pub use address::{AddressLookup, LookupState};
pub use state::{reduce, Action, Phase, Step, TextField, WizardState};
pub use validate::{validate_step, ValidationError};

/// Where a successful submission goes
#[derive(Debug, Clone, PartialEq)]
enum Target {
    Create,
    Update {
        listing_id: String,
        created_at: chrono::DateTime<Utc>,
    },
}

/// External services the wizard talks to
#[derive(Clone)]
pub struct WizardClients {
    pub store: Arc<dyn RecordStore>,
    pub uploader: Arc<dyn MediaUploader>,
    pub places: Option<Arc<dyn PlaceAutocomplete>>,
}

/// One open listing-creation screen
pub struct ListingWizard {
    session: Session,
    clients: WizardClients,
    state: Arc<Mutex<WizardState>>,
    alive: Arc<AtomicBool>,
    address: AddressLookup,
    target: Target,
}

/// Only verified accounts may publish
async fn ensure_verified(session: &Session, store: &dyn RecordStore) -> Result<()> {
    let user = session.require_user()?;
    let verified = match store.get(USERS, &user.id).await {
        Ok(doc) => doc
            .data
            .get("isVerified")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        Err(Error::NotFound { .. }) => false,
        Err(e) => return Err(e),
    };
    if !verified {
        info!(user_id = %user.id, "Unverified account tried to open the listing wizard");
        return Err(Error::Unverified);
    }
    Ok(())
}

impl ListingWizard {
    /// Open a wizard for a new listing, prefilled with the author's contact details
    pub async fn start(session: Session, clients: WizardClients, config: WizardConfig) -> Result<Self> {
        ensure_verified(&session, clients.store.as_ref()).await?;
        let user = session.require_user()?;
        let draft = ListingDraft::for_today(
            user.display_name.as_deref().unwrap_or_default(),
            &user.email,
        );
        Ok(Self::with_draft(session, clients, config, draft, Target::Create))
    }

    /// Re-open one of the user's listings; submitting sends it back to moderation
    pub async fn edit(
        session: Session,
        clients: WizardClients,
        config: WizardConfig,
        listing_id: &str,
    ) -> Result<Self> {
        ensure_verified(&session, clients.store.as_ref()).await?;
        let user_id = session.require_user()?.id.clone();

        let record: ListingRecord = clients.store.get(LISTINGS, listing_id).await?.into_typed()?;
        if !record.is_owned_by(&user_id) {
            return Err(Error::Forbidden(format!("listing {} belongs to another user", listing_id)));
        }

        let target = Target::Update {
            listing_id: listing_id.to_string(),
            created_at: record.metadata.created_at,
        };
        Ok(Self::with_draft(session, clients, config, ListingDraft::from_record(&record), target))
    }

    fn with_draft(
        session: Session,
        clients: WizardClients,
        config: WizardConfig,
        draft: ListingDraft,
        target: Target,
    ) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let address = AddressLookup::new(clients.places.clone(), alive.clone(), config);
        Self {
            session,
            clients,
            state: Arc::new(Mutex::new(WizardState::new(draft))),
            alive,
            address,
            target,
        }
    }

    pub fn snapshot(&self) -> WizardState {
        self.state.lock().clone()
    }

    pub fn address_state(&self) -> LookupState {
        self.address.snapshot()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Apply one action through the reducer and return the resulting state
    pub fn dispatch(&self, action: Action) -> WizardState {
        let mut state = self.state.lock();
        if !self.is_alive() {
            return state.clone();
        }
        let next = reduce(state.clone(), action);
        *state = next.clone();
        next
    }

    pub fn next(&self) -> WizardState {
        self.dispatch(Action::Next)
    }

    pub fn previous(&self) -> WizardState {
        self.dispatch(Action::Previous)
    }

    /// Street input changed: record the text and start a debounced lookup
    pub fn street_changed(&self, text: &str) {
        let state = self.dispatch(Action::SetText(TextField::Street, text.to_string()));
        if state.active_step() == Some(Step::Location) {
            self.address.query_changed(text);
        }
    }

    /// Fill the location fields from a chosen prediction; on failure manual values stay
    pub async fn select_prediction(&self, place_id: &str) -> WizardState {
        if let Some(address) = self.address.resolve(place_id).await {
            return self.dispatch(Action::ApplyAddress(address));
        }
        self.snapshot()
    }

    /// Publish the draft: upload pending photos, then persist the record.
    ///
    /// Returns the listing id. On failure the draft is left as it was so the
    /// user can retry.
    pub async fn submit(&self) -> Result<String> {
        let draft = {
            let mut state = self.state.lock();
            if !self.is_alive() {
                return Err(Error::Closed);
            }
            if state.is_submitting() {
                return Err(Error::SubmissionInProgress);
            }
            if state.is_finished() {
                return Err(Error::Closed);
            }
            *state = reduce(state.clone(), Action::BeginSubmit);
            if !state.is_submitting() {
                // Either the contact step is invalid or an earlier step is still open
                let err = match (state.active_step(), state.validation_error()) {
                    (_, Some(message)) => ValidationError {
                        step: Step::Contact,
                        message: message.to_string(),
                    },
                    (step, None) => validate::first_invalid_step(state.draft()).unwrap_or(
                        ValidationError {
                            step: step.unwrap_or(Step::Contact),
                            message: "Veuillez compléter toutes les étapes".to_string(),
                        },
                    ),
                };
                return Err(Error::Validation(err));
            }
            state.draft().clone()
        };

        match self.publish(&draft).await {
            Ok(listing_id) => {
                info!(listing_id = %listing_id, "Listing submitted for moderation");
                self.finish(Action::SubmitSucceeded {
                    listing_id: listing_id.clone(),
                });
                Ok(listing_id)
            }
            Err(e) => {
                error!("Listing submission failed: {}", e);
                self.finish(Action::SubmitFailed {
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn publish(&self, draft: &ListingDraft) -> Result<String> {
        let author = self.session.require_user()?.clone();

        let photo_urls = submit::upload_photos(self.clients.uploader.as_ref(), &draft.photos).await?;

        let now = Utc::now();
        let created_at = match &self.target {
            Target::Create => now,
            Target::Update { created_at, .. } => *created_at,
        };
        let record = submit::assemble_record(draft, photo_urls, &author, created_at, now);
        let data = serde_json::to_value(&record)?;

        match &self.target {
            Target::Create => self.clients.store.create(LISTINGS, data).await,
            Target::Update { listing_id, .. } => {
                self.clients.store.update(LISTINGS, listing_id, data).await?;
                Ok(listing_id.clone())
            }
        }
    }

    fn finish(&self, outcome: Action) {
        let mut state = self.state.lock();
        if !self.is_alive() {
            debug!("Wizard closed during submission; outcome not applied");
            return;
        }
        *state = reduce(state.clone(), outcome);
    }

    /// Screen left: pending lookups and submissions stop touching this wizard
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Listing wizard closed");
        }
    }
}

impl Drop for ListingWizard {
    fn drop(&mut self) {
        if self.state.lock().is_submitting() {
            warn!("Listing wizard dropped while a submission was in flight");
        }
        self.close();
    }
}
