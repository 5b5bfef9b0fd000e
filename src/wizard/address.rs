//! Debounced street autocomplete with stale-response rejection

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clients::{PlaceAutocomplete, Prediction, ResolvedAddress};
use crate::config::WizardConfig;

/// Shown under the street field when the lookup service fails; manual entry keeps working
pub const LOOKUP_FAILED: &str =
    "Recherche d'adresse indisponible, vous pouvez saisir l'adresse manuellement";

/// Cancellable one-shot timer: scheduling again aborts the pending run
#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupState {
    /// Bumped by every new query or selection; results carrying an older value are dropped
    pub seq: u64,
    pub predictions: Vec<Prediction>,
    pub error: Option<String>,
    pub loading: bool,
}

/// Address autocomplete bound to one wizard instance
pub struct AddressLookup {
    places: Option<Arc<dyn PlaceAutocomplete>>,
    state: Arc<Mutex<LookupState>>,
    alive: Arc<AtomicBool>,
    debouncer: Debouncer,
    config: WizardConfig,
}

impl AddressLookup {
    pub fn new(
        places: Option<Arc<dyn PlaceAutocomplete>>,
        alive: Arc<AtomicBool>,
        config: WizardConfig,
    ) -> Self {
        Self {
            places,
            state: Arc::new(Mutex::new(LookupState::default())),
            alive,
            debouncer: Debouncer::default(),
            config,
        }
    }

    pub fn snapshot(&self) -> LookupState {
        self.state.lock().clone()
    }

    /// Street text changed: schedule one lookup after the debounce window
    pub fn query_changed(&self, text: &str) {
        let Some(places) = self.places.clone() else {
            return;
        };

        let seq = {
            let mut state = self.state.lock();
            state.seq += 1;
            state.error = None;
            if text.trim().chars().count() < self.config.lookup_min_chars {
                state.predictions.clear();
                state.loading = false;
                None
            } else {
                state.loading = true;
                Some(state.seq)
            }
        };
        let Some(seq) = seq else {
            self.debouncer.cancel();
            return;
        };

        let text = text.trim().to_string();
        let country = self.config.places_country.clone();
        let state = self.state.clone();
        let alive = self.alive.clone();

        self.debouncer.schedule(self.config.lookup_debounce, async move {
            debug!(seq, text = %text, "Address lookup fired");
            let result = places.autocomplete(&text, &country).await;

            let mut state = state.lock();
            if !alive.load(Ordering::SeqCst) || state.seq != seq {
                debug!(seq, latest = state.seq, "Discarding stale address predictions");
                return;
            }
            state.loading = false;
            match result {
                Ok(predictions) => state.predictions = predictions,
                Err(e) => {
                    warn!("Address autocomplete failed: {}", e);
                    state.predictions.clear();
                    state.error = Some(LOOKUP_FAILED.to_string());
                }
            }
        });
    }

    /// Resolve a chosen prediction into structured address fields.
    ///
    /// Returns `None` when the lookup failed (the error string is set), was
    /// superseded by newer typing, or the wizard was closed meanwhile.
    pub async fn resolve(&self, place_id: &str) -> Option<ResolvedAddress> {
        let places = self.places.clone()?;
        self.debouncer.cancel();
        let seq = {
            let mut state = self.state.lock();
            state.seq += 1;
            state.loading = true;
            state.error = None;
            state.seq
        };

        let result = places.details(place_id).await;

        let mut state = self.state.lock();
        if !self.alive.load(Ordering::SeqCst) || state.seq != seq {
            debug!(seq, "Discarding stale place details");
            return None;
        }
        state.loading = false;
        match result {
            Ok(address) => {
                state.predictions.clear();
                Some(address)
            }
            Err(e) => {
                warn!(place_id, "Place details lookup failed: {}", e);
                state.error = Some(LOOKUP_FAILED.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlaces;

    fn lookup(places: Arc<FakePlaces>) -> (AddressLookup, Arc<AtomicBool>) {
        let alive = Arc::new(AtomicBool::new(true));
        let lookup = AddressLookup::new(Some(places), alive.clone(), WizardConfig::default());
        (lookup, alive)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_keystrokes_coalesce_into_one_request() {
        let places = Arc::new(FakePlaces::new());
        let (lookup, _) = lookup(places.clone());

        for text in ["12 a", "12 av", "12 ave", "12 aven"] {
            lookup.query_changed(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(places.queries(), vec!["12 aven".to_string()]);
        let state = lookup.snapshot();
        assert_eq!(state.predictions.len(), 1);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn short_text_never_fires() {
        let places = Arc::new(FakePlaces::new());
        let (lookup, _) = lookup(places.clone());

        lookup.query_changed("12");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(places.queries().is_empty());
        assert!(lookup.snapshot().predictions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn late_results_from_superseded_queries_are_dropped() {
        let places = Arc::new(FakePlaces::new().with_delay(Duration::from_millis(500)));
        let (lookup, _) = lookup(places.clone());

        lookup.query_changed("rue de");
        // Let the first request fire, then type again while it is in flight
        tokio::time::sleep(Duration::from_millis(350)).await;
        lookup.query_changed("rue de la paix");
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(places.queries().len(), 2);
        let state = lookup.snapshot();
        assert_eq!(state.predictions[0].description, "rue de la paix, France");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_sets_a_non_blocking_error() {
        let places = Arc::new(FakePlaces::new().failing());
        let (lookup, _) = lookup(places.clone());

        lookup.query_changed("avenue foch");
        tokio::time::sleep(Duration::from_millis(400)).await;

        let state = lookup.snapshot();
        assert_eq!(state.error.as_deref(), Some(LOOKUP_FAILED));
        assert!(state.predictions.is_empty());

        assert_eq!(lookup.resolve("place-1").await, None);
        assert_eq!(lookup.snapshot().error.as_deref(), Some(LOOKUP_FAILED));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_wizard_ignores_late_results() {
        let places = Arc::new(FakePlaces::new().with_delay(Duration::from_millis(200)));
        let (lookup, alive) = lookup(places.clone());

        lookup.query_changed("boulevard");
        tokio::time::sleep(Duration::from_millis(350)).await;
        alive.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(lookup.snapshot().predictions.is_empty());
    }

    #[tokio::test]
    async fn resolve_returns_structured_address() {
        let places = Arc::new(FakePlaces::new());
        let (lookup, _) = lookup(places);

        let address = lookup.resolve("place-1").await.unwrap();
        assert_eq!(address.city, "Nice");
        assert!(address.coordinates.is_some());
    }
}
