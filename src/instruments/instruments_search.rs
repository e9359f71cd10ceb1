use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::remote::RemoteInstrumentStore;

use super::instruments_model::Instrument;
use super::instruments_traits::FailureReporter;

/// Transient symbol-lookup state. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub search_text: String,
    pub search_ended: bool,
    pub not_found: bool,
    pub failed: bool,
    pub document: Option<Instrument>,
}

/// Lifecycle phase of the lookup state machine. `Idle` is reserved for
/// cleared (or never-searched) text; a lookup that ended in a reported
/// failure is `Failed`, not `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Searching,
    Found,
    NotFound,
    Failed,
}

impl SearchState {
    pub fn phase(&self) -> SearchPhase {
        if self.search_text.is_empty() {
            SearchPhase::Idle
        } else if !self.search_ended {
            SearchPhase::Searching
        } else if self.not_found {
            SearchPhase::NotFound
        } else if self.document.is_some() {
            SearchPhase::Found
        } else if self.failed {
            SearchPhase::Failed
        } else {
            SearchPhase::Idle
        }
    }
}

/// Owns the symbol-lookup lifecycle. Each text change advances a
/// generation counter; a lookup resolving under a stale generation is
/// discarded wholesale, which is what guarantees that the newest search
/// wins without relying on timing.
pub struct SearchController {
    remote: Arc<dyn RemoteInstrumentStore>,
    reporter: Arc<dyn FailureReporter>,
    state: RwLock<SearchState>,
    generation: AtomicU64,
}

impl SearchController {
    pub fn new(remote: Arc<dyn RemoteInstrumentStore>, reporter: Arc<dyn FailureReporter>) -> Self {
        Self {
            remote,
            reporter,
            state: RwLock::new(SearchState {
                search_ended: true,
                ..Default::default()
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Trims and uppercases the entered text and resets `not_found`.
    /// Clearing the text drops the in-memory record and returns to `Idle`.
    pub async fn set_search_text(&self, text: &str) {
        let normalized = text.trim().to_uppercase();
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.write().await;
        state.not_found = false;
        state.failed = false;
        state.search_text = normalized;
        if state.search_text.is_empty() {
            state.document = None;
            state.search_ended = true;
        }
    }

    /// Performs one lookup for the current text. `search_ended` is only
    /// reported after the lookup for the current text has settled.
    pub async fn search(&self) {
        let (text, generation) = {
            let mut state = self.state.write().await;
            if state.search_text.is_empty() {
                return;
            }
            state.not_found = false;
            state.failed = false;
            state.search_ended = false;
            (
                state.search_text.clone(),
                self.generation.load(Ordering::SeqCst),
            )
        };

        debug!("Looking up instrument {}", text);
        let result = self.remote.find_by_symbol(&text).await;

        let mut state = self.state.write().await;
        if generation != self.generation.load(Ordering::SeqCst) {
            // Superseded by a newer search; this resolution is ignored.
            debug!("Discarding stale lookup result for {}", text);
            return;
        }

        match result {
            Ok(Some(instrument)) => {
                state.document = Some(instrument);
                state.not_found = false;
            }
            Ok(None) => {
                // Absence is search state, not a failure.
                state.document = None;
                state.not_found = true;
            }
            Err(error) => {
                state.document = None;
                state.failed = true;
                self.reporter.report(&error);
            }
        }
        state.search_ended = true;
    }

    pub async fn state(&self) -> SearchState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::instruments_errors::InstrumentError;
    use crate::instruments::instruments_errors::Result;
    use crate::remote::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct CollectingReporter {
        errors: Mutex<Vec<String>>,
    }

    impl CollectingReporter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                errors: Mutex::new(Vec::new()),
            })
        }
    }

    impl FailureReporter for CollectingReporter {
        fn report(&self, error: &InstrumentError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    /// Remote whose lookups block until released, to order resolutions.
    struct GatedRemote {
        inner: MemoryStore,
        gate: Notify,
        started: Notify,
    }

    #[async_trait]
    impl RemoteInstrumentStore for GatedRemote {
        async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>> {
            self.started.notify_one();
            self.gate.notified().await;
            self.inner.find_by_symbol(symbol).await
        }

        async fn upsert(
            &self,
            symbol: &str,
            update: &crate::instruments::InstrumentUpdate,
        ) -> Result<Instrument> {
            self.inner.upsert(symbol, update).await
        }
    }

    async fn seeded_store(symbols: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for symbol in symbols {
            let form = crate::instruments::InstrumentForm {
                symbol: symbol.to_string(),
                full_name: format!("{} name", symbol),
                instrument_type: "stock".to_string(),
                min_price_increment: "0.01".to_string(),
                lot: "1".to_string(),
                ..Default::default()
            };
            let update = crate::instruments::build_update(&form, None).unwrap();
            store.upsert(symbol, &update).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn found_and_not_found_transitions() {
        let store = Arc::new(seeded_store(&["ABC"]).await);
        let controller = SearchController::new(store, CollectingReporter::new());

        controller.set_search_text(" abc ").await;
        assert_eq!(controller.state().await.search_text, "ABC");
        controller.search().await;

        let state = controller.state().await;
        assert_eq!(state.phase(), SearchPhase::Found);
        assert!(state.search_ended);
        assert_eq!(state.document.unwrap().symbol, "ABC");

        controller.set_search_text("MISSING").await;
        controller.search().await;
        let state = controller.state().await;
        assert_eq!(state.phase(), SearchPhase::NotFound);
        assert!(state.not_found);
        assert!(state.document.is_none());
    }

    #[tokio::test]
    async fn clearing_text_returns_to_idle() {
        let store = Arc::new(seeded_store(&["ABC"]).await);
        let controller = SearchController::new(store, CollectingReporter::new());

        controller.set_search_text("ABC").await;
        controller.search().await;
        assert_eq!(controller.state().await.phase(), SearchPhase::Found);

        controller.set_search_text("").await;
        let state = controller.state().await;
        assert_eq!(state.phase(), SearchPhase::Idle);
        assert!(state.document.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_lookup_cannot_overwrite_newer_search() {
        let remote = Arc::new(GatedRemote {
            inner: seeded_store(&["ABC"]).await,
            gate: Notify::new(),
            started: Notify::new(),
        });
        let controller = Arc::new(SearchController::new(
            remote.clone(),
            CollectingReporter::new(),
        ));

        controller.set_search_text("ABC").await;
        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.search().await })
        };
        // Wait until the first lookup is in flight, then supersede it.
        remote.started.notified().await;
        controller.set_search_text("XYZ").await;

        remote.gate.notify_one();
        first.await.unwrap();

        // The stale "ABC" resolution must not have populated anything
        // for the in-progress "XYZ" search context.
        let state = controller.state().await;
        assert_eq!(state.search_text, "XYZ");
        assert!(state.document.is_none());
        assert!(!state.not_found);

        remote.gate.notify_one();
        controller.search().await;
        let state = controller.state().await;
        assert_eq!(state.phase(), SearchPhase::NotFound);
    }

    #[tokio::test]
    async fn lookup_failure_goes_to_the_reporter() {
        struct FailingRemote;

        #[async_trait]
        impl RemoteInstrumentStore for FailingRemote {
            async fn find_by_symbol(&self, _symbol: &str) -> Result<Option<Instrument>> {
                Err(InstrumentError::RemoteStore("connection reset".to_string()))
            }

            async fn upsert(
                &self,
                _symbol: &str,
                _update: &crate::instruments::InstrumentUpdate,
            ) -> Result<Instrument> {
                unreachable!()
            }
        }

        let reporter = CollectingReporter::new();
        let controller = SearchController::new(Arc::new(FailingRemote), reporter.clone());

        controller.set_search_text("ABC").await;
        controller.search().await;

        let state = controller.state().await;
        assert!(state.search_ended);
        assert!(!state.not_found);
        assert_eq!(state.phase(), SearchPhase::Failed);
        assert_eq!(reporter.errors.lock().unwrap().len(), 1);

        // Editing the text leaves the failure behind.
        controller.set_search_text("").await;
        assert_eq!(controller.state().await.phase(), SearchPhase::Idle);
    }
}
