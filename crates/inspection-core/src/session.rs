//! Browse session
//!
//! Owns the filter state for one viewer and decides when the fetcher has to
//! run. Keystrokes in the restaurant search go through the debouncer; every
//! other event rebuilds the predicate right away. A refresh is only spawned
//! when the predicate actually changed, so typing "ab" and then "abc" issues
//! a single new request once "abc" settles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::county::County;
use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::error::FetchError;
use crate::fetcher::{DataFetcher, RefreshOutcome};
use crate::filter::{FilterMode, FilterState};
use crate::query::{Predicate, QueryBuilder};

/// A user interaction with the filter controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum FilterEvent {
    Mode(FilterMode),
    County(County),
    City(String),
    ZipCode(String),
    /// Raw keystroke text; debounced before it affects anything
    SearchText(String),
    /// Search text after it settled
    DebouncedSearch(String),
}

pub type RefreshHandle = JoinHandle<Result<RefreshOutcome, FetchError>>;

/// Filter state plus the machinery that keeps results in step with it
pub struct BrowseSession {
    state: FilterState,
    builder: QueryBuilder,
    fetcher: Arc<DataFetcher>,
    debouncer: Debouncer<String>,
    settled: mpsc::UnboundedReceiver<String>,
    last_issued: Option<Predicate>,
}

impl BrowseSession {
    pub fn new(fetcher: Arc<DataFetcher>) -> Self {
        Self::with_debounce(fetcher, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(fetcher: Arc<DataFetcher>, quiet: std::time::Duration) -> Self {
        let (debouncer, settled) = Debouncer::new(quiet);
        Self {
            state: FilterState::new(),
            builder: fetcher.query_builder(),
            fetcher,
            debouncer,
            settled,
            last_issued: None,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn fetcher(&self) -> &Arc<DataFetcher> {
        &self.fetcher
    }

    /// Predicate for the current state
    pub fn predicate(&self) -> Predicate {
        self.builder.build(&self.state)
    }

    /// Kick off the city list and the first violation fetch side by side
    pub fn start(&mut self) -> (JoinHandle<Vec<String>>, RefreshHandle) {
        let fetcher = self.fetcher.clone();
        let cities = tokio::spawn(async move { fetcher.load_cities().await });
        let predicate = self.predicate();
        let refresh = self.spawn_refresh(predicate);
        (cities, refresh)
    }

    /// Apply an event. Returns the refresh it triggered, if any.
    pub fn apply(&mut self, event: FilterEvent) -> Option<RefreshHandle> {
        let applied = match event {
            FilterEvent::Mode(mode) => {
                self.debouncer.cancel();
                // A value that settled before the reset must not come back
                while self.settled.try_recv().is_ok() {}
                self.state.set_mode(mode);
                true
            }
            FilterEvent::County(county) => self.state.select_county(county),
            FilterEvent::City(city) => self.state.select_city(city),
            FilterEvent::ZipCode(zip) => self.state.set_zip_code(&zip),
            FilterEvent::SearchText(text) => {
                if self.state.set_search_text(text.clone()) {
                    self.debouncer.push(text);
                }
                return None;
            }
            FilterEvent::DebouncedSearch(text) => {
                if self.state.mode() == FilterMode::Restaurant && text != self.state.search_text() {
                    debug!(settled = %text, "Dropping settled text superseded by newer input");
                    return None;
                }
                self.state.set_debounced_search_text(text)
            }
        };

        if !applied {
            warn!(mode = %self.state.mode(), "Ignoring parameter for inactive filter mode");
            return None;
        }

        let predicate = self.predicate();
        if self.last_issued.as_ref() == Some(&predicate) {
            debug!("Predicate unchanged; keeping current results");
            return None;
        }
        Some(self.spawn_refresh(predicate))
    }

    /// Wait for the next settled search text
    pub async fn next_settled_search(&mut self) -> Option<String> {
        self.settled.recv().await
    }

    fn spawn_refresh(&mut self, predicate: Predicate) -> RefreshHandle {
        self.last_issued = Some(predicate.clone());
        // Reserved here, not in the task: task start order is not selection order
        let generation = self.fetcher.begin();
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move { fetcher.refresh_with(generation, &predicate).await })
    }
}
