//! Data fetcher
//!
//! Runs the count and row queries for a [`Predicate`] and publishes the
//! outcome through a `watch` channel. Filtering happens on the server
//! ([`FilterStrategy::Remote`]) or in memory over a dataset pulled once
//! ([`FilterStrategy::Local`]).
//!
//! Every refresh takes the next generation number. When a refresh resolves
//! after a newer one has started, its result (or error) is dropped, so the
//! visible result always belongs to the latest selection no matter which
//! response arrives first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, error, info, warn};

use crate::config::{FetcherConfig, FilterStrategy};
use crate::error::FetchError;
use crate::query::{Predicate, QueryBuilder};
use crate::record::{normalize_cities, sort_newest_first, ResultSet, ViolationRecord};
use crate::transport::{SodaQuery, Transport};

/// Lifecycle of the violation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FetchStatus {
    /// First load in progress, nothing to show yet
    Loading,
    /// A newer selection is in flight; the previous rows may still show
    Fetching,
    Ready,
    /// Terminal. The views are replaced by the message.
    Failed(String),
}

/// What the views render from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub status: FetchStatus,
    pub results: ResultSet,
    /// Generation of the refresh that produced `results`; 0 before the first
    pub generation: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            status: FetchStatus::Loading,
            results: ResultSet::default(),
            generation: 0,
        }
    }
}

/// How a refresh ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Results published
    Applied { generation: u64, total_count: u64, rows: usize },
    /// A newer refresh started first; results dropped
    Superseded { generation: u64 },
    /// The fetcher already failed; nothing was requested
    Halted,
}

/// Fetches violations and city lists for one viewer
pub struct DataFetcher {
    transport: Arc<dyn Transport>,
    config: FetcherConfig,
    generation: AtomicU64,
    dataset: OnceCell<Arc<Vec<ViolationRecord>>>,
    state: watch::Sender<ViewState>,
}

impl DataFetcher {
    pub fn new(transport: Arc<dyn Transport>, config: FetcherConfig) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            transport,
            config,
            generation: AtomicU64::new(0),
            dataset: OnceCell::new(),
            state,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Query builder matching this fetcher's base predicate
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.config.base_predicate)
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> FetchStatus {
        self.state.borrow().status.clone()
    }

    /// Latest generation handed out, whether or not it has resolved
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetch count and rows for `predicate` and publish them unless superseded
    pub async fn refresh(&self, predicate: &Predicate) -> Result<RefreshOutcome, FetchError> {
        let generation = self.begin();
        self.refresh_with(generation, predicate).await
    }

    /// Reserve the next generation and mark the view as fetching.
    ///
    /// Call this where the selection is made, before handing the work to
    /// another task, so that generation order follows selection order.
    pub fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_if_modified(|state| {
            if state.status == FetchStatus::Ready {
                state.status = FetchStatus::Fetching;
                true
            } else {
                false
            }
        });
        generation
    }

    /// Run a refresh under a generation reserved with [`DataFetcher::begin`]
    pub async fn refresh_with(
        &self,
        generation: u64,
        predicate: &Predicate,
    ) -> Result<RefreshOutcome, FetchError> {
        if matches!(self.state.borrow().status, FetchStatus::Failed(_)) {
            return Ok(RefreshOutcome::Halted);
        }

        let where_clause = predicate.to_soql();
        info!(generation, strategy = %self.config.strategy, "Fetching violations");
        debug!(generation, where_clause = ?where_clause, "Predicate");

        let result = match self.config.strategy {
            FilterStrategy::Remote => self.fetch_remote(where_clause).await,
            FilterStrategy::Local => self.fetch_local(predicate).await,
        };

        if generation != self.current_generation() {
            debug!(
                generation,
                latest = self.current_generation(),
                "Discarding superseded response"
            );
            return Ok(RefreshOutcome::Superseded { generation });
        }

        match result {
            Ok((total_count, rows)) => {
                let row_count = rows.len();
                self.state.send_modify(|state| {
                    state.results = ResultSet {
                        total_count,
                        rows,
                        cities: std::mem::take(&mut state.results.cities),
                    };
                    state.status = FetchStatus::Ready;
                    state.generation = generation;
                });
                info!(generation, total_count, rows = row_count, "Violations updated");
                Ok(RefreshOutcome::Applied {
                    generation,
                    total_count,
                    rows: row_count,
                })
            }
            Err(err) => {
                error!(generation, error = %err, "Failed to fetch violations");
                self.state.send_modify(|state| {
                    state.status = FetchStatus::Failed(err.user_message().to_string());
                });
                Err(err)
            }
        }
    }

    /// Load the city dropdown. Failures are logged and leave it empty.
    pub async fn load_cities(&self) -> Vec<String> {
        let cities = match self.config.strategy {
            FilterStrategy::Remote => self.fetch_city_list().await,
            FilterStrategy::Local => self
                .dataset()
                .await
                .map(|rows| normalize_cities(rows.iter().map(|r| r.city.as_str()))),
        };

        match cities {
            Ok(cities) => {
                info!(count = cities.len(), "Loaded city list");
                self.state
                    .send_modify(|state| state.results.cities = cities.clone());
                cities
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch cities list");
                Vec::new()
            }
        }
    }

    async fn fetch_remote(
        &self,
        where_clause: Option<String>,
    ) -> Result<(u64, Vec<ViolationRecord>), FetchError> {
        let token = self.config.app_token.as_ref();

        let count_body = self
            .transport
            .query(&SodaQuery::count(where_clause.clone()), token)
            .await?;
        let total_count = decode_count(&count_body)?;

        let rows_body = self
            .transport
            .query(&SodaQuery::rows(where_clause, self.config.row_limit), token)
            .await?;
        let mut rows: Vec<ViolationRecord> = serde_json::from_value(rows_body)?;
        sort_newest_first(&mut rows);
        rows.truncate(self.config.row_limit);

        Ok((total_count, rows))
    }

    async fn fetch_local(
        &self,
        predicate: &Predicate,
    ) -> Result<(u64, Vec<ViolationRecord>), FetchError> {
        let dataset = self.dataset().await?;
        let mut rows: Vec<ViolationRecord> = dataset
            .iter()
            .filter(|record| predicate.matches(record))
            .cloned()
            .collect();
        let total_count = rows.len() as u64;
        sort_newest_first(&mut rows);
        rows.truncate(self.config.row_limit);
        Ok((total_count, rows))
    }

    async fn fetch_city_list(&self) -> Result<Vec<String>, FetchError> {
        let body = self
            .transport
            .query(
                &SodaQuery::distinct_cities(self.config.city_limit),
                self.config.app_token.as_ref(),
            )
            .await?;
        let entries = body
            .as_array()
            .ok_or_else(|| FetchError::Malformed("city list is not an array".to_string()))?;
        let cities = entries
            .iter()
            .filter_map(|entry| entry.get("restcity").and_then(Value::as_str));
        Ok(normalize_cities(cities))
    }

    /// Full dataset for local filtering, fetched at most once
    async fn dataset(&self) -> Result<Arc<Vec<ViolationRecord>>, FetchError> {
        self.dataset
            .get_or_try_init(|| async {
                info!(limit = self.config.dataset_limit, "Fetching full dataset");
                let body = self
                    .transport
                    .query(
                        &SodaQuery::rows(None, self.config.dataset_limit),
                        self.config.app_token.as_ref(),
                    )
                    .await?;
                let rows: Vec<ViolationRecord> = serde_json::from_value(body)?;
                info!(rows = rows.len(), "Cached dataset");
                Ok::<_, FetchError>(Arc::new(rows))
            })
            .await
            .cloned()
    }
}

/// Read `[{"count": "42"}]`; SODA sends the aggregate as a string
fn decode_count(body: &Value) -> Result<u64, FetchError> {
    let count = body
        .as_array()
        .and_then(|rows| rows.first())
        .and_then(|row| row.get("count"))
        .ok_or_else(|| FetchError::Malformed("count response has no count field".to_string()))?;

    match count {
        Value::String(raw) => raw
            .parse()
            .map_err(|_| FetchError::Malformed(format!("count is not a number: {raw}"))),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| FetchError::Malformed(format!("count is not a whole number: {n}"))),
        other => Err(FetchError::Malformed(format!("unexpected count value: {other}"))),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted transport for tests

    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::config::AppToken;

    type Responder = Box<dyn Fn(&SodaQuery) -> Result<Value, FetchError> + Send + Sync>;

    pub struct FakeTransport {
        responder: Responder,
        delays: Mutex<Vec<(String, Duration)>>,
        calls: Mutex<Vec<(SodaQuery, Option<String>)>>,
    }

    impl FakeTransport {
        pub fn new<F>(responder: F) -> Self
        where
            F: Fn(&SodaQuery) -> Result<Value, FetchError> + Send + Sync + 'static,
        {
            Self {
                responder: Box::new(responder),
                delays: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Delay responses whose `$where` contains `needle`
        pub fn delay_where(self, needle: &str, delay: Duration) -> Self {
            self.delays
                .lock()
                .unwrap()
                .push((needle.to_string(), delay));
            self
        }

        pub fn calls(&self) -> Vec<(SodaQuery, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn row_queries(&self) -> Vec<SodaQuery> {
            self.calls()
                .into_iter()
                .map(|(q, _)| q)
                .filter(|q| !q.is_count() && !q.is_city_list())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn query(
            &self,
            query: &SodaQuery,
            token: Option<&AppToken>,
        ) -> Result<Value, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.clone(), token.map(|t| t.expose().to_string())));

            let delay = {
                let where_clause = query.where_clause.clone().unwrap_or_default();
                self.delays
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|(needle, _)| where_clause.contains(needle.as_str()))
                    .map(|(_, d)| *d)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            (self.responder)(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;
    use crate::config::AppToken;
    use crate::county::County;
    use crate::filter::{FilterMode, FilterState};
    use crate::query::BasePredicate;
    use crate::record::sample_record;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn rows_json(records: &[ViolationRecord]) -> Value {
        serde_json::to_value(records).unwrap()
    }

    fn kent_rows(n: usize) -> Vec<ViolationRecord> {
        (0..n)
            .map(|i| {
                let day = 1 + (i % 28);
                sample_record(
                    &format!("KENT DINER {i}"),
                    "Dover",
                    "19901",
                    &format!("2024-{:02}-{:02}", 1 + (i % 12), day),
                )
            })
            .collect()
    }

    fn county_state(county: County) -> FilterState {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::County);
        state.select_county(county);
        state
    }

    #[tokio::test]
    async fn test_remote_refresh_publishes_count_and_rows() {
        let transport = Arc::new(FakeTransport::new(|query| {
            if query.is_count() {
                Ok(json!([{ "count": "42" }]))
            } else {
                Ok(rows_json(&kent_rows(25)))
            }
        }));
        let config = FetcherConfig::remote().with_app_token(AppToken::new("tok"));
        let fetcher = DataFetcher::new(transport.clone(), config);
        assert_eq!(fetcher.status(), FetchStatus::Loading);

        let predicate = fetcher.query_builder().build(&county_state(County::Kent));
        let outcome = fetcher.refresh(&predicate).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Applied {
                generation: 1,
                total_count: 42,
                rows: 25
            }
        );

        let view = fetcher.snapshot();
        assert_eq!(view.status, FetchStatus::Ready);
        assert_eq!(view.results.total_count, 42);
        assert_eq!(view.results.rows.len(), 25);
        assert!(view
            .results
            .rows
            .windows(2)
            .all(|w| w[0].inspection_date >= w[1].inspection_date));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.is_count());
        let where_clause = calls[1].0.where_clause.clone().unwrap();
        assert!(where_clause.starts_with("insp_type in('Complaint','Follow-up') AND restcity in("));
        assert!(where_clause.contains("'Dover'"));
        assert_eq!(calls[1].0.limit, Some(200));
        assert_eq!(calls[1].0.order.as_deref(), Some("insp_date DESC"));
        assert!(calls.iter().all(|(_, token)| token.as_deref() == Some("tok")));
    }

    #[tokio::test]
    async fn test_rows_are_capped() {
        let transport = Arc::new(FakeTransport::new(|query| {
            if query.is_count() {
                Ok(json!([{ "count": 900 }]))
            } else {
                Ok(rows_json(&kent_rows(30)))
            }
        }));
        let fetcher = DataFetcher::new(transport, FetcherConfig::remote().with_row_limit(10));
        fetcher.refresh(&Predicate::default()).await.unwrap();
        let view = fetcher.snapshot();
        assert_eq!(view.results.total_count, 900);
        assert_eq!(view.results.rows.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let slow = Duration::from_millis(300);
        let transport = Arc::new(
            FakeTransport::new(|query| {
                let is_sussex = query
                    .where_clause
                    .as_deref()
                    .is_some_and(|w| w.contains("'Lewes'"));
                match (query.is_count(), is_sussex) {
                    (true, true) => Ok(json!([{ "count": "7" }])),
                    (true, false) => Ok(json!([{ "count": "3" }])),
                    (false, true) => Ok(rows_json(&[sample_record(
                        "SUSSEX GRILL",
                        "Lewes",
                        "19958",
                        "2024-02-01",
                    )])),
                    (false, false) => Ok(rows_json(&[sample_record(
                        "KENT DINER",
                        "Dover",
                        "19901",
                        "2024-02-01",
                    )])),
                }
            })
            .delay_where("'Lewes'", slow),
        );
        let fetcher = DataFetcher::new(transport, FetcherConfig::remote());
        let builder = fetcher.query_builder();
        let first = builder.build(&county_state(County::Sussex));
        let second = builder.build(&county_state(County::Kent));

        let (p1, p2) = tokio::join!(fetcher.refresh(&first), fetcher.refresh(&second));

        assert_eq!(p1.unwrap(), RefreshOutcome::Superseded { generation: 1 });
        assert!(matches!(p2.unwrap(), RefreshOutcome::Applied { generation: 2, .. }));

        let view = fetcher.snapshot();
        assert_eq!(view.generation, 2);
        assert_eq!(view.results.total_count, 3);
        assert_eq!(view.results.rows[0].restaurant_name, "KENT DINER");
        assert_eq!(view.status, FetchStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refinement_keeps_previous_rows_while_fetching() {
        let transport = Arc::new(
            FakeTransport::new(|query| {
                let is_kent = query
                    .where_clause
                    .as_deref()
                    .is_some_and(|w| w.contains("'Dover'"));
                match (query.is_count(), is_kent) {
                    (true, _) => Ok(json!([{ "count": "1" }])),
                    (false, true) => Ok(rows_json(&[sample_record(
                        "KENT DINER",
                        "Dover",
                        "19901",
                        "2024-03-01",
                    )])),
                    (false, false) => Ok(rows_json(&[sample_record(
                        "FIRST DINER",
                        "Newark",
                        "19711",
                        "2024-01-01",
                    )])),
                }
            })
            .delay_where("'Dover'", Duration::from_millis(300)),
        );
        let fetcher = Arc::new(DataFetcher::new(transport, FetcherConfig::remote()));
        fetcher.refresh(&Predicate::default()).await.unwrap();
        assert_eq!(fetcher.status(), FetchStatus::Ready);

        let kent = fetcher.query_builder().build(&county_state(County::Kent));
        let task = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.refresh(&kent).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let in_flight = fetcher.snapshot();
        assert_eq!(in_flight.status, FetchStatus::Fetching);
        assert_eq!(in_flight.results.rows.len(), 1);
        assert_eq!(in_flight.results.rows[0].restaurant_name, "FIRST DINER");

        task.await.unwrap().unwrap();
        let view = fetcher.snapshot();
        assert_eq!(view.status, FetchStatus::Ready);
        assert_eq!(view.results.rows[0].restaurant_name, "KENT DINER");
    }

    #[test]
    fn test_generation_is_reserved_at_begin() {
        let transport = Arc::new(FakeTransport::new(|_| Ok(json!([]))));
        let fetcher = DataFetcher::new(transport.clone(), FetcherConfig::remote());
        assert_eq!(fetcher.begin(), 1);
        assert_eq!(fetcher.begin(), 2);
        assert_eq!(fetcher.current_generation(), 2);
        assert_eq!(fetcher.status(), FetchStatus::Loading);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_terminal() {
        let transport = Arc::new(FakeTransport::new(|_| {
            Err(FetchError::Status {
                status: 500,
                body: "oops".to_string(),
            })
        }));
        let fetcher = DataFetcher::new(transport.clone(), FetcherConfig::remote());

        assert!(fetcher.refresh(&Predicate::default()).await.is_err());
        assert_eq!(
            fetcher.status(),
            FetchStatus::Failed("Failed to fetch restaurant violations".to_string())
        );

        let calls_before = transport.calls().len();
        let outcome = fetcher.refresh(&Predicate::default()).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Halted);
        assert_eq!(transport.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_malformed_count_fails() {
        let transport = Arc::new(FakeTransport::new(|_| Ok(json!({ "error": "nope" }))));
        let fetcher = DataFetcher::new(transport, FetcherConfig::remote());
        let err = fetcher.refresh(&Predicate::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_city_list_sorted_and_deduplicated() {
        let transport = Arc::new(FakeTransport::new(|query| {
            assert!(query.is_city_list());
            Ok(json!([
                { "restcity": "Newark" },
                { "restcity": "Dover" },
                { "restcity": "Newark" },
                { "other": "ignored" }
            ]))
        }));
        let fetcher = DataFetcher::new(transport, FetcherConfig::remote());
        let cities = fetcher.load_cities().await;
        assert_eq!(cities, vec!["Dover", "Newark"]);
        assert_eq!(fetcher.snapshot().results.cities, cities);
    }

    #[tokio::test]
    async fn test_city_failure_is_not_fatal() {
        let transport = Arc::new(FakeTransport::new(|query| {
            if query.is_city_list() {
                Err(FetchError::Transport("dns".to_string()))
            } else if query.is_count() {
                Ok(json!([{ "count": "2" }]))
            } else {
                Ok(rows_json(&kent_rows(2)))
            }
        }));
        let fetcher = DataFetcher::new(transport, FetcherConfig::remote());
        assert!(fetcher.load_cities().await.is_empty());
        assert_eq!(fetcher.status(), FetchStatus::Loading);

        fetcher.refresh(&Predicate::default()).await.unwrap();
        assert_eq!(fetcher.status(), FetchStatus::Ready);
        assert_eq!(fetcher.snapshot().results.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_cities_survive_refresh() {
        let transport = Arc::new(FakeTransport::new(|query| {
            if query.is_city_list() {
                Ok(json!([{ "restcity": "Dover" }]))
            } else if query.is_count() {
                Ok(json!([{ "count": "0" }]))
            } else {
                Ok(json!([]))
            }
        }));
        let fetcher = DataFetcher::new(transport, FetcherConfig::remote());
        fetcher.load_cities().await;
        fetcher.refresh(&Predicate::default()).await.unwrap();
        assert_eq!(fetcher.snapshot().results.cities, vec!["Dover"]);
    }

    #[tokio::test]
    async fn test_local_strategy_filters_in_memory() {
        let dataset = vec![
            sample_record("OLD MILL", "Lewes", "19958", "2022-05-01"),
            sample_record("PIZZA PLACE", "Dover", "19901", "2024-05-01"),
            sample_record("PIZZA BARN", "Lewes", "19958", "2023-05-01"),
            sample_record("TACO STOP", "Newark", "19711", "2024-07-01"),
        ];
        let body = rows_json(&dataset);
        let transport = Arc::new(FakeTransport::new(move |_| Ok(body.clone())));
        let config = FetcherConfig::local();
        assert_eq!(config.base_predicate, BasePredicate::None);
        let fetcher = DataFetcher::new(transport.clone(), config);

        let cities = fetcher.load_cities().await;
        assert_eq!(cities, vec!["Dover", "Lewes", "Newark"]);

        let mut state = FilterState::new();
        state.set_mode(FilterMode::Restaurant);
        state.set_debounced_search_text("pizza");
        let predicate = fetcher.query_builder().build(&state);
        fetcher.refresh(&predicate).await.unwrap();

        let view = fetcher.snapshot();
        assert_eq!(view.results.total_count, 2);
        let names: Vec<_> = view
            .results
            .rows
            .iter()
            .map(|r| r.restaurant_name.as_str())
            .collect();
        assert_eq!(names, vec!["PIZZA PLACE", "PIZZA BARN"]);

        let sussex = fetcher.query_builder().build(&county_state(County::Sussex));
        fetcher.refresh(&sussex).await.unwrap();
        assert_eq!(fetcher.snapshot().results.total_count, 2);

        // One dataset pull serves cities and both refreshes
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.limit, Some(FetcherConfig::local().dataset_limit));
        assert!(calls[0].0.where_clause.is_none());
    }

    #[test]
    fn test_decode_count_variants() {
        assert_eq!(decode_count(&json!([{ "count": "12" }])).unwrap(), 12);
        assert_eq!(decode_count(&json!([{ "count": 5 }])).unwrap(), 5);
        assert!(decode_count(&json!([])).is_err());
        assert!(decode_count(&json!([{ "count": "many" }])).is_err());
    }
}
