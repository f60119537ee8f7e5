//! Inspection Core - Filtering and fetching for the Delaware restaurant inspection dataset
//!
//! This crate provides:
//! - Violation records and result sets
//! - The static county to city map
//! - Filter state with single-active-dimension semantics
//! - A pure query builder producing SoQL or in-memory predicates
//! - A SODA transport and a data fetcher that drops stale responses
//! - A debouncer for free-text search
//! - A browse session wiring the pieces together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use inspection_core::{
//!     BrowseSession, County, DataFetcher, FetcherConfig, FilterEvent, FilterMode, HttpTransport,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = FetcherConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::new(&config.endpoint, config.timeout)?);
//! let fetcher = Arc::new(DataFetcher::new(transport, config));
//!
//! let mut session = BrowseSession::new(fetcher.clone());
//! let (_cities, first) = session.start();
//! first.await??;
//!
//! session.apply(FilterEvent::Mode(FilterMode::County));
//! if let Some(refresh) = session.apply(FilterEvent::County(County::Kent)) {
//!     refresh.await??;
//! }
//! println!("{} matching violations", fetcher.snapshot().results.total_count);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod county;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod query;
pub mod record;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::{AppToken, FetcherConfig, FilterStrategy};
pub use county::{County, CountyMap, DELAWARE_COUNTIES};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use error::{ConfigError, FailureKind, FetchError, FETCH_FAILED_MESSAGE};
pub use fetcher::{DataFetcher, FetchStatus, RefreshOutcome, ViewState};
pub use filter::{FilterMode, FilterState};
pub use query::{BasePredicate, Condition, Predicate, QueryBuilder};
pub use record::{ResultSet, ViolationRecord};
pub use session::{BrowseSession, FilterEvent};
pub use transport::{HttpTransport, SodaQuery, Transport};
