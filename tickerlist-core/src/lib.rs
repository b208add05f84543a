//! tickerlist core: resilient builder for an index's ticker-symbol list.
//!
//! This crate contains the whole build pipeline:
//! - HTTP fetcher behind a `Fetch` trait
//! - Format detection over JSON, CSV and HTML tables
//! - Symbol normalization with one configured share-class separator
//! - Validation: structural pattern, minimum count, must-have warnings
//! - Diff-aware, atomic artifact store behind a `SnapshotStore` trait
//! - Retry with bounded exponential backoff and a snapshot → seed fallback chain

pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod resilience;
pub mod seed;
pub mod snapshot;
pub mod symbol;
pub mod validate;

pub use config::BuildConfig;
pub use error::{BuildError, ConfigError, NetworkError, ParseError, PersistenceError, ValidationError};
pub use fetch::{Fetch, HttpFetcher};
pub use normalize::Normalizer;
pub use parse::{DocumentShape, RawDocument};
pub use pipeline::Pipeline;
pub use resilience::{
    retry_with_backoff, BuildOutcome, BuildStatus, Controller, RecordingSleeper, RetryPolicy,
    Sleeper, ThreadSleeper, EXIT_NO_ARTIFACT,
};
pub use snapshot::{ArtifactFormat, FileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore, WriteOutcome};
pub use symbol::{ClassSeparator, Symbol, SymbolSet};
pub use validate::{Validated, Validator};
