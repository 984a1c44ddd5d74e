//! Core rate cache and its collaborators

pub mod cache;
pub mod clock;
pub mod config;
pub mod fetch;
pub mod log;
pub mod path;
pub mod rates;

// Re-export main types for cleaner imports
pub use cache::{RateCache, ResponseSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, CurrencySources, SourceSpec};
pub use fetch::{FetchResponse, RateFetcher};
pub use log::{ErrorLog, TracingErrorLog};
pub use rates::{RateEntry, RateTable, RatesResponse};
