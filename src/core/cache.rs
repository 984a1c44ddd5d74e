//! Time-gated cache of exchange rates gathered from several upstream tickers.

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{CurrencySources, DEFAULT_REFRESH_MINUTES, SourceSpec};
use crate::core::fetch::{FetchError, RateFetcher};
use crate::core::log::ErrorLog;
use crate::core::path::extract_rate;
use crate::core::rates::{RateTable, RatesResponse, STATUS_OK};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

/// Receives the single response produced by [`RateCache::index`].
pub trait ResponseSink {
    fn send(self, response: RatesResponse);
}

impl<F> ResponseSink for F
where
    F: FnOnce(RatesResponse),
{
    fn send(self, response: RatesResponse) {
        self(response)
    }
}

fn interval_from_minutes(minutes: u64) -> Duration {
    i64::try_from(minutes)
        .ok()
        .and_then(|m| m.checked_mul(60_000))
        .and_then(Duration::try_milliseconds)
        .unwrap_or(Duration::MAX)
}

pub struct RateCache {
    sources: Vec<CurrencySources>,
    fetcher: Arc<dyn RateFetcher>,
    log: Arc<dyn ErrorLog>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    last_refresh: Mutex<DateTime<Utc>>,
    rates: RwLock<RateTable>,
    // Held for the whole refresh pass so overlapping passes never run.
    refresh_guard: Mutex<()>,
    passes: AtomicU64,
}

impl RateCache {
    pub fn new(
        sources: Vec<CurrencySources>,
        fetcher: Arc<dyn RateFetcher>,
        log: Arc<dyn ErrorLog>,
        refresh_minutes: Option<u64>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        // Zero means unset, like a missing value.
        let minutes = refresh_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_REFRESH_MINUTES);
        let interval = interval_from_minutes(minutes);
        Self {
            sources,
            fetcher,
            log,
            last_refresh: Mutex::new(clock.now()),
            clock,
            interval,
            rates: RwLock::new(RateTable::new()),
            refresh_guard: Mutex::new(()),
            passes: AtomicU64::new(0),
        }
    }

    /// Replaces the time source. The refresh timestamp restarts at the new
    /// clock's `now`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.last_refresh = Mutex::new(clock.now());
        self.clock = clock;
        self
    }

    /// Starts from a previously served table instead of an empty one.
    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = RwLock::new(rates);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sources(&self) -> &[CurrencySources] {
        &self.sources
    }

    pub async fn last_refresh(&self) -> DateTime<Utc> {
        *self.last_refresh.lock().await
    }

    pub async fn rates(&self) -> RateTable {
        self.rates.read().await.clone()
    }

    /// Number of refresh passes completed since construction.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    /// Read entry point: answers through `sink` exactly once.
    pub async fn index<S: ResponseSink>(&self, sink: S) {
        sink.send(self.query().await);
    }

    /// Serves the cached rates, running a refresh pass first when the table is
    /// empty or the refresh interval has elapsed. Never fails.
    #[instrument(name = "RateQuery", skip(self))]
    pub async fn query(&self) -> RatesResponse {
        let observed = self.passes();

        if self.is_due(self.clock.now()).await {
            let _guard = self.refresh_guard.lock().await;
            // A pass that completed while we waited already answered for us.
            let now = self.clock.now();
            if self.passes() == observed && self.is_due(now).await {
                self.refresh_pass(now).await;
            } else {
                debug!("Refresh already performed by a concurrent query");
            }
        } else {
            debug!("Cache hit for rates");
        }

        RatesResponse::ok(self.rates.read().await.clone())
    }

    async fn is_due(&self, now: DateTime<Utc>) -> bool {
        let last = *self.last_refresh.lock().await;
        let elapsed = last
            .checked_add_signed(self.interval)
            .is_some_and(|next| now >= next);
        elapsed || self.rates.read().await.is_empty()
    }

    #[instrument(name = "RefreshPass", skip(self))]
    async fn refresh_pass(&self, now: DateTime<Utc>) {
        *self.last_refresh.lock().await = now;
        debug!("Cache miss for rates, refreshing from upstream");

        let per_currency = self.sources.iter().map(|currency| {
            join_all(
                currency
                    .sources
                    .iter()
                    .map(|source| self.fetch_source(&currency.currency, source)),
            )
        });
        let fresh: Vec<Vec<Option<f64>>> = join_all(per_currency).await;

        self.rates.write().await.merge_pass(&self.sources, &fresh);
        self.passes.fetch_add(1, Ordering::AcqRel);
        debug!("Refresh pass complete");
    }

    async fn fetch_source(&self, currency: &str, source: &SourceSpec) -> Option<f64> {
        match self.fetch_rate(source).await {
            Ok(rate) => {
                debug!(currency, source = %source.name, rate, "Fetched rate");
                Some(rate)
            }
            Err(e) => {
                self.log.error(&format!(
                    "Failed to fetch {currency} rate from {} ({}): {e}",
                    source.name, source.url
                ));
                None
            }
        }
    }

    async fn fetch_rate(&self, source: &SourceSpec) -> Result<f64, FetchError> {
        let response = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(FetchError::Transport)?;

        if response.status != STATUS_OK {
            return Err(FetchError::Status(response.status));
        }

        let body: serde_json::Value = serde_json::from_str(&response.body)?;
        Ok(extract_rate(&body, &source.path)?)
    }
}
