// Rates module - ECB reference rate resolution with fallback and caching

pub mod ecb;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::RateError;

pub use ecb::{fetch_rate_history, EcbRateHistory};

/// Maximum calendar days to step back when a date has no published rate.
/// Bounds the fallback search so an extended feed outage fails fast
/// instead of walking arbitrarily far into the past.
pub const MAX_LOOKBACK_DAYS: u32 = 7;

/// A source of daily EUR reference rates. Implemented by the parsed ECB
/// feed in production and by fakes in tests.
pub trait RateSource: Send + Sync {
    /// Units of `currency` per EUR on `date`, if a rate was published.
    fn lookup(&self, currency: &str, date: NaiveDate) -> Option<Decimal>;
}

/// Resolves (currency, date) pairs against a rate source, stepping back
/// to the most recent prior business day when the exact date has no
/// published rate (weekends, holidays).
///
/// Resolutions are cached for the run under the requested date; repeat
/// queries never re-hit the source. The cache is Mutex-guarded so
/// callers may process documents concurrently; entries are immutable
/// once inserted.
pub struct RateResolver {
    source: Box<dyn RateSource>,
    cache: Mutex<HashMap<(String, NaiveDate), Decimal>>,
}

impl RateResolver {
    pub fn new(source: impl RateSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the rate for converting `currency` amounts into EUR on
    /// `date`. EUR short-circuits to 1.0 without touching the source.
    pub fn resolve(&self, currency: &str, date: NaiveDate) -> Result<Decimal, RateError> {
        if currency == "EUR" {
            return Ok(Decimal::ONE);
        }

        let key = (currency.to_string(), date);
        if let Ok(cache) = self.cache.lock() {
            if let Some(rate) = cache.get(&key) {
                return Ok(*rate);
            }
        }

        for step in 0..=MAX_LOOKBACK_DAYS {
            let probe = date - Duration::days(i64::from(step));
            if let Some(rate) = self.source.lookup(currency, probe) {
                if step > 0 {
                    debug!(
                        "No {} rate on {}, using prior business day {}",
                        currency, date, probe
                    );
                }
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(key, rate);
                }
                return Ok(rate);
            }
        }

        Err(RateError::Unavailable {
            currency: currency.to_string(),
            date,
            lookback: MAX_LOOKBACK_DAYS,
        })
    }

    /// Convert an amount in `currency` to EUR at the rate for `date`.
    /// Reference rates quote currency units per EUR, so conversion divides.
    pub fn convert_to_eur(
        &self,
        amount: Decimal,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal, RateError> {
        let rate = self.resolve(currency, date)?;
        Ok(amount / rate)
    }

    pub fn cache_size(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}
