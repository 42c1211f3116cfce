//! ECB euro reference rate feed
//!
//! Downloads the full historical `eurofxref-hist.xml` feed once per run
//! and parses it into an in-memory table. The feed is a flat sequence of
//! `<Cube time='YYYY-MM-DD'>` day elements, each containing
//! `<Cube currency='USD' rate='1.0834'/>` children, so a single scan
//! over the Cube tags is enough; no XML tree is needed.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::RateSource;

const ECB_HIST_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-hist.xml";

/// Bounded retry on the feed download; a persistent failure surfaces as
/// an error, never an infinite retry.
const FETCH_ATTEMPTS: u32 = 3;

static CUBE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<Cube\s+(?:time=['"](\d{4}-\d{2}-\d{2})['"]|currency=['"]([A-Z]{3})['"]\s+rate=['"]([0-9.]+)['"])"#,
    )
    .unwrap()
});

/// Parsed daily reference rate table: date -> currency -> rate.
/// Immutable once parsed.
#[derive(Debug, Default)]
pub struct EcbRateHistory {
    rates: BTreeMap<NaiveDate, HashMap<String, Decimal>>,
}

impl EcbRateHistory {
    /// Parse the raw feed XML into a rate table. Every published day
    /// also carries the implicit EUR -> EUR rate of 1.0.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut rates: BTreeMap<NaiveDate, HashMap<String, Decimal>> = BTreeMap::new();
        let mut current_day: Option<NaiveDate> = None;

        for caps in CUBE_TAG.captures_iter(xml) {
            if let Some(time) = caps.get(1) {
                let date = NaiveDate::parse_from_str(time.as_str(), "%Y-%m-%d")
                    .with_context(|| format!("invalid date in ECB feed: {}", time.as_str()))?;
                rates
                    .entry(date)
                    .or_default()
                    .insert("EUR".to_string(), Decimal::ONE);
                current_day = Some(date);
                continue;
            }

            let (Some(currency), Some(rate)) = (caps.get(2), caps.get(3)) else {
                continue;
            };
            let Some(date) = current_day else {
                warn!("Currency cube before any date cube, skipping");
                continue;
            };
            let rate = Decimal::from_str(rate.as_str())
                .with_context(|| format!("invalid rate in ECB feed: {}", rate.as_str()))?;
            rates
                .entry(date)
                .or_default()
                .insert(currency.as_str().to_string(), rate);
        }

        if rates.is_empty() {
            return Err(anyhow!("ECB feed contained no rate data"));
        }
        Ok(Self { rates })
    }

    /// Number of published days in the table
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl RateSource for EcbRateHistory {
    fn lookup(&self, currency: &str, date: NaiveDate) -> Option<Decimal> {
        self.rates.get(&date).and_then(|day| day.get(currency)).copied()
    }
}

/// Download and parse the full historical feed, with bounded retry and
/// linear backoff between attempts.
pub async fn fetch_rate_history() -> Result<EcbRateHistory> {
    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; TobcalcBot/1.0)")
        .timeout(Duration::from_secs(30))
        .build()?;

    let mut last_error = None;
    for attempt in 1..=FETCH_ATTEMPTS {
        match try_fetch(&client).await {
            Ok(history) => {
                info!("Fetched ECB reference rates for {} days", history.len());
                return Ok(history);
            }
            Err(e) => {
                warn!(
                    "ECB feed fetch attempt {}/{} failed: {}",
                    attempt, FETCH_ATTEMPTS, e
                );
                last_error = Some(e);
                if attempt < FETCH_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("ECB feed fetch failed")))
        .context("failed to fetch ECB reference rate feed")
}

async fn try_fetch(client: &Client) -> Result<EcbRateHistory> {
    let response = client
        .get(ECB_HIST_URL)
        .send()
        .await
        .context("failed to send request to ECB")?;

    if !response.status().is_success() {
        return Err(anyhow!("ECB returned error status: {}", response.status()));
    }

    let xml = response
        .text()
        .await
        .context("failed to read ECB feed body")?;
    EcbRateHistory::parse(&xml)
}
