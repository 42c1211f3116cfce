//! tobcalc - Belgian TOB (beurstaks) calculator
//!
//! This library turns raw text extracted from broker statement PDFs
//! into taxable transactions: it detects the broker format, extracts
//! normalized trade records, converts non-EUR values using ECB daily
//! reference rates, groups same-day same-side trades per instrument,
//! and applies the 0.35% rate with the per-transaction cap.

pub mod brokers;
pub mod error;
pub mod pipeline;
pub mod rates;
pub mod tax;
pub mod utils;
