// Saxo Bank "Transactie- en saldorapport" parser (Dutch locale)
//
// One transaction per line, columns roughly: Transactiedatum,
// Valutadatum, Order-ID, asset class, instrument, currency, type
// (Koop/Verkoop), quantity, price, FX rate, Boekingsbedrag. Dates use
// Dutch month abbreviations; amounts use Belgian number formatting.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use super::{
    BrokerKind, Diagnostic, DiagnosticKind, Extraction, StatementExtractor, TradeRecord, TradeSide,
};
use crate::utils::parse_belgian_decimal;

static DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})-(jan|feb|mrt|apr|mei|jun|jul|aug|sep|okt|nov|dec)-(\d{4})").unwrap()
});

static CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(EUR|USD|GBP|CAD|AUD|JPY|CHF|SEK|NOK)\b").unwrap());

/// Quantity follows the type and state columns: "Koop OPENING 655",
/// "Verkoop SLUITEN -889"
static QUANTITY_AFTER_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Koop|Verkoop)\s+\w+\s+(-?[\d.,]+)").unwrap());

/// Fallback for rows without a position-state column
static QUANTITY_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Koop|Verkoop).*?(-?[\d.,]+)\s+[\d,]+").unwrap());

/// Belgian-formatted amounts: `-26.625,96`
static BELGIAN_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?[\d.]+,\d{2}").unwrap());

/// Amounts below this are FX rates (typically 1,0000), not booking amounts
const MIN_BOOKING_AMOUNT: Decimal = dec!(2);

pub struct SaxoExtractor;

impl StatementExtractor for SaxoExtractor {
    fn kind(&self) -> BrokerKind {
        BrokerKind::SaxoBank
    }

    fn markers(&self) -> &'static [&'static str] {
        &["Saxo Bank", "Transacties"]
    }

    fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            let line_no = idx + 1;

            // Cash movements are not trades
            if line.contains("Cashbedrag") || line.contains("Storting/opname") {
                continue;
            }

            let Some(date_caps) = DATE_PREFIX.captures(line) else {
                continue;
            };
            let is_buy = line.contains("Koop");
            let is_sell = line.contains("Verkoop");
            if !is_buy && !is_sell {
                continue;
            }

            // Only the Aandelen (equities) asset class is taxable here;
            // bonds, options and other classes are rejected explicitly.
            if !line.contains("Aandelen") {
                extraction.diagnostics.push(Diagnostic::new(
                    line_no,
                    line,
                    DiagnosticKind::UnsupportedInstrument,
                    "non-equity asset class (only Aandelen transactions are supported)",
                ));
                continue;
            }

            let trade_date = match parse_dutch_date(&date_caps) {
                Some(date) => date,
                None => {
                    extraction.diagnostics.push(Diagnostic::new(
                        line_no,
                        line,
                        DiagnosticKind::MalformedLine,
                        "unparseable transaction date",
                    ));
                    continue;
                }
            };

            match parse_trade_line(trade_date, line, is_sell) {
                Ok(record) => extraction.push_checked(record, line_no, line),
                Err(reason) => {
                    extraction.diagnostics.push(Diagnostic::new(
                        line_no,
                        line,
                        DiagnosticKind::MalformedLine,
                        reason,
                    ));
                }
            }
        }

        info!(
            "Extracted {} trade records ({} diagnostics) from Saxo Bank statement",
            extraction.records.len(),
            extraction.diagnostics.len()
        );
        extraction
    }
}

fn parse_dutch_date(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mrt" => 3,
        "apr" => 4,
        "mei" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "okt" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_trade_line(
    trade_date: NaiveDate,
    line: &str,
    is_sell: bool,
) -> Result<TradeRecord, String> {
    // Instrument name sits between the asset class and the currency code
    let aandelen_idx = line
        .find("Aandelen")
        .ok_or_else(|| "missing asset class column".to_string())?;
    let after_class = line[aandelen_idx + "Aandelen".len()..].trim();

    let currency_match = CURRENCY_CODE
        .find(after_class)
        .ok_or_else(|| "no currency code found".to_string())?;
    let currency = currency_match.as_str().to_string();
    let instrument = after_class[..currency_match.start()].trim().to_string();
    if instrument.is_empty() {
        return Err("empty instrument name".to_string());
    }

    let quantity = parse_quantity(line)?;

    // The booking amount is the largest Belgian-formatted figure on the
    // line; FX rates (around 1,0000) fall below the threshold.
    let booking = BELGIAN_AMOUNT
        .find_iter(line)
        .filter_map(|m| parse_belgian_decimal(m.as_str()).ok())
        .map(|amount| amount.abs())
        .filter(|amount| *amount >= MIN_BOOKING_AMOUNT)
        .max()
        .ok_or_else(|| "no booking amount found".to_string())?;

    let side = if is_sell {
        TradeSide::Sell
    } else {
        TradeSide::Buy
    };

    let price = if quantity > Decimal::ZERO {
        booking / quantity
    } else {
        Decimal::ZERO
    };

    Ok(TradeRecord {
        broker: BrokerKind::SaxoBank,
        trade_date,
        instrument,
        side,
        quantity,
        price,
        currency,
        gross_value: booking,
    })
}

fn parse_quantity(line: &str) -> Result<Decimal, String> {
    let caps = QUANTITY_AFTER_TYPE
        .captures(line)
        .or_else(|| QUANTITY_FALLBACK.captures(line))
        .ok_or_else(|| "no quantity found after Koop/Verkoop".to_string())?;

    let raw = caps
        .get(2)
        .map(|m| m.as_str())
        .ok_or_else(|| "no quantity found after Koop/Verkoop".to_string())?;

    // Quantities are whole share counts; strip separators and sign
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i64>()
        .map(Decimal::from)
        .map_err(|_| format!("unparseable quantity: '{}'", raw))
}
