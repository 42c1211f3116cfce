// Interactive Brokers activity statement parser
//
// IBKR statements list stock trades under per-currency sections. Each
// trade spans two text lines: a "YYYY-MM-DD, HH:MM:SS" timestamp line
// followed by a data row "SYMBOL QTY T.PRICE [C.PRICE] PROCEEDS ...".
// Numbers use US formatting with comma thousand separators.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::info;

use super::{
    BrokerKind, Diagnostic, DiagnosticKind, Extraction, StatementExtractor, TradeRecord, TradeSide,
};
use crate::utils::parse_plain_decimal;

/// Currency headers that open a stocks block in the trades section
const CURRENCY_SECTIONS: &[&str] = &[
    "JPY", "USD", "GBP", "EUR", "CAD", "AUD", "SEK", "NOK", "CHF", "HKD", "SGD",
];

/// Column header of the forex subsection, which terminates the stocks block
const FOREX_HEADER: &str = "Symbol Date/Time Quantity T. Price Proceeds";

static DATE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2},").unwrap());

pub struct InteractiveBrokersExtractor;

impl StatementExtractor for InteractiveBrokersExtractor {
    fn kind(&self) -> BrokerKind {
        BrokerKind::InteractiveBrokers
    }

    fn markers(&self) -> &'static [&'static str] {
        &["Interactive Brokers"]
    }

    fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let lines: Vec<&str> = text.lines().collect();
        let mut current_currency: Option<&str> = None;

        for (idx, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            let line_no = idx + 1;

            if CURRENCY_SECTIONS.contains(&line) {
                current_currency = Some(line);
                continue;
            }

            // Section terminators: currency totals, forex subsection
            if line.contains("Total in") || line.contains("Forex") || line.contains(FOREX_HEADER) {
                current_currency = None;
                continue;
            }

            let Some(currency) = current_currency else {
                continue;
            };
            if !DATE_LINE.is_match(line) {
                continue;
            }

            let date_str = line.split(',').next().unwrap_or(line);
            let trade_date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(date) => date,
                Err(_) => {
                    extraction.diagnostics.push(Diagnostic::new(
                        line_no,
                        line,
                        DiagnosticKind::MalformedLine,
                        format!("unparseable trade date: '{}'", date_str),
                    ));
                    continue;
                }
            };

            let Some(data_line) = lines.get(idx + 1).map(|l| l.trim()) else {
                extraction.diagnostics.push(Diagnostic::new(
                    line_no,
                    line,
                    DiagnosticKind::MalformedLine,
                    "timestamp line without a following data row",
                ));
                continue;
            };

            match parse_data_row(trade_date, currency, data_line) {
                RowOutcome::Trade(record) => {
                    extraction.push_checked(record, line_no + 1, data_line);
                }
                RowOutcome::Skip => {}
                RowOutcome::Reject(kind, reason) => {
                    extraction
                        .diagnostics
                        .push(Diagnostic::new(line_no + 1, data_line, kind, reason));
                }
            }
        }

        info!(
            "Extracted {} trade records ({} diagnostics) from Interactive Brokers statement",
            extraction.records.len(),
            extraction.diagnostics.len()
        );
        extraction
    }
}

enum RowOutcome {
    Trade(TradeRecord),
    Skip,
    Reject(DiagnosticKind, String),
}

fn parse_data_row(trade_date: NaiveDate, currency: &str, line: &str) -> RowOutcome {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return RowOutcome::Reject(
            DiagnosticKind::MalformedLine,
            format!("expected at least 4 columns, found {}", parts.len()),
        );
    }

    let symbol = parts[0];
    if symbol.starts_with("Total") {
        return RowOutcome::Skip;
    }
    if is_forex_pair(symbol) {
        return RowOutcome::Reject(
            DiagnosticKind::UnsupportedInstrument,
            format!("forex pair '{}' is not a taxable equity trade", symbol),
        );
    }

    let signed_quantity = match parse_plain_decimal(parts[1]) {
        Ok(quantity) => quantity,
        Err(_) => {
            return RowOutcome::Reject(
                DiagnosticKind::MalformedLine,
                format!("unparseable quantity: '{}'", parts[1]),
            )
        }
    };
    let side = if signed_quantity < Decimal::ZERO {
        TradeSide::Sell
    } else {
        TradeSide::Buy
    };

    let price = match parse_plain_decimal(parts[2]) {
        Ok(price) => price,
        Err(_) => {
            return RowOutcome::Reject(
                DiagnosticKind::MalformedLine,
                format!("unparseable price: '{}'", parts[2]),
            )
        }
    };

    // The C.Price column is optional. A price carries exactly 4 decimal
    // places; proceeds are comma-grouped figures without that pattern.
    let proceeds_col = if parts.len() >= 5 && has_four_decimals(parts[3]) {
        parts[4]
    } else {
        parts[3]
    };
    let proceeds = match parse_plain_decimal(proceeds_col) {
        Ok(proceeds) => proceeds,
        Err(_) => {
            return RowOutcome::Reject(
                DiagnosticKind::MalformedLine,
                format!("unparseable proceeds: '{}'", proceeds_col),
            )
        }
    };

    RowOutcome::Trade(TradeRecord {
        broker: BrokerKind::InteractiveBrokers,
        trade_date,
        instrument: symbol.to_string(),
        side,
        quantity: signed_quantity.abs(),
        price,
        currency: currency.to_string(),
        gross_value: proceeds.abs(),
    })
}

fn has_four_decimals(column: &str) -> bool {
    match column.rsplit_once('.') {
        Some((_, decimals)) => decimals.len() == 4 && decimals.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Forex symbols are currency pairs like `USD.JPY`; stock symbols with a
/// dot suffix (`3836.T`) never split into two 3-letter halves.
fn is_forex_pair(symbol: &str) -> bool {
    match symbol.split_once('.') {
        Some((base, quote)) => base.len() == 3 && quote.len() == 3 && !quote.contains('.'),
        None => false,
    }
}
