// Broker module - statement format detection and per-broker extractors

pub mod detector;
pub mod interactive_brokers;
pub mod saxo;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub use detector::detect;
pub use interactive_brokers::InteractiveBrokersExtractor;
pub use saxo::SaxoExtractor;

/// Supported broker statement formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BrokerKind {
    InteractiveBrokers,
    SaxoBank,
}

impl BrokerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerKind::InteractiveBrokers => "Interactive Brokers",
            BrokerKind::SaxoBank => "Saxo Bank",
        }
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade direction. Sign conventions in source formats are normalized
/// into this enum; `TradeRecord::quantity` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized trade line parsed from a statement
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub broker: BrokerKind,
    pub trade_date: NaiveDate,
    pub instrument: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    /// Unit price in `currency`
    pub price: Decimal,
    /// ISO currency code of the statement line
    pub currency: String,
    /// Statement-line value in `currency`, before EUR conversion
    pub gross_value: Decimal,
}

/// Why a statement line was excluded from extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Line sits in a recognized section but failed to parse
    MalformedLine,
    /// Non-equity instrument (forex, option, bond); rejected, never
    /// silently included in totals
    UnsupportedInstrument,
    /// Parsed record violated an invariant (zero quantity, negative value)
    InvalidRecord,
}

/// Line-level extraction diagnostic, accumulated instead of thrown
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// 1-indexed line number in the statement text
    pub line: usize,
    pub content: String,
    pub kind: DiagnosticKind,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(
        line: usize,
        content: impl Into<String>,
        kind: DiagnosticKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            line,
            content: content.into(),
            kind,
            reason: reason.into(),
        }
    }
}

/// Result of extracting one statement: parsed records plus the
/// diagnostics for every line that was rejected. A malformed line never
/// aborts extraction of the remaining lines.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<TradeRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Add a record after checking the record invariants. Records with a
    /// non-positive quantity or negative gross value are turned into
    /// diagnostics instead of entering the result.
    pub fn push_checked(&mut self, record: TradeRecord, line: usize, content: &str) {
        if record.quantity <= Decimal::ZERO {
            self.diagnostics.push(Diagnostic::new(
                line,
                content,
                DiagnosticKind::InvalidRecord,
                format!("quantity must be positive, got {}", record.quantity),
            ));
            return;
        }
        if record.gross_value < Decimal::ZERO {
            self.diagnostics.push(Diagnostic::new(
                line,
                content,
                DiagnosticKind::InvalidRecord,
                format!("gross value must not be negative, got {}", record.gross_value),
            ));
            return;
        }
        debug!(
            "Extracted {} {} x{} {} on {}",
            record.side, record.instrument, record.quantity, record.currency, record.trade_date
        );
        self.records.push(record);
    }
}

/// Contract implemented by every supported broker format.
///
/// Adding a broker means adding one implementation plus one entry in
/// [`registry`]; detection and the pipeline stay untouched.
pub trait StatementExtractor: Send + Sync {
    fn kind(&self) -> BrokerKind;

    /// Literal marker substrings unique to this broker's statements,
    /// used by the detector.
    fn markers(&self) -> &'static [&'static str];

    /// Parse the statement text into normalized trade records. An empty
    /// trades section yields zero records, not an error.
    fn extract(&self, text: &str) -> Extraction;
}

/// Registered extractors, in detection priority order. If markers from
/// several brokers co-occur in malformed input, the first registered
/// broker wins.
pub fn registry() -> &'static [&'static dyn StatementExtractor] {
    static REGISTRY: &[&dyn StatementExtractor] = &[&InteractiveBrokersExtractor, &SaxoExtractor];
    REGISTRY
}

/// Detect the broker that produced `text` and run its extractor.
/// `None` means no extractor is available for this document.
pub fn extract_auto(text: &str) -> Option<(BrokerKind, Extraction)> {
    let extractor = detector::detect_extractor(text)?;
    Some((extractor.kind(), extractor.extract(text)))
}
