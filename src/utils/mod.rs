//! Locale-aware number parsing and formatting helpers
//!
//! Broker statements mix two numeric locales: IBKR uses US formatting
//! (`8,680,000` / `1,736.0000`) while Saxo uses Belgian formatting
//! (`-26.625,96`). Report output uses Belgian conventions throughout.

use anyhow::{Context, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a US-formatted number: comma thousands separator, dot decimal.
///
/// Accepts plain integers (`-5,000`), prices (`1,736.0000`) and
/// proceeds (`8,680,000`).
pub fn parse_plain_decimal(text: &str) -> Result<Decimal> {
    let cleaned = text.trim().replace(',', "");
    Decimal::from_str(&cleaned).with_context(|| format!("failed to parse number: '{}'", text))
}

/// Parse a Belgian-formatted number: dot thousands separator, comma decimal.
///
/// `-26.625,96` parses to `-26625.96`.
pub fn parse_belgian_decimal(text: &str) -> Result<Decimal> {
    let cleaned = text.trim().replace('.', "").replace(',', ".");
    Decimal::from_str(&cleaned).with_context(|| format!("failed to parse number: '{}'", text))
}

/// Round a money value to 2 decimal places, half away from zero.
///
/// Applied at the reporting boundary only; intermediate sums keep full
/// precision so rounding error never compounds across groups.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a money value with Belgian locale conventions: `1.234,56`.
pub fn format_eur(value: Decimal) -> String {
    let rounded = round_money(value);
    let is_negative = rounded < Decimal::ZERO;
    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    // Thousands separators (.) on the integer part
    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    format!("{}{},{}", sign, with_separators, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(parse_plain_decimal("8,680,000").unwrap(), dec!(8680000));
        assert_eq!(parse_plain_decimal("1,736.0000").unwrap(), dec!(1736.0000));
        assert_eq!(parse_plain_decimal("-5,000").unwrap(), dec!(-5000));
        assert_eq!(parse_plain_decimal(" 42 ").unwrap(), dec!(42));
    }

    #[test]
    fn test_parse_plain_decimal_rejects_garbage() {
        assert!(parse_plain_decimal("abc").is_err());
        assert!(parse_plain_decimal("").is_err());
    }

    #[test]
    fn test_parse_belgian_decimal() {
        assert_eq!(parse_belgian_decimal("26.625,96").unwrap(), dec!(26625.96));
        assert_eq!(parse_belgian_decimal("-23.102,44").unwrap(), dec!(-23102.44));
        assert_eq!(parse_belgian_decimal("1,0000").unwrap(), dec!(1.0000));
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(35.005)), dec!(35.01));
        assert_eq!(round_money(dec!(35.004)), dec!(35.00));
        assert_eq!(round_money(dec!(-35.005)), dec!(-35.01));
    }

    #[test]
    fn test_format_eur() {
        assert_eq!(format_eur(dec!(1234.56)), "1.234,56");
        assert_eq!(format_eur(dec!(1000000)), "1.000.000,00");
        assert_eq!(format_eur(dec!(0.99)), "0,99");
        assert_eq!(format_eur(dec!(-500)), "-500,00");
        assert_eq!(format_eur(dec!(1600)), "1.600,00");
    }
}
