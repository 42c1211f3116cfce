//! TOB rate and cap arithmetic

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::GroupedTransaction;

/// TOB rate for standard equity transactions (0.35%)
pub const TOB_RATE: Decimal = dec!(0.0035);

/// Maximum tax chargeable on a single grouped transaction
pub const TOB_CAP: Decimal = dec!(1600);

/// Computed tax for one grouped transaction. Values keep full
/// precision; half-up rounding to cents happens at reporting only.
#[derive(Debug, Clone, Serialize)]
pub struct TaxResult {
    pub base_value_eur: Decimal,
    pub rate_applied: Decimal,
    pub raw_tax: Decimal,
    pub capped_tax: Decimal,
}

/// Tax one grouped transaction: rate times EUR value, capped. Both buy
/// and sell groups are taxed; there is no netting between the legs of a
/// day trade.
pub fn compute_tob(group: &GroupedTransaction) -> TaxResult {
    let raw_tax = group.total_value_eur * TOB_RATE;
    let capped_tax = raw_tax.min(TOB_CAP);

    TaxResult {
        base_value_eur: group.total_value_eur,
        rate_applied: TOB_RATE,
        raw_tax,
        capped_tax,
    }
}
