//! Transaction grouping
//!
//! The TOB treats multiple same-side trades of the same instrument on
//! the same day as one taxable transaction, so values are summed before
//! the rate and cap apply: the cap is per transaction, not per fill.
//! Buys and sells never net against each other; side is part of the
//! grouping key, so a day-trade round-trip is taxed on both legs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::brokers::{BrokerKind, TradeRecord, TradeSide};
use crate::error::RateError;
use crate::rates::RateResolver;

/// Key identifying one taxable transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey {
    pub trade_date: NaiveDate,
    pub broker: BrokerKind,
    pub instrument: String,
    pub side: TradeSide,
}

impl GroupKey {
    fn for_record(record: &TradeRecord) -> Self {
        Self {
            trade_date: record.trade_date,
            broker: record.broker,
            instrument: record.instrument.clone(),
            side: record.side,
        }
    }
}

/// Same-key trades gathered before currency conversion
#[derive(Debug, Clone)]
pub struct TradeGroup {
    pub key: GroupKey,
    pub members: Vec<TradeRecord>,
}

/// The taxable unit: one group with its member values converted to EUR
/// and summed. Owns its member records.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedTransaction {
    pub key: GroupKey,
    pub members: Vec<TradeRecord>,
    pub total_quantity: Decimal,
    /// Sum of member gross values, each converted at its own
    /// trade-date rate. Full precision; rounding happens at reporting.
    pub total_value_eur: Decimal,
    /// Number of contributing trade records (audit trail)
    pub member_count: usize,
}

/// Partition records by grouping key. Output order is stable: groups
/// appear in order of first occurrence of their key, preserving
/// statement order for reporting.
pub fn group_trades(records: Vec<TradeRecord>) -> Vec<TradeGroup> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut by_key: HashMap<GroupKey, Vec<TradeRecord>> = HashMap::new();

    for record in records {
        let key = GroupKey::for_record(&record);
        if !by_key.contains_key(&key) {
            order.push(key.clone());
        }
        by_key.entry(key).or_default().push(record);
    }

    debug!("Grouped trades into {} taxable transactions", order.len());
    order
        .into_iter()
        .map(|key| {
            let members = by_key.remove(&key).unwrap_or_default();
            TradeGroup { key, members }
        })
        .collect()
}

/// Convert a group's members to EUR at each member's trade-date rate
/// and sum. A missing rate surfaces as a per-group error; the caller
/// records it and continues with the remaining groups.
pub fn convert_group(
    group: TradeGroup,
    resolver: &RateResolver,
) -> Result<GroupedTransaction, RateError> {
    let mut total_value_eur = Decimal::ZERO;
    let mut total_quantity = Decimal::ZERO;

    for member in &group.members {
        total_value_eur +=
            resolver.convert_to_eur(member.gross_value, &member.currency, member.trade_date)?;
        total_quantity += member.quantity;
    }

    Ok(GroupedTransaction {
        member_count: group.members.len(),
        key: group.key,
        members: group.members,
        total_quantity,
        total_value_eur,
    })
}
