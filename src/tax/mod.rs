// Tax module - transaction grouping and TOB rate/cap arithmetic

pub mod grouping;
pub mod tob;

pub use grouping::{convert_group, group_trades, GroupKey, GroupedTransaction, TradeGroup};
pub use tob::{compute_tob, TaxResult, TOB_CAP, TOB_RATE};
