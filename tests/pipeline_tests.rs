//! End-to-end pipeline tests over synthetic statement text with an
//! injected rate source (no network).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tobcalc::brokers::{BrokerKind, TradeSide};
use tobcalc::pipeline::{DocumentOutcome, Pipeline, PipelineResult, SkipReason, StatementText};
use tobcalc::rates::{RateResolver, RateSource};
use tobcalc::tax::TOB_CAP;
use tobcalc::utils::round_money;

struct TableSource(Vec<(&'static str, NaiveDate, Decimal)>);

impl RateSource for TableSource {
    fn lookup(&self, currency: &str, date: NaiveDate) -> Option<Decimal> {
        self.0
            .iter()
            .find(|(c, d, _)| *c == currency && *d == date)
            .map(|(_, _, r)| *r)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn pipeline_with(rates: Vec<(&'static str, NaiveDate, Decimal)>) -> Pipeline {
    Pipeline::new(RateResolver::new(TableSource(rates)))
}

const IB_STATEMENT: &str = "\
Activity Statement
Interactive Brokers LLC
Trades
Stocks
USD
2025-12-01, 15:44:03
AAPL 100 230.5000 231.0000 23,050 -1.0 0 0
Total in GBP
";

const SAXO_STATEMENT: &str = "\
Saxo Bank A/S
Transactie- en saldorapport
Transacties
28-nov-2025 01-dec-2025 6494810500 Aandelen JDC Group AG EUR Verkoop SLUITEN -889 26,000 1,0000 -23.102,44
28-nov-2025 01-dec-2025 6494810501 Aandelen JDC Group AG EUR Verkoop SLUITEN -111 26,000 1,0000 -2.897,56
";

#[test]
fn processes_interactive_brokers_statement_with_usd_conversion() {
    let pipeline = pipeline_with(vec![("USD", date(2025, 12, 1), dec!(1.25))]);
    let result = pipeline.process(&[StatementText::new("ib.txt", IB_STATEMENT)]);

    assert_eq!(result.processed_count(), 1);
    let taxed: Vec<_> = result.transactions().collect();
    assert_eq!(taxed.len(), 1);

    let tx = &taxed[0].transaction;
    assert_eq!(tx.key.broker, BrokerKind::InteractiveBrokers);
    assert_eq!(tx.key.instrument, "AAPL");
    assert_eq!(tx.key.side, TradeSide::Buy);
    // 23,050 USD at 1.25 = 18,440 EUR
    assert_eq!(tx.total_value_eur, dec!(18440));
    assert_eq!(round_money(taxed[0].tax.capped_tax), dec!(64.54));
}

#[test]
fn same_day_same_side_sells_group_into_one_taxable_transaction() {
    let pipeline = pipeline_with(vec![]);
    let result = pipeline.process(&[StatementText::new("saxo.txt", SAXO_STATEMENT)]);

    let taxed: Vec<_> = result.transactions().collect();
    assert_eq!(taxed.len(), 1);
    let tx = &taxed[0].transaction;
    assert_eq!(tx.member_count, 2);
    assert_eq!(tx.total_value_eur, dec!(26000.00));
    // 26,000 EUR at 0.35% = 91.00, below cap
    assert_eq!(round_money(taxed[0].tax.capped_tax), dec!(91.00));
}

#[test]
fn unknown_broker_document_is_skipped_and_contributes_zero() {
    let pipeline = pipeline_with(vec![]);
    let documents = vec![
        StatementText::new("unknown.txt", "Degiro jaaroverzicht 2025\n"),
        StatementText::new("saxo.txt", SAXO_STATEMENT),
    ];
    let result = pipeline.process(&documents);

    assert_eq!(result.processed_count(), 1);
    assert_eq!(result.skipped_count(), 1);
    match &result.documents[0].outcome {
        DocumentOutcome::Skipped { reason, .. } => {
            assert_eq!(*reason, SkipReason::UnknownBrokerFormat);
        }
        other => panic!("expected skipped outcome, got {:?}", other),
    }
    // Totals come from the Saxo document alone.
    assert_eq!(result.total_value_eur, dec!(26000.00));
}

#[test]
fn detected_statement_without_trades_is_skipped() {
    let pipeline = pipeline_with(vec![]);
    let text = "Interactive Brokers LLC\nUSD\nTotal in GBP\n";
    let result = pipeline.process(&[StatementText::new("empty.txt", text)]);

    assert_eq!(result.skipped_count(), 1);
    match &result.documents[0].outcome {
        DocumentOutcome::Skipped { reason, .. } => {
            assert_eq!(*reason, SkipReason::NoUsableRecords);
        }
        other => panic!("expected skipped outcome, got {:?}", other),
    }
}

#[test]
fn malformed_line_yields_one_record_and_one_diagnostic() {
    let text = "\
Interactive Brokers LLC
USD
2025-12-01, 15:44:03
AAPL garbage 230.5000 23,050
2025-12-01, 15:50:00
MSFT 50 410.0000 411.0000 20,500 -1.0
Total in GBP
";
    let pipeline = pipeline_with(vec![("USD", date(2025, 12, 1), dec!(1.25))]);
    let result = pipeline.process(&[StatementText::new("ib.txt", text)]);

    match &result.documents[0].outcome {
        DocumentOutcome::Processed {
            transactions,
            diagnostics,
            ..
        } => {
            assert_eq!(transactions.len(), 1);
            assert_eq!(transactions[0].transaction.key.instrument, "MSFT");
            assert_eq!(diagnostics.len(), 1);
        }
        other => panic!("expected processed outcome, got {:?}", other),
    }
}

#[test]
fn weekend_trade_uses_prior_business_day_rate() {
    // Sunday 2025-11-30 has no published rate; Friday 2025-11-28 does.
    let text = "\
Interactive Brokers LLC
USD
2025-11-30, 10:00:00
AAPL 10 100.0000 101.0000 1,000 -1.0
Total in GBP
";
    let pipeline = pipeline_with(vec![("USD", date(2025, 11, 28), dec!(1.25))]);
    let result = pipeline.process(&[StatementText::new("ib.txt", text)]);

    let taxed: Vec<_> = result.transactions().collect();
    assert_eq!(taxed.len(), 1);
    assert_eq!(taxed[0].transaction.total_value_eur, dec!(800));
}

#[test]
fn missing_rate_fails_only_the_affected_transaction() {
    // Two currency sections; only USD has a published rate.
    let text = "\
Interactive Brokers LLC
USD
2025-12-01, 15:44:03
AAPL 100 230.5000 231.0000 23,050 -1.0
Total in GBP
JPY
2025-12-01, 09:31:22
3836.T -5,000 1,736.0000 1,730.0000 8,680,000 -4,577.06
Total in GBP
";
    let pipeline = pipeline_with(vec![("USD", date(2025, 12, 1), dec!(1.25))]);
    let result = pipeline.process(&[StatementText::new("ib.txt", text)]);

    match &result.documents[0].outcome {
        DocumentOutcome::Processed {
            transactions,
            failed,
            ..
        } => {
            assert_eq!(transactions.len(), 1);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].key.instrument, "3836.T");
            assert!(failed[0].error.contains("JPY"));
        }
        other => panic!("expected processed outcome, got {:?}", other),
    }
    // The failed group contributes nothing to totals.
    assert_eq!(result.total_value_eur, dec!(18440));
}

#[test]
fn day_trade_round_trip_is_taxed_on_both_legs() {
    let text = "\
Saxo Bank A/S
Transacties
28-nov-2025 01-dec-2025 1 Aandelen Acme NV EUR Koop OPENING 100 100,00 1,0000 10.000,00
28-nov-2025 01-dec-2025 2 Aandelen Acme NV EUR Verkoop SLUITEN -100 102,00 1,0000 -10.200,00
";
    let pipeline = pipeline_with(vec![]);
    let result = pipeline.process(&[StatementText::new("saxo.txt", text)]);

    let taxed: Vec<_> = result.transactions().collect();
    assert_eq!(taxed.len(), 2);
    assert_eq!(taxed[0].transaction.key.side, TradeSide::Buy);
    assert_eq!(taxed[1].transaction.key.side, TradeSide::Sell);
    // Both legs taxed, no netting: 35.00 + 35.70
    assert_eq!(round_money(result.total_tax_eur), dec!(70.70));
}

#[test]
fn cap_limits_tax_on_large_transactions() {
    let text = "\
Saxo Bank A/S
Transacties
28-nov-2025 01-dec-2025 1 Aandelen Acme NV EUR Verkoop SLUITEN -10000 100,00 1,0000 -1.000.000,00
";
    let pipeline = pipeline_with(vec![]);
    let result = pipeline.process(&[StatementText::new("saxo.txt", text)]);

    let taxed: Vec<_> = result.transactions().collect();
    assert_eq!(taxed.len(), 1);
    assert_eq!(taxed[0].tax.raw_tax, dec!(3500));
    assert_eq!(taxed[0].tax.capped_tax, TOB_CAP);
    assert_eq!(result.total_tax_eur, dec!(1600));
}

#[test]
fn batch_mixes_brokers_and_accumulates_grand_totals() {
    let pipeline = pipeline_with(vec![("USD", date(2025, 12, 1), dec!(1.25))]);
    let documents = vec![
        StatementText::new("ib.txt", IB_STATEMENT),
        StatementText::new("saxo.txt", SAXO_STATEMENT),
    ];
    let result: PipelineResult = pipeline.process(&documents);

    assert_eq!(result.processed_count(), 2);
    // 18,440 (IB) + 26,000 (Saxo)
    assert_eq!(result.total_value_eur, dec!(44440.00));
    assert_eq!(
        round_money(result.total_tax_eur),
        round_money(dec!(44440) * dec!(0.0035))
    );
}
