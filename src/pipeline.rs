//! Per-document processing pipeline and batch orchestration
//!
//! Each document flows Received -> Detected -> Extracted -> Grouped ->
//! Taxed -> Done, with early exit to Skipped when no broker marker
//! matches or extraction yields zero usable records. No document
//! failure aborts the batch: partial success is the expected outcome,
//! and the result distinguishes fully-taxed transactions from skipped
//! or errored ones.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::brokers::{self, BrokerKind, Diagnostic};
use crate::error::TobError;
use crate::rates::RateResolver;
use crate::tax::{self, GroupKey, GroupedTransaction, TaxResult};

/// One input document: statement text already extracted from a PDF by
/// an external step, plus a display name for reporting.
#[derive(Debug, Clone)]
pub struct StatementText {
    pub name: String,
    pub text: String,
}

impl StatementText {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A grouped transaction together with its computed tax
#[derive(Debug, Clone, Serialize)]
pub struct TaxedTransaction {
    pub transaction: GroupedTransaction,
    pub tax: TaxResult,
}

/// A group whose tax could not be computed: no exchange rate was
/// published within the lookback window. Surfaced per transaction,
/// never papered over with a default rate.
#[derive(Debug, Clone, Serialize)]
pub struct GroupError {
    pub key: GroupKey,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    UnknownBrokerFormat,
    NoUsableRecords,
}

impl SkipReason {
    /// The document-level error this skip corresponds to, for display.
    pub fn to_error(self) -> TobError {
        match self {
            SkipReason::UnknownBrokerFormat => TobError::UnknownBrokerFormat,
            SkipReason::NoUsableRecords => TobError::EmptyStatement,
        }
    }
}

#[derive(Debug, Serialize)]
pub enum DocumentOutcome {
    Processed {
        broker: BrokerKind,
        transactions: Vec<TaxedTransaction>,
        failed: Vec<GroupError>,
        diagnostics: Vec<Diagnostic>,
    },
    Skipped {
        reason: SkipReason,
        diagnostics: Vec<Diagnostic>,
    },
}

#[derive(Debug, Serialize)]
pub struct DocumentResult {
    pub name: String,
    pub outcome: DocumentOutcome,
}

/// Aggregate result over a batch of documents. Totals cover
/// successfully taxed transactions only; skipped documents and failed
/// groups contribute zero.
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub documents: Vec<DocumentResult>,
    pub total_value_eur: Decimal,
    pub total_tax_eur: Decimal,
}

impl PipelineResult {
    pub fn processed_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Processed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.documents.len() - self.processed_count()
    }

    /// All taxed transactions across documents, in document order
    pub fn transactions(&self) -> impl Iterator<Item = &TaxedTransaction> {
        self.documents.iter().flat_map(|d| match &d.outcome {
            DocumentOutcome::Processed { transactions, .. } => transactions.as_slice(),
            DocumentOutcome::Skipped { .. } => &[],
        })
    }
}

/// Composes detection, extraction, grouping and tax computation over a
/// batch of documents. Documents are independent; the only shared state
/// is the resolver's rate cache, which is safe for concurrent use.
pub struct Pipeline {
    resolver: RateResolver,
}

impl Pipeline {
    pub fn new(resolver: RateResolver) -> Self {
        Self { resolver }
    }

    /// Process each document in order and aggregate totals. Grouping
    /// scope is one document; trades never group across statements.
    pub fn process(&self, documents: &[StatementText]) -> PipelineResult {
        let mut results = Vec::with_capacity(documents.len());
        let mut total_value_eur = Decimal::ZERO;
        let mut total_tax_eur = Decimal::ZERO;

        for document in documents {
            let outcome = self.process_document(document);

            if let DocumentOutcome::Processed { transactions, .. } = &outcome {
                for taxed in transactions {
                    total_value_eur += taxed.transaction.total_value_eur;
                    total_tax_eur += taxed.tax.capped_tax;
                }
            }

            results.push(DocumentResult {
                name: document.name.clone(),
                outcome,
            });
        }

        info!(
            "Pipeline complete: {} documents, total tax {} EUR",
            results.len(),
            total_tax_eur
        );
        PipelineResult {
            documents: results,
            total_value_eur,
            total_tax_eur,
        }
    }

    fn process_document(&self, document: &StatementText) -> DocumentOutcome {
        let Some((broker, extraction)) = brokers::extract_auto(&document.text) else {
            warn!("{}: no known broker marker, skipping", document.name);
            return DocumentOutcome::Skipped {
                reason: SkipReason::UnknownBrokerFormat,
                diagnostics: Vec::new(),
            };
        };

        if extraction.records.is_empty() {
            warn!(
                "{}: detected {} but found no usable trade records, skipping",
                document.name, broker
            );
            return DocumentOutcome::Skipped {
                reason: SkipReason::NoUsableRecords,
                diagnostics: extraction.diagnostics,
            };
        }

        let mut transactions = Vec::new();
        let mut failed = Vec::new();

        for group in tax::group_trades(extraction.records) {
            let key = group.key.clone();
            match tax::convert_group(group, &self.resolver) {
                Ok(transaction) => {
                    let tax = tax::compute_tob(&transaction);
                    transactions.push(TaxedTransaction { transaction, tax });
                }
                Err(e) => {
                    warn!("{}: cannot tax {:?}: {}", document.name, key, e);
                    failed.push(GroupError {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "{}: {} taxable transactions, {} failed, {} diagnostics",
            document.name,
            transactions.len(),
            failed.len(),
            extraction.diagnostics.len()
        );
        DocumentOutcome::Processed {
            broker,
            transactions,
            failed,
            diagnostics: extraction.diagnostics,
        }
    }
}
