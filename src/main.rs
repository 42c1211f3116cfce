use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use tobcalc::pipeline::{DocumentOutcome, Pipeline, PipelineResult, StatementText};
use tobcalc::rates::{self, RateResolver};
use tobcalc::utils::format_eur;

/// Belgian TOB calculator for broker statement text
///
/// Takes one or more statement text files (pre-extracted from broker
/// PDFs), fetches ECB reference rates, and reports the tax owed per
/// grouped transaction.
#[derive(Parser)]
#[command(name = "tobcalc", version, about)]
struct Cli {
    /// Statement text files, one per broker PDF
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Emit the full pipeline result as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut documents = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(StatementText::new(name, text));
    }

    info!("Fetching ECB reference rates");
    let history = rates::fetch_rate_history().await?;
    let pipeline = Pipeline::new(RateResolver::new(history));
    let result = pipeline.process(&documents);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_report(&result);
    Ok(())
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Broker")]
    broker: String,
    #[tabled(rename = "Stock")]
    stock: String,
    #[tabled(rename = "Type")]
    side: String,
    #[tabled(rename = "Shares")]
    shares: String,
    #[tabled(rename = "EUR Amount")]
    eur_amount: String,
    #[tabled(rename = "TOB (0.35%)")]
    tob: String,
}

fn print_report(result: &PipelineResult) {
    let rows: Vec<ReportRow> = result
        .transactions()
        .map(|taxed| ReportRow {
            date: taxed.transaction.key.trade_date.to_string(),
            broker: taxed.transaction.key.broker.to_string(),
            stock: taxed.transaction.key.instrument.clone(),
            side: taxed.transaction.key.side.to_string(),
            shares: taxed.transaction.total_quantity.to_string(),
            eur_amount: format_eur(taxed.transaction.total_value_eur),
            tob: format_eur(taxed.tax.capped_tax),
        })
        .collect();

    if rows.is_empty() {
        println!("No taxable transactions found.");
    } else {
        let mut table = Table::new(&rows);
        table.with(Style::sharp());
        println!("{}", table);
        println!();
        println!("Total EUR amount: {}", format_eur(result.total_value_eur));
        println!("Total TOB due:    {}", format_eur(result.total_tax_eur));
    }

    for document in &result.documents {
        match &document.outcome {
            DocumentOutcome::Skipped { reason, .. } => {
                println!("Skipped {}: {}", document.name, reason.to_error());
            }
            DocumentOutcome::Processed {
                failed,
                diagnostics,
                ..
            } => {
                for failure in failed {
                    println!(
                        "Could not tax {} {} on {}: {}",
                        failure.key.side,
                        failure.key.instrument,
                        failure.key.trade_date,
                        failure.error
                    );
                }
                for diagnostic in diagnostics {
                    println!(
                        "{} line {}: {} ({:?})",
                        document.name, diagnostic.line, diagnostic.reason, diagnostic.kind
                    );
                }
            }
        }
    }
}
