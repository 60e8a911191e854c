//! card-report: batch analytics over card transaction and customer CSVs.
//!
//! Usage:
//!   card-report validate
//!   card-report report --output-dir analysis
//!   card-report generate --seed 7 --data-dir data
//!
//! Exit codes: 0 ok, 1 validation failure, 2 export failures,
//! 3 configuration or I/O failure.

use anyhow::Result;
use card_analytics_core::{
    chart::PngRenderer,
    config::ReportConfig,
    error::ReportError,
    pipeline::{ReportPipeline, RunOutcome},
    sample::write_sample,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "card-report", version, about = "Card analytics batch report")]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true, env = "CARD_REPORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct InputArgs {
    #[arg(long)]
    transactions: Option<PathBuf>,

    #[arg(long)]
    customers: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Check schema and data quality of both input tables.
    Validate {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Validate, aggregate and write every export artifact.
    Report {
        #[command(flatten)]
        inputs: InputArgs,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Skip PNG chart rendering.
        #[arg(long)]
        no_charts: bool,
    },
    /// Write deterministic synthetic input CSVs.
    Generate {
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        transaction_rows: Option<usize>,

        #[arg(long)]
        customer_rows: Option<usize>,

        /// Directory for both CSVs (default: the configured input paths).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e.downcast_ref::<ReportError>().map(ReportError::exit_code).unwrap_or(3);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    log::debug!("base config: {config:?}");

    match cli.command {
        Command::Validate { inputs } => {
            apply_inputs(&mut config, inputs);
            let report = ReportPipeline::new(config).validate()?;
            println!("Validation passed");
            println!(
                "  transactions: {} rows | customers: {} rows",
                report.transactions, report.customers
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Report { inputs, output_dir, no_charts } => {
            apply_inputs(&mut config, inputs);
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if no_charts {
                config.render_charts = false;
            }
            let outcome = ReportPipeline::new(config).run(&PngRenderer::default())?;
            Ok(print_outcome(&outcome))
        }
        Command::Generate { seed, transaction_rows, customer_rows, data_dir } => {
            if let Some(seed) = seed {
                config.sample.seed = seed;
            }
            if let Some(n) = transaction_rows {
                config.sample.transaction_rows = n;
            }
            if let Some(n) = customer_rows {
                config.sample.customer_rows = n;
            }
            if let Some(dir) = data_dir {
                config.transactions_path = dir.join("credit_card_transactions.csv");
                config.customers_path = dir.join("credit_card_customers.csv");
            }
            write_sample(&config.sample, &config.transactions_path, &config.customers_path)?;
            println!("Generated sample data");
            println!("  transactions: {}", config.transactions_path.display());
            println!("  customers:    {}", config.customers_path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn apply_inputs(config: &mut ReportConfig, inputs: InputArgs) {
    if let Some(path) = inputs.transactions {
        config.transactions_path = path;
    }
    if let Some(path) = inputs.customers {
        config.customers_path = path;
    }
}

fn print_outcome(outcome: &RunOutcome) -> ExitCode {
    let kpis = &outcome.report.kpis;
    println!("=== REPORT SUMMARY ===");
    println!("  transactions:   {}", outcome.validation.transactions);
    println!("  customers:      {}", outcome.validation.customers);
    println!("  total revenue:  ${:.2}", kpis.total_revenue);
    println!("  total txn amt:  ${:.2}", kpis.total_transaction_amount);
    println!("  avg satisfaction: {:.2}", kpis.avg_satisfaction);
    println!("  artifacts written: {}", outcome.exports.written.len());

    if outcome.exports.is_success() {
        return ExitCode::SUCCESS;
    }

    eprintln!();
    eprintln!("=== FAILED ARTIFACTS ({}) ===", outcome.exports.failures.len());
    for failure in &outcome.exports.failures {
        eprintln!("  {failure}");
    }
    ExitCode::from(2)
}
