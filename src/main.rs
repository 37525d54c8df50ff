use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pharma_compliance::{
    read_record_set, run_import_cycle, run_validation_cycle, table_counts, AppConfig,
    CycleReport, Store, Table, TracingProgress, ValidationFailure, Validator,
};

#[derive(Parser)]
#[command(name = "pharma-compliance")]
#[command(
    version,
    about = "Validate controlled-substance distribution data before reporting",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results and failures as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the source CSV files, validate them and commit on success
    Import {
        /// Directory holding the five source files (defaults to COMPLIANCE_DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Re-validate the data already in the store
    Validate,

    /// Show row counts per table
    Status,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pharma_compliance=debug"
    } else {
        "pharma_compliance=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let config = AppConfig::from_env()?;
    let store = Store::open(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Failed to open store at {}", config.db_path.display()))?;
    let validator = Validator::new(&config.validation);

    match cli.command {
        Commands::Import { data_dir } => {
            let dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            let records = read_record_set(&dir)?;
            let outcome = run_import_cycle(&store, &records, &validator, &mut TracingProgress);
            finish(outcome, cli.json)
        }
        Commands::Validate => {
            let outcome = run_validation_cycle(&store, &validator, &mut TracingProgress);
            finish(outcome, cli.json)
        }
        Commands::Status => print_status(&store, cli.json),
    }
}

fn finish(outcome: Result<CycleReport, ValidationFailure>, json: bool) -> Result<()> {
    match outcome {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("✅ Cycle {} committed", report.cycle_id);
                println!("   Rows stored:              {}", report.counts.total());
                println!("   MME factors assigned:     {}", report.factors_assigned);
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                eprintln!("{}", serde_json::to_string_pretty(&failure.report())?);
            } else {
                eprintln!("❌ Import rejected [{}]", failure.category());
                eprintln!();
                eprintln!("{}", failure.user_message());
            }
            std::process::exit(1);
        }
    }
}

fn print_status(store: &Store, json: bool) -> Result<()> {
    let counts = store.read(table_counts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    println!("📊 Record Store");
    for (table, rows) in [
        (Table::Transactions, counts.transactions),
        (Table::Products, counts.products),
        (Table::Warehouses, counts.warehouses),
        (Table::Licenses, counts.licenses),
        (Table::ConversionReferences, counts.conversion_references),
    ] {
        println!("   {:<28} {}", table.friendly_name(), rows);
    }
    Ok(())
}
