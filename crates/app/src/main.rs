use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tally_core::RecordedExpense;
use tally_import::{
    map_expense_rows, parse_statement, DiscrepancyReport, ExpenseIndex, ReconcileConfig,
    Reconciler, StatementError,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser, Debug)]
#[command(
    name = "expense-tally",
    version,
    about = "Reconcile a bank statement export against recorded expenses"
)]
struct Cli {
    /// Bank statement CSV export
    #[arg(long)]
    csv: PathBuf,

    /// Expense Manager SQLite database
    #[arg(long)]
    database: PathBuf,

    /// Reconciliation settings (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `tolerance_hours` from the config file
    #[arg(long)]
    tolerance_hours: Option<i64>,

    /// Also write the unmatched transactions to this CSV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tally_import=trace` (default: RUST_LOG, then `info`)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Error, Debug)]
enum RunError {
    #[error("Cannot read bank statement {}: {source}", .path.display())]
    Statement {
        path: PathBuf,
        #[source]
        source: StatementError,
    },
    #[error("Cannot read expense database {}: {source}", .path.display())]
    Expenses {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunError {
    fn exit_code(&self) -> u8 {
        match self {
            RunError::Statement { .. } => 2,
            RunError::Expenses { .. } => 3,
            RunError::Other(_) => 1,
        }
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).map_err(|_| ()),
        None => EnvFilter::try_from_default_env().map_err(|_| ()),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<ReconcileConfig> {
    let config = match &cli.config {
        Some(path) => ReconcileConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReconcileConfig::default(),
    };
    match cli.tolerance_hours {
        Some(hours) => Ok(config.with_tolerance_hours(hours)?),
        None => Ok(config),
    }
}

fn read_statement(path: &Path) -> Result<Vec<tally_core::CanonicalTransaction>, StatementError> {
    let file = File::open(path)?;
    parse_statement(BufReader::new(file))
}

async fn read_expenses(path: &Path) -> Result<Vec<RecordedExpense>, sqlx::Error> {
    let pool = tally_storage::open_expense_db(path).await?;
    let rows = tally_storage::get_expense_rows(&pool).await;
    pool.close().await;
    Ok(map_expense_rows(&rows?))
}

async fn run(cli: &Cli) -> Result<DiscrepancyReport, RunError> {
    let config = load_config(cli)?;

    let transactions = read_statement(&cli.csv).map_err(|source| RunError::Statement {
        path: cli.csv.clone(),
        source,
    })?;

    let expenses = read_expenses(&cli.database)
        .await
        .map_err(|source| RunError::Expenses {
            path: cli.database.clone(),
            source,
        })?;

    let index = ExpenseIndex::build(expenses);
    let report = Reconciler::new(&config).reconcile(&transactions, &index);

    report::print_summary(&mut std::io::stdout().lock(), &report)
        .context("writing summary")?;

    if let Some(output) = &cli.output {
        report::write_csv_file(output, &report.discrepancies())
            .with_context(|| format!("writing report {}", output.display()))?;
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Reconciliation aborted");
            eprintln!("error: {e:#}");
            ExitCode::from(e.exit_code())
        }
    }
}
