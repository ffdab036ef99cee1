pub mod card;
pub mod config;
pub mod expense;
pub mod match_engine;
pub mod record;
pub mod statement;
pub(crate) mod util;

pub use card::extract_card_date;
pub use config::{ConfigError, ReconcileConfig};
pub use expense::{map_expense_row, map_expense_rows, parse_reference_amount, ExpenseRowError};
pub use match_engine::{
    DiscrepancyReport, DiscrepantTransaction, ExpenseIndex, MatchOutcome, Reconciler,
};
pub use record::{parse_transaction_line, RawTransactionRecord, RecordError};
pub use statement::{parse_statement, parse_statement_lines, StatementError};

/// Parses a statement, indexes the expenses and reconciles the two.
pub fn reconcile_statement<R: std::io::BufRead>(
    statement: R,
    expenses: Vec<tally_core::RecordedExpense>,
    config: &ReconcileConfig,
) -> Result<DiscrepancyReport, StatementError> {
    let transactions = parse_statement(statement)?;
    let index = ExpenseIndex::build(expenses);
    Ok(Reconciler::new(config).reconcile(&transactions, &index))
}
