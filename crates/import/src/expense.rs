use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use tally_core::{ExpenseRow, Money, PaymentMethod, RecordedExpense};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpenseRowError {
    #[error("Expense {id}: invalid amount '{value}'")]
    InvalidAmount { id: i64, value: String },
    #[error("Expense {id}: unknown payment method '{value}'")]
    UnknownPaymentMethod { id: i64, value: String },
    #[error("Expense {id}: expensed time {value} is out of range")]
    InvalidTimestamp { id: i64, value: i64 },
}

fn reference_noise() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^\d.]+").expect("invalid regex"))
}

/// Reads a reference number such as `"S$12.30"` or `"#45.00 rcpt"` as an amount.
/// Blank or unreadable references give `None`.
pub fn parse_reference_amount(reference: &str) -> Option<Money> {
    if reference.trim().is_empty() {
        return None;
    }
    let cleansed = reference_noise().replace_all(reference, "");
    match Decimal::from_str(&cleansed) {
        Ok(amount) => Some(Money::from_decimal(amount)),
        Err(_) => {
            tracing::debug!("Reference number '{}' is not an amount", reference);
            None
        }
    }
}

pub fn map_expense_row(row: &ExpenseRow) -> Result<RecordedExpense, ExpenseRowError> {
    let amount = Money::parse(&row.amount).map_err(|_| ExpenseRowError::InvalidAmount {
        id: row.id,
        value: row.amount.clone(),
    })?;

    let payment_method = PaymentMethod::resolve(&row.payment_method).ok_or_else(|| {
        ExpenseRowError::UnknownPaymentMethod {
            id: row.id,
            value: row.payment_method.clone(),
        }
    })?;

    let expensed_at = DateTime::<Utc>::from_timestamp_millis(row.expensed).ok_or(
        ExpenseRowError::InvalidTimestamp {
            id: row.id,
            value: row.expensed,
        },
    )?;

    Ok(RecordedExpense {
        id: row.id,
        amount,
        payment_method,
        expensed_at,
        reference_amount: parse_reference_amount(&row.reference_number),
        description: row.description.clone(),
    })
}

/// Maps every row that can be mapped, in input order. Rows that cannot are
/// logged and dropped.
pub fn map_expense_rows(rows: &[ExpenseRow]) -> Vec<RecordedExpense> {
    let expenses: Vec<RecordedExpense> = rows
        .iter()
        .filter_map(|row| match map_expense_row(row) {
            Ok(expense) => Some(expense),
            Err(e) => {
                tracing::warn!("Dropping expense row: {}", e);
                None
            }
        })
        .collect();

    if expenses.len() < rows.len() {
        tracing::warn!(
            dropped = rows.len() - expenses.len(),
            total = rows.len(),
            "Some expense rows were dropped"
        );
    }
    expenses
}
