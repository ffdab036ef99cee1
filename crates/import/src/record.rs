use chrono::NaiveDate;
use csv::StringRecord;
use tally_core::{
    CanonicalTransaction, Money, Reclassification, TransactionError, TransactionKind,
    PAY_NOW_MARKER,
};
use thiserror::Error;

use crate::card::extract_card_date;

/// `09 Nov 2018`
pub const STATEMENT_DATE_FORMAT: &str = "%d %b %Y";

const TRANSACTION_DATE: usize = 0;
const REFERENCE: usize = 1;
const DEBIT_AMOUNT: usize = 2;
const CREDIT_AMOUNT: usize = 3;
const TRANSACTION_REF_1: usize = 4;
const TRANSACTION_REF_2: usize = 5;
const TRANSACTION_REF_3: usize = 6;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing {name} field at position {position}")]
    MissingField { name: &'static str, position: usize },
    #[error("Invalid transaction date: {0}")]
    InvalidDate(String),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl RecordError {
    /// Monetary problems only cost the row; everything else means the file
    /// is not in the expected layout.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecordError::Transaction(TransactionError::InvalidAmount(_)))
    }
}

/// The comma-separated fields of one statement data row.
///
/// Fields are taken verbatim: no quoting, no trimming. Trailing empty fields
/// are dropped, so `d,MST,5.00,,REF,` has five fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransactionRecord {
    fields: StringRecord,
}

impl RawTransactionRecord {
    pub fn from_line(line: &str) -> Result<Self, RecordError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::None)
            .from_reader(line.as_bytes());

        let mut fields = StringRecord::new();
        reader.read_record(&mut fields)?;
        Ok(Self::from_record(fields))
    }

    pub fn from_record(mut fields: StringRecord) -> Self {
        while fields.iter().next_back().is_some_and(str::is_empty) {
            fields.truncate(fields.len() - 1);
        }
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn required(&self, position: usize, name: &'static str) -> Result<&str, RecordError> {
        self.fields
            .get(position)
            .ok_or(RecordError::MissingField { name, position })
    }

    fn optional(&self, position: usize) -> &str {
        self.fields.get(position).unwrap_or_default()
    }

    /// Builds the canonical transaction for this row.
    ///
    /// Returns `Ok(None)` for kinds that are not reconciled (including codes
    /// never seen before).
    pub fn to_transaction(&self) -> Result<Option<CanonicalTransaction>, RecordError> {
        let code = self.required(REFERENCE, "reference")?;
        let kind = TransactionKind::resolve(code)?;
        if !kind.is_reconcilable() {
            return Ok(None);
        }

        let raw_date = self.required(TRANSACTION_DATE, "transaction date")?;
        let bank_date = NaiveDate::parse_from_str(raw_date, STATEMENT_DATE_FORMAT)
            .map_err(|_| RecordError::InvalidDate(raw_date.to_string()))?;

        let debit = Money::parse_or_zero(self.required(DEBIT_AMOUNT, "debit amount")?)?;
        let credit = if self.len() > TRANSACTION_REF_1 {
            Money::parse_or_zero(self.optional(CREDIT_AMOUNT))?
        } else {
            Money::zero()
        };

        let references = [
            self.optional(TRANSACTION_REF_1).to_string(),
            self.optional(TRANSACTION_REF_2).to_string(),
            self.optional(TRANSACTION_REF_3).to_string(),
        ];

        let (date, kind) = reclassify(bank_date, kind, &references[0]);
        let transaction = CanonicalTransaction::new(date, kind, debit, credit, references)?;
        Ok(Some(transaction))
    }
}

/// Resolves the final date and kind before the transaction is assembled.
fn reclassify(bank_date: NaiveDate, kind: TransactionKind, reference1: &str) -> (NaiveDate, TransactionKind) {
    match kind.reclassification() {
        Reclassification::CardStatementDate => match extract_card_date(bank_date, reference1) {
            Ok(date) => (date, kind),
            Err(e) => {
                tracing::warn!(
                    %bank_date,
                    reference1,
                    error = %e,
                    "Cannot retrieve card transaction date, keeping bank date"
                );
                (bank_date, kind)
            }
        },
        Reclassification::PayNowMarker if reference1 == PAY_NOW_MARKER => {
            (bank_date, TransactionKind::PayNow)
        }
        Reclassification::PayNowMarker | Reclassification::None => (bank_date, kind),
    }
}

/// Parses one non-blank statement data row.
pub fn parse_transaction_line(line: &str) -> Result<Option<CanonicalTransaction>, RecordError> {
    RawTransactionRecord::from_line(line)?.to_transaction()
}
