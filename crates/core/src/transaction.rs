use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::expense::PaymentMethod;
use super::money::Money;

/// Reference-1 value that marks a fast payment as a PayNow transfer.
pub const PAY_NOW_MARKER: &str = "PayNow Transfer";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Invalid argument: {0} must not be blank")]
    InvalidArgument(&'static str),
    #[error("Invalid monetary amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid reference date: {0}")]
    InvalidReferenceDate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    CardPayment,
    Nets,
    InterbankGiro,
    FundsTransfer,
    BillPayment,
    PayNow,
    CashWithdrawal,
    InterestEarned,
    StandingInstruction,
    Salary,
    ElectronicReceipt,
    Unrecognized,
}

/// Post-construction adjustment a kind asks the builder to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclassification {
    None,
    /// Take the purchase date from the trailing `ddMMM` token of reference 1.
    CardStatementDate,
    /// Become [`TransactionKind::PayNow`] when reference 1 is [`PAY_NOW_MARKER`].
    PayNowMarker,
}

#[derive(Debug)]
pub struct KindProfile {
    pub kind: TransactionKind,
    pub codes: &'static [&'static str],
    pub reconcilable: bool,
    pub requires_amount: bool,
    pub reclassification: Reclassification,
    pub payment_methods: &'static [PaymentMethod],
}

const fn untracked(kind: TransactionKind, codes: &'static [&'static str]) -> KindProfile {
    KindProfile {
        kind,
        codes,
        reconcilable: false,
        requires_amount: false,
        reclassification: Reclassification::None,
        payment_methods: &[],
    }
}

pub const KIND_PROFILES: &[KindProfile] = &[
    KindProfile {
        kind: TransactionKind::CardPayment,
        codes: &["MST"],
        reconcilable: true,
        requires_amount: true,
        reclassification: Reclassification::CardStatementDate,
        payment_methods: &[PaymentMethod::PrimaryDebitCard, PaymentMethod::TravelDebitCard],
    },
    KindProfile {
        kind: TransactionKind::Nets,
        codes: &["NETS", "POS"],
        reconcilable: true,
        requires_amount: true,
        reclassification: Reclassification::None,
        payment_methods: &[PaymentMethod::Nets],
    },
    KindProfile {
        kind: TransactionKind::InterbankGiro,
        codes: &["IBG", "GRO"],
        reconcilable: true,
        requires_amount: false,
        reclassification: Reclassification::PayNowMarker,
        payment_methods: &[PaymentMethod::Giro],
    },
    KindProfile {
        kind: TransactionKind::FundsTransfer,
        codes: &["ICT", "IDT", "ITR", "ATR"],
        reconcilable: true,
        requires_amount: false,
        reclassification: Reclassification::PayNowMarker,
        payment_methods: &[PaymentMethod::ElectronicTransfer],
    },
    KindProfile {
        kind: TransactionKind::BillPayment,
        codes: &["BILL"],
        reconcilable: true,
        requires_amount: true,
        reclassification: Reclassification::None,
        payment_methods: &[PaymentMethod::InternetBanking],
    },
    KindProfile {
        kind: TransactionKind::PayNow,
        codes: &[PAY_NOW_MARKER],
        reconcilable: true,
        requires_amount: true,
        reclassification: Reclassification::None,
        payment_methods: &[PaymentMethod::ElectronicTransfer, PaymentMethod::MobileWallet],
    },
    untracked(TransactionKind::CashWithdrawal, &["AWL"]),
    untracked(TransactionKind::InterestEarned, &["INT"]),
    untracked(TransactionKind::StandingInstruction, &["SI"]),
    untracked(TransactionKind::Salary, &["SAL"]),
    untracked(TransactionKind::ElectronicReceipt, &["MER"]),
    untracked(TransactionKind::Unrecognized, &[]),
];

impl TransactionKind {
    /// Maps a raw statement reference code to its kind.
    ///
    /// Codes are compared by exact equality. An unseen code is logged and
    /// yields [`TransactionKind::Unrecognized`]; only a blank code is an error.
    pub fn resolve(code: &str) -> Result<TransactionKind, TransactionError> {
        if code.trim().is_empty() {
            return Err(TransactionError::InvalidArgument("reference code"));
        }

        let found = KIND_PROFILES
            .iter()
            .find(|profile| profile.codes.iter().any(|known| *known == code))
            .map(|profile| profile.kind);

        Ok(found.unwrap_or_else(|| {
            tracing::info!("Found a new transaction type: {}", code);
            TransactionKind::Unrecognized
        }))
    }

    pub fn profile(self) -> &'static KindProfile {
        // Every variant has exactly one row; the fallback row is Unrecognized.
        KIND_PROFILES
            .iter()
            .find(|profile| profile.kind == self)
            .unwrap_or(&KIND_PROFILES[KIND_PROFILES.len() - 1])
    }

    pub fn is_reconcilable(self) -> bool {
        self.profile().reconcilable
    }

    pub fn requires_amount(self) -> bool {
        self.profile().requires_amount
    }

    pub fn reclassification(self) -> Reclassification {
        self.profile().reclassification
    }

    pub fn payment_methods(self) -> &'static [PaymentMethod] {
        self.profile().payment_methods
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::CardPayment => "Card Payment",
            TransactionKind::Nets => "NETS",
            TransactionKind::InterbankGiro => "Interbank GIRO",
            TransactionKind::FundsTransfer => "Funds Transfer",
            TransactionKind::BillPayment => "Bill Payment",
            TransactionKind::PayNow => "PayNow",
            TransactionKind::CashWithdrawal => "Cash Withdrawal",
            TransactionKind::InterestEarned => "Interest Earned",
            TransactionKind::StandingInstruction => "Standing Instruction",
            TransactionKind::Salary => "Salary",
            TransactionKind::ElectronicReceipt => "Electronic Receipt",
            TransactionKind::Unrecognized => "Unrecognized",
        };
        f.write_str(name)
    }
}

/// A bank-statement row normalized for reconciliation.
///
/// Built once with its final kind and date; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTransaction {
    date: NaiveDate,
    kind: TransactionKind,
    debit: Money,
    credit: Money,
    references: [String; 3],
}

impl CanonicalTransaction {
    /// Validates the monetary invariants and assembles the value.
    ///
    /// Negative amounts and rows carrying both a debit and a credit are
    /// rejected. A row with neither is rejected when the kind requires a
    /// value, otherwise it is kept with a warning.
    pub fn new(
        date: NaiveDate,
        kind: TransactionKind,
        debit: Money,
        credit: Money,
        references: [String; 3],
    ) -> Result<Self, TransactionError> {
        if debit.is_negative() {
            return Err(TransactionError::InvalidAmount(format!("negative debit {debit}")));
        }
        if credit.is_negative() {
            return Err(TransactionError::InvalidAmount(format!("negative credit {credit}")));
        }
        if !debit.is_zero() && !credit.is_zero() {
            return Err(TransactionError::InvalidAmount(format!(
                "debit {debit} and credit {credit} cannot co-exist"
            )));
        }
        if debit.is_zero() && credit.is_zero() {
            if kind.requires_amount() {
                return Err(TransactionError::InvalidAmount(format!(
                    "{kind} transaction on {date} has neither debit nor credit"
                )));
            }
            tracing::warn!(%date, %kind, "Transaction has neither debit nor credit, keeping it at zero");
        }

        Ok(CanonicalTransaction {
            date,
            kind,
            debit,
            credit,
            references,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn debit(&self) -> Money {
        self.debit
    }

    pub fn credit(&self) -> Money {
        self.credit
    }

    pub fn reference1(&self) -> &str {
        &self.references[0]
    }

    pub fn reference2(&self) -> &str {
        &self.references[1]
    }

    pub fn reference3(&self) -> &str {
        &self.references[2]
    }

    pub fn references(&self) -> &[String; 3] {
        &self.references
    }

    /// Debit if present, else credit, else zero.
    pub fn amount(&self) -> Money {
        if !self.debit.is_zero() {
            self.debit
        } else {
            self.credit
        }
    }

    /// Non-blank references, trimmed and joined by a single space.
    pub fn description(&self) -> String {
        self.references
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CanonicalTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} debit={} credit={} [{}]",
            self.date,
            self.kind,
            self.debit,
            self.credit,
            self.description()
        )
    }
}
