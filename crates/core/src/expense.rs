use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

/// Payment channels known to the expense ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    PrimaryDebitCard,
    TravelDebitCard,
    SecondaryCreditCard,
    ElectronicTransfer,
    Giro,
    MobileWallet,
    Nets,
    InternetBanking,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 10] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::PrimaryDebitCard,
        PaymentMethod::TravelDebitCard,
        PaymentMethod::SecondaryCreditCard,
        PaymentMethod::ElectronicTransfer,
        PaymentMethod::Giro,
        PaymentMethod::MobileWallet,
        PaymentMethod::Nets,
        PaymentMethod::InternetBanking,
    ];

    /// The label the expense ledger stores for this method.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::PrimaryDebitCard => "Debit 1067",
            PaymentMethod::TravelDebitCard => "Debit 6709",
            PaymentMethod::SecondaryCreditCard => "Credit 0665",
            PaymentMethod::ElectronicTransfer => "Electronic Transfer",
            PaymentMethod::Giro => "Giro",
            PaymentMethod::MobileWallet => "Grab Pay",
            PaymentMethod::Nets => "NETS",
            PaymentMethod::InternetBanking => "iBanking",
        }
    }

    /// Exact-match lookup by stored label. Blank or unknown labels give `None`.
    pub fn resolve(label: &str) -> Option<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == label)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row as stored by the expense ledger, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: i64,
    pub amount: String,
    pub category: String,
    pub subcategory: String,
    pub payment_method: String,
    pub description: String,
    /// Milliseconds since the Unix epoch, UTC.
    pub expensed: i64,
    pub reference_number: String,
}

/// One entry of the independently maintained expense ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedExpense {
    pub id: i64,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub expensed_at: DateTime<Utc>,
    /// A second amount entered for reconciliation; wins over `amount` when non-zero.
    pub reference_amount: Option<Money>,
    pub description: String,
}

impl RecordedExpense {
    pub fn effective_amount(&self) -> Money {
        match self.reference_amount {
            Some(reference) if !reference.is_zero() => reference,
            _ => self.amount,
        }
    }
}
