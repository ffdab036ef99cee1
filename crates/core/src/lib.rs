pub mod expense;
pub mod money;
pub mod period;
pub mod transaction;

pub use expense::{ExpenseRow, PaymentMethod, RecordedExpense};
pub use money::Money;
pub use period::{end_of_day, within_tolerance};
pub use transaction::{
    CanonicalTransaction, KindProfile, Reclassification, TransactionError, TransactionKind,
    KIND_PROFILES, PAY_NOW_MARKER,
};
