pub mod db;

pub use db::{get_expense_rows, open_expense_db, DbPool, EXPENSE_QUERY};
