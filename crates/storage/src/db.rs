use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tally_core::ExpenseRow;

pub type DbPool = Pool<Sqlite>;

/// Text columns come back as `""` when NULL; `amount` is cast so REAL and
/// TEXT storage both read as a decimal string.
pub const EXPENSE_QUERY: &str = r#"
    SELECT _id,
           COALESCE(CAST(amount AS TEXT), ''),
           COALESCE(category, ''),
           COALESCE(subcategory, ''),
           COALESCE(payment_method, ''),
           COALESCE(description, ''),
           expensed,
           COALESCE(CAST(reference_number AS TEXT), '')
    FROM expense_report
    ORDER BY _id
"#;

type ExpenseTuple = (i64, String, String, String, String, String, Option<i64>, String);

/// Opens an existing Expense Manager database. The file is never written to
/// or created.
pub async fn open_expense_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    tracing::debug!("Opened expense database {}", path.display());
    Ok(pool)
}

pub async fn get_expense_rows(pool: &DbPool) -> Result<Vec<ExpenseRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExpenseTuple>(EXPENSE_QUERY)
        .fetch_all(pool)
        .await?;

    let total = rows.len();
    let expenses: Vec<ExpenseRow> = rows
        .into_iter()
        .filter_map(
            |(id, amount, category, subcategory, payment_method, description, expensed, reference_number)| {
                let Some(expensed) = expensed else {
                    tracing::warn!("Expense {} has no expensed time, skipping", id);
                    return None;
                };
                Some(ExpenseRow {
                    id,
                    amount,
                    category,
                    subcategory,
                    payment_method,
                    description,
                    expensed,
                    reference_number,
                })
            },
        )
        .collect();

    tracing::info!(rows = total, usable = expenses.len(), "Read expense rows");
    Ok(expenses)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(path: &Path) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE expense_report (
                _id INTEGER PRIMARY KEY,
                amount TEXT,
                category TEXT,
                subcategory TEXT,
                payment_method TEXT,
                description TEXT,
                expensed INTEGER,
                reference_number TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        for (id, amount, method, expensed, reference) in [
            (2, Some("12.30"), Some("NETS"), Some(1_546_675_200_000_i64), Some("")),
            (1, Some("4.50"), Some("Cash"), Some(1_546_588_800_000_i64), None),
            (3, None, None, Some(1_546_675_200_000_i64), Some("S$8.00")),
            (4, Some("1.00"), Some("Cash"), None, None),
        ] {
            sqlx::query(
                "INSERT INTO expense_report (_id, amount, category, subcategory, payment_method, description, expensed, reference_number) VALUES (?, ?, 'Food', NULL, ?, 'lunch', ?, ?)",
            )
            .bind(id)
            .bind(amount)
            .bind(method)
            .bind(expensed)
            .bind(reference)
            .execute(&pool)
            .await
            .unwrap();
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn reads_rows_in_id_order_with_blank_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.db");
        seed(&path).await;

        let pool = open_expense_db(&path).await.unwrap();
        let rows = get_expense_rows(&pool).await.unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(rows[0].amount, "4.50");
        assert_eq!(rows[0].payment_method, "Cash");
        assert_eq!(rows[0].reference_number, "");
        assert_eq!(rows[0].subcategory, "");
        assert_eq!(rows[0].expensed, 1_546_588_800_000);

        assert_eq!(rows[1].category, "Food");
        assert_eq!(rows[1].description, "lunch");

        assert_eq!(rows[2].amount, "");
        assert_eq!(rows[2].payment_method, "");
        assert_eq!(rows[2].reference_number, "S$8.00");
    }

    #[tokio::test]
    async fn database_is_opened_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.db");
        seed(&path).await;

        let pool = open_expense_db(&path).await.unwrap();
        let result = sqlx::query("DELETE FROM expense_report").execute(&pool).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(open_expense_db(&path).await.is_err());
        assert!(!path.exists());
    }
}
