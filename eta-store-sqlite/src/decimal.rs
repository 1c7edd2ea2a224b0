use eta_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

fn column_error(column: &str, detail: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(format!("Column '{column}': {detail}"))
}

/// Read an amount column.
///
/// Amounts are written as TEXT so no precision is lost; INTEGER and REAL
/// values are still accepted for rows inserted by hand.
pub fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw = row
        .try_get_raw(column)
        .map_err(|e| column_error(column, e))?;
    if raw.is_null() {
        return Err(column_error(column, "is NULL"));
    }
    let storage = raw.type_info().name().to_string();

    match storage.as_str() {
        "TEXT" => {
            let text: String = row.try_get(column).map_err(|e| column_error(column, e))?;
            text.trim()
                .parse::<Decimal>()
                .map_err(|e| column_error(column, format!("'{text}' is not an amount ({e})")))
        }
        "INTEGER" => row
            .try_get::<i64, _>(column)
            .map(Decimal::from)
            .map_err(|e| column_error(column, e)),
        "REAL" => {
            let real: f64 = row.try_get(column).map_err(|e| column_error(column, e))?;
            Decimal::try_from(real).map_err(|e| column_error(column, format!("{real}: {e}")))
        }
        other => Err(column_error(column, format!("unexpected storage class {other}"))),
    }
}

/// Text form for storage, keeping the scale the amount was entered with.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> sqlx::sqlite::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE amounts (
                id INTEGER PRIMARY KEY,
                amount
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn read(pool: &sqlx::sqlite::SqlitePool, literal: &str) -> Result<Decimal, RepositoryError> {
        sqlx::query(&format!("INSERT INTO amounts (id, amount) VALUES (1, {literal})"))
            .execute(pool)
            .await
            .expect("Failed to insert test data");
        let row = sqlx::query("SELECT amount FROM amounts WHERE id = 1")
            .fetch_one(pool)
            .await
            .expect("Failed to fetch row");
        get_decimal(&row, "amount")
    }

    #[tokio::test]
    async fn from_text_keeps_scale() {
        let pool = setup_test_db().await;
        assert_eq!(read(&pool, "'1140.50'").await, Ok(dec!(1140.50)));
    }

    #[tokio::test]
    async fn from_integer() {
        let pool = setup_test_db().await;
        assert_eq!(read(&pool, "-99999").await, Ok(dec!(-99999)));
    }

    #[tokio::test]
    async fn from_real() {
        let pool = setup_test_db().await;
        assert_eq!(read(&pool, "123.45").await, Ok(dec!(123.45)));
    }

    #[tokio::test]
    async fn from_null_is_an_error() {
        let pool = setup_test_db().await;
        assert_eq!(
            read(&pool, "NULL").await,
            Err(RepositoryError::Database("Column 'amount': is NULL".to_string()))
        );
    }

    #[tokio::test]
    async fn from_garbage_text() {
        let pool = setup_test_db().await;
        let result = read(&pool, "'not a number'").await;
        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.starts_with("Column 'amount': 'not a number' is not an amount")));
    }

    #[tokio::test]
    async fn column_not_found() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO amounts (id) VALUES (1)")
            .execute(&pool)
            .await
            .expect("Failed to insert test data");
        let row = sqlx::query("SELECT id FROM amounts WHERE id = 1")
            .fetch_one(&pool)
            .await
            .expect("Failed to fetch row");

        let result = get_decimal(&row, "nonexistent_column");
        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.starts_with("Column 'nonexistent_column': ")));
    }

    #[test]
    fn text_form_keeps_scale() {
        assert_eq!(decimal_to_text(dec!(250.00)), "250.00");
        assert_eq!(decimal_to_text(dec!(-0.01)), "-0.01");
        assert_eq!(decimal_to_text(Decimal::ZERO), "0");
    }
}
