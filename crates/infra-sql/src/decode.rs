// Parameter binding and row decoding for both dialects

use consultorio_core::domain::TIMESTAMP_FORMAT;
use consultorio_core::sql::{Row, SqlValue};
use sqlx::mysql::{MySql, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Column, Database, Row as _, TypeInfo, ValueRef};

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;
type MySqlQuery<'q> = Query<'q, MySql, <MySql as Database>::Arguments<'q>>;

/// SQLite stores dates as text, in the same layout the primary uses
pub fn bind_sqlite<'q>(mut query: SqliteQuery<'q>, params: &'q [SqlValue]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Date(d) => query.bind(d.format("%Y-%m-%d").to_string()),
            SqlValue::DateTime(dt) => query.bind(dt.format(TIMESTAMP_FORMAT).to_string()),
        };
    }
    query
}

pub fn bind_mysql<'q>(mut query: MySqlQuery<'q>, params: &'q [SqlValue]) -> MySqlQuery<'q> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Date(d) => query.bind(*d),
            SqlValue::DateTime(dt) => query.bind(*dt),
        };
    }
    query
}

/// Decode by the value's storage class; SQLite typing is per value
pub fn sqlite_row(row: &SqliteRow) -> Row {
    let mut out = Row::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        out.push(column.name(), sqlite_value(row, i));
    }
    out
}

fn sqlite_value(row: &SqliteRow, i: usize) -> SqlValue {
    let type_name = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    let decoded = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row.try_get::<i64, _>(i).map(SqlValue::Int),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(i).map(SqlValue::Float),
        _ => row.try_get_unchecked::<String, _>(i).map(SqlValue::Text),
    };
    decoded
        .or_else(|_| row.try_get_unchecked::<String, _>(i).map(SqlValue::Text))
        .unwrap_or(SqlValue::Null)
}

/// Decode by declared column type
pub fn mysql_row(row: &MySqlRow) -> Row {
    let mut out = Row::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        out.push(column.name(), mysql_value(row, i));
    }
    out
}

fn mysql_value(row: &MySqlRow, i: usize) -> SqlValue {
    let type_name = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    let decoded = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(i).map(SqlValue::Bool),
        name if name.ends_with("UNSIGNED") => row
            .try_get_unchecked::<u64, _>(i)
            .map(|n| SqlValue::Int(i64::try_from(n).unwrap_or(i64::MAX))),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<i64, _>(i).map(SqlValue::Int)
        }
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(i).map(SqlValue::Float),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(SqlValue::Date),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(SqlValue::DateTime),
        _ => row.try_get_unchecked::<String, _>(i).map(SqlValue::Text),
    };
    decoded
        .or_else(|_| row.try_get_unchecked::<String, _>(i).map(SqlValue::Text))
        .unwrap_or(SqlValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_sqlite_round_trip_of_value_kinds() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE v (t TEXT, i INTEGER, r REAL, n TEXT, d TEXT, dt TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let at = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let params = vec![
            SqlValue::from("Maria"),
            SqlValue::Int(42),
            SqlValue::Float(1.5),
            SqlValue::Null,
            SqlValue::from(at.date()),
            SqlValue::from(at),
        ];
        bind_sqlite(
            sqlx::query("INSERT INTO v VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            &params,
        )
        .execute(&pool)
        .await
        .unwrap();

        let raw = sqlx::query("SELECT * FROM v").fetch_one(&pool).await.unwrap();
        let row = sqlite_row(&raw);

        assert_eq!(row.get("t"), Some(&SqlValue::from("Maria")));
        assert_eq!(row.get("i"), Some(&SqlValue::Int(42)));
        assert_eq!(row.get("r"), Some(&SqlValue::Float(1.5)));
        assert_eq!(row.get("n"), Some(&SqlValue::Null));
        assert_eq!(row.get("d"), Some(&SqlValue::from("2024-06-01")));
        assert_eq!(row.get("dt").and_then(SqlValue::as_datetime), Some(at));
    }

    #[tokio::test]
    async fn test_sqlite_column_order_is_kept() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let raw = sqlx::query("SELECT 1 AS CodCli, 'x' AS NomeCli")
            .fetch_one(&pool)
            .await
            .unwrap();
        let row = sqlite_row(&raw);
        let names: Vec<&str> = row.columns().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["CodCli", "NomeCli"]);
    }
}
