//! SQLite query execution
//!
//! Runs statements produced by the compiler with their bound parameters and
//! converts result rows into JSON objects.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use tracing::info;

use sqlite_rest_common::config::DatabaseConfig;
use sqlite_rest_common::error::{Error, Result};
use sqlite_rest_query::CompiledQuery;

/// Query execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Result rows as JSON objects
    pub rows: Vec<JsonValue>,
    /// Number of rows affected (for mutations)
    pub rows_affected: u64,
}

impl QueryResult {
    /// Create from rows
    pub fn from_rows(rows: Vec<JsonValue>) -> Self {
        Self {
            rows_affected: rows.len() as u64,
            rows,
        }
    }

    /// Create from a mutation's affected row count
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: vec![],
            rows_affected,
        }
    }
}

/// Execution interface the HTTP layer runs compiled statements through
#[async_trait::async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run a row-returning statement
    async fn query(&self, compiled: &CompiledQuery) -> Result<QueryResult>;

    /// Run a mutation
    async fn execute(&self, compiled: &CompiledQuery) -> Result<QueryResult>;

    /// Run a `select count(1)` statement
    async fn count(&self, compiled: &CompiledQuery) -> Result<i64>;

    /// Column names of `table`, in declaration order
    async fn table_columns(&self, table: &str) -> Result<Vec<String>>;
}

/// `sqlx` backed SQLite executor
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for the configured data source, creating the file if needed
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.dsn)
            .map_err(|e| Error::Config(format!("invalid database dsn: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(database_error)?;

        info!(dsn = %config.dsn, "connected to database");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl QueryBackend for SqliteBackend {
    async fn query(&self, compiled: &CompiledQuery) -> Result<QueryResult> {
        let rows = bind_values(sqlx::query(&compiled.query), &compiled.values)
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        let rows = rows
            .iter()
            .map(|row| row_to_json(row).map(JsonValue::Object))
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryResult::from_rows(rows))
    }

    async fn execute(&self, compiled: &CompiledQuery) -> Result<QueryResult> {
        let result = bind_values(sqlx::query(&compiled.query), &compiled.values)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(QueryResult::affected(result.rows_affected()))
    }

    async fn count(&self, compiled: &CompiledQuery) -> Result<i64> {
        let row = bind_values(sqlx::query(&compiled.query), &compiled.values)
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)?;

        row.try_get::<i64, _>(0).map_err(database_error)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("select name from pragma_table_info(?) order by cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)
    }
}

fn database_error(err: sqlx::Error) -> Error {
    Error::Database(err.to_string())
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[JsonValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            JsonValue::Null => query.bind(Option::<i64>::None),
            JsonValue::Bool(b) => query.bind(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            JsonValue::String(s) => query.bind(s.clone()),
            // nested values are stored as their JSON text
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Decode by the runtime storage class, not the declared column type
fn row_to_json(row: &SqliteRow) -> Result<Map<String, JsonValue>> {
    let mut object = Map::new();

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(database_error)?;

        let value = if raw.is_null() {
            JsonValue::Null
        } else {
            let storage_class = raw.type_info().name().to_string();
            match storage_class.as_str() {
                "INTEGER" | "BOOLEAN" => {
                    JsonValue::from(row.try_get_unchecked::<i64, _>(index).map_err(database_error)?)
                }
                "REAL" => {
                    JsonValue::from(row.try_get_unchecked::<f64, _>(index).map_err(database_error)?)
                }
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index).map_err(database_error)?;
                    JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => JsonValue::String(
                    row.try_get_unchecked::<String, _>(index)
                        .map_err(database_error)?,
                ),
            }
        };

        object.insert(column.name().to_string(), value);
    }

    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_backend() -> SqliteBackend {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteBackend::new(pool)
    }

    fn compiled(query: &str, values: Vec<JsonValue>) -> CompiledQuery {
        CompiledQuery {
            query: query.to_string(),
            values,
        }
    }

    #[tokio::test]
    async fn test_execute_and_query() {
        let backend = memory_backend().await;
        backend
            .execute(&compiled("create table test (id int, s text, f real, b blob)", vec![]))
            .await
            .unwrap();

        let result = backend
            .execute(&compiled(
                "insert into test (b, f, id, s) values (?, ?, ?, ?), (?, ?, ?, ?)",
                vec![
                    JsonValue::Null,
                    json!(1.5),
                    json!(1),
                    json!("a"),
                    JsonValue::Null,
                    JsonValue::Null,
                    json!(2),
                    JsonValue::Null,
                ],
            ))
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 2);

        let result = backend
            .query(&compiled("select * from test order by id", vec![]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0], json!({"id": 1, "s": "a", "f": 1.5, "b": null}));
        assert_eq!(result.rows[1]["s"], JsonValue::Null);
    }

    #[tokio::test]
    async fn test_count() {
        let backend = memory_backend().await;
        backend
            .execute(&compiled("create table test (id int)", vec![]))
            .await
            .unwrap();
        backend
            .execute(&compiled("insert into test values (1), (2), (3)", vec![]))
            .await
            .unwrap();

        let count = backend
            .count(&compiled("select count(1) from test where id > ?", vec![json!("1")]))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_table_columns() {
        let backend = memory_backend().await;
        backend
            .execute(&compiled("create table test (id int primary key, s text)", vec![]))
            .await
            .unwrap();

        assert_eq!(backend.table_columns("test").await.unwrap(), vec!["id", "s"]);
        assert!(backend.table_columns("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_table() {
        let backend = memory_backend().await;
        match backend.query(&compiled("select * from test", vec![])).await {
            Err(Error::Database(message)) => assert!(message.contains("no such table: test")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
