//! MySQL driver backed by a sqlx pool

use crate::executor::{log_statement, run_transaction, TransactionStatements};
use crate::grammar::{Grammar, MySqlGrammar, Sql};
use crate::{DatabaseConfig, DatabaseProvider, Error, Result, Row, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Executor, MySql, Row as _, TypeInfo, ValueRef};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// MySQL connection pool
#[derive(Debug, Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    /// Create a new pool from a connection string with default settings
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(&DatabaseConfig::new(url)).await
    }

    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout_duration())
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl DatabaseProvider for MySqlDatabase {
    type Connection = MySqlConnection;

    fn grammar(&self) -> &dyn Grammar {
        &MySqlGrammar
    }

    async fn query(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        fetch(&self.pool, sql, bindings).await
    }

    async fn raw(&self, sql: &str) -> Result<Vec<Row>> {
        fetch_raw(&self.pool, sql).await
    }

    /// `LAST_INSERT_ID()` is per connection, so an insert and the select
    /// that reads it back must share one.
    async fn query_sequence(&self, statements: Vec<Sql>) -> Result<Vec<Row>> {
        let mut connection = self.pool.acquire().await?;
        let mut rows = Vec::new();
        for statement in &statements {
            rows.extend(fetch(&mut *connection, statement.sql(), statement.bindings()).await?);
        }
        Ok(rows)
    }

    async fn transaction<T, F, Fut>(&self, body: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(Self::Connection) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let connection = MySqlConnection::new(self.pool.acquire().await?);
        connection.transaction(body).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// A pooled MySQL connection held for the duration of a transaction.
/// Nested transactions on it become savepoints.
#[derive(Clone)]
pub struct MySqlConnection {
    inner: Arc<PinnedConnection>,
}

struct PinnedConnection {
    connection: Mutex<Option<PoolConnection<MySql>>>,
    depth: AtomicUsize,
    settled: AtomicBool,
}

impl Drop for PinnedConnection {
    fn drop(&mut self) {
        if self.settled.load(Ordering::Acquire) {
            return;
        }
        if let Some(connection) = self.connection.get_mut().take() {
            tracing::error!("transaction did not settle, closing its connection");
            drop(connection.detach());
        }
    }
}

impl fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("depth", &self.inner.depth.load(Ordering::Relaxed))
            .field("settled", &self.inner.settled.load(Ordering::Relaxed))
            .finish()
    }
}

impl MySqlConnection {
    fn new(connection: PoolConnection<MySql>) -> Self {
        Self {
            inner: Arc::new(PinnedConnection {
                connection: Mutex::new(Some(connection)),
                depth: AtomicUsize::new(0),
                settled: AtomicBool::new(false),
            }),
        }
    }
}

impl DatabaseProvider for MySqlConnection {
    type Connection = MySqlConnection;

    fn grammar(&self) -> &dyn Grammar {
        &MySqlGrammar
    }

    async fn query(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        let mut guard = self.inner.connection.lock().await;
        let connection = guard
            .as_mut()
            .ok_or_else(|| Error::invalid_query("transaction connection was released"))?;
        fetch(&mut **connection, sql, bindings).await
    }

    async fn raw(&self, sql: &str) -> Result<Vec<Row>> {
        let mut guard = self.inner.connection.lock().await;
        let connection = guard
            .as_mut()
            .ok_or_else(|| Error::invalid_query("transaction connection was released"))?;
        fetch_raw(&mut **connection, sql).await
    }

    async fn transaction<T, F, Fut>(&self, body: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(Self::Connection) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let depth = self.inner.depth.fetch_add(1, Ordering::AcqRel);
        let statements = if depth == 0 {
            TransactionStatements::new("START TRANSACTION")
        } else {
            TransactionStatements::savepoint(&format!("quarry_sp_{}", depth))
        };

        let inner = Arc::clone(&self.inner);
        let result = run_transaction(self.clone(), statements, body, move || {
            if depth == 0 {
                inner.settled.store(true, Ordering::Release);
            }
        })
        .await;

        self.inner.depth.fetch_sub(1, Ordering::AcqRel);
        result
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

async fn fetch<'c, E>(executor: E, sql: &str, bindings: &[Value]) -> Result<Vec<Row>>
where
    E: Executor<'c, Database = MySql>,
{
    log_statement(&MySqlGrammar, sql, bindings.len());
    let rows = bind_values(sqlx::query(sql), bindings)
        .fetch_all(executor)
        .await?;
    rows.iter().map(decode_row).collect()
}

async fn fetch_raw<'c, E>(executor: E, sql: &str) -> Result<Vec<Row>>
where
    E: Executor<'c, Database = MySql>,
{
    log_statement(&MySqlGrammar, sql, 0);
    let rows = executor.fetch_all(sql).await?;
    rows.iter().map(decode_row).collect()
}

fn bind_values<'q>(
    mut query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    bindings: &[Value],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    for value in bindings {
        query = match value {
            Value::Null => query.bind(None::<i32>),
            Value::Int(i) => query.bind(*i),
            Value::Double(f) => query.bind(*f),
            Value::Bool(b) => query.bind(*b),
            Value::String(s) => query.bind(s.clone()),
            Value::Date(date) => query.bind(*date),
            Value::Json(bytes) => match serde_json::from_slice::<serde_json::Value>(bytes) {
                Ok(json) => query.bind(sqlx::types::Json(json)),
                Err(_) => query.bind(bytes.clone()),
            },
            // uuid columns are varchar(36) in this dialect
            Value::Uuid(id) => query.bind(id.hyphenated().to_string()),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let name = column.name();
        if row.try_get_raw(index)?.is_null() {
            decoded.push(name, Value::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                Value::Int(row.try_get::<i64, _>(index)?)
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => {
                let unsigned = row.try_get::<u64, _>(index)?;
                let signed = i64::try_from(unsigned)
                    .map_err(|_| Error::decode(name, format!("{} overflows i64", unsigned)))?;
                Value::Int(signed)
            }
            "FLOAT" => Value::Double(row.try_get::<f32, _>(index)?.into()),
            "DOUBLE" => Value::Double(row.try_get::<f64, _>(index)?),
            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
                Value::String(row.try_get::<String, _>(index)?)
            }
            "DATETIME" => Value::Date(row.try_get::<NaiveDateTime, _>(index)?.and_utc()),
            "TIMESTAMP" => Value::Date(row.try_get::<DateTime<Utc>, _>(index)?),
            "DATE" => {
                let date = row.try_get::<NaiveDate, _>(index)?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| Error::decode(name, "date out of range"))?;
                Value::Date(midnight.and_utc())
            }
            "JSON" => {
                let json = row.try_get::<serde_json::Value, _>(index)?;
                Value::Json(serde_json::to_vec(&json)?)
            }
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                Value::Json(row.try_get::<Vec<u8>, _>(index)?)
            }
            other => {
                return Err(Error::decode(
                    name,
                    format!("unsupported column type {}", other),
                ))
            }
        };
        decoded.push(name, value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_binding_types() {
        let bindings = vec![
            Value::Null,
            Value::Int(-3),
            Value::Double(0.5),
            Value::Bool(false),
            Value::from("text"),
            Value::Date(Utc::now()),
            Value::from(serde_json::json!([1, 2])),
            Value::Uuid(uuid::Uuid::new_v4()),
        ];
        let sql = "SELECT ?, ?, ?, ?, ?, ?, ?, ?";
        let _bound = bind_values(sqlx::query(sql), &bindings);
        assert_eq!(MySqlGrammar.position_bindings(sql), sql);
    }
}
