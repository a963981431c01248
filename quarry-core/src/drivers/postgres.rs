//! PostgreSQL driver backed by a sqlx pool

use crate::executor::{log_statement, run_transaction, TransactionStatements};
use crate::grammar::{Grammar, PostgresGrammar, Sql};
use crate::{DatabaseConfig, DatabaseProvider, Error, Result, Row, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::encode::IsNull;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgPool, PgPoolOptions, PgRow, PgTypeInfo};
use sqlx::{Column, Encode, Executor, Postgres, Row as _, Type, TypeInfo, ValueRef};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Create a new pool from a connection string with default settings
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(&DatabaseConfig::new(url)).await
    }

    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout_duration())
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Create from an existing PgPool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DatabaseProvider for PostgresDatabase {
    type Connection = PostgresConnection;

    fn grammar(&self) -> &dyn Grammar {
        &PostgresGrammar
    }

    async fn query(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        fetch(&self.pool, sql, bindings).await
    }

    async fn raw(&self, sql: &str) -> Result<Vec<Row>> {
        fetch_raw(&self.pool, sql).await
    }

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
        let connection = PostgresConnection::new(self.pool.acquire().await?);
        connection.transaction(body).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// One pooled connection pinned for the lifetime of a transaction.
///
/// Nested transactions on it become savepoints. If the outermost
/// transaction never commits or rolls back cleanly, the connection is
/// closed instead of being handed back to the pool.
#[derive(Clone)]
pub struct PostgresConnection {
    inner: Arc<PinnedConnection>,
}

struct PinnedConnection {
    connection: Mutex<Option<PoolConnection<Postgres>>>,
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

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("depth", &self.inner.depth.load(Ordering::Relaxed))
            .field("settled", &self.inner.settled.load(Ordering::Relaxed))
            .finish()
    }
}

impl PostgresConnection {
    fn new(connection: PoolConnection<Postgres>) -> Self {
        Self {
            inner: Arc::new(PinnedConnection {
                connection: Mutex::new(Some(connection)),
                depth: AtomicUsize::new(0),
                settled: AtomicBool::new(false),
            }),
        }
    }
}

impl DatabaseProvider for PostgresConnection {
    type Connection = PostgresConnection;

    fn grammar(&self) -> &dyn Grammar {
        &PostgresGrammar
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
            TransactionStatements::new("BEGIN")
        } else {
            TransactionStatements::savepoint(&savepoint_name(depth))
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

    /// The pool owns the connection; shutting down a pinned connection is
    /// a no-op.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

fn savepoint_name(depth: usize) -> String {
    format!("quarry_sp_{}", depth)
}

async fn fetch<'c, E>(executor: E, sql: &str, bindings: &[Value]) -> Result<Vec<Row>>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = PostgresGrammar.position_bindings(sql);
    log_statement(&PostgresGrammar, &sql, bindings.len());
    let rows = bind_values(sqlx::query(&sql), bindings)
        .fetch_all(executor)
        .await?;
    rows.iter().map(decode_row).collect()
}

async fn fetch_raw<'c, E>(executor: E, sql: &str) -> Result<Vec<Row>>
where
    E: Executor<'c, Database = Postgres>,
{
    log_statement(&PostgresGrammar, sql, 0);
    let rows = executor.fetch_all(sql).await?;
    rows.iter().map(decode_row).collect()
}

/// NULL sent with an unspecified parameter type; the server infers the
/// type from the column or expression it lands in.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> IsNull {
        IsNull::Yes
    }
}

/// JSON text bound as `json`, so the payload is stored byte for byte.
/// The binary form of `json` is its text.
struct JsonText(Vec<u8>);

const JSON_OID: Oid = Oid(114);

impl Type<Postgres> for JsonText {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(JSON_OID)
    }
}

impl Encode<'_, Postgres> for JsonText {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
        buf.extend_from_slice(&self.0);
        IsNull::No
    }
}

fn is_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}

/// Bind values to a sqlx query in placeholder order
fn bind_values<'q>(
    mut query: sqlx::query::Query<'q, Postgres, PgArguments>,
    bindings: &[Value],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for value in bindings {
        query = match value {
            Value::Null => query.bind(UntypedNull),
            Value::Int(i) => query.bind(*i),
            Value::Double(f) => query.bind(*f),
            Value::Bool(b) => query.bind(*b),
            Value::String(s) => query.bind(s.clone()),
            Value::Date(date) => query.bind(*date),
            Value::Json(bytes) if is_json(bytes) => query.bind(JsonText(bytes.clone())),
            Value::Json(bytes) => query.bind(bytes.clone()),
            Value::Uuid(id) => query.bind(*id),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let name = column.name();
        if row.try_get_raw(index)?.is_null() {
            decoded.push(name, Value::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "INT2" => Value::Int(row.try_get::<i16, _>(index)?.into()),
            "INT4" => Value::Int(row.try_get::<i32, _>(index)?.into()),
            "INT8" => Value::Int(row.try_get::<i64, _>(index)?),
            "FLOAT4" => Value::Double(row.try_get::<f32, _>(index)?.into()),
            "FLOAT8" => Value::Double(row.try_get::<f64, _>(index)?),
            "BOOL" => Value::Bool(row.try_get::<bool, _>(index)?),
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
                Value::String(row.try_get::<String, _>(index)?)
            }
            "TIMESTAMPTZ" => Value::Date(row.try_get::<DateTime<Utc>, _>(index)?),
            "TIMESTAMP" => Value::Date(row.try_get::<NaiveDateTime, _>(index)?.and_utc()),
            "DATE" => {
                let date = row.try_get::<NaiveDate, _>(index)?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| Error::decode(name, "date out of range"))?;
                Value::Date(midnight.and_utc())
            }
            // json keeps the text as written; jsonb is normalized by the server anyway
            "JSON" => Value::Json(row.try_get_unchecked::<String, _>(index)?.into_bytes()),
            "JSONB" => {
                let json = row.try_get::<serde_json::Value, _>(index)?;
                Value::Json(serde_json::to_vec(&json)?)
            }
            "BYTEA" => Value::Json(row.try_get::<Vec<u8>, _>(index)?),
            "UUID" => Value::Uuid(row.try_get::<uuid::Uuid, _>(index)?),
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
