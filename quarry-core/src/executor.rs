//! Query execution interface shared by every database driver

use crate::grammar::{Grammar, Sql};
use crate::{Query, Result, Row, Value};
use std::future::Future;

/// A database that can compile and run queries.
///
/// Implemented by the connection pools in [`crate::drivers`] and by the
/// connections they pin for transactions.
pub trait DatabaseProvider: Send + Sync {
    /// Handle passed to transaction bodies; every statement issued through
    /// it runs on the same underlying connection.
    type Connection: DatabaseProvider + Clone + 'static;

    /// The dialect used to compile queries for this database
    fn grammar(&self) -> &dyn Grammar;

    /// Run a statement with `?` placeholders and return its rows
    fn query(&self, sql: &str, bindings: &[Value]) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Run a statement without bindings
    fn raw(&self, sql: &str) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Run statements in order and concatenate their rows.
    ///
    /// Pools override this to keep the whole sequence on one connection.
    fn query_sequence(&self, statements: Vec<Sql>) -> impl Future<Output = Result<Vec<Row>>> + Send {
        async move {
            let mut rows = Vec::new();
            for statement in &statements {
                rows.extend(self.query(statement.sql(), statement.bindings()).await?);
            }
            Ok(rows)
        }
    }

    /// Run `body` inside a transaction.
    ///
    /// The transaction commits when the body returns `Ok` and rolls back when
    /// it returns `Err` or the commit fails; the original error is returned
    /// in both failure cases.
    fn transaction<T, F, Fut>(&self, body: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: FnOnce(Self::Connection) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send;

    /// Close all connections. Calling it twice is harmless.
    fn shutdown(&self) -> impl Future<Output = Result<()>> + Send;

    /// Start a query without a table
    fn query_builder(&self) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self)
    }

    /// Start a query on `name`
    ///
    /// # Examples
    /// ```
    /// use quarry_core::{DatabaseProvider, StubDatabase};
    ///
    /// let db = StubDatabase::new();
    /// let sql = db.table("users").where_(("id", 1)).to_sql().unwrap();
    /// assert_eq!(sql.sql(), "SELECT * FROM users WHERE id = ?");
    /// ```
    fn table(&self, name: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self).table(name)
    }
}

/// Statements used to open and close one transaction level
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransactionStatements {
    pub begin: String,
    pub commit: String,
    pub rollback: String,
}

impl TransactionStatements {
    pub fn new(begin: &str) -> Self {
        Self {
            begin: begin.to_string(),
            commit: "COMMIT".to_string(),
            rollback: "ROLLBACK".to_string(),
        }
    }

    pub fn savepoint(name: &str) -> Self {
        Self {
            begin: format!("SAVEPOINT {}", name),
            commit: format!("RELEASE SAVEPOINT {}", name),
            rollback: format!("ROLLBACK TO SAVEPOINT {}", name),
        }
    }
}

/// Drive one transaction level on a pinned connection.
///
/// `on_settled` runs once the level has been committed or rolled back; it
/// is skipped when ROLLBACK itself fails and the connection state is
/// unknown.
pub(crate) async fn run_transaction<C, T, F, Fut, S>(
    connection: C,
    statements: TransactionStatements,
    body: F,
    on_settled: S,
) -> Result<T>
where
    C: DatabaseProvider + Clone,
    F: FnOnce(C) -> Fut,
    Fut: Future<Output = Result<T>>,
    S: FnOnce(),
{
    connection.raw(&statements.begin).await?;
    tracing::debug!(
        dialect = connection.grammar().name(),
        statement = %statements.begin,
        "transaction started"
    );

    let outcome = match body(connection.clone()).await {
        Ok(value) => connection.raw(&statements.commit).await.map(|_| value),
        Err(error) => Err(error),
    };

    match outcome {
        Ok(value) => {
            tracing::debug!(statement = %statements.commit, "transaction committed");
            on_settled();
            Ok(value)
        }
        Err(error) => {
            tracing::warn!(error = %error, statement = %statements.rollback, "rolling back transaction");
            match connection.raw(&statements.rollback).await {
                Ok(_) => on_settled(),
                Err(rollback_error) => tracing::error!(
                    error = %rollback_error,
                    "rollback failed, connection will not be reused"
                ),
            }
            Err(error)
        }
    }
}

/// Emit the debug line for an executed statement
pub(crate) fn log_statement(grammar: &dyn Grammar, sql: &str, bindings: usize) {
    tracing::debug!(dialect = grammar.name(), sql, bindings, "executing statement");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, StubDatabase};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_savepoint_statements() {
        let statements = TransactionStatements::savepoint("quarry_sp_1");
        assert_eq!(statements.begin, "SAVEPOINT quarry_sp_1");
        assert_eq!(statements.commit, "RELEASE SAVEPOINT quarry_sp_1");
        assert_eq!(statements.rollback, "ROLLBACK TO SAVEPOINT quarry_sp_1");
    }

    #[tokio::test]
    async fn test_commit_path() {
        let db = StubDatabase::new();
        let mut settled = false;
        let value = run_transaction(
            db.clone(),
            TransactionStatements::new("BEGIN"),
            |conn| async move {
                conn.raw("SELECT 1").await?;
                Ok(5)
            },
            || settled = true,
        )
        .await;
        assert_eq!(assert_ok!(value), 5);
        assert!(settled);
        assert_eq!(db.statements(), vec!["BEGIN", "SELECT 1", "COMMIT"]);
    }

    #[tokio::test]
    async fn test_rollback_returns_original_error() {
        let db = StubDatabase::new();
        let result: Result<()> = run_transaction(
            db.clone(),
            TransactionStatements::new("BEGIN"),
            |_| async move { Err(Error::invalid_query("boom")) },
            || {},
        )
        .await;
        let error = assert_err!(result);
        assert_eq!(error.to_string(), "Invalid query: boom");
        assert_eq!(db.statements(), vec!["BEGIN", "ROLLBACK"]);
    }

    #[tokio::test]
    async fn test_default_query_sequence_concatenates() {
        let db = StubDatabase::new();
        db.stub(vec![Row::new().with("id", 1)]);
        db.stub(vec![Row::new().with("id", 2)]);
        let rows = db
            .query_sequence(vec![Sql::raw("SELECT 1"), Sql::raw("SELECT 2")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("id").unwrap(), &Value::Int(2));
    }
}
