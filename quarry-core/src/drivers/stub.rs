//! In-memory database for tests

use crate::executor::{log_statement, run_transaction, TransactionStatements};
use crate::grammar::{Grammar, Sql, StandardGrammar};
use crate::{DatabaseProvider, Error, Result, Row, Value};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A database that never touches the network.
///
/// Queries pop pre-stubbed responses in FIFO order and every executed
/// statement is recorded, so tests can assert on the exact SQL a code path
/// produced.
///
/// # Examples
/// ```
/// use quarry_core::{DatabaseProvider, Row, StubDatabase};
///
/// # tokio_test::block_on(async {
/// let db = StubDatabase::new();
/// db.stub(vec![Row::new().with("id", 1).with("name", "Josh")]);
///
/// let user = db.table("users").find("id", 1).await.unwrap();
/// assert!(user.is_some());
/// assert_eq!(db.statements(), vec!["SELECT * FROM users WHERE id = ? LIMIT 1"]);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct StubDatabase {
    state: Arc<Mutex<StubState>>,
    grammar: &'static dyn Grammar,
}

impl Default for StubDatabase {
    fn default() -> Self {
        Self::with_grammar(&StandardGrammar)
    }
}

#[derive(Debug, Default)]
struct StubState {
    responses: VecDeque<std::result::Result<Vec<Row>, String>>,
    executed: Vec<Sql>,
    depth: usize,
    shutdown: bool,
}

impl StubDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stub that compiles queries with `grammar`, e.g. `&MySqlGrammar`
    pub fn with_grammar(grammar: &'static dyn Grammar) -> Self {
        Self {
            state: Arc::default(),
            grammar,
        }
    }

    /// Queue the rows returned by the next query
    pub fn stub(&self, rows: Vec<Row>) {
        self.lock().responses.push_back(Ok(rows));
    }

    /// Queue a failure for the next query
    pub fn stub_error(&self, message: impl Into<String>) {
        self.lock().responses.push_back(Err(message.into()));
    }

    /// SQL of every executed statement, in order
    pub fn statements(&self) -> Vec<String> {
        self.lock()
            .executed
            .iter()
            .map(|sql| sql.sql().to_string())
            .collect()
    }

    /// Every executed statement with its bindings
    pub fn executed(&self) -> Vec<Sql> {
        self.lock().executed.clone()
    }

    /// Forget recorded statements
    pub fn clear(&self) {
        self.lock().executed.clear();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, sql: &str, bindings: &[Value]) -> Result<()> {
        log_statement(self.grammar, sql, bindings.len());
        let mut state = self.lock();
        if state.shutdown {
            return Err(Error::stub("database has been shut down"));
        }
        state.executed.push(Sql::new(sql, bindings.to_vec()));
        Ok(())
    }
}

/// Marks the stub as outside a transaction again, even if the body future
/// is dropped early
struct DepthGuard<'a>(&'a StubDatabase);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.depth = state.depth.saturating_sub(1);
    }
}

impl DatabaseProvider for StubDatabase {
    type Connection = StubDatabase;

    fn grammar(&self) -> &dyn Grammar {
        self.grammar
    }

    async fn query(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.record(sql, bindings)?;
        match self.lock().responses.pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(Error::stub(message)),
            None => Err(Error::stub(format!("no stubbed response for `{}`", sql))),
        }
    }

    async fn raw(&self, sql: &str) -> Result<Vec<Row>> {
        self.record(sql, &[])?;
        Ok(Vec::new())
    }

    async fn transaction<T, F, Fut>(&self, body: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(Self::Connection) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let nested = {
            let mut state = self.lock();
            state.depth += 1;
            state.depth > 1
        };
        let _guard = DepthGuard(self);

        if nested {
            // no savepoints here, the body joins the running transaction
            tracing::debug!("flattening nested transaction on stub database");
            return body(self.clone()).await;
        }

        run_transaction(self.clone(), TransactionStatements::new("BEGIN"), body, || {}).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.lock().shutdown = true;
        Ok(())
    }
}
