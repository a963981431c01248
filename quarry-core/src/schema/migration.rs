use super::Schema;
use crate::builder::InsertRows;
use crate::grammar::Sql;
use crate::{DatabaseProvider, Error, Result, Value};
use chrono::Utc;
use serde::Deserialize;

/// Bookkeeping table recording applied migrations
pub const MIGRATIONS_TABLE: &str = "migrations";

/// A reversible schema change
pub trait Migration: Send + Sync {
    /// Unique name, recorded once the migration is applied
    fn name(&self) -> &str;

    fn up(&self, schema: &mut Schema<'_>) -> Result<()>;

    fn down(&self, schema: &mut Schema<'_>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppliedMigration {
    pub name: String,
    pub batch: i64,
}

/// Applies and rolls back registered migrations in batches.
///
/// Each `migrate` call runs every pending migration in one transaction and
/// records them under a new batch number; `rollback` reverts the latest
/// batch.
pub struct Migrator<'db, D: DatabaseProvider> {
    database: &'db D,
    migrations: Vec<Box<dyn Migration>>,
}

impl<'db, D: DatabaseProvider> Migrator<'db, D> {
    pub fn new(database: &'db D) -> Self {
        Self {
            database,
            migrations: Vec::new(),
        }
    }

    /// Register a migration. Migrations run in registration order.
    pub fn add<M: Migration + 'static>(mut self, migration: M) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    async fn ensure_table(&self) -> Result<()> {
        let mut schema = Schema::new(self.database.grammar());
        schema.create_if_not_exists(MIGRATIONS_TABLE, |table| {
            table.increments("id").primary();
            table.string_with_length("name", 255).not_null().unique();
            table.int("batch").not_null();
            table.date("run_at").not_null();
        })?;
        for statement in schema.into_statements() {
            self.database.raw(statement.sql()).await?;
        }
        Ok(())
    }

    /// Applied migrations in the order they ran
    pub async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        self.database
            .table(MIGRATIONS_TABLE)
            .select(("name", "batch"))
            .order_by_asc("id")
            .get_as()
            .await
    }

    /// Apply every pending migration as one new batch. Returns the names
    /// that ran.
    pub async fn migrate(&self) -> Result<Vec<String>> {
        self.ensure_table().await?;
        let applied = self.applied().await?;
        let batch = applied.iter().map(|m| m.batch).max().unwrap_or(0) + 1;

        let mut plan = Vec::new();
        for migration in &self.migrations {
            if applied.iter().any(|m| m.name == migration.name()) {
                continue;
            }
            let mut schema = Schema::new(self.database.grammar());
            migration.up(&mut schema)?;
            let record = InsertRows::from_rows([vec![
                ("name", Value::from(migration.name())),
                ("batch", Value::Int(batch)),
                ("run_at", Value::from(Utc::now())),
            ]])?;
            let record = self.database.grammar().compile_insert(MIGRATIONS_TABLE, &record)?;
            plan.push((migration.name().to_string(), schema.into_statements(), record));
        }

        if plan.is_empty() {
            tracing::info!("no pending migrations");
            return Ok(Vec::new());
        }

        self.database
            .transaction(move |conn| async move {
                let mut names = Vec::with_capacity(plan.len());
                for (name, statements, record) in plan {
                    run_statements(&conn, &statements).await?;
                    conn.query(record.sql(), record.bindings()).await?;
                    tracing::info!(migration = %name, batch, "applied migration");
                    names.push(name);
                }
                Ok(names)
            })
            .await
    }

    /// Revert the most recent batch. Returns the names that were reverted,
    /// latest first.
    pub async fn rollback(&self) -> Result<Vec<String>> {
        self.ensure_table().await?;
        let applied = self.applied().await?;
        let Some(batch) = applied.iter().map(|m| m.batch).max() else {
            tracing::info!("nothing to roll back");
            return Ok(Vec::new());
        };

        let mut plan = Vec::new();
        for record in applied.iter().rev().filter(|m| m.batch == batch) {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.name() == record.name)
                .ok_or_else(|| {
                    Error::invalid_query(format!(
                        "migration `{}` is applied but not registered",
                        record.name
                    ))
                })?;
            let mut schema = Schema::new(self.database.grammar());
            migration.down(&mut schema)?;
            let forget = self
                .database
                .table(MIGRATIONS_TABLE)
                .where_(("name", record.name.as_str()));
            let forget = self
                .database
                .grammar()
                .compile_delete(forget.parts())?;
            plan.push((record.name.clone(), schema.into_statements(), forget));
        }

        self.database
            .transaction(move |conn| async move {
                let mut names = Vec::with_capacity(plan.len());
                for (name, statements, forget) in plan {
                    run_statements(&conn, &statements).await?;
                    conn.query(forget.sql(), forget.bindings()).await?;
                    tracing::info!(migration = %name, batch, "rolled back migration");
                    names.push(name);
                }
                Ok(names)
            })
            .await
    }
}

async fn run_statements<C: DatabaseProvider>(conn: &C, statements: &[Sql]) -> Result<()> {
    for statement in statements {
        conn.raw(statement.sql()).await?;
    }
    Ok(())
}
