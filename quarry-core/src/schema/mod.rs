//! Table and column builders compiled to DDL through a grammar

mod migration;

pub use migration::{Migration, Migrator, MIGRATIONS_TABLE};

use crate::grammar::{Grammar, Sql};
use crate::{Result, Value};
use serde::Serialize;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Abstract column type, mapped to a type name by each grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Date,
    Double,
    /// Auto incrementing integer
    Increments,
    Int,
    BigInt,
    Json,
    String(StringLength),
    Uuid,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Increments | ColumnType::Int | ColumnType::BigInt
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLength {
    Unlimited,
    Limit(u32),
}

/// `ON DELETE` / `ON UPDATE` behaviour of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOption {
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    NoAction,
}

impl fmt::Display for ReferenceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceOption::Restrict => write!(f, "RESTRICT"),
            ReferenceOption::Cascade => write!(f, "CASCADE"),
            ReferenceOption::SetNull => write!(f, "SET NULL"),
            ReferenceOption::SetDefault => write!(f, "SET DEFAULT"),
            ReferenceOption::NoAction => write!(f, "NO ACTION"),
        }
    }
}

/// A column default, rendered by the grammar at compile time
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Literal(Value),
    Expression(String),
    Json(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    NotNull,
    Default(ColumnDefault),
    PrimaryKey,
    Unique,
    ForeignKey {
        column: String,
        table: String,
        on_delete: Option<ReferenceOption>,
        on_update: Option<ReferenceOption>,
    },
    Unsigned,
}

/// Description of a column to create
#[derive(Debug, Clone, PartialEq)]
pub struct CreateColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub constraints: Vec<ColumnConstraint>,
}

impl CreateColumn {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            constraints: Vec::new(),
        }
    }

    pub fn with(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// An index over one or more columns
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub columns: Vec<String>,
    pub unique: bool,
}

impl CreateIndex {
    pub fn new(columns: Vec<String>, unique: bool) -> Self {
        Self { columns, unique }
    }

    /// `<table>_<columns>_idx`, or `_unique_key` for unique indexes
    pub fn name(&self, table: &str) -> String {
        let suffix = if self.unique { "unique_key" } else { "idx" };
        format!("{}_{}_{}", table, self.columns.join("_"), suffix)
    }
}

/// Builder for one column; every modifier returns the builder for chaining
#[derive(Debug, Clone)]
pub struct CreateColumnBuilder {
    column: CreateColumn,
}

impl CreateColumnBuilder {
    fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            column: CreateColumn::new(name, column_type),
        }
    }

    fn adding(&mut self, constraint: ColumnConstraint) -> &mut Self {
        self.column.constraints.push(constraint);
        self
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.adding(ColumnConstraint::NotNull)
    }

    pub fn unique(&mut self) -> &mut Self {
        self.adding(ColumnConstraint::Unique)
    }

    pub fn primary(&mut self) -> &mut Self {
        self.adding(ColumnConstraint::PrimaryKey)
    }

    /// Reference `column` on `table`
    pub fn references(
        &mut self,
        column: &str,
        table: &str,
        on_delete: Option<ReferenceOption>,
        on_update: Option<ReferenceOption>,
    ) -> &mut Self {
        self.adding(ColumnConstraint::ForeignKey {
            column: column.to_string(),
            table: table.to_string(),
            on_delete,
            on_update,
        })
    }

    /// A literal default value
    pub fn default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.adding(ColumnConstraint::Default(ColumnDefault::Literal(value.into())))
    }

    /// A SQL expression default, inserted verbatim
    pub fn default_expression(&mut self, expression: &str) -> &mut Self {
        self.adding(ColumnConstraint::Default(ColumnDefault::Expression(
            expression.to_string(),
        )))
    }

    pub fn default_now(&mut self) -> &mut Self {
        self.default_expression("CURRENT_TIMESTAMP")
    }

    /// A JSON document default for json columns
    pub fn default_json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self> {
        let json = serde_json::to_string(value)?;
        Ok(self.adding(ColumnConstraint::Default(ColumnDefault::Json(json))))
    }

    /// Unsigned integer. Only rendered by dialects that have unsigned types.
    pub fn unsigned(&mut self) -> &mut Self {
        self.adding(ColumnConstraint::Unsigned)
    }

    pub fn build(&self) -> CreateColumn {
        self.column.clone()
    }
}

/// Columns and indexes of a table being created
#[derive(Debug, Clone, Default)]
pub struct CreateTableBuilder {
    columns: Vec<CreateColumnBuilder>,
    indexes: Vec<CreateIndex>,
}

impl CreateTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn column(&mut self, name: &str, column_type: ColumnType) -> &mut CreateColumnBuilder {
        self.columns.push(CreateColumnBuilder::new(name, column_type));
        let index = self.columns.len() - 1;
        &mut self.columns[index]
    }

    pub fn increments(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Increments)
    }

    pub fn int(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Int)
    }

    pub fn big_int(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::BigInt)
    }

    pub fn double(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Double)
    }

    /// Unlimited text column
    pub fn string(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::String(StringLength::Unlimited))
    }

    pub fn string_with_length(&mut self, name: &str, length: u32) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::String(StringLength::Limit(length)))
    }

    pub fn uuid(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Uuid)
    }

    pub fn bool(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Bool)
    }

    pub fn date(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Date)
    }

    pub fn json(&mut self, name: &str) -> &mut CreateColumnBuilder {
        self.column(name, ColumnType::Json)
    }

    /// `created_at` and `updated_at`, both defaulting to now
    pub fn timestamps(&mut self) {
        self.date("created_at").default_now();
        self.date("updated_at").default_now();
    }

    pub fn index(&mut self, columns: &[&str], unique: bool) {
        self.indexes.push(CreateIndex::new(
            columns.iter().map(|c| c.to_string()).collect(),
            unique,
        ));
    }

    pub fn create_columns(&self) -> Vec<CreateColumn> {
        self.columns.iter().map(CreateColumnBuilder::build).collect()
    }

    pub fn create_indexes(&self) -> &[CreateIndex] {
        &self.indexes
    }
}

/// Changes to an existing table. Column and index creation goes through
/// the wrapped [`CreateTableBuilder`].
#[derive(Debug, Clone, Default)]
pub struct AlterTableBuilder {
    create: CreateTableBuilder,
    dropped_columns: Vec<String>,
    renamed_columns: Vec<(String, String)>,
    dropped_indexes: Vec<String>,
}

impl AlterTableBuilder {
    pub fn drop_column(&mut self, column: &str) {
        self.dropped_columns.push(column.to_string());
    }

    pub fn rename_column(&mut self, column: &str, to: &str) {
        self.renamed_columns
            .push((column.to_string(), to.to_string()));
    }

    pub fn drop_index(&mut self, name: &str) {
        self.dropped_indexes.push(name.to_string());
    }
}

impl Deref for AlterTableBuilder {
    type Target = CreateTableBuilder;

    fn deref(&self) -> &Self::Target {
        &self.create
    }
}

impl DerefMut for AlterTableBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.create
    }
}

/// Records DDL statements compiled by one grammar.
///
/// # Examples
/// ```
/// use quarry_core::grammar::PostgresGrammar;
/// use quarry_core::schema::Schema;
///
/// let mut schema = Schema::new(&PostgresGrammar);
/// schema
///     .create("users", |table| {
///         table.increments("id").primary();
///         table.string("email").not_null().unique();
///     })
///     .unwrap();
/// assert_eq!(
///     schema.statements()[0].sql(),
///     "CREATE TABLE users (\n    id serial,\n    email text NOT NULL,\n    PRIMARY KEY (id),\n    UNIQUE (email)\n)"
/// );
/// ```
#[derive(Debug)]
pub struct Schema<'g> {
    grammar: &'g dyn Grammar,
    statements: Vec<Sql>,
}

impl<'g> Schema<'g> {
    pub fn new(grammar: &'g dyn Grammar) -> Self {
        Self {
            grammar,
            statements: Vec::new(),
        }
    }

    pub fn create<F>(&mut self, table: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut CreateTableBuilder),
    {
        self.create_table(table, false, build)
    }

    pub fn create_if_not_exists<F>(&mut self, table: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut CreateTableBuilder),
    {
        self.create_table(table, true, build)
    }

    fn create_table<F>(&mut self, table: &str, if_not_exists: bool, build: F) -> Result<()>
    where
        F: FnOnce(&mut CreateTableBuilder),
    {
        let mut builder = CreateTableBuilder::new();
        build(&mut builder);
        let create = self.grammar.compile_create_table(
            table,
            if_not_exists,
            &builder.create_columns(),
        )?;
        self.statements.push(create);
        self.statements.extend(
            self.grammar
                .compile_create_indexes(table, builder.create_indexes()),
        );
        Ok(())
    }

    pub fn alter<F>(&mut self, table: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut AlterTableBuilder),
    {
        let mut builder = AlterTableBuilder::default();
        build(&mut builder);

        let alterations = self.grammar.compile_alter_table(
            table,
            &builder.dropped_columns,
            &builder.create_columns(),
            &builder.renamed_columns,
        )?;
        self.statements.extend(alterations);
        for index in &builder.dropped_indexes {
            self.statements
                .push(self.grammar.compile_drop_index(table, index));
        }
        self.statements.extend(
            self.grammar
                .compile_create_indexes(table, builder.create_indexes()),
        );
        Ok(())
    }

    pub fn drop(&mut self, table: &str) {
        self.statements.push(self.grammar.compile_drop_table(table));
    }

    pub fn rename(&mut self, table: &str, to: &str) {
        self.statements
            .push(self.grammar.compile_rename_table(table, to));
    }

    /// Append a statement verbatim
    pub fn raw(&mut self, sql: &str) {
        self.statements.push(Sql::raw(sql));
    }

    pub fn statements(&self) -> &[Sql] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<Sql> {
        self.statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{MySqlGrammar, PostgresGrammar, StandardGrammar};
    use crate::Error;

    fn sql(schema: &Schema<'_>) -> Vec<String> {
        schema
            .statements()
            .iter()
            .map(|s| s.sql().to_string())
            .collect()
    }

    #[test]
    fn test_column_builder() {
        let mut table = CreateTableBuilder::new();
        table
            .int("team_id")
            .not_null()
            .references("id", "teams", Some(ReferenceOption::Cascade), None);
        table.date("created_at").default_now();

        let columns = table.create_columns();
        assert_eq!(columns[0].constraints.len(), 2);
        assert_eq!(
            columns[1].constraints,
            vec![ColumnConstraint::Default(ColumnDefault::Expression(
                "CURRENT_TIMESTAMP".to_string()
            ))]
        );
    }

    #[test]
    fn test_create_with_indexes() {
        let mut schema = Schema::new(&PostgresGrammar);
        schema
            .create("users", |table| {
                table.uuid("id").primary();
                table.string_with_length("email", 255).not_null();
                table.bool("is_admin").default(false);
                table.double("score");
                table.big_int("visits").default(0);
                table.index(&["email"], true);
            })
            .unwrap();
        assert_eq!(
            sql(&schema),
            vec![
                "CREATE TABLE users (\n    id uuid,\n    email varchar(255) NOT NULL,\n    \
                 is_admin bool DEFAULT false,\n    score float8,\n    visits bigint DEFAULT 0,\n    \
                 PRIMARY KEY (id)\n)",
                "CREATE UNIQUE INDEX users_email_unique_key ON users (email)",
            ]
        );
    }

    #[test]
    fn test_mysql_create() {
        let mut schema = Schema::new(&MySqlGrammar);
        schema
            .create_if_not_exists("profiles", |table| {
                table.increments("id").primary();
                table.int("age").unsigned().not_null();
                table.string("bio").default("none");
                table
                    .json("settings")
                    .default_json(&serde_json::json!({"theme": "dark"}))
                    .unwrap();
                table.uuid("token");
            })
            .unwrap();
        assert_eq!(
            sql(&schema)[0],
            "CREATE TABLE IF NOT EXISTS profiles (\n    id serial,\n    \
             age int UNSIGNED NOT NULL,\n    bio text DEFAULT ('none'),\n    \
             settings json DEFAULT ('{\"theme\":\"dark\"}'),\n    token varchar(36),\n    \
             PRIMARY KEY (id)\n)"
        );
    }

    #[test]
    fn test_compile_errors_surface() {
        let mut schema = Schema::new(&StandardGrammar);
        let result = schema.create("users", |table| {
            table.string("name").unsigned();
        });
        assert!(matches!(result, Err(Error::Compilation { .. })));

        let result = schema.create("users", |table| {
            table.increments("id").default(1);
        });
        assert!(matches!(result, Err(Error::Compilation { .. })));
        assert!(schema.statements().is_empty());
    }

    #[test]
    fn test_alter() {
        let mut schema = Schema::new(&MySqlGrammar);
        schema
            .alter("users", |table| {
                table.drop_column("nickname");
                table.rename_column("name", "full_name");
                table.string_with_length("phone", 20);
                table.drop_index("users_email_idx");
                table.index(&["phone"], false);
            })
            .unwrap();
        assert_eq!(
            sql(&schema),
            vec![
                "ALTER TABLE users\n    DROP COLUMN nickname,\n    ADD COLUMN phone varchar(20)",
                "ALTER TABLE users RENAME COLUMN name TO full_name",
                "DROP INDEX users_email_idx ON users",
                "CREATE INDEX users_phone_idx ON users (phone)",
            ]
        );
    }

    #[test]
    fn test_drop_rename_raw() {
        let mut schema = Schema::new(&PostgresGrammar);
        schema.rename("users", "people");
        schema.drop("people");
        schema.raw("CREATE EXTENSION IF NOT EXISTS pgcrypto");
        assert_eq!(
            sql(&schema),
            vec![
                "ALTER TABLE users RENAME TO people",
                "DROP TABLE people",
                "CREATE EXTENSION IF NOT EXISTS pgcrypto",
            ]
        );
    }

    #[test]
    fn test_timestamps() {
        let mut table = CreateTableBuilder::new();
        table.timestamps();
        let names: Vec<String> = table
            .create_columns()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["created_at", "updated_at"]);
    }
}
