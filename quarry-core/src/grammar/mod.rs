//! Dialect compilers turning query parts and schema descriptions into SQL

mod mysql;
mod postgres;

pub use mysql::MySqlGrammar;
pub use postgres::{renumber_placeholders, PostgresGrammar};

use crate::builder::{InsertRows, JoinType, QueryParts};
use crate::predicate::Predicate;
use crate::schema::{
    ColumnConstraint, ColumnDefault, ColumnType, CreateColumn, CreateIndex, StringLength,
};
use crate::{Error, Result, Value};
use std::fmt;

/// A compiled statement: SQL text plus the values for its placeholders, in
/// placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sql {
    sql: String,
    bindings: Vec<Value>,
}

impl Sql {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// A statement without bindings
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.bindings)
    }

    /// Number of `?` placeholders outside single-quoted literals
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Emit a placeholder together with its value
    pub(crate) fn push_binding(&mut self, value: Value) {
        self.sql.push('?');
        self.bindings.push(value);
    }

    /// Emit a raw fragment whose own placeholders must match its bindings
    pub(crate) fn push_fragment(&mut self, fragment: &str, bindings: &[Value]) -> Result<()> {
        let placeholders = count_placeholders(fragment);
        if placeholders != bindings.len() {
            return Err(Error::compilation(format!(
                "raw fragment `{}` has {} placeholder(s) but {} binding(s)",
                fragment,
                placeholders,
                bindings.len()
            )));
        }
        self.sql.push_str(fragment);
        self.bindings.extend_from_slice(bindings);
        Ok(())
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Count `?` tokens outside single-quoted string literals
pub fn count_placeholders(sql: &str) -> usize {
    let mut in_literal = false;
    let mut count = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}

/// A SQL dialect.
///
/// Every method has a default that renders the ANSI-ish base dialect;
/// implementors override only the parts that differ.
pub trait Grammar: Send + Sync + fmt::Debug {
    /// Dialect name used in log output
    fn name(&self) -> &'static str;

    /// Rewrite placeholders into the driver's native style right before
    /// execution. Must be idempotent.
    fn position_bindings(&self, sql: &str) -> String {
        sql.to_string()
    }

    /// Whether UPDATE and DELETE return the affected rows
    fn returns_modified_rows(&self) -> bool {
        false
    }

    fn compile_select(&self, query: &QueryParts) -> Result<Sql> {
        let table = query
            .table
            .as_ref()
            .ok_or_else(|| Error::compilation("SELECT requires a table"))?;

        let mut sql = Sql::default();
        sql.push_str("SELECT ");
        if query.distinct {
            sql.push_str("DISTINCT ");
        }
        if query.columns.is_empty() {
            sql.push_str("*");
        } else {
            sql.push_str(&query.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&table.to_string());

        self.compile_joins(query, &mut sql)?;
        self.compile_wheres(&query.wheres, &mut sql)?;

        if !query.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&query.groups.join(", "));
        }

        if !query.havings.is_empty() {
            sql.push_str(" HAVING ");
            self.compile_predicates(&query.havings, &mut sql)?;
        }

        if !query.orders.is_empty() {
            let orders: Vec<String> = query
                .orders
                .iter()
                .map(|order| format!("{} {}", order.column, order.direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        self.compile_limit_offset(query.limit, query.offset, &mut sql);
        Ok(sql)
    }

    fn compile_joins(&self, query: &QueryParts, sql: &mut Sql) -> Result<()> {
        for join in &query.joins {
            sql.push_str(&format!(" {} JOIN {}", join.join_type, join.table));
            if join.join_type == JoinType::Cross {
                continue;
            }
            if join.conditions.is_empty() {
                return Err(Error::compilation(format!(
                    "{} JOIN on `{}` requires an ON condition",
                    join.join_type, join.table
                )));
            }
            sql.push_str(" ON ");
            self.compile_predicates(&join.conditions, sql)?;
        }
        Ok(())
    }

    fn compile_wheres(&self, wheres: &[Predicate], sql: &mut Sql) -> Result<()> {
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            self.compile_predicates(wheres, sql)?;
        }
        Ok(())
    }

    fn compile_limit_offset(&self, limit: Option<i64>, offset: Option<i64>, sql: &mut Sql) {
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }

    /// Render a predicate list depth first. The connector of the first
    /// predicate is dropped.
    fn compile_predicates(&self, predicates: &[Predicate], sql: &mut Sql) -> Result<()> {
        for (index, predicate) in predicates.iter().enumerate() {
            if index > 0 {
                sql.push_str(&format!(" {} ", predicate.connector()));
            }
            match predicate {
                Predicate::Value {
                    column,
                    operator,
                    value,
                    ..
                } => {
                    sql.push_str(&format!("{} {} ", column, operator));
                    sql.push_binding(value.clone());
                }
                Predicate::Column {
                    first,
                    operator,
                    second,
                    ..
                } => {
                    sql.push_str(&format!("{} {} {}", first, operator, second));
                }
                Predicate::In {
                    column,
                    values,
                    negated,
                    ..
                } => {
                    if values.is_empty() {
                        // IN () is not valid SQL
                        sql.push_str(if *negated { "1 = 1" } else { "0 = 1" });
                        continue;
                    }
                    sql.push_str(column);
                    sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                    for (position, value) in values.iter().enumerate() {
                        if position > 0 {
                            sql.push_str(", ");
                        }
                        sql.push_binding(value.clone());
                    }
                    sql.push_str(")");
                }
                Predicate::Raw {
                    sql: fragment,
                    bindings,
                    ..
                } => {
                    sql.push_fragment(fragment, bindings)?;
                }
                Predicate::Nested { predicates, .. } => {
                    if predicates.is_empty() {
                        return Err(Error::compilation("nested WHERE group has no predicates"));
                    }
                    sql.push_str("(");
                    self.compile_predicates(predicates, sql)?;
                    sql.push_str(")");
                }
            }
        }
        Ok(())
    }

    fn compile_insert(&self, table: &str, rows: &InsertRows) -> Result<Sql> {
        if rows.columns.is_empty() || rows.rows.is_empty() {
            return Err(Error::compilation("INSERT requires columns and values"));
        }

        let mut sql = Sql::default();
        sql.push_str(&format!(
            "INSERT INTO {} ({}) VALUES ",
            table,
            rows.columns.join(", ")
        ));
        for (index, row) in rows.rows.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(");
            for (position, value) in row.iter().enumerate() {
                if position > 0 {
                    sql.push_str(", ");
                }
                sql.push_binding(value.clone());
            }
            sql.push_str(")");
        }
        Ok(sql)
    }

    /// INSERT statements whose results are the inserted rows
    fn compile_insert_return(&self, table: &str, rows: &InsertRows) -> Result<Vec<Sql>> {
        let mut sql = self.compile_insert(table, rows)?;
        sql.push_str(" RETURNING *");
        Ok(vec![sql])
    }

    fn compile_update(&self, query: &QueryParts, values: &[(String, Value)]) -> Result<Sql> {
        let table = query
            .table
            .as_ref()
            .ok_or_else(|| Error::compilation("UPDATE requires a table"))?;
        if values.is_empty() {
            return Err(Error::invalid_query("UPDATE requires at least one value"));
        }

        let mut sql = Sql::default();
        sql.push_str(&format!("UPDATE {} SET ", table));
        for (index, (column, value)) in values.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("{} = ", column));
            sql.push_binding(value.clone());
        }
        self.compile_wheres(&query.wheres, &mut sql)?;
        if self.returns_modified_rows() {
            sql.push_str(" RETURNING *");
        }
        Ok(sql)
    }

    fn compile_delete(&self, query: &QueryParts) -> Result<Sql> {
        let table = query
            .table
            .as_ref()
            .ok_or_else(|| Error::compilation("DELETE requires a table"))?;

        let mut sql = Sql::default();
        sql.push_str(&format!("DELETE FROM {}", table));
        self.compile_wheres(&query.wheres, &mut sql)?;
        if self.returns_modified_rows() {
            sql.push_str(" RETURNING *");
        }
        Ok(sql)
    }

    // DDL

    fn compile_create_table(
        &self,
        table: &str,
        if_not_exists: bool,
        columns: &[CreateColumn],
    ) -> Result<Sql> {
        if columns.is_empty() {
            return Err(Error::compilation(format!(
                "CREATE TABLE {} requires at least one column",
                table
            )));
        }

        let mut definitions = Vec::new();
        let mut table_constraints = Vec::new();
        for column in columns {
            let (definition, constraints) = self.compile_column(column)?;
            definitions.push(definition);
            table_constraints.extend(constraints);
        }
        definitions.extend(table_constraints);

        let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
        Ok(Sql::raw(format!(
            "CREATE TABLE {}{} (\n    {}\n)",
            guard,
            table,
            definitions.join(",\n    ")
        )))
    }

    fn compile_alter_table(
        &self,
        table: &str,
        dropped: &[String],
        added: &[CreateColumn],
        renamed: &[(String, String)],
    ) -> Result<Vec<Sql>> {
        let mut statements = Vec::new();

        let mut adds = Vec::new();
        let mut constraints = Vec::new();
        for column in added {
            let (definition, column_constraints) = self.compile_column(column)?;
            adds.push(format!("ADD COLUMN {}", definition));
            constraints.extend(column_constraints.into_iter().map(|c| format!("ADD {}", c)));
        }

        let alterations: Vec<String> = dropped
            .iter()
            .map(|column| format!("DROP COLUMN {}", column))
            .chain(adds)
            .chain(constraints)
            .collect();
        if !alterations.is_empty() {
            statements.push(Sql::raw(format!(
                "ALTER TABLE {}\n    {}",
                table,
                alterations.join(",\n    ")
            )));
        }

        for (from, to) in renamed {
            statements.push(Sql::raw(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                table, from, to
            )));
        }
        Ok(statements)
    }

    fn compile_rename_table(&self, table: &str, to: &str) -> Sql {
        Sql::raw(format!("ALTER TABLE {} RENAME TO {}", table, to))
    }

    fn compile_drop_table(&self, table: &str) -> Sql {
        Sql::raw(format!("DROP TABLE {}", table))
    }

    fn compile_create_indexes(&self, table: &str, indexes: &[CreateIndex]) -> Vec<Sql> {
        indexes
            .iter()
            .map(|index| {
                let unique = if index.unique { "UNIQUE " } else { "" };
                Sql::raw(format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    unique,
                    index.name(table),
                    table,
                    index.columns.join(", ")
                ))
            })
            .collect()
    }

    fn compile_drop_index(&self, _table: &str, index: &str) -> Sql {
        Sql::raw(format!("DROP INDEX {}", index))
    }

    /// Render one column definition plus the table level constraints it
    /// contributes
    fn compile_column(&self, column: &CreateColumn) -> Result<(String, Vec<String>)> {
        let mut definition = format!("{} {}", column.name, self.column_type(&column.column_type));
        let mut table_constraints = Vec::new();

        if column.constraints.contains(&ColumnConstraint::Unsigned) {
            if !column.column_type.is_integer() {
                return Err(Error::compilation(format!(
                    "UNSIGNED is only valid on integer columns, `{}` is {:?}",
                    column.name, column.column_type
                )));
            }
            if let Some(unsigned) = self.unsigned_modifier() {
                definition.push(' ');
                definition.push_str(unsigned);
            }
        }

        for constraint in &column.constraints {
            match constraint {
                ColumnConstraint::NotNull => definition.push_str(" NOT NULL"),
                ColumnConstraint::Default(default) => {
                    if column.column_type == ColumnType::Increments {
                        return Err(Error::compilation(format!(
                            "auto incrementing column `{}` cannot have a default",
                            column.name
                        )));
                    }
                    definition.push_str(" DEFAULT ");
                    definition.push_str(&self.default_literal(default, &column.column_type));
                }
                ColumnConstraint::PrimaryKey => {
                    table_constraints.push(format!("PRIMARY KEY ({})", column.name));
                }
                ColumnConstraint::Unique => {
                    table_constraints.push(format!("UNIQUE ({})", column.name));
                }
                ColumnConstraint::ForeignKey {
                    column: references,
                    table,
                    on_delete,
                    on_update,
                } => {
                    let mut foreign = format!(
                        "FOREIGN KEY ({}) REFERENCES {} ({})",
                        column.name, table, references
                    );
                    if let Some(option) = on_delete {
                        foreign.push_str(&format!(" ON DELETE {}", option));
                    }
                    if let Some(option) = on_update {
                        foreign.push_str(&format!(" ON UPDATE {}", option));
                    }
                    table_constraints.push(foreign);
                }
                ColumnConstraint::Unsigned => {}
            }
        }

        Ok((definition, table_constraints))
    }

    fn column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Bool => "bool".to_string(),
            ColumnType::Date => "timestamptz".to_string(),
            ColumnType::Double => "float8".to_string(),
            ColumnType::Increments => "serial".to_string(),
            ColumnType::Int => "int".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Json => "json".to_string(),
            ColumnType::String(StringLength::Unlimited) => "text".to_string(),
            ColumnType::String(StringLength::Limit(characters)) => {
                format!("varchar({})", characters)
            }
            ColumnType::Uuid => "uuid".to_string(),
        }
    }

    /// Modifier emitted for unsigned integer columns, `None` when the
    /// dialect has no unsigned integers
    fn unsigned_modifier(&self) -> Option<&'static str> {
        None
    }

    fn default_literal(&self, default: &ColumnDefault, _column_type: &ColumnType) -> String {
        match default {
            ColumnDefault::Literal(value) => value.literal(),
            ColumnDefault::Expression(expression) => expression.clone(),
            ColumnDefault::Json(json) => self.json_literal(json),
        }
    }

    fn json_literal(&self, json: &str) -> String {
        format!("'{}'::jsonb", json.replace('\'', "''"))
    }
}

/// The base dialect, used by the stub database and as a reference
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGrammar;

impl Grammar for StandardGrammar {
    fn name(&self) -> &'static str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{JoinClause, OrderByClause, SortDirection, TableRef};
    use crate::predicate::{value_predicate, Connector};
    use crate::schema::ReferenceOption;
    use proptest::prelude::*;

    fn users() -> QueryParts {
        QueryParts::new("users")
    }

    #[test]
    fn test_select_all() {
        let sql = StandardGrammar.compile_select(&users()).unwrap();
        assert_eq!(sql.sql(), "SELECT * FROM users");
        assert!(sql.bindings().is_empty());
    }

    #[test]
    fn test_clause_order() {
        let mut query = users();
        query.distinct = true;
        query.columns = vec!["users.id".to_string(), "COUNT(*) AS total".to_string()];
        query.table = Some(TableRef {
            name: "users".to_string(),
            alias: Some("u".to_string()),
        });
        query
            .joins
            .push(JoinClause::new(JoinType::Left, "posts").on("u.id", "=", "posts.user_id"));
        query.wheres.push(value_predicate(("u.active", true), Connector::And));
        query.groups.push("users.id".to_string());
        query.havings.push(value_predicate(("total", ">", 2), Connector::And));
        query.orders.push(OrderByClause {
            column: "total".to_string(),
            direction: SortDirection::Desc,
        });
        query.limit = Some(10);
        query.offset = Some(20);

        let sql = StandardGrammar.compile_select(&query).unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT DISTINCT users.id, COUNT(*) AS total FROM users AS u \
             LEFT JOIN posts ON u.id = posts.user_id WHERE u.active = ? \
             GROUP BY users.id HAVING total > ? ORDER BY total DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.bindings(), &[Value::Bool(true), Value::Int(2)]);
    }

    #[test]
    fn test_select_without_table() {
        let result = StandardGrammar.compile_select(&QueryParts::default());
        assert!(matches!(result, Err(Error::Compilation { .. })));
    }

    #[test]
    fn test_join_without_condition() {
        let mut query = users();
        query.joins.push(JoinClause::new(JoinType::Inner, "posts"));
        assert!(StandardGrammar.compile_select(&query).is_err());

        let mut query = users();
        query.joins.push(JoinClause::new(JoinType::Cross, "colors"));
        let sql = StandardGrammar.compile_select(&query).unwrap();
        assert_eq!(sql.sql(), "SELECT * FROM users CROSS JOIN colors");
    }

    #[test]
    fn test_first_connector_is_suppressed() {
        let mut query = users();
        query.wheres.push(value_predicate(("a", 1), Connector::Or));
        query.wheres.push(value_predicate(("b", 2), Connector::Or));
        let sql = StandardGrammar.compile_select(&query).unwrap();
        assert_eq!(sql.sql(), "SELECT * FROM users WHERE a = ? OR b = ?");
    }

    #[test]
    fn test_empty_in_lists() {
        let mut query = users();
        query.wheres.push(Predicate::In {
            column: "id".to_string(),
            values: vec![],
            negated: false,
            connector: Connector::And,
        });
        query.wheres.push(Predicate::In {
            column: "id".to_string(),
            values: vec![],
            negated: true,
            connector: Connector::Or,
        });
        let sql = StandardGrammar.compile_select(&query).unwrap();
        assert_eq!(sql.sql(), "SELECT * FROM users WHERE 0 = 1 OR 1 = 1");
        assert!(sql.bindings().is_empty());
    }

    #[test]
    fn test_empty_nested_group_is_an_error() {
        let mut query = users();
        query.wheres.push(Predicate::Nested {
            predicates: vec![],
            connector: Connector::And,
        });
        let result = StandardGrammar.compile_select(&query);
        assert!(matches!(result, Err(Error::Compilation { .. })));
    }

    #[test]
    fn test_raw_fragment_binding_mismatch() {
        let mut query = users();
        query.wheres.push(Predicate::Raw {
            sql: "age > ? AND age < ?".to_string(),
            bindings: vec![Value::Int(1)],
            connector: Connector::And,
        });
        let result = StandardGrammar.compile_select(&query);
        assert!(matches!(result, Err(Error::Compilation { .. })));
    }

    #[test]
    fn test_placeholders_inside_literals_are_ignored() {
        assert_eq!(count_placeholders("a = ? AND b = '?' AND c = ?"), 2);
        assert_eq!(count_placeholders("name = 'it''s ?'"), 0);
    }

    #[test]
    fn test_insert() {
        let rows = InsertRows::from_rows(vec![
            vec![("foo", Value::from("bar")), ("baz", Value::Int(1))],
            vec![("foo", Value::from("qux")), ("baz", Value::Int(2))],
        ])
        .unwrap();
        let sql = StandardGrammar.compile_insert("things", &rows).unwrap();
        assert_eq!(
            sql.sql(),
            "INSERT INTO things (foo, baz) VALUES (?, ?), (?, ?)"
        );
        assert_eq!(sql.bindings().len(), 4);

        let statements = StandardGrammar.compile_insert_return("things", &rows).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].sql().ends_with(" RETURNING *"));
    }

    #[test]
    fn test_update_and_delete() {
        let mut query = users();
        query.wheres.push(value_predicate(("id", 7), Connector::And));

        let values = vec![("name".to_string(), Value::from("Jane"))];
        let sql = StandardGrammar.compile_update(&query, &values).unwrap();
        assert_eq!(sql.sql(), "UPDATE users SET name = ? WHERE id = ?");
        assert_eq!(sql.bindings(), &[Value::from("Jane"), Value::Int(7)]);

        let result = StandardGrammar.compile_update(&query, &[]);
        assert!(matches!(result, Err(Error::InvalidQuery { .. })));

        let sql = StandardGrammar.compile_delete(&query).unwrap();
        assert_eq!(sql.sql(), "DELETE FROM users WHERE id = ?");
    }

    #[test]
    fn test_create_table() {
        let columns = vec![
            CreateColumn::new("id", ColumnType::Increments).with(ColumnConstraint::PrimaryKey),
            CreateColumn::new("email", ColumnType::String(StringLength::Limit(255)))
                .with(ColumnConstraint::NotNull)
                .with(ColumnConstraint::Unique),
            CreateColumn::new("active", ColumnType::Bool)
                .with(ColumnConstraint::Default(ColumnDefault::Literal(Value::Bool(true)))),
            CreateColumn::new("team_id", ColumnType::Int).with(ColumnConstraint::ForeignKey {
                column: "id".to_string(),
                table: "teams".to_string(),
                on_delete: Some(ReferenceOption::Cascade),
                on_update: None,
            }),
        ];
        let sql = StandardGrammar
            .compile_create_table("users", false, &columns)
            .unwrap();
        assert_eq!(
            sql.sql(),
            "CREATE TABLE users (\n    id serial,\n    email varchar(255) NOT NULL,\n    \
             active bool DEFAULT true,\n    team_id int,\n    PRIMARY KEY (id),\n    \
             UNIQUE (email),\n    FOREIGN KEY (team_id) REFERENCES teams (id) ON DELETE CASCADE\n)"
        );
    }

    #[test]
    fn test_create_table_if_not_exists() {
        let columns = vec![CreateColumn::new("id", ColumnType::Uuid)];
        let sql = StandardGrammar
            .compile_create_table("tokens", true, &columns)
            .unwrap();
        assert!(sql.sql().starts_with("CREATE TABLE IF NOT EXISTS tokens ("));
        assert!(StandardGrammar.compile_create_table("tokens", false, &[]).is_err());
    }

    #[test]
    fn test_column_constraint_errors() {
        let column =
            CreateColumn::new("name", ColumnType::String(StringLength::Unlimited))
                .with(ColumnConstraint::Unsigned);
        assert!(matches!(
            StandardGrammar.compile_column(&column),
            Err(Error::Compilation { .. })
        ));

        let column = CreateColumn::new("id", ColumnType::Increments)
            .with(ColumnConstraint::Default(ColumnDefault::Literal(Value::Int(1))));
        assert!(StandardGrammar.compile_column(&column).is_err());

        let column = CreateColumn::new("count", ColumnType::Int).with(ColumnConstraint::Unsigned);
        let (definition, _) = StandardGrammar.compile_column(&column).unwrap();
        assert_eq!(definition, "count int");
    }

    #[test]
    fn test_defaults() {
        let column = CreateColumn::new("meta", ColumnType::Json).with(ColumnConstraint::Default(
            ColumnDefault::Json(r#"{"a":"it's"}"#.to_string()),
        ));
        let (definition, _) = StandardGrammar.compile_column(&column).unwrap();
        assert_eq!(definition, r#"meta json DEFAULT '{"a":"it''s"}'::jsonb"#);

        let column = CreateColumn::new("created_at", ColumnType::Date).with(
            ColumnConstraint::Default(ColumnDefault::Expression("CURRENT_TIMESTAMP".to_string())),
        );
        let (definition, _) = StandardGrammar.compile_column(&column).unwrap();
        assert_eq!(definition, "created_at timestamptz DEFAULT CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_alter_table() {
        let added = vec![CreateColumn::new("age", ColumnType::Int)
            .with(ColumnConstraint::NotNull)
            .with(ColumnConstraint::Unique)];
        let statements = StandardGrammar
            .compile_alter_table(
                "users",
                &["nickname".to_string()],
                &added,
                &[("name".to_string(), "full_name".to_string())],
            )
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].sql(),
            "ALTER TABLE users\n    DROP COLUMN nickname,\n    ADD COLUMN age int NOT NULL,\n    ADD UNIQUE (age)"
        );
        assert_eq!(
            statements[1].sql(),
            "ALTER TABLE users RENAME COLUMN name TO full_name"
        );
    }

    #[test]
    fn test_indexes_and_tables() {
        let indexes = vec![
            CreateIndex::new(vec!["email".to_string()], true),
            CreateIndex::new(vec!["first".to_string(), "last".to_string()], false),
        ];
        let statements = StandardGrammar.compile_create_indexes("users", &indexes);
        assert_eq!(
            statements[0].sql(),
            "CREATE UNIQUE INDEX users_email_unique_key ON users (email)"
        );
        assert_eq!(
            statements[1].sql(),
            "CREATE INDEX users_first_last_idx ON users (first, last)"
        );
        assert_eq!(
            StandardGrammar.compile_drop_index("users", "users_email_unique_key").sql(),
            "DROP INDEX users_email_unique_key"
        );
        assert_eq!(StandardGrammar.compile_drop_table("users").sql(), "DROP TABLE users");
        assert_eq!(
            StandardGrammar.compile_rename_table("users", "people").sql(),
            "ALTER TABLE users RENAME TO people"
        );
    }

    fn nest(depth: usize) -> Predicate {
        let mut predicate = value_predicate(("leaf", 0), Connector::And);
        for level in 0..depth {
            predicate = Predicate::Nested {
                predicates: vec![value_predicate(("level", level as i64), Connector::And), predicate],
                connector: Connector::Or,
            };
        }
        predicate
    }

    proptest! {
        #[test]
        fn placeholder_count_matches_bindings(values in prop::collection::vec(any::<i64>(), 0..20), in_list in prop::collection::vec(any::<i32>(), 0..10)) {
            let mut query = users();
            for (index, value) in values.iter().enumerate() {
                let connector = if index % 2 == 0 { Connector::And } else { Connector::Or };
                query.wheres.push(value_predicate((format!("c{}", index).as_str(), *value), connector));
            }
            query.wheres.push(Predicate::In {
                column: "id".to_string(),
                values: in_list.iter().map(|v| Value::from(*v)).collect(),
                negated: false,
                connector: Connector::And,
            });
            let sql = StandardGrammar.compile_select(&query).unwrap();
            prop_assert_eq!(sql.placeholder_count(), sql.bindings().len());
            prop_assert_eq!(sql.bindings().len(), values.len() + in_list.len());
            for (index, value) in values.iter().enumerate() {
                prop_assert_eq!(&sql.bindings()[index], &Value::Int(*value));
            }
        }

        #[test]
        fn nested_groups_are_balanced(depth in 0usize..8) {
            let mut query = users();
            query.wheres.push(nest(depth));
            let sql = StandardGrammar.compile_select(&query).unwrap();
            let opens = sql.sql().matches('(').count();
            let closes = sql.sql().matches(')').count();
            prop_assert_eq!(opens, depth);
            prop_assert_eq!(closes, depth);
            prop_assert_eq!(sql.placeholder_count(), depth + 1);
        }
    }
}
