//! The chainable query builder and its terminal operations

use super::common::{IntoColumns, JoinClause, JoinType, OrderByClause, SortDirection, TableRef};
use super::insert::{InsertRows, IntoInsertData};
use super::update::IntoUpdateData;
use crate::grammar::Sql;
use crate::predicate::{value_predicate, Connector, IntoCondition, Predicate};
use crate::{DatabaseProvider, Error, IntoOperator, Result, Row, Value};
use serde::de::DeserializeOwned;
use std::fmt;

/// Clause lists of a query, independent of the database it runs on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParts {
    pub table: Option<TableRef>,
    pub columns: Vec<String>,
    pub distinct: bool,
    pub joins: Vec<JoinClause>,
    pub wheres: Vec<Predicate>,
    pub groups: Vec<String>,
    pub havings: Vec<Predicate>,
    pub orders: Vec<OrderByClause>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl QueryParts {
    pub fn new(table: &str) -> Self {
        Self {
            table: Some(TableRef::new(table)),
            ..Self::default()
        }
    }
}

/// A query bound to a database.
///
/// Mutators consume the builder and return it, terminal operations borrow
/// it, so a query can be executed any number of times.
///
/// # Examples
/// ```
/// use quarry_core::{col, DatabaseProvider, StubDatabase};
///
/// let db = StubDatabase::new();
/// let sql = db
///     .table("users")
///     .select(("id", "name"))
///     .where_(col("age").ge(18))
///     .order_by_desc("created_at")
///     .for_page(2, 10)
///     .to_sql()
///     .unwrap();
/// assert_eq!(
///     sql.sql(),
///     "SELECT id, name FROM users WHERE age >= ? ORDER BY created_at DESC LIMIT 10 OFFSET 10"
/// );
/// ```
pub struct Query<'db, D: DatabaseProvider> {
    database: &'db D,
    parts: QueryParts,
}

impl<'db, D: DatabaseProvider> Clone for Query<'db, D> {
    fn clone(&self) -> Self {
        Self {
            database: self.database,
            parts: self.parts.clone(),
        }
    }
}

impl<'db, D: DatabaseProvider> fmt::Debug for Query<'db, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("dialect", &self.database.grammar().name())
            .field("parts", &self.parts)
            .finish()
    }
}

impl<'db, D: DatabaseProvider> Query<'db, D> {
    pub fn new(database: &'db D) -> Self {
        Self {
            database,
            parts: QueryParts::default(),
        }
    }

    pub fn parts(&self) -> &QueryParts {
        &self.parts
    }

    pub fn database(&self) -> &'db D {
        self.database
    }

    /// Set the table to query
    pub fn table(mut self, name: &str) -> Self {
        self.parts.table = Some(TableRef::new(name));
        self
    }

    /// Set the table with an alias, `FROM table AS alias`
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.parts.table = Some(TableRef {
            name: table.to_string(),
            alias: Some(alias.to_string()),
        });
        self
    }

    /// Replace the selected columns. No columns selects `*`.
    pub fn select<C: IntoColumns>(mut self, columns: C) -> Self {
        self.parts.columns = columns.into_columns();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.parts.distinct = true;
        self
    }

    /// Join `table` on `first <op> second`
    pub fn join<O: IntoOperator>(
        self,
        table: &str,
        first: &str,
        operator: O,
        second: &str,
        join_type: JoinType,
    ) -> Self {
        self.join_clause(JoinClause::new(join_type, table).on(first, operator, second))
    }

    pub fn inner_join<O: IntoOperator>(self, table: &str, first: &str, operator: O, second: &str) -> Self {
        self.join(table, first, operator, second, JoinType::Inner)
    }

    pub fn left_join<O: IntoOperator>(self, table: &str, first: &str, operator: O, second: &str) -> Self {
        self.join(table, first, operator, second, JoinType::Left)
    }

    pub fn right_join<O: IntoOperator>(self, table: &str, first: &str, operator: O, second: &str) -> Self {
        self.join(table, first, operator, second, JoinType::Right)
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.join_clause(JoinClause::new(JoinType::Cross, table))
    }

    /// Add a join built by hand, for multi-condition ON clauses
    pub fn join_clause(mut self, join: JoinClause) -> Self {
        self.parts.joins.push(join);
        self
    }

    /// Add a WHERE condition
    pub fn where_<C: IntoCondition>(mut self, condition: C) -> Self {
        self.parts.wheres.push(value_predicate(condition, Connector::And));
        self
    }

    /// Add an OR WHERE condition
    pub fn or_where<C: IntoCondition>(mut self, condition: C) -> Self {
        self.parts.wheres.push(value_predicate(condition, Connector::Or));
        self
    }

    /// Group the conditions added by `build` in parentheses
    ///
    /// # Examples
    /// ```
    /// use quarry_core::{DatabaseProvider, StubDatabase};
    ///
    /// let db = StubDatabase::new();
    /// let sql = db
    ///     .table("users")
    ///     .where_(("active", true))
    ///     .where_nested(|q| q.where_(("role", "admin")).or_where(("role", "owner")))
    ///     .to_sql()
    ///     .unwrap();
    /// assert_eq!(
    ///     sql.sql(),
    ///     "SELECT * FROM users WHERE active = ? AND (role = ? OR role = ?)"
    /// );
    /// ```
    pub fn where_nested<F>(self, build: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.push_nested(build, Connector::And)
    }

    pub fn or_where_nested<F>(self, build: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.push_nested(build, Connector::Or)
    }

    fn push_nested<F>(mut self, build: F, connector: Connector) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let scope = Query {
            database: self.database,
            parts: QueryParts {
                table: self.parts.table.clone(),
                ..QueryParts::default()
            },
        };
        let predicates = build(scope).parts.wheres;
        self.parts.wheres.push(Predicate::Nested {
            predicates,
            connector,
        });
        self
    }

    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, false, Connector::And)
    }

    pub fn or_where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, false, Connector::Or)
    }

    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, true, Connector::And)
    }

    pub fn or_where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, true, Connector::Or)
    }

    fn push_in<I, V>(mut self, column: &str, values: I, negated: bool, connector: Connector) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.parts.wheres.push(Predicate::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            negated,
            connector,
        });
        self
    }

    /// Add a raw SQL condition. `sql` must contain one `?` per binding.
    ///
    /// Placeholders are found by scanning for `?` outside single-quoted
    /// literals. Quotes inside literals must be doubled (`'it''s'`); a
    /// backslash-escaped quote ends the literal early and the fragment is
    /// rejected with a placeholder count mismatch. There is no escape for a
    /// literal `?`, so PostgreSQL's jsonb `?` operators have to be written as
    /// functions (`jsonb_exists(data, ?)`).
    pub fn where_raw<I, V>(self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_raw(sql, bindings, Connector::And)
    }

    pub fn or_where_raw<I, V>(self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_raw(sql, bindings, Connector::Or)
    }

    fn push_raw<I, V>(mut self, sql: &str, bindings: I, connector: Connector) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.parts.wheres.push(Predicate::Raw {
            sql: sql.to_string(),
            bindings: bindings.into_iter().map(Into::into).collect(),
            connector,
        });
        self
    }

    /// Compare two columns
    pub fn where_column<O: IntoOperator>(self, first: &str, operator: O, second: &str) -> Self {
        self.push_column(first, operator, second, Connector::And)
    }

    pub fn or_where_column<O: IntoOperator>(self, first: &str, operator: O, second: &str) -> Self {
        self.push_column(first, operator, second, Connector::Or)
    }

    fn push_column<O: IntoOperator>(
        mut self,
        first: &str,
        operator: O,
        second: &str,
        connector: Connector,
    ) -> Self {
        self.parts.wheres.push(Predicate::Column {
            first: first.to_string(),
            operator: operator.into_operator(),
            second: second.to_string(),
            connector,
        });
        self
    }

    pub fn where_null(self, column: &str) -> Self {
        self.push_null(column, false, Connector::And)
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.push_null(column, false, Connector::Or)
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.push_null(column, true, Connector::And)
    }

    pub fn or_where_not_null(self, column: &str) -> Self {
        self.push_null(column, true, Connector::Or)
    }

    fn push_null(mut self, column: &str, negated: bool, connector: Connector) -> Self {
        let check = if negated { "IS NOT NULL" } else { "IS NULL" };
        self.parts.wheres.push(Predicate::Raw {
            sql: format!("{} {}", column, check),
            bindings: Vec::new(),
            connector,
        });
        self
    }

    pub fn group_by<C: IntoColumns>(mut self, columns: C) -> Self {
        self.parts.groups.extend(columns.into_columns());
        self
    }

    /// Add a HAVING condition
    pub fn having<C: IntoCondition>(mut self, condition: C) -> Self {
        self.parts.havings.push(value_predicate(condition, Connector::And));
        self
    }

    pub fn or_having<C: IntoCondition>(mut self, condition: C) -> Self {
        self.parts.havings.push(value_predicate(condition, Connector::Or));
        self
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.parts.orders.push(OrderByClause {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, SortDirection::Asc)
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, SortDirection::Desc)
    }

    /// Limit the number of rows.
    ///
    /// # Panics
    /// If `count` is negative.
    pub fn limit(mut self, count: i64) -> Self {
        assert!(count >= 0, "limit must not be negative, got {}", count);
        self.parts.limit = Some(count);
        self
    }

    /// Skip rows. Negative values are treated as zero.
    pub fn offset(mut self, count: i64) -> Self {
        self.parts.offset = Some(count.max(0));
        self
    }

    /// Paginate; pages start at 1
    pub fn for_page(self, page: i64, per_page: i64) -> Self {
        self.offset(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page)
    }

    /// Compile the SELECT statement without running it
    pub fn to_sql(&self) -> Result<Sql> {
        self.database.grammar().compile_select(&self.parts)
    }

    /// Run the query and return every row
    pub async fn get(&self) -> Result<Vec<Row>> {
        let sql = self.to_sql()?;
        self.database.query(sql.sql(), sql.bindings()).await
    }

    /// Run the query and deserialize every row
    pub async fn get_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.get().await?.iter().map(Row::decode).collect()
    }

    /// Run the query with `LIMIT 1`
    pub async fn first(&self) -> Result<Option<Row>> {
        let mut parts = self.parts.clone();
        parts.limit = Some(1);
        let sql = self.database.grammar().compile_select(&parts)?;
        let rows = self.database.query(sql.sql(), sql.bindings()).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.first().await?.as_ref().map(Row::decode).transpose()
    }

    /// First row where `column` equals `value`
    pub async fn find(&self, column: &str, value: impl Into<Value>) -> Result<Option<Row>> {
        self.clone().where_((column, value.into())).first().await
    }

    /// `COUNT(*)` over the current conditions
    pub async fn count(&self) -> Result<i64> {
        self.count_column("*").await
    }

    /// `COUNT(column)` over the current conditions
    pub async fn count_column(&self, column: &str) -> Result<i64> {
        let mut parts = self.parts.clone();
        parts.columns = vec![format!("COUNT({}) AS count", column)];
        parts.orders.clear();
        parts.limit = None;
        parts.offset = None;

        let sql = self.database.grammar().compile_select(&parts)?;
        let rows = self.database.query(sql.sql(), sql.bindings()).await?;
        match rows.first() {
            None => Ok(0),
            Some(row) => {
                let value = row.get("count")?;
                value.as_i64().ok_or_else(|| {
                    Error::decode("count", format!("expected an integer, got {}", value.type_name()))
                })
            }
        }
    }

    /// Insert one row and return it as stored
    pub async fn insert<T: IntoInsertData>(&self, row: T) -> Result<Vec<Row>> {
        self.insert_many(std::iter::once(row)).await
    }

    /// Insert rows sharing one column set and return them as stored
    pub async fn insert_many<T, I>(&self, rows: I) -> Result<Vec<Row>>
    where
        I: IntoIterator<Item = T>,
        T: IntoInsertData,
    {
        let table = self.table_name("INSERT")?;
        let rows = InsertRows::from_rows(rows)?;
        let mut statements = self
            .database
            .grammar()
            .compile_insert_return(table, &rows)?;

        if statements.len() == 1 {
            let sql = statements.remove(0);
            self.database.query(sql.sql(), sql.bindings()).await
        } else {
            self.database.query_sequence(statements).await
        }
    }

    /// Update every matching row. Returns the updated rows where the
    /// dialect supports it.
    pub async fn update<U: IntoUpdateData>(&self, values: U) -> Result<Vec<Row>> {
        let values = values.into_update_data();
        let sql = self.database.grammar().compile_update(&self.parts, &values)?;
        self.database.query(sql.sql(), sql.bindings()).await
    }

    /// Delete every matching row. Returns the deleted rows where the
    /// dialect supports it.
    pub async fn delete(&self) -> Result<Vec<Row>> {
        let sql = self.database.grammar().compile_delete(&self.parts)?;
        self.database.query(sql.sql(), sql.bindings()).await
    }

    fn table_name(&self, operation: &str) -> Result<&str> {
        self.parts
            .table
            .as_ref()
            .map(|table| table.name.as_str())
            .ok_or_else(|| Error::compilation(format!("{} requires a table", operation)))
    }
}
