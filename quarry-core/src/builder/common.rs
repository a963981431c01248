//! Clause types shared by the query builder and the grammar

use crate::predicate::{Connector, Predicate};
use crate::{IntoOperator, Operator};

/// Trait to convert various types into columns
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

// For tuples
impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Full => write!(f, "FULL OUTER"),
            JoinType::Cross => write!(f, "CROSS"),
        }
    }
}

/// A JOIN with its ON predicates
///
/// # Examples
/// ```
/// use quarry_core::{JoinClause, JoinType};
///
/// let join = JoinClause::new(JoinType::Left, "orders")
///     .on("users.id", "=", "orders.user_id")
///     .or_on("users.id", "=", "orders.gifted_to");
/// assert_eq!(join.conditions.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub conditions: Vec<Predicate>,
}

impl JoinClause {
    pub fn new(join_type: JoinType, table: &str) -> Self {
        Self {
            join_type,
            table: table.to_string(),
            conditions: Vec::new(),
        }
    }

    /// Add an `AND first <op> second` column comparison
    pub fn on<O: IntoOperator>(self, first: &str, operator: O, second: &str) -> Self {
        self.push_on(first, operator.into_operator(), second, Connector::And)
    }

    /// Add an `OR first <op> second` column comparison
    pub fn or_on<O: IntoOperator>(self, first: &str, operator: O, second: &str) -> Self {
        self.push_on(first, operator.into_operator(), second, Connector::Or)
    }

    fn push_on(mut self, first: &str, operator: Operator, second: &str, connector: Connector) -> Self {
        self.conditions.push(Predicate::Column {
            first: first.to_string(),
            operator,
            second: second.to_string(),
            connector,
        });
        self
    }
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: SortDirection,
}

/// Table reference with an optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} AS {}", self.name, alias),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_columns() {
        assert_eq!("id".into_columns(), vec!["id"]);
        assert_eq!(("id", "name").into_columns(), vec!["id", "name"]);
        assert_eq!(["a", "b", "c"].into_columns(), vec!["a", "b", "c"]);
        assert_eq!(vec!["x".to_string()].into_columns(), vec!["x"]);
    }

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::Inner.to_string(), "INNER");
        assert_eq!(JoinType::Full.to_string(), "FULL OUTER");
        assert_eq!(JoinType::Cross.to_string(), "CROSS");
    }

    #[test]
    fn test_join_clause_connectors() {
        let join = JoinClause::new(JoinType::Inner, "posts")
            .on("users.id", "=", "posts.user_id")
            .or_on("users.id", Operator::EQ, "posts.editor_id");
        assert_eq!(join.conditions[0].connector(), Connector::And);
        assert_eq!(join.conditions[1].connector(), Connector::Or);
    }

    #[test]
    fn test_table_ref_display() {
        let mut table = TableRef::new("users");
        assert_eq!(table.to_string(), "users");
        table.alias = Some("u".to_string());
        assert_eq!(table.to_string(), "users AS u");
    }
}
