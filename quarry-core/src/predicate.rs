//! Predicate AST used by WHERE, HAVING and JOIN ON clauses

use crate::{IntoOperator, Operator, Value};
use std::fmt;

/// How a predicate is joined to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

/// A node of a predicate list.
///
/// The connector of the first node in any list is never rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> ?`
    Value {
        column: String,
        operator: Operator,
        value: Value,
        connector: Connector,
    },
    /// `first <op> second`, both sides are column expressions
    Column {
        first: String,
        operator: Operator,
        second: String,
        connector: Connector,
    },
    /// `column [NOT] IN (?, ?, ...)`
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
        connector: Connector,
    },
    /// A raw SQL fragment with its own `?` placeholders
    Raw {
        sql: String,
        bindings: Vec<Value>,
        connector: Connector,
    },
    /// A parenthesized group of predicates
    Nested {
        predicates: Vec<Predicate>,
        connector: Connector,
    },
}

impl Predicate {
    pub fn connector(&self) -> Connector {
        match self {
            Predicate::Value { connector, .. }
            | Predicate::Column { connector, .. }
            | Predicate::In { connector, .. }
            | Predicate::Raw { connector, .. }
            | Predicate::Nested { connector, .. } => *connector,
        }
    }

    /// Number of bindings this predicate contributes, including children
    pub fn binding_count(&self) -> usize {
        match self {
            Predicate::Value { .. } => 1,
            Predicate::Column { .. } => 0,
            Predicate::In { values, .. } => values.len(),
            Predicate::Raw { bindings, .. } => bindings.len(),
            Predicate::Nested { predicates, .. } => {
                predicates.iter().map(Predicate::binding_count).sum()
            }
        }
    }
}

/// Trait for conditions that can be used in WHERE and HAVING clauses
pub trait IntoCondition {
    fn into_condition(self) -> (String, Operator, Value);
}

// Shorthand equality: where_(("age", 18))
impl<T> IntoCondition for (&str, T)
where
    T: Into<Value>,
{
    fn into_condition(self) -> (String, Operator, Value) {
        (self.0.to_string(), Operator::EQ, self.1.into())
    }
}

// Explicit operators: where_(("age", op::GT, 18)) or where_(("age", ">", 18))
impl<T, O> IntoCondition for (&str, O, T)
where
    T: Into<Value>,
    O: IntoOperator,
{
    fn into_condition(self) -> (String, Operator, Value) {
        (self.0.to_string(), self.1.into_operator(), self.2.into())
    }
}

/// A comparison built from [`col`]
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl IntoCondition for Condition {
    fn into_condition(self) -> (String, Operator, Value) {
        (self.column, self.operator, self.value)
    }
}

/// A column reference with comparison sugar
#[derive(Debug, Clone, PartialEq)]
pub struct Column(String);

/// Start a comparison against a column
///
/// # Examples
/// ```
/// use quarry_core::{col, StubDatabase, DatabaseProvider};
///
/// let db = StubDatabase::new();
/// let sql = db
///     .table("users")
///     .where_(col("age").gt(30))
///     .or_where(col("name").eq("Paul"))
///     .to_sql()
///     .unwrap();
/// assert_eq!(sql.sql(), "SELECT * FROM users WHERE age > ? OR name = ?");
/// ```
pub fn col(name: &str) -> Column {
    Column(name.to_string())
}

impl Column {
    fn compare(self, operator: Operator, value: impl Into<Value>) -> Condition {
        Condition {
            column: self.0,
            operator,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Equals, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::NotEqualTo, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::LessThan, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::LessThanOrEqualTo, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::GreaterThan, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::GreaterThanOrEqualTo, value)
    }

    pub fn like(self, pattern: impl Into<Value>) -> Condition {
        self.compare(Operator::Like, pattern)
    }

    pub fn not_like(self, pattern: impl Into<Value>) -> Condition {
        self.compare(Operator::NotLike, pattern)
    }
}

pub(crate) fn value_predicate<C: IntoCondition>(condition: C, connector: Connector) -> Predicate {
    let (column, operator, value) = condition.into_condition();
    Predicate::Value {
        column,
        operator,
        value,
        connector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::op;

    #[test]
    fn test_condition_trait_implementations() {
        let (column, operator, value) = ("name", "John").into_condition();
        assert_eq!(column, "name");
        assert_eq!(operator, op::EQ);
        assert_eq!(value, "John".into());

        let (column, operator, value) = ("age", op::GT, 18).into_condition();
        assert_eq!(column, "age");
        assert_eq!(operator, op::GT);
        assert_eq!(value, 18.into());

        let (_, operator, _) = ("age", "<=", 18).into_condition();
        assert_eq!(operator, op::LTE);
    }

    #[test]
    fn test_column_sugar() {
        assert_eq!(
            col("age").ge(21),
            Condition {
                column: "age".to_string(),
                operator: Operator::GreaterThanOrEqualTo,
                value: Value::Int(21),
            }
        );
        assert_eq!(col("name").not_like("%x%").operator, Operator::NotLike);
    }

    #[test]
    fn test_value_predicate_connector() {
        let predicate = value_predicate(col("a").eq(1), Connector::Or);
        assert_eq!(predicate.connector(), Connector::Or);
        assert_eq!(predicate.binding_count(), 1);
    }

    #[test]
    fn test_nested_binding_count() {
        let nested = Predicate::Nested {
            predicates: vec![
                value_predicate(("a", 1), Connector::And),
                Predicate::In {
                    column: "b".to_string(),
                    values: vec![Value::Int(1), Value::Int(2)],
                    negated: false,
                    connector: Connector::Or,
                },
                Predicate::Column {
                    first: "c".to_string(),
                    operator: Operator::EQ,
                    second: "d".to_string(),
                    connector: Connector::And,
                },
            ],
            connector: Connector::And,
        };
        assert_eq!(nested.binding_count(), 3);
    }
}
