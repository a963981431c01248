//! SQL comparison operators and conversions

use std::fmt::{self, Display};

/// Comparison operator used by value and column predicates
///
/// The set is closed; `Raw` is the escape hatch for dialect specific
/// operators such as PostgreSQL's `@@` or `ILIKE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
    NotEqualTo,
    Like,
    NotLike,
    Raw(String),
}

impl Operator {
    pub const EQ: Self = Operator::Equals;
    pub const LT: Self = Operator::LessThan;
    pub const GT: Self = Operator::GreaterThan;
    pub const LTE: Self = Operator::LessThanOrEqualTo;
    pub const GTE: Self = Operator::GreaterThanOrEqualTo;
    pub const NEQ: Self = Operator::NotEqualTo;
    pub const LIKE: Self = Operator::Like;
    pub const NOT_LIKE: Self = Operator::NotLike;

    /// Create a raw operator for database-specific operations
    ///
    /// # Examples
    /// ```
    /// use quarry_core::Operator;
    ///
    /// // PostgreSQL full-text search
    /// let fts = Operator::raw("@@");
    /// assert_eq!(fts.as_str(), "@@");
    /// ```
    pub fn raw(token: impl Into<String>) -> Self {
        Operator::Raw(token.into())
    }

    /// The SQL token for this operator
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::NotEqualTo => "!=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Raw(token) => token,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Operator;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Operator {
        self
    }
}

/// Allow string literals for the operators in the closed table
impl IntoOperator for &str {
    fn into_operator(self) -> Operator {
        match self {
            "=" => Operator::Equals,
            "<" => Operator::LessThan,
            ">" => Operator::GreaterThan,
            "<=" => Operator::LessThanOrEqualTo,
            ">=" => Operator::GreaterThanOrEqualTo,
            "!=" | "<>" => Operator::NotEqualTo,
            "LIKE" | "like" => Operator::Like,
            "NOT LIKE" | "not like" => Operator::NotLike,
            _ => panic!(
                "Unknown operator '{}'. Use the op constants or Operator::raw(\"{}\") for dialect specific operators.",
                self, self
            ),
        }
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::EQ;
    pub const LT: Operator = Operator::LT;
    pub const GT: Operator = Operator::GT;
    pub const LTE: Operator = Operator::LTE;
    pub const GTE: Operator = Operator::GTE;
    pub const NEQ: Operator = Operator::NEQ;
    pub const LIKE: Operator = Operator::LIKE;
    pub const NOT_LIKE: Operator = Operator::NOT_LIKE;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tokens() {
        assert_eq!(Operator::GT.as_str(), ">");
        assert_eq!(Operator::LT.as_str(), "<");
        assert_eq!(Operator::EQ.as_str(), "=");
        assert_eq!(Operator::NEQ.as_str(), "!=");
        assert_eq!(Operator::LIKE.as_str(), "LIKE");
        assert_eq!(Operator::NOT_LIKE.as_str(), "NOT LIKE");
    }

    #[test]
    fn test_raw_operator() {
        let custom_op = Operator::raw("ILIKE");
        assert_eq!(custom_op.as_str(), "ILIKE");
        assert_eq!(custom_op.to_string(), "ILIKE");
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(">".into_operator(), Operator::GT);
        assert_eq!("LIKE".into_operator(), Operator::LIKE);
        assert_eq!("not like".into_operator(), Operator::NOT_LIKE);
        assert_eq!("<>".into_operator(), Operator::NEQ);
        assert_eq!(">=".into_operator(), Operator::GTE);
    }

    #[test]
    #[should_panic(expected = "Unknown operator 'INVALID'")]
    fn test_invalid_string_conversion() {
        "INVALID".into_operator();
    }
}
