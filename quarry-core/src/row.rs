//! Result rows returned by database providers

use crate::{Error, Result, Value};
use serde::de::DeserializeOwned;

/// A single result row: ordered column names with their decoded values.
///
/// Every provider converts its native row type into a `Row`, so callers
/// never depend on a particular driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to the row
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    /// Get the value of a column
    pub fn get(&self, column: &str) -> Result<&Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| &self.values[index])
            .ok_or_else(|| Error::column_not_found(column))
    }

    /// Column names in result order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Values in result order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Deserialize the row into any `DeserializeOwned` type by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
    }

    #[test]
    fn test_get_and_contains() {
        let row = Row::new().with("foo", "one").with("bar", 2);
        assert_eq!(row.get("foo").unwrap(), &Value::String("one".to_string()));
        assert_eq!(row.get("bar").unwrap(), &Value::Int(2));
        assert!(!row.contains("baz"));
        assert!(matches!(row.get("baz"), Err(Error::ColumnNotFound { .. })));
    }

    #[test]
    fn test_column_order_is_preserved() {
        let row: Row = vec![("b", 1), ("a", 2)].into_iter().collect();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_decode() {
        let row = Row::new()
            .with("id", 1)
            .with("name", "John")
            .with("email", Value::Null);
        let user: User = row.decode().unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "John".to_string(),
                email: None
            }
        );
    }

    #[test]
    fn test_decode_type_mismatch() {
        let row = Row::new().with("id", "not a number").with("name", "John");
        let result: Result<User> = row.decode();
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
