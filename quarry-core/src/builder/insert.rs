//! Row data accepted by `insert` and `insert_many`

use crate::{Error, Result, Row, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Trait for the column/value data of one inserted row
pub trait IntoInsertData {
    fn into_insert_data(self) -> (Vec<String>, Vec<Value>);
}

impl<K, V> IntoInsertData for Vec<(K, V)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> (Vec<String>, Vec<Value>) {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).unzip()
    }
}

impl<K, V, const N: usize> IntoInsertData for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> (Vec<String>, Vec<Value>) {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).unzip()
    }
}

impl IntoInsertData for BTreeMap<String, Value> {
    fn into_insert_data(self) -> (Vec<String>, Vec<Value>) {
        self.into_iter().unzip()
    }
}

// Sorted so the generated column list is stable across runs
impl IntoInsertData for HashMap<String, Value> {
    fn into_insert_data(self) -> (Vec<String>, Vec<Value>) {
        let mut pairs: Vec<(String, Value)> = self.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.into_iter().unzip()
    }
}

impl IntoInsertData for Row {
    fn into_insert_data(self) -> (Vec<String>, Vec<Value>) {
        let columns = self.columns().map(str::to_string).collect();
        (columns, self.values().to_vec())
    }
}

/// Validated rows of a multi-row INSERT, all sharing one column order
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertRows {
    /// Build from one or more rows.
    ///
    /// The first row fixes the column order; every later row is reordered to
    /// match and must carry exactly the same column set.
    pub fn from_rows<T, I>(data: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: IntoInsertData,
    {
        let mut iter = data.into_iter();
        let (columns, first) = iter
            .next()
            .map(IntoInsertData::into_insert_data)
            .ok_or_else(|| Error::invalid_query("INSERT requires at least one row"))?;

        if columns.is_empty() {
            return Err(Error::invalid_query("INSERT requires at least one column"));
        }
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(Error::invalid_query(format!(
                "INSERT names column `{}` more than once",
                duplicate
            )));
        }

        let mut rows = vec![first];
        for (index, item) in iter.enumerate() {
            let (row_columns, row_values) = item.into_insert_data();
            if row_columns.len() != columns.len() {
                return Err(column_mismatch(index + 1));
            }
            let mut ordered = Vec::with_capacity(columns.len());
            for column in &columns {
                let position = row_columns
                    .iter()
                    .position(|c| c == column)
                    .ok_or_else(|| column_mismatch(index + 1))?;
                ordered.push(row_values[position].clone());
            }
            rows.push(ordered);
        }

        Ok(Self { columns, rows })
    }
}

fn column_mismatch(row: usize) -> Error {
    Error::invalid_query(format!(
        "INSERT row {} does not have the same columns as the first row",
        row
    ))
}
