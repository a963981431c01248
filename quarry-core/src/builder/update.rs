//! Column assignments accepted by `update`

use crate::Value;
use std::collections::{BTreeMap, HashMap};

/// Trait for the SET list of an UPDATE
pub trait IntoUpdateData {
    fn into_update_data(self) -> Vec<(String, Value)>;
}

impl<K, V> IntoUpdateData for Vec<(K, V)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_update_data(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K, V, const N: usize> IntoUpdateData for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_update_data(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl IntoUpdateData for BTreeMap<String, Value> {
    fn into_update_data(self) -> Vec<(String, Value)> {
        self.into_iter().collect()
    }
}

impl IntoUpdateData for HashMap<String, Value> {
    fn into_update_data(self) -> Vec<(String, Value)> {
        let mut pairs: Vec<(String, Value)> = self.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_data_conversions() {
        let pairs = [("name", "Jane"), ("email", "jane@example.com")].into_update_data();
        assert_eq!(pairs[0], ("name".to_string(), Value::from("Jane")));

        let mut map = HashMap::new();
        map.insert("b".to_string(), Value::Int(2));
        map.insert("a".to_string(), Value::Int(1));
        let pairs = map.into_update_data();
        assert_eq!(pairs[0].0, "a");
        assert_eq!(pairs[1].0, "b");
    }
}
