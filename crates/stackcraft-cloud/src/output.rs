//! Stack outputs

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named values published by a run
///
/// Keys are written once; a second export of the same key is an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputMap {
    values: BTreeMap<String, Value>,
}

impl OutputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Err(CloudError::DuplicateOutput(key));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_once() {
        let mut outputs = OutputMap::new();
        outputs.insert("bucket_name", "test-bucket").unwrap();

        let err = outputs.insert("bucket_name", "other").unwrap_err();
        assert!(matches!(err, CloudError::DuplicateOutput(key) if key == "bucket_name"));
        assert_eq!(outputs.get_str("bucket_name"), Some("test-bucket"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut outputs = OutputMap::new();
        outputs.insert("zone_id", "z-1").unwrap();
        outputs.insert("nameservers", serde_json::json!(["a", "b"])).unwrap();

        let json = serde_json::to_value(&outputs).unwrap();
        assert_eq!(json, serde_json::json!({ "nameservers": ["a", "b"], "zone_id": "z-1" }));
    }
}
