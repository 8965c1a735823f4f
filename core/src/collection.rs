//! Ordered result sets.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::model::Model;

/// Records from a collection lookup plus whatever else the response carried
/// beside them (paging totals and the like).
///
/// Besides the borrowing iterator it keeps a cursor (`current`, `advance`,
/// `rewind`) so it can be walked, restarted and walked again.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<Model>,
    pub meta_data: Map<String, Value>,
    position: usize,
}

impl Collection {
    pub fn new(records: Vec<Model>) -> Self {
        Self {
            records,
            meta_data: Map::new(),
            position: 0,
        }
    }

    pub fn with_meta_data(mut self, meta_data: Map<String, Value>) -> Self {
        self.meta_data = meta_data;
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.records.iter()
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.records.get(index)
    }

    pub fn first(&self) -> Option<&Model> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&Model> {
        self.records.last()
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn current(&self) -> Option<&Model> {
        self.records.get(self.position)
    }

    pub fn key(&self) -> Option<usize> {
        self.valid().then_some(self.position)
    }

    pub fn advance(&mut self) {
        if self.valid() {
            self.position += 1;
        }
    }

    pub fn valid(&self) -> bool {
        self.position < self.records.len()
    }

    /// Plain data form.
    ///
    /// With a collection key the records are wrapped as `{key: [...]}` and
    /// non-empty metadata is added under `meta_key`. Without one the
    /// records come back as a bare array and the metadata is left out: a
    /// JSON array has nowhere to hold it, so pass a key to keep it. An
    /// empty collection with no metadata is always `[]`.
    pub fn to_array(&self, collection_key: Option<&str>, meta_key: &str) -> Value {
        let records: Vec<Value> = self
            .records
            .iter()
            .map(|record| Value::Object(record.attributes().clone()))
            .collect();

        if records.is_empty() && self.meta_data.is_empty() {
            return Value::Array(records);
        }
        let Some(collection_key) = collection_key else {
            return Value::Array(records);
        };

        let mut wrapped = Map::new();
        wrapped.insert(collection_key.to_string(), Value::Array(records));
        if !self.meta_data.is_empty() {
            wrapped.insert(meta_key.to_string(), Value::Object(self.meta_data.clone()));
        }
        Value::Object(wrapped)
    }

    pub fn to_json(&self, collection_key: Option<&str>, meta_key: &str) -> Result<String, ApiError> {
        serde_json::to_string(&self.to_array(collection_key, meta_key))
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
