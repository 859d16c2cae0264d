//! Raw field values for a single example or prediction

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field name to raw value; the value's shape depends on the field's kind
pub type Record = IndexMap<String, serde_json::Value>;

/// A dataset example with a stable identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub data: Record,
}

impl IndexedRecord {
    pub fn new(id: impl Into<String>, data: Record) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Get a field's raw value
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }
}
