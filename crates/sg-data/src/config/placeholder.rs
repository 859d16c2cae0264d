//! Record values that stand in for a missing list

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which raw field values read as "no entries"
///
/// JSON `null` always does. A string does when it equals one of `markers`,
/// compared after trimming when `trim` is set and ignoring ASCII case when
/// `ignore_case` is set. Lists, numbers and objects never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub markers: Vec<String>,
    pub trim: bool,
    pub ignore_case: bool,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            markers: ["", "-", "null", "none"].map(String::from).to_vec(),
            trim: true,
            ignore_case: true,
        }
    }
}

impl PlaceholderConfig {
    /// Whether `value` should be read as an empty list
    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(text) => self.is_marker(text),
            _ => false,
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    fn is_marker(&self, text: &str) -> bool {
        let text = if self.trim { text.trim() } else { text };
        if self.ignore_case {
            self.markers.iter().any(|marker| marker.eq_ignore_ascii_case(text))
        } else {
            self.markers.iter().any(|marker| marker == text)
        }
    }
}
