use serde::{Deserialize, Serialize};
use sg_data::NormalizerConfig;

/// Configuration for a span-graph module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Key prediction fetches are issued under
    pub operation_key: String,

    /// Number of prediction records kept in the cache; zero disables it
    pub cache_capacity: usize,

    /// Stop superseded fetches early instead of letting them finish unseen
    pub cancel_superseded: bool,

    /// Annotation normalization settings
    pub normalizer: NormalizerConfig,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            operation_key: "getPreds".to_string(),
            cache_capacity: 256,
            cancel_superseded: false,
            normalizer: NormalizerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: ModuleConfig = serde_json::from_str(r#"{"cancel_superseded": true}"#).unwrap();
        assert!(config.cancel_superseded);
        assert_eq!(config.operation_key, "getPreds");
        assert_eq!(config.cache_capacity, 256);
    }
}
