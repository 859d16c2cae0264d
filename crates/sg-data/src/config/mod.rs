//! Normalizer configuration

pub mod placeholder;

pub use placeholder::PlaceholderConfig;

use serde::{Deserialize, Serialize};

/// How tokens are derived from a text field when the token field is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TokenizerMode {
    /// Split on runs of Unicode whitespace
    Whitespace,
    /// Split on a fixed delimiter, dropping empty pieces
    Delimiter { delimiter: String },
    /// Use the whole text as a single token
    Whole,
}

impl Default for TokenizerMode {
    fn default() -> Self {
        TokenizerMode::Whitespace
    }
}

impl TokenizerMode {
    /// Split `text` into tokens
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self {
            TokenizerMode::Whitespace => text.split_whitespace().map(str::to_string).collect(),
            TokenizerMode::Delimiter { delimiter } if !delimiter.is_empty() => text
                .split(delimiter.as_str())
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect(),
            TokenizerMode::Delimiter { .. } | TokenizerMode::Whole => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            }
        }
    }
}

/// Configuration for annotation normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Fallback tokenization for empty token fields
    pub tokenizer: TokenizerMode,

    /// Values treated as an empty list
    pub placeholders: PlaceholderConfig,
}

impl NormalizerConfig {
    pub fn with_tokenizer(mut self, tokenizer: TokenizerMode) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokens = TokenizerMode::Whitespace.tokenize("  John  lives\tin\nParis ");
        assert_eq!(tokens, vec!["John", "lives", "in", "Paris"]);
        assert!(TokenizerMode::Whitespace.tokenize("   ").is_empty());
    }

    #[test]
    fn test_delimiter_tokenizer() {
        let mode = TokenizerMode::Delimiter { delimiter: "|".to_string() };
        assert_eq!(mode.tokenize("a|b||c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_whole_tokenizer() {
        assert_eq!(TokenizerMode::Whole.tokenize("New York"), vec!["New York"]);
        assert!(TokenizerMode::Whole.tokenize("").is_empty());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: NormalizerConfig =
            serde_json::from_str(r#"{"tokenizer": {"mode": "delimiter", "delimiter": ","}}"#)
                .unwrap();

        assert_eq!(
            config.tokenizer,
            TokenizerMode::Delimiter { delimiter: ",".to_string() }
        );
        assert_eq!(config.placeholders, PlaceholderConfig::default());
    }
}
