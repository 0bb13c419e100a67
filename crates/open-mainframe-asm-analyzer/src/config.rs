//! Analyzer configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Limits and switches for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Logical lines processed before the run is stopped with an error.
    #[serde(default = "default_max_statements")]
    pub max_statements: usize,
    /// Deepest allowed COPY nesting.
    #[serde(default = "default_max_copy_depth")]
    pub max_copy_depth: usize,
    /// Extensions tried when a COPY member name has no exact catalog match.
    #[serde(default = "default_copy_extensions")]
    pub copy_extensions: Vec<String>,
    /// Scan every catalog file for macro definitions before the main pass.
    #[serde(default = "default_true")]
    pub preload_library_macros: bool,
    /// Blanks after the opcode that turn the rest of the line into a remark.
    #[serde(default = "default_opcode_comment_gap")]
    pub opcode_comment_gap: usize,
    /// Report operand symbols that are never defined (info severity).
    #[serde(default)]
    pub report_undefined_symbols: bool,
}

fn default_max_statements() -> usize {
    100_000
}

fn default_max_copy_depth() -> usize {
    10
}

fn default_copy_extensions() -> Vec<String> {
    [".MAC", ".ASM", ".INC", ".MACLIB"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_opcode_comment_gap() -> usize {
    10
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_statements: default_max_statements(),
            max_copy_depth: default_max_copy_depth(),
            copy_extensions: default_copy_extensions(),
            preload_library_macros: true,
            opcode_comment_gap: default_opcode_comment_gap(),
            report_undefined_symbols: false,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every run fail immediately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_statements == 0 {
            return Err(ConfigError::Invalid {
                reason: "max_statements must be at least 1".to_string(),
            });
        }
        if self.opcode_comment_gap < 2 {
            return Err(ConfigError::Invalid {
                reason: "opcode_comment_gap must be at least 2".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_max_statements(mut self, limit: usize) -> Self {
        self.max_statements = limit;
        self
    }

    pub fn with_max_copy_depth(mut self, depth: usize) -> Self {
        self.max_copy_depth = depth;
        self
    }

    pub fn with_preload_library_macros(mut self, enabled: bool) -> Self {
        self.preload_library_macros = enabled;
        self
    }

    pub fn with_report_undefined_symbols(mut self, enabled: bool) -> Self {
        self.report_undefined_symbols = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.max_statements, 100_000);
        assert_eq!(config.max_copy_depth, 10);
        assert_eq!(config.copy_extensions, vec![".MAC", ".ASM", ".INC", ".MACLIB"]);
        assert!(config.preload_library_macros);
        assert!(!config.report_undefined_symbols);
    }

    #[test]
    fn test_from_json_partial() {
        let config = AnalyzerConfig::from_json(r#"{"max_copy_depth": 3}"#).unwrap();
        assert_eq!(config.max_copy_depth, 3);
        assert_eq!(config.max_statements, 100_000);
        assert_eq!(config.opcode_comment_gap, 10);
    }

    #[test]
    fn test_from_json_rejects_zero_limit() {
        let err = AnalyzerConfig::from_json(r#"{"max_statements": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_from_json_malformed() {
        let err = AnalyzerConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builders() {
        let config = AnalyzerConfig::new()
            .with_max_statements(50)
            .with_max_copy_depth(2)
            .with_preload_library_macros(false)
            .with_report_undefined_symbols(true);
        assert_eq!(config.max_statements, 50);
        assert_eq!(config.max_copy_depth, 2);
        assert!(!config.preload_library_macros);
        assert!(config.report_undefined_symbols);
    }
}
