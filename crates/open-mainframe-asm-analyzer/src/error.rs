//! Error types raised while analyzing a source.
//!
//! None of these abort the run except `StatementLimit`: the driver turns
//! each one into a [`ParseError`](crate::diagnostic::ParseError) and carries on.

use miette::Diagnostic;
use thiserror::Error;

use crate::diagnostic::Severity;

/// Failures resolving a COPY directive.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CopyError {
    /// COPY with an empty operand field.
    #[error("COPY statement names no member")]
    #[diagnostic(code(asm::copy_missing_name))]
    MissingName,

    /// No catalog file matches the member name.
    #[error("COPY member '{name}' not found")]
    #[diagnostic(code(asm::copy_not_found), help("add the member to the file catalog"))]
    NotFound { name: String },

    /// Member is already being copied further up the include chain.
    #[error("circular COPY of '{name}' (include chain: {chain})")]
    #[diagnostic(code(asm::copy_circular))]
    Circular { name: String, chain: String },

    /// Include chain is already at the nesting limit.
    #[error("COPY nesting of '{name}' exceeds the maximum depth of {max}")]
    #[diagnostic(code(asm::copy_depth))]
    DepthExceeded { name: String, max: usize },
}

impl CopyError {
    pub fn level(&self) -> Severity {
        match self {
            Self::MissingName | Self::NotFound { .. } => Severity::Warning,
            Self::Circular { .. } | Self::DepthExceeded { .. } => Severity::Error,
        }
    }
}

/// Failures splitting an operand field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum OperandError {
    #[error("unbalanced parentheses in operand field '{text}'")]
    #[diagnostic(code(asm::operand_parens))]
    UnbalancedParens { text: String },

    #[error("unterminated quoted string in operand field '{text}'")]
    #[diagnostic(code(asm::operand_quote))]
    UnterminatedQuote { text: String },
}

/// Everything the driver can report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum AnalyzeError {
    /// ENDM or MEND outside a macro definition.
    #[error("{opcode} without a matching MACRO")]
    #[diagnostic(code(asm::endm_without_macro))]
    EndWithoutMacro { opcode: String },

    /// Operation is neither a known instruction nor a defined macro.
    #[error("undefined macro or unknown operation '{name}'")]
    #[diagnostic(code(asm::undefined_macro))]
    UndefinedMacro { name: String },

    /// MACRO with no closing ENDM before end of input.
    #[error("macro definition '{name}' is not closed by ENDM")]
    #[diagnostic(code(asm::unterminated_macro))]
    UnterminatedMacro { name: String },

    /// Circuit breaker against runaway COPY expansion.
    #[error("statement limit of {limit} exceeded; analysis stopped")]
    #[diagnostic(code(asm::statement_limit))]
    StatementLimit { limit: usize },

    /// Operand count differs from the catalog entry.
    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    #[diagnostic(code(asm::operand_count))]
    OperandCount {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    /// Operand symbol never defined in the source.
    #[error("symbol '{name}' is never defined")]
    #[diagnostic(code(asm::undefined_symbol))]
    UndefinedSymbol { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Operand(#[from] OperandError),
}

impl AnalyzeError {
    pub fn level(&self) -> Severity {
        match self {
            Self::EndWithoutMacro { .. }
            | Self::UndefinedMacro { .. }
            | Self::UnterminatedMacro { .. }
            | Self::StatementLimit { .. } => Severity::Error,
            Self::OperandCount { .. } | Self::Operand(_) => Severity::Warning,
            Self::UndefinedSymbol { .. } => Severity::Info,
            Self::Copy(e) => e.level(),
        }
    }
}

/// Failures loading an [`AnalyzerConfig`](crate::config::AnalyzerConfig).
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid analyzer configuration: {0}")]
    #[diagnostic(code(asm::config_parse))]
    Parse(#[from] serde_json::Error),

    #[error("invalid analyzer configuration: {reason}")]
    #[diagnostic(code(asm::config_invalid))]
    Invalid { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_error_severity() {
        assert_eq!(
            CopyError::NotFound { name: "X".into() }.level(),
            Severity::Warning
        );
        assert_eq!(
            CopyError::DepthExceeded {
                name: "X".into(),
                max: 10
            }
            .level(),
            Severity::Error
        );
    }

    #[test]
    fn test_transparent_code() {
        let err = AnalyzeError::from(CopyError::Circular {
            name: "A".into(),
            chain: "A -> B".into(),
        });
        assert_eq!(err.level(), Severity::Error);
        assert_eq!(err.code().unwrap().to_string(), "asm::copy_circular");
        assert!(err.to_string().contains("circular COPY of 'A'"));
    }

    #[test]
    fn test_level_independent_of_report_severity() {
        let err = AnalyzeError::from(CopyError::NotFound { name: "X".into() });
        assert_eq!(err.level(), Severity::Warning);
        assert!(Diagnostic::severity(&err).is_none());
        assert!(Diagnostic::help(&err).is_some());
    }

    #[test]
    fn test_operand_count_message() {
        let err = AnalyzeError::OperandCount {
            mnemonic: "LA".into(),
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "LA expects 2 operand(s), found 1");
        assert_eq!(err.level(), Severity::Warning);
    }
}
