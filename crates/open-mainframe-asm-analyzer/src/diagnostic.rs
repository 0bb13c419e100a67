//! Diagnostics attached to an analysis result.
//!
//! A [`ParseError`] always carries the line it belongs to and a short excerpt
//! of that line, so a consumer can render a message list without going back
//! to the source.

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;

/// Longest excerpt kept on a diagnostic, in characters.
const EXCERPT_LEN: usize = 60;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Analysis result is incomplete or the source is wrong.
    Error,
    /// Something looks suspicious; analysis continues unaffected.
    Warning,
    /// Worth noting, not a problem.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    pub line_number: usize,
    /// 0-indexed column of the offending text.
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    /// Diagnostic code, e.g. `asm::copy_circular`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub excerpt: String,
}

impl ParseError {
    /// Build a diagnostic from an analyzer error, keeping its code and severity.
    pub fn from_error(err: &AnalyzeError, line_number: usize, column: usize, raw: &str) -> Self {
        Self {
            line_number,
            column,
            message: err.to_string(),
            severity: err.level(),
            code: err.code().map(|c| c.to_string()),
            excerpt: excerpt_of(raw),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{}: {}", self.line_number, self.column, self.severity)?;
        if let Some(ref code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)?;
        if !self.excerpt.is_empty() {
            write!(f, " ({})", self.excerpt)?;
        }
        Ok(())
    }
}

fn excerpt_of(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= EXCERPT_LEN {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(EXCERPT_LEN).collect();
    cut.push_str("...");
    cut
}
