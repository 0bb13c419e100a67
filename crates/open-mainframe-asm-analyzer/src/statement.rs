//! Statements: one per logical line plus one per continuation member.

use serde::Serialize;

use crate::opcode::{OpFormat, OpcodeInfo};
use crate::operand::Operand;
use crate::token::{Token, TokenKind};

/// Instruction details filled in by the enrichment pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionInfo {
    pub mnemonic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OpFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub operands: Vec<Operand>,
}

impl InstructionInfo {
    pub fn from_catalog(info: &OpcodeInfo, operands: Vec<Operand>) -> Self {
        Self {
            mnemonic: info.mnemonic.to_string(),
            format: Some(info.format),
            description: Some(info.description.to_string()),
            operands,
        }
    }

    /// Instruction info for a macro call or unknown operation.
    pub fn bare(mnemonic: &str, operands: Vec<Operand>) -> Self {
        Self {
            mnemonic: mnemonic.to_ascii_uppercase(),
            format: None,
            description: None,
            operands,
        }
    }
}

/// A decoded source statement.
///
/// Created by the line parser, enriched once by the driver, then left alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// 1-based line number; COPY members get synthetic numbers past the main source.
    pub line_number: usize,
    /// The physical record this statement was decoded from.
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operands_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub tokens: Vec<Token>,
    /// COPY member this line came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// 1-based line within `source_file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
    pub is_macro_call: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_name: Option<String>,
    /// Informational substitution of the macro body.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub macro_expansion: Vec<String>,
    /// True for a continuation member's secondary statement.
    pub is_continuation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_of: Option<usize>,
    /// Every physical line of a continued statement, primary first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub continuation_lines: Vec<usize>,
    /// Field contents of all continued records, trimmed and space-joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<InstructionInfo>,
}

impl Statement {
    /// An empty statement for `raw_text`.
    pub fn new(line_number: usize, raw_text: impl Into<String>) -> Self {
        Self {
            line_number,
            raw_text: raw_text.into(),
            label: None,
            opcode: None,
            operands_text: None,
            comment: None,
            tokens: Vec::new(),
            source_file: None,
            source_line: None,
            is_macro_call: false,
            macro_name: None,
            macro_expansion: Vec::new(),
            is_continuation: false,
            continuation_of: None,
            continuation_lines: Vec::new(),
            merged_text: None,
            instruction: None,
        }
    }

    /// Full-line comment: only `comment` is set.
    pub fn is_comment(&self) -> bool {
        self.comment.is_some()
            && self.label.is_none()
            && self.opcode.is_none()
            && self.operands_text.is_none()
    }

    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
    }

    /// Opcode in upper case, if any.
    pub fn opcode_upper(&self) -> Option<String> {
        self.opcode.as_ref().map(|o| o.to_ascii_uppercase())
    }

    /// Operand field, or "" when absent.
    pub fn operands(&self) -> &str {
        self.operands_text.as_deref().unwrap_or("")
    }

    /// Column where the operand field starts, falling back to the opcode.
    pub fn operands_column(&self) -> usize {
        let Some(idx) = self.opcode_index() else {
            return 0;
        };
        self.tokens[idx + 1..]
            .iter()
            .find(|t| !t.is_whitespace())
            .map_or(self.tokens[idx].column_start, |t| t.column_start)
    }

    /// Column of the opcode token, or 0.
    pub fn opcode_column(&self) -> usize {
        self.opcode_index().map_or(0, |i| self.tokens[i].column_start)
    }

    fn opcode_index(&self) -> Option<usize> {
        let opcode = self.opcode.as_deref()?;
        self.tokens
            .iter()
            .position(|t| t.kind != TokenKind::Label && !t.is_whitespace() && t.text == opcode)
    }

    /// Mark the opcode token as resolved.
    pub fn tag_opcode(&mut self) {
        if let Some(idx) = self.opcode_index() {
            let tok = &mut self.tokens[idx];
            if tok.kind == TokenKind::Symbol {
                tok.kind = TokenKind::Opcode;
            }
        }
    }

    /// Tokens excluding whitespace.
    pub fn significant_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.is_whitespace())
    }
}
