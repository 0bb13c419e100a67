//! Column-addressed tokens produced by the line parser.
//!
//! Every physical record decodes into a contiguous run of tokens: the first
//! token starts at column 0, each token ends where the next begins, and the
//! texts concatenate back to the record.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
//  Token kinds
// ---------------------------------------------------------------------------

/// Classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Name field starting in column 1.
    Label,
    /// Operation field, once resolved against the catalog or macro table.
    Opcode,
    /// General-purpose register (`R0`-`R15`, `GR0`-`GR15`).
    Register,
    /// Symbol reference or unresolved operation name.
    Symbol,
    /// Literal (`=F'1'`, `=CL8'TEXT'`, `=A(X)`).
    Literal,
    /// Decimal, `nH` hex, or a decodable self-defining term.
    Number,
    /// Arithmetic operator or location counter (`+ - * /`).
    Operator,
    /// Quoted character data.
    String,
    /// Full-line comment, trailing remark, or sequence field.
    Comment,
    /// Run of blanks.
    Whitespace,
    /// Comma, parenthesis, continuation flag, or stray punctuation.
    Delimiter,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Label => "label",
            Self::Opcode => "opcode",
            Self::Register => "register",
            Self::Symbol => "symbol",
            Self::Literal => "literal",
            Self::Number => "number",
            Self::Operator => "operator",
            Self::String => "string",
            Self::Comment => "comment",
            Self::Whitespace => "whitespace",
            Self::Delimiter => "delimiter",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
//  Token
// ---------------------------------------------------------------------------

/// A token with its 0-indexed, end-exclusive column span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub column_start: usize,
    pub column_end: usize,
    /// Decoded numeric value, for NUMBER tokens that could be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

impl Token {
    /// Create a token spanning `text` from `column_start`.
    pub fn new(kind: TokenKind, text: impl Into<String>, column_start: usize) -> Self {
        let text = text.into();
        let column_end = column_start + text.chars().count();
        Self {
            kind,
            text,
            column_start,
            column_end,
            value: None,
        }
    }

    /// Attach a decoded value.
    pub fn with_value(mut self, value: Option<i64>) -> Self {
        self.value = value;
        self
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.column_end - self.column_start
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}..{}] {:?}",
            self.kind, self.column_start, self.column_end, self.text
        )
    }
}

/// Rebuild the record text from a token run.
pub fn concat_tokens(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_span() {
        let tok = Token::new(TokenKind::Symbol, "MYDATA", 16);
        assert_eq!(tok.column_end, 22);
        assert_eq!(tok.width(), 6);
        assert!(tok.value.is_none());
    }

    #[test]
    fn test_token_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TokenKind::Whitespace).unwrap();
        assert_eq!(json, "\"whitespace\"");
    }

    #[test]
    fn test_concat_tokens() {
        let tokens = vec![
            Token::new(TokenKind::Label, "A", 0),
            Token::new(TokenKind::Whitespace, "  ", 1),
            Token::new(TokenKind::Opcode, "BR", 3),
        ];
        assert_eq!(concat_tokens(&tokens), "A  BR");
    }

    #[test]
    fn test_token_display() {
        let tok = Token::new(TokenKind::Register, "R5", 10);
        assert_eq!(tok.to_string(), "register[10..12] \"R5\"");
    }
}
