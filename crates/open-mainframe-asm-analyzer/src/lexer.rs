//! Fixed-format record decoder and operand sub-tokenizer.
//!
//! Source format (1-based columns):
//! - **Column 1**: label start (space = no label, `*` = comment)
//! - **Columns 1-8**: label field; longer labels run to the next blank
//! - **Column 9**: separator
//! - **Columns 10-71**: operation code, operands and remarks
//! - **Column 72**: continuation flag (non-blank = continued)
//! - **Columns 73-80**: sequence field
//!
//! Decoding runs in two passes. [`LineParser::split_fields`] finds the label,
//! opcode, operand and remark spans with a quote-aware scan; the operand span
//! is then handed to [`tokenize_operands`], which classifies each piece while
//! keeping its exact column offsets. Every character of the record lands in
//! exactly one token.

use std::ops::Range;

use crate::statement::Statement;
use crate::token::{Token, TokenKind};

/// 0-indexed column of the continuation flag (column 72).
pub const CONTINUATION_COLUMN: usize = 71;

/// Width of the classic name field (columns 1-8).
pub const LABEL_WIDTH: usize = 8;

/// Letters that form an attribute reference when followed by `'` and a name.
const ATTRIBUTE_LETTERS: &str = "DIKLNOST";

/// DC/DS type codes that may prefix a quoted nominal value.
const DC_TYPE_LETTERS: &str = "ABCDEFGHLPQRSVXYZ";

// ---------------------------------------------------------------------------
//  Field spans
// ---------------------------------------------------------------------------

/// Column spans of the fields of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub label: Option<Range<usize>>,
    pub opcode: Option<Range<usize>>,
    pub operands: Option<Range<usize>>,
    pub comment: Option<Range<usize>>,
}

/// Scanner state for quote tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Normal,
    InString(char),
}

// ---------------------------------------------------------------------------
//  Line parser
// ---------------------------------------------------------------------------

/// Decodes physical records into [`Statement`]s.
#[derive(Debug, Clone)]
pub struct LineParser {
    /// Blanks after the opcode that make the rest of the record a remark.
    opcode_comment_gap: usize,
}

impl Default for LineParser {
    fn default() -> Self {
        Self {
            opcode_comment_gap: 10,
        }
    }
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opcode_comment_gap(mut self, gap: usize) -> Self {
        self.opcode_comment_gap = gap.max(2);
        self
    }

    /// Decode one physical record.
    ///
    /// With `fragment` set the record is a continuation member: everything in
    /// columns 1-71 is operand text (plus an optional remark), and no label or
    /// opcode is looked for.
    pub fn parse(&self, line: &str, line_number: usize, fragment: bool) -> Statement {
        let chars: Vec<char> = line.chars().collect();
        let zone_end = chars.len().min(CONTINUATION_COLUMN);
        let mut stmt = Statement::new(line_number, line);

        if !fragment && is_comment_record(&chars) {
            stmt.comment = Some(line.trim().to_string());
            let start = skip_blanks(&chars, 0, chars.len());
            let mut tokens = Vec::new();
            push_filler(&mut tokens, &chars, 0, start);
            push_token(&mut tokens, Token::new(TokenKind::Comment, collect(&chars, start..chars.len()), start));
            stmt.tokens = tokens;
            return stmt;
        }

        let fields = if fragment {
            self.split_fragment(&chars, zone_end)
        } else {
            self.split_fields(&chars, zone_end)
        };
        apply_fields(&mut stmt, &chars, &fields);

        let mut tokens = tokenize_fields(&chars, &fields, zone_end);
        push_tail(&mut tokens, &chars, zone_end);
        stmt.tokens = tokens;
        stmt
    }

    /// Decode a joined logical line with no column-72 limit.
    pub fn parse_logical(&self, text: &str, line_number: usize) -> Statement {
        let chars: Vec<char> = text.chars().collect();
        let mut stmt = Statement::new(line_number, text);
        if is_comment_record(&chars) {
            stmt.comment = Some(text.trim().to_string());
            stmt.tokens = vec![Token::new(TokenKind::Comment, text, 0)];
            return stmt;
        }
        let fields = self.split_fields(&chars, chars.len());
        apply_fields(&mut stmt, &chars, &fields);
        stmt.tokens = tokenize_fields(&chars, &fields, chars.len());
        stmt
    }

    /// Decode the primary record of a continued statement.
    ///
    /// Fields come from the joined text; tokens describe the first physical
    /// record only, so each record keeps its own column map.
    pub fn parse_continued(&self, first_record: &str, joined: &str, line_number: usize) -> Statement {
        let physical = self.parse(first_record, line_number, false);
        let mut stmt = self.parse_logical(joined, line_number);
        stmt.raw_text = physical.raw_text;
        stmt.tokens = physical.tokens;
        stmt
    }

    /// Locate the label, opcode, operand and remark spans inside `[0, zone_end)`.
    pub fn split_fields(&self, chars: &[char], zone_end: usize) -> Fields {
        let mut fields = Fields::default();
        if zone_end == 0 {
            return fields;
        }

        let mut pos = 0;
        if !chars[0].is_whitespace() {
            let end = scan_while(chars, 0, zone_end, |c| !c.is_whitespace());
            fields.label = Some(0..end);
            pos = end;
        }

        let op_start = skip_blanks(chars, pos, zone_end);
        if op_start >= zone_end {
            return fields;
        }
        let op_end = scan_while(chars, op_start, zone_end, |c| !c.is_whitespace());
        fields.opcode = Some(op_start..op_end);

        let rest = skip_blanks(chars, op_end, zone_end);
        if rest >= zone_end {
            return fields;
        }
        if rest - op_end >= self.opcode_comment_gap {
            fields.comment = Some(rest..trim_end(chars, rest, zone_end));
            return fields;
        }

        let (operands, comment) = scan_operand_field(chars, rest, zone_end);
        fields.operands = Some(operands);
        fields.comment = comment;
        fields
    }

    fn split_fragment(&self, chars: &[char], zone_end: usize) -> Fields {
        let mut fields = Fields::default();
        let start = skip_blanks(chars, 0, zone_end);
        if start < zone_end {
            let (operands, comment) = scan_operand_field(chars, start, zone_end);
            fields.operands = Some(operands);
            fields.comment = comment;
        }
        fields
    }
}

/// True when the record is a full-line comment (`*` or `.*` first).
pub fn is_comment_record(chars: &[char]) -> bool {
    let start = skip_blanks(chars, 0, chars.len());
    match chars.get(start) {
        Some('*') => true,
        Some('.') => start == 0 && chars.get(1) == Some(&'*'),
        _ => false,
    }
}

fn apply_fields(stmt: &mut Statement, chars: &[char], fields: &Fields) {
    stmt.label = fields.label.clone().map(|r| collect(chars, r));
    stmt.opcode = fields.opcode.clone().map(|r| collect(chars, r));
    stmt.operands_text = fields.operands.clone().map(|r| collect(chars, r));
    stmt.comment = fields.comment.clone().map(|r| collect(chars, r));
}

/// Scan an operand field starting at a non-blank `start`.
///
/// The field ends at a run of two or more blanks, or at a single blank
/// followed by a lone `*`. Blanks and asterisks inside quotes never end it,
/// and an unterminated quote runs to `zone_end`.
fn scan_operand_field(chars: &[char], start: usize, zone_end: usize) -> (Range<usize>, Option<Range<usize>>) {
    let mut state = LexState::Normal;
    let mut p = start;
    while p < zone_end {
        let c = chars[p];
        match state {
            LexState::InString(q) => {
                if c == q {
                    if p + 1 < zone_end && chars[p + 1] == q {
                        p += 2;
                        continue;
                    }
                    state = LexState::Normal;
                }
            }
            LexState::Normal => {
                if c == '\'' {
                    if !is_attribute_quote(chars, start, p) {
                        state = LexState::InString(c);
                    }
                } else if c.is_whitespace() {
                    let next = skip_blanks(chars, p, zone_end);
                    if next >= zone_end {
                        return (start..p, None);
                    }
                    let lone_star = chars[next] == '*'
                        && chars.get(next + 1).map_or(true, |c| c.is_whitespace());
                    if next - p >= 2 || lone_star {
                        return (start..p, Some(next..trim_end(chars, next, zone_end)));
                    }
                }
            }
        }
        p += 1;
    }
    (start..trim_end(chars, start, zone_end), None)
}

/// `L'FIELD`-style attribute reference: the quote follows a lone attribute
/// letter and is followed by a name.
pub(crate) fn is_attribute_quote(chars: &[char], field_start: usize, quote: usize) -> bool {
    if quote <= field_start {
        return false;
    }
    let letter = chars[quote - 1].to_ascii_uppercase();
    if !ATTRIBUTE_LETTERS.contains(letter) {
        return false;
    }
    let isolated = quote - 1 == field_start || !is_word_char(chars[quote - 2]);
    isolated && chars.get(quote + 1).is_some_and(|&c| is_symbol_start(c))
}

// ---------------------------------------------------------------------------
//  Token assembly
// ---------------------------------------------------------------------------

fn tokenize_fields(chars: &[char], fields: &Fields, zone_end: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    if let Some(r) = &fields.label {
        push_filler(&mut tokens, chars, pos, r.start);
        tokens.push(Token::new(TokenKind::Label, collect(chars, r.clone()), r.start));
        pos = r.end;
    }
    if let Some(r) = &fields.opcode {
        push_filler(&mut tokens, chars, pos, r.start);
        tokens.push(Token::new(TokenKind::Symbol, collect(chars, r.clone()), r.start));
        pos = r.end;
    }
    if let Some(r) = &fields.operands {
        push_filler(&mut tokens, chars, pos, r.start);
        for tok in tokenize_operands(&chars[r.clone()], r.start) {
            push_token(&mut tokens, tok);
        }
        pos = r.end;
    }
    if let Some(r) = &fields.comment {
        push_filler(&mut tokens, chars, pos, r.start);
        tokens.push(Token::new(TokenKind::Comment, collect(chars, r.clone()), r.start));
        pos = r.end;
    }
    push_filler(&mut tokens, chars, pos, zone_end);
    tokens
}

/// Column 72 flag and the sequence field.
fn push_tail(tokens: &mut Vec<Token>, chars: &[char], zone_end: usize) {
    if chars.len() <= CONTINUATION_COLUMN || zone_end != CONTINUATION_COLUMN {
        return;
    }
    let flag = chars[CONTINUATION_COLUMN];
    let kind = if flag.is_whitespace() {
        TokenKind::Whitespace
    } else {
        TokenKind::Delimiter
    };
    push_token(tokens, Token::new(kind, flag.to_string(), CONTINUATION_COLUMN));

    let seq_start = CONTINUATION_COLUMN + 1;
    if chars.len() > seq_start {
        let seq = &chars[seq_start..];
        let kind = if seq.iter().all(|c| c.is_whitespace()) {
            TokenKind::Whitespace
        } else {
            TokenKind::Comment
        };
        push_token(tokens, Token::new(kind, seq.iter().collect::<String>(), seq_start));
    }
}

/// Emit `[from, to)` as whitespace runs, with anything else as delimiters.
fn push_filler(tokens: &mut Vec<Token>, chars: &[char], from: usize, to: usize) {
    let mut p = from;
    while p < to {
        let blank = chars[p].is_whitespace();
        let end = scan_while(chars, p, to, |c| c.is_whitespace() == blank);
        let kind = if blank {
            TokenKind::Whitespace
        } else {
            TokenKind::Delimiter
        };
        push_token(tokens, Token::new(kind, collect(chars, p..end), p));
        p = end;
    }
}

/// Push, merging adjacent whitespace.
fn push_token(tokens: &mut Vec<Token>, tok: Token) {
    if tok.text.is_empty() {
        return;
    }
    if tok.is_whitespace() {
        if let Some(last) = tokens.last_mut() {
            if last.is_whitespace() && last.column_end == tok.column_start {
                last.text.push_str(&tok.text);
                last.column_end = tok.column_end;
                return;
            }
        }
    }
    tokens.push(tok);
}

// ---------------------------------------------------------------------------
//  Operand sub-tokenizer
// ---------------------------------------------------------------------------

/// Tokenize operand text whose first character sits at column `offset`.
pub fn tokenize_operands(chars: &[char], offset: usize) -> Vec<Token> {
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    // True where a new operand may begin, so `=` opens a literal.
    let mut operand_start = true;

    while i < n {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i = skip_blanks(chars, i, n);
            tokens.push(Token::new(TokenKind::Whitespace, collect(chars, start..i), offset + start));
            continue;
        }

        match c {
            ',' | '(' | ')' => {
                tokens.push(Token::new(TokenKind::Delimiter, c.to_string(), offset + start));
                i += 1;
                operand_start = c != ')';
            }
            '=' if operand_start => {
                i = scan_literal(chars, i);
                tokens.push(Token::new(TokenKind::Literal, collect(chars, start..i), offset + start));
                operand_start = false;
            }
            '+' | '-' | '*' | '/' | '=' => {
                tokens.push(Token::new(TokenKind::Operator, c.to_string(), offset + start));
                i += 1;
                operand_start = false;
            }
            '\'' => {
                i = scan_quoted(chars, i);
                tokens.push(Token::new(TokenKind::String, collect(chars, start..i), offset + start));
                operand_start = false;
            }
            c if is_word_char(c) => {
                let end = scan_while(chars, i, n, is_word_char);
                let word = collect(chars, start..end);
                let quoted = chars.get(end) == Some(&'\'');

                if quoted
                    && word.chars().count() == 1
                    && ATTRIBUTE_LETTERS.contains(word.to_ascii_uppercase().as_str())
                    && chars.get(end + 1).is_some_and(|&c| is_symbol_start(c))
                {
                    i = scan_while(chars, end + 1, n, is_word_char);
                    tokens.push(Token::new(TokenKind::Symbol, collect(chars, start..i), offset + start));
                } else if quoted && is_type_prefix(&word) {
                    i = scan_quoted(chars, end);
                    let body = quoted_body(&chars[end..i]);
                    let value = decode_term(&word, &body);
                    let kind = if value.is_some() {
                        TokenKind::Number
                    } else {
                        TokenKind::String
                    };
                    tokens.push(Token::new(kind, collect(chars, start..i), offset + start).with_value(value));
                } else {
                    tokens.push(classify_word(word, offset + start));
                    i = end;
                }
                operand_start = false;
            }
            _ => {
                tokens.push(Token::new(TokenKind::Delimiter, c.to_string(), offset + start));
                i += 1;
            }
        }
    }

    tokens
}

/// Classify a bare word: register, decimal, `nH` hex, or symbol.
fn classify_word(word: String, column: usize) -> Token {
    let upper = word.to_ascii_uppercase();
    if let Some(reg) = parse_register(&upper) {
        return Token::new(TokenKind::Register, word, column).with_value(Some(i64::from(reg)));
    }
    if upper.chars().all(|c| c.is_ascii_digit()) {
        let value = upper.parse::<i64>().ok();
        return Token::new(TokenKind::Number, word, column).with_value(value);
    }
    if let Some(value) = parse_hex_suffix(&upper) {
        return Token::new(TokenKind::Number, word, column).with_value(Some(value));
    }
    Token::new(TokenKind::Symbol, word, column)
}

/// Parse `Rn` / `GRn` (0-15).
pub fn parse_register(name: &str) -> Option<u8> {
    let upper = name.to_ascii_uppercase();
    let digits = upper
        .strip_prefix("GR")
        .or_else(|| upper.strip_prefix('R'))?;
    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u8>().ok().filter(|&n| n <= 15)
}

/// Parse `nnH` hexadecimal notation; the first character must be a digit.
pub fn parse_hex_suffix(text: &str) -> Option<i64> {
    let upper = text.to_ascii_uppercase();
    let stem = upper.strip_suffix('H')?;
    if stem.is_empty() || !stem.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    i64::from_str_radix(stem, 16).ok()
}

/// `C`, `X`, `CL8`, `3F`, `XL4`, `PL3`, `EH` and similar DC type prefixes.
fn is_type_prefix(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    let rest = upper.trim_start_matches(|c: char| c.is_ascii_digit());
    let b = rest.as_bytes();
    if b.is_empty() || !DC_TYPE_LETTERS.contains(b[0] as char) {
        return false;
    }
    let mut i = 1;
    if i < b.len() && b[i] != b'L' && b"ABDEHU".contains(&b[i]) {
        i += 1;
    }
    if i < b.len() && b[i] == b'L' {
        i += 1;
        let digits = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits {
            return false;
        }
    }
    i == b.len()
}

/// Decode a self-defining term to an integer where the type allows it.
fn decode_term(prefix: &str, body: &str) -> Option<i64> {
    let upper = prefix.to_ascii_uppercase();
    let type_char = upper.trim_start_matches(|c: char| c.is_ascii_digit()).chars().next()?;
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match type_char {
        'X' if body.len() <= 16 => i64::from_str_radix(body, 16).ok(),
        'B' if body.len() <= 63 => i64::from_str_radix(body, 2).ok(),
        'F' | 'H' | 'P' | 'Z' => body.parse::<i64>().ok(),
        _ => None,
    }
}

/// Index just past the closing quote of a string starting at `open`, or the
/// end of input when the string is unterminated.
fn scan_quoted(chars: &[char], open: usize) -> usize {
    let n = chars.len();
    let mut j = open + 1;
    while j < n {
        if chars[j] == '\'' {
            if j + 1 < n && chars[j + 1] == '\'' {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    n
}

/// Text between the quotes of `'...'`, with doubled quotes collapsed.
fn quoted_body(quoted: &[char]) -> String {
    let inner: &[char] = match quoted {
        [_, rest @ .., '\''] => rest,
        [_, rest @ ..] => rest,
        [] => &[],
    };
    inner.iter().collect::<String>().replace("''", "'")
}

/// Index just past a literal starting at the `=` at `eq`.
fn scan_literal(chars: &[char], eq: usize) -> usize {
    let n = chars.len();
    let mut state = LexState::Normal;
    let mut depth = 0usize;
    let mut seen_quote = false;
    let mut j = eq + 1;
    while j < n {
        let c = chars[j];
        match state {
            LexState::InString(q) => {
                if c == q {
                    if j + 1 < n && chars[j + 1] == q {
                        j += 2;
                        continue;
                    }
                    state = LexState::Normal;
                }
            }
            LexState::Normal => match c {
                '\'' => {
                    state = LexState::InString(c);
                    seen_quote = true;
                }
                '(' if depth == 0 && seen_quote => break,
                '(' => depth += 1,
                ')' if depth == 0 => break,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return j + 1;
                    }
                }
                ',' if depth == 0 => break,
                c if c.is_whitespace() && depth == 0 => break,
                _ => {}
            },
        }
        j += 1;
    }
    j
}

// ---------------------------------------------------------------------------
//  Character helpers
// ---------------------------------------------------------------------------

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '#' | '$' | '_' | '&' | '.')
}

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '@' | '#' | '$' | '_' | '&')
}

fn scan_while(chars: &[char], from: usize, to: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut p = from;
    while p < to && pred(chars[p]) {
        p += 1;
    }
    p
}

fn skip_blanks(chars: &[char], from: usize, to: usize) -> usize {
    scan_while(chars, from, to, |c| c.is_whitespace())
}

/// End of the last non-blank character in `[from, to)`, at least `from`.
fn trim_end(chars: &[char], from: usize, to: usize) -> usize {
    let mut end = to;
    while end > from && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    end
}

fn collect(chars: &[char], range: Range<usize>) -> String {
    chars[range].iter().collect()
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
