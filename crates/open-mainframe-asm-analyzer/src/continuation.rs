//! Continuation-line joining.
//!
//! A non-blank column 72 continues a statement onto the next record. The
//! joiner groups physical records into [`LogicalLine`]s: one primary record
//! followed by zero or more members. Every physical record lands in exactly
//! one group.

use std::rc::Rc;

use crate::lexer::{LineParser, CONTINUATION_COLUMN};
use crate::statement::Statement;

/// A continuation record belonging to a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationMember {
    pub line_number: usize,
    pub raw: String,
}

/// One logical line ready for the line parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Line number of the primary record.
    pub line_number: usize,
    /// The primary physical record.
    pub first_record: String,
    /// Column-preserving join of all records, when continued.
    pub joined: Option<String>,
    /// Trimmed, space-joined field text of all records, when continued.
    pub merged_text: Option<String>,
    pub members: Vec<ContinuationMember>,
    /// COPY member the records came from.
    pub source_file: Option<String>,
    /// 1-based line of the primary record within `source_file`.
    pub source_line: Option<usize>,
    /// Upper-cased COPY member names this line was included through, outermost first.
    pub include_chain: Rc<Vec<String>>,
}

impl LogicalLine {
    fn single(line_number: usize, raw: &str) -> Self {
        Self {
            line_number,
            first_record: raw.to_string(),
            joined: None,
            merged_text: None,
            members: Vec::new(),
            source_file: None,
            source_line: None,
            include_chain: Rc::new(Vec::new()),
        }
    }

    pub fn is_continued(&self) -> bool {
        !self.members.is_empty()
    }

    /// Every physical line number, primary first.
    pub fn line_numbers(&self) -> Vec<usize> {
        std::iter::once(self.line_number)
            .chain(self.members.iter().map(|m| m.line_number))
            .collect()
    }

    /// Number of physical records in this logical line.
    pub fn record_count(&self) -> usize {
        1 + self.members.len()
    }

    /// Decode the primary statement.
    ///
    /// A continued line is field-parsed from the joined text and links every
    /// contributing record.
    pub fn parse_primary(&self, parser: &LineParser) -> Statement {
        let mut stmt = match &self.joined {
            Some(joined) => {
                let mut stmt = parser.parse_continued(&self.first_record, joined, self.line_number);
                stmt.continuation_lines = self.line_numbers();
                stmt.merged_text = self.merged_text.clone();
                stmt
            }
            None => parser.parse(&self.first_record, self.line_number, false),
        };
        stmt.source_file = self.source_file.clone();
        stmt.source_line = self.source_line;
        stmt
    }

    /// One operand-only statement per continuation record.
    pub fn parse_members(&self, parser: &LineParser) -> Vec<Statement> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, member)| {
                let mut stmt = parser.parse(&member.raw, member.line_number, true);
                stmt.is_continuation = true;
                stmt.continuation_of = Some(self.line_number);
                stmt.source_file = self.source_file.clone();
                stmt.source_line = self.source_line.map(|l| l + i + 1);
                stmt
            })
            .collect()
    }

    /// Every physical record, primary first.
    pub fn records(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.first_record.as_str()).chain(self.members.iter().map(|m| m.raw.as_str()))
    }

    /// Tag the line as coming from a COPY member.
    pub fn with_source(mut self, file: &str, source_line: usize, chain: Rc<Vec<String>>) -> Self {
        self.source_file = Some(file.to_string());
        self.source_line = Some(source_line);
        self.include_chain = chain;
        self
    }
}

/// True when column 72 holds a non-blank character.
pub fn has_continuation_flag(line: &str) -> bool {
    line.chars()
        .nth(CONTINUATION_COLUMN)
        .is_some_and(|c| !c.is_whitespace())
}

/// Columns 1-71 of a record.
fn statement_zone(line: &str) -> String {
    line.chars().take(CONTINUATION_COLUMN).collect()
}

/// Group physical records into logical lines. The first record gets
/// `first_line_number`; the rest follow consecutively.
pub fn join_lines<S: AsRef<str>>(lines: &[S], first_line_number: usize) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let first = lines[i].as_ref();
        let mut logical = LogicalLine::single(first_line_number + i, first);

        let mut flagged = has_continuation_flag(first);
        i += 1;
        while flagged && i < lines.len() {
            let raw = lines[i].as_ref();
            logical.members.push(ContinuationMember {
                line_number: first_line_number + i,
                raw: raw.to_string(),
            });
            flagged = has_continuation_flag(raw);
            i += 1;
        }

        if logical.is_continued() {
            let zone = statement_zone(first);
            let mut joined = zone.trim_end().to_string();
            let mut merged = zone.trim().to_string();
            for member in &logical.members {
                let piece = statement_zone(&member.raw);
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                joined.push(' ');
                joined.push_str(piece);
                if !merged.is_empty() {
                    merged.push(' ');
                }
                merged.push_str(piece);
            }
            logical.joined = Some(joined);
            logical.merged_text = Some(merged);
        }
        out.push(logical);
    }

    out
}
