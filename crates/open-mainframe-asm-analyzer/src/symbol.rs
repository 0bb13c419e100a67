//! Symbol table builder.
//!
//! - One flat, case-insensitive namespace keyed by label text
//! - EQU values from a small literal grammar (decimal, `nH`, `X'..'`, `B'..'`, `C'..'`, `*`)
//! - DC/DS type grammar yielding data type, element length and nominal value
//! - EQU/DC/DS definitions overwrite; plain labels only fill empty slots

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::operand::{parse_immediate, split_operands};
use crate::statement::Statement;

// ---------------------------------------------------------------------------
//  Definitions
// ---------------------------------------------------------------------------

/// How a symbol was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Label on any other statement.
    Label,
    /// EQU.
    Equ,
    /// DC.
    Constant,
    /// DS.
    Variable,
}

/// Symbol value: a number, or text the table does not evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolValue {
    Number(i64),
    Text(String),
}

impl SymbolValue {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<i64> for SymbolValue {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for SymbolValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDefinition {
    /// Name as written in the source.
    pub name: String,
    pub value: SymbolValue,
    pub kind: SymbolKind,
    /// Line number of the defining statement.
    pub defined_at: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// DC/DS type, e.g. `F`, `CL10`, `Z5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Length in bytes of one element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Explicit DC/DS duplication factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplication: Option<u32>,
    /// Control section active at definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl SymbolDefinition {
    pub fn new(name: &str, value: SymbolValue, kind: SymbolKind, defined_at: usize) -> Self {
        Self {
            name: name.to_string(),
            value,
            kind,
            defined_at,
            source_file: None,
            data_type: None,
            length: None,
            duplication: None,
            section: None,
        }
    }
}

// ---------------------------------------------------------------------------
//  Table
// ---------------------------------------------------------------------------

/// The symbol table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    /// Definitions by upper-cased name.
    symbols: HashMap<String, SymbolDefinition>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition.
    pub fn define(&mut self, def: SymbolDefinition) {
        self.symbols.insert(def.name.to_uppercase(), def);
    }

    /// Insert only if the name is free. Returns whether it was inserted.
    pub fn define_if_absent(&mut self, def: SymbolDefinition) -> bool {
        let key = def.name.to_uppercase();
        if self.symbols.contains_key(&key) {
            return false;
        }
        self.symbols.insert(key, def);
        true
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&SymbolDefinition> {
        self.symbols.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolDefinition> {
        self.symbols.values()
    }

    /// Definitions ordered by defining line, then name.
    pub fn by_definition(&self) -> Vec<&SymbolDefinition> {
        let mut defs: Vec<&SymbolDefinition> = self.symbols.values().collect();
        defs.sort_by(|a, b| a.defined_at.cmp(&b.defined_at).then_with(|| a.name.cmp(&b.name)));
        defs
    }

    /// Record the label of `stmt`, if it has one.
    ///
    /// Returns the name when a plain label was ignored because the name was
    /// already taken.
    pub fn record_statement(&mut self, stmt: &Statement, section: Option<&str>) -> Option<String> {
        let label = stmt.label.as_deref()?;
        // Sequence symbols and macro variables are not ordinary symbols.
        if label.starts_with('.') || label.starts_with('&') {
            return None;
        }
        let opcode = stmt.opcode_upper().unwrap_or_default();
        let line = stmt.line_number;

        let mut def = match opcode.as_str() {
            "EQU" => equ_definition(label, stmt.operands(), line),
            "DC" => storage_definition(label, stmt.operands(), line, SymbolKind::Constant),
            "DS" => storage_definition(label, stmt.operands(), line, SymbolKind::Variable),
            _ => SymbolDefinition::new(label, SymbolValue::Number(line as i64), SymbolKind::Label, line),
        };
        def.source_file = stmt.source_file.clone();
        def.section = section.map(str::to_string);

        if def.kind == SymbolKind::Label {
            if !self.define_if_absent(def) {
                return Some(label.to_string());
            }
        } else {
            self.define(def);
        }
        None
    }
}

// ---------------------------------------------------------------------------
//  EQU
// ---------------------------------------------------------------------------

fn equ_definition(label: &str, operands: &str, line: usize) -> SymbolDefinition {
    let parts = split_operands(operands).unwrap_or_else(|_| vec![operands.trim().to_string()]);
    let first = parts.first().map(String::as_str).unwrap_or("");
    let value = evaluate_equ(first, line);
    let mut def = SymbolDefinition::new(label, value, SymbolKind::Equ, line);
    def.length = parts.get(1).and_then(|l| l.trim().parse::<u32>().ok());
    def
}

/// Evaluate an EQU operand; anything outside the literal grammar stays text.
pub fn evaluate_equ(expr: &str, line: usize) -> SymbolValue {
    let expr = expr.trim();
    if expr == "*" {
        return SymbolValue::Number(line as i64);
    }
    match parse_immediate(expr) {
        Some(n) => SymbolValue::Number(n),
        None => SymbolValue::Text(expr.to_string()),
    }
}

fn parse_signed_decimal(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok()
}

// ---------------------------------------------------------------------------
//  DC / DS type grammar
// ---------------------------------------------------------------------------

/// A DC/DS type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcType {
    /// Address constant (A).
    A,
    /// Binary (B).
    B,
    /// Character (C).
    C,
    /// Long floating-point (D).
    D,
    /// Short floating-point (E).
    E,
    /// Fullword fixed-point (F).
    F,
    /// Graphic DBCS (G).
    G,
    /// Halfword fixed-point (H).
    H,
    /// Packed decimal (P).
    P,
    /// Dummy section offset (Q).
    Q,
    /// S-type address constant (S).
    S,
    /// External address constant (V).
    V,
    /// Hexadecimal (X).
    X,
    /// Halfword address constant (Y).
    Y,
    /// Zoned decimal (Z).
    Z,
}

impl DcType {
    /// Parse a type code character.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            'F' => Some(Self::F),
            'G' => Some(Self::G),
            'H' => Some(Self::H),
            'P' => Some(Self::P),
            'Q' => Some(Self::Q),
            'S' => Some(Self::S),
            'V' => Some(Self::V),
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
            Self::H => 'H',
            Self::P => 'P',
            Self::Q => 'Q',
            Self::S => 'S',
            Self::V => 'V',
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }

    /// Implicit length in bytes when no length modifier or nominal value applies.
    pub fn default_length(self) -> u32 {
        match self {
            Self::A | Self::E | Self::F | Self::Q | Self::V => 4,
            Self::D => 8,
            Self::G | Self::H | Self::S | Self::Y => 2,
            Self::B | Self::C | Self::P | Self::X | Self::Z => 1,
        }
    }
}

/// A parsed DC/DS operand such as `3F'100'`, `CL80' '`, `XL4'FF'`, `A(TABLE)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcOperand {
    /// Explicit numeric duplication factor; `None` when absent or an expression.
    pub duplication: Option<u32>,
    pub dc_type: DcType,
    /// Explicit length modifier.
    pub length: Option<u32>,
    /// Nominal value: quoted text with doubled quotes collapsed, or the
    /// expression inside parentheses for address constants.
    pub nominal: Option<String>,
}

impl DcOperand {
    /// Data type name as shown in listings: `CLn` for character, `Zn` for
    /// zoned decimal with a length, otherwise the type letter.
    pub fn data_type(&self) -> String {
        match (self.dc_type, self.length) {
            (DcType::C, Some(n)) => format!("CL{n}"),
            (DcType::Z, Some(n)) => format!("Z{n}"),
            (t, _) => t.as_char().to_string(),
        }
    }

    /// Length in bytes of one element.
    pub fn element_length(&self) -> u32 {
        if let Some(len) = self.length {
            return len;
        }
        let Some(nominal) = self.nominal.as_deref() else {
            return self.dc_type.default_length();
        };
        let count = |pred: fn(char) -> bool| nominal.chars().filter(|&c| pred(c)).count() as u32;
        match self.dc_type {
            DcType::C => (nominal.chars().count() as u32).max(1),
            DcType::X => count(|c| c.is_ascii_hexdigit()).div_ceil(2).max(1),
            DcType::B => count(|c| c == '0' || c == '1').div_ceil(8).max(1),
            DcType::P => (count(|c| c.is_ascii_digit()) + 2) / 2,
            DcType::Z => count(|c| c.is_ascii_digit()).max(1),
            t => t.default_length(),
        }
    }

    /// Nominal value as a symbol value, decoding numeric types.
    pub fn value(&self) -> Option<SymbolValue> {
        let nominal = self.nominal.as_deref()?;
        let trimmed = nominal.trim();
        let number = match self.dc_type {
            DcType::F | DcType::H | DcType::P | DcType::Z => parse_signed_decimal(trimmed),
            DcType::X => i64::from_str_radix(trimmed, 16).ok(),
            DcType::B => i64::from_str_radix(trimmed, 2).ok(),
            _ => None,
        };
        Some(match number {
            Some(n) => SymbolValue::Number(n),
            None => SymbolValue::Text(nominal.to_string()),
        })
    }
}

/// Parse one DC/DS operand.
pub fn parse_dc_operand(operand: &str) -> Option<DcOperand> {
    let chars: Vec<char> = operand.trim().chars().collect();
    let mut i = 0;

    // Duplication factor: digits, or a parenthesized expression.
    let mut duplication = None;
    if i < chars.len() && chars[i].is_ascii_digit() {
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        duplication = chars[start..i].iter().collect::<String>().parse().ok();
    } else if i < chars.len() && chars[i] == '(' {
        i = matching_paren(&chars, i)? + 1;
    }

    // Type code.
    let dc_type = DcType::from_char(*chars.get(i)?)?;
    i += 1;

    // Two-char type variants (CA, CE, DH, EH, FD, ...), never the L modifier.
    if i < chars.len() && chars[i].is_ascii_alphabetic() && !chars[i].eq_ignore_ascii_case(&'L') {
        i += 1;
    }

    // Length modifier: L followed by digits.
    let mut length = None;
    if i < chars.len() && chars[i].eq_ignore_ascii_case(&'L') {
        i += 1;
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        length = chars[start..i].iter().collect::<String>().parse::<u32>().ok();
    }

    // Nominal value.
    let mut nominal = None;
    if i < chars.len() && chars[i] == '\'' {
        i += 1;
        let mut value = String::new();
        while i < chars.len() {
            if chars[i] == '\'' {
                if i + 1 < chars.len() && chars[i + 1] == '\'' {
                    value.push('\'');
                    i += 2;
                    continue;
                }
                break;
            }
            value.push(chars[i]);
            i += 1;
        }
        nominal = Some(value);
    } else if i < chars.len() && chars[i] == '(' {
        let close = matching_paren(&chars, i).unwrap_or(chars.len());
        nominal = Some(chars[i + 1..close.min(chars.len())].iter().collect());
    }

    Some(DcOperand {
        duplication,
        dc_type,
        length,
        nominal,
    })
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (j, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

fn storage_definition(label: &str, operands: &str, line: usize, kind: SymbolKind) -> SymbolDefinition {
    let first = split_operands(operands)
        .ok()
        .and_then(|parts| parts.into_iter().next())
        .unwrap_or_else(|| operands.trim().to_string());

    let Some(op) = parse_dc_operand(&first) else {
        return SymbolDefinition::new(label, SymbolValue::Text(operands.trim().to_string()), kind, line);
    };
    // Storage without a nominal value gets the defining line as a location proxy.
    let value = op.value().unwrap_or(SymbolValue::Number(line as i64));
    let mut def = SymbolDefinition::new(label, value, kind, line);
    def.data_type = Some(op.data_type());
    def.length = Some(op.element_length());
    def.duplication = op.duplication;
    def
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
