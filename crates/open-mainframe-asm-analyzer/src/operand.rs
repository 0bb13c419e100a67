//! Operand classification and arity checking.
//!
//! The operand field is split on top-level commas (parenthesis- and
//! quote-aware), then each piece is classified in priority order:
//! register, base-displacement, indexed, immediate, literal, quoted string,
//! memory reference.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, OperandError};
use crate::lexer::{is_attribute_quote, is_word_char, parse_hex_suffix, parse_register};
use crate::opcode::{OpFormat, OpcodeInfo};
use crate::symbol::parse_dc_operand;

// ---------------------------------------------------------------------------
//  Operand model
// ---------------------------------------------------------------------------

/// Addressing form of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperandKind {
    /// `R5`, `GR12`.
    Register,
    /// `100`, `-4`, `0FH`, `X'FF'`.
    Immediate,
    /// `D(Rb)` or `SYMBOL(Rb)`.
    BaseDisplacement,
    /// `D(Rb,Rx)`.
    Indexed,
    /// `=F'1'`, `=CL8'NAME'`.
    Literal,
    /// Symbol or expression naming storage.
    Memory,
    /// Quoted text, or a whole parameter list in catalog entries.
    String,
}

/// A classified operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operand {
    pub kind: OperandKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displacement: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_register: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_register: Option<String>,
    /// Symbol named by a memory reference or symbolic displacement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Element length of a literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Decoded immediate value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

impl Operand {
    fn new(kind: OperandKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            register: None,
            displacement: None,
            base_register: None,
            index_register: None,
            symbol: None,
            length: None,
            value: None,
        }
    }
}

// ---------------------------------------------------------------------------
//  Splitting
// ---------------------------------------------------------------------------

/// Split an operand field on top-level commas. Empty pieces are dropped.
pub fn split_operands(text: &str) -> Result<Vec<String>, OperandError> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_quote {
            current.push(c);
            if c == '\'' {
                if chars.get(i + 1) == Some(&'\'') {
                    current.push('\'');
                    i += 2;
                    continue;
                }
                in_quote = false;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' => {
                if !is_attribute_quote(&chars, 0, i) {
                    in_quote = true;
                }
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(OperandError::UnbalancedParens {
                        text: text.to_string(),
                    });
                }
                current.push(c);
            }
            ',' if depth == 0 => {
                push_part(&mut parts, &current);
                current.clear();
            }
            _ => current.push(c),
        }
        i += 1;
    }

    if in_quote {
        return Err(OperandError::UnterminatedQuote {
            text: text.to_string(),
        });
    }
    if depth != 0 {
        return Err(OperandError::UnbalancedParens {
            text: text.to_string(),
        });
    }
    push_part(&mut parts, &current);
    Ok(parts)
}

fn push_part(parts: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        parts.push(piece.to_string());
    }
}

/// Split and classify an operand field.
pub fn parse_operands(text: &str) -> Result<Vec<Operand>, OperandError> {
    Ok(split_operands(text)?
        .iter()
        .map(|p| classify_operand(p))
        .collect())
}

// ---------------------------------------------------------------------------
//  Classification
// ---------------------------------------------------------------------------

/// Classify one operand.
pub fn classify_operand(text: &str) -> Operand {
    let text = text.trim();

    if parse_register(text).is_some() {
        let mut op = Operand::new(OperandKind::Register, text);
        op.register = Some(text.to_ascii_uppercase());
        return op;
    }

    if let Some(op) = classify_addressed(text) {
        return op;
    }

    if let Some(value) = parse_immediate(text) {
        let mut op = Operand::new(OperandKind::Immediate, text);
        op.value = Some(value);
        return op;
    }

    if let Some(body) = text.strip_prefix('=') {
        let mut op = Operand::new(OperandKind::Literal, text);
        op.length = parse_dc_operand(body).map(|dc| dc.element_length());
        return op;
    }

    if text.starts_with('\'') {
        return Operand::new(OperandKind::String, text);
    }

    let mut op = Operand::new(OperandKind::Memory, text);
    op.symbol = referenced_symbol(text);
    op
}

/// Leading symbol of an expression (`TABLE+4`, `L'FIELD`), if any.
fn referenced_symbol(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let attribute = chars.get(1) == Some(&'\'') && is_attribute_quote(&chars, 0, 1);
    let start = if attribute { 2 } else { 0 };
    let end = start + chars[start..].iter().take_while(|&&c| is_word_char(c)).count();
    let name: String = chars[start..end].iter().collect();
    let followed_ok = chars.get(end).map_or(true, |c| matches!(c, '+' | '-' | '*' | '/' | '('));
    let valid = !name.is_empty() && !name.starts_with(|c: char| c.is_ascii_digit() || c == '&' || c == '.');
    (valid && followed_ok).then_some(name)
}

/// `D(Rb)`, `SYM(Rb)`, `D(Rb,Rx)` and `D(,Rb)`.
fn classify_addressed(text: &str) -> Option<Operand> {
    let inner = text.strip_suffix(')')?;
    let open = inner.find('(')?;
    let (disp, regs) = (&inner[..open], &inner[open + 1..]);
    if disp.is_empty() || regs.contains(['(', ')']) {
        return None;
    }

    let (displacement, symbol) = if let Some(n) = parse_decimal_or_hex(disp) {
        (Some(n), None)
    } else if disp.chars().all(is_word_char) && !disp.starts_with(|c: char| c.is_ascii_digit()) {
        (None, Some(disp.to_string()))
    } else {
        return None;
    };

    let reg = |s: &str| {
        let s = s.trim();
        parse_register(s).map(|_| s.to_ascii_uppercase())
    };

    let mut op = match regs.split_once(',') {
        None => {
            let mut op = Operand::new(OperandKind::BaseDisplacement, text);
            op.base_register = Some(reg(regs)?);
            op
        }
        Some((first, second)) if first.trim().is_empty() => {
            let mut op = Operand::new(OperandKind::BaseDisplacement, text);
            op.base_register = Some(reg(second)?);
            op
        }
        Some((first, second)) => {
            let mut op = Operand::new(OperandKind::Indexed, text);
            op.base_register = Some(reg(first)?);
            op.index_register = Some(reg(second)?);
            op
        }
    };
    op.displacement = displacement;
    op.symbol = symbol;
    Some(op)
}

fn parse_decimal_or_hex(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().ok();
    }
    parse_hex_suffix(text)
}

/// Decimal, `nnH`, or a self-defining `X'..'`/`B'..'`/`C'..'` term.
pub(crate) fn parse_immediate(text: &str) -> Option<i64> {
    if let Some(n) = parse_decimal_or_hex(text) {
        return Some(n);
    }
    let mut chars = text.chars();
    let prefix = chars.next()?.to_ascii_uppercase();
    let rest = chars.as_str();
    let body = rest.strip_prefix('\'')?.strip_suffix('\'')?;
    if body.is_empty() {
        return None;
    }
    match prefix {
        'X' if body.len() <= 16 => i64::from_str_radix(body, 16).ok(),
        'B' if body.len() <= 63 => i64::from_str_radix(body, 2).ok(),
        'C' => {
            let body = body.replace("''", "'");
            if body.chars().count() > 4 || !body.is_ascii() {
                return None;
            }
            Some(body.bytes().fold(0i64, |acc, b| (acc << 8) | i64::from(b)))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
//  Arity
// ---------------------------------------------------------------------------

/// Compare the operand count with the catalog entry.
///
/// Returns `None` when the count matches or one of the tolerated forms
/// applies: comma-only operands where none are expected, one operand
/// wrapped entirely in parentheses, and keyword parameter lists.
pub fn check_arity(info: &OpcodeInfo, operands_text: &str, operands: &[Operand]) -> Option<AnalyzeError> {
    let field = operands_text.trim();
    if field.is_empty() {
        return None;
    }
    let expected = info.operand_count;
    let found = operands.len();

    if expected == 0 && field.chars().all(|c| c == ',' || c.is_whitespace()) {
        return None;
    }
    if found == 1 && is_wrapped_in_parens(&operands[0].text) {
        return None;
    }
    if info.takes_parameter_list()
        || (info.format == OpFormat::S && operands.iter().all(|op| is_keyword_operand(&op.text)))
    {
        return None;
    }
    if (expected..=expected + info.optional_operands).contains(&found) {
        return None;
    }
    Some(AnalyzeError::OperandCount {
        mnemonic: info.mnemonic.to_string(),
        expected,
        found,
    })
}

/// `(A,B,C)`: the opening paren closes at the very end.
fn is_wrapped_in_parens(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// `KEY=VALUE` with a symbolic key.
fn is_keyword_operand(text: &str) -> bool {
    match text.split_once('=') {
        Some((key, _)) => {
            !key.is_empty()
                && key.chars().all(is_word_char)
                && !key.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpcodeCatalog;

    fn catalog(mnemonic: &str) -> &'static OpcodeInfo {
        OpcodeCatalog::global().lookup(mnemonic).unwrap()
    }

    #[test]
    fn test_split_top_level_commas() {
        assert_eq!(
            split_operands("R14,R12,12(R13)").unwrap(),
            vec!["R14", "R12", "12(R13)"]
        );
        assert_eq!(split_operands("0(8,R1),FIELD").unwrap(), vec!["0(8,R1)", "FIELD"]);
    }

    #[test]
    fn test_split_quote_aware() {
        assert_eq!(
            split_operands("MSG,=C'A,B',C'IT''S,X'").unwrap(),
            vec!["MSG", "=C'A,B'", "C'IT''S,X'"]
        );
    }

    #[test]
    fn test_split_attribute_reference() {
        assert_eq!(split_operands("R1,L'FIELD,2").unwrap(), vec!["R1", "L'FIELD", "2"]);
    }

    #[test]
    fn test_split_skips_empty() {
        assert_eq!(split_operands("A,,B").unwrap(), vec!["A", "B"]);
        assert!(split_operands(",").unwrap().is_empty());
    }

    #[test]
    fn test_split_errors() {
        assert!(matches!(
            split_operands("A,(B"),
            Err(OperandError::UnbalancedParens { .. })
        ));
        assert!(matches!(
            split_operands("A),B"),
            Err(OperandError::UnbalancedParens { .. })
        ));
        assert!(matches!(
            split_operands("C'ABC"),
            Err(OperandError::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn test_classify_register() {
        let op = classify_operand("r5");
        assert_eq!(op.kind, OperandKind::Register);
        assert_eq!(op.register.as_deref(), Some("R5"));
    }

    #[test]
    fn test_classify_base_displacement() {
        let op = classify_operand("4(R1)");
        assert_eq!(op.kind, OperandKind::BaseDisplacement);
        assert_eq!(op.displacement, Some(4));
        assert_eq!(op.base_register.as_deref(), Some("R1"));
        assert_eq!(op.index_register, None);

        let op = classify_operand("SAVE(R13)");
        assert_eq!(op.kind, OperandKind::BaseDisplacement);
        assert_eq!(op.symbol.as_deref(), Some("SAVE"));
        assert_eq!(op.displacement, None);

        let op = classify_operand("0(,R15)");
        assert_eq!(op.kind, OperandKind::BaseDisplacement);
        assert_eq!(op.base_register.as_deref(), Some("R15"));
    }

    #[test]
    fn test_classify_indexed() {
        let op = classify_operand("8(R2,R3)");
        assert_eq!(op.kind, OperandKind::Indexed);
        assert_eq!(op.displacement, Some(8));
        assert_eq!(op.base_register.as_deref(), Some("R2"));
        assert_eq!(op.index_register.as_deref(), Some("R3"));
    }

    #[test]
    fn test_length_qualified_is_memory() {
        let op = classify_operand("0(8,R1)");
        assert_eq!(op.kind, OperandKind::Memory);
    }

    #[test]
    fn test_classify_immediate() {
        assert_eq!(classify_operand("100").value, Some(100));
        assert_eq!(classify_operand("-4").value, Some(-4));
        assert_eq!(classify_operand("0FH").value, Some(15));
        assert_eq!(classify_operand("X'FF'").value, Some(255));
        assert_eq!(classify_operand("B'1010'").value, Some(10));
        let op = classify_operand("C'A'");
        assert_eq!(op.kind, OperandKind::Immediate);
        assert_eq!(op.value, Some(65));
    }

    #[test]
    fn test_classify_literal() {
        let op = classify_operand("=F'1'");
        assert_eq!(op.kind, OperandKind::Literal);
        assert_eq!(op.length, Some(4));
        assert_eq!(classify_operand("=CL8'NAME'").length, Some(8));
    }

    #[test]
    fn test_classify_string_and_memory() {
        assert_eq!(classify_operand("'HELLO WORLD'").kind, OperandKind::String);
        let op = classify_operand("TABLE+4");
        assert_eq!(op.kind, OperandKind::Memory);
        assert_eq!(op.symbol.as_deref(), Some("TABLE"));
        assert_eq!(classify_operand("*+4").symbol, None);
        assert_eq!(classify_operand("L'FIELD").symbol.as_deref(), Some("FIELD"));
        assert_eq!(classify_operand("C'LONGER'").symbol, None);
        assert_eq!(classify_operand("&PARAM").symbol, None);
    }

    #[test]
    fn test_parse_operands_la() {
        let ops = parse_operands("R2,4(R1)").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].kind, OperandKind::Register);
        assert_eq!(ops[1].kind, OperandKind::BaseDisplacement);
        assert_eq!(ops[1].displacement, Some(4));
        assert_eq!(ops[1].base_register.as_deref(), Some("R1"));
    }

    #[test]
    fn test_operand_serializes_kebab_kind() {
        let json = serde_json::to_value(classify_operand("4(R1)")).unwrap();
        assert_eq!(json["kind"], "base-displacement");
        assert_eq!(json["baseRegister"], "R1");
        assert_eq!(json["displacement"], 4);
        assert!(json.get("indexRegister").is_none());
    }

    #[test]
    fn test_arity_match_and_mismatch() {
        let la = catalog("LA");
        let ops = parse_operands("R1,LABEL").unwrap();
        assert!(check_arity(la, "R1,LABEL", &ops).is_none());

        let ops = parse_operands("R1").unwrap();
        let err = check_arity(la, "R1", &ops).unwrap();
        assert_eq!(
            err,
            AnalyzeError::OperandCount {
                mnemonic: "LA".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_arity_empty_field_not_checked() {
        assert!(check_arity(catalog("LA"), "", &[]).is_none());
    }

    #[test]
    fn test_arity_comma_only() {
        assert!(check_arity(catalog("LTORG"), ",", &[]).is_none());
    }

    #[test]
    fn test_arity_parenthesized_single() {
        let ops = parse_operands("(R1,R2)").unwrap();
        assert!(check_arity(catalog("LA"), "(R1,R2)", &ops).is_none());
    }

    #[test]
    fn test_arity_parameter_list() {
        let text = "DDNAME=SYSUT1,MACRF=GM,DSORG=PS";
        let ops = parse_operands(text).unwrap();
        assert!(check_arity(catalog("DCB"), text, &ops).is_none());
    }

    #[test]
    fn test_arity_equ_length_form() {
        let equ = catalog("EQU");
        let ops = parse_operands("AREA,8").unwrap();
        assert!(check_arity(equ, "AREA,8", &ops).is_none());

        let ops = parse_operands("AREA,8,C").unwrap();
        let err = check_arity(equ, "AREA,8,C", &ops).unwrap();
        assert!(matches!(err, AnalyzeError::OperandCount { expected: 1, found: 3, .. }));
    }

    #[test]
    fn test_wrapped_in_parens() {
        assert!(is_wrapped_in_parens("(A,(B))"));
        assert!(!is_wrapped_in_parens("(A),(B)"));
        assert!(!is_wrapped_in_parens("4(R1)"));
    }
}
