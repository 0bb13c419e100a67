//! Macro definitions, capture and textual expansion.
//!
//! Two definition forms are accepted:
//!
//! ```text
//! SAVEREGS MACRO &AREA,&REG=14          name on the MACRO line
//!          MACRO                        HLASM form: prototype on the next line
//! &LBL     SAVEREGS &AREA,&REG=14
//! ```
//!
//! The body runs to the matching ENDM or MEND. Expansion is informational:
//! substituted body lines are attached to the calling statement and never fed
//! back into the statement stream.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::FileCatalog;
use crate::continuation::{join_lines, LogicalLine};
use crate::lexer::LineParser;
use crate::operand::split_operands;
use crate::statement::Statement;

// ---------------------------------------------------------------------------
//  Definitions
// ---------------------------------------------------------------------------

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroOrigin {
    /// Preloaded from the file catalog before the main pass.
    Library,
    /// Defined in the analyzed source or a member it copies.
    Inline,
}

/// A captured macro definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroDefinition {
    pub name: String,
    /// Formal parameter names, upper-cased, without `&`.
    pub parameters: Vec<String>,
    /// Defaults of keyword formals (`&KEY=default`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub keyword_defaults: BTreeMap<String, String>,
    /// Name-field variable of an HLASM prototype (`&LBL`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_parameter: Option<String>,
    /// Raw body records, for substitution.
    pub body_lines: Vec<String>,
    pub body_statements: Vec<Statement>,
    /// Line of the MACRO statement.
    pub defined_at: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub origin: MacroOrigin,
}

impl MacroDefinition {
    pub fn new(name: &str, defined_at: usize) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            keyword_defaults: BTreeMap::new(),
            label_parameter: None,
            body_lines: Vec::new(),
            body_statements: Vec::new(),
            defined_at,
            source_file: None,
            origin: MacroOrigin::Inline,
        }
    }

    pub fn is_keyword(&self, param: &str) -> bool {
        self.keyword_defaults.contains_key(&param.to_uppercase())
    }

    /// Formals bound by position, in order.
    pub fn positional_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| !self.keyword_defaults.contains_key(*p))
            .map(String::as_str)
    }

    /// Map every formal to its actual value.
    ///
    /// `KEY=value` actuals bind keyword formals by name; everything else binds
    /// positional formals in order. Unbound positionals are blank, unbound
    /// keywords take their default, extra actuals are ignored.
    pub fn bind(&self, label: Option<&str>, actuals: &[String]) -> HashMap<String, String> {
        let mut bindings: HashMap<String, String> = self
            .parameters
            .iter()
            .map(|p| (p.clone(), self.keyword_defaults.get(p).cloned().unwrap_or_default()))
            .collect();

        let mut positional = self.positional_parameters();
        for actual in actuals {
            if let Some((key, value)) = actual.split_once('=') {
                let key = key.trim().trim_start_matches('&').to_uppercase();
                if self.keyword_defaults.contains_key(&key) {
                    bindings.insert(key, value.trim().to_string());
                    continue;
                }
            }
            if let Some(param) = positional.next() {
                bindings.insert(param.to_string(), actual.clone());
            }
        }

        if let Some(lp) = &self.label_parameter {
            bindings.insert(lp.clone(), label.unwrap_or_default().to_string());
        }
        bindings
    }
}

/// Split a prototype operand field into formal names and keyword defaults.
pub fn parse_prototype(text: &str) -> (Vec<String>, BTreeMap<String, String>) {
    let parts = split_operands(text)
        .unwrap_or_else(|_| text.split(',').map(|s| s.trim().to_string()).collect());
    let mut names = Vec::new();
    let mut defaults = BTreeMap::new();
    for part in parts {
        let part = part.trim().trim_start_matches('&');
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((name, default)) => {
                let name = name.trim().to_uppercase();
                defaults.insert(name.clone(), default.trim().to_string());
                names.push(name);
            }
            None => names.push(part.to_uppercase()),
        }
    }
    (names, defaults)
}

/// Split a macro call's operand field into actuals.
pub fn split_actuals(text: &str) -> Vec<String> {
    split_operands(text).unwrap_or_else(|_| {
        text.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

// ---------------------------------------------------------------------------
//  Table
// ---------------------------------------------------------------------------

/// Defined macros by upper-cased name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MacroTable {
    macros: BTreeMap<String, MacroDefinition>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition. Returns false when it was dropped.
    ///
    /// A definition met inside a COPY member does not replace a library
    /// definition of the same name; any other redefinition replaces it.
    pub fn define(&mut self, def: MacroDefinition) -> bool {
        let key = def.name.to_uppercase();
        if let Some(existing) = self.macros.get(&key) {
            if existing.origin == MacroOrigin::Library
                && def.origin == MacroOrigin::Inline
                && def.source_file.is_some()
            {
                debug!(name = %key, file = ?def.source_file, "keeping library macro over copied redefinition");
                return false;
            }
        }
        debug!(name = %key, line = def.defined_at, origin = ?def.origin, "macro defined");
        self.macros.insert(key, def);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.macros.values()
    }

    /// Capture every definition found in the catalog's files as a library macro.
    ///
    /// COPY statements inside those files are not followed. Returns the number
    /// of definitions stored.
    pub fn preload(&mut self, catalog: &dyn FileCatalog, parser: &LineParser) -> usize {
        let mut stored = 0;
        for file in catalog.list() {
            let mut collector: Option<MacroCollector> = None;
            for line in join_lines(&file.lines(), 1) {
                let stmt = line.parse_primary(parser);
                let opcode = stmt.opcode_upper();
                match collector.as_mut() {
                    None => {
                        if opcode.as_deref() == Some("MACRO") {
                            let mut c = MacroCollector::begin(&stmt, MacroOrigin::Library);
                            c.source_file = Some(file.name.clone());
                            collector = Some(c);
                        }
                    }
                    Some(c) => {
                        if let Some(def) = c.feed(&line, stmt) {
                            collector = None;
                            if !def.name.is_empty() && self.define(def) {
                                stored += 1;
                            }
                        }
                    }
                }
            }
        }
        debug!(stored, "library macros preloaded");
        stored
    }
}

// ---------------------------------------------------------------------------
//  Capture
// ---------------------------------------------------------------------------

/// Collects the records of one definition, from MACRO to its ENDM/MEND.
#[derive(Debug, Clone)]
pub struct MacroCollector {
    def: MacroDefinition,
    /// Waiting for the HLASM prototype statement.
    awaiting_prototype: bool,
    /// Open nested MACRO statements inside the body.
    depth: usize,
    /// Raw MACRO record and the column of its opcode, for diagnostics.
    header: String,
    header_column: usize,
    pub source_file: Option<String>,
}

impl MacroCollector {
    /// Start collecting at a MACRO statement.
    ///
    /// The name is the first blank-delimited word of the record when that
    /// word is not MACRO itself; otherwise the next statement is the prototype.
    pub fn begin(header: &Statement, origin: MacroOrigin) -> Self {
        let mut def = MacroDefinition::new("", header.line_number);
        def.origin = origin;
        let awaiting_prototype = match header.label.as_deref() {
            Some(name) if !name.starts_with('&') => {
                def.name = name.to_uppercase();
                let (params, defaults) = parse_prototype(header.operands());
                def.parameters = params;
                def.keyword_defaults = defaults;
                false
            }
            _ => true,
        };
        Self {
            def,
            awaiting_prototype,
            depth: 0,
            header: header.raw_text.clone(),
            header_column: header.opcode_column(),
            source_file: header.source_file.clone(),
        }
    }

    /// Name collected so far, empty before the prototype.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn defined_at(&self) -> usize {
        self.def.defined_at
    }

    /// The MACRO record that opened the definition.
    pub fn header_text(&self) -> &str {
        &self.header
    }

    pub fn header_column(&self) -> usize {
        self.header_column
    }

    /// Feed the next logical line. Returns the finished definition at the
    /// closing ENDM/MEND.
    pub fn feed(&mut self, line: &LogicalLine, stmt: Statement) -> Option<MacroDefinition> {
        if self.awaiting_prototype {
            if stmt.is_comment() || stmt.is_blank() {
                return None;
            }
            if let Some(opcode) = stmt.opcode.as_deref() {
                if !is_macro_end(opcode) {
                    self.awaiting_prototype = false;
                    self.def.name = opcode.to_uppercase();
                    self.def.label_parameter = stmt
                        .label
                        .as_deref()
                        .filter(|l| l.starts_with('&'))
                        .map(|l| l.trim_start_matches('&').to_uppercase());
                    let (params, defaults) = parse_prototype(stmt.operands());
                    self.def.parameters = params;
                    self.def.keyword_defaults = defaults;
                    return None;
                }
            }
        }

        match stmt.opcode.as_deref() {
            Some(op) if op.eq_ignore_ascii_case("MACRO") => self.depth += 1,
            Some(op) if is_macro_end(op) => {
                if self.depth == 0 {
                    return Some(self.finish());
                }
                self.depth -= 1;
            }
            _ => {}
        }
        self.def.body_lines.extend(line.records().map(str::to_string));
        self.def.body_statements.push(stmt);
        None
    }

    fn finish(&mut self) -> MacroDefinition {
        let mut def = std::mem::replace(&mut self.def, MacroDefinition::new("", 0));
        def.source_file = self.source_file.take();
        def
    }
}

/// ENDM or MEND.
pub fn is_macro_end(opcode: &str) -> bool {
    opcode.eq_ignore_ascii_case("ENDM") || opcode.eq_ignore_ascii_case("MEND")
}

// ---------------------------------------------------------------------------
//  Expansion
// ---------------------------------------------------------------------------

/// Produces the expansion text of a macro call.
pub trait MacroExpander: std::fmt::Debug {
    fn expand(&self, def: &MacroDefinition, label: Option<&str>, actuals: &[String]) -> Vec<String>;
}

/// Replaces `&NAME` references in the raw body lines with bound actuals.
///
/// Names are matched whole and case-insensitively, so `&A` never matches the
/// start of `&AB`. A `.` right after a substituted name is a concatenation
/// mark and is dropped. `&&` is a literal ampersand and unknown names stay as
/// written.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualExpander;

impl TextualExpander {
    pub fn substitute(line: &str, bindings: &HashMap<String, String>) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '&' {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            if chars.get(i + 1) == Some(&'&') {
                out.push_str("&&");
                i += 2;
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_variable_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect::<String>().to_uppercase();
            match bindings.get(&name) {
                Some(value) if end > start => {
                    out.push_str(value);
                    i = if chars.get(end) == Some(&'.') { end + 1 } else { end };
                }
                _ => {
                    out.push('&');
                    i += 1;
                }
            }
        }
        out
    }
}

impl MacroExpander for TextualExpander {
    fn expand(&self, def: &MacroDefinition, label: Option<&str>, actuals: &[String]) -> Vec<String> {
        let bindings = def.bind(label, actuals);
        def.body_lines
            .iter()
            .map(|line| Self::substitute(line, &bindings))
            .collect()
    }
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '#' | '$' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    fn collect(source: &str) -> Option<MacroDefinition> {
        let parser = LineParser::new();
        let mut collector: Option<MacroCollector> = None;
        for line in join_lines(&source.lines().collect::<Vec<_>>(), 1) {
            let stmt = line.parse_primary(&parser);
            match collector.as_mut() {
                None => collector = Some(MacroCollector::begin(&stmt, MacroOrigin::Inline)),
                Some(c) => {
                    if let Some(def) = c.feed(&line, stmt) {
                        return Some(def);
                    }
                }
            }
        }
        None
    }

    #[test]
    fn test_named_macro_line() {
        let def = collect("MYMAC    MACRO &A,&B\n         LR    &A,&B\n         ENDM").unwrap();
        assert_eq!(def.name, "MYMAC");
        assert_eq!(def.parameters, vec!["A", "B"]);
        assert_eq!(def.body_lines, vec!["         LR    &A,&B"]);
        assert_eq!(def.body_statements.len(), 1);
        assert_eq!(def.defined_at, 1);
    }

    #[test]
    fn test_long_macro_name() {
        let def = collect("VERYLONGMACRONAME MACRO &X\n         ENDM").unwrap();
        assert_eq!(def.name, "VERYLONGMACRONAME");
    }

    #[test]
    fn test_prototype_form_with_mend() {
        let src = "         MACRO\n&LBL     SAVEIT &AREA,&REG=14\n&LBL     STM   &REG,12,&AREA\n         MEND";
        let def = collect(src).unwrap();
        assert_eq!(def.name, "SAVEIT");
        assert_eq!(def.label_parameter.as_deref(), Some("LBL"));
        assert_eq!(def.parameters, vec!["AREA", "REG"]);
        assert_eq!(def.keyword_defaults.get("REG").map(String::as_str), Some("14"));
        assert_eq!(def.body_lines.len(), 1);
    }

    #[test]
    fn test_nested_definition_kept_in_body() {
        let src = "OUTER    MACRO\nINNER    MACRO\n         BR    14\n         ENDM\n         ENDM";
        let def = collect(src).unwrap();
        assert_eq!(def.name, "OUTER");
        assert_eq!(def.body_lines.len(), 3);
    }

    #[test]
    fn test_collector_keeps_header() {
        let stmt = LineParser::new().parse("MYMAC    MACRO &A", 4, false);
        let collector = MacroCollector::begin(&stmt, MacroOrigin::Inline);
        assert_eq!(collector.header_text(), "MYMAC    MACRO &A");
        assert_eq!(collector.header_column(), 9);
        assert_eq!(collector.defined_at(), 4);
    }

    #[test]
    fn test_unterminated_returns_none() {
        assert!(collect("MYMAC    MACRO &A\n         LR    &A,1").is_none());
    }

    #[test]
    fn test_expand_positional() {
        let def = collect("MYMAC    MACRO &A,&B\n         LR    &A,&B\n         ENDM").unwrap();
        let lines = TextualExpander.expand(&def, None, &["R1".into(), "R2".into()]);
        assert_eq!(lines, vec!["         LR    R1,R2"]);
    }

    #[test]
    fn test_expand_missing_actual_blank() {
        let def = collect("MYMAC    MACRO &A,&B\n         LR    &A,&B\n         ENDM").unwrap();
        let lines = TextualExpander.expand(&def, None, &["R1".into()]);
        assert_eq!(lines, vec!["         LR    R1,"]);
    }

    #[test]
    fn test_expand_word_boundary() {
        let mut def = MacroDefinition::new("M", 1);
        def.parameters = vec!["A".into(), "AB".into()];
        def.body_lines = vec!["         DC    A(&AB,&A)".into()];
        let lines = TextualExpander.expand(&def, None, &["ONE".into(), "TWO".into()]);
        assert_eq!(lines, vec!["         DC    A(TWO,ONE)"]);
    }

    #[test]
    fn test_expand_case_insensitive_and_concatenation() {
        let mut bindings = HashMap::new();
        bindings.insert("NAME".to_string(), "FIELD".to_string());
        assert_eq!(TextualExpander::substitute("&name.X &Name", &bindings), "FIELDX FIELD");
        assert_eq!(TextualExpander::substitute("C'&&' &OTHER", &bindings), "C'&&' &OTHER");
    }

    #[test]
    fn test_expand_keywords() {
        let src = "         MACRO\n&LBL     SAVEIT &AREA,&REG=14\n&LBL     STM   &REG,12,&AREA\n         MEND";
        let def = collect(src).unwrap();
        let lines = TextualExpander.expand(&def, Some("HERE"), &["SAVE".into()]);
        assert_eq!(lines, vec!["HERE     STM   14,12,SAVE"]);
        let lines = TextualExpander.expand(&def, None, &["REG=2".into(), "SAVE".into()]);
        assert_eq!(lines, vec!["     STM   2,12,SAVE"]);
    }

    #[test]
    fn test_library_precedence() {
        let mut table = MacroTable::new();
        let mut lib = MacroDefinition::new("GETMAIN", 1);
        lib.origin = MacroOrigin::Library;
        assert!(table.define(lib));

        let mut copied = MacroDefinition::new("GETMAIN", 5);
        copied.source_file = Some("LIB.MAC".into());
        assert!(!table.define(copied));
        assert_eq!(table.lookup("getmain").unwrap().origin, MacroOrigin::Library);

        assert!(table.define(MacroDefinition::new("GETMAIN", 9)));
        assert_eq!(table.lookup("GETMAIN").unwrap().defined_at, 9);
    }

    #[test]
    fn test_preload_from_catalog() {
        let cat = MemoryCatalog::new()
            .with_file("LIB.MAC", "LIBMAC   MACRO &X\n         LA    &X,0\n         ENDM")
            .with_file("OTHER.ASM", "         BR    14");
        let mut table = MacroTable::new();
        assert_eq!(table.preload(&cat, &LineParser::new()), 1);
        let def = table.lookup("LIBMAC").unwrap();
        assert_eq!(def.origin, MacroOrigin::Library);
        assert_eq!(def.source_file.as_deref(), Some("LIB.MAC"));
    }

    #[test]
    fn test_serialize_definition() {
        let def = collect("MYMAC    MACRO &A\n         LR    &A,1\n         ENDM").unwrap();
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["name"], "MYMAC");
        assert_eq!(json["definedAt"], 1);
        assert_eq!(json["origin"], "inline");
        assert_eq!(json["bodyLines"][0], "         LR    &A,1");
    }
}
