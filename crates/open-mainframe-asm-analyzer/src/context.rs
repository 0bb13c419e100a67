//! Per-run analysis context.

use serde::Serialize;

use crate::macros::{MacroDefinition, MacroTable};
use crate::opcode::{OpcodeCatalog, OpcodeInfo};
use crate::symbol::SymbolTable;

/// What an operation name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    /// Catalog instruction, directive or system macro.
    Instruction(&'static OpcodeInfo),
    /// Macro defined in the source or preloaded from the catalog.
    MacroCall(&'a MacroDefinition),
    Unknown,
}

/// Symbols, macros and the current section for one analysis run.
///
/// Built fresh for every run so nothing leaks between analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseContext {
    pub symbols: SymbolTable,
    pub macros: MacroTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_section: Option<String>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an operation name. The catalog wins over a same-named macro.
    pub fn resolve(&self, opcode: &str) -> Resolved<'_> {
        if let Some(info) = OpcodeCatalog::global().lookup(opcode) {
            return Resolved::Instruction(info);
        }
        match self.macros.lookup(opcode) {
            Some(def) => Resolved::MacroCall(def),
            None => Resolved::Unknown,
        }
    }

    /// Track CSECT, DSECT and START. An unnamed section is the private
    /// section and has no name.
    pub fn enter_section(&mut self, opcode: &str, label: Option<&str>) {
        if matches!(opcode.to_ascii_uppercase().as_str(), "CSECT" | "DSECT" | "START") {
            self.current_section = label.filter(|l| !l.is_empty()).map(str::to_uppercase);
        }
    }
}
