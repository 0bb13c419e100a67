//! Analysis driver.
//!
//! Source text is joined into logical lines and pushed through a two-state
//! machine:
//!
//! - **Normal**: MACRO starts a definition, COPY splices a member into the
//!   queue, anything else is parsed, enriched and emitted.
//! - **InMacroDefinition**: every line goes to the collector until the
//!   matching ENDM/MEND commits the definition.
//!
//! Problems become diagnostics on the result. The only thing that stops a
//! run early is the statement limit.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::FileCatalog;
use crate::config::AnalyzerConfig;
use crate::context::{ParseContext, Resolved};
use crate::continuation::{join_lines, LogicalLine};
use crate::copy::CopyResolver;
use crate::diagnostic::ParseError;
use crate::error::AnalyzeError;
use crate::lexer::LineParser;
use crate::macros::{is_macro_end, split_actuals, MacroCollector, MacroExpander, MacroOrigin, TextualExpander};
use crate::operand::{check_arity, parse_operands};
use crate::statement::{InstructionInfo, Statement};
use crate::symbol::SymbolDefinition;

// ---------------------------------------------------------------------------
//  Result
// ---------------------------------------------------------------------------

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Source order, with continuation members right after their primary.
    pub statements: Vec<Statement>,
    /// Errors, warnings and info diagnostics, in discovery order.
    pub errors: Vec<ParseError>,
    /// Symbol definitions ordered by defining line.
    pub symbols: Vec<SymbolDefinition>,
    pub context: ParseContext,
}

impl AnalysisResult {
    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Primary statement for a line number.
    pub fn statement(&self, line_number: usize) -> Option<&Statement> {
        self.statements
            .iter()
            .find(|s| s.line_number == line_number && !s.is_continuation)
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(ParseError::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_warning()).count()
    }
}

// ---------------------------------------------------------------------------
//  Analyzer
// ---------------------------------------------------------------------------

/// Reusable analyzer. Holds configuration only; every call to
/// [`analyze`](Self::analyze) starts from an empty context.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    parser: LineParser,
    copy: CopyResolver,
    expander: Box<dyn MacroExpander>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            parser: LineParser::new().with_opcode_comment_gap(config.opcode_comment_gap),
            copy: CopyResolver::new(&config),
            expander: Box::new(TextualExpander),
            config,
        }
    }

    /// Use a different macro expander.
    pub fn with_expander(mut self, expander: impl MacroExpander + 'static) -> Self {
        self.expander = Box::new(expander);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze `source`, resolving COPY members and library macros through `catalog`.
    pub fn analyze(&self, source: &str, catalog: &dyn FileCatalog) -> AnalysisResult {
        let records: Vec<&str> = source.lines().collect();
        let mut run = Run {
            analyzer: self,
            catalog,
            ctx: ParseContext::new(),
            statements: Vec::new(),
            errors: Vec::new(),
            queue: join_lines(&records, 1).into(),
            next_line: records.len() + 1,
            references: Vec::new(),
        };

        if self.config.preload_library_macros {
            run.ctx.macros.preload(catalog, &self.parser);
        }
        run.process();
        if self.config.report_undefined_symbols {
            run.report_undefined_symbols();
        }

        debug!(
            statements = run.statements.len(),
            diagnostics = run.errors.len(),
            symbols = run.ctx.symbols.len(),
            macros = run.ctx.macros.len(),
            "analysis complete"
        );

        AnalysisResult {
            symbols: run.ctx.symbols.by_definition().into_iter().cloned().collect(),
            statements: run.statements,
            errors: run.errors,
            context: run.ctx,
        }
    }
}

/// Analyze with the default configuration.
pub fn analyze(source: &str, catalog: &dyn FileCatalog) -> AnalysisResult {
    Analyzer::default().analyze(source, catalog)
}

// ---------------------------------------------------------------------------
//  Run state
// ---------------------------------------------------------------------------

enum State {
    Normal,
    InMacroDefinition(MacroCollector),
}

/// Operand symbol reference kept for the undefined-symbol report.
struct Reference {
    name: String,
    line_number: usize,
    column: usize,
    raw: String,
}

struct Run<'a> {
    analyzer: &'a Analyzer,
    catalog: &'a dyn FileCatalog,
    ctx: ParseContext,
    statements: Vec<Statement>,
    errors: Vec<ParseError>,
    queue: VecDeque<LogicalLine>,
    /// Next synthetic line number for spliced COPY records.
    next_line: usize,
    references: Vec<Reference>,
}

impl Run<'_> {
    fn process(&mut self) {
        let analyzer = self.analyzer;
        let parser = &analyzer.parser;
        let limit = analyzer.config.max_statements;
        let mut state = State::Normal;
        let mut processed = 0usize;

        while let Some(line) = self.queue.pop_front() {
            processed += 1;
            if processed > limit {
                warn!(limit, line = line.line_number, "statement limit exceeded");
                self.report(
                    AnalyzeError::StatementLimit { limit },
                    line.line_number,
                    0,
                    &line.first_record,
                );
                return;
            }

            let stmt = line.parse_primary(parser);

            if let State::InMacroDefinition(collector) = &mut state {
                if let Some(def) = collector.feed(&line, stmt) {
                    state = State::Normal;
                    if def.name.is_empty() {
                        warn!(line = def.defined_at, "macro definition without a prototype ignored");
                    } else {
                        self.ctx.macros.define(def);
                    }
                }
                continue;
            }

            match stmt.opcode_upper().as_deref() {
                Some("MACRO") => {
                    state = State::InMacroDefinition(MacroCollector::begin(&stmt, MacroOrigin::Inline));
                }
                Some("COPY") => self.splice(&line, &stmt),
                Some(op) if is_macro_end(op) => {
                    self.report(
                        AnalyzeError::EndWithoutMacro { opcode: op.to_string() },
                        stmt.line_number,
                        stmt.opcode_column(),
                        &stmt.raw_text,
                    );
                    self.emit(&line, stmt);
                }
                _ => {
                    let stmt = self.enrich(stmt);
                    self.emit(&line, stmt);
                }
            }
        }

        if let State::InMacroDefinition(collector) = state {
            let name = match collector.name() {
                "" => "MACRO".to_string(),
                n => n.to_string(),
            };
            self.report(
                AnalyzeError::UnterminatedMacro { name },
                collector.defined_at(),
                collector.header_column(),
                collector.header_text(),
            );
        }
    }

    /// Push a primary statement followed by its continuation members.
    fn emit(&mut self, line: &LogicalLine, stmt: Statement) {
        self.statements.push(stmt);
        self.statements.extend(line.parse_members(&self.analyzer.parser));
    }

    fn report(&mut self, err: AnalyzeError, line_number: usize, column: usize, raw: &str) {
        self.errors.push(ParseError::from_error(&err, line_number, column, raw));
    }

    /// Replace a COPY statement with the member's lines.
    fn splice(&mut self, line: &LogicalLine, stmt: &Statement) {
        match self
            .analyzer
            .copy
            .resolve(stmt, &line.include_chain, self.next_line, self.catalog)
        {
            Ok(member) => {
                self.next_line += member.record_count;
                for spliced in member.lines.into_iter().rev() {
                    self.queue.push_front(spliced);
                }
            }
            Err(err) => {
                debug!(line = stmt.line_number, error = %err, "COPY not spliced");
                self.report(err.into(), stmt.line_number, stmt.operands_column(), &stmt.raw_text);
            }
        }
    }

    /// Resolve the opcode, classify operands and record symbols.
    fn enrich(&mut self, mut stmt: Statement) -> Statement {
        if let Some(opcode) = stmt.opcode.as_deref() {
            self.ctx.enter_section(opcode, stmt.label.as_deref());
        }
        if let Some(ignored) = self
            .ctx
            .symbols
            .record_statement(&stmt, self.ctx.current_section.as_deref())
        {
            debug!(symbol = %ignored, line = stmt.line_number, "label already defined; first definition kept");
        }

        let Some(opcode) = stmt.opcode.clone() else {
            return stmt;
        };
        let operands_text = stmt.operands().to_string();

        match self.ctx.resolve(&opcode) {
            Resolved::Instruction(info) => {
                stmt.tag_opcode();
                let operands = match parse_operands(&operands_text) {
                    Ok(operands) => {
                        if let Some(err) = check_arity(info, &operands_text, &operands) {
                            self.errors.push(ParseError::from_error(
                                &err,
                                stmt.line_number,
                                stmt.operands_column(),
                                &stmt.raw_text,
                            ));
                        }
                        operands
                    }
                    Err(err) => {
                        self.errors.push(ParseError::from_error(
                            &err.into(),
                            stmt.line_number,
                            stmt.operands_column(),
                            &stmt.raw_text,
                        ));
                        Vec::new()
                    }
                };
                if info.is_machine_instruction() {
                    let column = stmt.operands_column();
                    self.references.extend(operands.iter().filter_map(|op| {
                        op.symbol.as_ref().map(|name| Reference {
                            name: name.clone(),
                            line_number: stmt.line_number,
                            column,
                            raw: stmt.raw_text.clone(),
                        })
                    }));
                }
                stmt.instruction = Some(InstructionInfo::from_catalog(info, operands));
            }
            Resolved::MacroCall(def) => {
                let actuals = split_actuals(&operands_text);
                stmt.macro_expansion = self.analyzer.expander.expand(def, stmt.label.as_deref(), &actuals);
                stmt.macro_name = Some(def.name.clone());
                stmt.is_macro_call = true;
                stmt.tag_opcode();
                let operands = match parse_operands(&operands_text) {
                    Ok(operands) => operands,
                    Err(err) => {
                        self.errors.push(ParseError::from_error(
                            &err.into(),
                            stmt.line_number,
                            stmt.operands_column(),
                            &stmt.raw_text,
                        ));
                        Vec::new()
                    }
                };
                stmt.instruction = Some(InstructionInfo::bare(&opcode, operands));
            }
            Resolved::Unknown => {
                self.errors.push(ParseError::from_error(
                    &AnalyzeError::UndefinedMacro { name: opcode },
                    stmt.line_number,
                    stmt.opcode_column(),
                    &stmt.raw_text,
                ));
            }
        }
        stmt
    }

    /// One info diagnostic per symbol referenced but never defined.
    fn report_undefined_symbols(&mut self) {
        let mut seen = HashSet::new();
        for r in &self.references {
            let key = r.name.to_uppercase();
            if self.ctx.symbols.contains(&key) || !seen.insert(key) {
                continue;
            }
            self.errors.push(ParseError::from_error(
                &AnalyzeError::UndefinedSymbol { name: r.name.clone() },
                r.line_number,
                r.column,
                &r.raw,
            ));
        }
    }
}
