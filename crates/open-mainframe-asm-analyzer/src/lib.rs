//! Static analysis front-end for fixed-format mainframe assembler source.
//!
//! This crate provides:
//!
//! - **Line parser**: 80-column record decoding into label, opcode, operand
//!   and remark fields plus a column-exact token stream
//! - **Continuation joiner**: column 72 continuation into logical lines
//! - **COPY resolver**: in-place member splicing with cycle and depth guards
//! - **Macro engine**: MACRO/ENDM capture and positional/keyword substitution
//! - **Opcode catalog**: mnemonic format, arity and description table
//! - **Operand analyzer**: addressing-form classification and arity checks
//! - **Symbol table**: EQU, DC/DS and label definitions
//!
//! The [`Analyzer`] drives all of them over a source text and a
//! [`FileCatalog`], producing an [`AnalysisResult`].
//!
//! ```
//! use open_mainframe_asm_analyzer::{analyze, MemoryCatalog};
//!
//! let result = analyze("LBL1     DS    F\n         LA    R2,4(R1)", &MemoryCatalog::new());
//! assert_eq!(result.statements.len(), 2);
//! assert!(result.context.symbols.contains("LBL1"));
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod continuation;
pub mod copy;
pub mod diagnostic;
pub mod driver;
pub mod error;
pub mod lexer;
pub mod macros;
pub mod opcode;
pub mod operand;
pub mod statement;
pub mod symbol;
pub mod token;

pub use catalog::{FileCatalog, MemoryCatalog, SourceFile};
pub use config::AnalyzerConfig;
pub use context::{ParseContext, Resolved};
pub use continuation::{has_continuation_flag, join_lines, ContinuationMember, LogicalLine};
pub use copy::{CopiedMember, CopyResolver, IncludeChain};
pub use diagnostic::{ParseError, Severity};
pub use driver::{analyze, AnalysisResult, Analyzer};
pub use error::{AnalyzeError, ConfigError, CopyError, OperandError};
pub use lexer::{LineParser, CONTINUATION_COLUMN};
pub use macros::{MacroCollector, MacroDefinition, MacroExpander, MacroOrigin, MacroTable, TextualExpander};
pub use opcode::{OpFormat, OpcodeCatalog, OpcodeInfo};
pub use operand::{check_arity, classify_operand, parse_operands, split_operands, Operand, OperandKind};
pub use statement::{InstructionInfo, Statement};
pub use symbol::{DcOperand, DcType, SymbolDefinition, SymbolKind, SymbolTable, SymbolValue};
pub use token::{Token, TokenKind};
