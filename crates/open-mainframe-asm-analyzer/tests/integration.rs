//! End-to-end analysis of small assembler programs.

use open_mainframe_asm_analyzer::token::concat_tokens;
use open_mainframe_asm_analyzer::{
    analyze, AnalysisResult, Analyzer, AnalyzerConfig, LineParser, MacroOrigin, MemoryCatalog,
    OperandKind, Severity, SymbolKind, SymbolValue,
};

fn run(source: &str) -> AnalysisResult {
    analyze(source, &MemoryCatalog::new())
}

fn flagged(text: &str) -> String {
    format!("{text:<71}X")
}

// ---------------------------------------------------------------------------
//  Line decoding
// ---------------------------------------------------------------------------

#[test]
fn test_tokens_rebuild_each_record() {
    let sequenced = format!("{:<71} {:>8}", "         B     EXIT", "00001000");
    let lines: [&str; 8] = [
        "MYLAB    L     R5,MYDATA          LOAD VALUE",
        "         STM   R14,R12,12(R13)",
        "SAVE     DS    18F                SAVE AREA",
        "         BR    R14",
        "* FULL LINE COMMENT",
        "         USING *,R12",
        "         LTORG              LITERAL POOL",
        sequenced.as_str(),
    ];
    let parser = LineParser::new();
    for (i, line) in lines.iter().enumerate() {
        let stmt = parser.parse(line, i + 1, false);
        assert_eq!(concat_tokens(&stmt.tokens), *line, "line {}", i + 1);
        let mut col = 0;
        for tok in &stmt.tokens {
            assert_eq!(tok.column_start, col);
            col = tok.column_end;
        }
    }
}

#[test]
fn test_comment_record_has_only_comment() {
    let result = run("* THIS IS A COMMENT");
    let stmt = &result.statements[0];
    assert_eq!(stmt.comment.as_deref(), Some("* THIS IS A COMMENT"));
    assert!(stmt.label.is_none());
    assert!(stmt.opcode.is_none());
    assert!(stmt.operands_text.is_none());
    assert!(result.errors.is_empty());
}

// ---------------------------------------------------------------------------
//  Continuations
// ---------------------------------------------------------------------------

#[test]
fn test_continuation_pair() {
    let line1 = flagged("LBL      MVC   TARGET,");
    let line2 = "               SOURCE";
    let result = run(&format!("{line1}\n{line2}"));

    assert_eq!(result.statements.len(), 2);
    let primary = &result.statements[0];
    let expected = format!("{} {}", line1[..71].trim(), line2.trim());
    assert_eq!(primary.merged_text.as_deref(), Some(expected.as_str()));
    assert_eq!(primary.continuation_lines, vec![1, 2]);
    assert_eq!(primary.operands_text.as_deref(), Some("TARGET, SOURCE"));
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let member = &result.statements[1];
    assert!(member.is_continuation);
    assert_eq!(member.continuation_of, Some(1));
    assert_eq!(member.line_number, 2);
}

#[test]
fn test_every_physical_line_once() {
    let src = [
        "         LA    R1,1".to_string(),
        flagged("         DCB   DDNAME=IN,"),
        flagged("               MACRF=GM,"),
        "               DSORG=PS".to_string(),
        "* DONE".to_string(),
        "         BR    R14".to_string(),
    ]
    .join("\n");
    let result = run(&src);
    let mut lines: Vec<usize> = result.statements.iter().map(|s| s.line_number).collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(result.statement(2).unwrap().continuation_lines, vec![2, 3, 4]);
}

// ---------------------------------------------------------------------------
//  Macros
// ---------------------------------------------------------------------------

#[test]
fn test_macro_positional_substitution() {
    let src = "MYMAC    MACRO &A,&B\n         MVC   &A,&B\n         ENDM\n         MYMAC F1,F2";
    let result = run(src);
    assert_eq!(result.statements.len(), 1);
    let call = &result.statements[0];
    assert!(call.is_macro_call);
    assert_eq!(call.macro_expansion, vec!["         MVC   F1,F2"]);
}

#[test]
fn test_macro_word_boundary() {
    let src = "MYMAC    MACRO &A,&AB\n         MVC   &AB,&A\n         ENDM\n         MYMAC F1,F2";
    let result = run(src);
    assert_eq!(result.statements[0].macro_expansion, vec!["         MVC   F2,F1"]);
}

#[test]
fn test_catalog_wins_over_macro() {
    let src = "LA       MACRO &X\n         BR    &X\n         ENDM\n         LA    R1,4";
    let result = run(src);
    let stmt = &result.statements[0];
    assert!(!stmt.is_macro_call);
    assert_eq!(stmt.instruction.as_ref().unwrap().mnemonic, "LA");
}

#[test]
fn test_hlasm_prototype_with_keywords() {
    let src = [
        "         MACRO",
        "&L       SAVE2 &AREA,&R=14",
        "&L       STM   &R,12,&AREA",
        "         MEND",
        "HERE     SAVE2 SAVEAREA,R=2",
    ]
    .join("\n");
    let result = run(&src);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.statements.len(), 1);
    assert_eq!(result.statements[0].macro_expansion, vec!["HERE       STM   2,12,SAVEAREA"]);
    assert_eq!(result.context.symbols.lookup("HERE").unwrap().kind, SymbolKind::Label);
}

#[test]
fn test_undefined_macro_is_error() {
    let result = run("         NOSUCH A,B");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].severity, Severity::Error);
    assert_eq!(result.errors[0].line_number, 1);
    assert_eq!(result.errors[0].excerpt, "NOSUCH A,B");
}

#[test]
fn test_library_macro_precedence() {
    let lib = "GETIT    MACRO &X\n         L     &X,0\n         ENDM";
    let cat = MemoryCatalog::new().with_file("LIB.MAC", lib);

    let result = analyze("         COPY  LIB\n         GETIT R3", &cat);
    let def = result.context.macros.lookup("GETIT").unwrap();
    assert_eq!(def.origin, MacroOrigin::Library);
    assert_eq!(result.statements.len(), 1);
    assert_eq!(result.statements[0].macro_expansion, vec!["         L     R3,0"]);

    let src = "GETIT    MACRO &X\n         ST    &X,0\n         ENDM\n         GETIT R4";
    let result = analyze(src, &cat);
    let def = result.context.macros.lookup("GETIT").unwrap();
    assert_eq!(def.origin, MacroOrigin::Inline);
    assert_eq!(result.statements[0].macro_expansion, vec!["         ST    R4,0"]);
}

#[test]
fn test_preload_can_be_disabled() {
    let cat = MemoryCatalog::new().with_file("LIB.MAC", "GETIT    MACRO\n         ENDM");
    let config = AnalyzerConfig::default().with_preload_library_macros(false);
    let result = Analyzer::new(config).analyze("         GETIT", &cat);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code.as_deref(), Some("asm::undefined_macro"));
}

// ---------------------------------------------------------------------------
//  COPY
// ---------------------------------------------------------------------------

#[test]
fn test_copy_splices_member() {
    let cat = MemoryCatalog::new().with_file("REGS.MAC", "R1       EQU   1\nR2       EQU   2");
    let result = analyze("         COPY  REGS\n         LR    R1,R2", &cat);

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let numbers: Vec<usize> = result.statements.iter().map(|s| s.line_number).collect();
    assert_eq!(numbers, vec![3, 4, 2]);
    assert_eq!(result.statements[0].source_file.as_deref(), Some("REGS.MAC"));
    assert_eq!(result.statements[1].source_line, Some(2));
    assert!(result.statements[2].source_file.is_none());
    assert_eq!(result.context.symbols.lookup("R2").unwrap().value, SymbolValue::Number(2));
}

#[test]
fn test_copy_not_found_is_warning() {
    let result = run("         COPY  MISSING\n         BR    R14");
    assert_eq!(result.statements.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].severity, Severity::Warning);
    assert_eq!(result.errors[0].line_number, 1);
    assert_eq!(result.errors[0].code.as_deref(), Some("asm::copy_not_found"));
}

#[test]
fn test_copy_cycle_terminates() {
    let cat = MemoryCatalog::new()
        .with_file("A.ASM", "         COPY  B")
        .with_file("B.ASM", "         COPY  A");
    let result = analyze("         COPY  A", &cat);
    assert!(result.statements.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].severity, Severity::Error);
    assert_eq!(result.errors[0].code.as_deref(), Some("asm::copy_circular"));
}

#[test]
fn test_copy_depth_limit() {
    let mut cat = MemoryCatalog::new();
    for i in 1..=12 {
        cat.add_file(format!("L{i}.ASM"), format!("         COPY  L{}", i + 1));
    }
    let result = analyze("         COPY  L1", &cat);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code.as_deref(), Some("asm::copy_depth"));
}

#[test]
fn test_copy_line_numbers_unique() {
    let cat = MemoryCatalog::new().with_file("TWO.ASM", "A1       DS    F\nA2       DS    F");
    let src = "         COPY  TWO\n         BR    R14\n         COPY  TWO";
    let result = analyze(src, &cat);
    let mut numbers: Vec<usize> = result.statements.iter().map(|s| s.line_number).collect();
    let total = numbers.len();
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), total);
    assert_eq!(total, 5);
}

// ---------------------------------------------------------------------------
//  Operands and symbols
// ---------------------------------------------------------------------------

#[test]
fn test_arity_warning_once() {
    let result = run("         LA    R1,LABEL\n         LA    R1");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].severity, Severity::Warning);
    assert_eq!(result.errors[0].line_number, 2);
}

#[test]
fn test_operand_parse_failure_is_warning() {
    let result = run("         LA    R1,4(R2");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].severity, Severity::Warning);
    assert_eq!(result.errors[0].code.as_deref(), Some("asm::operand_parens"));
}

#[test]
fn test_dc_definitions() {
    let result = run("FW       DC    F'100'\nMSG      DC    CL10'HELLO'");
    let fw = result.context.symbols.lookup("FW").unwrap();
    assert_eq!(fw.data_type.as_deref(), Some("F"));
    assert_eq!(fw.length, Some(4));
    assert_eq!(fw.value, SymbolValue::Number(100));

    let msg = result.context.symbols.lookup("MSG").unwrap();
    assert_eq!(msg.data_type.as_deref(), Some("CL10"));
    assert_eq!(msg.length, Some(10));
    assert_eq!(msg.value, SymbolValue::Text("HELLO".into()));
}

#[test]
fn test_end_to_end_program() {
    let result = run("LBL1     DS    F\n         L     R1,LBL1\n         LA    R2,4(R1)");
    assert_eq!(result.statements.len(), 3);

    let lbl1 = result.context.symbols.lookup("LBL1").unwrap();
    assert_eq!(lbl1.kind, SymbolKind::Variable);
    assert_eq!(lbl1.data_type.as_deref(), Some("F"));
    assert_eq!(lbl1.length, Some(4));

    let operand = &result.statements[2].instruction.as_ref().unwrap().operands[1];
    assert_eq!(operand.kind, OperandKind::BaseDisplacement);
    assert_eq!(operand.displacement, Some(4));
    assert_eq!(operand.base_register.as_deref(), Some("R1"));
}

#[test]
fn test_json_contract() {
    let result = run("LBL1     DS    F\n         L     R1,LBL1\n         LA    R2,4(R1)");
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    let operand = &json["statements"][2]["instruction"]["operands"][1];
    assert_eq!(operand["kind"], "base-displacement");
    assert_eq!(operand["displacement"], 4);
    assert_eq!(operand["baseRegister"], "R1");

    assert_eq!(json["symbols"][0]["name"], "LBL1");
    assert_eq!(json["symbols"][0]["kind"], "variable");
    assert_eq!(json["symbols"][0]["dataType"], "F");
    assert_eq!(json["context"]["symbols"]["LBL1"]["length"], 4);
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_from_json() {
    let config = AnalyzerConfig::from_json(r#"{"max_copy_depth": 1}"#).unwrap();
    assert_eq!(config.max_copy_depth, 1);
    assert_eq!(config.max_statements, 100_000);

    let cat = MemoryCatalog::new()
        .with_file("OUTER.ASM", "         COPY  INNER")
        .with_file("INNER.ASM", "X        DS    F");
    let result = Analyzer::new(config).analyze("         COPY  OUTER", &cat);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code.as_deref(), Some("asm::copy_depth"));
    assert!(AnalyzerConfig::from_json(r#"{"max_statements": 0}"#).is_err());
}

#[test]
fn test_equ_length_form_no_warning() {
    let result = run("AREA     DS    CL8\nFLD      EQU   AREA,8");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let fld = result.context.symbols.lookup("FLD").unwrap();
    assert_eq!(fld.kind, SymbolKind::Equ);
    assert_eq!(fld.length, Some(8));
}

#[test]
fn test_unnamed_section_has_no_name() {
    let result = run("MAIN     CSECT\nA        DS    F\n         CSECT\nB        DS    F");
    assert_eq!(result.context.symbols.lookup("A").unwrap().section.as_deref(), Some("MAIN"));
    assert_eq!(result.context.symbols.lookup("B").unwrap().section, None);
}

#[test]
fn test_unterminated_macro_has_excerpt() {
    let result = run("MYMAC    MACRO &A\n         LR    &A,1");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].excerpt, "MYMAC    MACRO &A");
    assert_eq!(result.errors[0].column, 9);
}
