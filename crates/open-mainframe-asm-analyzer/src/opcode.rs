//! Opcode catalog: mnemonic to format, arity and description.
//!
//! The table is built once on first use and never mutated afterwards. It
//! covers the S/390 and z/Architecture machine instructions seen in
//! application code, the extended branch mnemonics, assembler directives, and
//! the system macros commonly issued from user programs (format `S`).
//!
//! `MACRO`, `ENDM`/`MEND` and `COPY` are intentionally absent: the driver
//! handles them before any catalog lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::operand::OperandKind;

// ---------------------------------------------------------------------------
//  Formats
// ---------------------------------------------------------------------------

/// Instruction format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpFormat {
    /// 2-byte, register-register.
    RR,
    /// 4-byte, extended register-register.
    RRE,
    /// 4-byte, register-indexed storage.
    RX,
    /// 6-byte, register-indexed storage, long displacement.
    RXY,
    /// 4-byte, register-storage.
    RS,
    /// 6-byte, register-storage, long displacement.
    RSY,
    /// 4-byte, register-immediate.
    RI,
    /// 6-byte, register-immediate long.
    RIL,
    /// 4-byte, storage-immediate.
    SI,
    /// 6-byte, storage-storage.
    SS,
    /// Assembler directive or system macro statement.
    S,
}

impl fmt::Display for OpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RR => "RR",
            Self::RRE => "RRE",
            Self::RX => "RX",
            Self::RXY => "RXY",
            Self::RS => "RS",
            Self::RSY => "RSY",
            Self::RI => "RI",
            Self::RIL => "RIL",
            Self::SI => "SI",
            Self::SS => "SS",
            Self::S => "S",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
//  Catalog entries
// ---------------------------------------------------------------------------

/// Static description of one mnemonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub format: OpFormat,
    /// Expected number of operands.
    pub operand_count: usize,
    /// Trailing operands that may be omitted past `operand_count`.
    pub optional_operands: usize,
    /// Expected operand classes, in order.
    pub operand_types: &'static [OperandKind],
    pub description: &'static str,
}

impl OpcodeInfo {
    /// True for statements whose whole operand field is one keyword list
    /// (`DCB DDNAME=X,MACRF=PM`, `WTO 'TEXT'`).
    pub fn takes_parameter_list(&self) -> bool {
        self.operand_types == [OperandKind::String]
    }

    /// True for machine instructions, false for directives and macros.
    pub fn is_machine_instruction(&self) -> bool {
        self.format != OpFormat::S
    }
}

const REG: OperandKind = OperandKind::Register;
const IMM: OperandKind = OperandKind::Immediate;
const BD: OperandKind = OperandKind::BaseDisplacement;
const MEM: OperandKind = OperandKind::Memory;
const STR: OperandKind = OperandKind::String;

/// Mnemonic lookup table.
#[derive(Debug)]
pub struct OpcodeCatalog {
    entries: HashMap<&'static str, OpcodeInfo>,
}

static GLOBAL: LazyLock<OpcodeCatalog> = LazyLock::new(OpcodeCatalog::new);

impl OpcodeCatalog {
    /// Build the full catalog.
    pub fn new() -> Self {
        let mut cat = Self {
            entries: HashMap::new(),
        };
        cat.register_arithmetic();
        cat.register_load_store();
        cat.register_compare();
        cat.register_branch();
        cat.register_logical();
        cat.register_move_and_character();
        cat.register_shift();
        cat.register_decimal();
        cat.register_sixty_four_bit();
        cat.register_directives();
        cat.register_system_macros();
        cat
    }

    /// The shared, process-wide catalog.
    pub fn global() -> &'static OpcodeCatalog {
        &GLOBAL
    }

    fn add(
        &mut self,
        mnemonic: &'static str,
        format: OpFormat,
        operand_types: &'static [OperandKind],
        description: &'static str,
    ) {
        self.entries.insert(
            mnemonic,
            OpcodeInfo {
                mnemonic,
                format,
                operand_count: operand_types.len(),
                optional_operands: 0,
                operand_types,
                description,
            },
        );
    }

    /// Allow `extra` operands after the expected ones.
    fn optional(&mut self, mnemonic: &'static str, extra: usize) {
        if let Some(info) = self.entries.get_mut(mnemonic) {
            info.optional_operands = extra;
        }
    }

    /// Look up a mnemonic, case-insensitively.
    pub fn lookup(&self, mnemonic: &str) -> Option<&OpcodeInfo> {
        if let Some(info) = self.entries.get(mnemonic) {
            return Some(info);
        }
        self.entries.get(mnemonic.to_ascii_uppercase().as_str())
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.lookup(mnemonic).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All mnemonics, sorted.
    pub fn mnemonics(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    // -----------------------------------------------------------------------
    //  Instruction groups
    // -----------------------------------------------------------------------

    fn register_arithmetic(&mut self) {
        use OpFormat::*;
        self.add("AR", RR, &[REG, REG], "Add register");
        self.add("A", RX, &[REG, BD], "Add fullword");
        self.add("AH", RX, &[REG, BD], "Add halfword");
        self.add("AHI", RI, &[REG, IMM], "Add halfword immediate");
        self.add("AFI", RI, &[REG, IMM], "Add fullword immediate");
        self.add("AL", RX, &[REG, BD], "Add logical");
        self.add("ALR", RR, &[REG, REG], "Add logical register");
        self.add("ALC", RX, &[REG, BD], "Add logical with carry");
        self.add("ALCR", RR, &[REG, REG], "Add logical with carry register");
        self.add("SR", RR, &[REG, REG], "Subtract register");
        self.add("S", RX, &[REG, BD], "Subtract fullword");
        self.add("SH", RX, &[REG, BD], "Subtract halfword");
        self.add("SL", RX, &[REG, BD], "Subtract logical");
        self.add("SLR", RR, &[REG, REG], "Subtract logical register");
        self.add("SLB", RX, &[REG, BD], "Subtract logical with borrow");
        self.add("MR", RR, &[REG, REG], "Multiply register");
        self.add("M", RX, &[REG, BD], "Multiply fullword");
        self.add("MH", RX, &[REG, BD], "Multiply halfword");
        self.add("MHI", RI, &[REG, IMM], "Multiply halfword immediate");
        self.add("ML", RX, &[REG, BD], "Multiply logical");
        self.add("MLR", RR, &[REG, REG], "Multiply logical register");
        self.add("DR", RR, &[REG, REG], "Divide register");
        self.add("D", RX, &[REG, BD], "Divide fullword");
        self.add("DL", RX, &[REG, BD], "Divide logical");
        self.add("DLR", RR, &[REG, REG], "Divide logical register");
        self.add("LPR", RR, &[REG, REG], "Load positive register");
        self.add("LNR", RR, &[REG, REG], "Load negative register");
        self.add("LCR", RR, &[REG, REG], "Load complement register");
        self.add("LTR", RR, &[REG, REG], "Load and test register");
        self.add("CVB", RX, &[REG, BD], "Convert to binary");
        self.add("CVD", RX, &[REG, BD], "Convert to decimal");
        self.add("CKSM", RRE, &[REG, REG], "Checksum");
    }

    fn register_load_store(&mut self) {
        use OpFormat::*;
        self.add("LR", RR, &[REG, REG], "Load register");
        self.add("L", RX, &[REG, BD], "Load fullword");
        self.add("LA", RX, &[REG, BD], "Load address");
        self.add("LAE", RX, &[REG, BD], "Load address extended");
        self.add("LARL", RIL, &[REG, IMM], "Load address relative long");
        self.add("LH", RX, &[REG, BD], "Load halfword");
        self.add("LHI", RI, &[REG, IMM], "Load halfword immediate");
        self.add("LLH", RX, &[REG, BD], "Load logical halfword");
        self.add("LL", RX, &[REG, BD], "Load logical");
        self.add("LLC", RXY, &[REG, BD], "Load logical character");
        self.add("LRV", RXY, &[REG, BD], "Load reversed");
        self.add("LM", RS, &[REG, REG, BD], "Load multiple");
        self.add("ST", RX, &[REG, BD], "Store fullword");
        self.add("STH", RX, &[REG, BD], "Store halfword");
        self.add("STC", RX, &[REG, BD], "Store character");
        self.add("STRV", RXY, &[REG, BD], "Store reversed");
        self.add("STM", RS, &[REG, REG, BD], "Store multiple");
        self.add("IC", RX, &[REG, BD], "Insert character");
        self.add("ICM", RS, &[REG, IMM, BD], "Insert characters under mask");
        self.add("STCM", RS, &[REG, IMM, BD], "Store characters under mask");
        self.add("STCK", S, &[BD], "Store clock");
        self.add("STCKE", S, &[BD], "Store clock extended");
    }

    fn register_compare(&mut self) {
        use OpFormat::*;
        self.add("CR", RR, &[REG, REG], "Compare register");
        self.add("C", RX, &[REG, BD], "Compare fullword");
        self.add("CH", RX, &[REG, BD], "Compare halfword");
        self.add("CHI", RI, &[REG, IMM], "Compare halfword immediate");
        self.add("CLR", RR, &[REG, REG], "Compare logical register");
        self.add("CL", RX, &[REG, BD], "Compare logical");
        self.add("CLI", SI, &[BD, IMM], "Compare logical immediate");
        self.add("CLC", SS, &[BD, BD], "Compare logical characters");
        self.add("CLCL", RRE, &[REG, REG], "Compare logical long");
        self.add("CLM", RS, &[REG, IMM, BD], "Compare logical under mask");
        self.add("CS", RS, &[REG, REG, BD], "Compare and swap");
        self.add("CDS", RS, &[REG, REG, BD], "Compare double and swap");
        self.add("TM", SI, &[BD, IMM], "Test under mask");
    }

    fn register_branch(&mut self) {
        use OpFormat::*;
        self.add("B", RX, &[BD], "Branch unconditional");
        self.add("BR", RR, &[REG], "Branch register");
        self.add("BC", RX, &[IMM, BD], "Branch on condition");
        self.add("BCR", RR, &[IMM, REG], "Branch on condition register");
        self.add("BAL", RX, &[REG, BD], "Branch and link");
        self.add("BALR", RR, &[REG, REG], "Branch and link register");
        self.add("BAS", RX, &[REG, BD], "Branch and save");
        self.add("BASR", RR, &[REG, REG], "Branch and save register");
        self.add("BASSM", RR, &[REG, REG], "Branch and save and set mode");
        self.add("BSM", RR, &[REG, REG], "Branch and set mode");
        self.add("BCT", RX, &[REG, BD], "Branch on count");
        self.add("BCTR", RR, &[REG, REG], "Branch on count register");
        self.add("BXH", RS, &[REG, REG, BD], "Branch on index high");
        self.add("BXLE", RS, &[REG, REG, BD], "Branch on index low or equal");
        self.add("BRAS", RIL, &[REG, IMM], "Branch relative and save");
        self.add("BRASL", RIL, &[REG, IMM], "Branch relative and save long");
        self.add("BRC", RIL, &[IMM, IMM], "Branch relative on condition");
        self.add("BRCL", RIL, &[IMM, IMM], "Branch relative on condition long");
        self.add("BRCT", RIL, &[REG, IMM], "Branch relative on count");
        self.add("BRXH", RSY, &[REG, REG, IMM], "Branch relative on index high");
        self.add("BRXLE", RSY, &[REG, REG, IMM], "Branch relative on index low or equal");
        self.add("EX", RX, &[REG, BD], "Execute");
        self.add("SVC", SI, &[IMM], "Supervisor call");
        self.add("NOP", RX, &[], "No operation");
        self.add("NOPR", RR, &[], "No operation register");

        // Extended mnemonics, storage target.
        self.add("BE", RX, &[BD], "Branch if equal");
        self.add("BNE", RX, &[BD], "Branch if not equal");
        self.add("BH", RX, &[BD], "Branch if high");
        self.add("BL", RX, &[BD], "Branch if low");
        self.add("BZ", RX, &[BD], "Branch if zero");
        self.add("BNZ", RX, &[BD], "Branch if not zero");
        self.add("BP", RX, &[BD], "Branch if plus");
        self.add("BM", RX, &[BD], "Branch if minus");
        self.add("BO", RX, &[BD], "Branch if overflow / ones");
        self.add("BNO", RX, &[BD], "Branch if not ones");
        self.add("BNP", RX, &[BD], "Branch if not plus");
        self.add("BNM", RX, &[BD], "Branch if not minus");
        self.add("BNH", RX, &[BD], "Branch if not high");
        self.add("BNL", RX, &[BD], "Branch if not low");

        // Extended mnemonics, register target.
        self.add("BER", RR, &[REG], "Branch register if equal");
        self.add("BNER", RR, &[REG], "Branch register if not equal");
        self.add("BHR", RR, &[REG], "Branch register if high");
        self.add("BLR", RR, &[REG], "Branch register if low");
        self.add("BZR", RR, &[REG], "Branch register if zero");
        self.add("BNZR", RR, &[REG], "Branch register if not zero");

        // Relative jumps.
        self.add("J", RI, &[IMM], "Jump unconditional");
        self.add("JE", RI, &[IMM], "Jump if equal");
        self.add("JNE", RI, &[IMM], "Jump if not equal");
        self.add("JH", RI, &[IMM], "Jump if high");
        self.add("JL", RI, &[IMM], "Jump if low");
        self.add("JZ", RI, &[IMM], "Jump if zero");
        self.add("JNZ", RI, &[IMM], "Jump if not zero");
        self.add("JP", RI, &[IMM], "Jump if plus");
        self.add("JM", RI, &[IMM], "Jump if minus");
        self.add("JNH", RI, &[IMM], "Jump if not high");
        self.add("JNL", RI, &[IMM], "Jump if not low");
        self.add("JO", RI, &[IMM], "Jump if ones");
        self.add("JNO", RI, &[IMM], "Jump if not ones");
        self.add("JLU", RIL, &[IMM], "Jump long unconditional");
    }

    fn register_logical(&mut self) {
        use OpFormat::*;
        self.add("OR", RR, &[REG, REG], "OR register");
        self.add("O", RX, &[REG, BD], "OR fullword");
        self.add("OI", SI, &[BD, IMM], "OR immediate");
        self.add("OC", SS, &[BD, BD], "OR characters");
        self.add("NR", RR, &[REG, REG], "AND register");
        self.add("N", RX, &[REG, BD], "AND fullword");
        self.add("NI", SI, &[BD, IMM], "AND immediate");
        self.add("NC", SS, &[BD, BD], "AND characters");
        self.add("XR", RR, &[REG, REG], "Exclusive OR register");
        self.add("X", RX, &[REG, BD], "Exclusive OR fullword");
        self.add("XI", SI, &[BD, IMM], "Exclusive OR immediate");
        self.add("XC", SS, &[BD, BD], "Exclusive OR characters");
        self.add("MC", SI, &[BD, IMM], "Monitor call");
    }

    fn register_move_and_character(&mut self) {
        use OpFormat::*;
        self.add("MVI", SI, &[BD, IMM], "Move immediate");
        self.add("MVC", SS, &[BD, BD], "Move characters");
        self.add("MVCL", RRE, &[REG, REG], "Move long");
        self.add("MVN", SS, &[BD, BD], "Move numerics");
        self.add("MVZ", SS, &[BD, BD], "Move zones");
        self.add("MVO", SS, &[BD, BD], "Move with offset");
        self.add("MVST", RRE, &[REG, REG], "Move string");
        self.add("SRST", RRE, &[REG, REG], "Search string");
        self.add("TR", SS, &[BD, BD], "Translate");
        self.add("TRT", SS, &[BD, BD], "Translate and test");
    }

    fn register_shift(&mut self) {
        use OpFormat::*;
        self.add("SLL", RS, &[REG, BD], "Shift left single logical");
        self.add("SRL", RS, &[REG, BD], "Shift right single logical");
        self.add("SLA", RS, &[REG, BD], "Shift left single");
        self.add("SRA", RS, &[REG, BD], "Shift right single");
        self.add("SLDL", RS, &[REG, BD], "Shift left double logical");
        self.add("SRDL", RS, &[REG, BD], "Shift right double logical");
        self.add("SLDA", RS, &[REG, BD], "Shift left double");
        self.add("SRDA", RS, &[REG, BD], "Shift right double");
    }

    fn register_decimal(&mut self) {
        use OpFormat::*;
        self.add("AP", SS, &[BD, BD], "Add decimal");
        self.add("SP", SS, &[BD, BD], "Subtract decimal");
        self.add("MP", SS, &[BD, BD], "Multiply decimal");
        self.add("DP", SS, &[BD, BD], "Divide decimal");
        self.add("CP", SS, &[BD, BD], "Compare decimal");
        self.add("ZAP", SS, &[BD, BD], "Zero and add decimal");
        self.add("TP", SS, &[BD], "Test decimal");
        self.add("SRP", SS, &[BD, BD, IMM], "Shift and round decimal");
        self.add("PACK", SS, &[BD, BD], "Pack");
        self.add("UNPK", SS, &[BD, BD], "Unpack");
        self.add("ED", SS, &[BD, BD], "Edit");
        self.add("EDMK", SS, &[BD, BD], "Edit and mark");
    }

    fn register_sixty_four_bit(&mut self) {
        use OpFormat::*;
        self.add("LG", RXY, &[REG, BD], "Load 64-bit");
        self.add("LGR", RRE, &[REG, REG], "Load 64-bit register");
        self.add("LGF", RXY, &[REG, BD], "Load 64-bit from fullword");
        self.add("LGHI", RI, &[REG, IMM], "Load 64-bit halfword immediate");
        self.add("LTGR", RRE, &[REG, REG], "Load and test 64-bit register");
        self.add("LY", RXY, &[REG, BD], "Load fullword, long displacement");
        self.add("LAY", RXY, &[REG, BD], "Load address, long displacement");
        self.add("LMG", RSY, &[REG, REG, BD], "Load multiple 64-bit");
        self.add("STG", RXY, &[REG, BD], "Store 64-bit");
        self.add("STY", RXY, &[REG, BD], "Store fullword, long displacement");
        self.add("STMG", RSY, &[REG, REG, BD], "Store multiple 64-bit");
        self.add("AGR", RRE, &[REG, REG], "Add 64-bit register");
        self.add("AGHI", RI, &[REG, IMM], "Add 64-bit halfword immediate");
        self.add("SGR", RRE, &[REG, REG], "Subtract 64-bit register");
        self.add("CGR", RRE, &[REG, REG], "Compare 64-bit register");
        self.add("CG", RXY, &[REG, BD], "Compare 64-bit");
    }

    fn register_directives(&mut self) {
        use OpFormat::*;
        self.add("CSECT", S, &[], "Control section");
        self.add("DSECT", S, &[], "Dummy section");
        self.add("START", S, &[IMM], "Start first control section");
        self.add("LOCTR", S, &[], "Location counter");
        self.add("COM", S, &[], "Common section");
        self.add("AMODE", S, &[IMM], "Addressing mode");
        self.add("RMODE", S, &[IMM], "Residency mode");
        self.add("USING", S, &[MEM, REG], "Establish base register");
        self.add("DROP", S, &[REG], "Drop base register");
        self.add("EQU", S, &[IMM], "Equate symbol");
        // Length attribute.
        self.optional("EQU", 1);
        self.add("DC", S, &[IMM], "Define constant");
        self.add("DS", S, &[IMM], "Define storage");
        self.add("CCW", S, &[IMM, MEM, IMM, IMM], "Channel command word");
        self.add("CNOP", S, &[IMM, IMM], "Conditional no operation");
        self.add("ORG", S, &[IMM], "Set location counter");
        self.add("LTORG", S, &[], "Literal pool");
        self.add("ENTRY", S, &[MEM], "Entry point");
        self.add("EXTRN", S, &[MEM], "External reference");
        self.add("WXTRN", S, &[MEM], "Weak external reference");
        self.add("END", S, &[MEM], "End of assembly");
        self.add("TITLE", S, &[STR], "Listing title");
        self.add("SPACE", S, &[], "Listing space");
        self.add("EJECT", S, &[], "Listing eject");
        self.add("PRINT", S, &[STR], "Listing control");
        self.add("PUSH", S, &[STR], "Save assembler state");
        self.add("POP", S, &[STR], "Restore assembler state");

        // Conditional assembly, seen when macro bodies are listed inline.
        self.add("ANOP", S, &[], "Conditional assembly no operation");
        self.add("AIF", S, &[STR], "Conditional branch");
        self.add("AGO", S, &[STR], "Unconditional branch");
        self.add("SETA", S, &[STR], "Set arithmetic variable");
        self.add("SETB", S, &[STR], "Set binary variable");
        self.add("SETC", S, &[STR], "Set character variable");
        self.add("GBLA", S, &[STR], "Global arithmetic variable");
        self.add("GBLB", S, &[STR], "Global binary variable");
        self.add("GBLC", S, &[STR], "Global character variable");
        self.add("LCLA", S, &[STR], "Local arithmetic variable");
        self.add("LCLB", S, &[STR], "Local binary variable");
        self.add("LCLC", S, &[STR], "Local character variable");
        self.add("MNOTE", S, &[STR], "Macro note");
        self.add("MEXIT", S, &[], "Macro exit");
    }

    fn register_system_macros(&mut self) {
        use OpFormat::*;
        self.add("SAVE", S, &[], "Save registers");
        self.add("RETURN", S, &[], "Restore registers and return");
        self.add("YREGS", S, &[], "Register equates");
        self.add("OPEN", S, &[MEM], "Open data set");
        self.add("CLOSE", S, &[MEM], "Close data set");
        self.add("GET", S, &[STR], "Get record");
        self.add("PUT", S, &[MEM, MEM], "Put record");
        self.add("DCB", S, &[STR], "Data control block");
        self.add("ACB", S, &[STR], "Access method control block");
        self.add("RPL", S, &[STR], "Request parameter list");
        self.add("IFGACB", S, &[STR], "ACB mapping");
        self.add("IFGRPL", S, &[STR], "RPL mapping");
        self.add("SNAP", S, &[STR], "Snapshot dump");
        self.add("EXCP", S, &[MEM], "Execute channel program");
        self.add("WAIT", S, &[STR], "Wait for event");
        self.add("WTO", S, &[STR], "Write to operator");
        self.add("WTOR", S, &[STR], "Write to operator with reply");
        self.add("ABEND", S, &[STR], "Abnormal end");
        self.add("CALL", S, &[STR], "Call program");
        self.add("LINK", S, &[STR], "Link to program");
        self.add("GETMAIN", S, &[STR], "Obtain storage");
        self.add("FREEMAIN", S, &[STR], "Release storage");
        self.add("STORAGE", S, &[STR], "Obtain or release storage");
        self.add("RDJFCB", S, &[MEM], "Read job file control block");
        self.add("LSPACE", S, &[STR], "Free space on volume");
        self.add("DEVTYPE", S, &[MEM, MEM], "Device characteristics");
        self.add("CVAFSEQ", S, &[STR], "VTOC sequential access");
        self.add("CVAFDIR", S, &[STR], "VTOC direct access");
        self.add("TRKCALC", S, &[STR], "Track capacity calculation");
    }
}

impl Default for OpcodeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_case_insensitive() {
        let cat = OpcodeCatalog::global();
        let la = cat.lookup("la").unwrap();
        assert_eq!(la.mnemonic, "LA");
        assert_eq!(la.format, OpFormat::RX);
        assert_eq!(la.operand_count, 2);
        assert_eq!(la.operand_types, &[REG, BD]);
    }

    #[test]
    fn test_driver_directives_absent() {
        let cat = OpcodeCatalog::global();
        assert!(!cat.contains("MACRO"));
        assert!(!cat.contains("ENDM"));
        assert!(!cat.contains("MEND"));
        assert!(!cat.contains("COPY"));
    }

    #[test]
    fn test_operand_count_matches_types() {
        let cat = OpcodeCatalog::new();
        for name in cat.mnemonics() {
            let info = cat.lookup(name).unwrap();
            assert_eq!(info.operand_count, info.operand_types.len(), "{name}");
        }
    }

    #[test]
    fn test_format_classes() {
        let cat = OpcodeCatalog::global();
        assert_eq!(cat.lookup("MVC").unwrap().format, OpFormat::SS);
        assert_eq!(cat.lookup("CLI").unwrap().format, OpFormat::SI);
        assert_eq!(cat.lookup("STM").unwrap().operand_count, 3);
        assert!(cat.lookup("AR").unwrap().is_machine_instruction());
        assert!(!cat.lookup("CSECT").unwrap().is_machine_instruction());
    }

    #[test]
    fn test_parameter_list_statements() {
        let cat = OpcodeCatalog::global();
        assert!(cat.lookup("DCB").unwrap().takes_parameter_list());
        assert!(cat.lookup("WTO").unwrap().takes_parameter_list());
        assert!(!cat.lookup("LA").unwrap().takes_parameter_list());
    }

    #[test]
    fn test_equ_length_operand_optional() {
        let cat = OpcodeCatalog::global();
        let equ = cat.lookup("EQU").unwrap();
        assert_eq!(equ.operand_count, 1);
        assert_eq!(equ.optional_operands, 1);
        assert_eq!(cat.lookup("DC").unwrap().optional_operands, 0);
    }

    #[test]
    fn test_unknown_mnemonic() {
        assert!(OpcodeCatalog::global().lookup("NOTANOP").is_none());
    }

    #[test]
    fn test_catalog_size() {
        let cat = OpcodeCatalog::default();
        assert!(cat.len() > 200);
        assert!(!cat.is_empty());
    }

    #[test]
    fn test_format_display() {
        assert_eq!(OpFormat::RIL.to_string(), "RIL");
        assert_eq!(OpFormat::S.to_string(), "S");
    }
}
