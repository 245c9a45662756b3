//! Static opcode table: mnemonic → addressing modes → encoding.
//!
//! One [`OpCodeInfo`] per mnemonic maps each supported [`AddrMode`] to its
//! opcode byte and base cycle count, and carries the `is_65c02` /
//! `is_illegal` gates checked against the CPU flags at parse time. The
//! table is exhaustive for the documented 6502 set, the 65C02 extensions,
//! and the common illegal-opcode set.
//!
//! Cycle counts are the base figures; modes that add a cycle on page
//! crossing are not distinguished here.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::token::TokenKind;

/// Addressing modes of the 6502 / 65C02.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
    ZeroPageRelative,
}

impl AddrMode {
    /// Lower-case name used in diagnostics and the opcode dump.
    pub fn name(self) -> &'static str {
        match self {
            AddrMode::Implied => "implied",
            AddrMode::Accumulator => "accumulator",
            AddrMode::Immediate => "immediate",
            AddrMode::ZeroPage => "zero page",
            AddrMode::ZeroPageX => "zero page,x",
            AddrMode::ZeroPageY => "zero page,y",
            AddrMode::Absolute => "absolute",
            AddrMode::AbsoluteX => "absolute,x",
            AddrMode::AbsoluteY => "absolute,y",
            AddrMode::Indirect => "indirect",
            AddrMode::IndirectX => "indirect,x",
            AddrMode::IndirectY => "indirect,y",
            AddrMode::Relative => "relative",
            AddrMode::ZeroPageRelative => "zero page,relative",
        }
    }

    /// Total instruction length in bytes for this mode.
    pub fn length(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 1,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::IndirectX
            | AddrMode::IndirectY
            | AddrMode::Relative => 2,
            AddrMode::Absolute
            | AddrMode::AbsoluteX
            | AddrMode::AbsoluteY
            | AddrMode::Indirect
            | AddrMode::ZeroPageRelative => 3,
        }
    }
}

/// Encoding data for one mnemonic.
#[derive(Debug, Clone)]
pub struct OpCodeInfo {
    pub mnemonic: &'static str,
    /// Addressing mode → (opcode byte, base cycle count).
    pub modes: BTreeMap<AddrMode, (u8, u8)>,
    pub is_65c02: bool,
    pub is_illegal: bool,
    pub description: &'static str,
}

impl OpCodeInfo {
    pub fn opcode(&self, mode: AddrMode) -> Option<u8> {
        self.modes.get(&mode).map(|(byte, _)| *byte)
    }

    pub fn supports(&self, mode: AddrMode) -> bool {
        self.modes.contains_key(&mode)
    }
}

fn entry(
    mnemonic: &'static str,
    modes: &[(AddrMode, u8, u8)],
    is_65c02: bool,
    is_illegal: bool,
    description: &'static str,
) -> OpCodeInfo {
    OpCodeInfo {
        mnemonic,
        modes: modes
            .iter()
            .map(|(mode, byte, cycles)| (*mode, (*byte, *cycles)))
            .collect(),
        is_65c02,
        is_illegal,
        description,
    }
}

/// The shared opcode table, built once.
pub fn opcode_table() -> &'static BTreeMap<TokenKind, OpCodeInfo> {
    static TABLE: OnceLock<BTreeMap<TokenKind, OpCodeInfo>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Looks up the encoding data for a mnemonic token kind.
pub fn opcode_info(kind: TokenKind) -> Option<&'static OpCodeInfo> {
    opcode_table().get(&kind)
}

fn build_table() -> BTreeMap<TokenKind, OpCodeInfo> {
    use AddrMode::*;
    use TokenKind as T;

    let mut table = BTreeMap::new();
    let mut add = |kind: TokenKind, info: OpCodeInfo| {
        table.insert(kind, info);
    };

    add(
        T::Ora,
        entry(
            "ORA",
            &[
                (Immediate, 0x09, 2),
                (ZeroPage, 0x05, 3),
                (ZeroPageX, 0x15, 4),
                (Absolute, 0x0D, 4),
                (AbsoluteX, 0x1D, 4),
                (AbsoluteY, 0x19, 4),
                (IndirectX, 0x01, 6),
                (IndirectY, 0x11, 5),
                (Indirect, 0x12, 5),
            ],
            false,
            false,
            "Logical Inclusive OR with Accumulator",
        ),
    );
    add(
        T::And,
        entry(
            "AND",
            &[
                (Immediate, 0x29, 2),
                (ZeroPage, 0x25, 3),
                (ZeroPageX, 0x35, 4),
                (Absolute, 0x2D, 4),
                (AbsoluteX, 0x3D, 4),
                (AbsoluteY, 0x39, 4),
                (IndirectX, 0x21, 6),
                (IndirectY, 0x31, 5),
                (Indirect, 0x32, 5),
            ],
            false,
            false,
            "Logical AND with Accumulator",
        ),
    );
    add(
        T::Eor,
        entry(
            "EOR",
            &[
                (Immediate, 0x49, 2),
                (ZeroPage, 0x45, 3),
                (ZeroPageX, 0x55, 4),
                (Absolute, 0x4D, 4),
                (AbsoluteX, 0x5D, 4),
                (AbsoluteY, 0x59, 4),
                (IndirectX, 0x41, 6),
                (IndirectY, 0x51, 5),
                (Indirect, 0x52, 5),
            ],
            false,
            false,
            "Exclusive OR with Accumulator",
        ),
    );
    add(
        T::Adc,
        entry(
            "ADC",
            &[
                (Immediate, 0x69, 2),
                (ZeroPage, 0x65, 3),
                (ZeroPageX, 0x75, 4),
                (Absolute, 0x6D, 4),
                (AbsoluteX, 0x7D, 4),
                (AbsoluteY, 0x79, 4),
                (IndirectX, 0x61, 6),
                (IndirectY, 0x71, 5),
                (Indirect, 0x72, 5),
            ],
            false,
            false,
            "Add with Carry",
        ),
    );
    add(
        T::Sbc,
        entry(
            "SBC",
            &[
                (Immediate, 0xE9, 2),
                (ZeroPage, 0xE5, 3),
                (ZeroPageX, 0xF5, 4),
                (Absolute, 0xED, 4),
                (AbsoluteX, 0xFD, 4),
                (AbsoluteY, 0xF9, 4),
                (IndirectX, 0xE1, 6),
                (IndirectY, 0xF1, 5),
                (Indirect, 0xF2, 5),
            ],
            false,
            false,
            "Subtract with Carry",
        ),
    );
    add(
        T::Cmp,
        entry(
            "CMP",
            &[
                (Immediate, 0xC9, 2),
                (ZeroPage, 0xC5, 3),
                (ZeroPageX, 0xD5, 4),
                (Absolute, 0xCD, 4),
                (AbsoluteX, 0xDD, 4),
                (AbsoluteY, 0xD9, 4),
                (IndirectX, 0xC1, 6),
                (IndirectY, 0xD1, 5),
                (Indirect, 0xD2, 6),
            ],
            false,
            false,
            "Compare Accumulator",
        ),
    );
    add(
        T::Cpx,
        entry(
            "CPX",
            &[(Immediate, 0xE0, 2), (ZeroPage, 0xE4, 3), (Absolute, 0xEC, 4)],
            false,
            false,
            "Compare X Register",
        ),
    );
    add(
        T::Cpy,
        entry(
            "CPY",
            &[(Immediate, 0xC0, 2), (ZeroPage, 0xC4, 3), (Absolute, 0xCC, 4)],
            false,
            false,
            "Compare Y Register",
        ),
    );
    add(
        T::Dec,
        entry(
            "DEC",
            &[
                (ZeroPage, 0xC6, 5),
                (ZeroPageX, 0xD6, 6),
                (Absolute, 0xCE, 6),
                (AbsoluteX, 0xDE, 7),
            ],
            false,
            false,
            "Decrement Memory",
        ),
    );
    add(
        T::Dex,
        entry("DEX", &[(Implied, 0xCA, 2)], false, false, "Decrement X Register"),
    );
    add(
        T::Dey,
        entry("DEY", &[(Implied, 0x88, 2)], false, false, "Decrement Y Register"),
    );
    add(
        T::Inc,
        entry(
            "INC",
            &[
                (ZeroPage, 0xE6, 5),
                (ZeroPageX, 0xF6, 6),
                (Absolute, 0xEE, 6),
                (AbsoluteX, 0xFE, 7),
            ],
            false,
            false,
            "Increment Memory",
        ),
    );
    add(
        T::Inx,
        entry("INX", &[(Implied, 0xE8, 2)], false, false, "Increment X Register"),
    );
    add(
        T::Iny,
        entry("INY", &[(Implied, 0xC8, 2)], false, false, "Increment Y Register"),
    );
    add(
        T::Asl,
        entry(
            "ASL",
            &[
                (Accumulator, 0x0A, 2),
                (ZeroPage, 0x06, 5),
                (ZeroPageX, 0x16, 6),
                (Absolute, 0x0E, 6),
                (AbsoluteX, 0x1E, 7),
            ],
            false,
            false,
            "Arithmetic Shift Left",
        ),
    );
    add(
        T::Rol,
        entry(
            "ROL",
            &[
                (Accumulator, 0x2A, 2),
                (ZeroPage, 0x26, 5),
                (ZeroPageX, 0x36, 6),
                (Absolute, 0x2E, 6),
                (AbsoluteX, 0x3E, 7),
            ],
            false,
            false,
            "Rotate Left",
        ),
    );
    add(
        T::Lsr,
        entry(
            "LSR",
            &[
                (Accumulator, 0x4A, 2),
                (ZeroPage, 0x46, 5),
                (ZeroPageX, 0x56, 6),
                (Absolute, 0x4E, 6),
                (AbsoluteX, 0x5E, 7),
            ],
            false,
            false,
            "Logical Shift Right",
        ),
    );
    add(
        T::Ror,
        entry(
            "ROR",
            &[
                (Accumulator, 0x6A, 2),
                (ZeroPage, 0x66, 5),
                (ZeroPageX, 0x76, 6),
                (Absolute, 0x6E, 6),
                (AbsoluteX, 0x7E, 7),
            ],
            false,
            false,
            "Rotate Right",
        ),
    );
    add(
        T::Lda,
        entry(
            "LDA",
            &[
                (Immediate, 0xA9, 2),
                (ZeroPage, 0xA5, 3),
                (ZeroPageX, 0xB5, 4),
                (Absolute, 0xAD, 4),
                (AbsoluteX, 0xBD, 4),
                (AbsoluteY, 0xB9, 4),
                (IndirectX, 0xA1, 6),
                (IndirectY, 0xB1, 5),
                (Indirect, 0xB2, 5),
            ],
            false,
            false,
            "Load Accumulator",
        ),
    );
    add(
        T::Sta,
        entry(
            "STA",
            &[
                (ZeroPage, 0x85, 3),
                (ZeroPageX, 0x95, 4),
                (Absolute, 0x8D, 5),
                (AbsoluteX, 0x9D, 5),
                (AbsoluteY, 0x99, 6),
                (IndirectX, 0x81, 6),
                (IndirectY, 0x91, 6),
                (Indirect, 0x92, 6),
            ],
            false,
            false,
            "Store Accumulator",
        ),
    );
    add(
        T::Ldx,
        entry(
            "LDX",
            &[
                (Immediate, 0xA2, 2),
                (ZeroPage, 0xA6, 3),
                (ZeroPageY, 0xB6, 4),
                (Absolute, 0xAE, 4),
                (AbsoluteY, 0xBE, 4),
            ],
            false,
            false,
            "Load X Register",
        ),
    );
    add(
        T::Stx,
        entry(
            "STX",
            &[(ZeroPage, 0x86, 3), (ZeroPageY, 0x96, 4), (Absolute, 0x8E, 4)],
            false,
            false,
            "Store X Register",
        ),
    );
    add(
        T::Ldy,
        entry(
            "LDY",
            &[
                (Immediate, 0xA0, 2),
                (ZeroPage, 0xA4, 3),
                (ZeroPageX, 0xB4, 4),
                (Absolute, 0xAC, 4),
                (AbsoluteX, 0xBC, 4),
            ],
            false,
            false,
            "Load Y Register",
        ),
    );
    add(
        T::Sty,
        entry(
            "STY",
            &[(ZeroPage, 0x84, 3), (ZeroPageX, 0x94, 4), (Absolute, 0x8C, 4)],
            false,
            false,
            "Store Y Register",
        ),
    );

    // 65C02 bit set/reset
    let rmb: &[(TokenKind, u8)] = &[
        (T::Rmb0, 0x07),
        (T::Rmb1, 0x17),
        (T::Rmb2, 0x27),
        (T::Rmb3, 0x37),
        (T::Rmb4, 0x47),
        (T::Rmb5, 0x57),
        (T::Rmb6, 0x67),
        (T::Rmb7, 0x77),
    ];
    let rmb_names = [
        "RMB0", "RMB1", "RMB2", "RMB3", "RMB4", "RMB5", "RMB6", "RMB7",
    ];
    let rmb_descs = [
        "Reset Memory Bit 0 (65C02 only)",
        "Reset Memory Bit 1 (65C02 only)",
        "Reset Memory Bit 2 (65C02 only)",
        "Reset Memory Bit 3 (65C02 only)",
        "Reset Memory Bit 4 (65C02 only)",
        "Reset Memory Bit 5 (65C02 only)",
        "Reset Memory Bit 6 (65C02 only)",
        "Reset Memory Bit 7 (65C02 only)",
    ];
    for (i, (kind, byte)) in rmb.iter().enumerate() {
        add(
            *kind,
            entry(rmb_names[i], &[(ZeroPage, *byte, 5)], true, false, rmb_descs[i]),
        );
    }

    let smb: &[(TokenKind, u8)] = &[
        (T::Smb0, 0x87),
        (T::Smb1, 0x97),
        (T::Smb2, 0xA7),
        (T::Smb3, 0xB7),
        (T::Smb4, 0xC7),
        (T::Smb5, 0xD7),
        (T::Smb6, 0xE7),
        (T::Smb7, 0xF7),
    ];
    let smb_names = [
        "SMB0", "SMB1", "SMB2", "SMB3", "SMB4", "SMB5", "SMB6", "SMB7",
    ];
    let smb_descs = [
        "Set Memory Bit 0 (65C02 only)",
        "Set Memory Bit 1 (65C02 only)",
        "Set Memory Bit 2 (65C02 only)",
        "Set Memory Bit 3 (65C02 only)",
        "Set Memory Bit 4 (65C02 only)",
        "Set Memory Bit 5 (65C02 only)",
        "Set Memory Bit 6 (65C02 only)",
        "Set Memory Bit 7 (65C02 only)",
    ];
    for (i, (kind, byte)) in smb.iter().enumerate() {
        add(
            *kind,
            entry(smb_names[i], &[(ZeroPage, *byte, 5)], true, false, smb_descs[i]),
        );
    }

    add(
        T::Stz,
        entry(
            "STZ",
            &[
                (ZeroPage, 0x64, 3),
                (ZeroPageX, 0x74, 4),
                (Absolute, 0x9C, 4),
                (AbsoluteX, 0x9E, 5),
            ],
            true,
            false,
            "Store Zero (65C02 only)",
        ),
    );
    add(
        T::Trb,
        entry(
            "TRB",
            &[(ZeroPage, 0x14, 5), (Absolute, 0x1C, 6)],
            true,
            false,
            "Test and Reset Bits (65C02 only)",
        ),
    );
    add(
        T::Tsb,
        entry(
            "TSB",
            &[(ZeroPage, 0x04, 5), (Absolute, 0x0C, 6)],
            true,
            false,
            "Test and Set Bits (65C02 only)",
        ),
    );
    add(
        T::Tax,
        entry("TAX", &[(Implied, 0xAA, 2)], false, false, "Transfer Accumulator to X"),
    );
    add(
        T::Txa,
        entry("TXA", &[(Implied, 0x8A, 2)], false, false, "Transfer X to Accumulator"),
    );
    add(
        T::Tay,
        entry("TAY", &[(Implied, 0xA8, 2)], false, false, "Transfer Accumulator to Y"),
    );
    add(
        T::Tya,
        entry("TYA", &[(Implied, 0x98, 2)], false, false, "Transfer Y to Accumulator"),
    );
    add(
        T::Tsx,
        entry("TSX", &[(Implied, 0xBA, 2)], false, false, "Transfer Stack Pointer to X"),
    );
    add(
        T::Txs,
        entry("TXS", &[(Implied, 0x9A, 2)], false, false, "Transfer X to Stack Pointer"),
    );
    add(
        T::Pla,
        entry("PLA", &[(Implied, 0x68, 4)], false, false, "Pull Accumulator"),
    );
    add(
        T::Pha,
        entry("PHA", &[(Implied, 0x48, 3)], false, false, "Push Accumulator"),
    );
    add(
        T::Plp,
        entry("PLP", &[(Implied, 0x28, 4)], false, false, "Pull Processor Status"),
    );
    add(
        T::Php,
        entry("PHP", &[(Implied, 0x08, 4)], false, false, "Push Processor Status"),
    );
    add(
        T::Phx,
        entry("PHX", &[(Implied, 0xDA, 3)], true, false, "Push X Register (65C02 only)"),
    );
    add(
        T::Phy,
        entry("PHY", &[(Implied, 0x5A, 3)], true, false, "Push Y Register (65C02 only)"),
    );
    add(
        T::Plx,
        entry("PLX", &[(Implied, 0xFA, 4)], true, false, "Pull X Register (65C02 only)"),
    );
    add(
        T::Ply,
        entry("PLY", &[(Implied, 0x7A, 4)], true, false, "Pull Y Register (65C02 only)"),
    );
    add(
        T::Bra,
        entry("BRA", &[(Relative, 0x80, 3)], true, false, "Branch Always (65C02 only)"),
    );
    add(
        T::Bpl,
        entry("BPL", &[(Relative, 0x10, 2)], false, false, "Branch if Positive (N=0)"),
    );
    add(
        T::Bmi,
        entry("BMI", &[(Relative, 0x30, 2)], false, false, "Branch if Minus (N=1)"),
    );
    add(
        T::Bvc,
        entry("BVC", &[(Relative, 0x50, 2)], false, false, "Branch if Overflow Clear (V=0)"),
    );
    add(
        T::Bvs,
        entry("BVS", &[(Relative, 0x70, 2)], false, false, "Branch if Overflow Set (V=1)"),
    );
    add(
        T::Bcc,
        entry("BCC", &[(Relative, 0x90, 2)], false, false, "Branch if Carry Clear (C=0)"),
    );
    add(
        T::Bcs,
        entry("BCS", &[(Relative, 0xB0, 2)], false, false, "Branch if Carry Set (C=1)"),
    );
    add(
        T::Bne,
        entry("BNE", &[(Relative, 0xD0, 2)], false, false, "Branch if Not Equal (Z=0)"),
    );
    add(
        T::Beq,
        entry("BEQ", &[(Relative, 0xF0, 2)], false, false, "Branch if Equal (Z=1)"),
    );

    let bbr: &[(TokenKind, u8)] = &[
        (T::Bbr0, 0x0F),
        (T::Bbr1, 0x1F),
        (T::Bbr2, 0x2F),
        (T::Bbr3, 0x3F),
        (T::Bbr4, 0x4F),
        (T::Bbr5, 0x5F),
        (T::Bbr6, 0x6F),
        (T::Bbr7, 0x7F),
    ];
    let bbr_names = [
        "BBR0", "BBR1", "BBR2", "BBR3", "BBR4", "BBR5", "BBR6", "BBR7",
    ];
    let bbr_descs = [
        "Branch if Bit 0 Reset (65C02 only)",
        "Branch if Bit 1 Reset (65C02 only)",
        "Branch if Bit 2 Reset (65C02 only)",
        "Branch if Bit 3 Reset (65C02 only)",
        "Branch if Bit 4 Reset (65C02 only)",
        "Branch if Bit 5 Reset (65C02 only)",
        "Branch if Bit 6 Reset (65C02 only)",
        "Branch if Bit 7 Reset (65C02 only)",
    ];
    for (i, (kind, byte)) in bbr.iter().enumerate() {
        add(
            *kind,
            entry(
                bbr_names[i],
                &[(ZeroPageRelative, *byte, 5)],
                true,
                false,
                bbr_descs[i],
            ),
        );
    }

    let bbs: &[(TokenKind, u8)] = &[
        (T::Bbs0, 0x8F),
        (T::Bbs1, 0x9F),
        (T::Bbs2, 0xAF),
        (T::Bbs3, 0xBF),
        (T::Bbs4, 0xCF),
        (T::Bbs5, 0xDF),
        (T::Bbs6, 0xEF),
        (T::Bbs7, 0xFF),
    ];
    let bbs_names = [
        "BBS0", "BBS1", "BBS2", "BBS3", "BBS4", "BBS5", "BBS6", "BBS7",
    ];
    let bbs_descs = [
        "Branch if Bit 0 Set (65C02 only)",
        "Branch if Bit 1 Set (65C02 only)",
        "Branch if Bit 2 Set (65C02 only)",
        "Branch if Bit 3 Set (65C02 only)",
        "Branch if Bit 4 Set (65C02 only)",
        "Branch if Bit 5 Set (65C02 only)",
        "Branch if Bit 6 Set (65C02 only)",
        "Branch if Bit 7 Set (65C02 only)",
    ];
    for (i, (kind, byte)) in bbs.iter().enumerate() {
        add(
            *kind,
            entry(
                bbs_names[i],
                &[(ZeroPageRelative, *byte, 5)],
                true,
                false,
                bbs_descs[i],
            ),
        );
    }

    add(
        T::Stp,
        entry("STP", &[(Implied, 0xDB, 3)], true, false, "Stop the Processor (WDC 65C02 only)"),
    );
    add(
        T::Wai,
        entry("WAI", &[(Implied, 0xCB, 3)], true, false, "Wait for Interrupt (65C02 only)"),
    );
    add(
        T::Brk,
        entry("BRK", &[(Implied, 0x00, 7)], false, false, "Break/Interrupt"),
    );
    add(
        T::Rti,
        entry("RTI", &[(Implied, 0x40, 6)], false, false, "Return from Interrupt"),
    );
    add(
        T::Jsr,
        entry("JSR", &[(Absolute, 0x20, 6)], false, false, "Jump to Subroutine"),
    );
    add(
        T::Rts,
        entry("RTS", &[(Implied, 0x60, 6)], false, false, "Return from Subroutine"),
    );
    add(
        T::Jmp,
        entry(
            "JMP",
            &[(Absolute, 0x4C, 3), (Indirect, 0x6C, 5), (IndirectX, 0x7C, 6)],
            false,
            false,
            "Jump",
        ),
    );
    add(
        T::Bit,
        entry(
            "BIT",
            &[
                (ZeroPage, 0x24, 3),
                (Absolute, 0x2C, 4),
                (Immediate, 0x89, 2),
                (ZeroPageX, 0x34, 4),
                (AbsoluteX, 0x3C, 4),
            ],
            false,
            false,
            "Test Bits in Memory with Accumulator",
        ),
    );
    add(
        T::Clc,
        entry("CLC", &[(Implied, 0x18, 2)], false, false, "Clear Carry Flag"),
    );
    add(
        T::Sec,
        entry("SEC", &[(Implied, 0x38, 3)], false, false, "Set Carry Flag"),
    );
    add(
        T::Cld,
        entry("CLD", &[(Implied, 0xD8, 2)], false, false, "Clear Decimal Mode"),
    );
    add(
        T::Sed,
        entry("SED", &[(Implied, 0xF8, 2)], false, false, "Set Decimal Mode"),
    );
    add(
        T::Cli,
        entry("CLI", &[(Implied, 0x58, 2)], false, false, "Clear Interrupt Disable"),
    );
    add(
        T::Sei,
        entry("SEI", &[(Implied, 0x78, 2)], false, false, "Set Interrupt Disable"),
    );
    add(
        T::Clv,
        entry("CLV", &[(Implied, 0xB8, 2)], false, false, "Clear Overflow Flag"),
    );
    add(
        T::Nop,
        entry("NOP", &[(Implied, 0xEA, 2)], false, false, "No Operation"),
    );

    // Illegal set
    add(
        T::Slo,
        entry(
            "SLO",
            &[
                (ZeroPage, 0x07, 5),
                (ZeroPageX, 0x17, 6),
                (Absolute, 0x0F, 6),
                (AbsoluteX, 0x1F, 7),
                (AbsoluteY, 0x1B, 7),
                (IndirectX, 0x03, 8),
                (IndirectY, 0x13, 8),
            ],
            false,
            true,
            "ASL then ORA (Illegal)",
        ),
    );
    add(
        T::Rla,
        entry(
            "RLA",
            &[
                (ZeroPage, 0x27, 5),
                (ZeroPageX, 0x37, 6),
                (Absolute, 0x2F, 6),
                (AbsoluteX, 0x3F, 7),
                (AbsoluteY, 0x3B, 7),
                (IndirectX, 0x23, 8),
                (IndirectY, 0x33, 8),
            ],
            false,
            true,
            "ROL then AND (Illegal)",
        ),
    );
    add(
        T::Sre,
        entry(
            "SRE",
            &[
                (ZeroPage, 0x47, 5),
                (ZeroPageX, 0x57, 6),
                (Absolute, 0x4F, 6),
                (AbsoluteX, 0x5F, 7),
                (AbsoluteY, 0x5B, 7),
                (IndirectX, 0x43, 8),
                (IndirectY, 0x53, 8),
            ],
            false,
            true,
            "LSR then EOR (Illegal)",
        ),
    );
    add(
        T::Rra,
        entry(
            "RRA",
            &[
                (ZeroPage, 0x67, 5),
                (ZeroPageX, 0x77, 6),
                (Absolute, 0x6F, 6),
                (AbsoluteX, 0x7F, 7),
                (AbsoluteY, 0x7B, 7),
                (IndirectX, 0x63, 8),
                (IndirectY, 0x73, 8),
            ],
            false,
            true,
            "ROR then ADC (Illegal)",
        ),
    );
    add(
        T::Sax,
        entry(
            "SAX",
            &[
                (ZeroPage, 0x87, 3),
                (ZeroPageY, 0x97, 4),
                (Absolute, 0x8F, 4),
                (IndirectX, 0x83, 6),
            ],
            false,
            true,
            "STA AND STX (Illegal)",
        ),
    );
    add(
        T::Lax,
        entry(
            "LAX",
            &[
                (ZeroPage, 0xA7, 3),
                (ZeroPageY, 0xB7, 4),
                (Absolute, 0xAF, 4),
                (AbsoluteY, 0xBF, 4),
                (IndirectX, 0xA3, 6),
                (IndirectY, 0xB3, 5),
                (Immediate, 0xAB, 2),
            ],
            false,
            true,
            "LDA then LDX (Illegal)",
        ),
    );
    add(
        T::Dcp,
        entry(
            "DCP",
            &[
                (ZeroPage, 0xC7, 5),
                (ZeroPageX, 0xD7, 6),
                (Absolute, 0xCF, 6),
                (AbsoluteX, 0xDF, 7),
                (AbsoluteY, 0xDB, 7),
                (IndirectX, 0xC3, 8),
                (IndirectY, 0xD3, 8),
            ],
            false,
            true,
            "DEC then CMP (Illegal)",
        ),
    );
    add(
        T::Isc,
        entry(
            "ISC",
            &[
                (ZeroPage, 0xE7, 5),
                (ZeroPageX, 0xF7, 6),
                (Absolute, 0xEF, 6),
                (AbsoluteX, 0xFF, 7),
                (AbsoluteY, 0xFB, 7),
                (IndirectX, 0xE3, 8),
                (IndirectY, 0xF3, 8),
            ],
            false,
            true,
            "INC then SBC (Illegal)",
        ),
    );
    add(
        T::Anc,
        entry("ANC", &[(Immediate, 0x0B, 2)], false, true, "AND then set CARRY (Illegal)"),
    );
    add(
        T::Anc2,
        entry("ANC2", &[(Immediate, 0x2B, 2)], false, true, "AND then set CARRY (Illegal)"),
    );
    add(
        T::Alr,
        entry("ALR", &[(Immediate, 0x4B, 2)], false, true, "AND then LSR (Illegal)"),
    );
    add(
        T::Arr,
        entry("ARR", &[(Immediate, 0x6B, 2)], false, true, "AND then ROR (Illegal)"),
    );
    add(
        T::Xaa,
        entry("XAA", &[(Immediate, 0x8B, 2)], false, true, "TXA then AND (Illegal)"),
    );
    add(
        T::Axs,
        entry("AXS", &[(Immediate, 0xCB, 2)], false, true, "CMP then DEX (Illegal)"),
    );
    add(
        T::Usbc,
        entry("USBC", &[(Immediate, 0xEB, 2)], false, true, "Unstable SBC (Illegal)"),
    );
    add(
        T::Ahx,
        entry(
            "AHX",
            &[(AbsoluteY, 0x9F, 5), (IndirectY, 0x93, 6)],
            false,
            true,
            "STA AND STX AND STY (Illegal)",
        ),
    );
    add(
        T::Shy,
        entry("SHY", &[(AbsoluteX, 0x9C, 5)], false, true, "Store Y AND high byte (Illegal)"),
    );
    add(
        T::Shx,
        entry("SHX", &[(AbsoluteY, 0x9E, 5)], false, true, "Store X AND high byte (Illegal)"),
    );
    add(
        T::Tas,
        entry("TAS", &[(AbsoluteY, 0x9B, 5)], false, true, "Transfer A AND X to SP (Illegal)"),
    );
    add(
        T::Las,
        entry("LAS", &[(AbsoluteY, 0xBB, 4)], false, true, "LDA AND TSX (Illegal)"),
    );

    table
}
