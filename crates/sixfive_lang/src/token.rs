//! Token types for the sixfive lexer and grammar engine.
//!
//! This module defines the vocabulary of the assembly language at the
//! token level. Tokens are the atomic units produced by the lexer and
//! consumed by the grammar engine; end-of-line tokens are preserved so
//! logical lines can always be located by scanning the stream.
//!
//! ## Token Categories
//!
//! | Category | Examples | Description |
//! |----------|----------|-------------|
//! | **Mnemonics** | `LDA`, `BNE`, `RMB3` | One kind per instruction, including the illegal set |
//! | **Registers** | `A`, `X`, `Y` | Operand registers |
//! | **Literals** | `42`, `$FF`, `%1010`, `'c'`, `"text"` | Numeric and string forms |
//! | **Symbols** | `start`, `@loop` | Global and `@`-sigil local names |
//! | **Directives** | `.org`, `.byte`, `.macro` | Dot-prefixed keywords |
//! | **Punctuation** | `# , ( ) = :` and the operators | Expression and mode syntax |
//! | **Structure** | comment, end-of-line | Preserved for line bookkeeping |

use sixfive_base::SourcePos;

/// Lexical category of a token.
///
/// Mnemonic kinds double as the keys of the opcode table, so the grammar's
/// `OpCode` rule lists one production per mnemonic kind and the selected
/// token leads straight to its encoding data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    // 6502 base set
    Ora, And, Eor, Adc, Sbc,
    Cmp, Cpx, Cpy, Dec, Dex,
    Dey, Inc, Inx, Iny, Asl,
    Rol, Lsr, Ror, Lda, Sta,
    Ldx, Stx, Ldy, Sty,
    Tax, Txa, Tay, Tya, Tsx,
    Txs, Pla, Pha, Plp, Php,
    Bpl, Bmi, Bvc, Bvs, Bcc,
    Bcs, Bne, Beq, Brk, Rti,
    Jsr, Rts, Jmp, Bit, Clc,
    Sec, Cld, Sed, Cli, Sei,
    Clv, Nop,

    // 65C02 extensions
    Rmb0, Rmb1, Rmb2, Rmb3, Rmb4, Rmb5, Rmb6, Rmb7,
    Smb0, Smb1, Smb2, Smb3, Smb4, Smb5, Smb6, Smb7,
    Bbr0, Bbr1, Bbr2, Bbr3, Bbr4, Bbr5, Bbr6, Bbr7,
    Bbs0, Bbs1, Bbs2, Bbs3, Bbs4, Bbs5, Bbs6, Bbs7,
    Stz, Phx, Phy, Plx, Ply,
    Bra, Stp, Wai, Trb, Tsb,

    // Illegal (undocumented) opcodes
    Slo, Rla, Sre, Rra, Sax,
    Lax, Dcp, Isc, Anc, Anc2,
    Alr, Arr, Xaa, Axs, Usbc,
    Ahx, Shy, Shx, Tas, Las,

    // Registers
    A, X, Y,

    // Literals
    DecNum, HexNum, BinNum, CharLit, Text,

    // Symbols
    Sym, LocalSym, MacroParam,

    // Directives
    Org, Byte, Word, Macro, EndMacro,
    Include, If, Else, Endif, Var, Do, While,

    // Operators and punctuation
    Plus, Minus, Star, Slash, Percent, Tilde,
    Amp, Pipe, Caret, Shl, Shr,
    Lt, Gt, Le, Ge, EqEq, NotEq, AndAnd, OrOr,
    LParen, RParen, Comma, Pound, Equal, Colon,

    // Structure
    Comment, Ws, Eol,
}

impl TokenKind {
    /// Returns `true` for instruction mnemonics.
    pub fn is_mnemonic(self) -> bool {
        MNEMONICS.iter().any(|(kind, _)| *kind == self)
    }
}

/// One lexed token.
///
/// `start` is set on the first non-whitespace token of each source line;
/// the grammar uses it to tell label definitions from references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: SourcePos,
    /// 1-based column of the token's first character.
    pub col: usize,
    /// True if this is the first non-whitespace token of its line.
    pub start: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: SourcePos, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
            col,
            start: false,
        }
    }
}

/// Every mnemonic kind with its source spelling, in pattern-table order.
///
/// The lexer derives its mnemonic patterns from this table and the
/// grammar derives the `OpCode` rule's productions from it, so the two
/// can never disagree about which spellings are instructions.
pub const MNEMONICS: &[(TokenKind, &str)] = &[
    (TokenKind::Ora, "ORA"),
    (TokenKind::And, "AND"),
    (TokenKind::Eor, "EOR"),
    (TokenKind::Adc, "ADC"),
    (TokenKind::Sbc, "SBC"),
    (TokenKind::Cmp, "CMP"),
    (TokenKind::Cpx, "CPX"),
    (TokenKind::Cpy, "CPY"),
    (TokenKind::Dec, "DEC"),
    (TokenKind::Dex, "DEX"),
    (TokenKind::Dey, "DEY"),
    (TokenKind::Inc, "INC"),
    (TokenKind::Inx, "INX"),
    (TokenKind::Iny, "INY"),
    (TokenKind::Asl, "ASL"),
    (TokenKind::Rol, "ROL"),
    (TokenKind::Lsr, "LSR"),
    (TokenKind::Ror, "ROR"),
    (TokenKind::Lda, "LDA"),
    (TokenKind::Sta, "STA"),
    (TokenKind::Ldx, "LDX"),
    (TokenKind::Stx, "STX"),
    (TokenKind::Ldy, "LDY"),
    (TokenKind::Sty, "STY"),
    (TokenKind::Rmb0, "RMB0"),
    (TokenKind::Rmb1, "RMB1"),
    (TokenKind::Rmb2, "RMB2"),
    (TokenKind::Rmb3, "RMB3"),
    (TokenKind::Rmb4, "RMB4"),
    (TokenKind::Rmb5, "RMB5"),
    (TokenKind::Rmb6, "RMB6"),
    (TokenKind::Rmb7, "RMB7"),
    (TokenKind::Smb0, "SMB0"),
    (TokenKind::Smb1, "SMB1"),
    (TokenKind::Smb2, "SMB2"),
    (TokenKind::Smb3, "SMB3"),
    (TokenKind::Smb4, "SMB4"),
    (TokenKind::Smb5, "SMB5"),
    (TokenKind::Smb6, "SMB6"),
    (TokenKind::Smb7, "SMB7"),
    (TokenKind::Stz, "STZ"),
    (TokenKind::Tax, "TAX"),
    (TokenKind::Txa, "TXA"),
    (TokenKind::Tay, "TAY"),
    (TokenKind::Tya, "TYA"),
    (TokenKind::Tsx, "TSX"),
    (TokenKind::Txs, "TXS"),
    (TokenKind::Pla, "PLA"),
    (TokenKind::Pha, "PHA"),
    (TokenKind::Plp, "PLP"),
    (TokenKind::Php, "PHP"),
    (TokenKind::Phx, "PHX"),
    (TokenKind::Phy, "PHY"),
    (TokenKind::Plx, "PLX"),
    (TokenKind::Ply, "PLY"),
    (TokenKind::Bra, "BRA"),
    (TokenKind::Bpl, "BPL"),
    (TokenKind::Bmi, "BMI"),
    (TokenKind::Bvc, "BVC"),
    (TokenKind::Bvs, "BVS"),
    (TokenKind::Bcc, "BCC"),
    (TokenKind::Bcs, "BCS"),
    (TokenKind::Bne, "BNE"),
    (TokenKind::Beq, "BEQ"),
    (TokenKind::Bbr0, "BBR0"),
    (TokenKind::Bbr1, "BBR1"),
    (TokenKind::Bbr2, "BBR2"),
    (TokenKind::Bbr3, "BBR3"),
    (TokenKind::Bbr4, "BBR4"),
    (TokenKind::Bbr5, "BBR5"),
    (TokenKind::Bbr6, "BBR6"),
    (TokenKind::Bbr7, "BBR7"),
    (TokenKind::Bbs0, "BBS0"),
    (TokenKind::Bbs1, "BBS1"),
    (TokenKind::Bbs2, "BBS2"),
    (TokenKind::Bbs3, "BBS3"),
    (TokenKind::Bbs4, "BBS4"),
    (TokenKind::Bbs5, "BBS5"),
    (TokenKind::Bbs6, "BBS6"),
    (TokenKind::Bbs7, "BBS7"),
    (TokenKind::Stp, "STP"),
    (TokenKind::Wai, "WAI"),
    (TokenKind::Brk, "BRK"),
    (TokenKind::Rti, "RTI"),
    (TokenKind::Jsr, "JSR"),
    (TokenKind::Rts, "RTS"),
    (TokenKind::Jmp, "JMP"),
    (TokenKind::Bit, "BIT"),
    (TokenKind::Trb, "TRB"),
    (TokenKind::Tsb, "TSB"),
    (TokenKind::Clc, "CLC"),
    (TokenKind::Sec, "SEC"),
    (TokenKind::Cld, "CLD"),
    (TokenKind::Sed, "SED"),
    (TokenKind::Cli, "CLI"),
    (TokenKind::Sei, "SEI"),
    (TokenKind::Clv, "CLV"),
    (TokenKind::Nop, "NOP"),
    (TokenKind::Slo, "SLO"),
    (TokenKind::Rla, "RLA"),
    (TokenKind::Sre, "SRE"),
    (TokenKind::Rra, "RRA"),
    (TokenKind::Sax, "SAX"),
    (TokenKind::Lax, "LAX"),
    (TokenKind::Dcp, "DCP"),
    (TokenKind::Isc, "ISC"),
    (TokenKind::Anc2, "ANC2"),
    (TokenKind::Anc, "ANC"),
    (TokenKind::Alr, "ALR"),
    (TokenKind::Arr, "ARR"),
    (TokenKind::Xaa, "XAA"),
    (TokenKind::Axs, "AXS"),
    (TokenKind::Usbc, "USBC"),
    (TokenKind::Ahx, "AHX"),
    (TokenKind::Shy, "SHY"),
    (TokenKind::Shx, "SHX"),
    (TokenKind::Tas, "TAS"),
    (TokenKind::Las, "LAS"),
];

/// The mnemonic kinds alone, in table order.
pub fn mnemonics() -> impl Iterator<Item = TokenKind> {
    MNEMONICS.iter().map(|(kind, _)| *kind)
}

/// Decodes a quoted string or character literal into its bytes.
///
/// Handles the escapes `\n \r \t \\ \' \" \xHH`; an unrecognized escape
/// is kept literally. Input that is not quoted yields no bytes.
pub fn unescape_string(quoted: &str) -> Vec<u8> {
    let bytes = quoted.as_bytes();
    if bytes.len() < 2 {
        return Vec::new();
    }
    let quote = bytes[0];
    if (quote != b'"' && quote != b'\'') || bytes[bytes.len() - 1] != quote {
        return Vec::new();
    }

    let inner = &bytes[1..bytes.len() - 1];
    let mut out = Vec::new();
    let mut i = 0;
    while i < inner.len() {
        let c = inner[i];
        if c == b'\\' && i + 1 < inner.len() {
            i += 1;
            match inner[i] {
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'\\' => out.push(b'\\'),
                b'\'' => out.push(b'\''),
                b'"' => out.push(b'"'),
                b'x' => {
                    if i + 2 < inner.len()
                        && inner[i + 1].is_ascii_hexdigit()
                        && inner[i + 2].is_ascii_hexdigit()
                    {
                        let hex = std::str::from_utf8(&inner[i + 1..i + 3]).unwrap();
                        out.push(u8::from_str_radix(hex, 16).unwrap());
                        i += 2;
                    }
                }
                other => out.push(other),
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}
