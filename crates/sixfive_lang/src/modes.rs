//! Addressing-mode selection.
//!
//! Rule actions hand the matched syntactic shape here; this module picks
//! the concrete addressing mode, validates operand ranges, and advances
//! the program counter by the encoded length.
//!
//! ## Narrowing and deferral
//!
//! For shapes with a width choice the candidate order is relative (branch
//! mnemonics), zero page (operand fits a byte), then absolute. Because a
//! forward reference reads as a placeholder 0 until its defining pass,
//! the choice can change between passes — the pass driver keeps iterating
//! until it stops changing. Range violations are therefore only fatal
//! when `Parser::strict` is set, i.e. during the confirmation pass that
//! runs after a pass with no symbol changes; earlier passes may still
//! shrink preceding instructions and pull the value into range.

use sixfive_base::{AsmError, ErrorKind, Result};

use crate::ast::{AstNode, NodeArg, RuleType};
use crate::opcode::{opcode_info, AddrMode, OpCodeInfo};
use crate::parser::Parser;
use crate::token::Token;

/// The opcode token inside an already-matched `OpCode` capture.
pub fn opcode_token(args: &[NodeArg]) -> &Token {
    args[0]
        .as_node()
        .and_then(|n| n.first_token())
        .expect("OpCode capture always holds the mnemonic token")
}

fn lookup(tok: &Token) -> Result<&'static OpCodeInfo> {
    opcode_info(tok.kind).ok_or_else(|| {
        AsmError::new(
            ErrorKind::UnknownOpcode,
            format!("unknown opcode '{}'", tok.text),
            tok.pos.clone(),
        )
    })
}

fn unsupported(info: &OpCodeInfo, mode: AddrMode, tok: &Token) -> AsmError {
    AsmError::new(
        ErrorKind::UnsupportedAddressingMode,
        format!(
            "opcode '{}' does not support {} addressing",
            info.mnemonic,
            mode.name()
        ),
        tok.pos.clone(),
    )
}

fn range_error(info: &OpCodeInfo, value: i32, tok: &Token) -> AsmError {
    AsmError::new(
        ErrorKind::OperandOutOfRange,
        format!("opcode '{}' operand out of range ({})", info.mnemonic, value),
        tok.pos.clone(),
    )
}

/// Selects a fixed (operand-less) mode: implied or accumulator.
///
/// A mnemonic without the implied entry falls back to accumulator, so
/// bare `asl` means `asl a`.
pub fn select_fixed(
    p: &mut Parser,
    requested: AddrMode,
    args: Vec<NodeArg>,
    count: usize,
) -> Result<AstNode> {
    let tok = opcode_token(&args).clone();
    let info = lookup(&tok)?;

    let mode = if info.supports(requested) {
        requested
    } else if requested == AddrMode::Implied && info.supports(AddrMode::Accumulator) {
        AddrMode::Accumulator
    } else {
        return Err(unsupported(info, requested, &tok));
    };

    let mut node = AstNode::with_children(RuleType::for_addr_mode(mode), tok.pos.clone(), args);
    node.value = info.opcode(mode).unwrap() as i32;
    if count == 0 {
        p.advance_pc(1);
    }
    Ok(node)
}

/// Candidate modes for a width-choosing shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizedModes {
    /// Three-byte encoding (absolute family), if the shape has one.
    pub wide: Option<AddrMode>,
    /// Two-byte encoding (zero page family or immediate), if any.
    pub narrow: Option<AddrMode>,
    /// Two-byte relative encoding for branch mnemonics.
    pub relative: bool,
}

/// Selects the narrowest legal mode for an operand-bearing shape.
///
/// `operand_idx` names the captured expression inside `args`.
pub fn select_sized(
    p: &mut Parser,
    modes: SizedModes,
    args: Vec<NodeArg>,
    operand_idx: usize,
    count: usize,
) -> Result<AstNode> {
    let tok = opcode_token(&args).clone();
    let info = lookup(&tok)?;

    let wide = modes.wide.filter(|m| info.supports(*m));
    let narrow = modes.narrow.filter(|m| info.supports(*m));
    let relative = modes.relative && info.supports(AddrMode::Relative);

    if wide.is_none() && narrow.is_none() && !relative {
        let shape = modes
            .narrow
            .or(modes.wide)
            .unwrap_or(AddrMode::Relative);
        return Err(unsupported(info, shape, &tok));
    }

    let operand = args[operand_idx]
        .as_node()
        .expect("operand capture is a node");
    let value = operand.value;
    let is_large = (value & !0xFF) != 0;

    if p.strict {
        let impossible = (value & !0xFFFF) != 0 || (wide.is_none() && !relative && is_large);
        if impossible {
            return Err(range_error(info, value, &tok));
        }
    }

    let (mode, length) = if relative {
        // Offset from the byte after the two-byte branch. A placeholder 0
        // operand is an unresolved forward reference; its range cannot be
        // judged yet.
        if p.strict && value != 0 {
            let displacement = value - (p.entry_pc + 2);
            if !(-128..=127).contains(&displacement) {
                return Err(range_error(info, value, &tok));
            }
        }
        (AddrMode::Relative, 2)
    } else if !is_large && narrow.is_some() {
        (narrow.unwrap(), 2)
    } else if let Some(mode) = wide {
        (mode, 3)
    } else {
        // Large operand with only a narrow encoding; outside the strict
        // pass the value may still shrink, so keep the narrow mode.
        (narrow.unwrap(), 2)
    };

    let mut node = AstNode::with_children(RuleType::for_addr_mode(mode), tok.pos.clone(), args);
    node.value = info.opcode(mode).unwrap() as i32;
    if count == 0 {
        p.advance_pc(length);
    }
    Ok(node)
}

/// Validates and builds a 65C02 zero-page-relative (bit-branch) node.
///
/// The first operand is a zero-page address, the second a literal signed
/// displacement.
pub fn select_zp_relative(
    p: &mut Parser,
    args: Vec<NodeArg>,
    count: usize,
) -> Result<AstNode> {
    let tok = opcode_token(&args).clone();
    let info = lookup(&tok)?;

    if !info.supports(AddrMode::ZeroPageRelative) {
        return Err(unsupported(info, AddrMode::ZeroPageRelative, &tok));
    }

    let mut operands = args.iter().filter_map(NodeArg::as_node).skip(1);
    let zp = operands.next().expect("zero-page operand").value;
    let displacement = operands.next().expect("displacement operand").value;

    if p.strict {
        if !(0..=0xFF).contains(&zp) {
            return Err(range_error(info, zp, &tok));
        }
        if !(-128..=127).contains(&displacement) {
            return Err(range_error(info, displacement, &tok));
        }
    }

    let mut node =
        AstNode::with_children(RuleType::OpZeroPageRelative, tok.pos.clone(), args);
    node.value = info.opcode(AddrMode::ZeroPageRelative).unwrap() as i32;
    if count == 0 {
        p.advance_pc(3);
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::AsmOptions;
    use sixfive_base::SourcePos;

    fn parser() -> Parser {
        let mut p = Parser::new(AsmOptions::default());
        p.begin_pass(Vec::new(), 1, false);
        p
    }

    fn opcode_arg(mnemonic: &str) -> NodeArg {
        let tokens = Lexer::assembler()
            .tokenize_line(&SourcePos::new("t.s", 1), mnemonic)
            .unwrap();
        let mut node = AstNode::new(RuleType::OpCode, tokens[0].pos.clone());
        node.add_child(NodeArg::Tok(tokens[0].clone()));
        NodeArg::Node(node)
    }

    fn expr_arg(value: i32) -> NodeArg {
        let mut node = AstNode::new(RuleType::Expr, SourcePos::new("t.s", 1));
        node.value = value;
        NodeArg::Node(node)
    }

    #[test]
    fn implied_mode_selects_and_advances_one_byte() {
        let mut p = parser();
        let node = select_fixed(&mut p, AddrMode::Implied, vec![opcode_arg("nop")], 0).unwrap();
        assert_eq!(node.rule, RuleType::OpImplied);
        assert_eq!(node.value, 0xEA);
        assert_eq!(p.pc, p.org + 1);
    }

    #[test]
    fn implied_falls_back_to_accumulator() {
        let mut p = parser();
        let node = select_fixed(&mut p, AddrMode::Implied, vec![opcode_arg("asl")], 0).unwrap();
        assert_eq!(node.rule, RuleType::OpAccumulator);
        assert_eq!(node.value, 0x0A);
    }

    #[test]
    fn fixed_mode_rejects_operand_only_mnemonics() {
        let mut p = parser();
        let err =
            select_fixed(&mut p, AddrMode::Implied, vec![opcode_arg("lda")], 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedAddressingMode);
    }

    #[test]
    fn small_operand_selects_zero_page() {
        let mut p = parser();
        let modes = SizedModes {
            wide: Some(AddrMode::Absolute),
            narrow: Some(AddrMode::ZeroPage),
            relative: true,
        };
        let node =
            select_sized(&mut p, modes, vec![opcode_arg("sta"), expr_arg(0x04)], 1, 0).unwrap();
        assert_eq!(node.rule, RuleType::OpZeroPage);
        assert_eq!(node.value, 0x85);
        assert_eq!(p.pc, p.org + 2);
    }

    #[test]
    fn large_operand_selects_absolute() {
        let mut p = parser();
        let modes = SizedModes {
            wide: Some(AddrMode::Absolute),
            narrow: Some(AddrMode::ZeroPage),
            relative: true,
        };
        let node = select_sized(
            &mut p,
            modes,
            vec![opcode_arg("lda"), expr_arg(0x1234)],
            1,
            0,
        )
        .unwrap();
        assert_eq!(node.rule, RuleType::OpAbsolute);
        assert_eq!(node.value, 0xAD);
        assert_eq!(p.pc, p.org + 3);
    }

    #[test]
    fn branch_mnemonic_selects_relative() {
        let mut p = parser();
        let modes = SizedModes {
            wide: Some(AddrMode::Absolute),
            narrow: Some(AddrMode::ZeroPage),
            relative: true,
        };
        let node = select_sized(
            &mut p,
            modes,
            vec![opcode_arg("bne"), expr_arg(0x1005)],
            1,
            0,
        )
        .unwrap();
        assert_eq!(node.rule, RuleType::OpRelative);
        assert_eq!(node.value, 0xD0);
        assert_eq!(p.pc, p.org + 2);
    }

    #[test]
    fn branch_range_is_checked_only_when_strict() {
        let modes = SizedModes {
            wide: None,
            narrow: None,
            relative: true,
        };

        let mut lax = parser();
        assert!(select_sized(
            &mut lax,
            modes,
            vec![opcode_arg("bne"), expr_arg(0x2000)],
            1,
            0
        )
        .is_ok());

        let mut strict = parser();
        strict.strict = true;
        let err = select_sized(
            &mut strict,
            modes,
            vec![opcode_arg("bne"), expr_arg(0x2000)],
            1,
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperandOutOfRange);
    }

    #[test]
    fn placeholder_zero_branch_target_is_tolerated_in_strict_pass() {
        let mut p = parser();
        p.strict = true;
        let modes = SizedModes {
            wide: None,
            narrow: None,
            relative: true,
        };
        assert!(
            select_sized(&mut p, modes, vec![opcode_arg("bne"), expr_arg(0)], 1, 0).is_ok()
        );
    }

    #[test]
    fn immediate_overflow_is_deferred_to_strict() {
        let modes = SizedModes {
            wide: None,
            narrow: Some(AddrMode::Immediate),
            relative: false,
        };

        let mut lax = parser();
        let node = select_sized(
            &mut lax,
            modes,
            vec![opcode_arg("lda"), expr_arg(0x1FF)],
            1,
            0,
        )
        .unwrap();
        assert_eq!(node.rule, RuleType::OpImmediate);

        let mut strict = parser();
        strict.strict = true;
        let err = select_sized(
            &mut strict,
            modes,
            vec![opcode_arg("lda"), expr_arg(0x1FF)],
            1,
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperandOutOfRange);
    }

    #[test]
    fn retries_do_not_advance_the_pc_again() {
        let mut p = parser();
        select_fixed(&mut p, AddrMode::Implied, vec![opcode_arg("nop")], 0).unwrap();
        let after_first = p.pc;
        select_fixed(&mut p, AddrMode::Implied, vec![opcode_arg("nop")], 1).unwrap();
        assert_eq!(p.pc, after_first);
    }

    #[test]
    fn zp_relative_requires_support_and_ranges() {
        let mut p = parser();
        p.strict = true;
        let node = select_zp_relative(
            &mut p,
            vec![opcode_arg("bbr0"), expr_arg(0x12), expr_arg(4)],
            0,
        )
        .unwrap();
        assert_eq!(node.value, 0x0F);
        assert_eq!(p.pc, p.org + 3);

        let err = select_zp_relative(
            &mut p,
            vec![opcode_arg("bbr0"), expr_arg(0x200), expr_arg(4)],
            1,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperandOutOfRange);

        let err = select_zp_relative(
            &mut p,
            vec![opcode_arg("lda"), expr_arg(0x12), expr_arg(4)],
            1,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedAddressingMode);
    }
}
