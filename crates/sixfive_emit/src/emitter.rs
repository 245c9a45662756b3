//! AST walk producing object bytes and listing rows.
//!
//! The emitter runs after the resolver: every operand value is final and
//! every instruction node carries its program counter. The walk is a
//! depth-first pre-order traversal of the `Line` nodes; each line
//! contributes its bytes to the image and one or more rows to the
//! listing (rows hold at most three bytes, extra rows carry the same
//! source position with blank text).
//!
//! Branch displacements are recomputed here from the node's recorded PC;
//! on the resolved tree an out-of-range displacement is fatal. Running
//! the emitter twice over the same AST produces identical output.

use sixfive_base::{AsmError, ErrorKind, Result, SourceCache};
use sixfive_lang::ast::{AstNode, NodeArg, RuleType};
use sixfive_lang::opcode::AddrMode;
use sixfive_lang::token::{unescape_string, TokenKind};

use crate::image::ObjectImage;
use crate::listing::ListingRow;

/// Walks the resolved AST, producing the image and the listing rows.
pub fn emit(
    ast: &AstNode,
    origin: u16,
    cache: &SourceCache,
) -> Result<(ObjectImage, Vec<ListingRow>)> {
    let mut image = ObjectImage::new(origin);
    let mut rows = Vec::new();

    if let Some(list) = ast.first_node(RuleType::LineList) {
        for line in list.child_nodes() {
            emit_line(line, cache, &mut image, &mut rows)?;
        }
    }
    Ok((image, rows))
}

/// Bytes and normalized assembly produced by one source line.
#[derive(Default)]
struct LineOutput {
    bytes: Vec<u8>,
    asm: String,
}

fn emit_line(
    line: &AstNode,
    cache: &SourceCache,
    image: &mut ObjectImage,
    rows: &mut Vec<ListingRow>,
) -> Result<()> {
    let mut out = LineOutput::default();
    for child in line.child_nodes() {
        emit_node(child, &mut out)?;
    }

    let source = cache
        .line_text(&line.pos)
        .unwrap_or_default()
        .to_string();

    if out.bytes.is_empty() {
        rows.push(ListingRow {
            pos: line.pos.clone(),
            pc: line.pc,
            bytes: Vec::new(),
            asm: out.asm,
            source,
        });
    } else {
        for (i, chunk) in out.bytes.chunks(3).enumerate() {
            rows.push(ListingRow {
                pos: line.pos.clone(),
                pc: line.pc + (i as i32) * 3,
                bytes: chunk.to_vec(),
                asm: if i == 0 { out.asm.clone() } else { String::new() },
                source: if i == 0 { source.clone() } else { String::new() },
            });
        }
        image.bytes.extend_from_slice(&out.bytes);
    }
    Ok(())
}

fn emit_node(node: &AstNode, out: &mut LineOutput) -> Result<()> {
    if let Some(mode) = node.rule.addr_mode() {
        return emit_instruction(node, mode, out);
    }
    match node.rule {
        RuleType::Statement | RuleType::OpInstruction => {
            for child in node.child_nodes() {
                emit_node(child, out)?;
            }
            Ok(())
        }
        RuleType::ByteDirective => emit_data(node, false, out),
        RuleType::WordDirective => emit_data(node, true, out),
        // Labels, equates, comments, and the structural directives
        // assign no bytes.
        _ => Ok(()),
    }
}

fn emit_instruction(node: &AstNode, mode: AddrMode, out: &mut LineOutput) -> Result<()> {
    let opcode = node.value as u8;
    let mnemonic = node
        .first_node(RuleType::OpCode)
        .and_then(|n| n.first_token())
        .map(|t| t.text.to_ascii_lowercase())
        .unwrap_or_default();

    out.bytes.push(opcode);

    match mode {
        AddrMode::Implied => {
            out.asm = mnemonic;
        }
        AddrMode::Accumulator => {
            out.asm = format!("{} a", mnemonic);
        }
        AddrMode::Immediate => {
            let value = operand_value(node);
            out.bytes.push((value & 0xFF) as u8);
            out.asm = format!("{} #${:02X}", mnemonic, value & 0xFF);
        }
        AddrMode::ZeroPage => {
            let value = operand_value(node);
            out.bytes.push((value & 0xFF) as u8);
            out.asm = format!("{} ${:02X}", mnemonic, value & 0xFF);
        }
        AddrMode::ZeroPageX => {
            let value = operand_value(node);
            out.bytes.push((value & 0xFF) as u8);
            out.asm = format!("{} ${:02X},x", mnemonic, value & 0xFF);
        }
        AddrMode::ZeroPageY => {
            let value = operand_value(node);
            out.bytes.push((value & 0xFF) as u8);
            out.asm = format!("{} ${:02X},y", mnemonic, value & 0xFF);
        }
        AddrMode::IndirectX => {
            let value = operand_value(node);
            out.bytes.push((value & 0xFF) as u8);
            out.asm = format!("{} (${:02X},x)", mnemonic, value & 0xFF);
        }
        AddrMode::IndirectY => {
            let value = operand_value(node);
            out.bytes.push((value & 0xFF) as u8);
            out.asm = format!("{} (${:02X}),y", mnemonic, value & 0xFF);
        }
        AddrMode::Absolute => {
            let value = operand_value(node);
            push_word(out, value);
            out.asm = format!("{} ${:04X}", mnemonic, value & 0xFFFF);
        }
        AddrMode::AbsoluteX => {
            let value = operand_value(node);
            push_word(out, value);
            out.asm = format!("{} ${:04X},x", mnemonic, value & 0xFFFF);
        }
        AddrMode::AbsoluteY => {
            let value = operand_value(node);
            push_word(out, value);
            out.asm = format!("{} ${:04X},y", mnemonic, value & 0xFFFF);
        }
        AddrMode::Indirect => {
            let value = operand_value(node);
            push_word(out, value);
            out.asm = format!("{} (${:04X})", mnemonic, value & 0xFFFF);
        }
        AddrMode::Relative => {
            let target = operand_value(node);
            let displacement = target - (node.pc + 2);
            if !(-128..=127).contains(&displacement) {
                return Err(AsmError::new(
                    ErrorKind::OperandOutOfRange,
                    format!(
                        "branch to ${:04X} out of range ({} bytes)",
                        target & 0xFFFF,
                        displacement
                    ),
                    node.pos.clone(),
                ));
            }
            out.bytes.push(displacement as i8 as u8);
            out.asm = format!("{} ${:04X}", mnemonic, target & 0xFFFF);
        }
        AddrMode::ZeroPageRelative => {
            let mut operands = node.child_nodes().filter(|n| n.rule != RuleType::OpCode);
            let zp = operands.next().map_or(0, |n| n.value);
            let displacement = operands.next().map_or(0, |n| n.value);
            if !(-128..=127).contains(&displacement) {
                return Err(AsmError::new(
                    ErrorKind::OperandOutOfRange,
                    format!("displacement {} out of range", displacement),
                    node.pos.clone(),
                ));
            }
            out.bytes.push((zp & 0xFF) as u8);
            out.bytes.push(displacement as i8 as u8);
            out.asm = format!("{} ${:02X},{}", mnemonic, zp & 0xFF, displacement);
        }
    }
    Ok(())
}

fn push_word(out: &mut LineOutput, value: i32) {
    out.bytes.push((value & 0xFF) as u8);
    out.bytes.push(((value >> 8) & 0xFF) as u8);
}

fn emit_data(node: &AstNode, word: bool, out: &mut LineOutput) -> Result<()> {
    let Some(list) = node.first_node(RuleType::ExprList) else {
        return Ok(());
    };

    let mut pieces = Vec::new();
    for entry in &list.children {
        match entry {
            NodeArg::Node(expr) => {
                if word {
                    push_word(out, expr.value);
                    pieces.push(format!("${:04X}", expr.value & 0xFFFF));
                } else {
                    out.bytes.push((expr.value & 0xFF) as u8);
                    pieces.push(format!("${:02X}", expr.value & 0xFF));
                }
            }
            NodeArg::Tok(tok) if tok.kind == TokenKind::Text => {
                out.bytes.extend(unescape_string(&tok.text));
                pieces.push(tok.text.clone());
            }
            NodeArg::Tok(_) => {}
        }
    }

    out.asm = format!(
        "{} {}",
        if word { ".word" } else { ".byte" },
        pieces.join(", ")
    );
    Ok(())
}

fn operand_value(node: &AstNode) -> i32 {
    node.child_nodes()
        .find(|n| n.rule == RuleType::Expr || n.rule == RuleType::AddrExpr)
        .map_or(0, |n| n.value)
}
