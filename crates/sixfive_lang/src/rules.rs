//! The grammar rule set: expressions, addressing-mode shapes, statements.
//!
//! Everything below `Line` is data: each non-terminal is a
//! [`GrammarRule`] with ordered alternative productions and an action
//! that folds values, updates symbol tables, selects addressing modes,
//! and advances the program counter. The `LineList`/`Prog` layer above
//! `Line` is folded iteratively by the pass driver so parse depth does
//! not grow with file length.
//!
//! ## Ordering notes
//!
//! Alternatives are ordered choice (first full match wins), which makes
//! some orderings load-bearing:
//!
//! - `Equate` precedes the bare-label alternatives of `Statement`: a
//!   matched `Statement` is never re-tried from the outside, so `foo = 5`
//!   must not first succeed as the label `foo`.
//! - `OpZeroPageRelative` precedes the absolute shapes: `bbr0 $12, 4`
//!   would otherwise match `bbr0 $12` and strand the comma.
//! - In the expression chain each level captures the next-tighter level
//!   and folds its own operators via `fold_binary`; precedence is
//!   (tightest first) unary, `* / %`, `+ -`, `<< >>`, `< > <= >=`,
//!   `== !=`, `&`, `|`, `^`, `&&`, `||`. The comparison and logical
//!   levels exist for `.if` and `.while` conditions.

use std::collections::HashMap;
use std::sync::OnceLock;

use sixfive_base::{AsmError, ErrorKind, Result};

use crate::ast::{AstNode, NodeArg, RuleType};
use crate::grammar::{ActionFn, GrammarRule, GrammarSym, Production};
use crate::modes::{select_fixed, select_sized, select_zp_relative, SizedModes};
use crate::opcode::{opcode_info, AddrMode};
use crate::parser::Parser;
use crate::token::{mnemonics, unescape_string, Token, TokenKind};

use GrammarSym::{Capture, Term};

/// The static rule map shared by every parser instance.
pub fn grammar() -> &'static HashMap<RuleType, GrammarRule> {
    static GRAMMAR: OnceLock<HashMap<RuleType, GrammarRule>> = OnceLock::new();
    GRAMMAR.get_or_init(build_grammar)
}

fn add(
    map: &mut HashMap<RuleType, GrammarRule>,
    rule: RuleType,
    productions: Vec<Production>,
    action: ActionFn,
) {
    map.insert(
        rule,
        GrammarRule {
            productions,
            action,
        },
    );
}

fn build_grammar() -> HashMap<RuleType, GrammarRule> {
    let mut g = HashMap::new();

    add(
        &mut g,
        RuleType::Number,
        vec![
            vec![Term(TokenKind::DecNum)],
            vec![Term(TokenKind::HexNum)],
            vec![Term(TokenKind::BinNum)],
            vec![Term(TokenKind::CharLit)],
        ],
        number_action,
    );

    add(
        &mut g,
        RuleType::Symbol,
        vec![
            vec![Term(TokenKind::LocalSym)],
            vec![Term(TokenKind::Sym)],
        ],
        symbol_action,
    );

    add(
        &mut g,
        RuleType::Factor,
        vec![
            vec![Capture(RuleType::Number)],
            vec![Capture(RuleType::Symbol)],
            vec![
                Term(TokenKind::LParen),
                Capture(RuleType::Expr),
                Term(TokenKind::RParen),
            ],
            vec![Term(TokenKind::Minus), Capture(RuleType::Factor)],
            vec![Term(TokenKind::Plus), Capture(RuleType::Factor)],
            vec![Term(TokenKind::Tilde), Capture(RuleType::Factor)],
        ],
        factor_action,
    );

    add(
        &mut g,
        RuleType::MulExpr,
        vec![vec![Capture(RuleType::Factor)]],
        mul_action,
    );
    add(
        &mut g,
        RuleType::AddExpr,
        vec![vec![Capture(RuleType::MulExpr)]],
        addsub_action,
    );
    add(
        &mut g,
        RuleType::ShiftExpr,
        vec![vec![Capture(RuleType::AddExpr)]],
        shift_action,
    );
    add(
        &mut g,
        RuleType::RelExpr,
        vec![vec![Capture(RuleType::ShiftExpr)]],
        rel_action,
    );
    add(
        &mut g,
        RuleType::EqExpr,
        vec![vec![Capture(RuleType::RelExpr)]],
        eq_action,
    );
    add(
        &mut g,
        RuleType::AndExpr,
        vec![vec![Capture(RuleType::EqExpr)]],
        bitand_action,
    );
    add(
        &mut g,
        RuleType::OrExpr,
        vec![vec![Capture(RuleType::AndExpr)]],
        bitor_action,
    );
    add(
        &mut g,
        RuleType::XorExpr,
        vec![vec![Capture(RuleType::OrExpr)]],
        bitxor_action,
    );
    add(
        &mut g,
        RuleType::LogicalAndExpr,
        vec![vec![Capture(RuleType::XorExpr)]],
        logand_action,
    );
    add(
        &mut g,
        RuleType::LogicalOrExpr,
        vec![vec![Capture(RuleType::LogicalAndExpr)]],
        logor_action,
    );
    add(
        &mut g,
        RuleType::Expr,
        vec![vec![Capture(RuleType::LogicalOrExpr)]],
        passthrough_action(RuleType::Expr),
    );
    add(
        &mut g,
        RuleType::AddrExpr,
        vec![vec![Capture(RuleType::Expr)]],
        passthrough_action(RuleType::AddrExpr),
    );

    add(
        &mut g,
        RuleType::OpCode,
        mnemonics().map(|kind| vec![Term(kind)]).collect(),
        opcode_action,
    );

    add(
        &mut g,
        RuleType::OpImplied,
        vec![vec![Capture(RuleType::OpCode)]],
        |p, args, count| select_fixed(p, AddrMode::Implied, args, count),
    );
    add(
        &mut g,
        RuleType::OpAccumulator,
        vec![vec![Capture(RuleType::OpCode), Term(TokenKind::A)]],
        |p, args, count| select_fixed(p, AddrMode::Accumulator, args, count),
    );
    add(
        &mut g,
        RuleType::OpImmediate,
        vec![vec![
            Capture(RuleType::OpCode),
            Term(TokenKind::Pound),
            Capture(RuleType::Expr),
        ]],
        |p, args, count| {
            let modes = SizedModes {
                narrow: Some(AddrMode::Immediate),
                ..SizedModes::default()
            };
            select_sized(p, modes, args, 2, count)
        },
    );
    add(
        &mut g,
        RuleType::OpAbsolute,
        vec![vec![Capture(RuleType::OpCode), Capture(RuleType::Expr)]],
        |p, args, count| {
            let modes = SizedModes {
                wide: Some(AddrMode::Absolute),
                narrow: Some(AddrMode::ZeroPage),
                relative: true,
            };
            select_sized(p, modes, args, 1, count)
        },
    );
    add(
        &mut g,
        RuleType::OpAbsoluteX,
        vec![vec![
            Capture(RuleType::OpCode),
            Capture(RuleType::AddrExpr),
            Term(TokenKind::Comma),
            Term(TokenKind::X),
        ]],
        |p, args, count| {
            let modes = SizedModes {
                wide: Some(AddrMode::AbsoluteX),
                narrow: Some(AddrMode::ZeroPageX),
                relative: false,
            };
            select_sized(p, modes, args, 1, count)
        },
    );
    add(
        &mut g,
        RuleType::OpAbsoluteY,
        vec![vec![
            Capture(RuleType::OpCode),
            Capture(RuleType::AddrExpr),
            Term(TokenKind::Comma),
            Term(TokenKind::Y),
        ]],
        |p, args, count| {
            let modes = SizedModes {
                wide: Some(AddrMode::AbsoluteY),
                narrow: Some(AddrMode::ZeroPageY),
                relative: false,
            };
            select_sized(p, modes, args, 1, count)
        },
    );
    add(
        &mut g,
        RuleType::OpIndirect,
        vec![vec![
            Capture(RuleType::OpCode),
            Term(TokenKind::LParen),
            Capture(RuleType::AddrExpr),
            Term(TokenKind::RParen),
        ]],
        |p, args, count| {
            let modes = SizedModes {
                wide: Some(AddrMode::Indirect),
                ..SizedModes::default()
            };
            select_sized(p, modes, args, 2, count)
        },
    );
    add(
        &mut g,
        RuleType::OpIndirectX,
        vec![vec![
            Capture(RuleType::OpCode),
            Term(TokenKind::LParen),
            Capture(RuleType::AddrExpr),
            Term(TokenKind::Comma),
            Term(TokenKind::X),
            Term(TokenKind::RParen),
        ]],
        |p, args, count| {
            let modes = SizedModes {
                narrow: Some(AddrMode::IndirectX),
                ..SizedModes::default()
            };
            select_sized(p, modes, args, 2, count)
        },
    );
    add(
        &mut g,
        RuleType::OpIndirectY,
        vec![vec![
            Capture(RuleType::OpCode),
            Term(TokenKind::LParen),
            Capture(RuleType::AddrExpr),
            Term(TokenKind::RParen),
            Term(TokenKind::Comma),
            Term(TokenKind::Y),
        ]],
        |p, args, count| {
            let modes = SizedModes {
                narrow: Some(AddrMode::IndirectY),
                ..SizedModes::default()
            };
            select_sized(p, modes, args, 2, count)
        },
    );
    add(
        &mut g,
        RuleType::OpZeroPageRelative,
        vec![vec![
            Capture(RuleType::OpCode),
            Capture(RuleType::Expr),
            Term(TokenKind::Comma),
            Capture(RuleType::Expr),
        ]],
        |p, args, count| select_zp_relative(p, args, count),
    );

    add(
        &mut g,
        RuleType::OpInstruction,
        vec![
            vec![Capture(RuleType::OpAccumulator)],
            vec![Capture(RuleType::OpImmediate)],
            vec![Capture(RuleType::OpIndirectX)],
            vec![Capture(RuleType::OpIndirectY)],
            vec![Capture(RuleType::OpIndirect)],
            vec![Capture(RuleType::OpZeroPageRelative)],
            vec![Capture(RuleType::OpAbsoluteX)],
            vec![Capture(RuleType::OpAbsoluteY)],
            vec![Capture(RuleType::OpAbsolute)],
            vec![Capture(RuleType::OpImplied)],
        ],
        passthrough_action(RuleType::OpInstruction),
    );

    add(
        &mut g,
        RuleType::Equate,
        vec![vec![
            Capture(RuleType::Symbol),
            Term(TokenKind::Equal),
            Capture(RuleType::Expr),
        ]],
        equate_action,
    );

    add(
        &mut g,
        RuleType::Label,
        vec![
            vec![Capture(RuleType::Symbol), Term(TokenKind::Colon)],
            vec![Capture(RuleType::Symbol)],
        ],
        passthrough_action(RuleType::Label),
    );

    add(
        &mut g,
        RuleType::Comment,
        vec![vec![Term(TokenKind::Comment)]],
        |_p, args, _count| {
            let pos = args[0].as_token().unwrap().pos.clone();
            Ok(AstNode::with_children(RuleType::Comment, pos, args))
        },
    );

    add(
        &mut g,
        RuleType::OrgDirective,
        vec![vec![Term(TokenKind::Org), Capture(RuleType::Expr)]],
        org_action,
    );

    add(
        &mut g,
        RuleType::ExprList,
        vec![
            vec![
                Capture(RuleType::Expr),
                Term(TokenKind::Comma),
                Capture(RuleType::ExprList),
            ],
            vec![
                Term(TokenKind::Text),
                Term(TokenKind::Comma),
                Capture(RuleType::ExprList),
            ],
            vec![Capture(RuleType::Expr)],
            vec![Term(TokenKind::Text)],
        ],
        expr_list_action,
    );

    add(
        &mut g,
        RuleType::ByteDirective,
        vec![vec![Term(TokenKind::Byte), Capture(RuleType::ExprList)]],
        byte_directive_action,
    );
    add(
        &mut g,
        RuleType::WordDirective,
        vec![vec![Term(TokenKind::Word), Capture(RuleType::ExprList)]],
        word_directive_action,
    );

    add(
        &mut g,
        RuleType::IncludeDirective,
        vec![vec![Term(TokenKind::Include), Term(TokenKind::Text)]],
        include_action,
    );

    add(
        &mut g,
        RuleType::IfDirective,
        vec![vec![Term(TokenKind::If), Capture(RuleType::Expr)]],
        if_action,
    );

    add(
        &mut g,
        RuleType::VarItem,
        vec![vec![
            Term(TokenKind::Sym),
            Term(TokenKind::Equal),
            Capture(RuleType::Expr),
        ]],
        var_item_action,
    );
    add(
        &mut g,
        RuleType::VarList,
        vec![
            vec![
                Capture(RuleType::VarItem),
                Term(TokenKind::Comma),
                Capture(RuleType::VarList),
            ],
            vec![Capture(RuleType::VarItem)],
        ],
        flatten_action(RuleType::VarList),
    );
    add(
        &mut g,
        RuleType::VarDirective,
        vec![vec![Term(TokenKind::Var), Capture(RuleType::VarList)]],
        passthrough_action(RuleType::VarDirective),
    );

    add(
        &mut g,
        RuleType::DoDirective,
        vec![vec![Term(TokenKind::Do)]],
        do_action,
    );

    add(
        &mut g,
        RuleType::MacroDef,
        vec![vec![Term(TokenKind::Macro), Term(TokenKind::Sym)]],
        macro_def_action,
    );

    add(
        &mut g,
        RuleType::Statement,
        vec![
            vec![Capture(RuleType::Equate)],
            vec![Capture(RuleType::MacroDef)],
            vec![Capture(RuleType::OrgDirective)],
            vec![Capture(RuleType::ByteDirective)],
            vec![Capture(RuleType::WordDirective)],
            vec![Capture(RuleType::IncludeDirective)],
            vec![Capture(RuleType::IfDirective)],
            vec![Capture(RuleType::VarDirective)],
            vec![Capture(RuleType::DoDirective)],
            vec![Capture(RuleType::OpInstruction)],
            vec![Capture(RuleType::Label), Capture(RuleType::Statement)],
            vec![Capture(RuleType::Label)],
        ],
        passthrough_action(RuleType::Statement),
    );

    add(
        &mut g,
        RuleType::Line,
        vec![
            vec![Term(TokenKind::Eol)],
            vec![Capture(RuleType::Comment), Term(TokenKind::Eol)],
            vec![
                Capture(RuleType::Statement),
                Capture(RuleType::Comment),
                Term(TokenKind::Eol),
            ],
            vec![Capture(RuleType::Statement), Term(TokenKind::Eol)],
        ],
        line_action,
    );

    g
}

// ──────────────────────────────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────────────────────────────

/// Builds an action that wraps its arguments and adopts the first
/// sub-node's value.
fn passthrough_action(rule: RuleType) -> ActionFn {
    // fn items cannot capture, so dispatch over a small fixed set.
    match rule {
        RuleType::Expr => |p, args, count| wrap(RuleType::Expr, p, args, count),
        RuleType::AddrExpr => |p, args, count| wrap(RuleType::AddrExpr, p, args, count),
        RuleType::OpInstruction => |p, args, count| wrap(RuleType::OpInstruction, p, args, count),
        RuleType::Label => |p, args, count| wrap(RuleType::Label, p, args, count),
        RuleType::VarDirective => |p, args, count| wrap(RuleType::VarDirective, p, args, count),
        RuleType::Statement => |p, args, count| wrap(RuleType::Statement, p, args, count),
        _ => unreachable!("no passthrough action for this rule"),
    }
}

fn wrap(rule: RuleType, _p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let pos = args
        .iter()
        .find_map(|a| match a {
            NodeArg::Node(n) => Some(n.pos.clone()),
            NodeArg::Tok(t) => Some(t.pos.clone()),
        })
        .unwrap_or_default();
    let value = args.iter().find_map(NodeArg::as_node).map_or(0, |n| n.value);
    let mut node = AstNode::with_children(rule, pos, args);
    node.value = value;
    Ok(node)
}

/// Builds an action that flattens nested list nodes of the same rule.
fn flatten_action(rule: RuleType) -> ActionFn {
    match rule {
        RuleType::VarList => |p, args, count| flatten(RuleType::VarList, p, args, count),
        _ => unreachable!("no flatten action for this rule"),
    }
}

fn flatten(rule: RuleType, _p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let pos = args
        .iter()
        .find_map(|a| a.as_node().map(|n| n.pos.clone()))
        .unwrap_or_default();
    let mut node = AstNode::new(rule, pos);
    for arg in args {
        match arg {
            NodeArg::Node(inner) if inner.rule == rule => {
                node.children.extend(inner.children);
            }
            NodeArg::Node(inner) => node.add_child(NodeArg::Node(inner)),
            NodeArg::Tok(tok) if tok.kind == TokenKind::Comma => {}
            NodeArg::Tok(tok) => node.add_child(NodeArg::Tok(tok)),
        }
    }
    node.value = node.children.len() as i32;
    Ok(node)
}

fn number_action(_p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let tok = args[0].as_token().unwrap().clone();
    let value = parse_number(&tok)?;
    let mut node = AstNode::with_children(RuleType::Number, tok.pos.clone(), args);
    node.value = value;
    Ok(node)
}

fn parse_number(tok: &Token) -> Result<i32> {
    let out_of_range = || {
        AsmError::new(
            ErrorKind::OperandOutOfRange,
            format!("numeric literal '{}' out of range", tok.text),
            tok.pos.clone(),
        )
    };
    let value = match tok.kind {
        TokenKind::DecNum => i64::from_str_radix(&tok.text, 10).map_err(|_| out_of_range())?,
        TokenKind::HexNum => i64::from_str_radix(&tok.text[1..], 16).map_err(|_| out_of_range())?,
        TokenKind::BinNum => i64::from_str_radix(&tok.text[1..], 2).map_err(|_| out_of_range())?,
        TokenKind::CharLit => {
            let bytes = unescape_string(&tok.text);
            *bytes.first().unwrap_or(&0) as i64
        }
        _ => unreachable!("number rule only matches literal kinds"),
    };
    i32::try_from(value).map_err(|_| out_of_range())
}

fn symbol_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let tok = args[0].as_token().unwrap().clone();
    let value = if tok.start {
        let at_pc = p.entry_pc;
        p.define_symbol(&tok, at_pc)?
    } else {
        p.reference_symbol(&tok)
    };
    let mut node = AstNode::with_children(RuleType::Symbol, tok.pos.clone(), args);
    node.value = value;
    Ok(node)
}

fn factor_action(_p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let value = match args.len() {
        1 => args[0].as_node().unwrap().value,
        2 => {
            let op = args[0].as_token().unwrap();
            let operand = args[1].as_node().unwrap().value;
            match op.kind {
                TokenKind::Minus => operand.wrapping_neg(),
                TokenKind::Plus => operand,
                TokenKind::Tilde => !operand,
                _ => unreachable!("factor only matches unary + - ~"),
            }
        }
        _ => args[1].as_node().unwrap().value,
    };
    let pos = match &args[0] {
        NodeArg::Node(n) => n.pos.clone(),
        NodeArg::Tok(t) => t.pos.clone(),
    };
    let mut node = AstNode::with_children(RuleType::Factor, pos, args);
    node.value = value;
    Ok(node)
}

fn mul_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
        RuleType::MulExpr,
        RuleType::Factor,
        |l, op, r| match op {
            TokenKind::Star => Some(l.wrapping_mul(r)),
            TokenKind::Slash if r != 0 => Some(l.wrapping_div(r)),
            TokenKind::Percent if r != 0 => Some(l.wrapping_rem(r)),
            _ => None,
        },
        "a factor",
    )
}

fn addsub_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Plus, TokenKind::Minus],
        RuleType::AddExpr,
        RuleType::MulExpr,
        |l, op, r| {
            Some(if op == TokenKind::Plus {
                l.wrapping_add(r)
            } else {
                l.wrapping_sub(r)
            })
        },
        "a term",
    )
}

fn shift_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Shl, TokenKind::Shr],
        RuleType::ShiftExpr,
        RuleType::AddExpr,
        |l, op, r| {
            let amount = (r as u32) & 31;
            Some(if op == TokenKind::Shl {
                l.wrapping_shl(amount)
            } else {
                l.wrapping_shr(amount)
            })
        },
        "a shift amount",
    )
}

fn rel_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Lt, TokenKind::Gt, TokenKind::Le, TokenKind::Ge],
        RuleType::RelExpr,
        RuleType::ShiftExpr,
        |l, op, r| {
            Some(match op {
                TokenKind::Lt => (l < r) as i32,
                TokenKind::Gt => (l > r) as i32,
                TokenKind::Le => (l <= r) as i32,
                _ => (l >= r) as i32,
            })
        },
        "a comparison operand",
    )
}

fn eq_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::EqEq, TokenKind::NotEq],
        RuleType::EqExpr,
        RuleType::RelExpr,
        |l, op, r| {
            Some(if op == TokenKind::EqEq {
                (l == r) as i32
            } else {
                (l != r) as i32
            })
        },
        "a comparison operand",
    )
}

fn bitand_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Amp],
        RuleType::AndExpr,
        RuleType::EqExpr,
        |l, _, r| Some(l & r),
        "an and operand",
    )
}

fn bitor_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Pipe],
        RuleType::OrExpr,
        RuleType::AndExpr,
        |l, _, r| Some(l | r),
        "an or operand",
    )
}

fn bitxor_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::Caret],
        RuleType::XorExpr,
        RuleType::OrExpr,
        |l, _, r| Some(l ^ r),
        "an xor operand",
    )
}

fn logand_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::AndAnd],
        RuleType::LogicalAndExpr,
        RuleType::XorExpr,
        |l, _, r| Some((l != 0 && r != 0) as i32),
        "a logical operand",
    )
}

fn logor_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let left = take_node(args);
    p.fold_binary(
        left,
        &[TokenKind::OrOr],
        RuleType::LogicalOrExpr,
        RuleType::LogicalAndExpr,
        |l, _, r| Some((l != 0 || r != 0) as i32),
        "a logical operand",
    )
}

fn take_node(args: Vec<NodeArg>) -> AstNode {
    args.into_iter()
        .find_map(|a| match a {
            NodeArg::Node(n) => Some(n),
            NodeArg::Tok(_) => None,
        })
        .expect("binary level captures its operand")
}

fn opcode_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let tok = args[0].as_token().unwrap().clone();
    let info = opcode_info(tok.kind).ok_or_else(|| {
        AsmError::new(
            ErrorKind::UnknownOpcode,
            format!("unknown opcode '{}'", tok.text),
            tok.pos.clone(),
        )
    })?;
    if info.is_65c02 && !p.options.c65c02 {
        return Err(AsmError::new(
            ErrorKind::UnknownOpcode,
            format!(
                "unknown opcode '{}' ('{}' is 65C02-only; enable with --c65c02)",
                tok.text, info.mnemonic
            ),
            tok.pos.clone(),
        ));
    }
    if info.is_illegal && !p.options.illegal {
        return Err(AsmError::new(
            ErrorKind::UnknownOpcode,
            format!(
                "unknown opcode '{}' ('{}' is undocumented; enable with --illegal)",
                tok.text, info.mnemonic
            ),
            tok.pos.clone(),
        ));
    }
    let mut node = AstNode::with_children(RuleType::OpCode, tok.pos.clone(), args);
    node.value = 0;
    Ok(node)
}

fn equate_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let value = args[2].as_node().unwrap().value;
    let name_tok = args[0]
        .as_node()
        .and_then(|n| n.first_token())
        .expect("equate lhs holds its symbol token")
        .clone();
    p.equate_symbol(&name_tok, value);
    let mut node = AstNode::with_children(RuleType::Equate, name_tok.pos.clone(), args);
    node.value = value;
    Ok(node)
}

fn org_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let expr = args[1].as_node().unwrap();
    let value = expr.value;
    let tok_pos = args[0].as_token().unwrap().pos.clone();
    if p.strict && !(0..=0xFFFF).contains(&value) {
        return Err(AsmError::new(
            ErrorKind::OperandOutOfRange,
            format!("origin {} does not fit a 16-bit address", value),
            tok_pos,
        ));
    }
    if !p.emitted_any {
        p.org = value;
    }
    p.pc = value;
    let mut node = AstNode::with_children(RuleType::OrgDirective, tok_pos, args);
    node.value = value;
    Ok(node)
}

fn expr_list_action(_p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let pos = args
        .iter()
        .find_map(|a| match a {
            NodeArg::Node(n) => Some(n.pos.clone()),
            NodeArg::Tok(t) => Some(t.pos.clone()),
        })
        .unwrap_or_default();
    let mut node = AstNode::new(RuleType::ExprList, pos);
    for arg in args {
        match arg {
            NodeArg::Node(inner) if inner.rule == RuleType::ExprList => {
                node.children.extend(inner.children);
            }
            NodeArg::Node(inner) => node.add_child(NodeArg::Node(inner)),
            NodeArg::Tok(tok) if tok.kind == TokenKind::Comma => {}
            NodeArg::Tok(tok) => node.add_child(NodeArg::Tok(tok)),
        }
    }
    node.value = node.children.len() as i32;
    Ok(node)
}

/// Byte length of an expression list: one per expression entry (two when
/// `word`), plus the decoded length of each string entry.
pub fn expr_list_bytes(list: &AstNode, word: bool) -> i32 {
    let mut size = 0;
    for child in &list.children {
        match child {
            NodeArg::Node(_) => size += if word { 2 } else { 1 },
            NodeArg::Tok(tok) if tok.kind == TokenKind::Text => {
                size += unescape_string(&tok.text).len() as i32;
            }
            NodeArg::Tok(_) => {}
        }
    }
    size
}

fn byte_directive_action(p: &mut Parser, args: Vec<NodeArg>, count: usize) -> Result<AstNode> {
    data_directive(p, args, count, false)
}

fn word_directive_action(p: &mut Parser, args: Vec<NodeArg>, count: usize) -> Result<AstNode> {
    data_directive(p, args, count, true)
}

fn data_directive(
    p: &mut Parser,
    args: Vec<NodeArg>,
    count: usize,
    word: bool,
) -> Result<AstNode> {
    let rule = if word {
        RuleType::WordDirective
    } else {
        RuleType::ByteDirective
    };
    let directive_tok = args[0].as_token().unwrap().clone();
    let list = args[1].as_node().unwrap();

    if word {
        if let Some(text) = list
            .children
            .iter()
            .filter_map(NodeArg::as_token)
            .find(|t| t.kind == TokenKind::Text)
        {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                "string literal not allowed in .word list",
                text.pos.clone(),
            ));
        }
    }

    if p.strict {
        let (lo, hi) = if word { (-32768, 65535) } else { (-128, 255) };
        for entry in list.child_nodes() {
            if entry.value < lo || entry.value > hi {
                return Err(AsmError::new(
                    ErrorKind::OperandOutOfRange,
                    format!(
                        "{} value {} out of range",
                        if word { ".word" } else { ".byte" },
                        entry.value
                    ),
                    entry.pos.clone(),
                ));
            }
        }
    }

    let size = expr_list_bytes(list, word);
    let mut node = AstNode::with_children(rule, directive_tok.pos.clone(), args);
    node.value = size;
    if count == 0 {
        p.advance_pc(size);
    }
    Ok(node)
}

fn include_action(p: &mut Parser, args: Vec<NodeArg>, count: usize) -> Result<AstNode> {
    let path_tok = args[1].as_token().unwrap().clone();
    if count == 0 {
        p.splice_include(&path_tok)?;
    }
    Ok(AstNode::with_children(
        RuleType::IncludeDirective,
        path_tok.pos.clone(),
        args,
    ))
}

fn if_action(p: &mut Parser, args: Vec<NodeArg>, count: usize) -> Result<AstNode> {
    let cond = args[1].as_node().unwrap().value != 0;
    let pos = args[0].as_token().unwrap().pos.clone();
    if count == 0 {
        p.splice_conditional(cond, &pos)?;
    }
    let mut node = AstNode::with_children(RuleType::IfDirective, pos, args);
    node.value = cond as i32;
    Ok(node)
}

fn var_item_action(p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let name_tok = args[0].as_token().unwrap().clone();
    let value = args[2].as_node().unwrap().value;
    p.vars.assign_var(&name_tok.text, value, &name_tok.pos);
    let mut node = AstNode::with_children(RuleType::VarItem, name_tok.pos.clone(), args);
    node.value = value;
    Ok(node)
}

fn do_action(p: &mut Parser, args: Vec<NodeArg>, count: usize) -> Result<AstNode> {
    let pos = args[0].as_token().unwrap().pos.clone();
    if count == 0 {
        p.run_do_loop(&pos)?;
    }
    Ok(AstNode::with_children(RuleType::DoDirective, pos, args))
}

fn macro_def_action(p: &mut Parser, args: Vec<NodeArg>, count: usize) -> Result<AstNode> {
    let name_tok = args[1].as_token().unwrap().clone();
    if count == 0 {
        p.capture_macro(&name_tok)?;
    }
    Ok(AstNode::with_children(
        RuleType::MacroDef,
        name_tok.pos.clone(),
        args,
    ))
}

fn line_action(_p: &mut Parser, args: Vec<NodeArg>, _count: usize) -> Result<AstNode> {
    let pos = args
        .iter()
        .find_map(|a| match a {
            NodeArg::Node(n) => Some(n.pos.clone()),
            NodeArg::Tok(t) => Some(t.pos.clone()),
        })
        .unwrap_or_default();
    let mut node = AstNode::with_children(RuleType::Line, pos.clone(), args);
    node.value = pos.line as i32;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::AsmOptions;
    use sixfive_base::SourcePos;

    fn parser_for(line: &str) -> Parser {
        parser_with_options(line, AsmOptions::default())
    }

    fn parser_with_options(line: &str, options: AsmOptions) -> Parser {
        let mut p = Parser::new(options);
        p.cache.insert("t.s", line);
        let tokens = Lexer::assembler()
            .tokenize_line(&SourcePos::new("t.s", 1), line)
            .unwrap();
        p.begin_pass(tokens, 1, false);
        p
    }

    fn parse_line(p: &mut Parser) -> AstNode {
        p.parse_rule(RuleType::Line)
            .unwrap()
            .expect("line should parse")
    }

    fn instruction_of(line: &AstNode) -> &AstNode {
        fn find(node: &AstNode) -> Option<&AstNode> {
            if node.rule.addr_mode().is_some() {
                return Some(node);
            }
            node.child_nodes().find_map(find)
        }
        find(line).expect("line should contain an instruction")
    }

    #[test]
    fn number_literals_fold_to_values() {
        for (text, expected) in [
            ("1 + 2", 3),
            ("$10", 16),
            ("%101", 5),
            ("'A'", 65),
            ("2 + 3 * 4", 14),
            ("(2 + 3) * 4", 20),
            ("1 << 4", 16),
            ("255 & 15", 15),
            ("1 | 6", 7),
            ("255 ^ 15", 240),
            ("10 % 3", 1),
            ("-5 + 8", 3),
            ("~0 & $FF", 255),
            ("2 < 3", 1),
            ("3 <= 2", 0),
            ("4 == 4", 1),
            ("4 != 4", 0),
            ("1 && 2", 1),
            ("0 || 3", 1),
            ("1 + 1 == 2 && 5 > 4", 1),
        ] {
            let mut p = parser_for(text);
            let node = p.parse_rule(RuleType::Expr).unwrap().unwrap();
            assert_eq!(node.value, expected, "for input {:?}", text);
        }
    }

    #[test]
    fn implied_line_builds_expected_shape() {
        let mut p = parser_for("nop");
        let line = parse_line(&mut p);
        assert_eq!(line.rule, RuleType::Line);
        let stmt = line.first_node(RuleType::Statement).unwrap();
        let instr = stmt.first_node(RuleType::OpInstruction).unwrap();
        let implied = instr.first_node(RuleType::OpImplied).unwrap();
        assert_eq!(implied.value, 0xEA);
        assert!(implied.first_node(RuleType::OpCode).is_some());
        assert_eq!(p.pc, p.org + 1);
    }

    #[test]
    fn immediate_hex_operand() {
        let mut p = parser_for("lda #$01");
        let line = parse_line(&mut p);
        let instr = instruction_of(&line);
        assert_eq!(instr.rule, RuleType::OpImmediate);
        assert_eq!(instr.value, 0xA9);
        assert_eq!(instr.first_node(RuleType::Expr).unwrap().value, 1);
    }

    #[test]
    fn zero_page_is_chosen_for_small_operand() {
        let mut p = parser_for("sta $04");
        let line = parse_line(&mut p);
        let instr = instruction_of(&line);
        assert_eq!(instr.rule, RuleType::OpZeroPage);
        assert_eq!(instr.value, 0x85);
    }

    #[test]
    fn absolute_is_chosen_for_large_operand() {
        let mut p = parser_for("lda $1234");
        let instr_rule = {
            let line = parse_line(&mut p);
            instruction_of(&line).rule
        };
        assert_eq!(instr_rule, RuleType::OpAbsolute);
        assert_eq!(p.pc, p.org + 3);
    }

    #[test]
    fn indexed_and_indirect_shapes() {
        for (text, rule) in [
            ("lda $10,x", RuleType::OpZeroPageX),
            ("lda $1234,x", RuleType::OpAbsoluteX),
            ("ldx $10,y", RuleType::OpZeroPageY),
            ("lda $1234,y", RuleType::OpAbsoluteY),
            ("jmp ($1234)", RuleType::OpIndirect),
            ("lda ($12,x)", RuleType::OpIndirectX),
            ("lda ($12),y", RuleType::OpIndirectY),
            ("asl a", RuleType::OpAccumulator),
        ] {
            let mut p = parser_for(text);
            let line = parse_line(&mut p);
            assert_eq!(instruction_of(&line).rule, rule, "for input {:?}", text);
        }
    }

    #[test]
    fn branch_parses_to_relative() {
        let mut p = parser_for("bne $1005");
        let line = parse_line(&mut p);
        let instr = instruction_of(&line);
        assert_eq!(instr.rule, RuleType::OpRelative);
        assert_eq!(instr.value, 0xD0);
    }

    #[test]
    fn zp_relative_shape_takes_two_operands() {
        let mut options = AsmOptions::default();
        options.c65c02 = true;
        let mut p = parser_with_options("bbr0 $12, 4", options);
        let line = parse_line(&mut p);
        let instr = instruction_of(&line);
        assert_eq!(instr.rule, RuleType::OpZeroPageRelative);
        assert_eq!(instr.value, 0x0F);
        assert_eq!(p.pc, p.org + 3);
    }

    #[test]
    fn label_with_instruction_defines_symbol_at_pc() {
        let mut p = parser_for("start: lda #1");
        let line = parse_line(&mut p);
        assert_eq!(p.globals.get("start").unwrap().value, p.org);
        assert_eq!(p.scope, "START");
        let stmt = line.first_node(RuleType::Statement).unwrap();
        assert!(stmt.first_node(RuleType::Label).is_some());
    }

    #[test]
    fn bare_label_line_parses() {
        let mut p = parser_for("alone");
        parse_line(&mut p);
        assert!(p.globals.get("alone").unwrap().is_pc);
        assert_eq!(p.pc, p.org);
    }

    #[test]
    fn equate_wins_over_label_interpretation() {
        let mut p = parser_for("width = 40");
        let line = parse_line(&mut p);
        let stmt = line.first_node(RuleType::Statement).unwrap();
        assert!(stmt.first_node(RuleType::Equate).is_some());
        let sym = p.globals.get("width").unwrap();
        assert_eq!(sym.value, 40);
        assert!(!sym.is_pc);
    }

    #[test]
    fn comment_only_and_blank_lines_parse() {
        let mut p = parser_for("; just a comment");
        let line = parse_line(&mut p);
        assert!(line.first_node(RuleType::Comment).is_some());

        let mut p = parser_for("");
        let line = parse_line(&mut p);
        assert!(line.first_node(RuleType::Statement).is_none());
    }

    #[test]
    fn instruction_with_trailing_comment() {
        let mut p = parser_for("nop ; wait");
        let line = parse_line(&mut p);
        assert!(line.first_node(RuleType::Statement).is_some());
        assert!(line.first_node(RuleType::Comment).is_some());
        assert_eq!(p.pc, p.org + 1);
    }

    #[test]
    fn org_directive_moves_pc_and_origin() {
        let mut p = parser_for(".org $0800");
        parse_line(&mut p);
        assert_eq!(p.pc, 0x0800);
        assert_eq!(p.org, 0x0800);
    }

    #[test]
    fn org_after_code_moves_only_pc() {
        let mut p = parser_for("nop");
        parse_line(&mut p);
        p.begin_line();
        let tokens = Lexer::assembler()
            .tokenize_line(&SourcePos::new("t.s", 2), ".org $2000")
            .unwrap();
        let at = p.tokens.len();
        p.tokens.extend(tokens);
        p.cursor = at;
        parse_line(&mut p);
        assert_eq!(p.pc, 0x2000);
        assert_eq!(p.org, 0x1000);
    }

    #[test]
    fn byte_directive_counts_entries() {
        let mut p = parser_for(".byte 1, 2, 3");
        let line = parse_line(&mut p);
        assert_eq!(p.pc, p.org + 3);
        let stmt = line.first_node(RuleType::Statement).unwrap();
        let byte = stmt.first_node(RuleType::ByteDirective).unwrap();
        assert_eq!(byte.value, 3);
    }

    #[test]
    fn byte_directive_accepts_strings() {
        let mut p = parser_for(".byte \"AB\", 0");
        parse_line(&mut p);
        assert_eq!(p.pc, p.org + 3);
    }

    #[test]
    fn word_directive_counts_two_bytes_per_entry() {
        let mut p = parser_for(".word $1234, $5678");
        parse_line(&mut p);
        assert_eq!(p.pc, p.org + 4);
    }

    #[test]
    fn word_directive_rejects_strings() {
        let mut p = parser_for(".word \"AB\"");
        let err = p.parse_rule(RuleType::Line).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn c65c02_mnemonics_are_gated() {
        let mut p = parser_for("bra $1005");
        let err = p.parse_rule(RuleType::Line).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOpcode);
        assert!(err.message.contains("--c65c02"));

        let mut options = AsmOptions::default();
        options.c65c02 = true;
        let mut p = parser_with_options("bra $1005", options);
        assert!(p.parse_rule(RuleType::Line).unwrap().is_some());
    }

    #[test]
    fn illegal_mnemonics_are_gated() {
        let mut p = parser_for("lax $10");
        let err = p.parse_rule(RuleType::Line).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOpcode);
        assert!(err.message.contains("--illegal"));

        let mut options = AsmOptions::default();
        options.illegal = true;
        let mut p = parser_with_options("lax $10", options);
        assert!(p.parse_rule(RuleType::Line).unwrap().is_some());
    }

    #[test]
    fn unsupported_shape_is_reported() {
        let mut p = parser_for("nop #1");
        let err = p.parse_rule(RuleType::Line).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedAddressingMode);
    }

    #[test]
    fn forward_reference_uses_placeholder_zero() {
        let mut p = parser_for("lda later");
        let line = parse_line(&mut p);
        let instr = instruction_of(&line);
        // placeholder 0 fits a byte, so the first pass narrows
        assert_eq!(instr.rule, RuleType::OpZeroPage);
        assert!(!p.globals.get("later").unwrap().initialized);
    }

    #[test]
    fn var_directive_declares_variables() {
        let mut p = parser_for(".var i = 3, j = i + 1");
        parse_line(&mut p);
        assert_eq!(p.vars.get("i").unwrap().value, 3);
        assert_eq!(p.vars.get("j").unwrap().value, 4);
        assert_eq!(p.pc, p.org);
    }
}
