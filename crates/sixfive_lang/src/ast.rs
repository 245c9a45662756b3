//! AST node types produced by the grammar engine.
//!
//! Nodes form an owned tree: every node owns its children, and a child is
//! either a sub-node or a raw [`Token`] copied by value when a production
//! captured it. There is no sharing between subtrees.
//!
//! Each node records, besides its rule tag and folded value, the source
//! position of its first token and the program counter at rule entry
//! (`pc`). The emitter keys listing rows on the position and recomputes
//! branch displacements from `pc`.

use std::fmt::Write;

use sixfive_base::SourcePos;

use crate::opcode::AddrMode;
use crate::token::Token;

/// Non-terminal identities of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleType {
    // Expressions
    Number,
    Symbol,
    Factor,
    MulExpr,
    AddExpr,
    ShiftExpr,
    RelExpr,
    EqExpr,
    AndExpr,
    OrExpr,
    XorExpr,
    LogicalAndExpr,
    LogicalOrExpr,
    Expr,
    AddrExpr,
    ExprList,

    // Instructions
    OpCode,
    OpInstruction,
    OpImplied,
    OpAccumulator,
    OpImmediate,
    OpZeroPage,
    OpZeroPageX,
    OpZeroPageY,
    OpAbsolute,
    OpAbsoluteX,
    OpAbsoluteY,
    OpIndirect,
    OpIndirectX,
    OpIndirectY,
    OpRelative,
    OpZeroPageRelative,

    // Statements
    Label,
    Equate,
    Comment,
    OrgDirective,
    ByteDirective,
    WordDirective,
    IncludeDirective,
    IfDirective,
    VarDirective,
    VarItem,
    VarList,
    DoDirective,
    MacroDef,
    Statement,
    Line,
    LineList,
    Prog,
}

impl RuleType {
    /// The addressing mode named by an instruction-shaped rule, if any.
    pub fn addr_mode(self) -> Option<AddrMode> {
        match self {
            RuleType::OpImplied => Some(AddrMode::Implied),
            RuleType::OpAccumulator => Some(AddrMode::Accumulator),
            RuleType::OpImmediate => Some(AddrMode::Immediate),
            RuleType::OpZeroPage => Some(AddrMode::ZeroPage),
            RuleType::OpZeroPageX => Some(AddrMode::ZeroPageX),
            RuleType::OpZeroPageY => Some(AddrMode::ZeroPageY),
            RuleType::OpAbsolute => Some(AddrMode::Absolute),
            RuleType::OpAbsoluteX => Some(AddrMode::AbsoluteX),
            RuleType::OpAbsoluteY => Some(AddrMode::AbsoluteY),
            RuleType::OpIndirect => Some(AddrMode::Indirect),
            RuleType::OpIndirectX => Some(AddrMode::IndirectX),
            RuleType::OpIndirectY => Some(AddrMode::IndirectY),
            RuleType::OpRelative => Some(AddrMode::Relative),
            RuleType::OpZeroPageRelative => Some(AddrMode::ZeroPageRelative),
            _ => None,
        }
    }

    /// The instruction-shaped rule for an addressing mode.
    pub fn for_addr_mode(mode: AddrMode) -> RuleType {
        match mode {
            AddrMode::Implied => RuleType::OpImplied,
            AddrMode::Accumulator => RuleType::OpAccumulator,
            AddrMode::Immediate => RuleType::OpImmediate,
            AddrMode::ZeroPage => RuleType::OpZeroPage,
            AddrMode::ZeroPageX => RuleType::OpZeroPageX,
            AddrMode::ZeroPageY => RuleType::OpZeroPageY,
            AddrMode::Absolute => RuleType::OpAbsolute,
            AddrMode::AbsoluteX => RuleType::OpAbsoluteX,
            AddrMode::AbsoluteY => RuleType::OpAbsoluteY,
            AddrMode::Indirect => RuleType::OpIndirect,
            AddrMode::IndirectX => RuleType::OpIndirectX,
            AddrMode::IndirectY => RuleType::OpIndirectY,
            AddrMode::Relative => RuleType::OpRelative,
            AddrMode::ZeroPageRelative => RuleType::OpZeroPageRelative,
        }
    }
}

/// A child of an AST node: a subtree or a captured token.
#[derive(Debug, Clone)]
pub enum NodeArg {
    Node(AstNode),
    Tok(Token),
}

impl NodeArg {
    pub fn as_node(&self) -> Option<&AstNode> {
        match self {
            NodeArg::Node(n) => Some(n),
            NodeArg::Tok(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            NodeArg::Tok(t) => Some(t),
            NodeArg::Node(_) => None,
        }
    }
}

/// One node of the abstract syntax tree.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub rule: RuleType,
    /// Folded value: expression result, opcode byte, or line number,
    /// depending on the rule.
    pub value: i32,
    pub pos: SourcePos,
    /// Program counter at rule entry during the pass that built this node.
    pub pc: i32,
    pub children: Vec<NodeArg>,
}

impl AstNode {
    pub fn new(rule: RuleType, pos: SourcePos) -> Self {
        Self {
            rule,
            value: 0,
            pos,
            pc: 0,
            children: Vec::new(),
        }
    }

    pub fn with_children(rule: RuleType, pos: SourcePos, children: Vec<NodeArg>) -> Self {
        Self {
            rule,
            value: 0,
            pos,
            pc: 0,
            children,
        }
    }

    pub fn add_child(&mut self, child: NodeArg) {
        self.children.push(child);
    }

    /// Child sub-nodes, skipping captured tokens.
    pub fn child_nodes(&self) -> impl Iterator<Item = &AstNode> {
        self.children.iter().filter_map(NodeArg::as_node)
    }

    /// First child sub-node with the given rule.
    pub fn first_node(&self, rule: RuleType) -> Option<&AstNode> {
        self.child_nodes().find(|n| n.rule == rule)
    }

    /// First captured token, if any.
    pub fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(NodeArg::as_token)
    }

    /// Renders the tree with box-drawing prefixes, for `--ast` output.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, "", true, true);
        out
    }

    fn dump_into(&self, out: &mut String, prefix: &str, is_last: bool, is_root: bool) {
        if is_root {
            let _ = writeln!(out, "{:?} (value={})", self.rule, self.value);
        } else {
            let branch = if is_last { "└── " } else { "├── " };
            let _ = writeln!(
                out,
                "{}{}{:?} (value={})",
                prefix, branch, self.rule, self.value
            );
        }
        let child_prefix = if is_root {
            String::new()
        } else {
            format!("{}{}", prefix, if is_last { "    " } else { "│   " })
        };
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            let last = i + 1 == count;
            match child {
                NodeArg::Node(node) => node.dump_into(out, &child_prefix, last, false),
                NodeArg::Tok(tok) => {
                    let branch = if last { "└── " } else { "├── " };
                    let text = tok.text.replace('\n', "\\n");
                    let _ = writeln!(
                        out,
                        "{}{}{:?} '{}'",
                        child_prefix, branch, tok.kind, text
                    );
                }
            }
        }
    }
}
