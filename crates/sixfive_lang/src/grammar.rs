//! Data-driven recursive-descent grammar engine.
//!
//! Productions are data, not code: a [`GrammarRule`] pairs an ordered list
//! of alternative productions with an action function that builds the AST
//! node from the matched pieces. The engine provides PEG-like semantics —
//! alternatives are tried in order, the first full match wins, and a
//! failed production rolls the cursor back with no effect on the stream.
//!
//! ## Capture convention
//!
//! A production symbol is a terminal token kind, a plain non-terminal, or
//! a *capturing* non-terminal. Terminals and captures both land in the
//! action's argument vector in production order (terminals as tokens,
//! captures as sub-nodes); a plain non-terminal is matched and discarded.
//! This distinction is what gives actions a flat, positional view of
//! exactly the pieces they need.
//!
//! ## The visitation count
//!
//! PEG backtracking can run the same rule at the same token position more
//! than once (a `Statement` alternative may re-parse an instruction its
//! sibling alternative already matched). Side effects must not repeat, so
//! the engine counts (position, rule) action invocations and hands the
//! count to the action: the program counter advances only on count 0, and
//! the PC recorded on count 0 is replayed to retries so branch math stays
//! consistent. The same counter doubles as the runaway-recursion bound.
//!
//! ## Left recursion
//!
//! Self-referential productions are never written directly; every binary
//! operator level goes through [`Parser::fold_binary`], which parses
//! `lhs (op rhs)*` iteratively and folds left-associatively.

use sixfive_base::{AsmError, ErrorKind, Result};

use crate::ast::{AstNode, NodeArg, RuleType};
use crate::parser::Parser;
use crate::rules::grammar;
use crate::token::TokenKind;

/// Re-entry bound for one (token position, rule) pair.
const RECURSION_LIMIT: u32 = 64;

/// One symbol of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarSym {
    /// Consume one token of this kind; the token joins the action args.
    Term(TokenKind),
    /// Match a sub-rule and discard its node.
    Rule(RuleType),
    /// Match a sub-rule and capture its node into the action args.
    Capture(RuleType),
}

/// An ordered sequence of grammar symbols.
pub type Production = Vec<GrammarSym>;

/// Action signature: parser context, matched arguments in production
/// order, and the visitation count at this (position, rule) pair.
pub type ActionFn = fn(&mut Parser, Vec<NodeArg>, usize) -> Result<AstNode>;

/// A non-terminal: alternative productions plus the node-building action.
pub struct GrammarRule {
    pub productions: Vec<Production>,
    pub action: ActionFn,
}

impl Parser {
    /// Attempts to match `rule` at the current cursor.
    ///
    /// Returns `Ok(Some(node))` and advances the cursor on success;
    /// `Ok(None)` with the cursor rolled back when no alternative
    /// matches. Hard errors (from actions, or the recursion bound) abort
    /// the parse.
    pub fn parse_rule(&mut self, rule: RuleType) -> Result<Option<AstNode>> {
        let start = self.cursor;

        let visits = self.visits.entry((start, rule)).or_insert(0);
        *visits += 1;
        if *visits > RECURSION_LIMIT {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                format!("grammar recursion limit reached in {:?}", rule),
                self.current_pos(),
            ));
        }

        let result = self.try_alternatives(rule, start);

        if let Some(v) = self.visits.get_mut(&(start, rule)) {
            *v -= 1;
        }
        result
    }

    fn try_alternatives(&mut self, rule: RuleType, start: usize) -> Result<Option<AstNode>> {
        let def = grammar()
            .get(&rule)
            .unwrap_or_else(|| panic!("no grammar rule registered for {:?}", rule));

        'next_production: for production in &def.productions {
            self.cursor = start;
            let mut args: Vec<NodeArg> = Vec::new();

            for sym in production {
                match sym {
                    GrammarSym::Term(kind) => match self.current() {
                        Some(tok) if tok.kind == *kind => {
                            args.push(NodeArg::Tok(tok.clone()));
                            self.cursor += 1;
                        }
                        _ => continue 'next_production,
                    },
                    GrammarSym::Rule(sub) => match self.parse_rule(*sub)? {
                        Some(_) => {}
                        None => continue 'next_production,
                    },
                    GrammarSym::Capture(sub) => match self.parse_rule(*sub)? {
                        Some(node) => args.push(NodeArg::Node(node)),
                        None => continue 'next_production,
                    },
                }
            }

            // Matched: run the action with its visitation count and the
            // rule-entry PC (replayed on retries so side effects that
            // already happened are not repeated against a moved PC).
            let counter = self.processed.entry((start, rule)).or_insert(0);
            let count = *counter as usize;
            *counter += 1;

            let entry_pc = if count == 0 {
                self.pc_notes.insert((start, rule), self.pc);
                self.pc
            } else {
                *self.pc_notes.get(&(start, rule)).unwrap_or(&self.pc)
            };

            let start_pos = self
                .tokens
                .get(start)
                .map(|t| t.pos.clone())
                .unwrap_or_else(|| self.current_pos());

            let saved_entry = self.entry_pc;
            self.entry_pc = entry_pc;
            let action_result = (def.action)(self, args, count);
            self.entry_pc = saved_entry;

            let mut node = action_result?;
            node.pos = start_pos;
            node.pc = entry_pc;
            return Ok(Some(node));
        }

        self.cursor = start;
        Ok(None)
    }

    /// Parses `lhs (op rhs)*` iteratively, folding left-associatively.
    ///
    /// `eval` folds constant values; `None` signals division by zero.
    /// Every precedence level of the expression grammar reuses this
    /// helper instead of writing a left-recursive production.
    pub fn fold_binary(
        &mut self,
        mut left: AstNode,
        ops: &[TokenKind],
        rule: RuleType,
        right_rule: RuleType,
        eval: fn(i32, TokenKind, i32) -> Option<i32>,
        expected: &str,
    ) -> Result<AstNode> {
        while let Some(op_kind) = self.current_kind().filter(|k| ops.contains(k)) {
            let op = self.current().unwrap().clone();
            self.cursor += 1;

            let right = self.parse_rule(right_rule)?.ok_or_else(|| {
                self.syntax_error(format!(
                    "expected {} after operator '{}'",
                    expected, op.text
                ))
            })?;

            let value = eval(left.value, op_kind, right.value).ok_or_else(|| {
                AsmError::new(ErrorKind::DivisionByZero, "division by zero", op.pos.clone())
            })?;

            let mut node = AstNode::new(rule, left.pos.clone());
            node.pc = left.pc;
            node.value = value;
            node.add_child(NodeArg::Node(left));
            node.add_child(NodeArg::Tok(op));
            node.add_child(NodeArg::Node(right));
            left = node;
        }
        Ok(left)
    }
}
