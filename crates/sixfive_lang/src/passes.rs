//! The multi-pass driver.
//!
//! One pass tokenizes nothing: the pristine token stream is produced once
//! and re-seeded into the parser at every pass start, so macro, include,
//! conditional, and loop expansion always start from the original source.
//! A pass parses the stream line by line, letting rule actions update
//! symbols and the program counter, and produces the pass's AST.
//!
//! ## Termination
//!
//! Passes repeat while any global symbol is unresolved or any symbol
//! value moved. Each pass either resolves a symbol, re-sizes an operand
//! (moving later labels), or reaches the fixpoint. When a pass ends with
//! no changes and nothing unresolved, exactly one further **confirmation
//! pass** runs with `strict` set: only there are deferred range errors
//! fatal, because only there is every operand width final. A pass cap
//! catches pathological self-referential programs whose labels never
//! settle; that situation reports the moving symbols as unresolved,
//! never as a range error.

use std::path::Path;

use sixfive_base::{AsmError, ErrorKind, Result, SourceCache, SourcePos};

use crate::ast::{AstNode, NodeArg, RuleType};
use crate::lexer::Lexer;
use crate::parser::{AsmOptions, Parser};
use crate::sym::Sym;
use crate::symtab::UnresolvedList;
use crate::token::Token;

/// Upper bound on resolution passes; exceeding it means some symbol
/// value oscillates.
pub const MAX_PASSES: u32 = 16;

impl Parser {
    /// Parses the working token stream to exhaustion, one line at a time.
    ///
    /// Macro calls are expanded before each line parse; everything else
    /// is the grammar's business. Returns the `Line` nodes in order.
    pub fn parse_lines(&mut self) -> Result<Vec<AstNode>> {
        let mut lines = Vec::new();
        while self.cursor < self.tokens.len() {
            self.begin_line();
            if self.at_macro_call() {
                self.expand_macro_call()?;
                continue;
            }
            match self.parse_rule(RuleType::Line)? {
                Some(node) => lines.push(node),
                None => return Err(self.syntax_error("unexpected token")),
            }
        }
        Ok(lines)
    }
}

/// Owns the parser and drives passes to the fixpoint.
pub struct Assembler {
    parser: Parser,
    sources: Vec<(SourcePos, String)>,
}

impl Assembler {
    pub fn new(options: AsmOptions) -> Self {
        Self {
            parser: Parser::new(options),
            sources: Vec::new(),
        }
    }

    /// Reads a source file through the cache and appends its lines to the
    /// input. Files concatenate in the order added. The file's directory
    /// joins the include search path.
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let lines = self.parser.cache.read_file(path).map_err(|e| {
            AsmError::new(
                ErrorKind::Io,
                format!("cannot read '{}': {}", path.display(), e),
                SourcePos::default(),
            )
        })?;
        self.sources.extend(lines.iter().cloned());
        if let Some(parent) = path.parent() {
            let parent = parent.to_path_buf();
            if !self.parser.options.include_dirs.contains(&parent) {
                self.parser.options.include_dirs.push(parent);
            }
        }
        Ok(())
    }

    /// Adds in-memory source under a logical filename. Used by tests and
    /// by callers that already hold file contents.
    pub fn add_source(&mut self, name: &str, text: &str) {
        let lines = self.parser.cache.insert(name, text).to_vec();
        self.sources.extend(lines);
    }

    pub fn cache(&self) -> &SourceCache {
        &self.parser.cache
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Image origin after assembly.
    pub fn origin(&self) -> u16 {
        self.parser.org as u16
    }

    /// Registers a listener for global symbol changes (verbose tracing).
    pub fn on_symbol_change(&mut self, listener: Box<dyn FnMut(&Sym)>) {
        self.parser.globals.on_change(listener);
    }

    /// Runs passes until the fixpoint and returns the resolved AST.
    pub fn assemble(&mut self) -> Result<AstNode> {
        if self.sources.is_empty() {
            return Err(AsmError::new(
                ErrorKind::Io,
                "no input to assemble",
                SourcePos::default(),
            ));
        }
        let pristine: Vec<Token> = Lexer::assembler().tokenize(&self.sources)?;

        let mut strict = false;
        let mut pass = 0u32;
        loop {
            pass += 1;
            self.parser.begin_pass(pristine.clone(), pass, strict);
            if self.parser.options.verbose {
                println!("Pass {}{}", pass, if strict { " (final)" } else { "" });
            }

            let lines = self.parser.parse_lines()?;

            if self.parser.options.verbose {
                print!("{}", self.parser.dump_tokens());
            }

            let ast = build_prog(lines);

            if strict {
                if let Some(err) = self.unresolved_error() {
                    return Err(err);
                }
                return Ok(ast);
            }

            let needs_pass = !self.parser.globals.unresolved().is_empty()
                || self.parser.globals.changes != 0
                || self.parser.locals.changes != 0;
            if !needs_pass {
                strict = true;
                continue;
            }
            if pass >= MAX_PASSES {
                return Err(self.unresolved_error().unwrap_or_else(|| {
                    AsmError::new(
                        ErrorKind::UnresolvedSymbol,
                        format!("assembly did not stabilize within {} passes", MAX_PASSES),
                        SourcePos::default(),
                    )
                }));
            }
        }
    }

    /// The error for whatever is still unresolved, locals first.
    fn unresolved_error(&self) -> Option<AsmError> {
        let locals = self.parser.locals.unresolved();
        if !locals.is_empty() {
            return Some(unresolved_to_error(ErrorKind::UnresolvedLocal, &locals));
        }
        let globals = self.parser.globals.unresolved();
        if !globals.is_empty() {
            return Some(unresolved_to_error(ErrorKind::UnresolvedSymbol, &globals));
        }
        None
    }
}

fn unresolved_to_error(kind: ErrorKind, list: &UnresolvedList) -> AsmError {
    let mut parts = Vec::new();
    let mut first_pos = SourcePos::default();
    for (name, accessed) in list {
        let positions: Vec<String> = accessed.iter().map(|p| p.to_string()).collect();
        if first_pos.is_unknown() {
            if let Some(pos) = accessed.iter().next() {
                first_pos = pos.clone();
            }
        }
        if positions.is_empty() {
            parts.push(name.clone());
        } else {
            parts.push(format!("{} (referenced at {})", name, positions.join(", ")));
        }
    }
    let what = if kind == ErrorKind::UnresolvedLocal {
        "unresolved local symbols"
    } else {
        "unresolved symbols"
    };
    AsmError::new(kind, format!("{}: {}", what, parts.join("; ")), first_pos)
}

fn build_prog(lines: Vec<AstNode>) -> AstNode {
    let pos = lines
        .first()
        .map(|l| l.pos.clone())
        .unwrap_or_default();
    let pc = lines.first().map(|l| l.pc).unwrap_or_default();

    let mut list = AstNode::new(RuleType::LineList, pos.clone());
    list.pc = pc;
    for line in lines {
        list.add_child(NodeArg::Node(line));
    }

    let mut prog = AstNode::new(RuleType::Prog, pos);
    prog.pc = pc;
    prog.add_child(NodeArg::Node(list));
    prog
}
