//! The parser context: every piece of mutable assembly state.
//!
//! Grammar-rule actions receive `&mut Parser` explicitly; there is no
//! process-global state. The context owns the working token vector (which
//! macro, include, conditional, and loop expansion edit in place), the
//! program counter, the three symbol tables, the macro registry, the
//! source cache, and the per-pass bookkeeping the engine needs (visitation
//! counters, rule-entry PCs, the strict flag of the confirmation pass).
//!
//! ## Local symbol scoping
//!
//! Local symbols (`@name`) are stored in the scope table under
//! scope-qualified keys: `SCOPE@NAME`, where `SCOPE` is the most recent
//! global label. Qualification is what makes `@loop` in one routine a
//! different symbol from `@loop` in the next, and because entries persist
//! across passes, forward references to locals resolve through the same
//! fixpoint as globals. Leaving a scope (any new global-symbol definition)
//! checks that every local of the ending scope was defined.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use sixfive_base::{AsmError, ErrorKind, Result, SourceCache, SourcePos};

use crate::ast::RuleType;
use crate::macros::MacroDefinition;
use crate::symtab::SymbolTable;
use crate::token::{Token, TokenKind};

/// Default origin when no `.org` directive appears.
pub const DEFAULT_ORIGIN: i32 = 0x1000;

/// Behavior switches handed down from the command line.
#[derive(Debug, Clone, Default)]
pub struct AsmOptions {
    /// Accept 65C02-only mnemonics.
    pub c65c02: bool,
    /// Accept undocumented opcodes.
    pub illegal: bool,
    /// Suppress the local/global shadowing warning.
    pub nowarn: bool,
    /// Print pass traces and symbol changes.
    pub verbose: bool,
    /// Extra directories searched by `.include`.
    pub include_dirs: Vec<PathBuf>,
}

/// Mutable assembly state shared by the grammar engine and rule actions.
pub struct Parser {
    /// Working token vector; edited in place by expansions.
    pub tokens: Vec<Token>,
    /// Index of the next token to consume.
    pub cursor: usize,

    /// Program counter for the next emitted byte.
    pub pc: i32,
    /// Image origin; set by the first `.org` before any code.
    pub org: i32,
    /// True once the pass has assigned space to any instruction or data.
    pub emitted_any: bool,

    pub globals: SymbolTable,
    pub locals: SymbolTable,
    pub vars: SymbolTable,
    /// Uppercased name of the current global scope; empty before the
    /// first global label.
    pub scope: String,

    pub macros: BTreeMap<String, MacroDefinition>,
    /// Macro expansions performed this pass; bounded to catch recursion
    /// that the direct self-reference check cannot see.
    pub expansions_this_pass: u32,
    /// Per-file `.include` splice counts this pass; bounded to catch
    /// include cycles.
    pub includes_this_pass: HashMap<String, u32>,

    pub cache: SourceCache,
    pub options: AsmOptions,

    /// 1-based number of the running pass.
    pub pass: u32,
    /// True only during the confirmation pass; arms deferred range checks.
    pub strict: bool,

    /// PC at entry of the rule whose action is currently running.
    pub entry_pc: i32,

    // Engine bookkeeping, cleared at each line.
    pub(crate) visits: HashMap<(usize, RuleType), u32>,
    pub(crate) processed: HashMap<(usize, RuleType), u32>,
    pub(crate) pc_notes: HashMap<(usize, RuleType), i32>,
}

impl Parser {
    pub fn new(options: AsmOptions) -> Self {
        Self {
            tokens: Vec::new(),
            cursor: 0,
            pc: DEFAULT_ORIGIN,
            org: DEFAULT_ORIGIN,
            emitted_any: false,
            globals: SymbolTable::new(),
            locals: SymbolTable::new(),
            vars: SymbolTable::new(),
            scope: String::new(),
            macros: BTreeMap::new(),
            expansions_this_pass: 0,
            includes_this_pass: HashMap::new(),
            cache: SourceCache::new(),
            options,
            pass: 0,
            strict: false,
            entry_pc: DEFAULT_ORIGIN,
            visits: HashMap::new(),
            processed: HashMap::new(),
            pc_notes: HashMap::new(),
        }
    }

    /// Resets per-pass state and re-seeds the working token vector.
    ///
    /// The scope table is *not* cleared: locals persist across passes
    /// under their scope-qualified keys so forward references resolve.
    pub fn begin_pass(&mut self, tokens: Vec<Token>, pass: u32, strict: bool) {
        self.tokens = tokens;
        self.cursor = 0;
        self.pc = self.org;
        self.emitted_any = false;
        self.scope.clear();
        self.pass = pass;
        self.strict = strict;
        self.expansions_this_pass = 0;
        self.includes_this_pass.clear();
        self.globals.begin_pass();
        self.locals.begin_pass();
        self.vars.begin_pass();
        self.begin_line();
    }

    /// Clears the engine's per-line bookkeeping. Called before each line
    /// parse; token splices always land beyond the current line, so
    /// entries never outlive the indices they describe.
    pub fn begin_line(&mut self) {
        self.visits.clear();
        self.processed.clear();
        self.pc_notes.clear();
    }

}

/// Saved engine bookkeeping of a line parse still in flight.
///
/// Loop expansion parses detached token streams while an outer line parse
/// is running; the outer line's counters must survive or its rules would
/// re-run their side effects on backtracking.
pub struct LineState {
    visits: HashMap<(usize, RuleType), u32>,
    processed: HashMap<(usize, RuleType), u32>,
    pc_notes: HashMap<(usize, RuleType), i32>,
}

impl Parser {
    /// Detaches the current line's engine bookkeeping.
    pub(crate) fn save_line_state(&mut self) -> LineState {
        LineState {
            visits: std::mem::take(&mut self.visits),
            processed: std::mem::take(&mut self.processed),
            pc_notes: std::mem::take(&mut self.pc_notes),
        }
    }

    /// Restores bookkeeping saved by [`Parser::save_line_state`].
    pub(crate) fn restore_line_state(&mut self, state: LineState) {
        self.visits = state.visits;
        self.processed = state.processed;
        self.pc_notes = state.pc_notes;
    }

    // ──────────────────────────────────────────────────────────────────
    // Token stream access and surgery
    // ──────────────────────────────────────────────────────────────────

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    pub fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    pub fn current_pos(&self) -> SourcePos {
        self.current()
            .map(|t| t.pos.clone())
            .or_else(|| self.tokens.last().map(|t| t.pos.clone()))
            .unwrap_or_default()
    }

    /// Index of the `Eol` token terminating the line containing `idx`.
    pub fn find_next_eol(&self, idx: usize) -> usize {
        let mut i = idx;
        while i < self.tokens.len() && self.tokens[i].kind != TokenKind::Eol {
            i += 1;
        }
        i.min(self.tokens.len().saturating_sub(1))
    }

    /// Index of the first token of the line containing `idx`.
    pub fn find_line_start(&self, idx: usize) -> usize {
        let mut i = idx.min(self.tokens.len());
        while i > 0 && self.tokens[i - 1].kind != TokenKind::Eol {
            i -= 1;
        }
        i
    }

    /// Replaces `tokens[start..end]` with `replacement`.
    pub fn splice(&mut self, start: usize, end: usize, replacement: Vec<Token>) {
        let end = end.min(self.tokens.len());
        self.tokens.splice(start..end, replacement);
    }

    /// Removes `tokens[start..end]`.
    pub fn erase(&mut self, start: usize, end: usize) {
        self.splice(start, end, Vec::new());
    }

    /// A syntax error at the current token, with token context in the
    /// message.
    pub fn syntax_error(&self, message: impl Into<String>) -> AsmError {
        let message = message.into();
        match self.current() {
            Some(tok) if tok.kind != TokenKind::Eol => AsmError::new(
                ErrorKind::Syntax,
                format!("{} at '{}' (column {})", message, tok.text, tok.col),
                tok.pos.clone(),
            ),
            Some(tok) => AsmError::new(ErrorKind::Syntax, message, tok.pos.clone()),
            None => AsmError::new(
                ErrorKind::Syntax,
                format!("{} at end of input", message),
                self.current_pos(),
            ),
        }
    }

    /// One-line-per-token dump for verbose mode.
    pub fn dump_tokens(&self) -> String {
        let mut out = String::new();
        for (i, tok) in self.tokens.iter().enumerate() {
            let text = tok.text.replace('\n', "\\n");
            out.push_str(&format!(
                "{:>5}  {:<12} '{}' [{} col {}]{}\n",
                i,
                format!("{:?}", tok.kind),
                text,
                tok.pos,
                tok.col,
                if tok.start { " start" } else { "" },
            ));
        }
        out
    }

    // ──────────────────────────────────────────────────────────────────
    // Symbol handling used by the grammar actions
    // ──────────────────────────────────────────────────────────────────

    /// Scope-qualified name for a local symbol token text. The table
    /// normalizes case on lookup; keeping the written case here keeps
    /// diagnostics readable.
    pub fn local_key(&self, text: &str) -> String {
        format!("{}{}", self.scope, text)
    }

    /// Handles a symbol token in definition position (start-of-line).
    ///
    /// Global symbols end the current local scope (checking for dangling
    /// locals first) and become the new scope. Variable names are left to
    /// the equate path. Returns the symbol's value.
    ///
    /// `at_pc` is the rule-entry PC, not the live one: when backtracking
    /// re-parses a `label: instruction` line the instruction has already
    /// advanced the PC, and defining at the live counter would look like
    /// a duplicate definition at a new address.
    pub fn define_symbol(&mut self, tok: &Token, at_pc: i32) -> Result<i32> {
        if tok.kind == TokenKind::LocalSym {
            let key = self.local_key(&tok.text);
            return self.locals.define_label(&key, at_pc, &tok.pos);
        }
        if self.vars.contains(&tok.text) {
            return Ok(self.vars.reference(&tok.text, &tok.pos));
        }
        self.leave_scope(&tok.pos)?;
        self.scope = SymbolTable::normalize(&tok.text);
        self.globals.define_label(&tok.text, at_pc, &tok.pos)
    }

    /// Handles a symbol token in reference position. Undefined names
    /// become forward-reference placeholders with value 0.
    pub fn reference_symbol(&mut self, tok: &Token) -> i32 {
        if tok.kind == TokenKind::LocalSym {
            let key = self.local_key(&tok.text);
            return self.locals.reference(&key, &tok.pos);
        }
        if self.vars.contains(&tok.text) {
            return self.vars.reference(&tok.text, &tok.pos);
        }
        if !self.globals.contains(&tok.text) {
            let shadow = format!("{}@{}", self.scope, SymbolTable::normalize(&tok.text));
            if self.locals.contains(&shadow) && !self.options.nowarn && self.pass == 1 {
                eprintln!(
                    "Warning: '{}' is defined as a local symbol here. Ignore this warning with --nowarn.",
                    tok.text
                );
            }
        }
        self.globals.reference(&tok.text, &tok.pos)
    }

    /// Applies `name = value`. Variables take priority; otherwise the
    /// symbol becomes an equate in its table.
    pub fn equate_symbol(&mut self, tok: &Token, value: i32) {
        if tok.kind == TokenKind::LocalSym {
            let key = self.local_key(&tok.text);
            self.locals.define_equate(&key, value, &tok.pos);
        } else if self.vars.contains(&tok.text) {
            self.vars.assign_var(&tok.text, value, &tok.pos);
        } else {
            self.globals.define_equate(&tok.text, value, &tok.pos);
        }
    }

    /// Ends the current local scope: any local of this scope that was
    /// referenced but never defined is fatal.
    fn leave_scope(&mut self, pos: &SourcePos) -> Result<()> {
        let prefix = format!("{}@", self.scope);
        let dangling = self.locals.uninitialized_with_prefix(&prefix);
        if let Some((name, accessed)) = dangling.first() {
            let mut message = format!("local symbol '{}' was never defined in its scope", name);
            if let Some(first) = accessed.iter().next() {
                message.push_str(&format!("; referenced at {}", first));
            }
            let at = accessed.iter().next().cloned().unwrap_or_else(|| pos.clone());
            return Err(AsmError::new(ErrorKind::UnresolvedLocal, message, at));
        }
        Ok(())
    }

    /// Advances the program counter, marking that the pass has assigned
    /// space. `.org` uses `emitted_any` to decide whether it may still
    /// move the image origin.
    pub fn advance_pc(&mut self, bytes: i32) {
        self.pc += bytes;
        self.emitted_any = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parser_with(source: &str) -> Parser {
        let mut p = Parser::new(AsmOptions::default());
        let lines: Vec<_> = p
            .cache
            .insert("t.s", source)
            .to_vec();
        let tokens = Lexer::assembler().tokenize(&lines).unwrap();
        p.begin_pass(tokens, 1, false);
        p
    }

    #[test]
    fn find_next_eol_stops_at_line_end() {
        let p = parser_with("lda #1\nnop\n");
        let eol = p.find_next_eol(0);
        assert_eq!(p.tokens[eol].kind, TokenKind::Eol);
        assert!(eol < p.tokens.len());
        assert_eq!(p.tokens[eol].pos.line, 1);
    }

    #[test]
    fn find_line_start_walks_back_to_line_head() {
        let p = parser_with("nop\nlda #1\n");
        // index of the LDA token
        let lda = p
            .tokens
            .iter()
            .position(|t| t.kind == TokenKind::Lda)
            .unwrap();
        assert_eq!(p.find_line_start(lda + 1), lda);
        assert_eq!(p.find_line_start(0), 0);
    }

    #[test]
    fn splice_replaces_a_token_range() {
        let mut p = parser_with("nop\n");
        let replacement = Lexer::assembler()
            .tokenize_line(&SourcePos::new("t.s", 1), "rts")
            .unwrap();
        let count = replacement.len();
        p.splice(0, p.tokens.len(), replacement);
        assert_eq!(p.tokens.len(), count);
        assert_eq!(p.tokens[0].kind, TokenKind::Rts);
    }

    #[test]
    fn local_keys_qualify_by_scope() {
        let mut p = parser_with("nop\n");
        assert_eq!(p.local_key("@loop"), "@loop");
        p.scope = "START".to_string();
        assert_eq!(p.local_key("@loop"), "START@loop");
    }

    #[test]
    fn global_definition_switches_scope() {
        let mut p = parser_with("nop\n");
        let tok = Token::new(TokenKind::Sym, "start", SourcePos::new("t.s", 1), 1);
        p.define_symbol(&tok, p.pc).unwrap();
        assert_eq!(p.scope, "START");
        assert_eq!(p.globals.get("start").unwrap().value, DEFAULT_ORIGIN);
    }

    #[test]
    fn dangling_local_is_fatal_at_scope_exit() {
        let mut p = parser_with("nop\n");
        let reference = Token::new(TokenKind::LocalSym, "@skip", SourcePos::new("t.s", 2), 6);
        p.reference_symbol(&reference);

        let next_scope = Token::new(TokenKind::Sym, "next", SourcePos::new("t.s", 3), 1);
        let err = p.define_symbol(&next_scope, p.pc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedLocal);
        assert!(err.message.contains("@skip"));
    }

    #[test]
    fn defined_local_survives_scope_exit() {
        let mut p = parser_with("nop\n");
        let def = Token::new(TokenKind::LocalSym, "@skip", SourcePos::new("t.s", 2), 1);
        p.define_symbol(&def, p.pc).unwrap();

        let next_scope = Token::new(TokenKind::Sym, "next", SourcePos::new("t.s", 3), 1);
        assert!(p.define_symbol(&next_scope, p.pc).is_ok());
    }

    #[test]
    fn same_local_name_in_two_scopes_is_two_symbols() {
        let mut p = parser_with("nop\n");
        let a = Token::new(TokenKind::Sym, "a", SourcePos::new("t.s", 1), 1);
        p.define_symbol(&a, p.pc).unwrap();
        let local = Token::new(TokenKind::LocalSym, "@l", SourcePos::new("t.s", 2), 1);
        p.define_symbol(&local, p.pc).unwrap();

        p.pc = 0x2000;
        let b = Token::new(TokenKind::Sym, "b", SourcePos::new("t.s", 3), 1);
        p.define_symbol(&b, p.pc).unwrap();
        let local2 = Token::new(TokenKind::LocalSym, "@l", SourcePos::new("t.s", 4), 1);
        p.define_symbol(&local2, p.pc).unwrap();

        assert_eq!(p.locals.get("A@L").unwrap().value, DEFAULT_ORIGIN);
        assert_eq!(p.locals.get("B@L").unwrap().value, 0x2000);
    }

    #[test]
    fn variables_shadow_global_definition_path() {
        let mut p = parser_with("nop\n");
        let pos = SourcePos::new("t.s", 1);
        p.vars.assign_var("i", 3, &pos);

        let tok = Token::new(TokenKind::Sym, "i", pos.clone(), 1);
        assert_eq!(p.define_symbol(&tok, p.pc).unwrap(), 3);
        // no label was created and the scope did not switch
        assert!(!p.globals.contains("i"));
        assert_eq!(p.scope, "");

        p.equate_symbol(&tok, 4);
        assert_eq!(p.vars.get("i").unwrap().value, 4);
        assert!(!p.globals.contains("i"));
    }
}
