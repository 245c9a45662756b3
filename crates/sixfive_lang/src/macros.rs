//! Macro definitions, call expansion, include splicing, and conditionals.
//!
//! All four features are token-stream surgery: the working token vector is
//! edited in place, always at or beyond the current line, and the pass
//! driver re-seeds the pristine stream at every pass start so each pass
//! re-expands from the original source.
//!
//! ## Macro model
//!
//! A macro body is stored as raw source lines (position + text), not as
//! tokens or an AST. Expansion substitutes `\N` parameters textually and
//! re-tokenizes, which keeps parameter substitution exact (an argument is
//! spliced as written, whatever token shape it has) and costs nothing in
//! PC bookkeeping because the expansion parses like ordinary lines.

use std::path::PathBuf;

use sixfive_base::{AsmError, ErrorKind, Result, SourcePos};

use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::symtab::SymbolTable;
use crate::token::{unescape_string, Token, TokenKind};

/// Expansion count bound per pass; indirect macro recursion shows up as
/// runaway expansion long before this.
const MAX_EXPANSIONS_PER_PASS: u32 = 1000;

/// Splices of one file per pass; an include cycle grows without bound,
/// a legitimate repeated include does not get anywhere near this.
const MAX_INCLUDES_PER_FILE: u32 = 64;

/// A stored macro: body source lines, parameter count, definition site.
#[derive(Debug, Clone)]
pub struct MacroDefinition {
    /// Highest `\N` parameter referenced by the body.
    pub params: usize,
    /// Body lines as (position, raw text), ready for re-tokenization.
    pub body: Vec<(SourcePos, String)>,
    pub defined_at: SourcePos,
}

impl Parser {
    /// Captures a `.macro name` definition.
    ///
    /// Scans forward for the matching `.endm`, stores the body lines from
    /// the source cache, and erases everything after the `.macro` line
    /// through the `.endm` line so the body is never parsed at the
    /// definition site.
    pub fn capture_macro(&mut self, name_tok: &Token) -> Result<()> {
        let def_eol = self.find_next_eol(self.cursor);

        // Find the .endm line; nested definitions are not a thing.
        let mut idx = def_eol + 1;
        let mut end_dir = None;
        while idx < self.tokens.len() {
            match self.tokens[idx].kind {
                TokenKind::Macro => {
                    return Err(AsmError::new(
                        ErrorKind::Syntax,
                        "macro definitions cannot nest",
                        self.tokens[idx].pos.clone(),
                    ));
                }
                TokenKind::EndMacro => {
                    end_dir = Some(idx);
                    break;
                }
                _ => idx += 1,
            }
        }
        let Some(end_dir) = end_dir else {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                format!("missing .endm for macro '{}'", name_tok.text),
                name_tok.pos.clone(),
            ));
        };
        let end_eol = self.find_next_eol(end_dir);

        // Collect distinct body line positions in order, and the highest
        // parameter number referenced.
        let mut body = Vec::new();
        let mut params = 0usize;
        let mut last_pos: Option<SourcePos> = None;
        for tok in &self.tokens[def_eol + 1..end_dir] {
            if tok.kind == TokenKind::MacroParam {
                if let Ok(n) = tok.text[1..].parse::<usize>() {
                    params = params.max(n);
                }
            }
            if last_pos.as_ref() != Some(&tok.pos) {
                last_pos = Some(tok.pos.clone());
                if let Some(text) = self.cache.line_text(&tok.pos) {
                    body.push((tok.pos.clone(), text.to_string()));
                }
            }
        }

        let name = SymbolTable::normalize(&name_tok.text);
        self.globals.set_macro(&name_tok.text, &name_tok.pos);
        self.macros.insert(
            name,
            MacroDefinition {
                params,
                body,
                defined_at: name_tok.pos.clone(),
            },
        );

        // Drop the body and the .endm line from the stream.
        self.erase(def_eol + 1, end_eol + 1);
        Ok(())
    }

    /// True if the token starts a line and names a registered macro.
    pub fn at_macro_call(&self) -> bool {
        match self.current() {
            Some(tok) if tok.kind == TokenKind::Sym && tok.start => {
                self.macros.contains_key(&SymbolTable::normalize(&tok.text))
            }
            _ => false,
        }
    }

    /// Expands the macro call at the cursor, replacing the call line with
    /// the substituted body tokens. The cursor is left at the start of the
    /// expansion.
    pub fn expand_macro_call(&mut self) -> Result<()> {
        let call_tok = self.current().expect("caller checked").clone();
        let name = SymbolTable::normalize(&call_tok.text);
        let def = self.macros.get(&name).cloned().ok_or_else(|| {
            AsmError::new(
                ErrorKind::Syntax,
                format!("'{}' is not a macro", call_tok.text),
                call_tok.pos.clone(),
            )
        })?;

        self.expansions_this_pass += 1;
        if self.expansions_this_pass > MAX_EXPANSIONS_PER_PASS {
            return Err(AsmError::new(
                ErrorKind::MacroRecursion,
                format!("macro expansion does not terminate (at '{}')", call_tok.text),
                call_tok.pos.clone(),
            ));
        }

        let eol = self.find_next_eol(self.cursor);
        let args = collect_arguments(&self.tokens[self.cursor + 1..eol]);
        if args.len() != def.params {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                format!(
                    "macro '{}' expects {} argument(s), got {}",
                    call_tok.text,
                    def.params,
                    args.len()
                ),
                call_tok.pos.clone(),
            ));
        }

        let mut expansion = Vec::new();
        for (pos, text) in &def.body {
            let line = substitute_params(text, &args);
            let tokens = Lexer::assembler().tokenize_line(pos, &line)?;
            if let Some(recursive) = tokens.iter().find(|t| {
                t.kind == TokenKind::Sym && SymbolTable::normalize(&t.text) == name
            }) {
                return Err(AsmError::new(
                    ErrorKind::MacroRecursion,
                    format!("macro '{}' expands itself", call_tok.text),
                    recursive.pos.clone(),
                ));
            }
            expansion.extend(tokens);
        }

        let start = self.cursor;
        self.splice(start, eol + 1, expansion);
        Ok(())
    }

    /// Handles `.include "path"`: reads the file through the source cache
    /// and splices its tokens after the current line.
    pub fn splice_include(&mut self, path_tok: &Token) -> Result<()> {
        let raw = unescape_string(&path_tok.text);
        let rel = String::from_utf8_lossy(&raw).into_owned();
        if rel.is_empty() {
            return Err(AsmError::new(
                ErrorKind::IncludeNotFound,
                "empty include path",
                path_tok.pos.clone(),
            ));
        }

        let resolved = self.resolve_include(&rel, &path_tok.pos)?;
        let key = resolved.to_string_lossy().into_owned();

        if key == path_tok.pos.file {
            return Err(AsmError::new(
                ErrorKind::IncludeCycle,
                format!("'{}' includes itself", rel),
                path_tok.pos.clone(),
            ));
        }
        let count = self.includes_this_pass.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > MAX_INCLUDES_PER_FILE {
            return Err(AsmError::new(
                ErrorKind::IncludeCycle,
                format!("include cycle through '{}'", rel),
                path_tok.pos.clone(),
            ));
        }

        let lines = self
            .cache
            .read_file(&resolved)
            .map_err(|e| {
                AsmError::new(
                    ErrorKind::IncludeNotFound,
                    format!("cannot read '{}': {}", rel, e),
                    path_tok.pos.clone(),
                )
            })?
            .to_vec();
        let tokens = Lexer::assembler().tokenize(&lines)?;

        let eol = self.find_next_eol(self.cursor);
        self.splice(eol + 1, eol + 1, tokens);
        Ok(())
    }

    fn resolve_include(&self, rel: &str, from: &SourcePos) -> Result<PathBuf> {
        let mut candidates = Vec::new();
        let including_dir = PathBuf::from(&from.file)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        candidates.push(including_dir.join(rel));
        for dir in &self.options.include_dirs {
            candidates.push(dir.join(rel));
        }
        candidates.push(PathBuf::from(rel));

        for candidate in candidates {
            if candidate.is_file() || self.cache.contains(&candidate.to_string_lossy()) {
                return Ok(candidate);
            }
        }
        Err(AsmError::new(
            ErrorKind::IncludeNotFound,
            format!("include file '{}' not found", rel),
            from.clone(),
        ))
    }

    /// Handles `.if cond`: erases the inactive arm (and the structural
    /// `.else`/`.endif` lines) from the token stream.
    pub fn splice_conditional(&mut self, cond: bool, pos: &SourcePos) -> Result<()> {
        let if_eol = self.find_next_eol(self.cursor);

        // Locate the matching .else / .endif, depth-aware.
        let mut depth = 1u32;
        let mut else_dir: Option<usize> = None;
        let mut endif_dir: Option<usize> = None;
        let mut idx = if_eol + 1;
        while idx < self.tokens.len() {
            match self.tokens[idx].kind {
                TokenKind::If => depth += 1,
                TokenKind::Else if depth == 1 => else_dir = Some(idx),
                TokenKind::Endif => {
                    depth -= 1;
                    if depth == 0 {
                        endif_dir = Some(idx);
                        break;
                    }
                }
                _ => {}
            }
            idx += 1;
        }
        let Some(endif_dir) = endif_dir else {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                "missing .endif",
                pos.clone(),
            ));
        };
        let endif_end = self.find_next_eol(endif_dir) + 1;

        match (cond, else_dir) {
            (true, Some(else_dir)) => {
                // keep the then-arm, drop .else through .endif
                let else_start = self.find_line_start(else_dir);
                self.erase(else_start, endif_end);
            }
            (true, None) => {
                let endif_start = self.find_line_start(endif_dir);
                self.erase(endif_start, endif_end);
            }
            (false, Some(else_dir)) => {
                // drop .endif line first so earlier indices stay valid
                let endif_start = self.find_line_start(endif_dir);
                self.erase(endif_start, endif_end);
                let else_eol = self.find_next_eol(else_dir);
                self.erase(if_eol + 1, else_eol + 1);
            }
            (false, None) => {
                self.erase(if_eol + 1, endif_end);
            }
        }
        Ok(())
    }
}

/// Splits the call-line tokens into comma-separated argument strings at
/// paren depth zero. Token texts are joined with spaces; re-tokenization
/// of the substituted body restores exact shapes.
fn collect_arguments(tokens: &[Token]) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for tok in tokens {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            TokenKind::Comma if depth == 0 => {
                args.push(current.trim().to_string());
                current = String::new();
                continue;
            }
            _ => {}
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&tok.text);
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// Replaces `\N` parameter references with the argument texts.
fn substitute_params(line: &str, args: &[String]) -> String {
    let mut out = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            let mut number = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                number.push(*d);
                chars.next();
            }
            let n: usize = number.parse().unwrap_or(0);
            if n >= 1 && n <= args.len() {
                out.push_str(&args[n - 1]);
            }
        } else {
            out.push(c);
        }
    }
    out
}
