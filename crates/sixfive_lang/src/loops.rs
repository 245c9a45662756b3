//! `.do` / `.while` loop expansion (experimental).
//!
//! The loop body is expanded by re-parsing its *source text* once per
//! iteration with variable symbols frozen to their current values, so a
//! line like `.byte i` emits a different byte each time around. After the
//! final iteration the token range from the `.do` line's end through the
//! `.while` line is replaced by the concatenated per-iteration token
//! streams and the program counter is rewound to the loop start; the rest
//! of the pass then parses the flat expansion like ordinary lines.
//!
//! Nested loops need no extra machinery: an inner `.do` encountered while
//! an outer iteration parses expands itself into that iteration's token
//! stream, so the outer splice already receives flat tokens.
//!
//! This subsystem is the most intricate part of the dialect and its
//! termination guarantees are weaker than the symbol-resolution fixpoint:
//! the only bound on a non-terminating condition is the iteration cap.

use sixfive_base::{AsmError, ErrorKind, Result, SourcePos};

use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::ast::RuleType;
use crate::token::{Token, TokenKind};

/// Hard bound on loop iterations.
const MAX_ITERATIONS: u32 = 100_000;

impl Parser {
    /// Runs the `.do` loop whose directive the cursor has just passed.
    ///
    /// On return the loop construct has been replaced by its expansion and
    /// the PC rewound to the loop start, ready for the in-stream parse of
    /// the expanded tokens.
    pub fn run_do_loop(&mut self, pos: &SourcePos) -> Result<()> {
        let do_eol = self.find_next_eol(self.cursor);

        // Matching `.while`, depth-aware for nesting.
        let mut depth = 1u32;
        let mut while_dir = None;
        let mut idx = do_eol + 1;
        while idx < self.tokens.len() {
            match self.tokens[idx].kind {
                TokenKind::Do => depth += 1,
                TokenKind::While => {
                    depth -= 1;
                    if depth == 0 {
                        while_dir = Some(idx);
                        break;
                    }
                }
                _ => {}
            }
            idx += 1;
        }
        let Some(while_dir) = while_dir else {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                "missing .while for .do",
                pos.clone(),
            ));
        };
        let while_eol = self.find_next_eol(while_dir);
        let while_line_start = self.find_line_start(while_dir);
        let while_pos = self.tokens[while_dir].pos.clone();

        // Body source lines, from the distinct positions of the body
        // tokens; the source cache holds every line ever read.
        let mut body: Vec<(SourcePos, String)> = Vec::new();
        let mut last: Option<SourcePos> = None;
        for tok in &self.tokens[do_eol + 1..while_line_start] {
            if last.as_ref() != Some(&tok.pos) {
                last = Some(tok.pos.clone());
                if let Some(text) = self.cache.line_text(&tok.pos) {
                    body.push((tok.pos.clone(), text.to_string()));
                }
            }
        }

        let cond_text = self
            .cache
            .line_text(&while_pos)
            .map(strip_while_prefix)
            .unwrap_or_default();
        if cond_text.is_empty() {
            return Err(AsmError::new(
                ErrorKind::Syntax,
                "missing condition after .while",
                while_pos,
            ));
        }

        let loop_pc = self.pc;
        let mut expansion: Vec<Token> = Vec::new();
        let mut iterations = 0u32;

        loop {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                return Err(AsmError::new(
                    ErrorKind::IterationLimit,
                    format!(".do/.while exceeded {} iterations", MAX_ITERATIONS),
                    pos.clone(),
                ));
            }

            // Parse this iteration out-of-band with variables frozen.
            // Side effects on the PC and variables are wanted; the AST is
            // discarded because the spliced expansion re-parses in-stream.
            let body_tokens = Lexer::assembler().tokenize(&body)?;
            let frozen = self.freeze_vars(body_tokens);
            let iteration_tokens = self.parse_aside(frozen)?;
            expansion.extend(iteration_tokens);

            let cond_tokens = Lexer::assembler().tokenize_line(&while_pos, &cond_text)?;
            let cond_frozen = self.freeze_vars(cond_tokens);
            if self.eval_aside(cond_frozen, &while_pos)? == 0 {
                break;
            }
        }

        self.splice(do_eol + 1, while_eol + 1, expansion);
        self.pc = loop_pc;
        Ok(())
    }

    /// Replaces non-assignment references to variable symbols with their
    /// current literal values.
    fn freeze_vars(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        for (i, tok) in tokens.iter().enumerate() {
            if tok.kind == TokenKind::Sym && self.vars.contains(&tok.text) {
                let is_assignment_target = tokens
                    .get(i + 1)
                    .map_or(false, |next| next.kind == TokenKind::Equal);
                if !is_assignment_target {
                    let value = self.vars.get(&tok.text).unwrap().value;
                    push_literal(&mut out, value, tok);
                    continue;
                }
            }
            out.push(tok.clone());
        }
        out
    }

    /// Parses a detached token stream to exhaustion, returning the stream
    /// as it looks afterwards (nested expansions included). The outer
    /// line's engine bookkeeping is preserved around the excursion.
    fn parse_aside(&mut self, tokens: Vec<Token>) -> Result<Vec<Token>> {
        let saved_state = self.save_line_state();
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_cursor = self.cursor;
        self.cursor = 0;

        let result = self.parse_lines().map(|_| ());

        let expanded = std::mem::replace(&mut self.tokens, saved_tokens);
        self.cursor = saved_cursor;
        self.restore_line_state(saved_state);
        result?;
        Ok(expanded)
    }

    /// Evaluates a detached expression token stream.
    fn eval_aside(&mut self, tokens: Vec<Token>, at: &SourcePos) -> Result<i32> {
        let saved_state = self.save_line_state();
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_cursor = self.cursor;
        self.cursor = 0;
        self.begin_line();

        let result = self.parse_rule(RuleType::Expr);

        self.tokens = saved_tokens;
        self.cursor = saved_cursor;
        self.restore_line_state(saved_state);

        match result? {
            Some(node) => Ok(node.value),
            None => Err(AsmError::new(
                ErrorKind::Syntax,
                "expected expression after .while",
                at.clone(),
            )),
        }
    }
}

/// Text after the `.while` keyword on its line.
fn strip_while_prefix(line: &str) -> String {
    let lower = line.to_ascii_lowercase();
    match lower.find(".while") {
        Some(at) => line[at + ".while".len()..].trim().to_string(),
        None => String::new(),
    }
}

/// Appends literal tokens for `value` (parenthesized negation when
/// negative) positioned at the replaced token.
fn push_literal(out: &mut Vec<Token>, value: i32, at: &Token) {
    let make = |kind: TokenKind, text: &str| {
        let mut tok = Token::new(kind, text, at.pos.clone(), at.col);
        tok.start = false;
        tok
    };
    if value < 0 {
        out.push(make(TokenKind::LParen, "("));
        out.push(make(TokenKind::Minus, "-"));
        out.push(make(TokenKind::DecNum, &value.unsigned_abs().to_string()));
        out.push(make(TokenKind::RParen, ")"));
    } else {
        let mut tok = make(TokenKind::DecNum, &value.to_string());
        tok.start = at.start;
        out.push(tok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AsmOptions;

    fn parser_with(source: &str) -> Parser {
        let mut p = Parser::new(AsmOptions::default());
        let lines = p.cache.insert("t.s", source).to_vec();
        let tokens = Lexer::assembler().tokenize(&lines).unwrap();
        p.begin_pass(tokens, 1, false);
        p
    }

    #[test]
    fn strip_while_prefix_extracts_condition() {
        assert_eq!(strip_while_prefix(".while i < 3"), "i < 3");
        assert_eq!(strip_while_prefix("  .WHILE i"), "i");
        assert_eq!(strip_while_prefix("nop"), "");
    }

    #[test]
    fn freeze_vars_replaces_references_not_targets() {
        let mut p = parser_with("nop\n");
        p.vars.assign_var("i", 7, &SourcePos::new("t.s", 1));

        let tokens = Lexer::assembler()
            .tokenize_line(&SourcePos::new("t.s", 2), "i = i + 1")
            .unwrap();
        let frozen = p.freeze_vars(tokens);

        // target `i` kept, reference `i` replaced by 7
        assert_eq!(frozen[0].kind, TokenKind::Sym);
        assert_eq!(frozen[1].kind, TokenKind::Equal);
        assert_eq!(frozen[2].kind, TokenKind::DecNum);
        assert_eq!(frozen[2].text, "7");
    }

    #[test]
    fn freeze_vars_parenthesizes_negatives() {
        let mut p = parser_with("nop\n");
        p.vars.assign_var("n", -2, &SourcePos::new("t.s", 1));

        let tokens = Lexer::assembler()
            .tokenize_line(&SourcePos::new("t.s", 2), ".byte n")
            .unwrap();
        let frozen = p.freeze_vars(tokens);
        let kinds: Vec<_> = frozen.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Byte,
                TokenKind::LParen,
                TokenKind::Minus,
                TokenKind::DecNum,
                TokenKind::RParen,
                TokenKind::Eol
            ]
        );
    }

    #[test]
    fn do_loop_expands_flat_and_advances_pc_once_per_iteration() {
        let source = ".var i = 0\n.do\n.byte i\ni = i + 1\n.while i < 3\nrts\n";
        let mut p = parser_with(source);
        let lines = p.parse_lines().unwrap();

        // three iterations of one byte each, plus the rts
        assert_eq!(p.pc, p.org + 4);
        assert!(lines.iter().any(|l| l.value == 6)); // the rts line parsed

        // the expansion is flat: no loop directives remain in the stream
        assert!(!p.tokens.iter().any(|t| t.kind == TokenKind::Do));
        assert!(!p.tokens.iter().any(|t| t.kind == TokenKind::While));
    }

    #[test]
    fn do_loop_respects_condition_value() {
        // body runs exactly once when the condition is already false
        let source = ".var i = 9\n.do\nnop\n.while i < 3\n";
        let mut p = parser_with(source);
        p.parse_lines().unwrap();
        assert_eq!(p.pc, p.org + 1);
    }

    #[test]
    fn missing_while_is_a_syntax_error() {
        let source = ".do\nnop\n";
        let mut p = parser_with(source);
        let err = p.parse_lines().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains(".while"));
    }

    #[test]
    fn nested_loops_expand_inside_outer_iterations() {
        let source = "\
.var i = 0
.do
.var j = 0
.do
.byte i + j
j = j + 1
.while j < 2
i = i + 1
.while i < 2
";
        let mut p = parser_with(source);
        p.parse_lines().unwrap();
        // 2 outer x 2 inner bytes
        assert_eq!(p.pc, p.org + 4);
        assert!(!p.tokens.iter().any(|t| t.kind == TokenKind::Do));
    }
}
