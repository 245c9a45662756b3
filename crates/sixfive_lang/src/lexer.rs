//! Pattern-table lexer.
//!
//! The lexer is driven entirely by an ordered list of
//! `(TokenKind, pattern)` pairs compiled to case-insensitive anchored
//! regular expressions. At each input position every pattern is tried and
//! the **longest** match wins; equal lengths break toward the earlier
//! table entry. The combination keeps the ~110-entry mnemonic table
//! declarative: `AND` beats the symbol pattern on the tie for `and`, while
//! `andy` lexes as a symbol because the symbol match is longer.
//!
//! One [`TokenKind::Eol`] token is emitted per input line so downstream
//! phases can find logical line boundaries by scanning. Whitespace is
//! recognized (it advances the column and clears nothing) but never
//! emitted.

use std::sync::OnceLock;

use regex::Regex;
use sixfive_base::{AsmError, ErrorKind, Result, SourcePos};

use crate::token::{Token, TokenKind, MNEMONICS};

/// A tokenizer built from an ordered pattern table.
pub struct Lexer {
    patterns: Vec<(TokenKind, Regex)>,
}

impl Lexer {
    /// Compiles an ordered `(kind, pattern)` list.
    ///
    /// Patterns are anchored at the current scan position and matched
    /// case-insensitively.
    ///
    /// # Panics
    ///
    /// Panics if a pattern fails to compile; the tables in this crate are
    /// static, so a bad pattern is a programming error.
    pub fn new(patterns: &[(TokenKind, &str)]) -> Self {
        let patterns = patterns
            .iter()
            .map(|(kind, pat)| {
                let regex = Regex::new(&format!("^(?i:{})", pat))
                    .unwrap_or_else(|e| panic!("bad token pattern {:?}: {}", pat, e));
                (*kind, regex)
            })
            .collect();
        Self { patterns }
    }

    /// The shared assembler lexer with the full pattern table.
    pub fn assembler() -> &'static Lexer {
        static LEXER: OnceLock<Lexer> = OnceLock::new();
        LEXER.get_or_init(|| Lexer::new(&assembler_patterns()))
    }

    /// Tokenizes one source line, appending exactly one `Eol` token.
    pub fn tokenize_line(&self, pos: &SourcePos, input: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut at = 0usize;
        let mut col = 1usize;
        let mut first = true;

        while at < input.len() {
            let rest = &input[at..];
            let mut best: Option<(TokenKind, usize)> = None;
            for (kind, regex) in &self.patterns {
                if let Some(m) = regex.find(rest) {
                    let len = m.end();
                    if len > 0 && best.map_or(true, |(_, blen)| len > blen) {
                        best = Some((*kind, len));
                    }
                }
            }

            let Some((kind, len)) = best else {
                return Err(AsmError::new(
                    ErrorKind::Lexical,
                    format!("unrecognized input at column {}", col),
                    pos.clone(),
                ));
            };

            if kind != TokenKind::Ws {
                let mut tok = Token::new(kind, &rest[..len], pos.clone(), col);
                tok.start = first;
                first = false;
                tokens.push(tok);
            }
            at += len;
            col += len;
        }

        tokens.push(Token::new(TokenKind::Eol, "\n", pos.clone(), col));
        Ok(tokens)
    }

    /// Tokenizes a sequence of (position, text) lines.
    ///
    /// Used both for whole-file input and for re-tokenizing macro and
    /// loop bodies.
    pub fn tokenize(&self, lines: &[(SourcePos, String)]) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        for (pos, text) in lines {
            tokens.extend(self.tokenize_line(pos, text)?);
        }
        Ok(tokens)
    }
}

/// The full assembler pattern table, in matching order.
fn assembler_patterns() -> Vec<(TokenKind, &'static str)> {
    let mut table: Vec<(TokenKind, &'static str)> = vec![
        (TokenKind::Ws, r"[ \t\r]+"),
        (TokenKind::Comment, r";[^\n]*"),
        // Directives
        (TokenKind::Org, r"\.org"),
        (TokenKind::Byte, r"\.byte"),
        (TokenKind::Word, r"\.word"),
        (TokenKind::Macro, r"\.macro"),
        (TokenKind::EndMacro, r"\.endm"),
        (TokenKind::Include, r"\.include"),
        (TokenKind::If, r"\.if"),
        (TokenKind::Else, r"\.else"),
        (TokenKind::Endif, r"\.endif"),
        (TokenKind::Var, r"\.var"),
        (TokenKind::Do, r"\.do"),
        (TokenKind::While, r"\.while"),
    ];

    // Mnemonics precede registers and symbols so equal-length ties
    // resolve toward the instruction.
    table.extend(MNEMONICS.iter().map(|(kind, spelling)| (*kind, *spelling)));

    table.extend([
        (TokenKind::A, r"A"),
        (TokenKind::X, r"X"),
        (TokenKind::Y, r"Y"),
        (TokenKind::HexNum, r"\$[0-9A-Fa-f]+"),
        (TokenKind::BinNum, r"%[01]+"),
        (TokenKind::DecNum, r"[0-9]+"),
        (TokenKind::CharLit, r"'(\\.|[^'\\])'"),
        (TokenKind::Text, r#""(\\.|[^"\\])*""#),
        (TokenKind::LocalSym, r"@[A-Za-z_][A-Za-z0-9_]*"),
        (TokenKind::Sym, r"[A-Za-z_][A-Za-z0-9_]*"),
        (TokenKind::MacroParam, r"\\[1-9][0-9]*"),
        (TokenKind::Shl, r"<<"),
        (TokenKind::Shr, r">>"),
        (TokenKind::Le, r"<="),
        (TokenKind::Ge, r">="),
        (TokenKind::EqEq, r"=="),
        (TokenKind::NotEq, r"!="),
        (TokenKind::AndAnd, r"&&"),
        (TokenKind::OrOr, r"\|\|"),
        (TokenKind::Lt, r"<"),
        (TokenKind::Gt, r">"),
        (TokenKind::Plus, r"\+"),
        (TokenKind::Minus, r"-"),
        (TokenKind::Star, r"\*"),
        (TokenKind::Slash, r"/"),
        (TokenKind::Percent, r"%"),
        (TokenKind::Tilde, r"~"),
        (TokenKind::Amp, r"&"),
        (TokenKind::Pipe, r"\|"),
        (TokenKind::Caret, r"\^"),
        (TokenKind::LParen, r"\("),
        (TokenKind::RParen, r"\)"),
        (TokenKind::Comma, r","),
        (TokenKind::Pound, r"#"),
        (TokenKind::Equal, r"="),
        (TokenKind::Colon, r":"),
    ]);

    table
}
