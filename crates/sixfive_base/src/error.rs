//! Error types with source location tracking.
//!
//! Every user-facing error in sixfive carries a [`SourcePos`] and one of a
//! fixed set of [`ErrorKind`]s. The position lets [`AsmError::render`]
//! attach a highlighted source excerpt from the [`SourceCache`] without
//! re-opening any file.
//!
//! Most kinds abort the run as soon as they are raised. The exception is
//! [`ErrorKind::OperandOutOfRange`]: operand widths depend on symbol
//! values that may still be moving between passes, so range errors are
//! suppressed until the resolver runs its confirmation pass.
//!
//! # Example
//!
//! ```
//! use sixfive_base::{AsmError, ErrorKind, Result, SourcePos};
//!
//! fn check_byte(value: i32, pos: SourcePos) -> Result<u8> {
//!     u8::try_from(value).map_err(|_| {
//!         AsmError::new(
//!             ErrorKind::OperandOutOfRange,
//!             format!("value {} does not fit in a byte", value),
//!             pos,
//!         )
//!     })
//! }
//!
//! let err = check_byte(700, SourcePos::new("a.s", 3)).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::OperandOutOfRange);
//! ```

use std::fmt;

use crate::source::SourceCache;
use crate::span::SourcePos;
use crate::style::Style;

/// Lines of context shown on each side of the offending line.
const EXCERPT_RADIUS: u32 = 3;

/// Classification of assembler failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No lexer pattern matches at the current input position.
    Lexical,
    /// No grammar production matches a required non-terminal.
    Syntax,
    /// Mnemonic not present in the opcode table (or gated off by CPU flags).
    UnknownOpcode,
    /// Mnemonic does not accept the matched syntactic shape.
    UnsupportedAddressingMode,
    /// Operand exceeds its 8- or 16-bit bounds, or a branch target is too far.
    OperandOutOfRange,
    /// Label defined twice with different program counter values.
    DuplicateDefinition,
    /// Symbol still undefined after the final pass.
    UnresolvedSymbol,
    /// Local symbol still undefined when its scope ended.
    UnresolvedLocal,
    /// Constant-folded division or modulo by zero.
    DivisionByZero,
    /// A macro expands itself, directly or indirectly.
    MacroRecursion,
    /// An `.include` chain revisits a file already being included.
    IncludeCycle,
    /// An `.include` target could not be found.
    IncludeNotFound,
    /// `.do`/`.while` exceeded the iteration cap.
    IterationLimit,
    /// File system failure in the driver.
    Io,
}

impl ErrorKind {
    /// Short human-readable label used in rendered messages.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::UnknownOpcode => "unknown opcode",
            ErrorKind::UnsupportedAddressingMode => "unsupported addressing mode",
            ErrorKind::OperandOutOfRange => "operand out of range",
            ErrorKind::DuplicateDefinition => "duplicate definition",
            ErrorKind::UnresolvedSymbol => "unresolved symbol",
            ErrorKind::UnresolvedLocal => "unresolved local symbol",
            ErrorKind::DivisionByZero => "division by zero",
            ErrorKind::MacroRecursion => "recursive macro",
            ErrorKind::IncludeCycle => "include cycle",
            ErrorKind::IncludeNotFound => "include not found",
            ErrorKind::IterationLimit => "iteration limit exceeded",
            ErrorKind::Io => "i/o error",
        }
    }
}

/// An assembler error annotated with its source location.
#[derive(Debug, Clone)]
pub struct AsmError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: SourcePos,
}

impl AsmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            kind,
            message: message.into(),
            pos,
        }
    }

    /// Renders the error with a highlighted source excerpt.
    ///
    /// The excerpt covers up to three lines on each side of the offending
    /// line; files never cached (e.g. i/o failures before read) render
    /// without one.
    pub fn render(&self, cache: &SourceCache) -> String {
        let mut out = format!(
            "{}: {}",
            Style::bold_red(self.kind.label()),
            self.message
        );
        if !self.pos.is_unknown() {
            out.push_str(&format!(" [{} {}]", self.pos.file, self.pos.line));
            out.push_str(&cache.excerpt(&self.pos, EXCERPT_RADIUS));
        }
        out
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pos.is_unknown() {
            write!(f, "{}: {}", self.kind.label(), self.message)
        } else {
            write!(f, "{}: {} at {}", self.kind.label(), self.message, self.pos)
        }
    }
}

impl std::error::Error for AsmError {}

/// Alias for `std::result::Result<T, AsmError>`.
pub type Result<T> = std::result::Result<T, AsmError>;
