//! # sixfive-base
//!
//! Structural atoms for the sixfive assembler.
//!
//! This crate provides the foundational types used throughout sixfive:
//!
//! - [`SourcePos`] — Source location tracking (file + 1-based line)
//! - [`AsmError`]/[`ErrorKind`]/[`Result`] — Errors with source positions
//! - [`SourceCache`] — Cached source lines for diagnostics and listings
//! - [`Style`] — ANSI terminal styling
//!
//! # Design Principles
//!
//! This crate has **no knowledge of 6502 syntax or code generation**. It
//! provides only generic, reusable infrastructure that the language and
//! emission crates build upon.
//!
//! # Example
//!
//! ```
//! use sixfive_base::{AsmError, ErrorKind, SourcePos};
//!
//! let pos = SourcePos::new("main.s", 12);
//! let err = AsmError::new(ErrorKind::UnknownOpcode, "unknown opcode 'LDQ'", pos);
//!
//! assert!(err.to_string().contains("main.s"));
//! ```

pub mod error;
pub mod source;
pub mod span;
pub mod style;

pub use error::{AsmError, ErrorKind, Result};
pub use source::SourceCache;
pub use span::SourcePos;
pub use style::Style;
