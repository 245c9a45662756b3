//! # sixfive-lang
//!
//! The 6502 / 65C02 assembly language front end.
//!
//! This crate turns source text into a fully resolved AST in which every
//! operand carries its numeric value and every instruction node knows its
//! program counter and addressing mode. The pipeline:
//!
//! ```text
//! source lines
//!      │  pattern-table lexer (one Eol per line)
//!      ▼
//! token stream ── re-seeded every pass; expansions edit it in place
//!      │  data-driven grammar engine + rule set
//!      ▼
//! AST + symbol tables ── repeat until fixpoint (Assembler)
//!      │
//!      ▼
//! resolved AST  →  sixfive-emit
//! ```
//!
//! The interesting coupling is between addressing-mode selection and
//! symbol resolution: a forward reference may shrink from absolute to
//! zero page between passes, moving every later label, which is why the
//! driver iterates to a fixpoint and why operand range errors are
//! deferred to a final confirmation pass.
//!
//! # Example
//!
//! ```
//! use sixfive_lang::{AsmOptions, Assembler};
//!
//! let mut asm = Assembler::new(AsmOptions::default());
//! asm.add_source("demo.s", "start: lda #$01\n sta $0400\n jmp start\n");
//! let ast = asm.assemble().unwrap();
//!
//! assert_eq!(asm.parser().globals.get("start").unwrap().value, 0x1000);
//! assert!(ast.dump().contains("OpImmediate"));
//! ```

pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod loops;
pub mod macros;
pub mod modes;
pub mod opcode;
pub mod parser;
pub mod passes;
pub mod rules;
pub mod sym;
pub mod symtab;
pub mod token;

pub use ast::{AstNode, NodeArg, RuleType};
pub use lexer::Lexer;
pub use macros::MacroDefinition;
pub use opcode::{opcode_info, opcode_table, AddrMode, OpCodeInfo};
pub use parser::{AsmOptions, Parser, DEFAULT_ORIGIN};
pub use passes::{Assembler, MAX_PASSES};
pub use sym::Sym;
pub use symtab::SymbolTable;
pub use token::{Token, TokenKind};
