//! sixfive: a multi-pass 6502 / 65C02 assembler.
//!
//! This crate is the command-line application; the assembler itself lives
//! in the workspace libraries:
//!
//! - `sixfive-base` — source positions, errors, source cache, styling
//! - `sixfive-lang` — lexer, grammar engine, symbol resolution, passes
//! - `sixfive-emit` — object image and listing generation
//!
//! The modules here wire those libraries to the terminal: [`cli`] defines
//! the flag surface and [`driver`] orchestrates a run (read sources,
//! assemble, emit, write).

pub mod cli;
pub mod driver;
