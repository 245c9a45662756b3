//! Command-line interface for the sixfive assembler.

use std::path::PathBuf;

use clap::Parser;

use crate::driver;

#[derive(Parser)]
#[command(name = "sixfive")]
#[command(about = "Multi-pass 6502 / 65C02 assembler", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source files, concatenated in order.
    pub files: Vec<PathBuf>,

    /// Print pass traces, token dumps, and symbol changes.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the resolved AST.
    #[arg(long)]
    pub ast: bool,

    /// Write the object image to this path.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Prepend a two-byte little-endian load address equal to the origin.
    #[arg(long)]
    pub c64: bool,

    /// Suppress the local/global symbol shadowing warning.
    #[arg(long)]
    pub nowarn: bool,

    /// Accept 65C02-only mnemonics.
    #[arg(long)]
    pub c65c02: bool,

    /// Accept undocumented (illegal) opcodes.
    #[arg(long)]
    pub illegal: bool,

    /// List every mnemonic with its modes, opcode bytes, and cycles.
    #[arg(long)]
    pub list_opcodes: bool,

    /// Extra directories searched by .include.
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,
}

/// Entry point for the CLI.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    driver::run(&cli)
}
