//! Driver: orchestrates one assembly run.
//!
//! Reads the source files in argument order, runs the pass driver to the
//! fixpoint, then emits. On success the driver prints the symbol table
//! and the listing, and writes the object image when `-o` was given. Any
//! error is rendered with its source excerpt and bubbles to `main`,
//! which exits 1. No output file is written on a failed run.

use std::time::Instant;

use sixfive_base::{AsmError, SourceCache, Style};
use sixfive_emit::{emit, format_listing};
use sixfive_lang::{opcode_table, AsmOptions, Assembler};

use crate::cli::Cli;

pub fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.list_opcodes {
        print!("{}", opcode_dump());
        return Ok(());
    }
    if cli.files.is_empty() {
        return Err("no input files".into());
    }

    let options = AsmOptions {
        c65c02: cli.c65c02,
        illegal: cli.illegal,
        nowarn: cli.nowarn,
        verbose: cli.verbose,
        include_dirs: cli.include_dirs.clone(),
    };

    let mut asm = Assembler::new(options);
    for file in &cli.files {
        if let Err(e) = asm.add_file(file) {
            return Err(render(&e, asm.cache()).into());
        }
    }

    if cli.verbose {
        asm.on_symbol_change(Box::new(|sym| {
            println!("symbol changed:\n{}", sym.dump());
        }));
    }

    let started = Instant::now();
    let ast = match asm.assemble() {
        Ok(ast) => ast,
        Err(e) => return Err(render(&e, asm.cache()).into()),
    };
    if cli.verbose {
        println!(
            "{}",
            Style::cyan(&format!("assembled in {:.3}s", started.elapsed().as_secs_f64()))
        );
    }

    if cli.ast {
        print!("{}", ast.dump());
    }

    let (image, rows) = match emit(&ast, asm.origin(), asm.cache()) {
        Ok(output) => output,
        Err(e) => return Err(render(&e, asm.cache()).into()),
    };

    print!("{}", symbol_dump(&asm));
    print!("{}", format_listing(&rows));

    if let Some(path) = &cli.output {
        let written = image.write_to(path, cli.c64)?;
        println!("\n{} bytes written to {}", written, path.display());
    }
    Ok(())
}

fn render(err: &AsmError, cache: &SourceCache) -> String {
    err.render(cache)
}

/// The symbol table dump printed above the listing: every referenced
/// label and equate with its value.
fn symbol_dump(asm: &Assembler) -> String {
    let mut out = String::new();
    out.push_str(&Style::blue("================="));
    out.push_str(&Style::green(" Symbol Table "));
    out.push_str(&Style::blue("=================\n"));
    for sym in asm.parser().globals.iter() {
        if sym.is_macro || sym.accessed.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "{}{}\n",
            Style::green(&format!("{:<20}", sym.name)),
            Style::yellow(&format!("${:04X}", sym.value as u16)),
        ));
    }
    out
}

/// The `--list-opcodes` table: mnemonic, description, and one row per
/// addressing mode.
fn opcode_dump() -> String {
    let mut out = String::new();
    for info in opcode_table().values() {
        out.push_str(&format!(
            "{}\n{}\n\n",
            Style::blue(info.mnemonic),
            info.description
        ));
        out.push_str(&format!(
            "{}{}{}\n",
            Style::yellow(&format!("{:<20}", "MODE")),
            Style::green("OPCODE"),
            Style::cyan(&format!("{:>10}", "CYCLES")),
        ));
        out.push_str("------------------------------------\n");
        for (mode, (byte, cycles)) in &info.modes {
            out.push_str(&format!(
                "{}{}{}\n",
                Style::yellow(&format!("{:<20}", mode.name())),
                Style::green(&format!("${:02X}", byte)),
                Style::cyan(&format!("{:>10}", cycles)),
            ));
        }
        out.push('\n');
    }
    out
}
