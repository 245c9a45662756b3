//! Shared helpers for the assembler integration tests.

use sixfive_base::AsmError;
use sixfive_emit::{emit, ListingRow, ObjectImage};
use sixfive_lang::{AsmOptions, Assembler, AstNode};

/// Assembles one in-memory source to an image and listing.
pub fn assemble(source: &str) -> (ObjectImage, Vec<ListingRow>) {
    try_assemble(source).expect("assembly should succeed")
}

/// Assembles and returns the raw bytes.
pub fn assemble_bytes(source: &str) -> Vec<u8> {
    assemble(source).0.bytes
}

pub fn try_assemble(source: &str) -> Result<(ObjectImage, Vec<ListingRow>), AsmError> {
    try_assemble_with(source, AsmOptions::default()).map(|(image, rows, _)| (image, rows))
}

pub fn try_assemble_with(
    source: &str,
    options: AsmOptions,
) -> Result<(ObjectImage, Vec<ListingRow>, AstNode), AsmError> {
    let mut asm = Assembler::new(options);
    asm.add_source("test.s", source);
    let ast = asm.assemble()?;
    let (image, rows) = emit(&ast, asm.origin(), asm.cache())?;
    Ok((image, rows, ast))
}
