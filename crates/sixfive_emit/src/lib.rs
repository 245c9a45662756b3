//! # sixfive-emit
//!
//! Code generation for the sixfive assembler.
//!
//! Input: the resolved AST from `sixfive-lang`, in which every operand
//! value and program counter is final. Output: the raw [`ObjectImage`]
//! and the annotated listing ([`ListingRow`]s keyed by source position).
//!
//! # Example
//!
//! ```
//! use sixfive_lang::{AsmOptions, Assembler};
//! use sixfive_emit::emit;
//!
//! let mut asm = Assembler::new(AsmOptions::default());
//! asm.add_source("demo.s", "lda #$01\n sta $0400\n");
//! let ast = asm.assemble().unwrap();
//!
//! let (image, rows) = emit(&ast, asm.origin(), asm.cache()).unwrap();
//! assert_eq!(image.bytes, vec![0xA9, 0x01, 0x8D, 0x00, 0x04]);
//! assert_eq!(rows.len(), 2);
//! ```

pub mod emitter;
pub mod image;
pub mod listing;

pub use emitter::emit;
pub use image::ObjectImage;
pub use listing::{format_listing, ListingRow};
