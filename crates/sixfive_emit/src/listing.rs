//! Listing rows and their textual rendering.
//!
//! A [`ListingRow`] pairs one source line (or wrap continuation) with its
//! program counter, up to three emitted bytes, and the normalized
//! assembly text. Rendering groups rows by file with `Processing` /
//! `Resuming` headers, matching the shape:
//!
//! ```text
//! Processing demo.s
//!
//!   1) $1000: $A9 $01      lda #$01        start: lda #$01 ; comment
//! ```

use std::collections::BTreeSet;
use std::fmt::Write;

use sixfive_base::{SourcePos, Style};

/// One row of the listing.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub pos: SourcePos,
    pub pc: i32,
    /// At most three bytes; longer lines wrap onto synthetic rows.
    pub bytes: Vec<u8>,
    /// Normalized assembly text (empty on wrap rows and non-code lines).
    pub asm: String,
    /// Original source text (empty on wrap rows).
    pub source: String,
}

/// Width of the byte column: three `$xx` groups.
const BYTES_WIDTH: usize = 13;
/// Width of the normalized assembly column.
const ASM_WIDTH: usize = 18;

/// Renders the listing, colorized for the terminal.
pub fn format_listing(rows: &[ListingRow]) -> String {
    let mut out = String::new();
    let mut current_file = String::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for row in rows {
        if row.pos.file != current_file {
            current_file = row.pos.file.clone();
            let prefix = if seen.contains(&current_file) {
                "Resuming"
            } else {
                "Processing"
            };
            seen.insert(current_file.clone());
            let _ = writeln!(
                out,
                "\n{} {}\n",
                Style::bold_white(prefix),
                Style::bold_white(&current_file)
            );
        }
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

fn format_row(row: &ListingRow) -> String {
    let mut line = format!("{:>4}) ", row.pos.line);

    if row.bytes.is_empty() {
        line.push_str(&" ".repeat(7 + BYTES_WIDTH + ASM_WIDTH));
    } else {
        line.push_str(&Style::green(&format!("${:04X}: ", row.pc as u16)));
        let mut bytes = String::new();
        for byte in &row.bytes {
            let _ = write!(bytes, "${:02X} ", byte);
        }
        line.push_str(&Style::yellow(&pad(&bytes, BYTES_WIDTH)));
        line.push_str(&Style::cyan(&pad(&row.asm, ASM_WIDTH)));
    }

    line.push_str(&row.source);
    line
}

fn pad(text: &str, width: usize) -> String {
    let mut out = text.to_string();
    while out.len() < width {
        out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: u32, pc: i32, bytes: Vec<u8>, asm: &str, source: &str) -> ListingRow {
        ListingRow {
            pos: SourcePos::new("demo.s", line),
            pc,
            bytes,
            asm: asm.to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn listing_starts_with_processing_header() {
        let rows = vec![row(1, 0x1000, vec![0xEA], "nop", "nop")];
        let text = format_listing(&rows);
        assert!(text.contains("Processing"));
        assert!(text.contains("demo.s"));
    }

    #[test]
    fn code_row_shows_pc_bytes_and_asm() {
        let rows = vec![row(3, 0x1000, vec![0xA9, 0x01], "lda #$01", "lda #$01")];
        let text = format_listing(&rows);
        assert!(text.contains("$1000:"));
        assert!(text.contains("$A9 $01"));
        assert!(text.contains("lda #$01"));
        assert!(text.contains("   3) "));
    }

    #[test]
    fn non_code_row_keeps_source_only() {
        let rows = vec![row(2, 0x1000, vec![], "", "; banner comment")];
        let text = format_listing(&rows);
        assert!(text.contains("; banner comment"));
        assert!(!text.contains("$1000:"));
    }

    #[test]
    fn file_switch_emits_resuming_header() {
        let mut rows = vec![row(1, 0x1000, vec![0xEA], "nop", "nop")];
        rows.push(ListingRow {
            pos: SourcePos::new("lib.s", 1),
            pc: 0x1001,
            bytes: vec![0x60],
            asm: "rts".into(),
            source: "rts".into(),
        });
        rows.push(row(2, 0x1002, vec![0xEA], "nop", "nop"));
        let text = format_listing(&rows);
        assert!(text.contains("Processing"));
        assert!(text.contains("Resuming"));
    }
}
