//! Cached source lines for diagnostics, listings, and re-tokenization.
//!
//! Files are read exactly once, at the time the driver (or an `.include`
//! directive) first asks for them. Everything downstream — error excerpts,
//! listing source columns, macro and loop body extraction — works from the
//! cache, never from the filesystem. This keeps diagnostics correct even
//! if a file changes on disk mid-run, and lets unit tests feed synthetic
//! "files" without touching disk at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::span::SourcePos;

/// Append-only cache mapping filename to its numbered source lines.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: BTreeMap<String, Vec<(SourcePos, String)>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a file from disk into the cache and returns its lines.
    ///
    /// Re-reading an already cached file returns the cached copy.
    pub fn read_file(&mut self, path: &Path) -> std::io::Result<&[(SourcePos, String)]> {
        let key = path.to_string_lossy().into_owned();
        if !self.files.contains_key(&key) {
            let text = fs::read_to_string(path)?;
            let lines = number_lines(&key, &text);
            self.files.insert(key.clone(), lines);
        }
        Ok(self.files.get(&key).unwrap())
    }

    /// Inserts pre-numbered lines for a logical filename.
    ///
    /// Used by tests and by callers that already hold file contents.
    pub fn insert(&mut self, name: impl Into<String>, text: &str) -> &[(SourcePos, String)] {
        let key = name.into();
        let lines = number_lines(&key, text);
        self.files.entry(key.clone()).or_insert(lines);
        self.files.get(&key).unwrap()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn lines(&self, name: &str) -> Option<&[(SourcePos, String)]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Returns the text of a single source line, if cached.
    pub fn line_text(&self, pos: &SourcePos) -> Option<&str> {
        let lines = self.files.get(&pos.file)?;
        let idx = (pos.line as usize).checked_sub(1)?;
        lines.get(idx).map(|(_, text)| text.as_str())
    }

    /// Renders an excerpt of `radius` lines around `pos`, with the line at
    /// `pos` highlighted. Used by error reporting.
    pub fn excerpt(&self, pos: &SourcePos, radius: u32) -> String {
        use crate::style::Style;

        let Some(lines) = self.files.get(&pos.file) else {
            return String::new();
        };
        let first = pos.line.saturating_sub(radius).max(1);
        let last = (pos.line + radius).min(lines.len() as u32);

        let mut out = String::new();
        for n in first..=last {
            let Some((_, text)) = lines.get(n as usize - 1) else {
                break;
            };
            let number = format!("{:>4} ", n);
            out.push('\n');
            out.push_str(&Style::blue(&number));
            if n == pos.line {
                out.push_str(&Style::bold_red(text));
            } else {
                out.push_str(text);
            }
        }
        out.push('\n');
        out
    }
}

fn number_lines(file: &str, text: &str) -> Vec<(SourcePos, String)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (SourcePos::new(file, i as u32 + 1), line.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_numbers_lines_from_one() {
        let mut cache = SourceCache::new();
        let lines = cache.insert("t.s", "nop\nrts\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, SourcePos::new("t.s", 1));
        assert_eq!(lines[1].1, "rts");
    }

    #[test]
    fn line_text_looks_up_by_position() {
        let mut cache = SourceCache::new();
        cache.insert("t.s", "one\ntwo\nthree\n");
        assert_eq!(cache.line_text(&SourcePos::new("t.s", 2)), Some("two"));
        assert_eq!(cache.line_text(&SourcePos::new("t.s", 9)), None);
        assert_eq!(cache.line_text(&SourcePos::new("missing.s", 1)), None);
    }

    #[test]
    fn excerpt_includes_surrounding_lines() {
        let mut cache = SourceCache::new();
        cache.insert("t.s", "a\nb\nc\nd\ne\nf\ng\n");
        let snippet = cache.excerpt(&SourcePos::new("t.s", 4), 2);
        assert!(snippet.contains('b'));
        assert!(snippet.contains('f'));
        assert!(!snippet.contains('a'));
        assert!(snippet.contains("\x1b[31m"));
    }

    #[test]
    fn excerpt_clamps_at_file_start() {
        let mut cache = SourceCache::new();
        cache.insert("t.s", "a\nb\n");
        let snippet = cache.excerpt(&SourcePos::new("t.s", 1), 3);
        assert!(snippet.contains('a'));
        assert!(snippet.contains('b'));
    }

    #[test]
    fn insert_does_not_overwrite_existing_entry() {
        let mut cache = SourceCache::new();
        cache.insert("t.s", "first\n");
        cache.insert("t.s", "second\n");
        assert_eq!(cache.line_text(&SourcePos::new("t.s", 1)), Some("first"));
    }
}
