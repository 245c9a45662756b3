//! Symbol metadata.
//!
//! A [`Sym`] tracks everything the multi-pass resolver needs to decide
//! whether another pass is required: the current value, whether it has
//! ever been initialized, whether it changed during the current pass, and
//! every source position that referenced it (used both for diagnostics
//! and to detect that a freshly defined symbol had earlier placeholder
//! reads).

use std::collections::BTreeSet;

use sixfive_base::SourcePos;

/// One symbol table entry.
///
/// A symbol is **resolved** when `initialized` is true and `changed` is
/// false at the end of a pass.
#[derive(Debug, Clone, Default)]
pub struct Sym {
    /// Name as written in the source; lookup uses the uppercased form.
    pub name: String,
    pub value: i32,
    /// Every position that read this symbol.
    pub accessed: BTreeSet<SourcePos>,
    /// False while the symbol is only a forward-reference placeholder.
    pub initialized: bool,
    /// Value moved during the current pass (or is awaiting confirmation).
    pub changed: bool,
    /// Defined during the current pass; guards duplicate definitions.
    pub defined_in_pass: bool,
    /// True for labels (value tracks the program counter), false for equates.
    pub is_pc: bool,
    pub is_macro: bool,
    pub is_var: bool,
    /// Position of the definition, for diagnostics.
    pub created: SourcePos,
}

impl Sym {
    pub fn named(name: impl Into<String>) -> Self {
        Sym {
            name: name.into(),
            ..Sym::default()
        }
    }

    /// Resolved means initialized and stable in the current pass.
    pub fn is_resolved(&self) -> bool {
        self.initialized && !self.changed
    }

    /// Multi-line dump used by the verbose symbol-change trace.
    pub fn dump(&self) -> String {
        let created = if self.created.is_unknown() {
            String::new()
        } else {
            format!("{}", self.created)
        };
        let mut out = format!(
            "name:        {}\nvalue:       ${:04X}\ninitialized: {}\ncreated:     {}\nchanged:     {}\nisMacro:     {}\nisVar:       {}\nisPC:        {}\naccessed:\n",
            self.name,
            self.value as u16,
            self.initialized,
            created,
            self.changed,
            self.is_macro,
            self.is_var,
            self.is_pc,
        );
        for access in &self.accessed {
            out.push_str(&format!("  [{}]\n", access));
        }
        out
    }
}
