//! Symbol stores with change tracking.
//!
//! Three [`SymbolTable`] instances exist per assembly run: global
//! labels/equates, scoped locals, and `.var` variables. Lookup is
//! case-insensitive (keys are uppercased; the original spelling is kept in
//! the [`Sym`] for diagnostics).
//!
//! ## The `changes` counter
//!
//! Every *meaningful* mutation bumps `changes` and notifies the registered
//! listeners: a value that actually moved, and — deliberately — the
//! transition of a symbol's `changed` flag back to false when a later pass
//! re-defines it with the same value. That confirmation event is what
//! forces the pass driver to run one more pass after values stop moving,
//! which is the hysteresis that keeps zero-page narrowing from oscillating:
//! only a pass that starts and ends with `changes == 0` may treat operand
//! ranges as final.
//!
//! Reference bookkeeping (recording access positions, creating forward
//! placeholders) does not count as a change.

use std::collections::BTreeMap;

use sixfive_base::{AsmError, ErrorKind, Result, SourcePos};

use crate::sym::Sym;

/// Callback invoked whenever a symbol meaningfully changes.
pub type ChangeListener = Box<dyn FnMut(&Sym)>;

/// Unresolved view: symbol name plus every recorded access position.
pub type UnresolvedList = Vec<(String, std::collections::BTreeSet<SourcePos>)>;

/// A name → [`Sym`] store with change tracking and listeners.
#[derive(Default)]
pub struct SymbolTable {
    map: BTreeMap<String, Sym>,
    /// Bumped on every meaningful mutation; reset at pass start.
    pub changes: u32,
    listeners: Vec<ChangeListener>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uppercase normalization used for every lookup.
    pub fn normalize(name: &str) -> String {
        name.to_ascii_uppercase()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.changes = 0;
    }

    /// Starts a new pass: zero the change counter and drop the per-pass
    /// definition marks.
    pub fn begin_pass(&mut self) {
        self.changes = 0;
        for sym in self.map.values_mut() {
            sym.defined_in_pass = false;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&Self::normalize(name))
    }

    pub fn get(&self, name: &str) -> Option<&Sym> {
        self.map.get(&Self::normalize(name))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sym> {
        self.map.values()
    }

    /// Registers a change listener. Signature: `FnMut(&Sym)`.
    pub fn on_change(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    fn notify(&mut self, key: &str) {
        self.changes += 1;
        if let Some(sym) = self.map.get(key) {
            for listener in &mut self.listeners {
                listener(sym);
            }
        }
    }

    /// Records a read of `name` at `pos`, creating a forward-reference
    /// placeholder (value 0, uninitialized) if the symbol does not exist.
    /// Returns the current value.
    pub fn reference(&mut self, name: &str, pos: &SourcePos) -> i32 {
        let key = Self::normalize(name);
        let sym = self
            .map
            .entry(key)
            .or_insert_with(|| Sym::named(name));
        sym.accessed.insert(pos.clone());
        sym.value
    }

    /// Defines `name` as a label at the current program counter.
    ///
    /// Implements the per-pass label lifecycle: duplicate definitions at a
    /// different PC in one pass are fatal; a moved value marks the symbol
    /// changed; a re-definition at the same value confirms it (clearing
    /// `changed` and notifying so the driver schedules the confirmation
    /// pass). Equate symbols (`is_pc == false`) keep their value.
    ///
    /// Returns the symbol's value after the definition.
    pub fn define_label(&mut self, name: &str, pc: i32, pos: &SourcePos) -> Result<i32> {
        let key = Self::normalize(name);

        if !self.map.contains_key(&key) {
            let mut sym = Sym::named(name);
            sym.is_pc = true;
            sym.initialized = true;
            sym.value = pc;
            sym.defined_in_pass = true;
            sym.created = pos.clone();
            self.map.insert(key, sym);
            return Ok(pc);
        }

        let sym = self.map.get_mut(&key).unwrap();
        if sym.defined_in_pass {
            if sym.is_pc && sym.value != pc {
                return Err(AsmError::new(
                    ErrorKind::DuplicateDefinition,
                    format!("symbol '{}' is already defined", sym.name),
                    pos.clone(),
                ));
            }
            return Ok(sym.value);
        }

        sym.defined_in_pass = true;
        if sym.created.is_unknown() {
            sym.created = pos.clone();
        }
        if !sym.initialized {
            // First definition of a symbol that already has placeholder
            // reads: every one of them saw 0, so another pass is needed.
            sym.is_pc = true;
            sym.initialized = true;
            sym.value = pc;
            sym.changed = !sym.accessed.is_empty();
            let moved = sym.changed;
            if moved {
                self.notify(&key);
            }
            return Ok(pc);
        }
        if sym.is_pc {
            if sym.value != pc {
                sym.value = pc;
                sym.changed = true;
                self.notify(&key);
            } else if sym.changed {
                // Same value as the previous pass: confirmed. The notify
                // still counts as a change so one more pass runs with the
                // flag clear.
                sym.changed = false;
                self.notify(&key);
            }
            return Ok(pc);
        }
        Ok(sym.value)
    }

    /// Defines `name` as an equate (constant), clearing its PC-relative
    /// nature and updating the value.
    pub fn define_equate(&mut self, name: &str, value: i32, pos: &SourcePos) {
        let key = Self::normalize(name);
        let sym = self
            .map
            .entry(key.clone())
            .or_insert_with(|| Sym::named(name));
        sym.is_pc = false;
        sym.defined_in_pass = true;
        if sym.created.is_unknown() {
            sym.created = pos.clone();
        }
        if !sym.initialized || sym.value != value {
            let had_reads = sym.initialized || !sym.accessed.is_empty();
            sym.initialized = true;
            sym.value = value;
            if had_reads {
                sym.changed = true;
                self.notify(&key);
            }
        } else if sym.changed {
            sym.changed = false;
            self.notify(&key);
        }
    }

    /// Assigns a `.var` variable. Variable updates never count toward the
    /// fixpoint; loops reassign them freely.
    pub fn assign_var(&mut self, name: &str, value: i32, pos: &SourcePos) {
        let key = Self::normalize(name);
        let sym = self
            .map
            .entry(key)
            .or_insert_with(|| Sym::named(name));
        sym.is_var = true;
        sym.initialized = true;
        sym.value = value;
        if sym.created.is_unknown() {
            sym.created = pos.clone();
        }
    }

    /// Marks `name` as a macro name (excluded from resolution and dumps).
    pub fn set_macro(&mut self, name: &str, pos: &SourcePos) {
        let key = Self::normalize(name);
        let sym = self
            .map
            .entry(key)
            .or_insert_with(|| Sym::named(name));
        sym.is_macro = true;
        sym.is_pc = false;
        sym.initialized = true;
        if sym.created.is_unknown() {
            sym.created = pos.clone();
        }
    }

    pub fn is_macro(&self, name: &str) -> bool {
        self.get(name).map_or(false, |s| s.is_macro)
    }

    /// Symbols that are not resolved: uninitialized or still changing.
    /// Macro names and variables never count.
    pub fn unresolved(&self) -> UnresolvedList {
        self.map
            .values()
            .filter(|sym| !sym.is_macro && !sym.is_var && (sym.changed || !sym.initialized))
            .map(|sym| (sym.name.clone(), sym.accessed.clone()))
            .collect()
    }

    /// Uninitialized symbols whose normalized key starts with `prefix`.
    ///
    /// Used for the local-scope exit check: locals are stored under
    /// scope-qualified keys, so the ending scope's prefix selects exactly
    /// the locals that went out of scope.
    pub fn uninitialized_with_prefix(&self, prefix: &str) -> UnresolvedList {
        self.map
            .iter()
            .filter(|(key, sym)| key.starts_with(prefix) && !sym.initialized)
            .map(|(_, sym)| (sym.name.clone(), sym.accessed.clone()))
            .collect()
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.map.len())
            .field("changes", &self.changes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32) -> SourcePos {
        SourcePos::new("t.s", line)
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut table = SymbolTable::new();
        table.define_label("Start", 0x1000, &pos(1)).unwrap();
        assert!(table.contains("START"));
        assert!(table.contains("start"));
        assert_eq!(table.get("sTaRt").unwrap().value, 0x1000);
        assert_eq!(table.get("start").unwrap().name, "Start");
    }

    #[test]
    fn reference_creates_placeholder_with_access() {
        let mut table = SymbolTable::new();
        let value = table.reference("later", &pos(2));
        assert_eq!(value, 0);
        let sym = table.get("later").unwrap();
        assert!(!sym.initialized);
        assert!(sym.accessed.contains(&pos(2)));
        assert_eq!(table.changes, 0);
    }

    #[test]
    fn defining_a_referenced_symbol_counts_as_change() {
        let mut table = SymbolTable::new();
        table.reference("fwd", &pos(2));
        table.define_label("fwd", 0x1004, &pos(5)).unwrap();
        assert!(table.changes > 0);
        assert!(table.get("fwd").unwrap().changed);
    }

    #[test]
    fn defining_an_unreferenced_symbol_is_quiet() {
        let mut table = SymbolTable::new();
        table.define_label("quiet", 0x1000, &pos(1)).unwrap();
        assert_eq!(table.changes, 0);
        assert!(table.get("quiet").unwrap().is_resolved());
    }

    #[test]
    fn redefinition_with_same_value_confirms_and_notifies_once() {
        let mut table = SymbolTable::new();
        table.reference("fwd", &pos(2));
        table.define_label("fwd", 0x1004, &pos(5)).unwrap();

        // next pass: same value -> confirm (counts once)
        table.begin_pass();
        table.define_label("fwd", 0x1004, &pos(5)).unwrap();
        assert_eq!(table.changes, 1);
        assert!(table.get("fwd").unwrap().is_resolved());

        // the pass after: fully quiet
        table.begin_pass();
        table.define_label("fwd", 0x1004, &pos(5)).unwrap();
        assert_eq!(table.changes, 0);
    }

    #[test]
    fn moved_label_is_marked_changed() {
        let mut table = SymbolTable::new();
        table.define_label("l", 0x1000, &pos(1)).unwrap();
        table.begin_pass();
        table.define_label("l", 0x0FFE, &pos(1)).unwrap();
        let sym = table.get("l").unwrap();
        assert!(sym.changed);
        assert_eq!(sym.value, 0x0FFE);
        assert!(table.changes > 0);
    }

    #[test]
    fn duplicate_definition_in_one_pass_is_fatal() {
        let mut table = SymbolTable::new();
        table.define_label("dup", 0x1000, &pos(1)).unwrap();
        let err = table.define_label("dup", 0x1005, &pos(3)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn duplicate_definition_at_same_pc_is_tolerated() {
        let mut table = SymbolTable::new();
        table.define_label("same", 0x1000, &pos(1)).unwrap();
        assert!(table.define_label("same", 0x1000, &pos(1)).is_ok());
    }

    #[test]
    fn equate_clears_pc_nature_and_survives_label_form() {
        let mut table = SymbolTable::new();
        // `five = 5`: the symbol rule defines the lhs as a label first,
        // then the equate action overrides it.
        table.define_label("five", 0x1000, &pos(1)).unwrap();
        table.define_equate("five", 5, &pos(1));
        let sym = table.get("five").unwrap();
        assert!(!sym.is_pc);
        assert_eq!(sym.value, 5);

        // later passes leave the value alone in the label path
        table.begin_pass();
        let value = table.define_label("five", 0x2000, &pos(1)).unwrap();
        assert_eq!(value, 5);
        table.define_equate("five", 5, &pos(1));
        assert_eq!(table.get("five").unwrap().value, 5);
    }

    #[test]
    fn equate_value_change_flags_changed() {
        let mut table = SymbolTable::new();
        table.define_equate("n", 1, &pos(1));
        table.begin_pass();
        table.define_equate("n", 2, &pos(1));
        assert!(table.get("n").unwrap().changed);
        assert!(table.changes > 0);
    }

    #[test]
    fn var_assignment_never_counts_toward_fixpoint() {
        let mut table = SymbolTable::new();
        table.assign_var("i", 0, &pos(1));
        table.assign_var("i", 1, &pos(1));
        table.assign_var("i", 2, &pos(1));
        assert_eq!(table.changes, 0);
        assert_eq!(table.get("i").unwrap().value, 2);
    }

    #[test]
    fn unresolved_lists_placeholders_and_changed_symbols() {
        let mut table = SymbolTable::new();
        table.reference("ghost", &pos(9));
        table.define_label("mover", 0x1000, &pos(1)).unwrap();
        table.begin_pass();
        table.define_label("mover", 0x1002, &pos(1)).unwrap();

        let unresolved = table.unresolved();
        let names: Vec<_> = unresolved.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"ghost"));
        assert!(names.contains(&"mover"));
    }

    #[test]
    fn unresolved_skips_macros_and_vars() {
        let mut table = SymbolTable::new();
        table.set_macro("emit", &pos(1));
        table.assign_var("i", 0, &pos(2));
        assert!(table.unresolved().is_empty());
    }

    #[test]
    fn listeners_fire_on_meaningful_changes() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        let mut table = SymbolTable::new();
        table.on_change(Box::new(move |_sym| {
            *counter.borrow_mut() += 1;
        }));

        table.reference("fwd", &pos(2));
        assert_eq!(*fired.borrow(), 0);
        table.define_label("fwd", 0x1004, &pos(5)).unwrap();
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn prefix_query_selects_scope_qualified_locals() {
        let mut table = SymbolTable::new();
        table.reference("START@skip", &pos(3));
        table.reference("DONE@skip", &pos(9));
        table.define_label("DONE@skip", 0x1010, &pos(10)).unwrap();

        let dangling = table.uninitialized_with_prefix("START@");
        assert_eq!(dangling.len(), 1);
        assert!(table.uninitialized_with_prefix("DONE@").is_empty());
    }
}
