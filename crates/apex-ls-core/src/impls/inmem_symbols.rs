//! InMemorySymbolManager - symbol tables keyed by file URI.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::{Symbol, SymbolTable};
use crate::ports::SymbolManager;

/// Single-writer symbol store. Writers take the lock exclusively, so the
/// store is safe to share between lanes running on different threads.
#[derive(Default)]
pub struct InMemorySymbolManager {
    tables: RwLock<HashMap<String, SymbolTable>>,
}

impl InMemorySymbolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_file(&self, file_uri: &str) -> Option<SymbolTable> {
        self.tables.write().remove(file_uri)
    }

    pub fn file_count(&self) -> usize {
        self.tables.read().len()
    }

    pub fn contains_file(&self, file_uri: &str) -> bool {
        self.tables.read().contains_key(file_uri)
    }
}

impl SymbolManager for InMemorySymbolManager {
    fn find_symbol_by_name(&self, name: &str) -> Vec<Symbol> {
        self.tables
            .read()
            .values()
            .flat_map(|t| t.symbols.iter())
            .filter(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    fn get_all_symbols_for_completion(&self) -> Vec<Symbol> {
        self.tables
            .read()
            .values()
            .flat_map(|t| t.symbols.iter().cloned())
            .collect()
    }

    fn add_symbol_table(&self, table: SymbolTable, file_uri: &str) {
        self.tables.write().insert(file_uri.to_string(), table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SymbolKind;

    fn table(uri: &str, class: &str) -> SymbolTable {
        SymbolTable::new(uri)
            .with_symbol(Symbol::new(class, SymbolKind::Class, uri))
            .with_symbol(Symbol::new("doWork", SymbolKind::Method, uri).with_parent(class))
    }

    #[test]
    fn add_then_find() {
        let mgr = InMemorySymbolManager::new();
        assert!(mgr.find_symbol_by_name("Base").is_empty());

        mgr.add_symbol_table(table("file:///Base.cls", "Base"), "file:///Base.cls");

        assert_eq!(mgr.find_symbol_by_name("base").len(), 1);
        assert_eq!(mgr.find_types_by_name("Base").len(), 1);
        assert_eq!(mgr.members_of("Base").len(), 1);
        assert_eq!(mgr.get_all_symbols_for_completion().len(), 2);
    }

    #[test]
    fn re_adding_a_file_replaces_it() {
        let mgr = InMemorySymbolManager::new();
        mgr.add_symbol_table(table("file:///A.cls", "A"), "file:///A.cls");
        mgr.add_symbol_table(table("file:///A.cls", "Renamed"), "file:///A.cls");

        assert_eq!(mgr.file_count(), 1);
        assert!(mgr.find_symbol_by_name("A").is_empty());
        assert_eq!(mgr.find_symbol_by_name("Renamed").len(), 1);

        assert!(mgr.remove_file("file:///A.cls").is_some());
        assert!(!mgr.contains_file("file:///A.cls"));
    }
}
