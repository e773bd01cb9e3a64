//! SymbolManager port - the shared store of compiled symbol tables.
//!
//! One instance is shared by every lane and every validator. Implementations
//! must serialize writers; readers may run concurrently.

use crate::domain::{Symbol, SymbolTable};

pub trait SymbolManager: Send + Sync {
    /// All symbols whose name matches `name` (case-insensitive).
    fn find_symbol_by_name(&self, name: &str) -> Vec<Symbol>;

    fn get_all_symbols_for_completion(&self) -> Vec<Symbol>;

    /// Replace whatever was stored for `file_uri` with `table`.
    fn add_symbol_table(&self, table: SymbolTable, file_uri: &str);

    /// Type symbols (class/interface/enum) named `name`.
    fn find_types_by_name(&self, name: &str) -> Vec<Symbol> {
        self.find_symbol_by_name(name)
            .into_iter()
            .filter(|s| s.kind.is_type())
            .collect()
    }

    /// Members declared inside the type `type_name`.
    fn members_of(&self, type_name: &str) -> Vec<Symbol> {
        self.get_all_symbols_for_completion()
            .into_iter()
            .filter(|s| {
                s.parent
                    .as_deref()
                    .is_some_and(|p| p.eq_ignore_ascii_case(type_name))
            })
            .collect()
    }
}
