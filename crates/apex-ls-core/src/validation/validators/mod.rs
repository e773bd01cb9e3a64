//! Built-in validators.

mod class_hierarchy;
mod duplicate_method;
mod enum_constant;
mod interface_implementation;
mod parameter_limit;

pub use class_hierarchy::ClassHierarchyValidator;
pub use duplicate_method::DuplicateMethodValidator;
pub use enum_constant::EnumConstantNamingValidator;
pub use interface_implementation::InterfaceImplementationValidator;
pub use parameter_limit::ParameterLimitValidator;

use crate::domain::{Symbol, SymbolTable};
use crate::ports::SymbolManager;

/// A type by name: the file being validated first, then the symbol manager.
fn lookup_type(table: &SymbolTable, symbols: &dyn SymbolManager, name: &str) -> Option<Symbol> {
    table
        .find_type(name)
        .cloned()
        .or_else(|| symbols.find_types_by_name(name).into_iter().next())
}

/// Members of a type, from wherever the type was found.
fn members_of(table: &SymbolTable, symbols: &dyn SymbolManager, type_symbol: &Symbol) -> Vec<Symbol> {
    if type_symbol.file_uri == table.file_uri {
        table.members_of(&type_symbol.name).cloned().collect()
    } else {
        symbols
            .members_of(&type_symbol.name)
            .into_iter()
            .filter(|m| m.file_uri == type_symbol.file_uri)
            .collect()
    }
}
