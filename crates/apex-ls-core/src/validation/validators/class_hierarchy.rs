use std::collections::HashSet;

use super::lookup_type;
use crate::domain::{Symbol, SymbolKind, SymbolTable};
use crate::ports::SymbolManager;
use crate::validation::diagnostics::{Diagnostic, ValidationCode};
use crate::validation::tier::{
    LocalCheck, MissingReference, ReferenceKind, ThoroughValidator, ValidatorError,
};

/// Longest superclass chain followed when looking for a cycle.
const MAX_DEPTH: usize = 64;

/// Superclass existence, kind, extensibility and circularity, plus the kind
/// of every implemented type.
///
/// Apex classes are closed unless declared `virtual` or `abstract`.
pub struct ClassHierarchyValidator;

fn is_extensible(class: &Symbol) -> bool {
    !class.modifiers.is_final && (class.modifiers.is_virtual || class.modifiers.is_abstract)
}

impl ClassHierarchyValidator {
    fn check_class(
        &self,
        class: &Symbol,
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
        out: &mut LocalCheck,
    ) {
        let uri = &table.file_uri;

        for name in &class.interfaces {
            if let Some(found) = lookup_type(table, symbols, name)
                && found.kind != SymbolKind::Interface
            {
                out.diagnostics.push(
                    Diagnostic::error(
                        ValidationCode::InvalidInterfaceType,
                        uri,
                        format!("'{}' implements '{}', which is not an interface", class.name, found.name),
                    )
                    .on(&class.name),
                );
            }
        }

        let Some(superclass) = class.superclass.as_deref() else {
            return;
        };
        let Some(parent) = lookup_type(table, symbols, superclass) else {
            out.missing.push(MissingReference {
                identifier: superclass.to_string(),
                kind: ReferenceKind::Superclass,
                referenced_from: class.name.clone(),
            });
            return;
        };

        if parent.kind != SymbolKind::Class {
            out.diagnostics.push(
                Diagnostic::error(
                    ValidationCode::InvalidSuperclassType,
                    uri,
                    format!("'{}' extends '{}', which is not a class", class.name, parent.name),
                )
                .on(&class.name),
            );
            return;
        }
        if !is_extensible(&parent) {
            out.diagnostics.push(
                Diagnostic::error(
                    ValidationCode::ExtendFinalClass,
                    uri,
                    format!(
                        "'{}' extends '{}', which is neither virtual nor abstract",
                        class.name, parent.name
                    ),
                )
                .on(&class.name),
            );
        }

        if self.is_circular(class, parent, table, symbols) {
            out.diagnostics.push(
                Diagnostic::error(
                    ValidationCode::CircularInheritance,
                    uri,
                    format!("'{}' inherits from itself", class.name),
                )
                .on(&class.name),
            );
        }
    }

    /// Walk up from `parent`; an unresolvable link ends the walk quietly.
    fn is_circular(
        &self,
        class: &Symbol,
        parent: Symbol,
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
    ) -> bool {
        let mut seen = HashSet::from([class.name.to_ascii_lowercase()]);
        let mut current = parent;
        for _ in 0..MAX_DEPTH {
            if !seen.insert(current.name.to_ascii_lowercase()) {
                return true;
            }
            let Some(next) = current
                .superclass
                .as_deref()
                .and_then(|name| lookup_type(table, symbols, name))
            else {
                return false;
            };
            current = next;
        }
        true
    }
}

impl ThoroughValidator for ClassHierarchyValidator {
    fn name(&self) -> &'static str {
        "class-hierarchy"
    }

    fn check(
        &self,
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
    ) -> Result<LocalCheck, ValidatorError> {
        let mut out = LocalCheck::default();
        for class in table.types().filter(|t| t.kind == SymbolKind::Class) {
            self.check_class(class, table, symbols, &mut out);
        }
        Ok(out)
    }

    fn degraded(&self, table: &SymbolTable, missing: &MissingReference) -> Diagnostic {
        Diagnostic::warning(
            ValidationCode::MissingSuperclass,
            &table.file_uri,
            format!(
                "superclass '{}' of '{}' not found in current file or symbol manager",
                missing.identifier, missing.referenced_from
            ),
        )
        .on(&missing.referenced_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Modifiers;
    use crate::impls::InMemorySymbolManager;

    const URI: &str = "file:///ClassA.cls";

    fn class(name: &str, virtual_: bool) -> Symbol {
        Symbol::new(name, SymbolKind::Class, URI).with_modifiers(Modifiers {
            is_virtual: virtual_,
            ..Default::default()
        })
    }

    fn codes(check: &LocalCheck) -> Vec<ValidationCode> {
        check.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn unknown_superclass_is_reported_missing() {
        let table = SymbolTable::new(URI).with_symbol(class("ClassA", false).with_superclass("Base"));
        let out = ClassHierarchyValidator
            .check(&table, &InMemorySymbolManager::new())
            .unwrap();
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.missing.len(), 1);
        assert_eq!(out.missing[0].identifier, "Base");
        assert_eq!(out.missing[0].kind, ReferenceKind::Superclass);

        let warning = ClassHierarchyValidator.degraded(&table, &out.missing[0]);
        assert_eq!(warning.code, ValidationCode::MissingSuperclass);
    }

    #[test]
    fn superclass_from_symbol_manager_resolves() {
        let symbols = InMemorySymbolManager::new();
        let base_uri = "file:///Base.cls";
        symbols.add_symbol_table(
            SymbolTable::new(base_uri).with_symbol(
                Symbol::new("Base", SymbolKind::Class, base_uri).with_modifiers(Modifiers {
                    is_virtual: true,
                    ..Default::default()
                }),
            ),
            base_uri,
        );
        let table = SymbolTable::new(URI).with_symbol(class("ClassA", false).with_superclass("base"));
        let out = ClassHierarchyValidator.check(&table, &symbols).unwrap();
        assert_eq!(out, LocalCheck::default());
    }

    #[test]
    fn closed_superclass_and_wrong_kinds() {
        let table = SymbolTable::new(URI)
            .with_symbol(class("Closed", false))
            .with_symbol(Symbol::new("Shape", SymbolKind::Interface, URI))
            .with_symbol(class("A", false).with_superclass("Closed"))
            .with_symbol(class("B", false).with_superclass("Shape"))
            .with_symbol(class("C", false).with_interface("Closed"));
        let out = ClassHierarchyValidator
            .check(&table, &InMemorySymbolManager::new())
            .unwrap();
        assert_eq!(
            codes(&out),
            vec![
                ValidationCode::ExtendFinalClass,
                ValidationCode::InvalidSuperclassType,
                ValidationCode::InvalidInterfaceType,
            ]
        );
    }

    #[test]
    fn cycles_are_detected() {
        let table = SymbolTable::new(URI)
            .with_symbol(class("A", true).with_superclass("B"))
            .with_symbol(class("B", true).with_superclass("A"));
        let out = ClassHierarchyValidator
            .check(&table, &InMemorySymbolManager::new())
            .unwrap();
        assert_eq!(
            codes(&out),
            vec![ValidationCode::CircularInheritance, ValidationCode::CircularInheritance]
        );
    }
}
