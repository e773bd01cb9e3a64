use std::collections::HashSet;

use super::{lookup_type, members_of};
use crate::domain::{Symbol, SymbolKind, SymbolTable};
use crate::ports::SymbolManager;
use crate::validation::diagnostics::{Diagnostic, ValidationCode};
use crate::validation::tier::{
    LocalCheck, MissingReference, ReferenceKind, ThoroughValidator, ValidatorError,
};

/// Longest superclass or super-interface chain followed.
const MAX_DEPTH: usize = 64;

/// Method name (lower-cased) plus parameter types.
type MethodKey = (String, Vec<String>);

fn method_key(method: &Symbol) -> MethodKey {
    (method.name.to_ascii_lowercase(), method.signature_key())
}

/// A concrete class implements every method of every interface it names,
/// including methods the interface inherits from its own super-interfaces.
/// Methods inherited from a superclass count as implementations.
pub struct InterfaceImplementationValidator;

impl InterfaceImplementationValidator {
    /// Methods `class` declares or inherits. `None` when the superclass chain
    /// breaks; the hierarchy check reports that.
    fn provided_methods(
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
        class: &Symbol,
    ) -> Option<HashSet<MethodKey>> {
        let mut provided: HashSet<MethodKey> = members_of(table, symbols, class)
            .iter()
            .filter(|m| m.kind == SymbolKind::Method)
            .map(method_key)
            .collect();

        let mut seen = vec![class.name.to_ascii_lowercase()];
        let mut next = class.superclass.clone();
        while let Some(name) = next {
            if seen.len() > MAX_DEPTH || seen.contains(&name.to_ascii_lowercase()) {
                break;
            }
            let parent = lookup_type(table, symbols, &name)?;
            seen.push(name.to_ascii_lowercase());
            provided.extend(
                members_of(table, symbols, &parent)
                    .iter()
                    .filter(|m| m.kind == SymbolKind::Method && !m.modifiers.is_abstract)
                    .map(method_key),
            );
            next = parent.superclass.clone();
        }
        Some(provided)
    }

    /// Methods required by `interface` and its super-interfaces, each with
    /// the interface that declares it. Unknown super-interfaces are recorded
    /// as missing.
    fn required_methods(
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
        interface: Symbol,
        out: &mut LocalCheck,
    ) -> Vec<(String, Symbol)> {
        let mut required = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending = vec![interface];

        while let Some(current) = pending.pop() {
            if seen.len() > MAX_DEPTH || !seen.insert(current.name.to_ascii_lowercase()) {
                continue;
            }
            required.extend(
                members_of(table, symbols, &current)
                    .into_iter()
                    .filter(|m| m.kind == SymbolKind::Method)
                    .map(|m| (current.name.clone(), m)),
            );

            // `interface B extends A` may arrive in either slot.
            for parent in current.superclass.iter().chain(&current.interfaces) {
                match lookup_type(table, symbols, parent) {
                    Some(found) if found.kind == SymbolKind::Interface => pending.push(found),
                    Some(_) => {}
                    None => push_missing(out, parent, &current.name),
                }
            }
        }
        required
    }
}

fn push_missing(out: &mut LocalCheck, identifier: &str, referenced_from: &str) {
    let duplicate = out.missing.iter().any(|m| {
        m.identifier.eq_ignore_ascii_case(identifier) && m.referenced_from == referenced_from
    });
    if !duplicate {
        out.missing.push(MissingReference {
            identifier: identifier.to_string(),
            kind: ReferenceKind::Interface,
            referenced_from: referenced_from.to_string(),
        });
    }
}

impl ThoroughValidator for InterfaceImplementationValidator {
    fn name(&self) -> &'static str {
        "interface-implementation"
    }

    fn check(
        &self,
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
    ) -> Result<LocalCheck, ValidatorError> {
        let mut out = LocalCheck::default();

        for class in table.types().filter(|t| t.kind == SymbolKind::Class) {
            let mut inherited = None;

            for name in &class.interfaces {
                let Some(interface) = lookup_type(table, symbols, name) else {
                    push_missing(&mut out, name, &class.name);
                    continue;
                };
                // Wrong kinds belong to the hierarchy check.
                if interface.kind != SymbolKind::Interface || class.modifiers.is_abstract {
                    continue;
                }

                let required = Self::required_methods(table, symbols, interface, &mut out);
                let provided =
                    inherited.get_or_insert_with(|| Self::provided_methods(table, symbols, class));
                let Some(provided) = provided.as_ref() else {
                    continue;
                };

                for (declared_by, method) in required {
                    let key = method_key(&method);
                    if !provided.contains(&key) {
                        out.diagnostics.push(
                            Diagnostic::error(
                                ValidationCode::MissingInterfaceMethod,
                                &table.file_uri,
                                format!(
                                    "'{}' does not implement '{}.{}({})'",
                                    class.name,
                                    declared_by,
                                    method.name,
                                    key.1.join(", ")
                                ),
                            )
                            .on(&class.name),
                        );
                    }
                }
            }
        }
        Ok(out)
    }

    fn degraded(&self, table: &SymbolTable, missing: &MissingReference) -> Diagnostic {
        Diagnostic::warning(
            ValidationCode::MissingInterface,
            &table.file_uri,
            format!(
                "interface '{}' of '{}' not found in current file or symbol manager",
                missing.identifier, missing.referenced_from
            ),
        )
        .on(&missing.referenced_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Modifiers, Parameter, Symbol};
    use crate::impls::InMemorySymbolManager;

    const URI: &str = "file:///Impl.cls";
    const IFACE_URI: &str = "file:///Shape.cls";

    fn shape_manager() -> InMemorySymbolManager {
        let symbols = InMemorySymbolManager::new();
        symbols.add_symbol_table(
            SymbolTable::new(IFACE_URI)
                .with_symbol(Symbol::new("Shape", SymbolKind::Interface, IFACE_URI))
                .with_symbol(
                    Symbol::new("area", SymbolKind::Method, IFACE_URI)
                        .with_parent("Shape")
                        .with_parameter(Parameter::new("scale", "Decimal")),
                ),
            IFACE_URI,
        );
        symbols
    }

    #[test]
    fn missing_method_is_an_error() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("Square", SymbolKind::Class, URI).with_interface("Shape"));
        let out = InterfaceImplementationValidator
            .check(&table, &shape_manager())
            .unwrap();
        assert!(out.missing.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, ValidationCode::MissingInterfaceMethod);
    }

    #[test]
    fn implemented_and_abstract_classes_pass() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("Square", SymbolKind::Class, URI).with_interface("Shape"))
            .with_symbol(
                Symbol::new("AREA", SymbolKind::Method, URI)
                    .with_parent("Square")
                    .with_parameter(Parameter::new("s", "decimal")),
            )
            .with_symbol(
                Symbol::new("Partial", SymbolKind::Class, URI)
                    .with_interface("Shape")
                    .with_modifiers(Modifiers {
                        is_abstract: true,
                        ..Default::default()
                    }),
            );
        let out = InterfaceImplementationValidator
            .check(&table, &shape_manager())
            .unwrap();
        assert_eq!(out, LocalCheck::default());
    }

    #[test]
    fn method_inherited_from_a_virtual_superclass_counts() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("BaseShape", SymbolKind::Class, URI).with_modifiers(Modifiers {
                is_virtual: true,
                ..Default::default()
            }))
            .with_symbol(
                Symbol::new("area", SymbolKind::Method, URI)
                    .with_parent("BaseShape")
                    .with_parameter(Parameter::new("scale", "Decimal")),
            )
            .with_symbol(
                Symbol::new("Square", SymbolKind::Class, URI)
                    .with_superclass("BaseShape")
                    .with_interface("Shape"),
            );
        let out = InterfaceImplementationValidator
            .check(&table, &shape_manager())
            .unwrap();
        assert_eq!(out, LocalCheck::default());
    }

    #[test]
    fn abstract_inherited_method_does_not_count() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("BaseShape", SymbolKind::Class, URI).with_modifiers(Modifiers {
                is_abstract: true,
                ..Default::default()
            }))
            .with_symbol(
                Symbol::new("area", SymbolKind::Method, URI)
                    .with_parent("BaseShape")
                    .with_parameter(Parameter::new("scale", "Decimal"))
                    .with_modifiers(Modifiers {
                        is_abstract: true,
                        ..Default::default()
                    }),
            )
            .with_symbol(
                Symbol::new("Square", SymbolKind::Class, URI)
                    .with_superclass("BaseShape")
                    .with_interface("Shape"),
            );
        let out = InterfaceImplementationValidator
            .check(&table, &shape_manager())
            .unwrap();
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn super_interface_methods_are_required() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("Polygon", SymbolKind::Interface, URI).with_interface("Shape"))
            .with_symbol(
                Symbol::new("sides", SymbolKind::Method, URI).with_parent("Polygon"),
            )
            .with_symbol(Symbol::new("Square", SymbolKind::Class, URI).with_interface("Polygon"))
            .with_symbol(Symbol::new("sides", SymbolKind::Method, URI).with_parent("Square"));
        let out = InterfaceImplementationValidator
            .check(&table, &shape_manager())
            .unwrap();

        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].message.contains("'Shape.area(decimal)'"));
    }

    #[test]
    fn unknown_super_interface_is_missing() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("Polygon", SymbolKind::Interface, URI).with_interface("Drawable"))
            .with_symbol(Symbol::new("Square", SymbolKind::Class, URI).with_interface("Polygon"))
            .with_symbol(Symbol::new("Tile", SymbolKind::Class, URI).with_interface("Polygon"));
        let out = InterfaceImplementationValidator
            .check(&table, &InMemorySymbolManager::new())
            .unwrap();

        assert!(out.diagnostics.is_empty());
        assert_eq!(out.missing.len(), 1);
        assert_eq!(out.missing[0].identifier, "Drawable");
        assert_eq!(out.missing[0].referenced_from, "Polygon");
    }

    #[test]
    fn unknown_interface_is_missing() {
        let table = SymbolTable::new(URI)
            .with_symbol(Symbol::new("Square", SymbolKind::Class, URI).with_interface("Drawable"));
        let out = InterfaceImplementationValidator
            .check(&table, &InMemorySymbolManager::new())
            .unwrap();
        assert_eq!(out.missing[0].kind, ReferenceKind::Interface);
        let warning = InterfaceImplementationValidator.degraded(&table, &out.missing[0]);
        assert_eq!(warning.code, ValidationCode::MissingInterface);
    }
}
