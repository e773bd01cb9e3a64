use std::collections::HashSet;

use crate::domain::{SymbolKind, SymbolTable};
use crate::validation::diagnostics::{Diagnostic, ValidationCode};
use crate::validation::tier::{ImmediateValidator, ValidatorError};

/// Two methods of one type may not share a name and parameter types.
/// Apex names are case-insensitive.
pub struct DuplicateMethodValidator;

impl ImmediateValidator for DuplicateMethodValidator {
    fn name(&self) -> &'static str {
        "duplicate-method"
    }

    fn validate(&self, table: &SymbolTable) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut diags = Vec::new();
        for ty in table.types() {
            let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();
            for method in table
                .members_of(&ty.name)
                .filter(|m| m.kind == SymbolKind::Method)
            {
                let key = (method.name.to_ascii_lowercase(), method.signature_key());
                if !seen.insert(key) {
                    diags.push(
                        Diagnostic::error(
                            ValidationCode::DuplicateMethod,
                            &table.file_uri,
                            format!(
                                "method '{}({})' is already declared in '{}'",
                                method.name,
                                method.signature_key().join(", "),
                                ty.name
                            ),
                        )
                        .on(&method.name),
                    );
                }
            }
        }
        Ok(diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Parameter, Symbol};

    #[test]
    fn same_signature_differing_case_is_a_duplicate() {
        let uri = "file:///A.cls";
        let table = SymbolTable::new(uri)
            .with_symbol(Symbol::new("A", SymbolKind::Class, uri))
            .with_symbol(
                Symbol::new("run", SymbolKind::Method, uri)
                    .with_parent("A")
                    .with_parameter(Parameter::new("a", "String")),
            )
            .with_symbol(
                Symbol::new("RUN", SymbolKind::Method, uri)
                    .with_parent("A")
                    .with_parameter(Parameter::new("b", "string")),
            )
            .with_symbol(
                Symbol::new("run", SymbolKind::Method, uri)
                    .with_parent("A")
                    .with_parameter(Parameter::new("a", "Integer")),
            );

        let diags = DuplicateMethodValidator.validate(&table).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].symbol.as_deref(), Some("RUN"));
    }
}
