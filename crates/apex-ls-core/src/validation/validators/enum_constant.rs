use std::collections::HashSet;

use crate::domain::{SymbolKind, SymbolTable};
use crate::validation::diagnostics::{Diagnostic, ValidationCode};
use crate::validation::tier::{ImmediateValidator, ValidatorError};

/// Enum constants must be legal Apex identifiers and unique per enum.
pub struct EnumConstantNamingValidator;

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.contains("__")
        && !name.ends_with('_')
}

impl ImmediateValidator for EnumConstantNamingValidator {
    fn name(&self) -> &'static str {
        "enum-constant-naming"
    }

    fn validate(&self, table: &SymbolTable) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut diags = Vec::new();
        for en in table.types().filter(|t| t.kind == SymbolKind::Enum) {
            let mut seen = HashSet::new();
            for constant in table
                .members_of(&en.name)
                .filter(|m| m.kind == SymbolKind::EnumValue)
            {
                if !is_valid_identifier(&constant.name) {
                    diags.push(
                        Diagnostic::error(
                            ValidationCode::InvalidEnumConstantName,
                            &table.file_uri,
                            format!("'{}' is not a valid enum constant name", constant.name),
                        )
                        .on(&constant.name),
                    );
                }
                if !seen.insert(constant.name.to_ascii_lowercase()) {
                    diags.push(
                        Diagnostic::error(
                            ValidationCode::DuplicateEnumConstant,
                            &table.file_uri,
                            format!("enum '{}' already declares '{}'", en.name, constant.name),
                        )
                        .on(&constant.name),
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
    use crate::domain::Symbol;
    use rstest::rstest;

    #[rstest]
    #[case("RED", true)]
    #[case("Dark_Red", true)]
    #[case("a1", true)]
    #[case("1A", false)]
    #[case("_A", false)]
    #[case("A__B", false)]
    #[case("A_", false)]
    #[case("", false)]
    #[case("A-B", false)]
    fn identifier_rules(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(is_valid_identifier(name), ok);
    }

    #[test]
    fn duplicates_and_bad_names_are_reported() {
        let uri = "file:///Color.cls";
        let value = |n: &str| Symbol::new(n, SymbolKind::EnumValue, uri).with_parent("Color");
        let table = SymbolTable::new(uri)
            .with_symbol(Symbol::new("Color", SymbolKind::Enum, uri))
            .with_symbol(value("RED"))
            .with_symbol(value("red"))
            .with_symbol(value("BAD_"));

        let codes: Vec<ValidationCode> = EnumConstantNamingValidator
            .validate(&table)
            .unwrap()
            .into_iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(
            codes,
            vec![
                ValidationCode::DuplicateEnumConstant,
                ValidationCode::InvalidEnumConstantName
            ]
        );
    }
}
