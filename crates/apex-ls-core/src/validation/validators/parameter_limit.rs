use crate::domain::{SymbolKind, SymbolTable};
use crate::validation::diagnostics::{Diagnostic, ValidationCode};
use crate::validation::tier::{ImmediateValidator, ValidatorError};

/// Methods and constructors may declare at most `max_parameters` parameters.
pub struct ParameterLimitValidator {
    max_parameters: usize,
}

impl ParameterLimitValidator {
    pub fn new(max_parameters: usize) -> Self {
        Self { max_parameters }
    }
}

impl ImmediateValidator for ParameterLimitValidator {
    fn name(&self) -> &'static str {
        "parameter-limit"
    }

    fn validate(&self, table: &SymbolTable) -> Result<Vec<Diagnostic>, ValidatorError> {
        Ok(table
            .symbols
            .iter()
            .filter(|s| matches!(s.kind, SymbolKind::Method | SymbolKind::Constructor))
            .filter(|s| s.parameters.len() > self.max_parameters)
            .map(|s| {
                Diagnostic::error(
                    ValidationCode::ParameterLimitExceeded,
                    &table.file_uri,
                    format!(
                        "'{}' declares {} parameters; the limit is {}",
                        s.name,
                        s.parameters.len(),
                        self.max_parameters
                    ),
                )
                .on(&s.name)
            })
            .collect())
    }
}
