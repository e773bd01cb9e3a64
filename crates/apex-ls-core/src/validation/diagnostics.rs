//! Diagnostics produced by validators.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    ParameterLimitExceeded,
    DuplicateMethod,
    InvalidEnumConstantName,
    DuplicateEnumConstant,
    ExtendFinalClass,
    InvalidSuperclassType,
    CircularInheritance,
    MissingSuperclass,
    InvalidInterfaceType,
    MissingInterface,
    MissingInterfaceMethod,
    ValidatorFailed,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationCode::ParameterLimitExceeded => "PARAMETER_LIMIT_EXCEEDED",
            ValidationCode::DuplicateMethod => "DUPLICATE_METHOD",
            ValidationCode::InvalidEnumConstantName => "INVALID_ENUM_CONSTANT_NAME",
            ValidationCode::DuplicateEnumConstant => "DUPLICATE_ENUM_CONSTANT",
            ValidationCode::ExtendFinalClass => "EXTEND_FINAL_CLASS",
            ValidationCode::InvalidSuperclassType => "INVALID_SUPERCLASS_TYPE",
            ValidationCode::CircularInheritance => "CIRCULAR_INHERITANCE",
            ValidationCode::MissingSuperclass => "MISSING_SUPERCLASS",
            ValidationCode::InvalidInterfaceType => "INVALID_INTERFACE_TYPE",
            ValidationCode::MissingInterface => "MISSING_INTERFACE",
            ValidationCode::MissingInterfaceMethod => "MISSING_INTERFACE_METHOD",
            ValidationCode::ValidatorFailed => "VALIDATOR_FAILED",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: ValidationCode,
    pub severity: Severity,
    pub message: String,
    pub file_uri: String,
    /// The symbol the diagnostic is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl Diagnostic {
    pub fn error(code: ValidationCode, file_uri: &str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, file_uri, message)
    }

    pub fn warning(code: ValidationCode, file_uri: &str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, file_uri, message)
    }

    fn new(code: ValidationCode, severity: Severity, file_uri: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            file_uri: file_uri.to_string(),
            symbol: None,
        }
    }

    pub fn on(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}
