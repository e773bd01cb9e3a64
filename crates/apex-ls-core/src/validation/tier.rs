//! Validator tiers, the per-pass state machine and the validator traits.

use serde::Serialize;
use thiserror::Error;

use super::diagnostics::Diagnostic;
use crate::domain::SymbolTable;
use crate::ports::SymbolManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationTier {
    /// Single-file and cheap; never loads artifacts.
    Immediate,
    /// Cross-file aware; may ask the client for a missing artifact.
    Thorough,
}

/// Where one validator's pass ended up.
///
/// `Pending -> ChecksLocalSymbols -> Resolved`, or
/// `ChecksLocalSymbols -> AwaitingArtifact -> ReResolved | DegradedWarning`.
/// A validator that fails ends in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationState {
    Pending,
    ChecksLocalSymbols,
    Resolved,
    AwaitingArtifact,
    ReResolved,
    DegradedWarning,
    Error,
}

impl ValidationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ValidationState::Resolved
                | ValidationState::ReResolved
                | ValidationState::DegradedWarning
                | ValidationState::Error
        )
    }

    /// Legal transitions of a single pass.
    pub fn can_move_to(self, next: ValidationState) -> bool {
        use ValidationState::*;
        matches!(
            (self, next),
            (Pending, ChecksLocalSymbols)
                | (ChecksLocalSymbols, Resolved | AwaitingArtifact | DegradedWarning | Error)
                | (AwaitingArtifact, ReResolved | DegradedWarning | Error)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidatorError(pub String);

/// What a reference that could not be resolved points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Superclass,
    Interface,
    Type,
    Variable,
}

/// A referenced type found neither in the file nor in the symbol manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    pub identifier: String,
    pub kind: ReferenceKind,
    /// The symbol holding the reference.
    pub referenced_from: String,
}

/// Outcome of checking against locally available symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalCheck {
    pub diagnostics: Vec<Diagnostic>,
    pub missing: Vec<MissingReference>,
}

pub trait ImmediateValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, table: &SymbolTable) -> Result<Vec<Diagnostic>, ValidatorError>;
}

/// A cross-file validator. `check` must be safe to call again after the
/// symbol manager has gained new tables.
pub trait ThoroughValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(
        &self,
        table: &SymbolTable,
        symbols: &dyn SymbolManager,
    ) -> Result<LocalCheck, ValidatorError>;

    /// Warning for a reference that is still unresolved after every
    /// resolution attempt.
    fn degraded(&self, table: &SymbolTable, missing: &MissingReference) -> Diagnostic;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ValidationState::*;

    #[test]
    fn state_machine_edges() {
        assert!(Pending.can_move_to(ChecksLocalSymbols));
        assert!(ChecksLocalSymbols.can_move_to(AwaitingArtifact));
        assert!(AwaitingArtifact.can_move_to(ReResolved));
        assert!(AwaitingArtifact.can_move_to(DegradedWarning));
        assert!(!Pending.can_move_to(Resolved));
        assert!(!Resolved.can_move_to(AwaitingArtifact));
        assert!(!ChecksLocalSymbols.can_move_to(ReResolved));
    }

    #[test]
    fn terminal_states() {
        for s in [Resolved, ReResolved, DegradedWarning, Error] {
            assert!(s.is_terminal());
        }
        for s in [Pending, ChecksLocalSymbols, AwaitingArtifact] {
            assert!(!s.is_terminal());
        }
    }
}
