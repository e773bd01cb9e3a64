//! Validation - two validator tiers over a symbol table.
//!
//! - **Immediate**: single-file checks, run in registration order
//! - **Thorough**: cross-file checks that may trigger a missing-artifact
//!   lookup before deciding

pub mod diagnostics;
pub mod handler;
pub mod pipeline;
pub mod tier;
pub mod validators;

pub use self::diagnostics::{Diagnostic, Severity, ValidationCode};
pub use self::handler::DiagnosticsHandler;
pub use self::pipeline::{ValidationOptions, ValidationReport, ValidationTierPipeline, ValidatorRun};
pub use self::tier::{
    ImmediateValidator, LocalCheck, MissingReference, ReferenceKind, ThoroughValidator,
    ValidationState, ValidationTier, ValidatorError,
};
