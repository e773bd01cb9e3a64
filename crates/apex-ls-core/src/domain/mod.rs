//! Domain model (ids, request kinds, priorities, prerequisites, artifacts, symbols).

pub mod artifact;
pub mod ids;
pub mod prerequisites;
pub mod priority;
pub mod request_type;
pub mod symbols;

pub use artifact::{ArtifactOrigin, ArtifactResolved, MissingArtifactRequest, MissingArtifactResult};
pub use ids::TaskId;
pub use prerequisites::{
    DetailLevel, ExecutionMode, MissingArtifactResolution, PrerequisiteRequirements,
    ResolutionMode, TriggerConditions, TriggerContext,
};
pub use priority::Priority;
pub use request_type::{RequestType, UnknownRequestType};
pub use symbols::{Modifiers, Parameter, Symbol, SymbolKind, SymbolTable, Visibility};
