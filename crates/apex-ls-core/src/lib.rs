//! apex-ls-core
//!
//! Request-processing core of the Apex language server.
//!
//! # Modules
//! - **domain**: request types, priorities, prerequisites, artifacts, symbols
//! - **ports**: traits for the client connection, symbol manager, clock and ids
//! - **queue**: lanes, task records, retry policy, counters
//! - **registry**: request handlers and their scheduling policy
//! - **prerequisites**: request type -> symbol-table requirements
//! - **app**: scheduler, builder, queue-state publisher, missing-artifact resolution
//! - **validation**: Immediate and Thorough validator tiers
//! - **impls**: in-memory symbol manager
//! - **observability**: `apex/queueState` report shape
//! - **config** / **error**: settings and error types

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod prerequisites;
pub mod queue;
pub mod registry;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use app::{
    BuildError, FindMissingArtifactHandler, MissingArtifactResolutionService,
    PriorityRequestScheduler, QueueStatePublisher, SchedulerBuilder,
};
pub use config::Settings;
pub use error::{ClientError, HandlerError, SchedulerError};
pub use registry::{PolicyOverrides, RequestHandler, ServiceRegistry};
