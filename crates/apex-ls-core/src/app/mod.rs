//! App - the running pieces built on top of the ports.
//!
//! # Components
//! - **SchedulerBuilder**: wiring and start-up validation
//! - **PriorityRequestScheduler**: priority lanes, timeouts, retries
//! - **QueueStatePublisher**: periodic `apex/queueStateChanged` push
//! - **FindMissingArtifactHandler**: the `apex/findMissingArtifact` round trip
//! - **MissingArtifactResolutionService**: blocking/background resolution on top of it

pub mod artifact_resolution;
pub mod builder;
pub mod find_artifact_handler;
mod lane_worker;
pub mod publisher_loop;
pub mod scheduler;

pub use self::artifact_resolution::MissingArtifactResolutionService;
pub use self::builder::{BuildError, SchedulerBuilder};
pub use self::find_artifact_handler::FindMissingArtifactHandler;
pub use self::publisher_loop::QueueStatePublisher;
pub use self::scheduler::PriorityRequestScheduler;
