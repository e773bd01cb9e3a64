//! SchedulerBuilder - wiring and start-up validation.
//!
//! Handlers are registered here, then `build()` checks that every request
//! type the caller said it needs has a handler before any worker starts.

use std::sync::Arc;

use super::scheduler::PriorityRequestScheduler;
use crate::config::{ConfigError, SchedulerSettings};
use crate::domain::RequestType;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::registry::{PolicyOverrides, RequestHandler, ServiceRegistry};

/// Builds a running `PriorityRequestScheduler`.
///
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .register(Arc::new(HoverHandler::new(symbols)), PolicyOverrides::none())
///     .expect_request_types(&[RequestType::Hover])
///     .build()?;
/// ```
pub struct SchedulerBuilder {
    registry: ServiceRegistry,
    settings: SchedulerSettings,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    expected: Option<Vec<RequestType>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing request types: {0:?}; these were expected but have no handler")]
    MissingRequestTypes(Vec<RequestType>),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            registry: ServiceRegistry::new(),
            settings: SchedulerSettings::default(),
            clock: Arc::new(SystemClock),
            ids: None,
            expected: None,
        }
    }

    pub fn settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults to ULIDs stamped with the builder's clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn register(mut self, handler: Arc<dyn RequestHandler>, overrides: PolicyOverrides) -> Self {
        self.registry.register(handler, overrides);
        self
    }

    /// Request types that must have a handler when `build()` runs.
    pub fn expect_request_types(mut self, request_types: &[RequestType]) -> Self {
        self.expected = Some(request_types.to_vec());
        self
    }

    /// Validate and start the scheduler's lane workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Arc<PriorityRequestScheduler>, BuildError> {
        self.settings.validate()?;

        if let Some(expected) = &self.expected {
            let missing: Vec<RequestType> = expected
                .iter()
                .filter(|ty| !self.registry.has_handler(**ty))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingRequestTypes(missing));
            }
        }

        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&self.clock))));

        Ok(PriorityRequestScheduler::start(
            Arc::new(self.registry),
            self.settings,
            self.clock,
            ids,
        ))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FnHandler;
    use serde_json::json;

    #[tokio::test]
    async fn build_success() {
        let scheduler = SchedulerBuilder::new()
            .register(
                Arc::new(FnHandler::ok(RequestType::Hover, json!(null))),
                PolicyOverrides::none(),
            )
            .expect_request_types(&[RequestType::Hover])
            .build();
        assert!(scheduler.is_ok());
    }

    #[tokio::test]
    async fn build_reports_missing_request_types() {
        let scheduler = SchedulerBuilder::new()
            .register(
                Arc::new(FnHandler::ok(RequestType::Hover, json!(null))),
                PolicyOverrides::none(),
            )
            .expect_request_types(&[RequestType::Hover, RequestType::FindMissingArtifact])
            .build();
        assert!(matches!(
            scheduler,
            Err(BuildError::MissingRequestTypes(missing)) if missing == vec![RequestType::FindMissingArtifact]
        ));
    }

    #[tokio::test]
    async fn build_without_expectations() {
        assert!(SchedulerBuilder::new().build().is_ok());
    }

    #[tokio::test]
    async fn build_rejects_invalid_settings() {
        let mut settings = SchedulerSettings::default();
        settings.max_concurrency.normal = 0;
        let scheduler = SchedulerBuilder::new().settings(settings).build();
        assert!(matches!(scheduler, Err(BuildError::Config(_))));
    }
}
