use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Priority, RequestType};
use crate::error::HandlerError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_RETRIES: u32 = 0;
pub const DEFAULT_PRIORITY: Priority = Priority::Normal;

/// Executes one kind of request.
///
/// The policy methods are the handler's own defaults; registration and
/// submission may override them.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    fn request_type(&self) -> RequestType;

    fn priority(&self) -> Priority {
        DEFAULT_PRIORITY
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn max_retries(&self) -> u32 {
        DEFAULT_MAX_RETRIES
    }

    async fn handle(&self, params: serde_json::Value) -> Result<serde_json::Value, HandlerError>;
}

/// Scheduling policy of a request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    pub priority: Priority,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RequestPolicy {
    pub fn of(handler: &dyn RequestHandler) -> Self {
        Self {
            priority: handler.priority(),
            timeout: handler.timeout(),
            max_retries: handler.max_retries(),
        }
    }

    pub fn with_overrides(self, overrides: &PolicyOverrides) -> Self {
        Self {
            priority: overrides.priority.unwrap_or(self.priority),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
        }
    }
}

/// Partial policy; `None` keeps the underlying value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyOverrides {
    pub priority: Option<Priority>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl PolicyOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

struct Registration {
    handler: Arc<dyn RequestHandler>,
    policy: RequestPolicy,
}

/// Request type -> handler + policy.
///
/// Built during setup, then shared read-only by the scheduler. There is no
/// locking: mutation after the scheduler starts is not supported.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: HashMap<RequestType, Registration>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `handler` for its request type. Last write wins; the
    /// replaced handler, if any, is returned.
    pub fn register(
        &mut self,
        handler: Arc<dyn RequestHandler>,
        overrides: PolicyOverrides,
    ) -> Option<Arc<dyn RequestHandler>> {
        let request_type = handler.request_type();
        let policy = RequestPolicy::of(handler.as_ref()).with_overrides(&overrides);
        tracing::debug!(
            %request_type,
            priority = %policy.priority,
            timeout_ms = policy.timeout.as_millis() as u64,
            max_retries = policy.max_retries,
            "registered handler"
        );
        self.entries
            .insert(request_type, Registration { handler, policy })
            .map(|previous| {
                tracing::debug!(%request_type, "replaced existing handler");
                previous.handler
            })
    }

    pub fn get_handler(&self, request_type: RequestType) -> Option<Arc<dyn RequestHandler>> {
        self.entries
            .get(&request_type)
            .map(|r| Arc::clone(&r.handler))
    }

    pub fn has_handler(&self, request_type: RequestType) -> bool {
        self.entries.contains_key(&request_type)
    }

    /// Effective policy; the defaults when nothing is registered.
    pub fn policy(&self, request_type: RequestType) -> RequestPolicy {
        self.entries
            .get(&request_type)
            .map(|r| r.policy)
            .unwrap_or_default()
    }

    pub fn get_priority(&self, request_type: RequestType) -> Priority {
        self.policy(request_type).priority
    }

    pub fn get_timeout(&self, request_type: RequestType) -> Duration {
        self.policy(request_type).timeout
    }

    pub fn get_max_retries(&self, request_type: RequestType) -> u32 {
        self.policy(request_type).max_retries
    }

    pub fn registered_types(&self) -> Vec<RequestType> {
        let mut types: Vec<RequestType> = self.entries.keys().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
