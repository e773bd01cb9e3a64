//! Test doubles shared by the unit tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::domain::{Priority, RequestType};
use crate::error::{ClientError, HandlerError};
use crate::ports::ClientConnection;
use crate::registry::{DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY, DEFAULT_TIMEOUT, RequestHandler};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;
type Behavior = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Handler driven by a closure. Counts calls and records when each started.
pub(crate) struct FnHandler {
    request_type: RequestType,
    priority: Priority,
    timeout: Duration,
    max_retries: u32,
    behavior: Behavior,
    calls: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl FnHandler {
    pub(crate) fn from_fn<F, Fut>(request_type: RequestType, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        Self {
            request_type,
            priority: DEFAULT_PRIORITY,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            behavior: Arc::new(move |params| Box::pin(f(params))),
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn ok(request_type: RequestType, value: Value) -> Self {
        Self::from_fn(request_type, move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Echoes its params back.
    pub(crate) fn echo(request_type: RequestType) -> Self {
        Self::from_fn(request_type, |params| async move { Ok(params) })
    }

    pub(crate) fn failing(request_type: RequestType, message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(request_type, move |_| {
            let message = message.clone();
            async move { Err(HandlerError::Failed(message)) }
        })
    }

    pub(crate) fn sleeping(request_type: RequestType, delay: Duration, value: Value) -> Self {
        Self::from_fn(request_type, move |_| {
            let value = value.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
        })
    }

    /// Never completes; only a timeout ends it.
    pub(crate) fn never(request_type: RequestType) -> Self {
        Self::from_fn(request_type, |_| std::future::pending())
    }

    pub(crate) fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn started_at(&self) -> Vec<Instant> {
        self.started.lock().clone()
    }
}

#[async_trait]
impl RequestHandler for FnHandler {
    fn request_type(&self) -> RequestType {
        self.request_type
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn handle(&self, params: Value) -> Result<Value, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().push(Instant::now());
        (self.behavior)(params).await
    }
}

type Reply = Arc<dyn Fn(&str, &Value) -> Result<Value, ClientError> + Send + Sync>;

/// Client connection that answers requests from a closure and records
/// everything sent to it.
pub(crate) struct RecordingClient {
    reply: Reply,
    delay: Option<Duration>,
    requests: Mutex<Vec<(String, Value)>>,
    notifications: Mutex<Vec<(String, Value)>>,
}

impl RecordingClient {
    pub(crate) fn new<F>(reply: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, ClientError> + Send + Sync + 'static,
    {
        Self {
            reply: Arc::new(reply),
            delay: None,
            requests: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with `value`.
    pub(crate) fn replying(value: Value) -> Self {
        Self::new(move |_, _| Ok(value.clone()))
    }

    /// Waits `delay` before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn notifications(&self) -> Vec<(String, Value)> {
        self.notifications.lock().clone()
    }
}

#[async_trait]
impl ClientConnection for RecordingClient {
    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        self.requests.lock().push((method.to_string(), params.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(method, &params)
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ClientError> {
        self.notifications.lock().push((method.to_string(), params));
        Ok(())
    }
}
