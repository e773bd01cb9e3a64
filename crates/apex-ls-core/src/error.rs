use std::time::Duration;

use thiserror::Error;

use crate::domain::RequestType;

/// Errors a caller of the scheduler can observe.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no handler registered for request type {0}")]
    HandlerNotRegistered(RequestType),

    #[error("{request_type} request timed out after {}ms", timeout.as_millis())]
    RequestTimeout {
        request_type: RequestType,
        timeout: Duration,
    },

    #[error("{request_type} handler failed: {message}")]
    HandlerExecution {
        request_type: RequestType,
        message: String,
    },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("scheduler is shut down")]
    ShutDown,
}

impl SchedulerError {
    /// Whether a queued task failing with this error may be retried.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SchedulerError::RequestTimeout { .. } | SchedulerError::HandlerExecution { .. }
        )
    }
}

/// Errors returned by a request handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("client transport: {0}")]
    Transport(String),
}

impl HandlerError {
    pub(crate) fn into_scheduler_error(self, request_type: RequestType) -> SchedulerError {
        match self {
            HandlerError::InvalidParams(msg) => SchedulerError::InvalidParams(msg),
            other => SchedulerError::HandlerExecution {
                request_type,
                message: other.to_string(),
            },
        }
    }
}

/// Errors surfaced by a client connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("client rejected {method}: {message}")]
    Rejected { method: String, message: String },

    #[error("connection closed")]
    Closed,
}

impl From<ClientError> for HandlerError {
    fn from(err: ClientError) -> Self {
        HandlerError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_handler_failures_retry() {
        assert!(
            SchedulerError::RequestTimeout {
                request_type: RequestType::Hover,
                timeout: Duration::from_millis(10),
            }
            .is_retriable()
        );
        assert!(
            HandlerError::Failed("boom".into())
                .into_scheduler_error(RequestType::Hover)
                .is_retriable()
        );
        assert!(!SchedulerError::HandlerNotRegistered(RequestType::Hover).is_retriable());
        assert!(
            !HandlerError::InvalidParams("bad".into())
                .into_scheduler_error(RequestType::Hover)
                .is_retriable()
        );
        assert!(!SchedulerError::ShutDown.is_retriable());
    }

    #[test]
    fn timeout_message_names_the_request() {
        let err = SchedulerError::RequestTimeout {
            request_type: RequestType::FindMissingArtifact,
            timeout: Duration::from_millis(2000),
        };
        assert_eq!(
            err.to_string(),
            "findMissingArtifact request timed out after 2000ms"
        );
    }
}
