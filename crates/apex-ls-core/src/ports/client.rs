//! ClientConnection port - messages sent to the editor over the LSP connection.
//!
//! Framing and transport live outside this crate; implementations only need
//! to carry one JSON request or notification at a time.

use async_trait::async_trait;

use crate::error::ClientError;

/// server→client: ask the editor to locate and open a declaring file.
pub const FIND_MISSING_ARTIFACT: &str = "apex/findMissingArtifact";
/// client→server: pull the current queue state.
pub const QUEUE_STATE: &str = "apex/queueState";
/// server→client: push of the queue state.
pub const QUEUE_STATE_CHANGED: &str = "apex/queueStateChanged";

#[async_trait]
pub trait ClientConnection: Send + Sync {
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError>;

    async fn send_notification(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<(), ClientError>;
}
