//! Handler for the `findMissingArtifact` request type: one
//! `apex/findMissingArtifact` round trip to the client.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{MissingArtifactRequest, MissingArtifactResult, Priority, RequestType};
use crate::error::HandlerError;
use crate::ports::ClientConnection;
use crate::ports::client::FIND_MISSING_ARTIFACT;
use crate::registry::RequestHandler;

pub struct FindMissingArtifactHandler {
    client: Arc<dyn ClientConnection>,
}

impl FindMissingArtifactHandler {
    pub fn new(client: Arc<dyn ClientConnection>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestHandler for FindMissingArtifactHandler {
    fn request_type(&self) -> RequestType {
        RequestType::FindMissingArtifact
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    /// Transport failures are returned as errors so the scheduler's retry
    /// policy applies; a malformed reply is a definitive `notFound`.
    async fn handle(&self, params: serde_json::Value) -> Result<serde_json::Value, HandlerError> {
        let request: MissingArtifactRequest = serde_json::from_value(params)
            .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;
        let wire = serde_json::to_value(&request)
            .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;

        let reply = self.client.send_request(FIND_MISSING_ARTIFACT, wire).await?;

        let result = MissingArtifactResult::from_client_value(reply).unwrap_or_else(|| {
            tracing::warn!(identifier = %request.identifier, "malformed findMissingArtifact reply");
            MissingArtifactResult::NotFound
        });
        tracing::debug!(
            identifier = %request.identifier,
            opened = result.opened().len(),
            "findMissingArtifact answered"
        );
        Ok(result.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactOrigin, ResolutionMode};
    use crate::error::ClientError;
    use crate::test_support::RecordingClient;
    use serde_json::json;

    fn params() -> serde_json::Value {
        serde_json::to_value(MissingArtifactRequest::new(
            "MissingSuperClass",
            ArtifactOrigin {
                uri: "file:///ClassA.cls".into(),
                request_kind: RequestType::Diagnostics,
            },
            ResolutionMode::Blocking,
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn forwards_request_and_returns_opened() {
        let client = Arc::new(RecordingClient::replying(
            json!({ "opened": ["file:///MissingSuperClass.cls"] }),
        ));
        let handler = FindMissingArtifactHandler::new(client.clone());

        let out = handler.handle(params()).await.unwrap();
        assert_eq!(out, json!({ "opened": ["file:///MissingSuperClass.cls"] }));

        let sent = client.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, FIND_MISSING_ARTIFACT);
        assert_eq!(sent[0].1["identifier"], json!("MissingSuperClass"));
        assert_eq!(sent[0].1["mode"], json!("blocking"));
        assert_eq!(sent[0].1["origin"]["requestKind"], json!("diagnostics"));
    }

    #[tokio::test]
    async fn malformed_reply_is_not_found() {
        let client = Arc::new(RecordingClient::replying(json!({ "opened": "nope" })));
        let handler = FindMissingArtifactHandler::new(client);
        let out = handler.handle(params()).await.unwrap();
        assert_eq!(out, json!({ "notFound": true }));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let client = Arc::new(RecordingClient::new(|_, _| Err(ClientError::Closed)));
        let handler = FindMissingArtifactHandler::new(client);
        let err = handler.handle(params()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Transport(_)));
    }

    #[tokio::test]
    async fn bad_params_are_rejected_without_a_round_trip() {
        let client = Arc::new(RecordingClient::replying(json!({ "notFound": true })));
        let handler = FindMissingArtifactHandler::new(client.clone());
        let err = handler.handle(json!({ "identifier": 7 })).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParams(_)));
        assert_eq!(client.request_count(), 0);
    }
}
