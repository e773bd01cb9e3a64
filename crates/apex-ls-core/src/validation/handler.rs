//! `diagnostics` request handler: runs the validation pipeline inside the
//! scheduler, so a blocking artifact lookup becomes a nested High-lane task.
//! The resolver is bound to the same scheduler after it is built.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::pipeline::{ValidationOptions, ValidationTierPipeline};
use crate::domain::{RequestType, SymbolTable};
use crate::error::HandlerError;
use crate::prerequisites::WorkspaceState;
use crate::registry::RequestHandler;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosticsParams {
    table: SymbolTable,
    #[serde(default)]
    workspace_loading: bool,
    #[serde(default)]
    workspace_loaded: bool,
}

pub struct DiagnosticsHandler {
    pipeline: Arc<ValidationTierPipeline>,
}

impl DiagnosticsHandler {
    pub fn new(pipeline: Arc<ValidationTierPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl RequestHandler for DiagnosticsHandler {
    fn request_type(&self) -> RequestType {
        RequestType::Diagnostics
    }

    async fn handle(&self, params: serde_json::Value) -> Result<serde_json::Value, HandlerError> {
        let params: DiagnosticsParams = serde_json::from_value(params)
            .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;
        let options = ValidationOptions {
            request_type: RequestType::Diagnostics,
            workspace_state: WorkspaceState {
                loading: params.workspace_loading,
                loaded: params.workspace_loaded,
            },
            include_thorough: true,
        };
        let report = self.pipeline.run(&params.table, &options).await;
        serde_json::to_value(report).map_err(|e| HandlerError::Failed(e.to_string()))
    }
}
