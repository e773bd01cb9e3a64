//! Missing-artifact request/response payloads (`apex/findMissingArtifact`).

use serde::{Deserialize, Serialize};

use super::prerequisites::ResolutionMode;
use super::request_type::RequestType;

/// Where the lookup came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactOrigin {
    pub uri: String,
    pub request_kind: RequestType,
}

/// Params of the server→client `apex/findMissingArtifact` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArtifactRequest {
    pub identifier: String,
    pub mode: ResolutionMode,
    pub origin: ArtifactOrigin,
}

impl MissingArtifactRequest {
    pub fn new(
        identifier: impl Into<String>,
        origin: ArtifactOrigin,
        mode: ResolutionMode,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            mode,
            origin,
        }
    }
}

/// Terminal outcome of a resolution. There are exactly two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingArtifactResult {
    /// The client opened these documents.
    Opened(Vec<String>),
    NotFound,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireResult {
    Opened {
        opened: Vec<String>,
    },
    NotFound {
        #[serde(rename = "notFound")]
        not_found: bool,
    },
}

impl MissingArtifactResult {
    pub fn is_opened(&self) -> bool {
        matches!(self, MissingArtifactResult::Opened(_))
    }

    pub fn opened(&self) -> &[String] {
        match self {
            MissingArtifactResult::Opened(uris) => uris,
            MissingArtifactResult::NotFound => &[],
        }
    }

    /// Interpret a client reply. Anything other than a non-empty `opened`
    /// list of strings or `{ "notFound": true }` is malformed.
    pub fn from_client_value(value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value::<WireResult>(value).ok()? {
            WireResult::Opened { opened } if !opened.is_empty() => {
                Some(MissingArtifactResult::Opened(opened))
            }
            WireResult::Opened { .. } => Some(MissingArtifactResult::NotFound),
            WireResult::NotFound { not_found: true } => Some(MissingArtifactResult::NotFound),
            WireResult::NotFound { not_found: false } => None,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        let wire = match self {
            MissingArtifactResult::Opened(opened) => WireResult::Opened {
                opened: opened.clone(),
            },
            MissingArtifactResult::NotFound => WireResult::NotFound { not_found: true },
        };
        // WireResult has only string/bool fields; encoding cannot fail.
        serde_json::to_value(wire).unwrap_or(serde_json::Value::Null)
    }
}

/// Emitted when a background resolution opened documents for `identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResolved {
    pub identifier: String,
    pub opened: Vec<String>,
    pub origin: ArtifactOrigin,
}
