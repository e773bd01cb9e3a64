//! RequestType - the closed set of request kinds the scheduler understands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a scheduled request.
///
/// The two pseudo-types `workspace-load` and `file-open-single` never come
/// from the client directly; they describe bulk loading and single-file
/// ingestion so the prerequisite table can answer for them too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestType {
    Hover,
    Completion,
    Definition,
    References,
    Implementation,
    DocumentSymbol,
    WorkspaceSymbol,
    Diagnostics,
    CodeAction,
    CodeLens,
    FoldingRange,
    SignatureHelp,
    Rename,
    DocumentOpen,
    DocumentSave,
    DocumentChange,
    DocumentClose,
    FindMissingArtifact,
    ExecuteCommand,
    #[serde(rename = "workspace-load")]
    WorkspaceLoad,
    #[serde(rename = "file-open-single")]
    FileOpenSingle,
}

impl RequestType {
    pub const ALL: [RequestType; 21] = [
        RequestType::Hover,
        RequestType::Completion,
        RequestType::Definition,
        RequestType::References,
        RequestType::Implementation,
        RequestType::DocumentSymbol,
        RequestType::WorkspaceSymbol,
        RequestType::Diagnostics,
        RequestType::CodeAction,
        RequestType::CodeLens,
        RequestType::FoldingRange,
        RequestType::SignatureHelp,
        RequestType::Rename,
        RequestType::DocumentOpen,
        RequestType::DocumentSave,
        RequestType::DocumentChange,
        RequestType::DocumentClose,
        RequestType::FindMissingArtifact,
        RequestType::ExecuteCommand,
        RequestType::WorkspaceLoad,
        RequestType::FileOpenSingle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Hover => "hover",
            RequestType::Completion => "completion",
            RequestType::Definition => "definition",
            RequestType::References => "references",
            RequestType::Implementation => "implementation",
            RequestType::DocumentSymbol => "documentSymbol",
            RequestType::WorkspaceSymbol => "workspaceSymbol",
            RequestType::Diagnostics => "diagnostics",
            RequestType::CodeAction => "codeAction",
            RequestType::CodeLens => "codeLens",
            RequestType::FoldingRange => "foldingRange",
            RequestType::SignatureHelp => "signatureHelp",
            RequestType::Rename => "rename",
            RequestType::DocumentOpen => "documentOpen",
            RequestType::DocumentSave => "documentSave",
            RequestType::DocumentChange => "documentChange",
            RequestType::DocumentClose => "documentClose",
            RequestType::FindMissingArtifact => "findMissingArtifact",
            RequestType::ExecuteCommand => "executeCommand",
            RequestType::WorkspaceLoad => "workspace-load",
            RequestType::FileOpenSingle => "file-open-single",
        }
    }

    /// Maps an LSP method name (`textDocument/hover`, `apex/findMissingArtifact`)
    /// to its request type.
    pub fn from_lsp_method(method: &str) -> Option<Self> {
        let ty = match method {
            "textDocument/hover" => RequestType::Hover,
            "textDocument/completion" => RequestType::Completion,
            "textDocument/definition" => RequestType::Definition,
            "textDocument/references" => RequestType::References,
            "textDocument/implementation" => RequestType::Implementation,
            "textDocument/documentSymbol" => RequestType::DocumentSymbol,
            "workspace/symbol" => RequestType::WorkspaceSymbol,
            "textDocument/diagnostic" => RequestType::Diagnostics,
            "textDocument/codeAction" => RequestType::CodeAction,
            "textDocument/codeLens" => RequestType::CodeLens,
            "textDocument/foldingRange" => RequestType::FoldingRange,
            "textDocument/signatureHelp" => RequestType::SignatureHelp,
            "textDocument/rename" => RequestType::Rename,
            "textDocument/didOpen" => RequestType::DocumentOpen,
            "textDocument/didSave" => RequestType::DocumentSave,
            "textDocument/didChange" => RequestType::DocumentChange,
            "textDocument/didClose" => RequestType::DocumentClose,
            "apex/findMissingArtifact" => RequestType::FindMissingArtifact,
            "workspace/executeCommand" => RequestType::ExecuteCommand,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request type '{0}'")]
pub struct UnknownRequestType(pub String);

impl FromStr for RequestType {
    type Err = UnknownRequestType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .or_else(|| RequestType::from_lsp_method(s))
            .ok_or_else(|| UnknownRequestType(s.to_string()))
    }
}
