//! Prerequisite requirements attached to each request type.
//!
//! These values are policy, not state: they are looked up per request type
//! and never stored on a task.

use serde::{Deserialize, Serialize};

/// How much of a file's symbol table has to be materialized.
///
/// Ordered from least to most detail, so `a >= b` means "a satisfies b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailLevel {
    PublicApi,
    Protected,
    Private,
    Full,
}

/// Whether the caller waits for enrichment before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    Blocking,
    Async,
}

/// How a missing artifact is fetched from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionMode {
    Blocking,
    Background,
}

impl ResolutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionMode::Blocking => "blocking",
            ResolutionMode::Background => "background",
        }
    }
}

/// Conditions under which a validator may ask the client for a missing artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConditions {
    pub when_workspace_not_loaded: bool,
    pub when_no_references_found: bool,
    pub when_symbol_resolution_fails: bool,
    pub skip_for_variable_references: bool,
}

/// Observed facts at the point a reference could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerContext {
    pub workspace_loaded: bool,
    pub references_found: bool,
    pub symbol_resolution_failed: bool,
    pub is_variable_reference: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArtifactResolution {
    pub enabled: bool,
    pub mode: ResolutionMode,
    pub trigger_conditions: TriggerConditions,
}

impl MissingArtifactResolution {
    /// Decide whether resolution should fire for the given context.
    ///
    /// Variable references are excluded first when configured; otherwise any
    /// one matching condition is enough.
    pub fn should_trigger(&self, ctx: &TriggerContext) -> bool {
        if !self.enabled {
            return false;
        }
        let t = &self.trigger_conditions;
        if t.skip_for_variable_references && ctx.is_variable_reference {
            return false;
        }
        (t.when_workspace_not_loaded && !ctx.workspace_loaded)
            || (t.when_no_references_found && !ctx.references_found)
            || (t.when_symbol_resolution_fails && ctx.symbol_resolution_failed)
    }
}

/// Requirements a request type places on the symbol store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteRequirements {
    pub required_detail_level: Option<DetailLevel>,
    pub requires_references: bool,
    pub requires_reference_resolution: bool,
    pub requires_cross_file_resolution: bool,
    pub execution_mode: ExecutionMode,
    pub skip_during_workspace_load: bool,
    pub requires_workspace_load: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_artifact_resolution: Option<MissingArtifactResolution>,
}

impl PrerequisiteRequirements {
    /// The answer for request types without a table entry.
    pub const CONSERVATIVE: PrerequisiteRequirements = PrerequisiteRequirements {
        required_detail_level: None,
        requires_references: false,
        requires_reference_resolution: false,
        requires_cross_file_resolution: false,
        execution_mode: ExecutionMode::Async,
        skip_during_workspace_load: true,
        requires_workspace_load: false,
        missing_artifact_resolution: None,
    };

    pub fn missing_artifact_enabled(&self) -> bool {
        self.missing_artifact_resolution
            .is_some_and(|resolution| resolution.enabled)
    }
}

impl Default for PrerequisiteRequirements {
    fn default() -> Self {
        Self::CONSERVATIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution(triggers: TriggerConditions) -> MissingArtifactResolution {
        MissingArtifactResolution {
            enabled: true,
            mode: ResolutionMode::Blocking,
            trigger_conditions: triggers,
        }
    }

    #[test]
    fn detail_levels_are_ordered() {
        assert!(DetailLevel::Full > DetailLevel::Private);
        assert!(DetailLevel::Private > DetailLevel::Protected);
        assert!(DetailLevel::Protected > DetailLevel::PublicApi);
        assert_eq!(
            serde_json::to_value(DetailLevel::PublicApi).unwrap(),
            serde_json::json!("public-api")
        );
    }

    #[test]
    fn variable_references_are_skipped_when_configured() {
        let r = resolution(TriggerConditions {
            when_symbol_resolution_fails: true,
            skip_for_variable_references: true,
            ..Default::default()
        });
        let ctx = TriggerContext {
            symbol_resolution_failed: true,
            is_variable_reference: true,
            ..Default::default()
        };
        assert!(!r.should_trigger(&ctx));
        assert!(r.should_trigger(&TriggerContext {
            is_variable_reference: false,
            ..ctx
        }));
    }

    #[test]
    fn disabled_never_triggers() {
        let mut r = resolution(TriggerConditions {
            when_workspace_not_loaded: true,
            ..Default::default()
        });
        r.enabled = false;
        assert!(!r.should_trigger(&TriggerContext::default()));
    }

    #[test]
    fn no_references_condition() {
        let r = resolution(TriggerConditions {
            when_no_references_found: true,
            ..Default::default()
        });
        assert!(r.should_trigger(&TriggerContext {
            workspace_loaded: true,
            references_found: false,
            ..Default::default()
        }));
        assert!(!r.should_trigger(&TriggerContext {
            workspace_loaded: true,
            references_found: true,
            ..Default::default()
        }));
    }
}
