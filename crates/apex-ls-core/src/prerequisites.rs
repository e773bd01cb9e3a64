//! Request type -> prerequisite requirements.
//!
//! Pure and total: every request type has an answer, and the answer never
//! depends on anything but the arguments.

use crate::domain::{
    DetailLevel, ExecutionMode, MissingArtifactResolution, PrerequisiteRequirements, RequestType,
    ResolutionMode, TriggerConditions,
};

/// Bulk-load state of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkspaceState {
    /// A bulk workspace load is in progress.
    pub loading: bool,
    /// The bulk load has finished at least once.
    pub loaded: bool,
}

const fn requirements(
    detail: Option<DetailLevel>,
    references: bool,
    resolution: bool,
    cross_file: bool,
    mode: ExecutionMode,
    skip_during_load: bool,
) -> PrerequisiteRequirements {
    PrerequisiteRequirements {
        required_detail_level: detail,
        requires_references: references,
        requires_reference_resolution: resolution,
        requires_cross_file_resolution: cross_file,
        execution_mode: mode,
        skip_during_workspace_load: skip_during_load,
        requires_workspace_load: false,
        missing_artifact_resolution: None,
    }
}

const fn artifacts(mode: ResolutionMode, triggers: TriggerConditions) -> Option<MissingArtifactResolution> {
    Some(MissingArtifactResolution {
        enabled: true,
        mode,
        trigger_conditions: triggers,
    })
}

/// Navigation requests: the user waits, so a missing declaring file is
/// fetched inline.
const NAVIGATION_TRIGGERS: TriggerConditions = TriggerConditions {
    when_workspace_not_loaded: true,
    when_no_references_found: false,
    when_symbol_resolution_fails: true,
    skip_for_variable_references: true,
};

const REFERENCE_TRIGGERS: TriggerConditions = TriggerConditions {
    when_workspace_not_loaded: true,
    when_no_references_found: true,
    when_symbol_resolution_fails: true,
    skip_for_variable_references: true,
};

const DIAGNOSTIC_TRIGGERS: TriggerConditions = TriggerConditions {
    when_workspace_not_loaded: true,
    when_no_references_found: false,
    when_symbol_resolution_fails: true,
    skip_for_variable_references: true,
};

/// Requirements for `request_type`, ignoring workspace state.
pub fn requirements_for(request_type: RequestType) -> PrerequisiteRequirements {
    use DetailLevel::*;
    use ExecutionMode::*;

    match request_type {
        RequestType::Hover => PrerequisiteRequirements {
            missing_artifact_resolution: artifacts(ResolutionMode::Blocking, NAVIGATION_TRIGGERS),
            ..requirements(Some(Private), true, true, true, Blocking, false)
        },
        RequestType::Definition | RequestType::Implementation => PrerequisiteRequirements {
            missing_artifact_resolution: artifacts(ResolutionMode::Blocking, NAVIGATION_TRIGGERS),
            ..requirements(Some(Private), true, true, true, Blocking, false)
        },
        RequestType::References => PrerequisiteRequirements {
            requires_workspace_load: true,
            missing_artifact_resolution: artifacts(ResolutionMode::Background, REFERENCE_TRIGGERS),
            ..requirements(Some(Full), true, true, true, Blocking, false)
        },
        RequestType::Rename => PrerequisiteRequirements {
            requires_workspace_load: true,
            ..requirements(Some(Full), true, true, true, Blocking, false)
        },
        RequestType::Completion => requirements(Some(Private), false, false, false, Async, false),
        RequestType::SignatureHelp => requirements(Some(Private), true, true, false, Blocking, false),
        RequestType::CodeAction => requirements(Some(Private), true, true, false, Blocking, false),
        RequestType::DocumentSymbol => requirements(Some(PublicApi), false, false, false, Async, false),
        RequestType::FoldingRange => requirements(None, false, false, false, Async, false),
        RequestType::WorkspaceSymbol => PrerequisiteRequirements {
            requires_workspace_load: true,
            ..requirements(Some(PublicApi), false, false, false, Async, true)
        },
        RequestType::CodeLens => requirements(Some(PublicApi), true, false, false, Async, true),
        RequestType::Diagnostics => PrerequisiteRequirements {
            missing_artifact_resolution: artifacts(ResolutionMode::Blocking, DIAGNOSTIC_TRIGGERS),
            ..requirements(Some(Full), true, true, true, Async, true)
        },
        RequestType::DocumentOpen | RequestType::DocumentChange => {
            requirements(Some(Full), true, false, false, Async, false)
        }
        RequestType::DocumentSave => requirements(Some(Full), true, true, false, Async, false),
        RequestType::DocumentClose => requirements(None, false, false, false, Async, false),
        RequestType::FindMissingArtifact => requirements(None, false, false, false, Async, false),
        RequestType::WorkspaceLoad => {
            requirements(Some(PublicApi), false, false, false, Async, false)
        }
        RequestType::FileOpenSingle => requirements(Some(Full), true, true, false, Async, false),
        RequestType::ExecuteCommand => PrerequisiteRequirements::CONSERVATIVE,
    }
}

/// Requirements for a request named on the wire (`hover`,
/// `textDocument/hover`, `workspace-load`). Names outside the table get the
/// conservative default.
pub fn requirements_for_name(name: &str) -> PrerequisiteRequirements {
    name.parse::<RequestType>()
        .map(requirements_for)
        .unwrap_or(PrerequisiteRequirements::CONSERVATIVE)
}

/// Requirements adjusted for the current workspace state.
///
/// Once the workspace has been loaded the "workspace not loaded" trigger
/// can no longer fire, so it is cleared.
pub fn resolve_with_state(
    request_type: RequestType,
    state: WorkspaceState,
) -> PrerequisiteRequirements {
    let mut reqs = requirements_for(request_type);
    if state.loaded
        && let Some(resolution) = reqs.missing_artifact_resolution.as_mut()
    {
        resolution.trigger_conditions.when_workspace_not_loaded = false;
    }
    reqs
}

/// Whether `request_type` should wait until the bulk load finishes.
pub fn should_defer(request_type: RequestType, state: WorkspaceState) -> bool {
    state.loading && requirements_for(request_type).skip_during_workspace_load
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RequestType::Hover, Some(DetailLevel::Private), ExecutionMode::Blocking)]
    #[case(RequestType::Completion, Some(DetailLevel::Private), ExecutionMode::Async)]
    #[case(RequestType::References, Some(DetailLevel::Full), ExecutionMode::Blocking)]
    #[case(RequestType::DocumentSymbol, Some(DetailLevel::PublicApi), ExecutionMode::Async)]
    #[case(RequestType::Diagnostics, Some(DetailLevel::Full), ExecutionMode::Async)]
    #[case(RequestType::WorkspaceLoad, Some(DetailLevel::PublicApi), ExecutionMode::Async)]
    #[case(RequestType::FileOpenSingle, Some(DetailLevel::Full), ExecutionMode::Async)]
    #[case(RequestType::DocumentClose, None, ExecutionMode::Async)]
    fn table_entries(
        #[case] ty: RequestType,
        #[case] detail: Option<DetailLevel>,
        #[case] mode: ExecutionMode,
    ) {
        let reqs = requirements_for(ty);
        assert_eq!(reqs.required_detail_level, detail);
        assert_eq!(reqs.execution_mode, mode);
    }

    #[test]
    fn unmapped_types_get_the_conservative_default() {
        let reqs = requirements_for(RequestType::ExecuteCommand);
        assert_eq!(reqs, PrerequisiteRequirements::CONSERVATIVE);
        assert_eq!(reqs.required_detail_level, None);
        assert!(!reqs.requires_references);
        assert!(!reqs.requires_reference_resolution);
        assert!(!reqs.requires_cross_file_resolution);
        assert_eq!(reqs.execution_mode, ExecutionMode::Async);
        assert!(reqs.skip_during_workspace_load);
    }

    #[rstest]
    #[case("textDocument/inlayHint")]
    #[case("apex/somethingNew")]
    #[case("")]
    fn unknown_names_get_the_conservative_default(#[case] name: &str) {
        assert_eq!(requirements_for_name(name), PrerequisiteRequirements::CONSERVATIVE);
    }

    #[test]
    fn names_resolve_through_the_table() {
        assert_eq!(
            requirements_for_name("textDocument/hover"),
            requirements_for(RequestType::Hover)
        );
        assert_eq!(
            requirements_for_name("file-open-single"),
            requirements_for(RequestType::FileOpenSingle)
        );
    }

    #[test]
    fn table_is_total_and_cross_file_implies_resolution() {
        for ty in RequestType::ALL {
            let reqs = requirements_for(ty);
            if reqs.requires_cross_file_resolution {
                assert!(reqs.requires_reference_resolution, "{ty}");
            }
            if reqs.requires_reference_resolution {
                assert!(reqs.requires_references, "{ty}");
            }
        }
    }

    #[test]
    fn missing_artifact_modes() {
        let hover = requirements_for(RequestType::Hover).missing_artifact_resolution.unwrap();
        assert_eq!(hover.mode, ResolutionMode::Blocking);
        let refs = requirements_for(RequestType::References)
            .missing_artifact_resolution
            .unwrap();
        assert_eq!(refs.mode, ResolutionMode::Background);
        assert!(refs.trigger_conditions.when_no_references_found);
        assert!(!requirements_for(RequestType::Completion).missing_artifact_enabled());
    }

    #[test]
    fn loaded_workspace_clears_not_loaded_trigger() {
        let loaded = WorkspaceState {
            loading: false,
            loaded: true,
        };
        let reqs = resolve_with_state(RequestType::Hover, loaded);
        let triggers = reqs.missing_artifact_resolution.unwrap().trigger_conditions;
        assert!(!triggers.when_workspace_not_loaded);
        assert!(triggers.when_symbol_resolution_fails);

        let cold = resolve_with_state(RequestType::Hover, WorkspaceState::default());
        assert!(
            cold.missing_artifact_resolution
                .unwrap()
                .trigger_conditions
                .when_workspace_not_loaded
        );
    }

    #[rstest]
    #[case(RequestType::WorkspaceSymbol, true)]
    #[case(RequestType::Diagnostics, true)]
    #[case(RequestType::ExecuteCommand, true)]
    #[case(RequestType::Hover, false)]
    #[case(RequestType::DocumentOpen, false)]
    fn deferral_during_load(#[case] ty: RequestType, #[case] deferred: bool) {
        let loading = WorkspaceState {
            loading: true,
            loaded: false,
        };
        assert_eq!(should_defer(ty, loading), deferred);
        assert!(!should_defer(ty, WorkspaceState::default()));
    }
}
