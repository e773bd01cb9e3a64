//! ValidationTierPipeline - runs the Immediate tier, then the Thorough tier,
//! over one symbol table.
//!
//! A Thorough validator that cannot resolve a referenced type may ask the
//! client for the declaring file, depending on the request type's
//! prerequisites:
//! - blocking: wait for the round trip, then re-run the validator
//! - background: report now with a warning, list the identifier as pending
//!
//! An unresolved reference always ends as a warning, never as a silent pass.

use std::sync::Arc;

use serde::Serialize;

use super::diagnostics::{Diagnostic, ValidationCode};
use super::tier::{
    ImmediateValidator, LocalCheck, MissingReference, ReferenceKind, ThoroughValidator,
    ValidationState, ValidationTier,
};
use super::validators::{
    ClassHierarchyValidator, DuplicateMethodValidator, EnumConstantNamingValidator,
    InterfaceImplementationValidator, ParameterLimitValidator,
};
use crate::app::MissingArtifactResolutionService;
use crate::config::ValidationSettings;
use crate::domain::{
    ArtifactOrigin, MissingArtifactRequest, MissingArtifactResolution, RequestType,
    ResolutionMode, Symbol, SymbolTable, TriggerContext,
};
use crate::ports::SymbolManager;
use crate::prerequisites::{WorkspaceState, resolve_with_state, should_defer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Request the pass runs for; selects the artifact resolution policy.
    pub request_type: RequestType,
    pub workspace_state: WorkspaceState,
    pub include_thorough: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            request_type: RequestType::Diagnostics,
            workspace_state: WorkspaceState::default(),
            include_thorough: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRun {
    pub validator: String,
    pub tier: ValidationTier,
    pub state: ValidationState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub file_uri: String,
    pub diagnostics: Vec<Diagnostic>,
    pub runs: Vec<ValidatorRun>,
    /// Identifiers handed to a background resolution during this pass.
    pub pending_artifacts: Vec<String>,
    /// The Thorough tier was skipped because a workspace load is running.
    pub thorough_deferred: bool,
}

impl ValidationReport {
    fn new(file_uri: &str) -> Self {
        Self {
            file_uri: file_uri.to_string(),
            diagnostics: Vec::new(),
            runs: Vec::new(),
            pending_artifacts: Vec::new(),
            thorough_deferred: false,
        }
    }

    pub fn with_code(&self, code: ValidationCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.with_code(code).next().is_some()
    }

    pub fn state_of(&self, validator: &str) -> Option<ValidationState> {
        self.runs
            .iter()
            .find(|r| r.validator == validator)
            .map(|r| r.state)
    }
}

/// Tracks one validator's pass through the state machine.
struct Pass {
    validator: &'static str,
    tier: ValidationTier,
    state: ValidationState,
}

impl Pass {
    fn start(validator: &'static str, tier: ValidationTier) -> Self {
        let mut pass = Self {
            validator,
            tier,
            state: ValidationState::Pending,
        };
        pass.advance(ValidationState::ChecksLocalSymbols);
        pass
    }

    fn advance(&mut self, next: ValidationState) {
        debug_assert!(
            self.state.can_move_to(next),
            "{}: {:?} -> {:?}",
            self.validator,
            self.state,
            next
        );
        self.state = next;
    }

    fn finish(self, report: &mut ValidationReport) {
        tracing::debug!(validator = self.validator, state = ?self.state, "validator finished");
        report.runs.push(ValidatorRun {
            validator: self.validator.to_string(),
            tier: self.tier,
            state: self.state,
        });
    }
}

pub struct ValidationTierPipeline {
    immediate: Vec<Box<dyn ImmediateValidator>>,
    thorough: Vec<Box<dyn ThoroughValidator>>,
    symbols: Arc<dyn SymbolManager>,
    resolver: Option<Arc<MissingArtifactResolutionService>>,
}

impl ValidationTierPipeline {
    /// An empty pipeline; add validators with `with_immediate`/`with_thorough`.
    pub fn new(symbols: Arc<dyn SymbolManager>) -> Self {
        Self {
            immediate: Vec::new(),
            thorough: Vec::new(),
            symbols,
            resolver: None,
        }
    }

    /// Every built-in validator, in registration order.
    pub fn standard(symbols: Arc<dyn SymbolManager>, settings: &ValidationSettings) -> Self {
        Self::new(symbols)
            .with_immediate(Box::new(ParameterLimitValidator::new(settings.max_parameters)))
            .with_immediate(Box::new(DuplicateMethodValidator))
            .with_immediate(Box::new(EnumConstantNamingValidator))
            .with_thorough(Box::new(ClassHierarchyValidator))
            .with_thorough(Box::new(InterfaceImplementationValidator))
    }

    pub fn with_immediate(mut self, validator: Box<dyn ImmediateValidator>) -> Self {
        self.immediate.push(validator);
        self
    }

    pub fn with_thorough(mut self, validator: Box<dyn ThoroughValidator>) -> Self {
        self.thorough.push(validator);
        self
    }

    /// Without a resolver, missing references degrade straight away.
    pub fn with_resolver(mut self, resolver: Arc<MissingArtifactResolutionService>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub async fn run(&self, table: &SymbolTable, options: &ValidationOptions) -> ValidationReport {
        let mut report = ValidationReport::new(&table.file_uri);

        for validator in &self.immediate {
            let mut pass = Pass::start(validator.name(), ValidationTier::Immediate);
            match validator.validate(table) {
                Ok(diags) => {
                    report.diagnostics.extend(diags);
                    pass.advance(ValidationState::Resolved);
                }
                Err(err) => {
                    report
                        .diagnostics
                        .push(failed(table, validator.name(), &err.to_string()));
                    pass.advance(ValidationState::Error);
                }
            }
            pass.finish(&mut report);
        }

        if !options.include_thorough {
            return report;
        }
        if should_defer(options.request_type, options.workspace_state) {
            tracing::debug!(uri = %table.file_uri, request_type = %options.request_type, "thorough tier deferred during workspace load");
            report.thorough_deferred = true;
            return report;
        }

        let resolution = resolve_with_state(options.request_type, options.workspace_state)
            .missing_artifact_resolution
            .filter(|r| r.enabled);

        for validator in &self.thorough {
            self.run_thorough(validator.as_ref(), table, options, resolution, &mut report)
                .await;
        }
        report
    }

    async fn run_thorough(
        &self,
        validator: &dyn ThoroughValidator,
        table: &SymbolTable,
        options: &ValidationOptions,
        resolution: Option<MissingArtifactResolution>,
        report: &mut ValidationReport,
    ) {
        let mut pass = Pass::start(validator.name(), ValidationTier::Thorough);

        let first = match validator.check(table, self.symbols.as_ref()) {
            Ok(check) => check,
            Err(err) => {
                report
                    .diagnostics
                    .push(failed(table, validator.name(), &err.to_string()));
                pass.advance(ValidationState::Error);
                pass.finish(report);
                return;
            }
        };

        if first.missing.is_empty() {
            report.diagnostics.extend(first.diagnostics);
            pass.advance(ValidationState::Resolved);
            pass.finish(report);
            return;
        }

        let identifiers = match (&self.resolver, resolution) {
            (Some(_), Some(resolution)) => eligible_identifiers(
                &first.missing,
                &resolution,
                options.workspace_state,
                table,
                self.symbols.as_ref(),
            ),
            _ => Vec::new(),
        };
        let (Some(resolver), Some(resolution), false) =
            (&self.resolver, resolution, identifiers.is_empty())
        else {
            degrade(validator, table, first, report);
            pass.advance(ValidationState::DegradedWarning);
            pass.finish(report);
            return;
        };

        pass.advance(ValidationState::AwaitingArtifact);
        let origin = ArtifactOrigin {
            uri: table.file_uri.clone(),
            request_kind: options.request_type,
        };

        if resolution.mode == ResolutionMode::Background {
            for identifier in identifiers {
                resolver.spawn_background(MissingArtifactRequest::new(
                    identifier.clone(),
                    origin.clone(),
                    ResolutionMode::Background,
                ));
                report.pending_artifacts.push(identifier);
            }
            degrade(validator, table, first, report);
            pass.advance(ValidationState::DegradedWarning);
            pass.finish(report);
            return;
        }

        let mut opened_any = false;
        for identifier in identifiers {
            let result = resolver
                .resolve(MissingArtifactRequest::new(
                    identifier,
                    origin.clone(),
                    ResolutionMode::Blocking,
                ))
                .await;
            opened_any |= result.is_opened();
        }

        if !opened_any {
            degrade(validator, table, first, report);
            pass.advance(ValidationState::DegradedWarning);
            pass.finish(report);
            return;
        }

        // The document-open path has ingested the opened files by now.
        match validator.check(table, self.symbols.as_ref()) {
            Ok(second) => {
                let next = if second.missing.is_empty() {
                    ValidationState::ReResolved
                } else {
                    ValidationState::DegradedWarning
                };
                degrade(validator, table, second, report);
                pass.advance(next);
            }
            Err(err) => {
                report
                    .diagnostics
                    .push(failed(table, validator.name(), &err.to_string()));
                pass.advance(ValidationState::Error);
            }
        }
        pass.finish(report);
    }
}

/// Distinct identifiers whose missing reference passes the trigger rules.
///
/// Every `MissingReference` is a lookup that already failed in both the file
/// and the symbol manager, so `symbol_resolution_failed` always holds.
/// `references_found` asks the symbol manager whether any other file
/// already refers to the identifier.
fn eligible_identifiers(
    missing: &[MissingReference],
    resolution: &MissingArtifactResolution,
    workspace: WorkspaceState,
    table: &SymbolTable,
    symbols: &dyn SymbolManager,
) -> Vec<String> {
    let known = symbols.get_all_symbols_for_completion();
    let mut out: Vec<String> = Vec::new();
    for m in missing {
        let ctx = TriggerContext {
            workspace_loaded: workspace.loaded,
            references_found: known
                .iter()
                .any(|s| s.file_uri != table.file_uri && refers_to(s, &m.identifier)),
            symbol_resolution_failed: true,
            is_variable_reference: m.kind == ReferenceKind::Variable,
        };
        if resolution.should_trigger(&ctx)
            && !out.iter().any(|id| id.eq_ignore_ascii_case(&m.identifier))
        {
            out.push(m.identifier.clone());
        }
    }
    out
}

/// Whether `symbol` names `identifier` as a supertype, return or parameter type.
fn refers_to(symbol: &Symbol, identifier: &str) -> bool {
    let named = |name: &str| name.eq_ignore_ascii_case(identifier);
    symbol.superclass.as_deref().is_some_and(named)
        || symbol.interfaces.iter().any(|i| named(i.as_str()))
        || symbol.return_type.as_deref().is_some_and(named)
        || symbol.parameters.iter().any(|p| named(p.type_name.as_str()))
}

/// Keep the check's diagnostics and add a warning per unresolved reference.
fn degrade(
    validator: &dyn ThoroughValidator,
    table: &SymbolTable,
    check: LocalCheck,
    report: &mut ValidationReport,
) {
    report.diagnostics.extend(check.diagnostics);
    report
        .diagnostics
        .extend(check.missing.iter().map(|m| validator.degraded(table, m)));
}

fn failed(table: &SymbolTable, validator: &str, message: &str) -> Diagnostic {
    tracing::warn!(validator, uri = %table.file_uri, error = message, "validator failed");
    Diagnostic::error(
        ValidationCode::ValidatorFailed,
        &table.file_uri,
        format!("validator '{validator}' failed: {message}"),
    )
}
