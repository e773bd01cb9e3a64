use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use apex_ls_core::config::Settings;
use apex_ls_core::domain::{Modifiers, RequestType, Symbol, SymbolKind, SymbolTable};
use apex_ls_core::impls::InMemorySymbolManager;
use apex_ls_core::observability::QueueStateParams;
use apex_ls_core::ports::client::FIND_MISSING_ARTIFACT;
use apex_ls_core::ports::{ClientConnection, SymbolManager};
use apex_ls_core::validation::{DiagnosticsHandler, ValidationTierPipeline};
use apex_ls_core::{
    ClientError, FindMissingArtifactHandler, HandlerError, MissingArtifactResolutionService,
    PolicyOverrides, QueueStatePublisher, RequestHandler, SchedulerBuilder,
};

#[derive(Debug, Deserialize)]
struct HoverParams {
    symbol: String,
}

/// Hover that fails its first `n` calls, to show retries.
struct FlakyHover {
    symbols: Arc<InMemorySymbolManager>,
    remaining_failures: AtomicU32,
}

#[async_trait]
impl RequestHandler for FlakyHover {
    fn request_type(&self) -> RequestType {
        RequestType::Hover
    }

    async fn handle(&self, params: Value) -> Result<Value, HandlerError> {
        let p: HoverParams =
            serde_json::from_value(params).map_err(|e| HandlerError::InvalidParams(e.to_string()))?;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HandlerError::Failed(format!("intentional failure (left={left})")));
        }

        let found = self.symbols.find_symbol_by_name(&p.symbol);
        Ok(json!({ "symbol": p.symbol, "matches": found.len() }))
    }
}

/// Stand-in for the editor: "opens" files it knows about by ingesting
/// their symbol tables, and logs notifications.
struct SimulatedEditor {
    symbols: Arc<InMemorySymbolManager>,
    workspace: HashMap<String, SymbolTable>,
}

#[async_trait]
impl ClientConnection for SimulatedEditor {
    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        if method != FIND_MISSING_ARTIFACT {
            return Err(ClientError::Rejected {
                method: method.to_string(),
                message: "unsupported".to_string(),
            });
        }
        let identifier = params["identifier"].as_str().unwrap_or_default().to_ascii_lowercase();
        match self.workspace.get(&identifier) {
            Some(table) => {
                self.symbols.add_symbol_table(table.clone(), &table.file_uri);
                Ok(json!({ "opened": [table.file_uri] }))
            }
            None => Ok(json!({ "notFound": true })),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ClientError> {
        tracing::info!(method, params = %params, "notification");
        Ok(())
    }
}

fn workspace_fixture() -> HashMap<String, SymbolTable> {
    let uri = "file:///force-app/classes/BaseController.cls";
    let base = SymbolTable::new(uri).with_symbol(
        Symbol::new("BaseController", SymbolKind::Class, uri).with_modifiers(Modifiers {
            is_virtual: true,
            ..Default::default()
        }),
    );
    HashMap::from([("basecontroller".to_string(), base)])
}

fn open_file() -> SymbolTable {
    let uri = "file:///force-app/classes/AccountController.cls";
    SymbolTable::new(uri)
        .with_symbol(
            Symbol::new("AccountController", SymbolKind::Class, uri)
                .with_superclass("BaseController"),
        )
        .with_symbol(Symbol::new("AccountWidget", SymbolKind::Class, uri).with_superclass("Gadget"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Settings::from_file(&path)?,
        None => Settings::default(),
    };

    let symbols = Arc::new(InMemorySymbolManager::new());
    let editor = Arc::new(SimulatedEditor {
        symbols: Arc::clone(&symbols),
        workspace: workspace_fixture(),
    });

    // The resolver is bound after build: the scheduler runs the diagnostics
    // handler that owns it.
    let resolver = Arc::new(MissingArtifactResolutionService::unbound(
        settings.find_missing_artifact.clone(),
    ));
    let pipeline = Arc::new(
        ValidationTierPipeline::standard(symbols.clone(), &settings.validation)
            .with_resolver(Arc::clone(&resolver)),
    );

    let scheduler = SchedulerBuilder::new()
        .settings(settings.scheduler.clone())
        .register(
            Arc::new(FindMissingArtifactHandler::new(editor.clone())),
            PolicyOverrides::none(),
        )
        .register(Arc::new(DiagnosticsHandler::new(pipeline)), PolicyOverrides::none())
        .register(
            Arc::new(FlakyHover {
                symbols: Arc::clone(&symbols),
                remaining_failures: AtomicU32::new(2),
            }),
            PolicyOverrides::none().max_retries(2),
        )
        .expect_request_types(&[
            RequestType::FindMissingArtifact,
            RequestType::Diagnostics,
            RequestType::Hover,
        ])
        .build()?;
    resolver.bind(&scheduler);

    let publisher = settings
        .scheduler
        .notification_interval()
        .map(|interval| QueueStatePublisher::new(Arc::clone(&scheduler), editor.clone(), interval).spawn());

    let table = open_file();
    symbols.add_symbol_table(table.clone(), &table.file_uri);
    let report = scheduler
        .submit(
            RequestType::Diagnostics,
            json!({ "table": table, "workspaceLoaded": true }),
            PolicyOverrides::none(),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let hover = scheduler
        .submit(
            RequestType::Hover,
            json!({ "symbol": "BaseController" }),
            PolicyOverrides::none(),
        )
        .await?;
    println!("{hover}");

    // Let the publisher observe the final counters.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = scheduler.queue_state(&QueueStateParams::everything());
    println!("{}", serde_json::to_string_pretty(&state)?);

    scheduler.shutdown();
    if let Some(publisher) = publisher {
        publisher.await?;
    }
    Ok(())
}
