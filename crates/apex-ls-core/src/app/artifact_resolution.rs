//! MissingArtifactResolutionService - asks the editor to open the file that
//! declares a type the symbol manager does not know yet.
//!
//! Every outcome is one of `Opened` or `NotFound`: timeouts, transport
//! failures and malformed replies all collapse to `NotFound`.
//!
//! # Coalescing
//! Concurrent lookups of the same identifier in the same mode share one
//! client round trip. The round trip runs on its own spawned task and every
//! caller, the first one included, parks on a oneshot until it finishes, so
//! dropping any one caller never cancels the lookup for the others.
//! Blocking and background lookups are never merged: a blocking caller is
//! always bounded by `blockingTimeoutMs`, never by a slower background
//! lookup already in flight.
//!
//! # Wiring
//! The service submits through a `PriorityRequestScheduler`. When the same
//! scheduler also runs handlers that validate (and so own this service), use
//! `unbound` + `bind`: the service then holds only a weak reference and the
//! handler -> service -> scheduler cycle never keeps the scheduler alive.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use super::scheduler::PriorityRequestScheduler;
use crate::config::FindMissingArtifactSettings;
use crate::domain::{
    ArtifactResolved, MissingArtifactRequest, MissingArtifactResult, Priority, RequestType,
    ResolutionMode,
};
use crate::registry::PolicyOverrides;

const EVENT_CAPACITY: usize = 64;

/// Lower-cased identifier plus mode.
type InFlightKey = (String, ResolutionMode);
type InFlight = Arc<Mutex<HashMap<InFlightKey, Vec<oneshot::Sender<MissingArtifactResult>>>>>;

enum SchedulerLink {
    Owned(Arc<PriorityRequestScheduler>),
    Bound(Weak<PriorityRequestScheduler>),
}

pub struct MissingArtifactResolutionService {
    scheduler: OnceLock<SchedulerLink>,
    settings: FindMissingArtifactSettings,
    in_flight: InFlight,
    events: broadcast::Sender<ArtifactResolved>,
}

impl MissingArtifactResolutionService {
    /// Service submitting through `scheduler`, which it keeps alive.
    pub fn new(
        scheduler: Arc<PriorityRequestScheduler>,
        settings: FindMissingArtifactSettings,
    ) -> Self {
        let service = Self::unbound(settings);
        let _ = service.scheduler.set(SchedulerLink::Owned(scheduler));
        service
    }

    /// Service with no scheduler yet. Lookups resolve to `NotFound` until
    /// `bind` is called.
    ///
    /// # Example
    /// ```ignore
    /// let resolver = Arc::new(MissingArtifactResolutionService::unbound(settings));
    /// let pipeline = Arc::new(ValidationTierPipeline::standard(symbols, &validation)
    ///     .with_resolver(Arc::clone(&resolver)));
    /// let scheduler = SchedulerBuilder::new()
    ///     .register(Arc::new(DiagnosticsHandler::new(pipeline)), PolicyOverrides::none())
    ///     .register(Arc::new(FindMissingArtifactHandler::new(client)), PolicyOverrides::none())
    ///     .build()?;
    /// resolver.bind(&scheduler);
    /// ```
    pub fn unbound(settings: FindMissingArtifactSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scheduler: OnceLock::new(),
            settings,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Attach the scheduler lookups are submitted through, by weak
    /// reference. Returns `false` if a scheduler was already attached.
    pub fn bind(&self, scheduler: &Arc<PriorityRequestScheduler>) -> bool {
        self.scheduler
            .set(SchedulerLink::Bound(Arc::downgrade(scheduler)))
            .is_ok()
    }

    fn scheduler(&self) -> Option<Arc<PriorityRequestScheduler>> {
        match self.scheduler.get()? {
            SchedulerLink::Owned(scheduler) => Some(Arc::clone(scheduler)),
            SchedulerLink::Bound(weak) => weak.upgrade(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Background resolutions that opened something. Subscribers re-run
    /// whatever was waiting on the identifier.
    pub fn subscribe(&self) -> broadcast::Receiver<ArtifactResolved> {
        self.events.subscribe()
    }

    /// Both modes run on the High lane; only the timeout differs.
    fn policy(&self, mode: ResolutionMode) -> PolicyOverrides {
        let timeout_ms = match mode {
            ResolutionMode::Blocking => self.settings.blocking_timeout_ms,
            ResolutionMode::Background => self.settings.background_timeout_ms,
        };
        PolicyOverrides::none()
            .priority(Priority::High)
            .timeout(Duration::from_millis(timeout_ms))
            .max_retries(self.settings.max_retries)
    }

    /// Resolve `request` and wait for the outcome.
    pub async fn resolve(&self, request: MissingArtifactRequest) -> MissingArtifactResult {
        if !self.settings.enabled {
            tracing::debug!(
                identifier = %request.identifier,
                reason = "ConfigurationDisabled",
                "missing artifact resolution skipped"
            );
            return MissingArtifactResult::NotFound;
        }
        let Some(scheduler) = self.scheduler() else {
            tracing::warn!(identifier = %request.identifier, "no scheduler bound for missing artifact resolution");
            return MissingArtifactResult::NotFound;
        };

        let key = (request.identifier.to_ascii_lowercase(), request.mode);
        let (tx, rx) = oneshot::channel();
        let leads = match self.in_flight.lock().entry(key.clone()) {
            Entry::Occupied(mut waiters) => {
                waiters.get_mut().push(tx);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(vec![tx]);
                true
            }
        };

        if leads {
            let round_trip = RoundTrip {
                scheduler,
                policy: self.policy(request.mode),
                in_flight: Arc::clone(&self.in_flight),
                events: self.events.clone(),
                key,
                request,
            };
            tokio::spawn(round_trip.run());
        } else {
            tracing::debug!(identifier = %request.identifier, mode = request.mode.as_str(), "joined in-flight resolution");
        }

        rx.await.unwrap_or(MissingArtifactResult::NotFound)
    }

    /// Start a resolution without waiting for it.
    pub fn spawn_background(
        self: &Arc<Self>,
        request: MissingArtifactRequest,
    ) -> JoinHandle<MissingArtifactResult> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.resolve(request).await })
    }
}

/// One client round trip, owned by its spawned task.
struct RoundTrip {
    scheduler: Arc<PriorityRequestScheduler>,
    policy: PolicyOverrides,
    in_flight: InFlight,
    events: broadcast::Sender<ArtifactResolved>,
    key: InFlightKey,
    request: MissingArtifactRequest,
}

impl RoundTrip {
    async fn run(self) {
        let result = self.submit().await;

        let waiters = self.in_flight.lock().remove(&self.key).unwrap_or_default();
        for tx in waiters {
            let _ = tx.send(result.clone());
        }

        if self.request.mode == ResolutionMode::Background
            && let MissingArtifactResult::Opened(opened) = &result
        {
            // No subscribers is fine.
            let _ = self.events.send(ArtifactResolved {
                identifier: self.request.identifier.clone(),
                opened: opened.clone(),
                origin: self.request.origin.clone(),
            });
        }
    }

    async fn submit(&self) -> MissingArtifactResult {
        let request = &self.request;
        let params = match serde_json::to_value(request) {
            Ok(params) => params,
            Err(err) => {
                tracing::warn!(identifier = %request.identifier, error = %err, "encoding findMissingArtifact params");
                return MissingArtifactResult::NotFound;
            }
        };

        match self
            .scheduler
            .submit(RequestType::FindMissingArtifact, params, self.policy)
            .await
        {
            Ok(value) => {
                MissingArtifactResult::from_client_value(value).unwrap_or(MissingArtifactResult::NotFound)
            }
            Err(err) => {
                tracing::debug!(identifier = %request.identifier, error = %err, "findMissingArtifact failed");
                MissingArtifactResult::NotFound
            }
        }
    }
}
