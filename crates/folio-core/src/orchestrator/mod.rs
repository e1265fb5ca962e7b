//! Fetch orchestrator.
//!
//! Launches one retry driver per configured resource, concurrently and
//! independently, and publishes each outcome into the shared
//! [`StateStore`] as soon as it arrives. Per resource:
//! `Idle -> Loading -> {Success | Fallback | Failed} -> Idle`.

mod task;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::control::{CancelToken, InFlight, InFlightGuard};
use crate::resource::{ResourceConfig, ResourceId};
use crate::retry::{JitterSource, RandomJitter};
use crate::session::{Session, SessionProvider};
use crate::source::RemoteDataSource;
use crate::state::{PresentationState, StateStore};

use task::ResourceTask;

/// User-facing message surfaced when the session is rejected.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please sign in again";

/// Coordinates concurrent resource loads for one UI context.
///
/// Dropping the orchestrator cancels the current invocation.
pub struct FetchOrchestrator {
    source: Arc<dyn RemoteDataSource>,
    session: Arc<dyn SessionProvider>,
    resources: Vec<ResourceConfig>,
    jitter: Arc<dyn JitterSource>,
    store: Arc<StateStore>,
    in_flight: Arc<InFlight>,
    current: Mutex<CancelToken>,
    /// Serializes `load_data` calls.
    load_lock: tokio::sync::Mutex<()>,
}

impl FetchOrchestrator {
    pub fn new(
        source: Arc<dyn RemoteDataSource>,
        session: Arc<dyn SessionProvider>,
        resources: Vec<ResourceConfig>,
    ) -> Self {
        let store = StateStore::new(PresentationState::with_resources(
            resources.iter().map(|r| r.id),
        ));
        Self {
            source,
            session,
            resources,
            jitter: Arc::new(RandomJitter),
            store: Arc::new(store),
            in_flight: Arc::new(InFlight::new()),
            current: Mutex::new(CancelToken::new()),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the backoff jitter source (tests pin it to a fixed value).
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn resources(&self) -> &[ResourceConfig] {
        &self.resources
    }

    /// Stream of presentation states; the receiver starts at the current state.
    pub fn observe(&self) -> watch::Receiver<PresentationState> {
        self.store.subscribe()
    }

    /// Snapshot of the current presentation state.
    pub fn state(&self) -> PresentationState {
        self.store.current()
    }

    /// Start a fresh load of every resource.
    ///
    /// Any earlier invocation is cancelled and its tasks are awaited first,
    /// so a resource is never loading twice at once. Returns once all drivers
    /// are launched; use [`FetchOrchestrator::wait_idle`] to await outcomes.
    pub async fn load_data(&self) {
        let _serial = self.load_lock.lock().await;

        let cancel = {
            let mut current = lock(&self.current);
            self.store.cancel_fenced(&current);
            *current = CancelToken::new();
            current.clone()
        };
        self.in_flight.wait_idle().await;

        let session = self.session.snapshot();
        tracing::info!(
            resources = self.resources.len(),
            authenticated = session.is_authenticated,
            "loading data"
        );

        let ids: Vec<ResourceId> = self.resources.iter().map(|r| r.id).collect();
        self.store.update_unless_cancelled(&cancel, |state| {
            state.last_error = None;
            state.session_expired = false;
            for id in &ids {
                let entry = state.resources.entry(*id).or_default();
                entry.loading = true;
                entry.error = None;
                entry.fallback = None;
            }
        });

        for config in &self.resources {
            let Some(guard) = self.in_flight.try_claim(config.id) else {
                tracing::debug!(resource = %config.id, "already loading, not relaunching");
                continue;
            };
            self.spawn(config.clone(), session.clone(), cancel.clone(), guard, None);
        }
    }

    /// Same as [`FetchOrchestrator::load_data`].
    pub async fn retry(&self) {
        self.load_data().await;
    }

    /// Re-run one resource's driver without touching the others.
    ///
    /// No-op (returns `false`) if that resource is already loading, a full
    /// load is being launched, the resource is unknown, or the current
    /// invocation was cancelled. Must be called within a Tokio runtime.
    pub fn retry_resource_in_background(&self, id: ResourceId) -> bool {
        let Some(config) = self.resources.iter().find(|r| r.id == id).cloned() else {
            tracing::warn!(resource = %id, "retry requested for unconfigured resource");
            return false;
        };
        let Ok(_serial) = self.load_lock.try_lock() else {
            tracing::debug!(resource = %id, "full load in progress, skipping background retry");
            return false;
        };
        let cancel = lock(&self.current).clone();
        if cancel.is_cancelled() {
            tracing::debug!(resource = %id, "invocation cancelled, skipping background retry");
            return false;
        }
        let Some(guard) = self.in_flight.try_claim(id) else {
            tracing::debug!(resource = %id, "already loading, background retry is a no-op");
            return false;
        };

        let mut stale_error = None;
        self.store.update_resource(&cancel, id, |entry| {
            entry.loading = true;
            stale_error = entry.error.take();
        });
        let session = self.session.snapshot();
        tracing::info!(resource = %id, "retrying in background");
        self.spawn(config, session, cancel, guard, stale_error);
        true
    }

    /// Clear the global and per-resource error messages.
    pub fn clear_error(&self) {
        self.store.update(|state| {
            state.last_error = None;
            for entry in state.resources.values_mut() {
                entry.error = None;
            }
        });
    }

    /// Cancel the current invocation. Once this returns, no further state
    /// update from it is published and no further retries are scheduled.
    pub fn cancel(&self) {
        let current = lock(&self.current);
        if !current.is_cancelled() {
            tracing::info!("cancelling in-flight loads");
        }
        self.store.cancel_fenced(&current);
    }

    /// Wait until no resource task is running.
    pub async fn wait_idle(&self) {
        self.in_flight.wait_idle().await;
    }

    fn spawn(
        &self,
        config: ResourceConfig,
        session: Session,
        cancel: CancelToken,
        guard: InFlightGuard,
        stale_error: Option<String>,
    ) {
        let task = ResourceTask {
            config,
            session,
            cancel,
            stale_error,
            source: Arc::clone(&self.source),
            provider: Arc::clone(&self.session),
            jitter: Arc::clone(&self.jitter),
            store: Arc::clone(&self.store),
        };
        tokio::spawn(task.run(guard));
    }
}

impl Drop for FetchOrchestrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
