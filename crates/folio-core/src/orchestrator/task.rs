//! One resource load: session gate, retry driver, outcome publication.

use std::sync::Arc;

use crate::control::{CancelToken, InFlightGuard};
use crate::resource::ResourceConfig;
use crate::retry::{
    ErrorClass, JitterSource, LoadFailure, RetryDriver, RetryError, RetryOutcome,
};
use crate::session::{Session, SessionProvider};
use crate::source::RemoteDataSource;
use crate::state::{PresentationState, StateStore};

use super::SESSION_EXPIRED_MESSAGE;

pub(super) struct ResourceTask {
    pub(super) config: ResourceConfig,
    pub(super) session: Session,
    pub(super) cancel: CancelToken,
    /// Error this resource had published before a background retry.
    pub(super) stale_error: Option<String>,
    pub(super) source: Arc<dyn RemoteDataSource>,
    pub(super) provider: Arc<dyn SessionProvider>,
    pub(super) jitter: Arc<dyn JitterSource>,
    pub(super) store: Arc<StateStore>,
}

impl ResourceTask {
    /// Holds `_guard` until the outcome is published (or dropped on cancel).
    pub(super) async fn run(self, _guard: InFlightGuard) {
        let id = self.config.id;

        if self.config.requires_auth && !self.session.is_authenticated {
            tracing::debug!(resource = %id, "no authenticated session, skipping");
            self.store.update_resource(&self.cancel, id, |entry| {
                entry.loading = false;
                entry.value = None;
                entry.error = None;
                entry.fallback = None;
            });
            return;
        }

        let token = self.session.bearer().map(str::to_owned);
        let source = Arc::clone(&self.source);
        let driver = RetryDriver::new(id.as_str(), self.config.policy)
            .with_jitter(Arc::clone(&self.jitter))
            .with_cancel(self.cancel.clone())
            .with_fallback(self.config.fallback_supplier());

        let result = driver
            .run(|| {
                let source = Arc::clone(&source);
                let token = token.clone();
                async move {
                    let raw = source.fetch(id, token.as_deref()).await?;
                    id.decode(raw)
                }
            })
            .await;

        let run = match result {
            Ok(run) => run,
            Err(RetryError::Cancelled) => {
                tracing::debug!(resource = %id, "load cancelled, dropping outcome");
                return;
            }
            Err(e @ RetryError::Configuration(_)) => {
                tracing::error!(resource = %id, error = %e, "cannot load resource");
                self.publish_error(e.to_string(), false);
                return;
            }
        };

        match run.outcome {
            RetryOutcome::Success(value) => {
                tracing::info!(resource = %id, attempts = run.attempts, "loaded");
                self.store.update_unless_cancelled(&self.cancel, |state| {
                    self.clear_stale_error(state);
                    let entry = state.resources.entry(id).or_default();
                    entry.loading = false;
                    entry.value = Some(value);
                    entry.error = None;
                    entry.fallback = None;
                });
            }
            RetryOutcome::Fallback(value, reason) => {
                self.store.update_unless_cancelled(&self.cancel, |state| {
                    self.clear_stale_error(state);
                    let entry = state.resources.entry(id).or_default();
                    entry.loading = false;
                    entry.value = Some(value);
                    entry.error = None;
                    entry.fallback = Some(reason);
                });
            }
            RetryOutcome::Failed(failure) => {
                if failure.class == ErrorClass::AuthExpired {
                    // Report expiry only while this invocation is still live.
                    if !self.cancel.is_cancelled() {
                        self.provider.notify_expired();
                    }
                    self.publish_error(SESSION_EXPIRED_MESSAGE.to_string(), true);
                } else {
                    self.publish_error(self.failure_message(&failure), false);
                }
            }
        }
    }

    /// Drop the global error if it is still the one this resource raised.
    fn clear_stale_error(&self, state: &mut PresentationState) {
        let Some(stale) = self.stale_error.as_deref() else {
            return;
        };
        if state.last_error.as_deref() == Some(stale) {
            state.last_error = None;
        }
        if stale == SESSION_EXPIRED_MESSAGE {
            state.session_expired = false;
        }
    }

    fn failure_message(&self, failure: &LoadFailure) -> String {
        let label = self.config.id.label();
        if failure.exhausted() {
            format!(
                "Could not load {} after {} attempts: {}",
                label, failure.attempts, failure.error
            )
        } else {
            format!("Could not load {}: {}", label, failure.error)
        }
    }

    fn publish_error(&self, message: String, session_expired: bool) {
        let id = self.config.id;
        tracing::warn!(resource = %id, error = %message, "load failed");
        self.store.update_unless_cancelled(&self.cancel, |state| {
            let entry = state.resources.entry(id).or_default();
            entry.loading = false;
            entry.error = Some(message.clone());
            entry.fallback = None;
            state.last_error = Some(message);
            if session_expired {
                state.session_expired = true;
            }
        });
    }
}
