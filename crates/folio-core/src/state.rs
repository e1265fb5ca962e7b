//! Presentation state and the shared, observable container that holds it.
//!
//! The container is the only shared mutable value in the load path. Every
//! write is an atomic read-modify-write of the whole state under the watch
//! channel's lock, so concurrent resource outcomes touch only their own entry
//! and never overwrite each other. Subscribers always see the latest value.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::watch;

use crate::control::CancelToken;
use crate::models::ResourceValue;
use crate::resource::ResourceId;
use crate::retry::FallbackReason;

/// Per-resource view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceState {
    pub loading: bool,
    /// Last known value; kept across failed reloads.
    pub value: Option<ResourceValue>,
    pub error: Option<String>,
    /// Set when `value` is a substituted fallback rather than real data.
    pub fallback: Option<FallbackReason>,
}

/// What the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresentationState {
    pub resources: BTreeMap<ResourceId, ResourceState>,
    pub last_error: Option<String>,
    /// A load was rejected because the session expired; the user must sign in again.
    pub session_expired: bool,
}

impl PresentationState {
    pub fn with_resources(ids: impl IntoIterator<Item = ResourceId>) -> Self {
        Self {
            resources: ids
                .into_iter()
                .map(|id| (id, ResourceState::default()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceState> {
        self.resources.get(&id)
    }

    pub fn any_loading(&self) -> bool {
        self.resources.values().any(|r| r.loading)
    }
}

/// Observable holder of the current [`PresentationState`].
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<PresentationState>,
}

impl StateStore {
    pub fn new(initial: PresentationState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// New receivers see the current state immediately, then every later update.
    pub fn subscribe(&self) -> watch::Receiver<PresentationState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> PresentationState {
        self.tx.borrow().clone()
    }

    /// Apply `f` atomically and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut PresentationState)) {
        self.tx.send_modify(f);
    }

    /// Apply `f` unless `cancel` has fired. Returns whether the update was published.
    ///
    /// The cancel check and the write happen under the same lock that
    /// [`StateStore::cancel_fenced`] takes, so nothing can slip in after a fenced cancel.
    pub fn update_unless_cancelled(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce(&mut PresentationState),
    ) -> bool {
        self.tx.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            f(state);
            true
        })
    }

    /// Like [`StateStore::update_unless_cancelled`] for a single resource entry.
    pub fn update_resource(
        &self,
        cancel: &CancelToken,
        id: ResourceId,
        f: impl FnOnce(&mut ResourceState),
    ) -> bool {
        self.update_unless_cancelled(cancel, |state| f(state.resources.entry(id).or_default()))
    }

    /// Cancel `token` while holding the state lock. Once this returns, no
    /// update guarded by `token` can be published.
    pub fn cancel_fenced(&self, token: &CancelToken) {
        self.tx.send_if_modified(|_| {
            token.cancel();
            false
        });
    }
}
