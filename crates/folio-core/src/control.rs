//! Load control: cancellation tokens and the in-flight resource registry.
//!
//! Every load invocation owns a [`CancelToken`]; each suspension point in the
//! retry driver races it. [`InFlight`] records which resources currently have
//! a running driver so the same resource is never loaded twice at once.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::resource::ResourceId;

/// Cancellation token shared by all tasks of one load invocation.
///
/// Cloning yields a handle to the same token. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled (immediately if it already is).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Registry of resources with a driver currently running.
#[derive(Debug)]
pub struct InFlight {
    active: watch::Sender<BTreeSet<ResourceId>>,
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlight {
    pub fn new() -> Self {
        let (active, _rx) = watch::channel(BTreeSet::new());
        Self { active }
    }

    /// Claim `id` for a new driver run. Returns `None` if it is already running.
    /// The claim is released when the returned guard is dropped.
    pub fn try_claim(self: &Arc<Self>, id: ResourceId) -> Option<InFlightGuard> {
        let claimed = self.active.send_if_modified(|active| active.insert(id));
        claimed.then(|| InFlightGuard {
            registry: Arc::clone(self),
            id,
        })
    }

    pub fn is_active(&self, id: ResourceId) -> bool {
        self.active.borrow().contains(&id)
    }

    pub fn active(&self) -> Vec<ResourceId> {
        self.active.borrow().iter().copied().collect()
    }

    /// Wait until no resource is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        let _ = rx.wait_for(|active| active.is_empty()).await;
    }

    fn release(&self, id: ResourceId) {
        self.active.send_modify(|active| {
            active.remove(&id);
        });
    }
}

/// Releases an in-flight claim when dropped, including on panic unwind.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlight>,
    id: ResourceId,
}

impl InFlightGuard {
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
