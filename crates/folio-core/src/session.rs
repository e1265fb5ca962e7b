//! Session snapshot and the provider interface the orchestrator reads from.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

/// Read-only view of the authentication state, taken once per load invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    pub token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            token: Some(token.into()),
        }
    }

    /// Bearer credential to send, only while authenticated.
    pub fn bearer(&self) -> Option<&str> {
        if self.is_authenticated {
            self.token.as_deref()
        } else {
            None
        }
    }
}

/// Owner of the session state. The orchestrator only reads snapshots and
/// reports expiry; it never mutates the session itself.
pub trait SessionProvider: Send + Sync {
    fn snapshot(&self) -> Session;

    /// A load was rejected with 401; stored credentials should be cleared.
    fn notify_expired(&self);
}

/// In-process session provider.
#[derive(Debug, Default)]
pub struct MemorySessionProvider {
    session: RwLock<Session>,
    expirations: AtomicU32,
}

impl MemorySessionProvider {
    pub fn new(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
            expirations: AtomicU32::new(0),
        }
    }

    pub fn signed_in(token: impl Into<String>) -> Self {
        Self::new(Session::authenticated(token))
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Session::authenticated(token);
    }

    pub fn sign_out(&self) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Session::anonymous();
    }

    /// How many times expiry has been reported.
    pub fn expirations(&self) -> u32 {
        self.expirations.load(Ordering::Relaxed)
    }
}

impl SessionProvider for MemorySessionProvider {
    fn snapshot(&self) -> Session {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn notify_expired(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
        tracing::info!("session expired; clearing stored credentials");
        self.sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_only_while_authenticated() {
        assert_eq!(Session::authenticated("abc").bearer(), Some("abc"));
        let stale = Session {
            is_authenticated: false,
            token: Some("abc".into()),
        };
        assert_eq!(stale.bearer(), None);
        assert_eq!(Session::anonymous().bearer(), None);
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let provider = MemorySessionProvider::signed_in("t1");
        let snap = provider.snapshot();
        provider.sign_out();
        assert!(snap.is_authenticated);
        assert!(!provider.snapshot().is_authenticated);
    }

    #[test]
    fn notify_expired_clears_session() {
        let provider = MemorySessionProvider::signed_in("t1");
        provider.notify_expired();
        assert_eq!(provider.snapshot(), Session::anonymous());
        assert_eq!(provider.expirations(), 1);
    }
}
