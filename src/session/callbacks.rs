// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session listeners
//!
//! Listeners are held weakly: registering one does not keep it alive, and a
//! dropped listener silently disappears from the registry. A listener that
//! panics is logged and skipped; the remaining listeners still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::warn;

use crate::protocol::{PeerData, TransactionRequest};
use crate::transport::TransportStatus;

/// High-level session events. Every method defaults to a no-op.
pub trait SessionCallback: Send + Sync {
    fn on_status(&self, _status: TransportStatus) {}

    /// A dApp asked to pair; answer with `approve()` or `reject()`
    fn session_request(&self, _peer: &PeerData) {}

    /// The peer ended the session
    fn session_closed(&self, _message: Option<&str>) {}

    /// Transaction request from an approved account
    fn send_transaction(&self, _transaction: &TransactionRequest) {}
}

#[derive(Default)]
pub struct CallbackRegistry {
    listeners: Mutex<Vec<Weak<dyn SessionCallback>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<dyn SessionCallback>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener; registering twice has no effect
    pub fn add(&self, listener: Weak<dyn SessionCallback>) {
        let mut listeners = self.lock();
        if !listeners.iter().any(|l| Weak::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn remove(&self, listener: &Weak<dyn SessionCallback>) {
        self.lock().retain(|l| !Weak::ptr_eq(l, listener));
    }

    /// Number of listeners still alive
    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().iter().filter(|l| l.strong_count() > 0).count()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` once for every live listener.
    ///
    /// The registry lock is released before any listener runs, so listeners
    /// may call back into the session.
    pub fn notify<F>(&self, event: &str, f: F)
    where
        F: Fn(&dyn SessionCallback),
    {
        let live: Vec<Arc<dyn SessionCallback>> = {
            let mut listeners = self.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };

        for listener in live {
            if catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))).is_err() {
                warn!("Session listener panicked while handling {}", event);
            }
        }
    }
}
