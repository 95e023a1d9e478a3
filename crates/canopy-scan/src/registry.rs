//! Cancellation handles for scans that are currently running.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use canopy_core::ScanId;

use crate::hooks::ScanHooks;

/// Tracks in-flight scans by id so they can be cancelled from elsewhere.
#[derive(Debug, Default)]
pub struct ScanRegistry {
    active: DashMap<ScanId, CancellationToken>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `scan_id` and return hooks wired to its cancellation token.
    ///
    /// Registering an id that is already active replaces its token; the old
    /// token is cancelled.
    pub fn register(&self, scan_id: ScanId) -> (CancellationToken, ScanHooks) {
        let token = CancellationToken::new();
        if let Some(previous) = self.active.insert(scan_id, token.clone()) {
            previous.cancel();
        }
        let hooks = ScanHooks::new().with_token(token.clone());
        (token, hooks)
    }

    /// Cancel a running scan. Returns `false` when the id is unknown.
    pub fn cancel(&self, scan_id: &ScanId) -> bool {
        match self.active.get(scan_id) {
            Some(token) => {
                debug!(scan_id = %scan_id, "cancelling scan");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered scan.
    pub fn cancel_all(&self) {
        for entry in self.active.iter() {
            entry.value().cancel();
        }
    }

    /// Forget a finished scan.
    pub fn remove(&self, scan_id: &ScanId) {
        self.active.remove(scan_id);
    }

    pub fn is_active(&self, scan_id: &ScanId) -> bool {
        self.active.contains_key(scan_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
