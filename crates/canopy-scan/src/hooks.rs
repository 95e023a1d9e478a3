//! Caller-side collaborators of a scan: progress sink and cancellation check.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressFn, ScanProgress};

/// Predicate polled before new work is scheduled.
pub type CancelFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Optional callbacks attached to a single scan.
#[derive(Clone, Default)]
pub struct ScanHooks {
    pub(crate) on_progress: Option<ProgressFn>,
    pub(crate) is_cancelled: Option<CancelFn>,
}

impl ScanHooks {
    /// Hooks with no listener and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive progress snapshots.
    pub fn with_progress(mut self, f: impl Fn(&ScanProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Stop the scan once `f` returns true.
    pub fn with_cancel(mut self, f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_cancelled = Some(Arc::new(f));
        self
    }

    /// Stop the scan once `token` is cancelled.
    pub fn with_token(self, token: CancellationToken) -> Self {
        self.with_cancel(move || token.is_cancelled())
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.is_cancelled.as_ref().is_some_and(|f| f())
    }
}

impl fmt::Debug for ScanHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanHooks")
            .field("on_progress", &self.on_progress.is_some())
            .field("is_cancelled", &self.is_cancelled.is_some())
            .finish()
    }
}
