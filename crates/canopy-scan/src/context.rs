//! State owned by one scan and shared by all of its concurrent descents.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use dashmap::DashSet;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

use canopy_core::{ExclusionPolicy, FileStats, ScanConfig, ScanError, ScanWarning};

use crate::hooks::ScanHooks;
use crate::progress::{ProgressReporter, ScanPhase};

pub(crate) struct ScanContext {
    pub config: ScanConfig,
    pub policy: ExclusionPolicy,
    hooks: ScanHooks,
    reporter: ProgressReporter,
    /// Canonical directory paths already entered.
    visited: DashSet<PathBuf>,
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    leaf_count: AtomicUsize,
    leaves: Mutex<Vec<FileStats>>,
    warnings: Mutex<Vec<ScanWarning>>,
    /// Bounds filesystem calls across every descent of this scan.
    io_permits: Semaphore,
}

impl ScanContext {
    pub fn new(
        config: ScanConfig,
        policy: ExclusionPolicy,
        hooks: ScanHooks,
        reporter: ProgressReporter,
    ) -> Self {
        let permits = config.effective_concurrency();
        Self {
            config,
            policy,
            hooks,
            reporter,
            visited: DashSet::new(),
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            leaf_count: AtomicUsize::new(0),
            leaves: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
            io_permits: Semaphore::new(permits),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.hooks.cancelled()
    }

    /// Wait for a filesystem slot. Never held across recursion.
    pub async fn io_permit(&self) -> Option<SemaphorePermit<'_>> {
        self.io_permits.acquire().await.ok()
    }

    /// Mark a canonical directory as entered. Returns `false` on a revisit.
    pub fn visit(&self, canonical: &Path) -> bool {
        self.visited.insert(canonical.to_path_buf())
    }

    pub fn record_dir(&self, path: &Path) {
        let dirs = self.dirs_scanned.fetch_add(1, Ordering::Relaxed) + 1;
        let files = self.files_scanned.load(Ordering::Relaxed);
        self.reporter.tick(files, dirs, Some(path));
    }

    pub fn record_file(&self, path: &Path) {
        let files = self.files_scanned.fetch_add(1, Ordering::Relaxed) + 1;
        if files == self.config.soft_file_limit.saturating_add(1) {
            warn!(
                limit = self.config.soft_file_limit,
                "scan passed the soft file limit; continuing"
            );
        }
        let dirs = self.dirs_scanned.load(Ordering::Relaxed);
        self.reporter.tick(files, dirs, Some(path));
    }

    /// Store a per-file record, failing once the configured cap is reached.
    pub fn push_leaf(&self, leaf: FileStats) -> Result<(), ScanError> {
        let cap = self.config.file_leaf_cap;
        if self.leaf_count.fetch_add(1, Ordering::Relaxed) >= cap {
            return Err(ScanError::LeafCapExceeded { cap });
        }
        if let Ok(mut leaves) = self.leaves.lock() {
            leaves.push(leaf);
        }
        Ok(())
    }

    /// Record a recovered per-entry problem.
    pub fn warn(&self, warning: ScanWarning) {
        debug!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(warning);
        }
    }

    pub fn counts(&self) -> (u64, u64) {
        (
            self.files_scanned.load(Ordering::Relaxed),
            self.dirs_scanned.load(Ordering::Relaxed),
        )
    }

    pub fn report_phase(&self, phase: ScanPhase) {
        let (files, dirs) = self.counts();
        self.reporter.phase(files, dirs, phase);
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.reporter.elapsed()
    }

    /// Hand over collected leaves and warnings once the walk is over.
    pub fn take_outputs(&self) -> (Vec<FileStats>, Vec<ScanWarning>) {
        let leaves = self
            .leaves
            .lock()
            .map(|mut l| std::mem::take(&mut *l))
            .unwrap_or_default();
        let warnings = self
            .warnings
            .lock()
            .map(|mut w| std::mem::take(&mut *w))
            .unwrap_or_default();
        (leaves, warnings)
    }
}
