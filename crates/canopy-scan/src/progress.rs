//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;

use canopy_core::ScanId;

/// Minimum spacing between two non-terminal progress emissions.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Stage a scan is in when a snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    /// Walking the tree.
    Enumerating,
    /// Walk finished, folding statistics into the result.
    Summing,
    /// Scan finished, successfully or not.
    Done,
    /// Scan stopped at the caller's request.
    Cancelled,
}

impl ScanPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// Progress information during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    /// Scan this snapshot belongs to.
    pub scan_id: ScanId,
    /// Number of files counted so far.
    pub files_scanned: u64,
    /// Number of directories listed so far.
    pub dirs_scanned: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
    /// A path the walker touched recently.
    pub current_path: Option<PathBuf>,
    pub phase: ScanPhase,
}

impl ScanProgress {
    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Callback receiving progress snapshots.
pub type ProgressFn = Arc<dyn Fn(&ScanProgress) + Send + Sync>;

#[derive(Debug)]
struct ReporterState {
    last_emit: Option<Instant>,
    finished: bool,
}

/// Throttled fan-out of progress snapshots for a single scan.
///
/// Emission happens under a lock so that nothing can be delivered after the
/// terminal snapshot.
pub(crate) struct ProgressReporter {
    scan_id: ScanId,
    start: Instant,
    interval: Duration,
    callback: Option<ProgressFn>,
    broadcast: broadcast::Sender<ScanProgress>,
    state: Mutex<ReporterState>,
}

impl ProgressReporter {
    pub fn new(
        scan_id: ScanId,
        callback: Option<ProgressFn>,
        broadcast: broadcast::Sender<ScanProgress>,
    ) -> Self {
        Self {
            scan_id,
            start: Instant::now(),
            interval: PROGRESS_INTERVAL,
            callback,
            broadcast,
            state: Mutex::new(ReporterState {
                last_emit: None,
                finished: false,
            }),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Emit a snapshot unless one went out less than an interval ago.
    pub fn tick(&self, files: u64, dirs: u64, current_path: Option<&Path>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.finished {
            return;
        }
        let now = Instant::now();
        if state
            .last_emit
            .is_some_and(|last| now.duration_since(last) < self.interval)
        {
            return;
        }
        state.last_emit = Some(now);
        let current_path = current_path.map(Path::to_path_buf);
        self.emit(self.snapshot(files, dirs, current_path, ScanPhase::Enumerating));
    }

    /// Emit a phase change, bypassing the throttle.
    pub fn phase(&self, files: u64, dirs: u64, phase: ScanPhase) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.finished {
            return;
        }
        state.last_emit = Some(Instant::now());
        if phase.is_terminal() {
            state.finished = true;
        }
        self.emit(self.snapshot(files, dirs, None, phase));
    }

    fn snapshot(
        &self,
        files_scanned: u64,
        dirs_scanned: u64,
        current_path: Option<PathBuf>,
        phase: ScanPhase,
    ) -> ScanProgress {
        ScanProgress {
            scan_id: self.scan_id.clone(),
            files_scanned,
            dirs_scanned,
            elapsed: self.elapsed(),
            current_path,
            phase,
        }
    }

    fn emit(&self, progress: ScanProgress) {
        if let Some(callback) = &self.callback {
            callback(&progress);
        }
        // No subscribers is fine.
        let _ = self.broadcast.send(progress);
    }
}
