//! Asynchronous directory scanner.

use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use canopy_core::{ExclusionPolicy, NodeId, Platform, ScanConfig, ScanError, ScanId, ScanResult};

use crate::aggregate::flatten;
use crate::context::ScanContext;
use crate::hooks::ScanHooks;
use crate::progress::{ProgressReporter, ScanPhase, ScanProgress};
use crate::walker::{FolderNode, display_name, walk_dir};

/// Concurrent scanner producing a [`ScanResult`] per call.
///
/// Scans share nothing but the progress channel; running several at once
/// on the same scanner is fine.
pub struct Scanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Scanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to progress snapshots of every scan run by this scanner.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan `config.root` and aggregate folder statistics.
    ///
    /// Exactly one terminal progress snapshot is emitted: `Cancelled` when the
    /// scan was cancelled, `Done` otherwise (including failures).
    pub async fn scan(
        &self,
        config: &ScanConfig,
        hooks: ScanHooks,
    ) -> Result<ScanResult, ScanError> {
        let scan_id = config.scan_id.clone().unwrap_or_else(ScanId::generate);
        let reporter = ProgressReporter::new(
            scan_id.clone(),
            hooks.on_progress.clone(),
            self.progress_tx.clone(),
        );

        if let Err(err) = config.validate() {
            warn!(scan_id = %scan_id, "rejected scan config: {err}");
            reporter.phase(0, 0, ScanPhase::Done);
            return Err(err);
        }

        let root_path = match resolve_root(config).await {
            Ok(root) => root,
            Err(err) => {
                warn!(scan_id = %scan_id, root = %config.root.display(), "cannot scan root: {err}");
                reporter.phase(0, 0, ScanPhase::Done);
                return Err(err);
            }
        };

        let policy = ExclusionPolicy::new(&root_path, config.include_system, Platform::current());
        let ctx = ScanContext::new(config.clone(), policy, hooks, reporter);

        info!(
            scan_id = %scan_id,
            root = %root_path.display(),
            max_depth = ?config.depth_limit(),
            concurrency = config.effective_concurrency(),
            system_excluded = ctx.policy.is_active(),
            "scan started"
        );

        match run(&ctx, &scan_id, root_path).await {
            Ok(result) => {
                ctx.report_phase(ScanPhase::Done);
                info!(
                    scan_id = %scan_id,
                    folders = result.folder_count(),
                    files = result.total_file_count,
                    bytes = result.total_size,
                    warnings = result.warnings.len(),
                    elapsed_ms = result.scan_duration.as_millis() as u64,
                    "scan finished"
                );
                Ok(result)
            }
            Err(err) if err.is_cancelled() => {
                ctx.report_phase(ScanPhase::Cancelled);
                info!(scan_id = %scan_id, "scan cancelled");
                Err(err)
            }
            Err(err) => {
                ctx.report_phase(ScanPhase::Done);
                warn!(scan_id = %scan_id, "scan failed: {err}");
                Err(err)
            }
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

async fn resolve_root(config: &ScanConfig) -> Result<PathBuf, ScanError> {
    let root = tokio::fs::canonicalize(&config.root)
        .await
        .map_err(|e| ScanError::io(&config.root, e))?;
    let metadata = tokio::fs::metadata(&root)
        .await
        .map_err(|e| ScanError::io(&root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path: root });
    }
    Ok(root)
}

async fn run(
    ctx: &ScanContext,
    scan_id: &ScanId,
    root_path: PathBuf,
) -> Result<ScanResult, ScanError> {
    let name = display_name(&root_path);
    let root = match walk_dir(ctx, root_path.clone(), name.clone(), 0).await? {
        Some(root) => root,
        None => FolderNode::new(NodeId::from_path(&root_path), root_path.clone(), name, 0),
    };

    // Late cancellation still wins over a finished walk.
    if ctx.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    ctx.report_phase(ScanPhase::Summing);
    let root_id = root.id;
    let folders = flatten(root);
    let (total_size, total_file_count) = folders
        .iter()
        .find(|f| f.id == root_id)
        .map(|f| (f.total_size, f.file_count))
        .unwrap_or_default();

    let (leaves, warnings) = ctx.take_outputs();
    let files = ctx.config.include_files.then_some(leaves);

    Ok(ScanResult {
        scan_id: scan_id.clone(),
        root_path,
        root_id,
        generated_at: Utc::now(),
        scan_duration: ctx.elapsed(),
        folders,
        total_size,
        total_file_count,
        files,
        warnings,
    })
}
