//! Concurrent directory scanning engine for canopy.
//!
//! # Overview
//!
//! `canopy-scan` walks a directory tree asynchronously and folds it into a
//! flat list of per-folder statistics. Key features:
//!
//! - **Bounded concurrency** across the whole scan
//! - **Depth limit** that changes the shape of the result, never its totals
//! - **Cycle safety** via canonical directory tracking
//! - **Throttled progress** via callback and broadcast channel
//! - **Cooperative cancellation**
//!
//! # Example
//!
//! ```rust,no_run
//! use canopy_scan::{ScanConfig, ScanHooks, Scanner};
//!
//! # async fn run() -> Result<(), canopy_scan::ScanError> {
//! let config = ScanConfig::new("/path/to/scan");
//! let result = Scanner::new().scan(&config, ScanHooks::new()).await?;
//!
//! println!("Total size: {} bytes", result.total_size);
//! println!("Total files: {}", result.total_file_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Progress and cancellation
//!
//! ```rust,no_run
//! use canopy_scan::{ScanConfig, ScanHooks, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let token = CancellationToken::new();
//! let hooks = ScanHooks::new()
//!     .with_progress(|p| eprintln!("{} files", p.files_scanned))
//!     .with_token(token.clone());
//!
//! let scanner = Scanner::new();
//! let outcome = scanner.scan(&ScanConfig::new("."), hooks).await;
//! # let _ = outcome;
//! # }
//! ```

mod aggregate;
mod context;
mod hooks;
mod progress;
mod registry;
mod runner;
mod scanner;
mod walker;

pub use hooks::{CancelFn, ScanHooks};
pub use progress::{PROGRESS_INTERVAL, ProgressFn, ScanPhase, ScanProgress};
pub use registry::ScanRegistry;
pub use runner::{RunError, run_bounded};
pub use scanner::Scanner;

// Re-export core types for convenience
pub use canopy_core::{
    FileStats, FolderStats, NodeId, ScanConfig, ScanError, ScanId, ScanResult, ScanWarning,
    TypeBreakdown, TypeCategory, WarningKind,
};
