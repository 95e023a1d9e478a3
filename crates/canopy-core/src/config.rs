//! Scan configuration types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Default number of in-flight filesystem operations.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Upper bound applied to any requested concurrency.
pub const MAX_CONCURRENCY: usize = 256;

/// Default advisory file count.
pub const DEFAULT_SOFT_FILE_LIMIT: u64 = 1_000_000;

/// Default hard cap on per-file leaf records.
pub const DEFAULT_FILE_LEAF_CAP: usize = 200_000;

/// Identifier correlating progress events and cancellation requests with a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(pub String);

impl ScanId {
    /// Create a scan id from a caller-supplied string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id, unique within this process.
    pub fn generate() -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("scan-{}-{seq}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScanId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ScanId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Configuration for a single scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root directory to scan.
    pub root: PathBuf,

    /// Maximum folder depth represented as nodes (`None` or `Some(0)` = unlimited).
    ///
    /// Anything deeper is still counted, folded into its deepest visible ancestor.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files and well-known noise files.
    #[builder(default = "false")]
    #[serde(default)]
    pub include_hidden: bool,

    /// Descend into OS-reserved directories.
    #[builder(default = "false")]
    #[serde(default)]
    pub include_system: bool,

    /// Collect a record for every individual file.
    #[builder(default = "false")]
    #[serde(default)]
    pub include_files: bool,

    /// Maximum number of concurrent filesystem operations.
    #[builder(default = "DEFAULT_CONCURRENCY")]
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Advisory file count; crossing it is logged, never enforced.
    #[builder(default = "DEFAULT_SOFT_FILE_LIMIT")]
    #[serde(default = "default_soft_file_limit")]
    pub soft_file_limit: u64,

    /// Hard cap on file records when `include_files` is set.
    #[builder(default = "DEFAULT_FILE_LEAF_CAP")]
    #[serde(default = "default_file_leaf_cap")]
    pub file_leaf_cap: usize,

    /// Caller-supplied scan id; generated at scan start when absent.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub scan_id: Option<ScanId>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_soft_file_limit() -> u64 {
    DEFAULT_SOFT_FILE_LIMIT
}

fn default_file_leaf_cap() -> usize {
    DEFAULT_FILE_LEAF_CAP
}

fn check_root(root: &Path) -> Result<(), String> {
    if root.as_os_str().is_empty() {
        return Err("Root path cannot be empty".to_string());
    }
    Ok(())
}

fn check_leaf_cap(cap: usize) -> Result<(), String> {
    if cap == 0 {
        return Err("File leaf cap must be at least 1".to_string());
    }
    Ok(())
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) => check_root(root)?,
            None => return Err("Root path is required".to_string()),
        }
        if let Some(cap) = self.file_leaf_cap {
            check_leaf_cap(cap)?;
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config with defaults for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: None,
            follow_symlinks: false,
            include_hidden: false,
            include_system: false,
            include_files: false,
            concurrency: DEFAULT_CONCURRENCY,
            soft_file_limit: DEFAULT_SOFT_FILE_LIMIT,
            file_leaf_cap: DEFAULT_FILE_LEAF_CAP,
            scan_id: None,
        }
    }

    /// Apply the builder's rules to a config that may not have come from it.
    pub fn validate(&self) -> Result<(), ScanError> {
        check_root(&self.root)
            .and_then(|()| check_leaf_cap(self.file_leaf_cap))
            .map_err(|message| ScanError::InvalidConfig { message })
    }

    /// Concurrency clamped to `[1, MAX_CONCURRENCY]`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    /// Depth limit with the "unlimited" sentinels normalized away.
    pub fn depth_limit(&self) -> Option<u32> {
        self.max_depth.filter(|&d| d > 0)
    }

    /// Whether a folder at `depth` gets its own node.
    pub fn within_depth(&self, depth: u32) -> bool {
        self.depth_limit().is_none_or(|max| depth <= max)
    }

    /// Check if a name should be skipped by the hidden-file policy.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && crate::classify::is_hidden_name(name)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
