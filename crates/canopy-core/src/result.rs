//! Scan result container.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::TypeBreakdown;
use crate::config::ScanId;
use crate::error::ScanWarning;
use crate::node::{FileStats, FolderStats, NodeId};

/// Complete, internally consistent outcome of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Scan this result belongs to.
    pub scan_id: ScanId,

    /// Canonical root path that was scanned.
    pub root_path: PathBuf,

    /// Id of the root folder in `folders`.
    pub root_id: NodeId,

    /// When this result was produced.
    pub generated_at: DateTime<Utc>,

    /// Wall-clock duration of the scan.
    pub scan_duration: Duration,

    /// Every folder, flattened. Order carries no meaning; parent/child ids do.
    pub folders: Vec<FolderStats>,

    /// Equal to the root folder's total size.
    pub total_size: u64,

    /// Equal to the root folder's file count.
    pub total_file_count: u64,

    /// Per-file records, present only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileStats>>,

    /// Entries skipped because they could not be read.
    #[serde(default)]
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    /// Look up a folder by id.
    pub fn folder(&self, id: NodeId) -> Option<&FolderStats> {
        self.folders.iter().find(|f| f.id == id)
    }

    /// The root folder.
    pub fn root(&self) -> Option<&FolderStats> {
        self.folder(self.root_id)
    }

    /// Immediate child folders of `id`, in listing order.
    pub fn children(&self, id: NodeId) -> Vec<&FolderStats> {
        let index = self.index();
        self.folder(id)
            .map(|parent| {
                parent
                    .children_ids
                    .iter()
                    .filter_map(|child| index.get(child).map(|&i| &self.folders[i]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Map from folder id to position in `folders`.
    pub fn index(&self) -> HashMap<NodeId, usize> {
        self.folders
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id, i))
            .collect()
    }

    /// Per-category totals for the whole scan.
    pub fn category_totals(&self) -> TypeBreakdown {
        self.root().map(|r| r.type_breakdown).unwrap_or_default()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
