//! Folder and file statistics records.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::classify::{TypeBreakdown, TypeCategory};

/// Identifier of a folder or file, derived from its absolute path.
///
/// The same path always yields the same id, so ids are stable across scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Hash a path into an id (first eight bytes of its BLAKE3 digest).
    pub fn from_path(path: &Path) -> Self {
        let hash = blake3::hash(path.as_os_str().as_encoded_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Self(u64::from_le_bytes(bytes))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Aggregated statistics for one folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderStats {
    pub id: NodeId,
    pub path: PathBuf,
    pub name: CompactString,
    /// Root is depth 0.
    pub depth: u32,
    /// `None` for the scan root.
    pub parent_id: Option<NodeId>,

    /// Bytes in files directly inside this folder (plus folded-in deeper content).
    pub direct_size: u64,
    pub direct_file_count: u64,
    pub direct_breakdown: TypeBreakdown,

    /// Bytes in this folder and every descendant.
    pub total_size: u64,
    /// Files in this folder and every descendant.
    pub file_count: u64,
    /// Immediate child folders only.
    pub subfolder_count: u64,
    pub type_breakdown: TypeBreakdown,

    /// Child folder ids, in listing order.
    pub children_ids: Vec<NodeId>,
}

impl FolderStats {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children_ids.is_empty()
    }
}

/// A single file, recorded only when per-file output is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    pub id: NodeId,
    pub path: PathBuf,
    pub name: CompactString,
    pub parent_id: NodeId,
    /// Parent depth + 1.
    pub depth: u32,
    pub size: u64,
    pub category: TypeCategory,
}
