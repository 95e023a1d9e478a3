//! Recursive, bounded-concurrency directory walker.
//!
//! Directories within the depth limit become [`FolderNode`]s; anything deeper
//! is folded into the direct statistics of its deepest visible ancestor, so
//! totals do not depend on the depth limit.

use std::fs::FileType;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use futures::future::{BoxFuture, FutureExt};

use canopy_core::{
    FileStats, NodeId, ScanError, ScanWarning, TypeBreakdown, TypeCategory, classify,
};

use crate::context::ScanContext;
use crate::runner::{RunError, run_bounded};

/// Size, count and per-category tally of a set of files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Totals {
    pub size: u64,
    pub files: u64,
    pub breakdown: TypeBreakdown,
}

impl Totals {
    pub fn add_file(&mut self, category: TypeCategory, size: u64) {
        self.size += size;
        self.files += 1;
        self.breakdown.record(category, size);
    }

    pub fn merge(&mut self, other: &Totals) {
        self.size += other.size;
        self.files += other.files;
        self.breakdown.merge(&other.breakdown);
    }
}

/// A folder under construction. Owned by the walker until aggregation.
#[derive(Debug)]
pub(crate) struct FolderNode {
    pub id: NodeId,
    pub path: PathBuf,
    pub name: CompactString,
    pub depth: u32,
    pub children: Vec<FolderNode>,
    /// Files directly inside, plus everything folded in from below the depth limit.
    pub direct: Totals,
}

impl FolderNode {
    pub fn new(id: NodeId, path: PathBuf, name: CompactString, depth: u32) -> Self {
        Self {
            id,
            path,
            name,
            depth,
            children: Vec::new(),
            direct: Totals::default(),
        }
    }
}

/// Display name of a path: its last component, or the whole path for roots.
pub(crate) fn display_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

/// Directory entry that survived the hidden-name filter.
struct Listed {
    path: PathBuf,
    name: CompactString,
    file_type: FileType,
}

/// What an entry turned out to be once symlinks and policies were applied.
enum Resolved {
    File { size: u64 },
    Dir,
}

enum Outcome {
    Skipped,
    File { category: TypeCategory, size: u64 },
    Child(FolderNode),
    Folded(Totals),
}

fn into_scan_error(err: RunError<ScanError>) -> ScanError {
    match err {
        RunError::Cancelled => ScanError::Cancelled,
        RunError::Failed(err) => err,
    }
}

/// Walk `path` as a folder node at `depth`.
///
/// Returns `None` when the directory's real path was already visited in this
/// scan (hard link, symlink ring, re-entrant mount).
pub(crate) fn walk_dir<'a>(
    ctx: &'a ScanContext,
    path: PathBuf,
    name: CompactString,
    depth: u32,
) -> BoxFuture<'a, Result<Option<FolderNode>, ScanError>> {
    async move {
        let Some(canonical) = enter(ctx, &path).await else {
            return Ok(None);
        };
        let mut node = FolderNode::new(NodeId::from_path(&canonical), path, name, depth);

        let entries = list_dir(ctx, &node.path).await;
        let parent_id = node.id;
        let outcomes = run_bounded(
            entries,
            ctx.config.effective_concurrency(),
            || ctx.is_cancelled(),
            |entry| visit_entry(ctx, entry, parent_id, depth),
        )
        .await
        .map_err(into_scan_error)?;

        for outcome in outcomes {
            match outcome {
                Outcome::Skipped => {}
                Outcome::File { category, size } => node.direct.add_file(category, size),
                Outcome::Child(child) => node.children.push(child),
                Outcome::Folded(totals) => node.direct.merge(&totals),
            }
        }

        Ok(Some(node))
    }
    .boxed()
}

/// Sum everything below `path` without creating nodes.
///
/// Shares the visited set with [`walk_dir`], so cycles below the depth limit
/// terminate the same way.
fn fold_dir(ctx: &ScanContext, path: PathBuf) -> BoxFuture<'_, Result<Option<Totals>, ScanError>> {
    async move {
        if enter(ctx, &path).await.is_none() {
            return Ok(None);
        }

        let entries = list_dir(ctx, &path).await;
        let parts = run_bounded(
            entries,
            ctx.config.effective_concurrency(),
            || ctx.is_cancelled(),
            |entry| fold_entry(ctx, entry),
        )
        .await
        .map_err(into_scan_error)?;

        let mut totals = Totals::default();
        for part in parts.iter().flatten() {
            totals.merge(part);
        }
        Ok(Some(totals))
    }
    .boxed()
}

async fn visit_entry(
    ctx: &ScanContext,
    entry: Listed,
    parent_id: NodeId,
    parent_depth: u32,
) -> Result<Outcome, ScanError> {
    match resolve(ctx, &entry).await {
        None => Ok(Outcome::Skipped),
        Some(Resolved::File { size }) => {
            ctx.record_file(&entry.path);
            let category = classify(&entry.name);
            if ctx.config.include_files {
                ctx.push_leaf(FileStats {
                    id: NodeId::from_path(&entry.path),
                    path: entry.path,
                    name: entry.name,
                    parent_id,
                    depth: parent_depth + 1,
                    size,
                    category,
                })?;
            }
            Ok(Outcome::File { category, size })
        }
        Some(Resolved::Dir) => {
            let depth = parent_depth + 1;
            if ctx.config.within_depth(depth) {
                let child = walk_dir(ctx, entry.path, entry.name, depth).await?;
                Ok(child.map_or(Outcome::Skipped, Outcome::Child))
            } else {
                let folded = fold_dir(ctx, entry.path).await?;
                Ok(folded.map_or(Outcome::Skipped, Outcome::Folded))
            }
        }
    }
}

async fn fold_entry(ctx: &ScanContext, entry: Listed) -> Result<Option<Totals>, ScanError> {
    match resolve(ctx, &entry).await {
        None => Ok(None),
        Some(Resolved::File { size }) => {
            ctx.record_file(&entry.path);
            let mut totals = Totals::default();
            totals.add_file(classify(&entry.name), size);
            Ok(Some(totals))
        }
        Some(Resolved::Dir) => fold_dir(ctx, entry.path).await,
    }
}

/// Resolve the real path of a directory and claim it for this scan.
async fn enter(ctx: &ScanContext, path: &Path) -> Option<PathBuf> {
    let canonical = {
        let _permit = ctx.io_permit().await;
        tokio::fs::canonicalize(path).await
    };
    let canonical = canonical.unwrap_or_else(|_| path.to_path_buf());
    ctx.visit(&canonical).then_some(canonical)
}

/// List a directory, dropping hidden names. Unreadable directories are empty.
async fn list_dir(ctx: &ScanContext, path: &Path) -> Vec<Listed> {
    let _permit = ctx.io_permit().await;

    let mut read_dir = match tokio::fs::read_dir(path).await {
        Ok(rd) => rd,
        Err(err) => {
            ctx.warn(ScanWarning::read_error(path, &err));
            return Vec::new();
        }
    };
    ctx.record_dir(path);

    let mut entries = Vec::new();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                ctx.warn(ScanWarning::read_error(path, &err));
                break;
            }
        };

        let name = CompactString::new(entry.file_name().to_string_lossy());
        if ctx.config.should_skip_hidden(&name) {
            continue;
        }
        match entry.file_type().await {
            Ok(file_type) => entries.push(Listed {
                path: entry.path(),
                name,
                file_type,
            }),
            Err(err) => ctx.warn(ScanWarning::metadata_error(entry.path(), &err)),
        }
    }
    entries
}

/// Apply symlink and exclusion policy and fetch file sizes.
async fn resolve(ctx: &ScanContext, entry: &Listed) -> Option<Resolved> {
    let file_type = entry.file_type;

    if file_type.is_dir() {
        return (!ctx.policy.is_excluded(&entry.path)).then_some(Resolved::Dir);
    }

    let metadata = if file_type.is_symlink() {
        if !ctx.config.follow_symlinks {
            return None;
        }
        let target = {
            let _permit = ctx.io_permit().await;
            tokio::fs::metadata(&entry.path).await
        };
        match target {
            Ok(meta) if meta.is_dir() => {
                return (!ctx.policy.is_excluded(&entry.path)).then_some(Resolved::Dir);
            }
            Ok(meta) => meta,
            Err(_) => {
                ctx.warn(ScanWarning::broken_symlink(&entry.path));
                return None;
            }
        }
    } else if file_type.is_file() {
        let meta = {
            let _permit = ctx.io_permit().await;
            tokio::fs::symlink_metadata(&entry.path).await
        };
        match meta {
            Ok(meta) => meta,
            Err(err) => {
                ctx.warn(ScanWarning::metadata_error(&entry.path, &err));
                return None;
            }
        }
    } else {
        // Sockets, fifos, devices.
        return None;
    };

    if !metadata.is_file() {
        return None;
    }
    Some(Resolved::File {
        size: metadata.len(),
    })
}
