use canopy_scan::{
    FolderStats, NodeId, ScanConfig, ScanError, ScanHooks, ScanPhase, ScanProgress, ScanResult,
    Scanner, TypeCategory,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// root/
///   readme.md            12
///   photos/a.jpg         300
///   photos/b.png         200
///   photos/2020/c.jpg    400
///   src/main.rs          40
///   src/lib/x.rs         60
///   src/lib/deep/y.zip   1000
///   src/lib/deep/z.mp4   2000
fn create_test_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("photos/2020")).unwrap();
    fs::create_dir_all(root.join("src/lib/deep")).unwrap();

    write_bytes(root, "readme.md", 12);
    write_bytes(root, "photos/a.jpg", 300);
    write_bytes(root, "photos/b.png", 200);
    write_bytes(root, "photos/2020/c.jpg", 400);
    write_bytes(root, "src/main.rs", 40);
    write_bytes(root, "src/lib/x.rs", 60);
    write_bytes(root, "src/lib/deep/y.zip", 1000);
    write_bytes(root, "src/lib/deep/z.mp4", 2000);

    temp
}

const TREE_SIZE: u64 = 12 + 300 + 200 + 400 + 40 + 60 + 1000 + 2000;

fn write_bytes(root: &Path, rel: &str, len: usize) {
    fs::write(root.join(rel), vec![b'x'; len]).unwrap();
}

async fn scan(config: &ScanConfig) -> Result<ScanResult, ScanError> {
    Scanner::new().scan(config, ScanHooks::new()).await
}

fn by_id(result: &ScanResult) -> HashMap<NodeId, &FolderStats> {
    result.folders.iter().map(|f| (f.id, f)).collect()
}

fn recording_hooks() -> (ScanHooks, Arc<Mutex<Vec<ScanProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let hooks = ScanHooks::new().with_progress(move |p| sink.lock().unwrap().push(p.clone()));
    (hooks, seen)
}

#[tokio::test]
async fn test_totals_independent_of_depth_limit() {
    let temp = create_test_tree();

    let mut results = Vec::new();
    for depth in [None, Some(0u32), Some(1), Some(2), Some(3)] {
        let config = ScanConfig::builder()
            .root(temp.path())
            .max_depth(depth)
            .build()
            .unwrap();
        results.push(scan(&config).await.unwrap());
    }

    for result in &results {
        assert_eq!(result.total_size, TREE_SIZE);
        assert_eq!(result.total_file_count, 8);
        assert_eq!(
            result.root().unwrap().type_breakdown,
            results[0].root().unwrap().type_breakdown
        );
    }

    // Unlimited: root, photos, 2020, src, lib, deep.
    assert_eq!(results[0].folder_count(), 6);
    assert_eq!(results[1].folder_count(), 6);
    // Depth 1: root, photos, src.
    assert_eq!(results[2].folder_count(), 3);
    let src = results[2].folders.iter().find(|f| f.name == "src").unwrap();
    assert_eq!(src.direct_size, 40 + 60 + 1000 + 2000);
    assert_eq!(src.direct_file_count, 4);
    assert!(results[2].folders.iter().all(|f| f.depth <= 1));
}

#[tokio::test]
async fn test_aggregation_invariants_hold() {
    let temp = create_test_tree();
    let result = scan(&ScanConfig::new(temp.path())).await.unwrap();
    let index = by_id(&result);

    assert_eq!(index.len(), result.folders.len(), "folder ids are unique");

    let roots: Vec<_> = result.folders.iter().filter(|f| f.is_root()).collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, result.root_id);
    assert_eq!(roots[0].depth, 0);
    assert_eq!(result.total_size, roots[0].total_size);
    assert_eq!(result.total_file_count, roots[0].file_count);

    for folder in &result.folders {
        let children: Vec<_> = folder.children_ids.iter().map(|id| index[id]).collect();
        let child_size: u64 = children.iter().map(|c| c.total_size).sum();
        let child_files: u64 = children.iter().map(|c| c.file_count).sum();

        assert_eq!(folder.total_size, folder.direct_size + child_size);
        assert_eq!(folder.file_count, folder.direct_file_count + child_files);
        assert_eq!(folder.subfolder_count, folder.children_ids.len() as u64);
        assert_eq!(folder.type_breakdown.total_size(), folder.total_size);
        assert_eq!(folder.type_breakdown.total_count(), folder.file_count);
        for child in children {
            assert_eq!(child.parent_id, Some(folder.id));
            assert_eq!(child.depth, folder.depth + 1);
        }
    }

    let totals = result.category_totals();
    assert_eq!(totals.get(TypeCategory::Image).size, 900);
    assert_eq!(totals.get(TypeCategory::Image).count, 3);
    assert_eq!(totals.get(TypeCategory::Code).size, 100);
    assert_eq!(totals.get(TypeCategory::Document).size, 12);
    assert_eq!(totals.get(TypeCategory::Archive).size, 1000);
    assert_eq!(totals.get(TypeCategory::Video).size, 2000);
}

#[tokio::test]
async fn test_hidden_files_respect_policy() {
    let temp = TempDir::new().unwrap();
    write_bytes(temp.path(), "visible", 100);
    write_bytes(temp.path(), ".hidden", 50);

    let result = scan(&ScanConfig::new(temp.path())).await.unwrap();
    assert_eq!(result.total_size, 100);
    assert_eq!(result.total_file_count, 1);

    let config = ScanConfig::builder()
        .root(temp.path())
        .include_hidden(true)
        .build()
        .unwrap();
    let result = scan(&config).await.unwrap();
    assert_eq!(result.total_size, 150);
    assert_eq!(result.total_file_count, 2);
}

#[tokio::test]
async fn test_hidden_directories_are_skipped() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join(".cache")).unwrap();
    write_bytes(temp.path(), ".cache/blob.bin", 500);
    write_bytes(temp.path(), "keep.txt", 5);

    let result = scan(&ScanConfig::new(temp.path())).await.unwrap();
    assert_eq!(result.total_size, 5);
    assert_eq!(result.folder_count(), 1);
}

#[tokio::test]
async fn test_file_leaves_when_requested() {
    let temp = create_test_tree();
    let config = ScanConfig::builder()
        .root(temp.path())
        .include_files(true)
        .build()
        .unwrap();
    let result = scan(&config).await.unwrap();
    let index = by_id(&result);

    let files = result.files.as_ref().unwrap();
    assert_eq!(files.len(), 8);
    assert_eq!(files.iter().map(|f| f.size).sum::<u64>(), TREE_SIZE);
    for file in files {
        let parent = index[&file.parent_id];
        assert_eq!(file.depth, parent.depth + 1);
        assert!(file.path.starts_with(&parent.path));
    }
    let zip = files.iter().find(|f| f.name == "y.zip").unwrap();
    assert_eq!(zip.category, TypeCategory::Archive);
    assert_eq!(zip.depth, 4);
}

#[tokio::test]
async fn test_leaf_cap_exceeded_fails() {
    let temp = TempDir::new().unwrap();
    for i in 0..10_001 {
        write_bytes(temp.path(), &format!("f{i}.dat"), 1);
    }

    let capped = ScanConfig::builder()
        .root(temp.path())
        .include_files(true)
        .file_leaf_cap(10_000usize)
        .build()
        .unwrap();
    let err = scan(&capped).await.unwrap_err();
    assert!(matches!(err, ScanError::LeafCapExceeded { cap: 10_000 }));
    assert!(err.to_string().contains("10000"));

    // Same tree, no per-file records: no cap applies.
    let uncapped = ScanConfig::builder()
        .root(temp.path())
        .file_leaf_cap(10_000usize)
        .build()
        .unwrap();
    let result = scan(&uncapped).await.unwrap();
    assert_eq!(result.total_file_count, 10_001);
}

#[tokio::test]
async fn test_leaf_cap_allows_exact_count() {
    let temp = TempDir::new().unwrap();
    for i in 0..10_000 {
        write_bytes(temp.path(), &format!("f{i}.dat"), 1);
    }

    let config = ScanConfig::builder()
        .root(temp.path())
        .include_files(true)
        .file_leaf_cap(10_000usize)
        .build()
        .unwrap();
    let result = scan(&config).await.unwrap();
    assert_eq!(result.files.unwrap().len(), 10_000);
}

#[tokio::test]
async fn test_repeated_scans_are_identical() {
    let temp = create_test_tree();
    let config = ScanConfig::new(temp.path());

    let first = scan(&config).await.unwrap();
    let second = scan(&config).await.unwrap();

    assert_eq!(first.root_id, second.root_id);
    let a = by_id(&first);
    let b = by_id(&second);
    assert_eq!(a.len(), b.len());
    for (id, folder) in a {
        let other = b[&id];
        assert_eq!(folder.total_size, other.total_size);
        assert_eq!(folder.file_count, other.file_count);
        assert_eq!(folder.children_ids, other.children_ids);
        assert_eq!(folder.type_breakdown, other.type_breakdown);
    }
}

#[tokio::test]
async fn test_concurrency_does_not_change_result() {
    let temp = create_test_tree();
    let serial = ScanConfig::builder()
        .root(temp.path())
        .concurrency(1usize)
        .build()
        .unwrap();

    let one = scan(&serial).await.unwrap();
    let many = scan(&ScanConfig::new(temp.path())).await.unwrap();

    assert_eq!(one.total_size, many.total_size);
    assert_eq!(one.folder_count(), many.folder_count());
}

#[tokio::test]
async fn test_missing_root_is_invalid() {
    let temp = TempDir::new().unwrap();
    let (hooks, seen) = recording_hooks();

    let err = Scanner::new()
        .scan(&ScanConfig::new(temp.path().join("nope")), hooks)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound { .. }));
    assert!(err.is_invalid_root());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].phase, ScanPhase::Done);
}

#[tokio::test]
async fn test_unbuilt_config_is_validated() {
    let temp = TempDir::new().unwrap();
    write_bytes(temp.path(), "one.txt", 1);

    let mut config = ScanConfig::new(temp.path());
    config.include_files = true;
    config.file_leaf_cap = 0;
    let (hooks, seen) = recording_hooks();

    let err = Scanner::new().scan(&config, hooks).await.unwrap_err();

    assert!(matches!(err, ScanError::InvalidConfig { .. }));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].phase, ScanPhase::Done);
}

#[tokio::test]
async fn test_progress_ends_with_single_done() {
    let temp = create_test_tree();
    let (hooks, seen) = recording_hooks();

    Scanner::new()
        .scan(&ScanConfig::new(temp.path()), hooks)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let terminal: Vec<_> = seen.iter().filter(|p| p.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(seen.last().unwrap().phase, ScanPhase::Done);
    assert_eq!(seen.last().unwrap().files_scanned, 8);

    let summing = seen.iter().position(|p| p.phase == ScanPhase::Summing).unwrap();
    assert_eq!(summing, seen.len() - 2);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let temp = create_test_tree();
    let (hooks, seen) = recording_hooks();

    let err = Scanner::new()
        .scan(&ScanConfig::new(temp.path()), hooks.with_cancel(|| true))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.last().unwrap().phase, ScanPhase::Cancelled);
    assert!(seen.iter().all(|p| p.phase != ScanPhase::Done));
}

#[tokio::test]
async fn test_cancel_mid_scan_stops_progress() {
    let temp = TempDir::new().unwrap();
    for d in 0..40 {
        let dir = temp.path().join(format!("d{d}"));
        fs::create_dir(&dir).unwrap();
        for f in 0..20 {
            write_bytes(&dir, &format!("f{f}.txt"), 10);
        }
    }

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let (hooks, seen) = recording_hooks();
    let hooks = hooks.with_cancel(move || counter.fetch_add(1, Ordering::SeqCst) >= 30);

    let err = Scanner::new()
        .scan(&ScanConfig::new(temp.path()), hooks)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Cancelled));

    let count_at_return = seen.lock().unwrap().len();
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), count_at_return);
    assert_eq!(seen.last().unwrap().phase, ScanPhase::Cancelled);
    assert_eq!(seen.iter().filter(|p| p.is_terminal()).count(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_cycle_terminates() {
    use std::os::unix::fs::symlink;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("a")).unwrap();
    write_bytes(root, "a/f.txt", 10);
    symlink(root, root.join("a/loop")).unwrap();

    // Not following: links are ignored.
    let result = scan(&ScanConfig::new(root)).await.unwrap();
    assert_eq!(result.total_size, 10);
    assert_eq!(result.folder_count(), 2);

    let follow = ScanConfig::builder()
        .root(root)
        .follow_symlinks(true)
        .build()
        .unwrap();
    let result = scan(&follow).await.unwrap();
    assert_eq!(result.total_size, 10);
    assert_eq!(result.total_file_count, 1);
    assert_eq!(result.folder_count(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cycle_below_depth_limit_terminates() {
    use std::os::unix::fs::symlink;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("a/b/c")).unwrap();
    write_bytes(root, "a/f.txt", 10);
    symlink(root.join("a"), root.join("a/b/c/up")).unwrap();

    let config = ScanConfig::builder()
        .root(root)
        .max_depth(1u32)
        .follow_symlinks(true)
        .build()
        .unwrap();
    let result = scan(&config).await.unwrap();

    assert_eq!(result.total_size, 10);
    assert_eq!(result.total_file_count, 1);
    assert_eq!(result.folder_count(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_hard_links_count_in_every_folder() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for dir in ["a", "b"] {
        fs::create_dir(root.join(dir)).unwrap();
        for i in 0..30 {
            write_bytes(root, &format!("{dir}/pad{i}.dat"), 1);
        }
    }
    write_bytes(root, "a/big.bin", 5000);
    fs::hard_link(root.join("a/big.bin"), root.join("b/big.bin")).unwrap();

    let config = ScanConfig::new(root);
    for _ in 0..20 {
        let result = scan(&config).await.unwrap();
        for name in ["a", "b"] {
            let folder = result.folders.iter().find(|f| f.name == name).unwrap();
            assert_eq!(folder.total_size, 5030, "folder {name}");
            assert_eq!(folder.file_count, 31);
        }
        assert_eq!(result.total_size, 2 * 5030);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_broken_symlink_warns_when_followed() {
    use canopy_scan::WarningKind;
    use std::os::unix::fs::symlink;

    let temp = TempDir::new().unwrap();
    symlink(temp.path().join("gone"), temp.path().join("dangling")).unwrap();
    write_bytes(temp.path(), "ok.txt", 3);

    let config = ScanConfig::builder()
        .root(temp.path())
        .follow_symlinks(true)
        .build()
        .unwrap();
    let result = scan(&config).await.unwrap();

    assert_eq!(result.total_size, 3);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::BrokenSymlink);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_directory_is_empty() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let locked = temp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_bytes(&locked, "secret.txt", 99);
    write_bytes(temp.path(), "open.txt", 1);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through the mode bits.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = scan(&ScanConfig::new(temp.path())).await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let result = result.unwrap();

    assert_eq!(result.total_size, 1);
    assert_eq!(result.folder_count(), 2);
    let locked_stats = result.folders.iter().find(|f| f.name == "locked").unwrap();
    assert_eq!(locked_stats.total_size, 0);
    assert!(result.has_warnings());
}
