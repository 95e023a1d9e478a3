//! OS-reserved directory exclusion.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Directories under a drive root that hold OS or installer state.
const WINDOWS_RESERVED: &[&str] = &[
    "windows",
    "windows.old",
    "program files",
    "program files (x86)",
    "programdata",
    "$recycle.bin",
    "system volume information",
    "recovery",
    "perflogs",
    "$winreagent",
];

/// Path conventions the exclusion policy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// Drive-letter paths, case-insensitive, with a known reserved layout.
    Windows,
    /// Anything without a reserved-path convention.
    Other,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Decides which directories are skipped entirely during a scan.
///
/// Paths are compared as strings, after normalizing separators to `\` and
/// lowercasing, so the policy never touches the filesystem.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    /// Normalized drive anchor (e.g. `c:`); `None` when the policy is inactive.
    anchor: Option<String>,
    reserved: Vec<String>,
}

impl ExclusionPolicy {
    /// Build the policy for a scan rooted at `root`.
    pub fn new(root: &Path, include_system: bool, platform: Platform) -> Self {
        if include_system || platform != Platform::Windows {
            return Self::disabled();
        }

        let root = normalize(&root.to_string_lossy());
        let anchor = drive_anchor(&root).to_string();
        let reserved = WINDOWS_RESERVED
            .iter()
            .map(|dir| format!("{anchor}\\{dir}"))
            .collect();

        Self {
            anchor: Some(anchor),
            reserved,
        }
    }

    /// A policy that never excludes anything.
    pub fn disabled() -> Self {
        Self {
            anchor: None,
            reserved: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Whether `path` must be skipped (not descended into, not counted).
    pub fn is_excluded(&self, path: &Path) -> bool {
        let Some(anchor) = &self.anchor else {
            return false;
        };

        let candidate = normalize(&path.to_string_lossy());
        if self
            .reserved
            .iter()
            .any(|reserved| is_same_or_below(&candidate, reserved))
        {
            return true;
        }

        is_user_app_data(&candidate, anchor)
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

fn normalize(path: &str) -> String {
    let mut normalized = path.replace('/', "\\").to_lowercase();
    // Verbatim prefix as produced by canonicalize on Windows.
    if let Some(rest) = normalized.strip_prefix("\\\\?\\") {
        normalized = rest.to_string();
    }
    while normalized.len() > 1 && normalized.ends_with('\\') {
        normalized.pop();
    }
    normalized
}

/// The `x:` prefix of a normalized path, or empty for rootless paths.
fn drive_anchor(path: &str) -> &str {
    match path.find(':') {
        Some(idx) if idx > 0 && !path[..idx].contains('\\') => &path[..=idx],
        _ => "",
    }
}

fn is_same_or_below(candidate: &str, base: &str) -> bool {
    candidate == base
        || candidate
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('\\'))
}

/// `<anchor>\users\<anyone>\appdata` and everything below it.
fn is_user_app_data(candidate: &str, anchor: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(anchor) else {
        return false;
    };
    let mut parts = rest.split('\\').filter(|p| !p.is_empty());
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some("users"), Some(_), Some("appdata"))
    )
}
