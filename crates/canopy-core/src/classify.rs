//! File type classification and per-category tallies.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Semantic category of a file, derived from its extension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TypeCategory {
    Video,
    Image,
    Audio,
    Document,
    Code,
    Archive,
    Other,
}

impl TypeCategory {
    fn index(self) -> usize {
        self as usize
    }
}

/// Classify a file by the lowercased extension of its name.
///
/// Names without an extension, and extensions not in the table, are `Other`.
pub fn classify(name: &str) -> TypeCategory {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return TypeCategory::Other;
    };
    // ".bashrc" has no extension, just a leading dot
    if stem.is_empty() {
        return TypeCategory::Other;
    }

    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "mkv" | "mov" | "avi" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg"
        | "3gp" | "vob" => TypeCategory::Video,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "heic" | "heif"
        | "tif" | "tiff" | "raw" | "cr2" | "nef" | "dng" | "psd" | "avif" => TypeCategory::Image,
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "wma" | "opus" | "aiff" | "mid"
        | "midi" => TypeCategory::Audio,
        "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "ods" | "odp"
        | "rtf" | "txt" | "md" | "csv" | "epub" | "pages" | "numbers" | "key" => {
            TypeCategory::Document
        }
        "rs" | "js" | "jsx" | "ts" | "tsx" | "mjs" | "py" | "java" | "c" | "h" | "cpp" | "hpp"
        | "cc" | "cs" | "go" | "rb" | "php" | "swift" | "kt" | "scala" | "sh" | "ps1" | "html"
        | "css" | "scss" | "json" | "toml" | "yaml" | "yml" | "xml" | "sql" | "lua" => {
            TypeCategory::Code
        }
        "zip" | "tar" | "gz" | "tgz" | "bz2" | "xz" | "7z" | "rar" | "zst" | "iso" | "dmg"
        | "cab" => TypeCategory::Archive,
        _ => TypeCategory::Other,
    }
}

/// Well-known noise files, compared case-insensitively.
const NOISE_FILES: &[&str] = &[
    "thumbs.db",
    "ehthumbs.db",
    "ehthumbs_vista.db",
    "desktop.ini",
    "$recycle.bin",
    "recycler",
    ".ds_store",
    "icon\r",
];

/// Whether a name is hidden: dot-prefixed or a well-known noise file.
pub fn is_hidden_name(name: &str) -> bool {
    if name.starts_with('.') {
        return true;
    }
    let lower = name.to_lowercase();
    NOISE_FILES.contains(&lower.as_str())
}

/// Size and count for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTally {
    /// Bytes.
    pub size: u64,
    /// Number of files.
    pub count: u64,
}

impl TypeTally {
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.size == 0
    }
}

impl Add for TypeTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            size: self.size + rhs.size,
            count: self.count + rhs.count,
        }
    }
}

impl AddAssign for TypeTally {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Per-category tallies, one slot per [`TypeCategory`].
///
/// Serialized as a map holding only non-empty categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<TypeCategory, TypeTally>",
    into = "BTreeMap<TypeCategory, TypeTally>"
)]
pub struct TypeBreakdown([TypeTally; TypeCategory::COUNT]);

impl TypeBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one file of `size` bytes.
    pub fn record(&mut self, category: TypeCategory, size: u64) {
        self.0[category.index()] += TypeTally { size, count: 1 };
    }

    /// Add every slot of `other` into this breakdown.
    pub fn merge(&mut self, other: &TypeBreakdown) {
        for (slot, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *slot += *theirs;
        }
    }

    pub fn get(&self, category: TypeCategory) -> TypeTally {
        self.0[category.index()]
    }

    /// Non-empty categories, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeCategory, TypeTally)> + '_ {
        TypeCategory::iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, t)| !t.is_empty())
    }

    pub fn total_size(&self) -> u64 {
        self.0.iter().map(|t| t.size).sum()
    }

    pub fn total_count(&self) -> u64 {
        self.0.iter().map(|t| t.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(TypeTally::is_empty)
    }
}

impl From<BTreeMap<TypeCategory, TypeTally>> for TypeBreakdown {
    fn from(map: BTreeMap<TypeCategory, TypeTally>) -> Self {
        let mut breakdown = Self::new();
        for (category, tally) in map {
            breakdown.0[category.index()] += tally;
        }
        breakdown
    }
}

impl From<TypeBreakdown> for BTreeMap<TypeCategory, TypeTally> {
    fn from(breakdown: TypeBreakdown) -> Self {
        breakdown.iter().collect()
    }
}
