//! Core types and policies for canopy.
//!
//! This crate holds the data contracts shared between the scanning engine and
//! its consumers (configuration, results, errors) together with the pure
//! policies the walker consults: file type classification and OS-reserved
//! directory exclusion.

mod classify;
mod config;
mod error;
mod exclude;
mod node;
mod result;

pub use classify::{TypeBreakdown, TypeCategory, TypeTally, classify, is_hidden_name};
pub use config::{
    DEFAULT_CONCURRENCY, DEFAULT_FILE_LEAF_CAP, DEFAULT_SOFT_FILE_LIMIT, MAX_CONCURRENCY,
    ScanConfig, ScanConfigBuilder, ScanId,
};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use exclude::{ExclusionPolicy, Platform};
pub use node::{FileStats, FolderStats, NodeId};
pub use result::ScanResult;
