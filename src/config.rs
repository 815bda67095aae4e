//! Configuration for extraction and indexing.

use std::path::{Path, PathBuf};

/// Configuration passed to the engine at construction.
///
/// Both paths are explicit: nothing is read from the environment at
/// import time. `content_root` is the directory tree the extractor walks
/// and the base that `relative_path` values are resolved against;
/// `index_dir` is the directory the index store exclusively owns.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory containing the spreadsheet tree.
    pub content_root: PathBuf,
    /// Directory holding the on-disk index.
    pub index_dir: PathBuf,
}

impl Config {
    /// Create a configuration from the two directories.
    pub fn new(content_root: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Config {
            content_root: content_root.into(),
            index_dir: index_dir.into(),
        }
    }

    /// The content root.
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// The index directory.
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }
}
