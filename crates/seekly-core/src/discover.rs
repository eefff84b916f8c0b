//! Discovery module: locate the user-level cache root and its areas

use std::path::{Path, PathBuf};

use crate::{APP_DIR, CACHE_DIR_ENV, Result, SeeklyError};

/// Paths of everything seekly persists.
///
/// ```text
/// <root>/
///   config.json      optional user configuration
///   models/          embedding model weights (owned by fastembed)
///   index/<ns>/      fingerprint cache, one namespace per indexed directory
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Use an explicit cache root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the cache root from `$SEEKLY_CACHE_DIR` or the platform cache dir.
    pub fn discover() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }

        dirs::cache_dir()
            .map(|dir| Self::new(dir.join(APP_DIR)))
            .ok_or_else(|| {
                SeeklyError::Config(format!(
                    "no cache directory for this platform; set {CACHE_DIR_ENV}"
                ))
            })
    }

    /// The cache root itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the config file path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Get the model cache directory.
    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Get the fingerprint cache directory.
    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }
}

/// Total size in bytes of all regular files under `path`, 0 if it is missing.
pub fn dir_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    ignore::WalkBuilder::new(path)
        .standard_filters(false)
        .build()
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
