//! Directory walking: enumerate candidate files under a root

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ignore::WalkBuilder;

use crate::{Config, extract};

/// Directory names never descended into (hidden directories are skipped too).
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "__pycache__",
    "venv",
    "env",
    "dist",
    "build",
    "vendor",
    "bower_components",
];

#[cfg(unix)]
type DirId = (u64, u64);
#[cfg(not(unix))]
type DirId = PathBuf;

/// Identity of a directory: (device, inode) where available.
#[cfg(unix)]
fn dir_id(path: &Path) -> Option<DirId> {
    use std::os::unix::fs::MetadataExt;
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn dir_id(path: &Path) -> Option<DirId> {
    path.canonicalize().ok()
}

/// Enumerates indexable files under a root.
///
/// Each call to [`Walker::walk`] starts a fresh, lazy traversal.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    config: Arc<Config>,
}

impl Walker {
    pub fn new(root: &Path, config: &Config) -> Self {
        Self {
            root: root.to_path_buf(),
            config: Arc::new(config.clone()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new traversal.
    pub fn walk(&self) -> Walk {
        let visited: Arc<Mutex<HashSet<DirId>>> = Arc::new(Mutex::new(HashSet::new()));
        if let Some(id) = dir_id(&self.root) {
            if let Ok(mut set) = visited.lock() {
                set.insert(id);
            }
        }

        let excluded: Vec<String> = DEFAULT_EXCLUDED_DIRS
            .iter()
            .map(|s| s.to_string())
            .chain(self.config.exclude_dirs.iter().cloned())
            .collect();

        let inner = WalkBuilder::new(&self.root)
            .hidden(true) // Skip hidden files and directories (.git, .venv, ...)
            .git_ignore(true) // Respect .gitignore
            .git_global(true)
            .git_exclude(true)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if excluded.iter().any(|e| *e == name) {
                    return false;
                }
                // Already seen through another path: a symlink cycle or alias
                match (dir_id(entry.path()), visited.lock()) {
                    (Some(id), Ok(mut set)) => {
                        let fresh = set.insert(id);
                        if !fresh {
                            tracing::debug!("Skipping already visited {}", entry.path().display());
                        }
                        fresh
                    }
                    _ => true,
                }
            })
            .build();

        Walk {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// A lazy traversal yielding candidate file paths.
pub struct Walk {
    inner: ignore::Walk,
    config: Arc<Config>,
}

impl Iterator for Walk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if !extract::should_index(path, &self.config) {
                continue;
            }

            match std::fs::metadata(path) {
                Ok(meta) if meta.len() > self.config.max_file_size => {
                    tracing::debug!(
                        "Skipping {} ({} bytes exceeds limit)",
                        path.display(),
                        meta.len()
                    );
                    continue;
                }
                Ok(_) => return Some(entry.into_path()),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            }
        }
    }
}
