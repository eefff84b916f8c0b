//! Fingerprint cache: persisted embeddings keyed by content hash
//!
//! One namespace per indexed root directory, one JSON file per indexed file:
//!
//! ```text
//! index/<namespace>/manifest.json        root, model, dimension, format version
//! index/<namespace>/entries/<key>.json   one FileRecord
//! ```
//!
//! Entries are replaced with write-to-temp-then-rename, so a reader sees
//! either the old record or the new one, never a mix.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::chunk::ChunkKind;
use crate::extract::UnembeddableReason;
use crate::{CACHE_FORMAT_VERSION, Result, SeeklyError, discover};

const MANIFEST_FILE: &str = "manifest.json";
const ENTRIES_DIR: &str = "entries";

/// Blake3 hex digest of some content.
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn short_hash(s: &str, len: usize) -> String {
    let mut hex = fingerprint(s.as_bytes());
    hex.truncate(len);
    hex
}

/// An embedded piece of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub kind: ChunkKind,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    /// Blake3 of `text`
    pub fingerprint: String,
    pub embedding: Vec<f32>,
}

/// Whether a file made it into the embedding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordStatus {
    Embedded,
    Unembeddable { reason: UnembeddableReason },
}

/// Everything we know about one indexed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path
    pub path: PathBuf,
    pub size: u64,
    /// Last modification time (unix timestamp)
    pub mtime: u64,
    /// Blake3 of the file bytes
    pub fingerprint: String,
    pub status: RecordStatus,
    /// Whole-file chunk first, then function or window chunks
    pub chunks: Vec<ChunkRecord>,
}

impl FileRecord {
    /// The file-level embedding, if the file was embedded.
    pub fn embedding(&self) -> Option<&[f32]> {
        self.chunks
            .iter()
            .find(|c| c.kind == ChunkKind::File)
            .map(|c| c.embedding.as_slice())
    }

    /// Whether this record can take part in ranking.
    pub fn is_rankable(&self) -> bool {
        self.status == RecordStatus::Embedded && !self.chunks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    root: PathBuf,
    model: String,
    dimension: usize,
}

/// Which part of the fingerprint cache to clear.
#[derive(Debug, Clone, Copy)]
pub enum ClearScope<'a> {
    /// The namespace of one root directory
    Namespace(&'a Path),
    /// Every namespace
    All,
}

/// Summary of one namespace for reporting.
#[derive(Debug, Clone)]
pub struct NamespaceInfo {
    pub id: String,
    /// `None` when the manifest is missing or unreadable
    pub root: Option<PathBuf>,
    pub model: Option<String>,
    pub dimension: Option<usize>,
    pub entries: usize,
    pub size_bytes: u64,
}

/// The fingerprint cache directory holding all namespaces.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Address a cache directory. Nothing is created until a namespace is opened.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stable namespace identifier for a root directory.
    pub fn namespace_id(root: &Path) -> String {
        short_hash(&root.to_string_lossy(), 16)
    }

    /// Open (creating or rebuilding as needed) the namespace for `root`.
    ///
    /// A namespace written by another model, with another dimension, or with
    /// an unreadable manifest is wiped so vectors never mix.
    pub fn open_namespace(&self, root: &Path, model: &str, dimension: usize) -> Result<Namespace> {
        let id = Self::namespace_id(root);
        let dir = self.dir.join(&id);
        let namespace = Namespace {
            id: id.clone(),
            root: root.to_path_buf(),
            dir,
            model: model.to_string(),
            dimension,
        };
        let expected = Manifest {
            version: CACHE_FORMAT_VERSION,
            root: root.to_path_buf(),
            model: model.to_string(),
            dimension,
        };

        std::fs::create_dir_all(namespace.entries_dir())?;
        let manifest_path = namespace.dir.join(MANIFEST_FILE);

        let needs_manifest = match read_manifest(&manifest_path) {
            Ok(Some(found)) if found == expected => false,
            Ok(Some(found)) => {
                tracing::info!(
                    "Rebuilding cache namespace {} ({} {}d v{} -> {} {}d v{})",
                    id,
                    found.model,
                    found.dimension,
                    found.version,
                    expected.model,
                    expected.dimension,
                    expected.version
                );
                namespace.clear()?;
                true
            }
            Ok(None) => {
                if !namespace.is_empty() {
                    tracing::warn!("Cache namespace {} has no manifest, rebuilding", id);
                    namespace.clear()?;
                }
                true
            }
            Err(e) => {
                tracing::warn!("Cache namespace {} is corrupted ({}), rebuilding", id, e);
                namespace.clear()?;
                true
            }
        };

        if needs_manifest {
            write_atomic(
                &namespace.dir,
                &manifest_path,
                &serde_json::to_vec_pretty(&expected)?,
            )
            .map_err(|e| SeeklyError::Cache {
                namespace: id,
                message: format!("cannot write manifest: {e}"),
            })?;
        }

        Ok(namespace)
    }

    /// Remove cached data. Returns the number of namespaces removed.
    pub fn clear(&self, scope: ClearScope<'_>) -> Result<usize> {
        match scope {
            ClearScope::Namespace(root) => {
                let removed =
                    discover::remove_dir_if_exists(&self.dir.join(Self::namespace_id(root)))?;
                Ok(usize::from(removed))
            }
            ClearScope::All => {
                let count = self.namespace_dirs()?.len();
                discover::remove_dir_if_exists(&self.dir)?;
                Ok(count)
            }
        }
    }

    /// Describe every namespace on disk.
    pub fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let mut infos: Vec<NamespaceInfo> = self
            .namespace_dirs()?
            .into_iter()
            .map(|dir| {
                let manifest = read_manifest(&dir.join(MANIFEST_FILE)).ok().flatten();
                NamespaceInfo {
                    id: dir
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    root: manifest.as_ref().map(|m| m.root.clone()),
                    model: manifest.as_ref().map(|m| m.model.clone()),
                    dimension: manifest.as_ref().map(|m| m.dimension),
                    entries: entry_files(&dir.join(ENTRIES_DIR)).len(),
                    size_bytes: discover::dir_size(&dir),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.root.cmp(&b.root).then(a.id.cmp(&b.id)));
        Ok(infos)
    }

    fn namespace_dirs(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect())
    }
}

/// Handle on one namespace of the cache.
#[derive(Debug, Clone)]
pub struct Namespace {
    id: String,
    root: PathBuf,
    dir: PathBuf,
    model: String,
    dimension: usize,
}

impl Namespace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding this namespace's manifest and entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn entries_dir(&self) -> PathBuf {
        self.dir.join(ENTRIES_DIR)
    }

    fn entry_path(&self, path: &Path) -> PathBuf {
        self.entries_dir()
            .join(format!("{}.json", short_hash(&path.to_string_lossy(), 32)))
    }

    /// The stored record for `path`, only if it matches the live fingerprint.
    pub fn lookup(&self, path: &Path, fingerprint: &str) -> Option<FileRecord> {
        self.get(path).filter(|r| r.fingerprint == fingerprint)
    }

    /// The stored record for `path` regardless of freshness.
    ///
    /// Unreadable or malformed entries are deleted and reported as absent.
    pub fn get(&self, path: &Path) -> Option<FileRecord> {
        let file = self.entry_path(path);
        let content = match std::fs::read(&file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(
                    "Cannot read cache entry for {} in namespace {}: {}",
                    path.display(),
                    self.id,
                    e
                );
                return None;
            }
        };

        let problem = match serde_json::from_slice::<FileRecord>(&content) {
            Ok(record) if record.path != path => "belongs to another path".to_string(),
            Ok(record) => match record
                .chunks
                .iter()
                .find(|c| c.embedding.len() != self.dimension)
            {
                None => return Some(record),
                Some(c) => format!("has a {}d vector", c.embedding.len()),
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(
            "Discarding cache entry for {} in namespace {}: {}",
            path.display(),
            self.id,
            problem
        );
        let _ = std::fs::remove_file(&file);
        None
    }

    /// Atomically replace the record for `record.path`.
    pub fn store(&self, record: &FileRecord) -> Result<()> {
        if let Some(chunk) = record
            .chunks
            .iter()
            .find(|c| c.embedding.len() != self.dimension)
        {
            return Err(SeeklyError::DimensionMismatch {
                expected: self.dimension,
                actual: chunk.embedding.len(),
            });
        }

        let entries = self.entries_dir();
        std::fs::create_dir_all(&entries)?;
        let bytes = serde_json::to_vec(record)?;
        write_atomic(&entries, &self.entry_path(&record.path), &bytes).map_err(|e| {
            SeeklyError::Cache {
                namespace: self.id.clone(),
                message: format!("cannot store {}: {e}", record.path.display()),
            }
        })
    }

    /// Drop the record for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> Result<bool> {
        match std::fs::remove_file(self.entry_path(path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop every record whose path is not in `live`. Returns how many went.
    ///
    /// Temporary files left by an interrupted store are swept as well and
    /// are not counted.
    pub fn retain(&self, live: &HashSet<PathBuf>) -> Result<usize> {
        let keep: HashSet<PathBuf> = live.iter().map(|p| self.entry_path(p)).collect();
        let mut removed = 0;
        for file in entry_files(&self.entries_dir()) {
            if !keep.contains(&file) {
                match std::fs::remove_file(&file) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        for file in stray_files(&self.entries_dir()) {
            tracing::debug!("Removing leftover {} in namespace {}", file.display(), self.id);
            if let Err(e) = std::fs::remove_file(&file) {
                tracing::warn!("Cannot remove {}: {}", file.display(), e);
            }
        }
        Ok(removed)
    }

    /// Remove every record in this namespace.
    pub fn clear(&self) -> Result<()> {
        discover::remove_dir_if_exists(&self.entries_dir())?;
        std::fs::create_dir_all(self.entries_dir())?;
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        entry_files(&self.entries_dir()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default()
}

/// Regular files in `dir` that are not entries.
fn stray_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
                .map(|e| e.path())
                .filter(|p| !p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default()
}

fn read_manifest(path: &Path) -> Result<Option<Manifest>> {
    match std::fs::read(path) {
        Ok(content) => Ok(Some(serde_json::from_slice(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to `target` through a temporary file in `dir` and a rename.
fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &Path, content: &str, dim: usize) -> FileRecord {
        FileRecord {
            path: path.to_path_buf(),
            size: content.len() as u64,
            mtime: 0,
            fingerprint: fingerprint(content.as_bytes()),
            status: RecordStatus::Embedded,
            chunks: vec![ChunkRecord {
                kind: ChunkKind::File,
                start_line: 1,
                end_line: 1,
                text: content.to_string(),
                fingerprint: fingerprint(content.as_bytes()),
                embedding: vec![0.5; dim],
            }],
        }
    }

    #[test]
    fn test_fingerprint_is_pure() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
        assert_eq!(fingerprint(b"abc").len(), 64);
    }

    #[test]
    fn test_store_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let ns = store.open_namespace(Path::new("/repo"), "m", 3).unwrap();

        let path = Path::new("/repo/a.py");
        let rec = record(path, "print(1)", 3);
        ns.store(&rec).unwrap();

        assert_eq!(ns.lookup(path, &rec.fingerprint), Some(rec.clone()));
        assert_eq!(ns.lookup(path, "stale"), None);
        assert_eq!(ns.get(path), Some(rec.clone()));
        assert_eq!(ns.lookup(Path::new("/repo/b.py"), &rec.fingerprint), None);
        assert_eq!(rec.embedding(), Some(&[0.5f32, 0.5, 0.5][..]));

        // Only the entry itself remains, no temporaries
        let names: Vec<_> = std::fs::read_dir(ns.entries_dir()).unwrap().flatten().collect();
        assert_eq!(names.len(), 1);
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_store_replaces_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let ns = CacheStore::new(dir.path())
            .open_namespace(Path::new("/repo"), "m", 2)
            .unwrap();
        let path = Path::new("/repo/a.rs");

        ns.store(&record(path, "fn a() {}", 2)).unwrap();
        let newer = record(path, "fn b() {}", 2);
        ns.store(&newer).unwrap();

        assert_eq!(ns.get(path), Some(newer));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_store_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let ns = CacheStore::new(dir.path())
            .open_namespace(Path::new("/repo"), "m", 4)
            .unwrap();
        let err = ns.store(&record(Path::new("/repo/a.py"), "x", 3)).unwrap_err();
        assert!(matches!(
            err,
            SeeklyError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
        assert!(ns.is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let ns = CacheStore::new(dir.path())
            .open_namespace(Path::new("/repo"), "m", 2)
            .unwrap();
        let path = Path::new("/repo/a.py");
        let rec = record(path, "x = 1", 2);
        ns.store(&rec).unwrap();

        std::fs::write(ns.entry_path(path), b"{ not json").unwrap();
        assert_eq!(ns.lookup(path, &rec.fingerprint), None);
        assert!(!ns.entry_path(path).exists());
    }

    #[test]
    fn test_model_change_rebuilds_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let root = Path::new("/repo");
        let ns = store.open_namespace(root, "small", 2).unwrap();
        ns.store(&record(Path::new("/repo/a.py"), "x", 2)).unwrap();

        let same = store.open_namespace(root, "small", 2).unwrap();
        assert_eq!(same.len(), 1);

        let bigger = store.open_namespace(root, "large", 4).unwrap();
        assert!(bigger.is_empty());
    }

    #[test]
    fn test_corrupt_manifest_rebuilds_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let root = Path::new("/repo");
        let ns = store.open_namespace(root, "m", 2).unwrap();
        ns.store(&record(Path::new("/repo/a.py"), "x", 2)).unwrap();

        std::fs::write(ns.dir.join(MANIFEST_FILE), b"\x00\x01garbage").unwrap();
        let reopened = store.open_namespace(root, "m", 2).unwrap();
        assert!(reopened.is_empty());

        // And the manifest is healthy again
        let again = store.open_namespace(root, "m", 2).unwrap();
        reopened.store(&record(Path::new("/repo/a.py"), "x", 2)).unwrap();
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn test_invalidate_and_retain() {
        let dir = tempfile::tempdir().unwrap();
        let ns = CacheStore::new(dir.path())
            .open_namespace(Path::new("/repo"), "m", 2)
            .unwrap();
        let a = PathBuf::from("/repo/a.py");
        let b = PathBuf::from("/repo/b.py");
        let c = PathBuf::from("/repo/c.py");
        for p in [&a, &b, &c] {
            ns.store(&record(p, "x", 2)).unwrap();
        }

        assert!(ns.invalidate(&c).unwrap());
        assert!(!ns.invalidate(&c).unwrap());

        let live: HashSet<PathBuf> = [a.clone()].into_iter().collect();
        assert_eq!(ns.retain(&live).unwrap(), 1);
        assert!(ns.get(&a).is_some());
        assert!(ns.get(&b).is_none());
    }

    #[test]
    fn test_retain_sweeps_interrupted_writes() {
        let dir = tempfile::tempdir().unwrap();
        let ns = CacheStore::new(dir.path())
            .open_namespace(Path::new("/repo"), "m", 2)
            .unwrap();
        let a = PathBuf::from("/repo/a.py");
        ns.store(&record(&a, "x", 2)).unwrap();

        let leftover = ns.entries_dir().join(".tmpA1b2C3");
        std::fs::write(&leftover, b"{\"path\":").unwrap();

        let live: HashSet<PathBuf> = [a.clone()].into_iter().collect();
        assert_eq!(ns.retain(&live).unwrap(), 0);
        assert!(!leftover.exists());
        assert!(ns.get(&a).is_some());
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_namespaces_are_isolated_and_clearable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let one = store.open_namespace(Path::new("/one"), "m", 2).unwrap();
        let two = store.open_namespace(Path::new("/two"), "m", 2).unwrap();
        one.store(&record(Path::new("/one/a.py"), "x", 2)).unwrap();

        assert!(two.get(Path::new("/one/a.py")).is_none());

        let infos = store.list_namespaces().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].root.as_deref(), Some(Path::new("/one")));
        assert_eq!(infos[0].entries, 1);
        assert_eq!(infos[1].entries, 0);
        assert_eq!(infos[0].dimension, Some(2));

        assert_eq!(store.clear(ClearScope::Namespace(Path::new("/one"))).unwrap(), 1);
        assert_eq!(store.list_namespaces().unwrap().len(), 1);

        assert_eq!(store.clear(ClearScope::All).unwrap(), 1);
        assert!(store.list_namespaces().unwrap().is_empty());
    }

    #[test]
    fn test_list_without_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("never-created"));
        assert!(store.list_namespaces().unwrap().is_empty());
        assert_eq!(store.clear(ClearScope::All).unwrap(), 0);
    }
}
