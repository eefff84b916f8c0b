//! Indexing logic: walk files, fingerprint, chunk, embed misses, store

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::cache::{ChunkRecord, FileRecord, Namespace, RecordStatus, fingerprint};
use crate::chunk::{Chunk, Chunker};
use crate::embed::EmbeddingProvider;
use crate::extract::{self, Decoded, UnembeddableReason};
use crate::walk::Walker;
use crate::{Config, MAX_EMBED_CHARS, Result, SeeklyError};

/// Progress events emitted during indexing.
#[derive(Debug, Clone)]
pub enum ProgressEvent<'a> {
    /// Scanning for files to index.
    Scanning { count: usize },
    /// Indexing a specific file.
    Indexing {
        current: usize,
        total: usize,
        path: &'a Path,
    },
    /// Generating embeddings for a file's chunks.
    Embedding { path: &'a Path, chunks: usize },
}

/// Type alias for progress callback.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send>;

/// Stats from an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Candidate files produced by the walk
    pub files_scanned: usize,
    /// Files whose fingerprint matched the cache
    pub files_cached: usize,
    /// Files (re)embedded in this pass
    pub files_embedded: usize,
    /// Binary or empty files
    pub files_unembeddable: usize,
    /// Files that could not be read
    pub files_skipped: usize,
    /// Cache entries dropped because their file is gone
    pub files_removed: usize,
    /// Chunks sent to the provider
    pub chunks_embedded: usize,
    /// Chunks whose vector was carried over from the previous record
    pub chunks_reused: usize,
    /// Provider invocations
    pub provider_calls: usize,
}

/// Result of one indexing pass.
#[derive(Debug)]
pub struct IndexOutcome {
    /// Rankable records, in walk order
    pub corpus: Vec<FileRecord>,
    pub stats: IndexStats,
}

/// What the parallel stage learned about one file.
enum Prepared {
    Cached(FileRecord),
    Fresh {
        size: u64,
        mtime: u64,
        fingerprint: String,
        previous: Option<FileRecord>,
        content: FreshContent,
    },
    Failed,
}

enum FreshContent {
    Chunks(Vec<Chunk>),
    Unembeddable(UnembeddableReason),
}

/// The read-only pieces the worker threads need.
struct Preparer<'a> {
    namespace: &'a Namespace,
    chunker: Chunker,
    binary_threshold: f32,
}

impl Preparer<'_> {
    /// Read, fingerprint, consult the cache and chunk on a miss.
    fn prepare(&self, path: &Path) -> Prepared {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                return Prepared::Failed;
            }
        };
        let hash = fingerprint(&bytes);

        let previous = self.namespace.get(path);
        if let Some(record) = previous.as_ref().filter(|r| r.fingerprint == hash) {
            return Prepared::Cached(record.clone());
        }

        let content = match extract::classify(&bytes, self.binary_threshold) {
            Decoded::Text(text) => {
                let chunks = self.chunker.chunk(path, &text);
                if chunks.is_empty() {
                    FreshContent::Unembeddable(UnembeddableReason::Empty)
                } else {
                    FreshContent::Chunks(chunks)
                }
            }
            Decoded::Unembeddable(reason) => FreshContent::Unembeddable(reason),
        };

        Prepared::Fresh {
            size: bytes.len() as u64,
            mtime: modified_secs(path),
            fingerprint: hash,
            previous,
            content,
        }
    }
}

fn modified_secs(path: &Path) -> u64 {
    std::fs::metadata(path)
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One indexing pass over a root directory.
///
/// File preparation runs on a bounded rayon pool; provider calls happen one
/// at a time on the calling thread, and every new record is stored as soon
/// as it is computed.
pub struct Indexer<'a, P: EmbeddingProvider> {
    root: &'a Path,
    config: &'a Config,
    namespace: &'a Namespace,
    provider: &'a P,
    progress_callback: Option<&'a ProgressCallback>,
}

impl<'a, P: EmbeddingProvider> Indexer<'a, P> {
    pub fn new(root: &'a Path, config: &'a Config, namespace: &'a Namespace, provider: &'a P) -> Self {
        Self {
            root,
            config,
            namespace,
            provider,
            progress_callback: None,
        }
    }

    /// Set a callback to receive progress updates during indexing.
    pub fn with_progress(mut self, callback: Option<&'a ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Emit a progress event if a callback is registered.
    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(callback) = self.progress_callback {
            callback(event);
        }
    }

    /// Walk the root and bring the namespace up to date.
    pub fn run(&self) -> Result<IndexOutcome> {
        let mut stats = IndexStats::default();

        let walker = Walker::new(self.root, self.config);
        let mut paths: Vec<PathBuf> = Vec::new();
        for path in walker.walk() {
            stats.files_scanned += 1;
            self.emit_progress(ProgressEvent::Scanning {
                count: stats.files_scanned,
            });
            paths.push(path);
        }

        let workers = self.config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| SeeklyError::Config(format!("cannot start worker pool: {e}")))?;
        let preparer = Preparer {
            namespace: self.namespace,
            chunker: Chunker::from_config(self.config),
            binary_threshold: self.config.binary_threshold,
        };

        let total = paths.len();
        let mut corpus = Vec::new();
        let mut current = 0;

        for batch in paths.chunks(workers * 4) {
            let prepared: Vec<Prepared> =
                pool.install(|| batch.par_iter().map(|p| preparer.prepare(p)).collect());

            for (path, item) in batch.iter().zip(prepared) {
                current += 1;
                self.emit_progress(ProgressEvent::Indexing {
                    current,
                    total,
                    path: path.as_path(),
                });

                match item {
                    Prepared::Failed => stats.files_skipped += 1,
                    Prepared::Cached(record) => {
                        stats.files_cached += 1;
                        if record.is_rankable() {
                            corpus.push(record);
                        } else {
                            stats.files_unembeddable += 1;
                        }
                    }
                    Prepared::Fresh {
                        size,
                        mtime,
                        fingerprint,
                        previous,
                        content,
                    } => {
                        let record = match content {
                            FreshContent::Unembeddable(reason) => {
                                tracing::debug!("Not embedding {} ({})", path.display(), reason);
                                stats.files_unembeddable += 1;
                                FileRecord {
                                    path: path.clone(),
                                    size,
                                    mtime,
                                    fingerprint,
                                    status: RecordStatus::Unembeddable { reason },
                                    chunks: Vec::new(),
                                }
                            }
                            FreshContent::Chunks(chunks) => {
                                let chunks =
                                    self.embed_chunks(path, chunks, previous.as_ref(), &mut stats)?;
                                stats.files_embedded += 1;
                                FileRecord {
                                    path: path.clone(),
                                    size,
                                    mtime,
                                    fingerprint,
                                    status: RecordStatus::Embedded,
                                    chunks,
                                }
                            }
                        };

                        if let Err(e) = self.namespace.store(&record) {
                            tracing::warn!("Failed to cache {}: {}", path.display(), e);
                        }
                        if record.is_rankable() {
                            corpus.push(record);
                        }
                    }
                }
            }
        }

        let live: HashSet<PathBuf> = paths.into_iter().collect();
        match self.namespace.retain(&live) {
            Ok(removed) => stats.files_removed = removed,
            Err(e) => tracing::warn!(
                "Failed to prune cache namespace {}: {}",
                self.namespace.id(),
                e
            ),
        }

        tracing::info!(
            "Indexed {}: {} scanned, {} cached, {} embedded, {} unembeddable, {} skipped, {} removed",
            self.root.display(),
            stats.files_scanned,
            stats.files_cached,
            stats.files_embedded,
            stats.files_unembeddable,
            stats.files_skipped,
            stats.files_removed
        );

        Ok(IndexOutcome { corpus, stats })
    }

    /// Attach vectors to chunks, reusing the previous record's where the text is unchanged.
    fn embed_chunks(
        &self,
        path: &Path,
        chunks: Vec<Chunk>,
        previous: Option<&FileRecord>,
        stats: &mut IndexStats,
    ) -> Result<Vec<ChunkRecord>> {
        let mut vectors: HashMap<String, Vec<f32>> = HashMap::new();
        if let Some(previous) = previous {
            for chunk in &previous.chunks {
                vectors.insert(chunk.fingerprint.clone(), chunk.embedding.clone());
            }
        }

        let hashes: Vec<String> = chunks.iter().map(|c| fingerprint(c.text.as_bytes())).collect();

        let mut pending: Vec<(&str, &str)> = Vec::new();
        let mut queued: HashSet<&str> = HashSet::new();
        for (chunk, hash) in chunks.iter().zip(&hashes) {
            if vectors.contains_key(hash) {
                stats.chunks_reused += 1;
            } else if queued.insert(hash.as_str()) {
                pending.push((
                    hash.as_str(),
                    extract::truncate_at_char_boundary(&chunk.text, MAX_EMBED_CHARS),
                ));
            }
        }

        if !pending.is_empty() {
            self.emit_progress(ProgressEvent::Embedding {
                path,
                chunks: pending.len(),
            });
            let texts: Vec<&str> = pending.iter().map(|(_, text)| *text).collect();
            let embeddings = self.provider.embed_batch(&texts)?;
            stats.provider_calls += 1;

            if embeddings.len() != texts.len() {
                return Err(SeeklyError::Provider(format!(
                    "expected {} embeddings for {}, got {}",
                    texts.len(),
                    path.display(),
                    embeddings.len()
                )));
            }
            for ((hash, _), embedding) in pending.iter().zip(embeddings) {
                if embedding.len() != self.namespace.dimension() {
                    return Err(SeeklyError::DimensionMismatch {
                        expected: self.namespace.dimension(),
                        actual: embedding.len(),
                    });
                }
                vectors.insert(hash.to_string(), embedding);
            }
            stats.chunks_embedded += texts.len();
        }

        Ok(chunks
            .into_iter()
            .zip(hashes)
            .map(|(chunk, hash)| {
                let embedding = vectors.get(&hash).cloned().unwrap_or_default();
                ChunkRecord {
                    kind: chunk.kind,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    text: chunk.text,
                    fingerprint: hash,
                    embedding,
                }
            })
            .collect())
    }
}
