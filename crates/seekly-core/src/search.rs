//! Search sessions

use std::path::{Path, PathBuf};

use crate::cache::{CacheStore, FileRecord, Namespace};
use crate::embed::EmbeddingProvider;
use crate::index::{IndexStats, Indexer, ProgressCallback};
use crate::rank::{self, QueryResult, RankOptions};
use crate::{Config, Result, SeeklyError};

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opened, nothing indexed yet
    Idle,
    Indexing,
    /// Corpus loaded, accepting queries
    Ready,
    Querying,
    /// Terminal
    Closed,
}

/// User-facing result controls, resolved to [`RankOptions`] per query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub similarity: f32,
    /// Ignore `top_k` and return everything above the floor
    pub show_all: bool,
}

impl SearchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.top_k,
            similarity: config.similarity,
            show_all: false,
        }
    }

    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            min_similarity: self.similarity,
            limit: if self.show_all { None } else { Some(self.top_k) },
        }
    }
}

/// Owns the corpus for one root directory across repeated queries.
///
/// Within a session nothing is walked, chunked or embedded again unless
/// [`Session::refresh`] is called; queries only embed the query text.
pub struct Session<P: EmbeddingProvider> {
    root: PathBuf,
    config: Config,
    namespace: Namespace,
    provider: P,
    state: SessionState,
    corpus: Vec<FileRecord>,
    stats: Option<IndexStats>,
    progress_callback: Option<ProgressCallback>,
}

impl<P: EmbeddingProvider> Session<P> {
    /// Open a session over `root`, backed by the matching cache namespace.
    pub fn open(root: &Path, config: Config, cache: &CacheStore, provider: P) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|source| SeeklyError::RootUnreadable {
                path: root.to_path_buf(),
                source,
            })?;
        if let Err(source) = std::fs::read_dir(&root) {
            return Err(SeeklyError::RootUnreadable { path: root, source });
        }
        config.validate()?;

        let namespace = cache.open_namespace(&root, provider.model_name(), provider.dimension())?;
        tracing::debug!(
            "Opened session for {} (namespace {})",
            root.display(),
            namespace.id()
        );

        Ok(Self {
            root,
            config,
            namespace,
            provider,
            state: SessionState::Idle,
            corpus: Vec::new(),
            stats: None,
            progress_callback: None,
        })
    }

    /// Set a callback to receive progress updates during indexing.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Rankable records loaded by the last indexing pass.
    pub fn corpus(&self) -> &[FileRecord] {
        &self.corpus
    }

    /// Stats of the last completed indexing pass.
    pub fn stats(&self) -> Option<&IndexStats> {
        self.stats.as_ref()
    }

    /// Bring the cache up to date and load the corpus.
    pub fn index(&mut self) -> Result<IndexStats> {
        if self.state == SessionState::Closed {
            return Err(SeeklyError::SessionClosed);
        }

        self.state = SessionState::Indexing;
        let outcome = Indexer::new(&self.root, &self.config, &self.namespace, &self.provider)
            .with_progress(self.progress_callback.as_ref())
            .run();

        match outcome {
            Ok(outcome) => {
                self.corpus = outcome.corpus;
                self.stats = Some(outcome.stats.clone());
                self.state = SessionState::Ready;
                Ok(outcome.stats)
            }
            Err(e) => {
                if is_fatal(&e) {
                    self.close();
                } else {
                    self.state = if self.stats.is_some() {
                        SessionState::Ready
                    } else {
                        SessionState::Idle
                    };
                }
                Err(e)
            }
        }
    }

    /// Re-walk the root and pick up changes made since the last pass.
    pub fn refresh(&mut self) -> Result<IndexStats> {
        self.index()
    }

    /// Rank the corpus against `text`.
    pub fn query(&mut self, text: &str, options: &RankOptions) -> Result<Vec<QueryResult>> {
        if self.state == SessionState::Closed {
            return Err(SeeklyError::SessionClosed);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SeeklyError::EmptyQuery);
        }
        if self.state != SessionState::Ready {
            self.index()?;
        }

        self.state = SessionState::Querying;
        let vector = match self.provider.embed(text) {
            Ok(v) if v.len() == self.namespace.dimension() => v,
            Ok(v) => {
                self.close();
                return Err(SeeklyError::DimensionMismatch {
                    expected: self.namespace.dimension(),
                    actual: v.len(),
                });
            }
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let results = rank::rank(&vector, &self.corpus, options);
        tracing::debug!("Query {:?}: {} results", text, results.len());
        self.state = SessionState::Ready;
        Ok(results)
    }

    /// End the session and drop the in-memory corpus.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.corpus = Vec::new();
    }
}

/// Errors that mean the provider can no longer be trusted.
fn is_fatal(err: &SeeklyError) -> bool {
    matches!(
        err,
        SeeklyError::Provider(_) | SeeklyError::DimensionMismatch { .. }
    )
}
