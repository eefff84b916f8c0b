//! seekly-core: natural language search over a directory tree
//!
//! This library walks a directory, splits files into coarse chunks, embeds
//! them with a local model and ranks them against a query. Embeddings are
//! kept in a per-directory fingerprint cache so unchanged files are never
//! embedded twice.

pub mod cache;
pub mod chunk;
pub mod config;
pub mod consts;
pub mod discover;
pub mod embed;
pub mod extract;
pub mod index;
pub mod rank;
pub mod repl;
pub mod search;
pub mod walk;

pub use cache::{CacheStore, ClearScope, FileRecord, Namespace};
pub use config::Config;
pub use consts::*;
pub use discover::CacheLayout;
pub use embed::{EmbeddingProvider, FastEmbedProvider};
pub use index::{IndexOutcome, IndexStats, Indexer, ProgressCallback, ProgressEvent};
pub use rank::{QueryResult, RankOptions};
pub use repl::{CancelToken, run_interactive};
pub use search::{SearchOptions, Session, SessionState};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SeeklyError {
    #[error("Cannot read root directory {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty query: nothing to search for")]
    EmptyQuery,

    #[error("Session is closed")]
    SessionClosed,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Cache error in namespace {namespace}: {message}")]
    Cache { namespace: String, message: String },

    #[error(
        "Embedding model unavailable: {0}\n\
         The model is downloaded on first use; check your network connection, \
         or run `seekly clear --model` to reset a damaged model cache."
    )]
    Provider(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SeeklyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_carries_remediation() {
        let err = SeeklyError::Provider("download failed".into());
        let msg = err.to_string();
        assert!(msg.contains("download failed"));
        assert!(msg.contains("seekly clear --model"));
    }

    #[test]
    fn root_unreadable_names_the_path() {
        let err = SeeklyError::RootUnreadable {
            path: PathBuf::from("/no/such/dir"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/no/such/dir"));
    }
}
