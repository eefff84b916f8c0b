//! Configuration handling for `<cache root>/config.json`

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_BINARY_THRESHOLD, DEFAULT_MAX_CHUNKS, DEFAULT_MAX_FILE_SIZE, DEFAULT_MODEL,
    DEFAULT_SIMILARITY, DEFAULT_TOP_K, DEFAULT_WINDOW_LINES, Result, SeeklyError,
};

/// User configuration. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedding model name (fastembed model ID)
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum file size to index (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// File extensions to include (empty = all supported extensions)
    #[serde(default)]
    pub include_extensions: Vec<String>,

    /// File extensions to exclude
    #[serde(default)]
    pub exclude_extensions: Vec<String>,

    /// Directory names skipped in addition to the built-in list
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Lines per window when no function boundaries are found
    #[serde(default = "default_window_lines")]
    pub window_lines: usize,

    /// Maximum number of function/window chunks per file
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Share of control characters above which content counts as binary
    #[serde(default = "default_binary_threshold")]
    pub binary_threshold: f32,

    /// Number of results to show
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Similarity floor in 0..=1
    #[serde(default = "default_similarity")]
    pub similarity: f32,

    /// Whether to print matching snippets
    #[serde(default = "default_snippets")]
    pub snippets: bool,

    /// Worker threads for file preparation (0 = available cores)
    #[serde(default)]
    pub workers: usize,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_window_lines() -> usize {
    DEFAULT_WINDOW_LINES
}

fn default_max_chunks() -> usize {
    DEFAULT_MAX_CHUNKS
}

fn default_binary_threshold() -> f32 {
    DEFAULT_BINARY_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_similarity() -> f32 {
    DEFAULT_SIMILARITY
}

fn default_snippets() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_file_size: default_max_file_size(),
            include_extensions: Vec::new(),
            exclude_extensions: Vec::new(),
            exclude_dirs: Vec::new(),
            window_lines: default_window_lines(),
            max_chunks: default_max_chunks(),
            binary_threshold: default_binary_threshold(),
            top_k: default_top_k(),
            similarity: default_similarity(),
            snippets: default_snippets(),
            workers: 0,
        }
    }
}

impl Config {
    /// Load config from a JSON file, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity) {
            return Err(SeeklyError::Config(format!(
                "similarity must be within 0..=1, got {}",
                self.similarity
            )));
        }
        if self.window_lines == 0 {
            return Err(SeeklyError::Config("window_lines must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.binary_threshold) {
            return Err(SeeklyError::Config(format!(
                "binary_threshold must be within 0..=1, got {}",
                self.binary_threshold
            )));
        }
        Ok(())
    }

    /// Number of worker threads to use for file preparation.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert!(config.snippets);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "top_k": 3, "exclude_dirs": ["fixtures"] }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.exclude_dirs, vec!["fixtures".to_string()]);
        assert_eq!(config.window_lines, DEFAULT_WINDOW_LINES);
    }

    #[test]
    fn out_of_range_similarity_is_rejected() {
        let config = Config {
            similarity: 1.5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(SeeklyError::Config(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            model: "bge-small-en-v1.5".into(),
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap().model, "bge-small-en-v1.5");
    }
}
