//! Embedding generation
//!
//! The rest of the crate only talks to [`EmbeddingProvider`]. The production
//! implementation wraps fastembed; tests plug in deterministic stubs.

use std::path::{Path, PathBuf};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::{Result, SeeklyError, discover};

/// Something that turns text into fixed-dimension vectors.
///
/// Calls are made from a single thread; implementations need not be
/// safe for concurrent use.
pub trait EmbeddingProvider {
    /// Model identifier, recorded in each cache namespace.
    fn model_name(&self) -> &str;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Generate embeddings for a batch of texts, one vector per text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| SeeklyError::Provider("No embedding generated".to_string()))
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Models we know how to load, with their output dimension.
pub const SUPPORTED_MODELS: &[(&str, usize)] = &[
    // Code-optimized model (default)
    ("jina-embeddings-v2-base-code", 768),
    // General-purpose models
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
];

fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let model = match name {
        "jina-embeddings-v2-base-code" => EmbeddingModel::JinaEmbeddingsV2BaseCode,
        "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        other => {
            let supported: Vec<&str> = SUPPORTED_MODELS.iter().map(|(n, _)| *n).collect();
            return Err(SeeklyError::Config(format!(
                "Unknown model: {}. Supported: {}",
                other,
                supported.join(", ")
            )));
        }
    };
    let dimension = SUPPORTED_MODELS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| *d)
        .unwrap_or_default();
    Ok((model, dimension))
}

/// Wrapper around fastembed for generating embeddings.
pub struct FastEmbedProvider {
    model: TextEmbedding,
    name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Load (downloading on first use) the named model into `cache_dir`.
    pub fn load(name: &str, cache_dir: &Path, show_progress: bool) -> Result<Self> {
        let (model_type, dimension) = resolve_model(name)?;

        std::fs::create_dir_all(cache_dir)?;
        let options = InitOptions::new(model_type)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(show_progress);

        tracing::info!("Loading embedding model {} from {}", name, cache_dir.display());
        let model =
            TextEmbedding::try_new(options).map_err(|e| SeeklyError::Provider(e.to_string()))?;

        Ok(Self {
            model,
            name: name.to_string(),
            dimension,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| SeeklyError::Provider(e.to_string()))?;

        Ok(embeddings)
    }
}

/// What is on disk in the model cache, without loading anything.
#[derive(Debug, Clone)]
pub struct ModelCacheStatus {
    pub dir: PathBuf,
    pub present: bool,
    pub size_bytes: u64,
}

/// Inspect the model cache directory.
pub fn model_cache_status(dir: &Path) -> ModelCacheStatus {
    let present = std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    ModelCacheStatus {
        dir: dir.to_path_buf(),
        present,
        size_bytes: discover::dir_size(dir),
    }
}
