/// Environment variable overriding the user-level cache root
pub const CACHE_DIR_ENV: &str = "SEEKLY_CACHE_DIR";

/// Directory name under the platform cache dir
pub const APP_DIR: &str = "seekly";

/// Default embedding model (code-optimized)
pub const DEFAULT_MODEL: &str = "jina-embeddings-v2-base-code";

/// Default max file size (1MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Lines per window for the fallback chunking family
pub const DEFAULT_WINDOW_LINES: usize = 40;

/// Maximum number of sub-file chunks per file
pub const DEFAULT_MAX_CHUNKS: usize = 24;

/// Share of control characters above which a file is treated as binary
pub const DEFAULT_BINARY_THRESHOLD: f32 = 0.30;

/// Number of results shown by default
pub const DEFAULT_TOP_K: usize = 10;

/// Default similarity floor
pub const DEFAULT_SIMILARITY: f32 = 0.5;

/// Number of leading bytes inspected when sniffing for binary content
pub const BINARY_CHECK_SIZE: usize = 8192;

/// Longest chunk text handed to the embedding model, in bytes
pub const MAX_EMBED_CHARS: usize = 8192;

/// On-disk format version of a cache namespace
pub const CACHE_FORMAT_VERSION: u32 = 1;
