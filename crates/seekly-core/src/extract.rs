//! Text extraction from files
//!
//! Decides which files are worth reading, decodes their bytes and sniffs out
//! binary content that should never reach the embedding model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunk::LanguageFamily;
use crate::{BINARY_CHECK_SIZE, Config};

/// Extensions chunked with the indentation heuristics
pub const INDENTATION_EXTENSIONS: &[&str] = &["py", "pyi", "pyw"];

/// Extensions chunked with the brace heuristics
pub const BRACE_EXTENSIONS: &[&str] = &[
    "rs", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "java", "c", "h", "cpp", "cc", "cxx",
    "hpp", "hh", "cs", "php", "swift", "kt", "kts", "scala", "dart", "groovy", "zig", "v", "d",
];

/// Other text extensions, chunked with fixed line windows
pub const WINDOW_EXTENSIONS: &[&str] = &[
    // Plain text
    "txt", "md", "rst", "org", "adoc",
    // Code without a dedicated heuristic
    "rb", "hs", "ml", "ex", "exs", "erl", "clj", "cljs", "lisp", "scm", "lua", "r", "jl", "nim",
    // Web
    "html", "htm", "css", "scss", "sass", "less", "vue", "svelte",
    // Config
    "json", "yaml", "yml", "toml", "xml", "ini", "cfg", "conf",
    // Shell
    "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd",
    // Data
    "csv", "sql",
    // Docs
    "tex", "bib",
];

/// Why a file was kept out of the embedding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnembeddableReason {
    /// Zero bytes or whitespace only
    Empty,
    /// Not valid UTF-8
    InvalidUtf8,
    /// NUL bytes or too many control characters
    Binary,
}

impl std::fmt::Display for UnembeddableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::InvalidUtf8 => "invalid utf-8",
            Self::Binary => "binary",
        };
        f.write_str(s)
    }
}

/// Result of decoding a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text(String),
    Unembeddable(UnembeddableReason),
}

/// Check if a file extension is in the supported set.
pub fn is_text_extension(ext: &str) -> bool {
    let ext = ext.to_lowercase();
    supported_extensions()
        .iter()
        .any(|(_, exts)| exts.contains(&ext.as_str()))
}

/// Supported extensions grouped by chunking family.
pub fn supported_extensions() -> [(LanguageFamily, &'static [&'static str]); 3] {
    [
        (LanguageFamily::Indentation, INDENTATION_EXTENSIONS),
        (LanguageFamily::Brace, BRACE_EXTENSIONS),
        (LanguageFamily::Window, WINDOW_EXTENSIONS),
    ]
}

/// Check if a file should be indexed based on config and extension.
///
/// Files without an extension (scripts, `Makefile`, ...) are kept unless an
/// allow-list is set; content sniffing screens out the binaries among them.
pub fn should_index(path: &Path, config: &Config) -> bool {
    let Some(ext) = path.extension() else {
        return config.include_extensions.is_empty();
    };
    let ext = ext.to_string_lossy().to_lowercase();

    // Check exclude list first
    if config
        .exclude_extensions
        .iter()
        .any(|e| normalize_ext(e) == ext)
    {
        return false;
    }

    // If include list is specified, only include those
    if !config.include_extensions.is_empty() {
        return config
            .include_extensions
            .iter()
            .any(|e| normalize_ext(e) == ext);
    }

    is_text_extension(&ext)
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Decode file bytes, classifying binary and empty content.
///
/// `threshold` is the share of control characters (tab, newline, carriage
/// return and form feed excluded) in the first [`BINARY_CHECK_SIZE`] bytes
/// above which the content is considered binary.
pub fn classify(bytes: &[u8], threshold: f32) -> Decoded {
    let head = &bytes[..bytes.len().min(BINARY_CHECK_SIZE)];
    if head.contains(&0) {
        return Decoded::Unembeddable(UnembeddableReason::Binary);
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return Decoded::Unembeddable(UnembeddableReason::InvalidUtf8),
    };

    if text.trim().is_empty() {
        return Decoded::Unembeddable(UnembeddableReason::Empty);
    }

    let mut total = 0usize;
    let mut control = 0usize;
    for c in text.chars().take(BINARY_CHECK_SIZE) {
        total += 1;
        if c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c') {
            control += 1;
        }
    }
    if total > 0 && control as f32 / total as f32 > threshold {
        return Decoded::Unembeddable(UnembeddableReason::Binary);
    }

    Decoded::Text(text.to_string())
}

/// Cut `text` to at most `max` bytes without splitting a character.
pub fn truncate_at_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text_extension() {
        assert!(is_text_extension("rs"));
        assert!(is_text_extension("RS"));
        assert!(is_text_extension("py"));
        assert!(is_text_extension("md"));
        assert!(!is_text_extension("png"));
        assert!(!is_text_extension("exe"));
    }

    #[test]
    fn test_should_index_rules() {
        let config = Config::default();
        assert!(should_index(Path::new("src/main.rs"), &config));
        assert!(!should_index(Path::new("logo.png"), &config));

        let config = Config {
            include_extensions: vec![".py".into()],
            ..Config::default()
        };
        assert!(should_index(Path::new("a.py"), &config));
        assert!(!should_index(Path::new("a.rs"), &config));

        let config = Config {
            include_extensions: vec!["py".into()],
            exclude_extensions: vec!["PY".into()],
            ..Config::default()
        };
        assert!(!should_index(Path::new("a.py"), &config));
    }

    #[test]
    fn test_should_index_extensionless() {
        assert!(should_index(Path::new("bin/tool"), &Config::default()));
        assert!(should_index(Path::new("Makefile"), &Config::default()));

        let config = Config {
            include_extensions: vec!["py".into()],
            ..Config::default()
        };
        assert!(!should_index(Path::new("bin/tool"), &config));
    }

    #[test]
    fn test_classify_text() {
        let decoded = classify(b"\xEF\xBB\xBFfn main() {}\n", 0.3);
        assert_eq!(decoded, Decoded::Text("fn main() {}\n".into()));
    }

    #[test]
    fn test_classify_unembeddable() {
        assert_eq!(
            classify(b"", 0.3),
            Decoded::Unembeddable(UnembeddableReason::Empty)
        );
        assert_eq!(
            classify(b"  \n\t\n", 0.3),
            Decoded::Unembeddable(UnembeddableReason::Empty)
        );
        assert_eq!(
            classify(b"fn main() { \0 }", 0.3),
            Decoded::Unembeddable(UnembeddableReason::Binary)
        );
        assert_eq!(
            classify(&[0xff, 0xfe, 0x41], 0.3),
            Decoded::Unembeddable(UnembeddableReason::InvalidUtf8)
        );
        assert_eq!(
            classify(b"\x01\x02\x03\x04ab", 0.3),
            Decoded::Unembeddable(UnembeddableReason::Binary)
        );
    }

    #[test]
    fn test_truncate_at_char_boundary() {
        assert_eq!(truncate_at_char_boundary("hello", 10), "hello");
        assert_eq!(truncate_at_char_boundary("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off
        assert_eq!(truncate_at_char_boundary("héllo", 2), "h");
    }
}
