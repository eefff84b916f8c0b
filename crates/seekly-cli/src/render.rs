//! Terminal output for search results

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use seekly_core::QueryResult;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

// Max lines to display before truncating
const MAX_DISPLAY_LINES: usize = 12;
const HEAD_LINES: usize = 5;
const TAIL_LINES: usize = 3;

/// Prints ranked results relative to a root directory.
pub struct Renderer {
    root: PathBuf,
    snippets: bool,
    highlighter: Option<SyntaxHighlighter>,
}

impl Renderer {
    /// `color` enables ANSI styling and syntax highlighting.
    pub fn new(root: &Path, snippets: bool, color: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            snippets,
            highlighter: color.then(SyntaxHighlighter::new),
        }
    }

    pub fn print_results<W: Write>(
        &self,
        out: &mut W,
        query: &str,
        results: &[QueryResult],
    ) -> io::Result<()> {
        if results.is_empty() {
            writeln!(out, "No results found for: {}", query)?;
            return Ok(());
        }

        writeln!(out, "Results for: {}\n", query)?;
        for result in results {
            self.print_result(out, result)?;
        }
        Ok(())
    }

    /// Path shown to the user: relative to the root where possible.
    pub fn display_path<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
    }

    fn print_result<W: Write>(&self, out: &mut W, result: &QueryResult) -> io::Result<()> {
        let path = self.display_path(&result.path);

        match &self.highlighter {
            Some(_) => {
                let score_color = if result.score > 0.7 {
                    "\x1b[32m" // Green for high scores
                } else if result.score > 0.5 {
                    "\x1b[33m" // Yellow for medium scores
                } else {
                    "\x1b[31m" // Red for low scores
                };
                writeln!(
                    out,
                    "\x1b[1;36m[{}]\x1b[0m {}{:.3}\x1b[0m  \x1b[1m{}\x1b[0m:\x1b[33m{}-{}\x1b[0m \x1b[2m({})\x1b[0m",
                    result.rank,
                    score_color,
                    result.score,
                    path,
                    result.start_line,
                    result.end_line,
                    result.kind,
                )?;
            }
            None => writeln!(
                out,
                "[{}] {:.3}  {}:{}-{} ({})",
                result.rank, result.score, path, result.start_line, result.end_line, result.kind,
            )?,
        }

        if !self.snippets {
            return Ok(());
        }

        let snippet = format_snippet(&result.snippet, result.start_line, self.highlighter.is_some());
        match &self.highlighter {
            Some(highlighter) => {
                let extension = result
                    .path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("txt");
                writeln!(out, "{}", highlighter.highlight(&snippet, extension))?;
            }
            None => write!(out, "{}", snippet)?,
        }
        writeln!(out)
    }
}

/// Number the snippet's lines, keeping head and tail of long ones.
fn format_snippet(text: &str, start_line: usize, color: bool) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let total_lines = lines.len();
    let mut result = String::new();

    let mut push = |offset: usize, line: &str| {
        result.push_str(&format!("│ {:4} │ {}\n", start_line + offset, line));
    };

    if total_lines <= MAX_DISPLAY_LINES {
        for (i, line) in lines.iter().enumerate() {
            push(i, line);
        }
        return result;
    }

    for (i, line) in lines[..HEAD_LINES].iter().enumerate() {
        push(i, line);
    }
    let hidden = total_lines - HEAD_LINES - TAIL_LINES;
    if color {
        result.push_str(&format!("\x1b[2m     ┊  ... {} more lines ...\x1b[0m\n", hidden));
    } else {
        result.push_str(&format!("     ┊  ... {} more lines ...\n", hidden));
    }
    let tail_start = total_lines - TAIL_LINES;
    for (i, line) in lines[tail_start..].iter().enumerate() {
        result.push_str(&format!("│ {:4} │ {}\n", start_line + tail_start + i, line));
    }
    result
}

/// Wrapper around syntect for syntax highlighting.
struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl SyntaxHighlighter {
    fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    fn highlight(&self, code: &str, extension: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension(extension)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let Some(theme) = self.theme_set.themes.get("base16-ocean.dark") else {
            return code.to_string();
        };
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
                }
                Err(_) => {
                    output.push_str(line);
                }
            }
        }
        output.push_str("\x1b[0m"); // Reset colors

        output
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
