//! Heuristic code chunking
//!
//! Every file yields one whole-file chunk. On top of that we try to cut out
//! function-sized pieces using a cheap per-family heuristic: indentation for
//! Python-like sources, brace matching for C-like sources, and fixed line
//! windows for everything else. None of this is a real parser; a missed or
//! slightly-off boundary only costs a little ranking precision.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::extract::{BRACE_EXTENSIONS, INDENTATION_EXTENSIONS};

/// Longest multi-line `def` signature we are willing to follow.
const MAX_HEADER_LINES: usize = 8;

/// Words that introduce a function in brace languages.
const FUNCTION_KEYWORDS: &[&str] = &["fn", "function", "func", "fun"];

/// Words that make a `name(...) {` header a statement rather than a function.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "match", "loop", "catch", "try",
    "finally", "return", "throw", "with", "using", "lock", "synchronized", "select", "case",
    "defer", "go", "new", "await",
];

/// Words that make a `name(...) {` header a type declaration.
const DECLARATION_KEYWORDS: &[&str] = &[
    "class", "struct", "enum", "interface", "record", "object", "impl", "trait", "namespace",
    "union", "extern", "type", "package",
];

/// Extensions whose sources open function bodies with `(args) => {`.
const ARROW_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx"];

/// Tokens ending a line whose statement carries on below.
const TRAILING_CONTINUATIONS: &[&str] = &[
    ",", "(", "[", "<", "=", "=>", "->", ":", "&&", "||", "+", "-", "*", "|", "&", ".", "?", "\\",
];

/// Tokens starting a line that carries on the statement above.
const LEADING_CONTINUATIONS: &[&str] = &[".", ")", "]", "->", "=>", ":", "&&", "||", "?", "+"];

/// What part of a file a chunk covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    File,
    Function,
    Window,
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Function => "function",
            Self::Window => "window",
        };
        f.write_str(s)
    }
}

/// Family of boundary heuristics applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageFamily {
    /// Blocks delimited by indentation (Python)
    Indentation,
    /// Blocks delimited by balanced braces (C, Rust, JS, Go, ...)
    Brace,
    /// No usable structure: fixed line windows
    Window,
}

impl LanguageFamily {
    /// Detect the family from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if INDENTATION_EXTENSIONS.contains(&ext.as_str()) {
            Self::Indentation
        } else if BRACE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Brace
        } else {
            Self::Window
        }
    }

    /// Detect the family from the extension, falling back to the shebang line.
    pub fn detect(path: &Path, text: &str) -> Self {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let family = Self::from_extension(ext);
            if family != Self::Window {
                return family;
            }
        }

        let first = text.lines().next().unwrap_or("");
        if first.starts_with("#!") {
            if first.contains("python") {
                return Self::Indentation;
            }
            if first.contains("node") || first.contains("deno") {
                return Self::Brace;
            }
        }
        Self::Window
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Indentation => "indentation",
            Self::Brace => "brace",
            Self::Window => "window",
        }
    }
}

/// A chunk of text with its line range. No embedding yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Starting line number (1-indexed)
    pub start_line: usize,
    /// Ending line number (1-indexed, inclusive)
    pub end_line: usize,
    /// The text content
    pub text: String,
}

/// Splits file text into whole-file, function and window chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    window_lines: usize,
    max_chunks: usize,
}

impl Chunker {
    pub fn new(window_lines: usize, max_chunks: usize) -> Self {
        Self {
            window_lines: window_lines.max(1),
            max_chunks,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.window_lines, config.max_chunks)
    }

    /// Chunk a file. The first chunk is always the whole file.
    pub fn chunk(&self, path: &Path, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = text.lines().collect();
        let mut chunks = vec![Chunk {
            kind: ChunkKind::File,
            start_line: 1,
            end_line: lines.len().max(1),
            text: text.to_string(),
        }];

        let family = LanguageFamily::detect(path, text);
        let mut ranges = match family {
            LanguageFamily::Indentation => indentation_blocks(&lines),
            LanguageFamily::Brace => brace_blocks(text, Dialect::detect(path)),
            LanguageFamily::Window => Vec::new(),
        };

        let kind = if ranges.is_empty() {
            ranges = self.windows(lines.len());
            ChunkKind::Window
        } else {
            ChunkKind::Function
        };

        ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        ranges.dedup();

        chunks.extend(
            ranges
                .into_iter()
                .filter_map(|(start, end)| {
                    let end = end.min(lines.len().saturating_sub(1));
                    let text = lines.get(start..=end)?.join("\n");
                    if text.trim().is_empty() {
                        return None;
                    }
                    Some(Chunk {
                        kind,
                        start_line: start + 1,
                        end_line: end + 1,
                        text,
                    })
                })
                .take(self.max_chunks),
        );

        chunks
    }

    /// Non-overlapping line windows, only when the file exceeds one window.
    fn windows(&self, line_count: usize) -> Vec<(usize, usize)> {
        if line_count <= self.window_lines {
            return Vec::new();
        }
        (0..line_count)
            .step_by(self.window_lines)
            .take(self.max_chunks)
            .map(|start| (start, (start + self.window_lines).min(line_count) - 1))
            .collect()
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Find `def` blocks by indentation. Returns 0-indexed inclusive line ranges.
fn indentation_blocks(lines: &[&str]) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();

    for i in 0..lines.len() {
        let trimmed = lines[i].trim_start();
        if !(trimmed.starts_with("def ") || trimmed.starts_with("async def ")) {
            continue;
        }
        let indent = indent_width(lines[i]);

        // Follow the signature until its brackets close
        let mut depth: i32 = 0;
        let mut header_end = i;
        let mut complete = false;
        while header_end < lines.len() && header_end - i <= MAX_HEADER_LINES {
            for c in lines[header_end].chars() {
                match c {
                    '(' | '[' | '{' => depth += 1,
                    ')' | ']' | '}' => depth -= 1,
                    _ => {}
                }
            }
            if depth <= 0 {
                complete = true;
                break;
            }
            header_end += 1;
        }
        if !complete {
            continue;
        }

        let tail = lines[header_end]
            .split(" #")
            .next()
            .unwrap_or("")
            .trim_end();
        if !tail.ends_with(':') {
            // `def f(): return 1`
            if tail.contains(':') {
                blocks.push((i, header_end));
            }
            continue;
        }

        let mut end = header_end;
        for (k, line) in lines.iter().enumerate().skip(header_end + 1) {
            let body = line.trim_start();
            if body.is_empty() || body.starts_with('#') {
                continue;
            }
            if indent_width(line) <= indent {
                break;
            }
            end = k;
        }
        if end == header_end {
            continue;
        }

        let mut start = i;
        while start > 0 {
            let prev = lines[start - 1];
            if prev.trim_start().starts_with('@') && indent_width(prev) == indent {
                start -= 1;
            } else {
                break;
            }
        }

        blocks.push((start, end));
    }

    blocks
}

struct Frame {
    function: bool,
    start_line: usize,
}

/// Lexical quirks of a brace-family source.
#[derive(Debug, Clone, Copy, Default)]
struct Dialect {
    /// `'` opens a lifetime unless it looks like a char literal
    rust: bool,
    /// `=>` in front of a brace opens an arrow function
    arrows: bool,
}

impl Dialect {
    fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self {
            rust: ext == "rs",
            // Brace sources without a brace extension come from a node or deno shebang
            arrows: ARROW_EXTENSIONS.contains(&ext.as_str())
                || !BRACE_EXTENSIONS.contains(&ext.as_str()),
        }
    }
}

/// Text seen since the last statement boundary, with strings blanked out.
#[derive(Default)]
struct Header {
    text: String,
    line: Option<usize>,
    parens: usize,
    /// Last complete statement, for a brace on a line of its own
    previous: Option<(String, usize)>,
}

impl Header {
    fn push(&mut self, c: char, line: usize) {
        if self.line.is_none() && !c.is_whitespace() {
            self.line = Some(line);
        }
        match c {
            '(' => self.parens += 1,
            ')' => self.parens = self.parens.saturating_sub(1),
            _ => {}
        }
        self.text.push(c);
    }

    fn push_str(&mut self, s: &str, line: usize) {
        for c in s.chars() {
            self.push(c, line);
        }
    }

    /// Close the current statement at a line break.
    fn end_statement(&mut self) {
        if let Some(line) = self.line.take() {
            self.previous = Some((std::mem::take(&mut self.text), line));
        }
        self.text.clear();
    }

    /// Header text and start line for a `{` found on `line`.
    fn take(&mut self, line: usize) -> (String, usize) {
        match (self.line, self.previous.take()) {
            (None, Some(previous)) => previous,
            (start, _) => (std::mem::take(&mut self.text), start.unwrap_or(line)),
        }
    }

    fn reset(&mut self) {
        self.text.clear();
        self.line = None;
        self.parens = 0;
        self.previous = None;
    }
}

/// Does a line starting with `rest` carry on the statement in `header`?
fn continues(header: &str, rest: &[char]) -> bool {
    let header = header.trim_end();
    if TRAILING_CONTINUATIONS.iter().any(|t| header.ends_with(t))
        || (header.ends_with("where") && words(header).last() == Some("where"))
    {
        return true;
    }

    let rest: String = rest.iter().take(6).collect();
    LEADING_CONTINUATIONS.iter().any(|t| rest.starts_with(t))
        || rest
            .strip_prefix("where")
            .is_some_and(|tail| !tail.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// Find function bodies by brace matching. Returns 0-indexed inclusive line ranges.
///
/// Delimiters inside strings, char literals and comments are ignored. In
/// Rust sources a `'` only opens a char literal when it looks like one, so
/// lifetimes do not swallow the rest of the file.
///
/// A header is the statement in front of a `{`. Statements end at `;`, at
/// braces, and at line breaks the next line does not continue, so a `package`
/// or `import` line is never read as part of the function below it.
fn brace_blocks(text: &str, dialect: Dialect) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut blocks = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut header = Header::default();
    let mut line = 0usize;
    let mut at_line_start = true;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            line += 1;
            at_line_start = true;
            header.text.push(' ');
            i += 1;
            continue;
        }
        if at_line_start
            && !c.is_whitespace()
            && header.parens == 0
            && !continues(&header.text, &chars[i..])
        {
            header.end_statement();
        }
        if at_line_start && c == '#' {
            // Preprocessor lines and attributes
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if !c.is_whitespace() {
            at_line_start = false;
        }

        match c {
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i += 2;
                continue;
            }
            '"' | '`' => {
                header.push_str("\"\"", line);
                i = skip_string(&chars, i, &mut line);
                continue;
            }
            '\'' if dialect.rust => {
                if let Some(end) = char_literal_end(&chars, i) {
                    header.push_str("''", line);
                    i = end + 1;
                } else {
                    header.push(c, line);
                    i += 1;
                }
                continue;
            }
            '\'' => {
                header.push_str("''", line);
                i = skip_string(&chars, i, &mut line);
                continue;
            }
            '{' => {
                let (text, start_line) = header.take(line);
                stack.push(Frame {
                    function: is_function_header(&text, dialect.arrows),
                    start_line,
                });
                header.reset();
            }
            '}' => {
                if let Some(frame) = stack.pop() {
                    if frame.function {
                        blocks.push((frame.start_line, line));
                    }
                }
                header.reset();
            }
            ';' if header.parens == 0 => header.reset(),
            _ => header.push(c, line),
        }
        i += 1;
    }

    blocks
}

/// Skip a quoted string starting at `start`, returning the index after it.
fn skip_string(chars: &[char], start: usize, line: &mut usize) -> usize {
    let quote = chars[start];
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' => {
                if chars.get(j + 1) == Some(&'\n') {
                    *line += 1;
                }
                j += 2;
            }
            '\n' => {
                *line += 1;
                j += 1;
            }
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    chars.len()
}

/// Index of the closing quote of a Rust char literal starting at `start`.
fn char_literal_end(chars: &[char], start: usize) -> Option<usize> {
    match chars.get(start + 1)? {
        '\\' => (start + 3..(start + 12).min(chars.len())).find(|&j| chars[j] == '\''),
        '\n' => None,
        _ => (chars.get(start + 2) == Some(&'\'')).then_some(start + 2),
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Does the header in front of a `{` look like a function signature?
///
/// `arrows` accepts a trailing `=>`, which only opens a function body in
/// JavaScript and TypeScript. Elsewhere it is a match arm or a lambda.
fn is_function_header(header: &str, arrows: bool) -> bool {
    let header = header.trim();
    if header.is_empty() {
        return false;
    }

    let first = words(header).next().unwrap_or("");
    if CONTROL_KEYWORDS.contains(&first) {
        return false;
    }

    if words(header).any(|w| FUNCTION_KEYWORDS.contains(&w)) {
        return true;
    }

    if arrows && header.ends_with("=>") {
        return true;
    }

    // C-style `ret name(args) qualifiers`
    let (Some(open), Some(close)) = (header.find('('), header.rfind(')')) else {
        return false;
    };
    if close < open {
        return false;
    }
    let before = &header[..open];
    let after = &header[close + 1..];
    if before.contains('=') || after.contains('=') || after.contains('(') {
        return false;
    }
    if words(before).any(|w| CONTROL_KEYWORDS.contains(&w) || DECLARATION_KEYWORDS.contains(&w))
    {
        return false;
    }
    words(before)
        .last()
        .and_then(|name| name.chars().next())
        .is_some_and(|c| c.is_alphabetic() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(chunks: &[Chunk]) -> Vec<(ChunkKind, usize, usize)> {
        chunks
            .iter()
            .map(|c| (c.kind, c.start_line, c.end_line))
            .collect()
    }

    #[test]
    fn test_family_detection() {
        assert_eq!(LanguageFamily::from_extension("py"), LanguageFamily::Indentation);
        assert_eq!(LanguageFamily::from_extension("RS"), LanguageFamily::Brace);
        assert_eq!(LanguageFamily::from_extension("md"), LanguageFamily::Window);
        assert_eq!(
            LanguageFamily::detect(Path::new("bin/tool"), "#!/usr/bin/env python3\nprint(1)\n"),
            LanguageFamily::Indentation
        );
        assert_eq!(
            LanguageFamily::detect(Path::new("bin/tool"), "echo hi\n"),
            LanguageFamily::Window
        );
    }

    #[test]
    fn test_chunk_python() {
        let source = "import os

@cache
def load(path):
    with open(path) as f:
        return f.read()

class Store:
    def __init__(self,
                 root):
        self.root = root

    async def fetch(self, key):
        def inner():
            return key
        return inner()
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("store.py"), source);
        assert_eq!(
            ranges(&chunks),
            vec![
                (ChunkKind::File, 1, 16),
                (ChunkKind::Function, 3, 6),
                (ChunkKind::Function, 9, 11),
                (ChunkKind::Function, 13, 16),
                (ChunkKind::Function, 14, 15),
            ]
        );
        assert_eq!(
            chunks[1].text,
            "@cache\ndef load(path):\n    with open(path) as f:\n        return f.read()"
        );
        assert_eq!(chunks[0].text, source);
    }

    #[test]
    fn test_chunk_python_one_liner() {
        let source = "def f(): return 1\n\ndef g():\n    return 2\n";
        let chunks = Chunker::new(40, 24).chunk(Path::new("a.py"), source);
        assert_eq!(
            ranges(&chunks),
            vec![
                (ChunkKind::File, 1, 4),
                (ChunkKind::Function, 1, 1),
                (ChunkKind::Function, 3, 4),
            ]
        );
    }

    #[test]
    fn test_chunk_rust() {
        let source = r#"use std::fmt;

/// Doc
fn hello(name: &str) -> String {
    let s = "{ not a brace";
    // } neither is this
    format!("hi {}", name)
}

struct Foo<'a> {
    x: &'a str,
}

impl<'a> Foo<'a> {
    fn new(x: &'a str) -> Self {
        let c = '{';
        if x.is_empty() {
            return Self { x: "" };
        }
        Self { x }
    }
}
"#;
        let chunks = Chunker::new(40, 24).chunk(Path::new("lib.rs"), source);
        assert_eq!(
            ranges(&chunks),
            vec![
                (ChunkKind::File, 1, 22),
                (ChunkKind::Function, 4, 8),
                (ChunkKind::Function, 15, 21),
            ]
        );
        assert!(chunks[1].text.starts_with("fn hello"));
    }

    #[test]
    fn test_chunk_javascript() {
        let source = "const add = (a, b) => {
  return a + b;
};
function greet(name) {
  if (name) {
    console.log(`hi ${name}`);
  }
}
class A {
  render() {
    return 1;
  }
}
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("app.js"), source);
        assert_eq!(
            ranges(&chunks),
            vec![
                (ChunkKind::File, 1, 13),
                (ChunkKind::Function, 1, 3),
                (ChunkKind::Function, 4, 8),
                (ChunkKind::Function, 10, 12),
            ]
        );
    }

    #[test]
    fn test_chunk_c() {
        let source = "#include <stdio.h>

int main(int argc, char **argv) {
    for (int i = 0; i < argc; i++) {
        printf(\"%s\\n\", argv[i]);
    }
    return 0;
}
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("main.c"), source);
        assert_eq!(
            ranges(&chunks),
            vec![(ChunkKind::File, 1, 8), (ChunkKind::Function, 3, 8)]
        );
    }

    #[test]
    fn test_chunk_c_brace_on_own_line() {
        let source = "static int
add(int a, int b)
{
    return a + b;
}
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("add.c"), source);
        assert_eq!(
            ranges(&chunks),
            vec![(ChunkKind::File, 1, 5), (ChunkKind::Function, 2, 5)]
        );
    }

    #[test]
    fn test_match_arms_are_not_functions() {
        let source = r#"fn describe(value: Option<u32>) -> String {
    match value {
        Some(0) => {
            "zero".to_string()
        }
        Some(n) => {
            format!("{n}")
        }
        None => String::new(),
    }
}
"#;
        let chunks = Chunker::new(40, 24).chunk(Path::new("describe.rs"), source);
        assert_eq!(
            ranges(&chunks),
            vec![(ChunkKind::File, 1, 11), (ChunkKind::Function, 1, 11)]
        );
    }

    #[test]
    fn test_multi_line_rust_signature() {
        let source = "fn apply<T>(value: T) -> T
where
    T: Clone,
{
    value.clone()
}
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("apply.rs"), source);
        assert_eq!(
            ranges(&chunks),
            vec![(ChunkKind::File, 1, 6), (ChunkKind::Function, 1, 6)]
        );
    }

    #[test]
    fn test_go_preamble_is_not_part_of_first_function() {
        let source = "package main

import (
\t\"fmt\"
)

func main() {
\tfmt.Println(\"hi\")
}
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("main.go"), source);
        assert_eq!(
            ranges(&chunks),
            vec![(ChunkKind::File, 1, 9), (ChunkKind::Function, 7, 9)]
        );
        assert!(chunks[1].text.starts_with("func main()"));
    }

    #[test]
    fn test_statements_without_semicolons_end_at_newline() {
        let source = "import x from 'y'
const a = 1
function f() {
  return a
}
";
        let chunks = Chunker::new(40, 24).chunk(Path::new("f.js"), source);
        assert_eq!(
            ranges(&chunks),
            vec![(ChunkKind::File, 1, 5), (ChunkKind::Function, 3, 5)]
        );
    }

    #[test]
    fn test_function_header_classification() {
        assert!(is_function_header("pub fn run(&self) -> Result<()>", false));
        assert!(is_function_header("func (s *Server) Start() error", false));
        assert!(is_function_header("@Override public void run() throws IOException", false));
        assert!(is_function_header("items.forEach((x) =>", true));
        assert!(!is_function_header("Some(value) =>", false));
        assert!(!is_function_header("x =>", false));
        assert!(!is_function_header("if (ready)", false));
        assert!(!is_function_header("else if (x > 1)", false));
        assert!(!is_function_header("match parse(x)", false));
        assert!(!is_function_header("public record Point(int x, int y)", false));
        assert!(!is_function_header("let v = compute(a)", false));
        assert!(!is_function_header("impl Foo", false));
        assert!(!is_function_header("if let Some(func) = lookup(name)", false));
    }

    #[test]
    fn test_dialect_detection() {
        assert!(Dialect::detect(Path::new("a.rs")).rust);
        assert!(!Dialect::detect(Path::new("a.rs")).arrows);
        assert!(Dialect::detect(Path::new("a.tsx")).arrows);
        assert!(!Dialect::detect(Path::new("A.cs")).arrows);
        assert!(Dialect::detect(Path::new("bin/serve")).arrows);
    }

    #[test]
    fn test_window_fallback() {
        let text: String = (1..=100).map(|i| format!("line {i}\n")).collect();
        let chunks = Chunker::new(40, 24).chunk(Path::new("notes.txt"), &text);
        assert_eq!(
            ranges(&chunks),
            vec![
                (ChunkKind::File, 1, 100),
                (ChunkKind::Window, 1, 40),
                (ChunkKind::Window, 41, 80),
                (ChunkKind::Window, 81, 100),
            ]
        );
        assert!(chunks[3].text.starts_with("line 81"));
    }

    #[test]
    fn test_python_without_defs_uses_windows() {
        let text: String = (1..=50).map(|i| format!("x{i} = {i}\n")).collect();
        let chunks = Chunker::new(20, 24).chunk(Path::new("settings.py"), &text);
        assert!(chunks[1..].iter().all(|c| c.kind == ChunkKind::Window));
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_short_file_has_only_file_chunk() {
        let chunks = Chunker::new(40, 24).chunk(Path::new("README.md"), "# Title\n\nhello\n");
        assert_eq!(ranges(&chunks), vec![(ChunkKind::File, 1, 3)]);
    }

    #[test]
    fn test_chunk_cap_keeps_earliest() {
        let source: String = (0..10)
            .map(|i| format!("def f{i}():\n    return {i}\n\n"))
            .collect();
        let chunks = Chunker::new(40, 3).chunk(Path::new("many.py"), &source);
        assert_eq!(chunks.len(), 4);
        assert!(chunks[1].text.starts_with("def f0"));
        assert!(chunks[3].text.starts_with("def f2"));
    }

    #[test]
    fn test_chunk_empty() {
        assert!(Chunker::new(40, 24).chunk(Path::new("a.py"), "").is_empty());
        assert!(Chunker::new(40, 24).chunk(Path::new("a.py"), " \n\n").is_empty());
    }
}
