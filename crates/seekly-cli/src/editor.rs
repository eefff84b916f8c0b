//! Launching an editor at a result

use std::path::Path;
use std::process::Command;

use anyhow::{Result, bail};

/// How an editor accepts a line number on its command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineArg {
    /// `+N file` (vi, nano, emacs, ...)
    Plus,
    /// `-g file:N` (VS Code and its forks)
    Goto,
    /// Line numbers unsupported: just the file
    None,
}

const PLUS_EDITORS: &[&str] = &[
    "vi", "vim", "nvim", "gvim", "view", "nano", "pico", "emacs", "emacsclient", "micro", "kak",
    "joe", "ne", "mg",
];

const GOTO_EDITORS: &[&str] = &["code", "code-insiders", "codium", "cursor", "windsurf"];

fn line_arg(program: &str) -> LineArg {
    let name = Path::new(program)
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or(program);
    if PLUS_EDITORS.contains(&name) {
        LineArg::Plus
    } else if GOTO_EDITORS.contains(&name) {
        LineArg::Goto
    } else {
        LineArg::None
    }
}

/// Pick the editor: explicit choice, then `$VISUAL`, then `$EDITOR`, then `vi`.
pub fn resolve(explicit: Option<&str>) -> String {
    let var = |name| std::env::var(name).ok();
    resolve_from(explicit, var("VISUAL").as_deref(), var("EDITOR").as_deref())
}

fn resolve_from(explicit: Option<&str>, visual: Option<&str>, editor: Option<&str>) -> String {
    [explicit, visual, editor]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|e| !e.is_empty())
        .unwrap_or("vi")
        .to_string()
}

/// Build the command opening `path` at `line` (1-indexed).
///
/// `editor` may carry its own arguments, as in `code --wait`.
pub fn command(editor: &str, path: &Path, line: usize) -> Result<Command> {
    let mut words = editor.split_whitespace();
    let Some(program) = words.next() else {
        bail!("No editor configured");
    };

    let mut cmd = Command::new(program);
    cmd.args(words);
    match line_arg(program) {
        LineArg::Plus => {
            cmd.arg(format!("+{}", line));
            cmd.arg(path);
        }
        LineArg::Goto => {
            cmd.arg("-g");
            cmd.arg(format!("{}:{}", path.display(), line));
        }
        LineArg::None => {
            cmd.arg(path);
        }
    }
    Ok(cmd)
}
