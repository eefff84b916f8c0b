//! Interactive query loop

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Result;
use crate::embed::EmbeddingProvider;
use crate::rank::QueryResult;
use crate::search::{SearchOptions, Session};

pub const PROMPT: &str = "seekly> ";

/// Cooperative cancellation shared with a signal handler.
///
/// The loop only looks at the flag at the prompt boundary, so a cancel
/// never interrupts a query in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    at_prompt: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True while the loop is blocked reading the next line.
    pub fn is_waiting_for_input(&self) -> bool {
        self.at_prompt.load(Ordering::SeqCst)
    }

    fn set_waiting(&self, waiting: bool) {
        self.at_prompt.store(waiting, Ordering::SeqCst);
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Refresh,
    /// Blank line
    Empty,
    Query(String),
}

pub fn parse_command(line: &str) -> ReplCommand {
    match line.trim() {
        "" => ReplCommand::Empty,
        "exit" | "quit" | ":q" => ReplCommand::Exit,
        ":refresh" | ":r" => ReplCommand::Refresh,
        query => ReplCommand::Query(query.to_string()),
    }
}

/// What happened during an interactive run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplSummary {
    pub queries: usize,
    pub refreshes: usize,
    pub cancelled: bool,
}

/// Read queries from `input` until exit, end of input or cancellation.
///
/// `render` prints each result list; the session is closed on return.
pub fn run_interactive<P, R, W, F>(
    session: &mut Session<P>,
    mut input: R,
    mut output: W,
    options: &SearchOptions,
    cancel: &CancelToken,
    mut render: F,
) -> Result<ReplSummary>
where
    P: EmbeddingProvider,
    R: BufRead,
    W: Write,
    F: FnMut(&mut W, &str, &[QueryResult]) -> std::io::Result<()>,
{
    let mut summary = ReplSummary::default();
    let rank_options = options.rank_options();

    let result = (|| -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                return Ok(());
            }

            write!(output, "{PROMPT}")?;
            output.flush()?;

            let mut line = String::new();
            cancel.set_waiting(true);
            let read = input.read_line(&mut line);
            cancel.set_waiting(false);

            if read? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            if cancel.is_cancelled() {
                summary.cancelled = true;
                return Ok(());
            }

            match parse_command(&line) {
                ReplCommand::Empty => continue,
                ReplCommand::Exit => return Ok(()),
                ReplCommand::Refresh => {
                    let stats = session.refresh()?;
                    summary.refreshes += 1;
                    writeln!(
                        output,
                        "Refreshed: {} files, {} embedded, {} from cache",
                        stats.files_scanned, stats.files_embedded, stats.files_cached
                    )?;
                }
                ReplCommand::Query(query) => {
                    let results = session.query(&query, &rank_options)?;
                    summary.queries += 1;
                    render(&mut output, &query, &results)?;
                }
            }
        }
    })();

    session.close();
    result.map(|()| summary)
}
