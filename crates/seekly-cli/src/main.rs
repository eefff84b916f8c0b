//! seekly CLI: natural language search over a directory tree

mod editor;
mod render;

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use seekly_core::index::{ProgressCallback, ProgressEvent};
use seekly_core::{
    CacheLayout, CacheStore, CancelToken, ClearScope, Config, FastEmbedProvider, IndexStats,
    RankOptions, SearchOptions, SeeklyError, Session, discover, embed, extract, run_interactive,
};
use tracing_subscriber::EnvFilter;

use crate::render::{Renderer, format_size};

#[derive(Parser)]
#[command(name = "seekly")]
#[command(about = "Search a directory with natural language", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Search query (when no subcommand is given)
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for files matching a query; without a query, start an interactive session
    Search(SearchArgs),

    /// Remove cached embeddings and/or the downloaded model
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .args(["all", "embeddings", "model"])
    ))]
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Clear embeddings and the model cache
        #[arg(long)]
        all: bool,

        /// Clear cached embeddings
        #[arg(long)]
        embeddings: bool,

        /// Clear the downloaded model
        #[arg(long)]
        model: bool,

        /// Only clear the embeddings cached for this directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Show cache locations, configuration and cached directories
    Info {
        /// Only show the namespace for this directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Open the best match for a query in an editor
    Open {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,

        /// Directory to search (default: current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Editor to launch (default: $VISUAL, $EDITOR, vi)
        #[arg(short, long)]
        editor: Option<String>,
    },

    /// List the file extensions that are indexed
    List {
        /// Group extensions by chunking strategy
        #[arg(short, long)]
        group: bool,
    },
}

#[derive(Args, Default)]
struct SearchArgs {
    /// Search query
    query: Vec<String>,

    /// Directory to search (default: current directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Maximum number of results
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Minimum similarity (0..1) for a file to be shown
    #[arg(short, long, value_parser = parse_similarity)]
    similarity: Option<f32>,

    /// Show the matching snippet under each result
    #[arg(long, overrides_with = "no_snippets")]
    snippets: bool,

    /// Only show paths and scores
    #[arg(long, overrides_with = "snippets")]
    no_snippets: bool,

    /// Show every result above the similarity floor
    #[arg(short, long, overrides_with = "limit")]
    all: bool,

    /// Cap results at --top-k (default)
    #[arg(long, overrides_with = "all")]
    limit: bool,
}

fn parse_similarity(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not within 0..1"))
    }
}

/// `RUST_LOG` wins when set and valid; otherwise `-v` picks the level.
fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Some(Commands::Search(args)) => cmd_search(args)?,
        Some(Commands::Clear {
            yes,
            all,
            embeddings,
            model,
            dir,
        }) => cmd_clear(yes, all, embeddings, model, dir)?,
        Some(Commands::Info { dir }) => cmd_info(dir)?,
        Some(Commands::Open { query, dir, editor }) => cmd_open(&query.join(" "), dir, editor)?,
        Some(Commands::List { group }) => cmd_list(group),
        None => {
            // Default: search with the provided query
            if cli.query.is_empty() {
                println!("Usage: seekly <query> or seekly <command>");
                println!("Run 'seekly --help' for more information.");
            } else {
                cmd_search(SearchArgs {
                    query: cli.query,
                    ..SearchArgs::default()
                })?;
            }
        }
    }

    Ok(())
}

/// Cache layout plus the user's config file, if any.
fn load_context() -> Result<(CacheLayout, Config)> {
    let layout = CacheLayout::discover()?;
    let config_path = layout.config_path();
    let config = Config::load(&config_path)
        .with_context(|| format!("Invalid config file {}", config_path.display()))?;
    Ok((layout, config))
}

fn resolve_root(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Cannot determine current directory"),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_callback(pb: &ProgressBar) -> ProgressCallback {
    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("█▓░"))
        .ok();
    Box::new({
        let pb = pb.clone();
        move |event: ProgressEvent<'_>| match event {
            ProgressEvent::Scanning { count } => {
                pb.set_message(format!("Scanning... {} files found", count));
            }
            ProgressEvent::Indexing {
                current,
                total,
                path,
            } => {
                if pb.length() != Some(total as u64) {
                    if let Some(style) = &bar_style {
                        pb.set_style(style.clone());
                    }
                    pb.set_length(total as u64);
                }
                pb.set_position(current as u64);
                pb.set_message(path.to_string_lossy().to_string());
            }
            ProgressEvent::Embedding { path, chunks } => {
                pb.set_message(format!("Embedding {} chunks of {}", chunks, path.display()));
            }
        }
    })
}

/// Load the model and open a session over `root`, indexing with a progress bar.
fn open_session(
    layout: &CacheLayout,
    config: Config,
    root: &Path,
) -> Result<Session<FastEmbedProvider>> {
    let interactive = io::stderr().is_terminal();
    let pb = if interactive {
        spinner("Loading embedding model...")
    } else {
        ProgressBar::hidden()
    };

    let provider = FastEmbedProvider::load(&config.model, &layout.models_dir(), interactive)?;
    let cache = CacheStore::new(layout.index_dir());
    let mut session = Session::open(root, config, &cache, provider)?;
    session.set_progress_callback(progress_callback(&pb));

    pb.set_message("Scanning files...");
    let stats = session.index()?;
    pb.finish_and_clear();
    report_stats(&stats);

    Ok(session)
}

fn report_stats(stats: &IndexStats) {
    tracing::info!(
        "{} files: {} embedded, {} cached, {} unembeddable, {} skipped, {} removed",
        stats.files_scanned,
        stats.files_embedded,
        stats.files_cached,
        stats.files_unembeddable,
        stats.files_skipped,
        stats.files_removed
    );
}

fn cmd_search(args: SearchArgs) -> Result<()> {
    let (layout, mut config) = load_context()?;
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    if let Some(similarity) = args.similarity {
        config.similarity = similarity;
    }
    let snippets = if args.no_snippets {
        false
    } else {
        args.snippets || config.snippets
    };
    let options = SearchOptions {
        top_k: config.top_k,
        similarity: config.similarity,
        show_all: args.all,
    };

    let interactive = args.query.is_empty();
    let query = args.query.join(" ");
    if !interactive && query.trim().is_empty() {
        return Err(SeeklyError::EmptyQuery.into());
    }

    let root = resolve_root(args.dir)?;
    let mut session = open_session(&layout, config, &root)?;
    let renderer = Renderer::new(session.root(), snippets, io::stdout().is_terminal());

    if interactive {
        return run_repl(&mut session, &options, &renderer);
    }

    let results = session.query(&query, &options.rank_options())?;
    let mut stdout = io::stdout().lock();
    renderer.print_results(&mut stdout, &query, &results)?;
    stdout.flush()?;
    session.close();

    Ok(())
}

fn run_repl(
    session: &mut Session<FastEmbedProvider>,
    options: &SearchOptions,
    renderer: &Renderer,
) -> Result<()> {
    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone())?;

    eprintln!(
        "Searching {} ({} files). Type a query, ':refresh' to re-index, 'exit' to quit.",
        session.root().display(),
        session.corpus().len()
    );

    let summary = run_interactive(
        session,
        io::stdin().lock(),
        io::stdout().lock(),
        options,
        &cancel,
        |out, query, results| renderer.print_results(out, query, results),
    )?;
    tracing::debug!(
        "Interactive session ended after {} queries, {} refreshes",
        summary.queries,
        summary.refreshes
    );

    Ok(())
}

/// Ctrl-C at the prompt exits at once; during a query it stops the loop
/// at the next prompt, and a second Ctrl-C exits.
fn install_interrupt_handler(cancel: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal handler")?;

    std::thread::spawn(move || {
        runtime.block_on(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                if cancel.is_waiting_for_input() || cancel.is_cancelled() {
                    eprintln!();
                    std::process::exit(130);
                }
                cancel.cancel();
                eprintln!("\nInterrupted: exiting after the current query");
            }
        });
    });

    Ok(())
}

fn cmd_clear(
    yes: bool,
    all: bool,
    embeddings: bool,
    model: bool,
    dir: Option<PathBuf>,
) -> Result<()> {
    let layout = CacheLayout::discover()?;
    let cache = CacheStore::new(layout.index_dir());

    let clear_embeddings = all || embeddings;
    // The model cache is shared by every directory
    let clear_model = model || (all && dir.is_none());
    let root = dir.map(|d| d.canonicalize().unwrap_or(d));

    let mut targets = Vec::new();
    if clear_embeddings {
        match &root {
            Some(root) => targets.push(format!("cached embeddings for {}", root.display())),
            None => targets.push(format!(
                "all cached embeddings ({})",
                layout.index_dir().display()
            )),
        }
    }
    if clear_model {
        targets.push(format!(
            "the embedding model cache ({})",
            layout.models_dir().display()
        ));
    }
    if targets.is_empty() {
        println!("Nothing to clear.");
        return Ok(());
    }

    if !yes && !confirm(&format!("Remove {}?", targets.join(" and ")))? {
        println!("Aborted.");
        return Ok(());
    }

    if clear_embeddings {
        let scope = match &root {
            Some(root) => ClearScope::Namespace(root),
            None => ClearScope::All,
        };
        let removed = cache.clear(scope)?;
        println!("✓ Removed {} cached namespace(s)", removed);
    }
    if clear_model {
        if discover::remove_dir_if_exists(&layout.models_dir())? {
            println!("✓ Removed the model cache");
        } else {
            println!("Model cache was already empty");
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn cmd_info(dir: Option<PathBuf>) -> Result<()> {
    let (layout, config) = load_context()?;
    let cache = CacheStore::new(layout.index_dir());

    println!("Cache root: {}", layout.root().display());
    println!();
    println!("Configuration:");
    let config_path = layout.config_path();
    if config_path.exists() {
        println!("  File: {}", config_path.display());
    } else {
        println!("  File: {} (not present, using defaults)", config_path.display());
    }
    println!("  Model: {}", config.model);
    println!("  Top k: {}", config.top_k);
    println!("  Similarity: {}", config.similarity);
    println!("  Max file size: {} bytes", config.max_file_size);
    println!("  Workers: {}", config.worker_count());
    println!();

    let status = embed::model_cache_status(&layout.models_dir());
    println!("Model cache: {}", status.dir.display());
    if status.present {
        println!("  Downloaded, {}", format_size(status.size_bytes));
    } else {
        println!("  Not downloaded yet");
    }
    println!();

    let wanted = dir
        .map(|d| d.canonicalize().unwrap_or(d))
        .map(|root| CacheStore::namespace_id(&root));
    let namespaces: Vec<_> = cache
        .list_namespaces()?
        .into_iter()
        .filter(|ns| wanted.as_ref().is_none_or(|id| *id == ns.id))
        .collect();

    println!("Cached directories: {}", namespaces.len());
    for ns in namespaces {
        let root = ns
            .root
            .as_ref()
            .map(|r| r.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        println!("  {} [{}]", root, ns.id);
        match (&ns.model, ns.dimension) {
            (Some(model), Some(dimension)) => println!("    Model: {} ({}d)", model, dimension),
            _ => println!("    Model: <unreadable manifest>"),
        }
        println!("    Entries: {}", ns.entries);
        println!("    Size: {}", format_size(ns.size_bytes));
    }

    Ok(())
}

fn cmd_open(query: &str, dir: Option<PathBuf>, editor: Option<String>) -> Result<()> {
    if query.trim().is_empty() {
        return Err(SeeklyError::EmptyQuery.into());
    }
    let (layout, config) = load_context()?;
    let similarity = config.similarity;
    let root = resolve_root(dir)?;
    let mut session = open_session(&layout, config, &root)?;

    let results = session.query(
        query,
        &RankOptions {
            min_similarity: similarity,
            limit: Some(1),
        },
    )?;
    session.close();

    let Some(top) = results.first() else {
        println!("No results found for: {}", query);
        return Ok(());
    };

    let editor = editor::resolve(editor.as_deref());
    println!(
        "Opening {}:{} ({:.3}) with {}",
        top.path.display(),
        top.start_line,
        top.score,
        editor
    );
    let status = editor::command(&editor, &top.path, top.start_line)?
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", editor))?;
    if !status.success() {
        bail!("Editor '{}' exited with {}", editor, status);
    }

    Ok(())
}

fn cmd_list(group: bool) {
    if group {
        for (family, extensions) in extract::supported_extensions() {
            println!("{}:", family.name());
            println!("  {}", extensions.join(" "));
        }
        return;
    }

    let mut all: Vec<&str> = extract::supported_extensions()
        .iter()
        .flat_map(|(_, exts)| exts.iter().copied())
        .collect();
    all.sort_unstable();
    all.dedup();
    for ext in all {
        println!("{}", ext);
    }
}
