//! CLI definition and command dispatch for kindred.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (`--config`, `--verbose`, per-command `--limit`/`--threshold`)
//! 2. Environment variables (`KINDRED_CONFIG`, `KINDRED_VERBOSE`, `KINDRED_BACKEND_URL`)
//! 3. Config file (`~/.kindred/config.yaml` or path from `--config`/`KINDRED_CONFIG`)
//! 4. Built-in defaults

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::ui::{progress_visible, table, ColorMode, MessageType, Progress, Style};

use kindred_core::{
    BatchReport, Discovery, DiscoveryConfig, DiscoveryError, SearchRequest, Work, WorkId, WorkKind,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// kindred – find works similar to a piece of text
#[derive(Parser, Debug)]
#[command(name = "kindred")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "KINDRED_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "KINDRED_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.kindred/config.yaml)
    #[arg(long, global = true, env = "KINDRED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode
    #[arg(
        long,
        global = true,
        env = "KINDRED_COLOR",
        value_enum,
        default_value_t = ColorMode::Auto,
        ignore_case = true
    )]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find works similar to a piece of text
    #[command(after_help = r#"EXAMPLES:
    # Search with the configured defaults (10 results, similarity >= 0.7)
    kindred search "a lighthouse keeper who talks to ghosts"

    # Only webtoons, looser threshold
    kindred search "rooftop chase" --type webtoon --threshold 0.6

    # JSON for scripting
    kindred search "space opera" --limit 5 --json | jq '.results[].id'
"#)]
    Search {
        /// Free-text query
        query: String,

        /// Maximum number of results (default: search.limit, 10)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Minimum cosine similarity (default: search.threshold, 0.7)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Restrict results to one work type: novel, webtoon, video
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Recompute the embedding of one work
    #[command(after_help = r#"EXAMPLES:
    # After editing a work's title or description
    kindred reindex w-42

    # Prints true or false
    kindred reindex w-42 --json
"#)]
    Reindex {
        /// Work id
        id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Recompute embeddings for several works
    #[command(after_help = r#"EXAMPLES:
    # Ids on the command line
    kindred reindex-batch w-1 w-2 w-3

    # Ids from a file, one per line ('-' reads stdin)
    kindred reindex-batch --from-file ids.txt --json
"#)]
    ReindexBatch {
        /// Work ids
        ids: Vec<String>,

        /// Read additional ids from a file, one per line ('-' for stdin)
        #[arg(long, value_name = "PATH")]
        from_file: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Embed every work that has no embedding yet
    #[command(after_help = r#"EXAMPLES:
    # After importing works
    kindred import works.jsonl && kindred backfill
"#)]
    Backfill {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Insert or replace works from a JSON Lines file
    #[command(after_help = r#"EXAMPLES:
    # One work object per line
    kindred import works.jsonl

    # From stdin
    cat works.jsonl | kindred import -
"#)]
    Import {
        /// JSON Lines file of works ('-' for stdin)
        file: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the local LanceDB index from the work store
    #[cfg(feature = "lancedb")]
    SyncIndex {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings
    #[command(after_help = r#"EXAMPLES:
    kindred config check
    kindred config check --json
"#)]
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration (file merged with defaults)
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Parses command-line arguments, builds a [`Discovery`] engine and
/// dispatches to the command handler.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Always show warnings; debug only with --verbose. Logs go to stderr so
    // `--json` output stays parseable.
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = ["kindred_core", "kindred_db", "kindred_model", "kindred_cli"]
        .iter()
        .map(|target| format!("{}={}", target, log_level))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let style = Style::new(cli.color);

    // Config commands report load failures themselves.
    if matches!(cli.command, Command::Config { .. }) {
        return finish(&style, dispatch(&style, None, &cli));
    }

    let discovery = match DiscoveryConfig::load(cli.config.as_deref())
        .and_then(Discovery::from_config)
    {
        Ok(discovery) => discovery,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your config at ~/.kindred/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize kindred",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    finish(&style, dispatch(&style, Some(&discovery), &cli))
}

/// Dispatch to the command handler. `discovery` is `None` only for
/// commands that do not need an engine.
fn dispatch(style: &Style, discovery: Option<&Discovery>, cli: &Cli) -> anyhow::Result<()> {
    let engine = || discovery.ok_or_else(|| anyhow!("kindred is not initialized"));

    match &cli.command {
        Command::Search {
            query,
            limit,
            threshold,
            kind,
            json,
        } => handle_search(style, engine()?, query, *limit, *threshold, kind.as_deref(), *json),
        Command::Reindex { id, json } => handle_reindex(style, engine()?, id, *json),
        Command::ReindexBatch {
            ids,
            from_file,
            json,
        } => handle_reindex_batch(
            style,
            engine()?,
            ids.clone(),
            from_file.as_deref(),
            *json,
            cli.quiet,
        ),
        Command::Backfill { json } => handle_backfill(style, engine()?, *json, cli.quiet),
        Command::Import { file, json } => handle_import(style, engine()?, file, *json),
        #[cfg(feature = "lancedb")]
        Command::SyncIndex { json } => handle_sync_index(style, engine()?, *json, cli.quiet),
        Command::Config { action } => handle_config(style, cli.config.as_deref(), action),
    }
}

fn finish(style: &Style, result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Search
// ============================================================================

fn handle_search(
    style: &Style,
    discovery: &Discovery,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    kind: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let kind = kind
        .map(str::parse::<WorkKind>)
        .transpose()
        .map_err(|e| anyhow!("{}", e))?;

    if limit == Some(0) {
        bail!("--limit must be greater than 0");
    }
    if let Some(t) = threshold {
        if !(-1.0..=1.0).contains(&t) {
            bail!("--threshold must be between -1 and 1, got {}", t);
        }
    }

    let defaults = &discovery.config().search;
    let request = SearchRequest::new(query)
        .with_limit(limit.unwrap_or(defaults.limit))
        .with_threshold(threshold.unwrap_or(defaults.threshold))
        .with_kind(kind);
    let response = discovery.search_request(&request);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", style.section("SEARCH"));
    println!();
    println!("  {}", style.key_value("Query", &response.query));
    println!("  {}", style.key_value("Mode", response.mode.as_str()));
    println!();

    if !response.success {
        let reason = response.message.as_deref().unwrap_or("search unavailable");
        println!("{}", style.message(MessageType::Warn, reason));
    } else if response.results.is_empty() {
        println!(
            "{}",
            style.message(MessageType::Info, "No similar works found.")
        );
    } else {
        println!(
            "{}",
            table::render_results_table(&response.results, |s| style.score(s))
        );
    }
    Ok(())
}

// ============================================================================
// Maintenance
// ============================================================================

fn handle_reindex(
    style: &Style,
    discovery: &Discovery,
    id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let id = WorkId::from(id);
    let result = discovery.try_reindex(&id);

    if json {
        println!("{}", result.is_ok());
    } else if result.is_ok() {
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!("Reindexed {}", style.work_id(id.as_str()))
            )
        );
    }

    result.with_context(|| format!("Could not reindex {}", id))
}

fn handle_reindex_batch(
    style: &Style,
    discovery: &Discovery,
    mut ids: Vec<String>,
    from_file: Option<&Path>,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if let Some(path) = from_file {
        ids.extend(read_id_list(path)?);
    }
    if ids.is_empty() {
        bail!("No work ids given; pass ids or --from-file");
    }
    let ids: Vec<WorkId> = ids.into_iter().map(WorkId::from).collect();

    let progress = Progress::bar(
        ids.len() as u64,
        "Embedding works",
        progress_visible(quiet, json, style.color_mode()),
    );
    let report = discovery.reindex_batch_with(&ids, |id, _| {
        progress.set_message(id.as_str());
        progress.inc(1);
    });
    progress.finish_clear();

    print_batch_report(style, "Reindexed", &report, json)
}

fn handle_backfill(
    style: &Style,
    discovery: &Discovery,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let progress = Progress::bar(
        0,
        "Embedding works",
        progress_visible(quiet, json, style.color_mode()),
    );
    let report = discovery.backfill_with(|id, _, total| {
        progress.set_length(total as u64);
        progress.set_message(id.as_str());
        progress.inc(1);
    })?;
    progress.finish_clear();

    if report.total() == 0 && !json {
        println!(
            "{}",
            style.message(MessageType::Skip, "Every work already has an embedding")
        );
        return Ok(());
    }
    print_batch_report(style, "Embedded", &report, json)
}

fn print_batch_report(
    style: &Style,
    verb: &str,
    report: &BatchReport,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        let kind = if report.is_complete() {
            MessageType::Ok
        } else {
            MessageType::Warn
        };
        println!(
            "{}",
            style.message(
                kind,
                &format!("{} {} of {} works", verb, report.success_count, report.total())
            )
        );
        for id in &report.failed_ids {
            println!("{}", style.failed_work(id.as_str()));
        }
    }

    if !report.is_complete() {
        bail!("{} work(s) failed", report.failed_ids.len());
    }
    Ok(())
}

fn handle_import(
    style: &Style,
    discovery: &Discovery,
    file: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let works = read_works(file)?;
    let imported = discovery.import(&works)?;
    let missing = works.iter().filter(|w| w.embedding.is_none()).count();
    let hidden = works.iter().filter(|w| !w.is_visible()).count();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "imported": imported,
                "withoutEmbedding": missing,
                "hidden": hidden,
            }))?
        );
        return Ok(());
    }

    println!(
        "{}",
        style.message(MessageType::Ok, &format!("Imported {} works", imported))
    );
    if missing > 0 {
        println!(
            "{}",
            style.message(
                MessageType::Hint,
                &format!("{} without embeddings; run `kindred backfill`", missing)
            )
        );
    }
    if hidden > 0 {
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                &format!(
                    "{} not approved or blocked; they will not appear in search results",
                    hidden
                )
            )
        );
    }
    Ok(())
}

#[cfg(feature = "lancedb")]
fn handle_sync_index(
    style: &Style,
    discovery: &Discovery,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let progress = Progress::spinner(
        "Rebuilding LanceDB index...",
        progress_visible(quiet, json, style.color_mode()),
    );
    let result = discovery.sync_index();
    progress.finish_clear();
    let rows = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({ "rows": rows }))?);
    } else {
        println!(
            "{}",
            style.message(MessageType::Ok, &format!("Indexed {} works", rows))
        );
    }
    Ok(())
}

// ============================================================================
// Config
// ============================================================================

fn handle_config(
    style: &Style,
    explicit: Option<&Path>,
    action: &ConfigAction,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Check { json } => handle_config_check(style, explicit, *json),
        ConfigAction::Show { json } => handle_config_show(explicit, *json),
    }
}

/// Validate the config file and report errors/warnings.
fn handle_config_check(style: &Style, explicit: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(DiscoveryConfig::default_path);
    let exists = path.as_deref().is_some_and(Path::exists);

    let (warnings, errors) = match DiscoveryConfig::load(explicit) {
        Ok(config) => match config.validate() {
            Ok(warnings) => (warnings, Vec::new()),
            Err(e) => (Vec::new(), vec![e.to_string()]),
        },
        Err(e) => (Vec::new(), vec![e.to_string()]),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "path": path,
                "exists": exists,
                "valid": errors.is_empty(),
                "warnings": warnings,
                "errors": errors,
            }))?
        );
    } else {
        let location = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no home directory)".to_string());
        let status = if !exists {
            "-"
        } else if errors.is_empty() {
            "✓"
        } else {
            "✗"
        };
        println!("  {} config ({})", status, location);
        println!();

        if !warnings.is_empty() {
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    &format!("{} warning(s):", warnings.len())
                )
            );
            for warning in &warnings {
                println!("  • {}", warning);
            }
            println!();
        }

        if !errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Err, &format!("{} error(s):", errors.len()))
            );
            for error in &errors {
                println!("  • {}", error);
            }
            println!();
        }

        if errors.is_empty() && warnings.is_empty() {
            println!("{}", style.message(MessageType::Ok, "Configuration is valid"));
        } else if errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Ok, "Configuration is valid with warnings")
            );
        }
    }

    if !errors.is_empty() {
        return Err(DiscoveryError::invalid_configuration(
            format!("{} configuration error(s) found", errors.len()),
            "Run `kindred config check` for details",
        )
        .into());
    }
    Ok(())
}

/// Show the resolved configuration.
fn handle_config_show(explicit: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = DiscoveryConfig::load(explicit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}

// ============================================================================
// Input helpers
// ============================================================================

fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin()));
    }
    let file = fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    Ok(Box::new(file))
}

/// Read one id per line; blank lines and `#` comments are skipped.
fn read_id_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut ids = Vec::new();
    for line in BufReader::new(open_input(path)?).lines() {
        let line = line.with_context(|| format!("Cannot read {}", path.display()))?;
        let id = line.trim();
        if !id.is_empty() && !id.starts_with('#') {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Read works from JSON Lines; blank lines are skipped.
fn read_works(path: &Path) -> anyhow::Result<Vec<Work>> {
    let mut works = Vec::new();
    for (index, line) in BufReader::new(open_input(path)?).lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let work: Work = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid work", path.display(), index + 1))?;
        works.push(work);
    }
    Ok(works)
}
