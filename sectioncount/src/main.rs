//! # sectioncount
//!
//! A CLI tool for word and character counts per markdown section.
//!
//! ## Overview
//!
//! sectioncount is built on top of sectioncountlib and exposes its engine from
//! the command line: per-heading and per-list annotations for a document,
//! status totals for files and directories, and incremental replay of edit
//! transactions.
//!
//! ## Features
//!
//! - **Section counts**: `self / total` words or characters per heading
//! - **List blocks**: Character counts for top-level list items with children
//! - **Comment stripping**: Leave `%% %%` and `<!-- -->` out of the counts
//! - **Frontmatter**: Status totals of markdown files skip the YAML header
//! - **Multiple output formats**: Terminal, text, and JSON via `--output`
//! - **Replay**: Apply recorded edits incrementally and verify against a full rescan
//!
//! ## Usage
//!
//! ```bash
//! # Word counts per section
//! sectioncount sections notes.md
//!
//! # Character counts, list blocks included, comments stripped
//! sectioncount sections notes.md --mode characters --lists --count-comments
//!
//! # Status totals for every markdown file in a vault
//! sectioncount count ~/vault --exclude "**/templates/**"
//!
//! # Totals of lines 10 to 20 only
//! sectioncount count notes.md --lines 10:20
//!
//! # Replay edits and check the incremental result
//! sectioncount replay notes.md edits.json --verify
//! ```
//!
//! ## Logging
//!
//! Diagnostics go to stderr. Set `SECTIONCOUNT_LOG` (e.g. `debug`) to see
//! splices, rescans, and discarded background replies.

mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use outstanding::cli::{App, CommandContext, HandlerResult, Output, RunResult};
use sectioncountlib::{
    discover_files, is_markdown, strip_front_matter, BackgroundCounter, CountTable, Document,
    Edit, EditorHooks, FilterConfig, MarkdownSpans, RecordingSink, SectionCountDisplayMode,
    SectionCountEngine, Settings, StatusTotals, StatusTracker,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Longest wait for one background count
const COUNT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the log filter
const LOG_ENV: &str = "SECTIONCOUNT_LOG";

/// Arguments shared by commands that run the section engine
fn engine_args() -> Vec<Arg> {
    vec![
        Arg::new("mode")
            .short('m')
            .long("mode")
            .value_parser(["words", "characters", "chars", "disabled"])
            .help("What the annotations count (defaults to words)"),
        Arg::new("lists")
            .short('l')
            .long("lists")
            .action(ArgAction::SetTrue)
            .help("Show character counts for top-level list blocks (characters mode)"),
        Arg::new("count-comments")
            .long("count-comments")
            .action(ArgAction::SetTrue)
            .help("Leave comments out of the counts"),
        Arg::new("config")
            .long("config")
            .value_name("FILE")
            .help("Load settings from a JSON file"),
    ]
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("sectioncount")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Arthur Debert")
        .about("Word and character counts per markdown section")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("sections")
                .about("Show per-section counts for a document")
                .arg(Arg::new("file").required(true).help("Markdown file"))
                .args(engine_args())
                .arg(
                    Arg::new("from-line")
                        .long("from-line")
                        .value_name("N")
                        .value_parser(clap::value_parser!(usize))
                        .help("First visible line (1-based); earlier lines are not reported"),
                ),
        )
        .subcommand(
            Command::new("count")
                .about("Show word, character, and page totals")
                .arg(
                    Arg::new("path")
                        .help("File or directory to count")
                        .default_value("."),
                )
                .arg(
                    Arg::new("include")
                        .short('i')
                        .long("include")
                        .action(ArgAction::Append)
                        .help("Include files matching glob pattern"),
                )
                .arg(
                    Arg::new("exclude")
                        .short('e')
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Exclude files matching glob pattern"),
                )
                .arg(
                    Arg::new("lines")
                        .long("lines")
                        .value_name("A:B")
                        .help("Count only lines A to B (1-based, inclusive) of a single file"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_name("FILE")
                        .help("Load settings from a JSON file"),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Apply recorded edit transactions incrementally")
                .arg(Arg::new("file").required(true).help("Markdown file"))
                .arg(
                    Arg::new("edits")
                        .required(true)
                        .help("JSON file with a list of transactions, each a list of edits"),
                )
                .args(engine_args())
                .arg(
                    Arg::new("verify")
                        .long("verify")
                        .action(ArgAction::SetTrue)
                        .help("Compare every step against a full rescan"),
                ),
        )
}

/// Install the stderr log subscriber
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build settings from `--config` and the engine flags
fn build_settings(matches: &ArgMatches) -> anyhow::Result<Settings> {
    let mut settings = match matches.get_one::<String>("config") {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::new().mode(SectionCountDisplayMode::Words),
    };

    if let Some(mode) = matches.get_one::<String>("mode") {
        settings = settings.mode(mode.parse().map_err(anyhow::Error::msg)?);
    }
    if matches.get_flag("lists") {
        settings = settings.list_counts(true);
    }
    if matches.get_flag("count-comments") {
        settings = settings.count_comments(true);
    }
    Ok(settings)
}

/// Build filter config from matches
fn build_filter(matches: &ArgMatches) -> anyhow::Result<FilterConfig> {
    let mut filter = FilterConfig::new();

    if let Some(includes) = matches.get_many::<String>("include") {
        for pattern in includes {
            filter = filter.include(pattern)?;
        }
    }

    if let Some(excludes) = matches.get_many::<String>("exclude") {
        for pattern in excludes {
            filter = filter.exclude(pattern)?;
        }
    }

    Ok(filter)
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Document::from_text(text))
}

/// Parse `A:B` into a 0-based, end-exclusive line range.
fn parse_line_range(value: &str) -> anyhow::Result<std::ops::Range<usize>> {
    let Some((start, end)) = value.split_once(':') else {
        bail!("invalid line range '{value}', expected A:B");
    };
    let start: usize = start
        .trim()
        .parse()
        .with_context(|| format!("invalid start line in '{value}'"))?;
    let end: usize = end
        .trim()
        .parse()
        .with_context(|| format!("invalid end line in '{value}'"))?;
    if start == 0 || end < start {
        bail!("invalid line range '{value}', lines are 1-based and A <= B");
    }
    Ok(start - 1..end)
}

#[derive(Debug, Serialize)]
struct SectionsReport<'a> {
    file: String,
    settings: &'a Settings,
    annotations: &'a [sectioncountlib::Annotation],
    sections: Vec<sectioncountlib::SectionCount>,
    lists: Vec<sectioncountlib::ListCount>,
}

/// Handler for the sections command
fn sections_handler(matches: &ArgMatches, ctx: &CommandContext) -> HandlerResult<serde_json::Value> {
    let file = PathBuf::from(
        matches
            .get_one::<String>("file")
            .context("missing file argument")?,
    );
    let settings = build_settings(matches)?;
    let doc = read_document(&file)?;
    let spans = MarkdownSpans::parse(&doc);

    let mut engine = SectionCountEngine::new(settings, &doc, &spans);
    engine.finish_rescan(&doc, &spans);
    let first = matches
        .get_one::<usize>("from-line")
        .map(|n| n.saturating_sub(1))
        .unwrap_or(0);
    engine.on_viewport_change(first..doc.line_count());

    let mut sink = RecordingSink::new();
    engine.render(&doc, &spans, &mut sink);

    // For JSON mode, return raw data
    if ctx.output_mode.is_structured() {
        let lines = first.min(doc.line_count())..doc.line_count();
        let report = SectionsReport {
            file: file.to_string_lossy().to_string(),
            settings: engine.settings(),
            annotations: engine.annotations(),
            sections: engine.sections(&doc, &spans, lines.clone()),
            lists: engine.lists(&doc, &spans, lines),
        };
        return Ok(Output::Render(serde_json::to_value(&report)?));
    }

    let context = render::sections_context(engine.annotations(), &doc);
    Ok(Output::Render(serde_json::to_value(&context)?))
}

/// Count one text through the background counter.
fn count_in_background(
    tracker: &mut StatusTracker,
    backend: &mut BackgroundCounter,
    text: &str,
) -> anyhow::Result<StatusTotals> {
    tracker.update_text(text, Instant::now(), &mut |_: StatusTotals| {});
    tracker.flush_now(backend)?;
    if !tracker.wait(backend, COUNT_TIMEOUT, &mut |_: StatusTotals| {}) {
        bail!("background word count did not answer");
    }
    Ok(tracker.totals())
}

/// Text a status total is computed from: markdown files lose their frontmatter.
fn status_text(path: &Path) -> anyhow::Result<String> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if is_markdown(path) {
        Ok(strip_front_matter(&raw)?.to_string())
    } else {
        Ok(raw)
    }
}

/// Handler for the count command
fn count_handler(matches: &ArgMatches, ctx: &CommandContext) -> HandlerResult<serde_json::Value> {
    let path = matches
        .get_one::<String>("path")
        .map(|s| s.as_str())
        .unwrap_or(".");
    let settings = match matches.get_one::<String>("config") {
        Some(config) => Settings::from_json_file(config)?,
        None => Settings::new(),
    };

    if let Some(range_arg) = matches.get_one::<String>("lines") {
        let file = Path::new(path);
        if !file.is_file() {
            bail!("--lines needs a single file, got {path}");
        }
        let range = parse_line_range(range_arg)?;
        let doc = read_document(file)?;
        let end = range.end.min(doc.line_count());
        let selected = doc
            .lines()
            .skip(range.start)
            .take(end.saturating_sub(range.start))
            .collect::<Vec<_>>()
            .join("\n");

        let tracker = StatusTracker::from_settings(&settings);
        let totals = tracker.selection(&selected, &mut |_: StatusTotals| {})?;
        let context = render::selection_context(path, range_arg, totals, settings.page_words);

        // The selection line is the raw data too
        return Ok(Output::Render(if ctx.output_mode.is_structured() {
            serde_json::to_value(context.selection())?
        } else {
            serde_json::to_value(&context)?
        }));
    }

    let filter = build_filter(matches)?;
    let files = discover_files(path, &filter)?;
    let base = if Path::new(path).is_dir() {
        PathBuf::from(path)
    } else {
        PathBuf::new()
    };

    let mut backend = BackgroundCounter::spawn()?;
    let mut tracker = StatusTracker::from_settings(&settings);
    let mut items = Vec::with_capacity(files.len());
    for file in &files {
        let text = status_text(file)?;
        let totals = count_in_background(&mut tracker, &mut backend, &text)?;
        tracing::debug!(file = %file.display(), words = totals.words, "counted");
        items.push((render::make_relative(file, &base), totals));
    }

    let table = CountTable::from_totals(&items, settings.page_words);

    // For JSON mode, return raw data
    if ctx.output_mode.is_structured() {
        return Ok(Output::Render(serde_json::to_value(&table)?));
    }

    Ok(Output::Render(serde_json::to_value(render::count_context(
        &table,
    ))?))
}

#[derive(Debug, Serialize)]
struct ReplayStep {
    step: usize,
    annotations: Vec<sectioncountlib::Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified: Option<bool>,
}

/// Handler for the replay command
///
/// With `--verify`, a step whose incremental state differs from a full
/// rescan fails the command.
fn replay_handler(matches: &ArgMatches, ctx: &CommandContext) -> HandlerResult<serde_json::Value> {
    let file = PathBuf::from(
        matches
            .get_one::<String>("file")
            .context("missing file argument")?,
    );
    let edits_path = PathBuf::from(
        matches
            .get_one::<String>("edits")
            .context("missing edits argument")?,
    );
    let verify = matches.get_flag("verify");
    let settings = build_settings(matches)?;

    let edits_json = fs::read_to_string(&edits_path)
        .with_context(|| format!("failed to read {}", edits_path.display()))?;
    let transactions: Vec<Vec<Edit>> = serde_json::from_str(&edits_json)
        .with_context(|| format!("invalid edits in {}", edits_path.display()))?;

    let mut doc = read_document(&file)?;
    let mut spans = MarkdownSpans::parse(&doc);
    let mut engine = SectionCountEngine::new(settings.clone(), &doc, &spans);
    engine.finish_rescan(&doc, &spans);

    let mut steps = Vec::with_capacity(transactions.len());
    let mut contexts = Vec::with_capacity(transactions.len());
    let mut mismatches = Vec::new();
    for (index, transaction) in transactions.iter().enumerate() {
        let step = index + 1;
        let splices = doc
            .apply(transaction)
            .with_context(|| format!("transaction {step} does not apply"))?;
        spans = MarkdownSpans::parse(&doc);
        engine.on_edit(&doc, &splices, &spans);
        engine.on_viewport_change(0..doc.line_count());
        engine.finish_rescan(&doc, &spans);

        let mut sink = RecordingSink::new();
        engine.render(&doc, &spans, &mut sink);

        let verified = verify.then(|| {
            let mut fresh = SectionCountEngine::new(settings.clone(), &doc, &spans);
            fresh.finish_rescan(&doc, &spans);
            fresh.cache() == engine.cache()
                && fresh.annotate(&doc, &spans) == engine.annotate(&doc, &spans)
        });
        if verified == Some(false) {
            tracing::error!(step, "incremental state differs from full rescan");
            mismatches.push(step.to_string());
        }

        let status = match verified {
            Some(true) => " (verified)",
            Some(false) => " (MISMATCH)",
            None => "",
        };
        contexts.push(render::replay_step(
            format!("after transaction {step}{status}"),
            engine.annotations(),
            &doc,
        ));
        steps.push(ReplayStep {
            step,
            annotations: engine.annotations().to_vec(),
            verified,
        });
    }

    if !mismatches.is_empty() {
        bail!(
            "incremental result differs from a full rescan after transaction {}",
            mismatches.join(", ")
        );
    }

    // For JSON mode, return raw data
    if ctx.output_mode.is_structured() {
        return Ok(Output::Render(serde_json::to_value(&steps)?));
    }

    Ok(Output::Render(serde_json::to_value(render::ReplayContext {
        steps: contexts,
    })?))
}

fn main() -> ExitCode {
    init_logging();
    let cmd = build_command();
    let theme = render::create_theme();

    // Build the outstanding app with command handlers and run
    let result = App::builder()
        .theme(theme)
        .command("sections", sections_handler, render::SECTIONS_TEMPLATE)
        .command("count", count_handler, render::COUNT_TEMPLATE)
        .command("replay", replay_handler, render::REPLAY_TEMPLATE)
        .run_to_string(cmd, std::env::args());

    match result {
        RunResult::Handled(output) => {
            if output.starts_with("Error:") {
                eprintln!("{}", output.trim_end());
                return ExitCode::FAILURE;
            }
            print!("{}", output);
            ExitCode::SUCCESS
        }
        RunResult::Binary(_, _) => {
            // Not used in sectioncount
            ExitCode::SUCCESS
        }
        RunResult::NoMatch(_) => {
            eprintln!("{}", build_command().render_help());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_range() {
        assert_eq!(parse_line_range("1:3").unwrap(), 0..3);
        assert_eq!(parse_line_range("5:5").unwrap(), 4..5);
        assert!(parse_line_range("0:3").is_err());
        assert!(parse_line_range("4:2").is_err());
        assert!(parse_line_range("abc").is_err());
    }

    #[test]
    fn test_command_is_valid() {
        build_command().debug_assert();
    }

    #[test]
    fn test_build_settings_flags_override() {
        let matches = build_command()
            .try_get_matches_from([
                "sectioncount",
                "sections",
                "a.md",
                "--mode",
                "chars",
                "--lists",
                "--count-comments",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let settings = build_settings(sub).unwrap();
        assert_eq!(
            settings.section_count_display_mode,
            SectionCountDisplayMode::Characters
        );
        assert!(settings.lists_active());
        assert!(settings.count_comments);
    }
}
