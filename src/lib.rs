pub mod config;
pub mod fix;
pub mod lint;
pub mod mapping;
pub mod resolver;
pub mod rule;
pub mod scanner;
pub mod tokenizer;

use crate::config::{ConfigError, Preset, RuleOptions, Severity};
use crate::lint::{LintError, LintedFile, lint_file};
use crate::rule::{RULE_ID, Rule};
use crate::scanner::{ScanError, build_globset, collect_files, is_supported};
use clap::{Args, Parser, Subcommand};
use globset::GlobSet;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Parser)]
#[command(name = "darkpair", version)]
#[command(about = "Enforce paired dark mode classes for Tailwind CSS")]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Check files for light classes without a dark variant
    Lint {
        #[command(flatten)]
        target: TargetArgs,
        /// Rewrite files until every fixable violation is corrected
        #[arg(long)]
        fix: bool,
    },
    /// Lint once, then again whenever a matching file changes
    Watch {
        #[command(flatten)]
        target: TargetArgs,
        /// Use a polling watcher instead of native file events
        #[arg(long)]
        poll: bool,
        /// Polling interval in milliseconds (implies --poll)
        #[arg(long = "poll-interval")]
        poll_interval_ms: Option<u64>,
    },
    /// Check a single class list and print the corrected string
    Check {
        #[command(flatten)]
        options: OptionArgs,
        /// Class list, e.g. "text-neutral-900 bg-white"
        class_list: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct OptionArgs {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Preset used when the configuration does not name one
    #[arg(long, default_value = "recommended")]
    pub preset: Preset,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct TargetArgs {
    #[command(flatten)]
    pub options: OptionArgs,
    /// Glob to skip (repeatable)
    #[arg(long = "ignore", short = 'I')]
    pub ignore: Vec<String>,
    /// Paths or glob patterns to lint
    #[arg(required = true)]
    pub inputs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Lint(#[from] LintError),
    #[error("failed to start watcher: {0}")]
    Watch(#[from] notify::Error),
    #[error("found {0} dark mode violation(s)")]
    ViolationsFound(usize),
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Lint { target, fix } => run_lint(&target, fix),
        Command::Watch {
            target,
            poll,
            poll_interval_ms,
        } => run_watch(
            &target,
            poll || poll_interval_ms.is_some(),
            poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        ),
        Command::Check {
            options,
            class_list,
        } => run_check(&options, &class_list),
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    run(Cli::parse().command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let argv = std::iter::once("darkpair".to_string()).chain(args);
    Ok(Cli::try_parse_from(argv)?.command)
}

/// Resolves rule options from `--config` and `--preset`.
pub fn load_options(args: &OptionArgs) -> Result<RuleOptions, CliError> {
    match &args.config {
        Some(path) => {
            let config = config::load(path)?;
            Ok(config::resolve_options(&config, args.preset))
        }
        None => Ok(RuleOptions::preset(args.preset)),
    }
}

fn run_lint(target: &TargetArgs, fix: bool) -> Result<(), CliError> {
    let options = load_options(&target.options)?;
    let rule = Rule::new(&options);
    let errors = lint_targets(target, &rule, fix)?;

    if errors > 0 {
        return Err(CliError::ViolationsFound(errors));
    }
    Ok(())
}

/// Lints every matching file, prints its diagnostics and returns the number
/// of error-severity violations left.
fn lint_targets(target: &TargetArgs, rule: &Rule<'_>, fix: bool) -> Result<usize, CliError> {
    let files = collect_files(Path::new("."), &target.inputs, &target.ignore)?;
    let mut errors = 0;
    let mut reported = 0;
    let mut fixed_files = 0;

    for path in &files {
        let linted = lint_file(path, rule, fix)?;
        print_file(&linted);
        errors += linted.error_count();
        reported += linted.diagnostics.len();
        if linted.fix_passes > 0 {
            fixed_files += 1;
        }
    }

    if fix {
        eprintln!(
            "checked {} files, fixed {} files, {} problems remaining",
            files.len(),
            fixed_files,
            reported
        );
    } else {
        eprintln!("checked {} files, found {} problems", files.len(), reported);
    }

    Ok(errors)
}

fn print_file(linted: &LintedFile) {
    let display_path = linted.path.strip_prefix(".").unwrap_or(&linted.path);
    for item in &linted.diagnostics {
        let severity = if item.diagnostic.is_advisory() {
            Severity::Warn
        } else {
            item.diagnostic.severity
        };
        println!(
            "{}:{}:{}: {}: {} [{}]",
            display_path.display(),
            item.location.line,
            item.location.column,
            severity,
            item.diagnostic,
            RULE_ID
        );
    }
}

fn run_check(args: &OptionArgs, class_list: &str) -> Result<(), CliError> {
    let options = load_options(args)?;
    let outcome = Rule::new(&options).analyze(class_list);

    for report in &outcome.reports {
        let violation = &report.violation;
        match &violation.actual {
            Some(actual) => println!(
                "{}: mismatched, expected \"{}\" but found \"{}\"",
                violation.class_name, violation.expected, actual
            ),
            None => println!(
                "{}: missing, expected \"{}\"",
                violation.class_name, violation.expected
            ),
        }
    }

    if outcome.reports.is_empty() {
        return Ok(());
    }
    println!("{}", outcome.corrected);
    Err(CliError::ViolationsFound(outcome.reports.len()))
}

fn run_watch(target: &TargetArgs, poll: bool, poll_interval_ms: u64) -> Result<(), CliError> {
    let options = load_options(&target.options)?;
    let rule = Rule::new(&options);
    if let Err(err) = lint_targets(target, &rule, false) {
        warn!(error = %err, "initial lint failed");
    }

    let (tx, rx) = channel();
    let ignore_set = build_globset(&target.ignore).ok();
    let mut watcher: Box<dyn notify::Watcher> = if poll {
        Box::new(notify::PollWatcher::new(
            tx,
            notify::Config::default().with_poll_interval(Duration::from_millis(poll_interval_ms)),
        )?)
    } else {
        Box::new(notify::recommended_watcher(tx)?)
    };

    for root in watch_roots(&target.inputs) {
        watcher.watch(&root, notify::RecursiveMode::Recursive)?;
    }

    if poll {
        eprintln!("watching for changes (polling, press Ctrl+C to stop)...");
    } else {
        eprintln!("watching for changes (press Ctrl+C to stop)...");
    }

    let mut last_event = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Ok(event)) => {
                if !is_relevant_event(&event, ignore_set.as_ref()) {
                    continue;
                }
                if last_event.elapsed() < Duration::from_millis(200) {
                    continue;
                }
                last_event = Instant::now();
                info!(paths = event.paths.len(), "change detected");
                eprintln!("change detected, linting...");
                if let Err(err) = lint_targets(target, &rule, false) {
                    eprintln!("lint failed: {}", err);
                }
            }
            Ok(Err(err)) => warn!(error = %err, "watch error"),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

fn is_relevant_event(event: &notify::Event, ignore_set: Option<&GlobSet>) -> bool {
    event.paths.iter().any(|path| {
        is_supported(path) && !ignore_set.is_some_and(|set| set.is_match(path))
    })
}

fn watch_roots(patterns: &[String]) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let root = glob_root(pattern);
        let normalized = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        if seen.insert(normalized.clone()) {
            roots.push(normalized);
        }
    }

    roots
}

fn glob_root(pattern: &str) -> PathBuf {
    let Some(first_meta) = pattern.find(['*', '?', '[', '{']) else {
        if pattern.ends_with('/') || pattern.ends_with('\\') {
            return PathBuf::from(pattern);
        }
        let path = Path::new(pattern);
        if path.extension().is_some() {
            return path.parent().unwrap_or(Path::new(".")).to_path_buf();
        }
        return path.to_path_buf();
    };

    let prefix = &pattern[..first_meta];
    match prefix.rfind(['/', '\\']) {
        Some(idx) => PathBuf::from(&prefix[..=idx]),
        None => PathBuf::from("."),
    }
}
