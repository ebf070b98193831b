use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde::Serialize;
use std::io::{self, Write};
use std::process::exit;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use test_task::{run_raw_and_report, Builtin, RawArgument, SystemRunner, TaskError};

// Variant A defaults, applied only with --legacy
const LEGACY_COMMAND: &str = "bash";
const LEGACY_ARGUMENT: &str =
    r#"["-c", "uconv -x \"::Latin; ::Latin-ASCII;\" > orte_ansi.txt < orte.txt"]"#;

// Single-dash long flags from the older flag style
const LEGACY_FLAGS: [(&str, &str); 2] = [("-cmd", "--cmd"), ("-arg", "--arg")];

// CLI arguments parsing structure
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Run a single task exactly as the scheduler would and report its exit code",
    long_about = None
)]
pub struct Cli {
    /// Built-in task name or executable to run
    #[arg(short = 't', long = "taskname", visible_alias = "cmd", value_name = "NAME")]
    pub taskname: Option<String>,

    /// Argument for the task; a JSON array of strings expands into several
    #[arg(
        short = 'a',
        long = "argument",
        visible_alias = "arg",
        value_name = "VALUE",
        allow_hyphen_values = true
    )]
    pub arguments: Vec<String>,

    /// Fall back to the old defaults (bash with a sample uconv pipeline)
    #[arg(long)]
    pub legacy: bool,

    /// List built-in tasks and exit
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Output the built-in list in JSON format
    #[arg(short = 'j', long, requires = "list")]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

// Flags whose next token is a value and must reach clap untouched
const VALUE_FLAGS: [&str; 6] = ["-t", "--taskname", "--cmd", "-a", "--argument", "--arg"];

// Rewrite `-cmd x` / `-arg=x` into the double-dash spelling clap understands
pub fn normalize_legacy_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut normalized = Vec::new();
    let mut passthrough = false;
    let mut expects_value = false;

    for arg in args {
        if expects_value {
            expects_value = false;
            normalized.push(arg);
            continue;
        }

        if passthrough || arg == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let rewritten = LEGACY_FLAGS
            .iter()
            .find_map(|(old, new)| {
                if arg == *old {
                    Some((*new).to_string())
                } else {
                    arg.strip_prefix(old)
                        .and_then(|rest| rest.strip_prefix('='))
                        .map(|value| format!("{new}={value}"))
                }
            })
            .unwrap_or(arg);

        expects_value = VALUE_FLAGS.contains(&rewritten.as_str());
        normalized.push(rewritten);
    }

    normalized
}

// Immutable configuration built once from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub task_name: String,
    pub arguments: Vec<RawArgument>,
}

impl RunConfig {
    /// Build the run configuration from parsed flags, applying the legacy
    /// defaults when `--legacy` is set.
    ///
    /// Arguments are kept raw; decoding them is left to the task run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::EmptyTaskName`] if no task name was given and
    /// `--legacy` is off, or if the given name is blank.
    pub fn from_cli(cli: &Cli) -> Result<Self, TaskError> {
        let name = match (&cli.taskname, cli.legacy) {
            (Some(name), _) => name.trim(),
            (None, true) => LEGACY_COMMAND,
            (None, false) => return Err(TaskError::EmptyTaskName),
        };
        if name.is_empty() {
            return Err(TaskError::EmptyTaskName);
        }

        let arguments = if cli.arguments.is_empty() && cli.legacy {
            vec![RawArgument::Token(LEGACY_ARGUMENT.to_string())]
        } else {
            cli.arguments
                .iter()
                .cloned()
                .map(RawArgument::Token)
                .collect()
        };

        Ok(Self {
            task_name: name.to_string(),
            arguments,
        })
    }
}

// Structure for JSON output of the built-in list
#[derive(Serialize)]
struct BuiltinEntry {
    name: &'static str,
    description: &'static str,
}

// Execute the selected command
pub fn execute_command(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet);

    if cli.list {
        return cmd_list(cli.json);
    }

    let config = match RunConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            exit(2);
        }
    };

    cmd_run(&config)
}

fn cmd_run(config: &RunConfig) -> Result<()> {
    debug!(task = %config.task_name, "running task");
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Task failures are part of the report; only a broken stdout is fatal
    run_raw_and_report(&SystemRunner, &config.task_name, &config.arguments, &mut out)
        .context("failed to write task report")?;
    Ok(())
}

fn cmd_list(json_output: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json_output {
        let entries: Vec<BuiltinEntry> = Builtin::ALL
            .iter()
            .map(|builtin| BuiltinEntry {
                name: builtin.name(),
                description: builtin.description(),
            })
            .collect();

        let json = serde_json::to_string_pretty(&entries)
            .context("failed to serialize built-in list to JSON")?;
        writeln!(out, "{json}").context("failed to write built-in list")?;
        return Ok(());
    }

    // Find the longest name for alignment
    let max_name_length = Builtin::ALL
        .iter()
        .map(|builtin| builtin.name().len())
        .max()
        .unwrap_or(0);

    writeln!(out, "Built-in tasks:").context("failed to write built-in list")?;
    for builtin in Builtin::ALL {
        writeln!(
            out,
            "  {:<width$}  {}",
            builtin.name(),
            builtin.description(),
            width = max_name_length
        )
        .context("failed to write built-in list")?;
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    // Logs go to stderr so stdout stays the plain report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
