use std::convert::Infallible;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueHint};

mod classify;
mod commands;
mod config;
mod diff;
mod encoding;
mod files;
mod format;
mod logging;
mod normalize;
mod save;
mod todo;
mod transform;

use commands::{FormatRequest, RunStatus, run_format};
use config::{FileConfig, load_config};
use diff::ColorChoice;
use encoding::EolPolicy;
use format::{FormattingOptions, SortMode};

/// Format todo.txt files in place.
///
/// Exit status: 0 when the file was written or needed nothing, 2 for a dry
/// run that found changes, 1 on any error.
#[derive(Debug, Parser)]
#[command(name = "todotxtfmt", version, about)]
struct Cli {
    /// File to format (defaults to $TODO_FILE, $DONE_FILE, then ~/todo.txt and friends).
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath, conflicts_with = "input")]
    file: Option<PathBuf>,
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
    /// Write here instead of over the input.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
    /// Report what would change without writing; exits 2 if anything would.
    #[arg(short = 'n', long, action = ArgAction::SetTrue)]
    dry_run: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    diff: bool,
    /// Back up the file before rewriting it, optionally into DIR (--backup=DIR).
    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "",
        value_parser = parse_backup_dir
    )]
    backup: Option<PathBuf>,
    #[arg(long = "keep-eol", value_enum, value_name = "STYLE")]
    keep_eol: Option<EolPolicy>,
    /// Sort @contexts and +projects.
    #[arg(long = "sort-tags", value_enum, value_name = "MODE")]
    sort_tags: Option<SortMode>,
    /// Sort key:value metadata.
    #[arg(long = "sort-meta", value_enum, value_name = "MODE")]
    sort_meta: Option<SortMode>,
    #[arg(long, value_enum, value_name = "WHEN")]
    color: Option<ColorChoice>,
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,
    /// YAML (or .json) file with default settings.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    /// Append a JSON line per run to this file.
    #[arg(long = "log-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    log_file: Option<PathBuf>,
}

// The stock PathBuf parser refuses the empty value a bare `--backup` stands for.
fn parse_backup_dir(value: &str) -> Result<PathBuf, Infallible> {
    Ok(PathBuf::from(value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<RunStatus> {
    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let verbose = !cli.quiet && (cli.verbose || file_config.verbose.unwrap_or(false));
    logging::init(verbose, cli.quiet);

    let input = files::resolve_input(cli.input.as_deref().or(cli.file.as_deref()))?;
    let request = build_request(cli, file_config, input, verbose);
    tracing::info!(
        input = %request.input.display(),
        dry_run = request.dry_run,
        sort_tags = ?request.options.sort_tags,
        sort_meta = ?request.options.sort_meta,
        eol = ?request.eol,
        "formatting"
    );
    run_format(&request)
}

fn build_request(cli: Cli, file: FileConfig, input: PathBuf, verbose: bool) -> FormatRequest {
    let color = cli.color.or(file.color).unwrap_or_default();
    FormatRequest {
        input,
        output: cli.output,
        eol: cli.keep_eol.or(file.keep_eol).unwrap_or_default(),
        options: FormattingOptions {
            sort_tags: cli.sort_tags.or(file.sort_tags).unwrap_or_default(),
            sort_meta: cli.sort_meta.or(file.sort_meta).unwrap_or_default(),
            verbose,
        },
        dry_run: cli.dry_run,
        diff: cli.diff || file.diff.unwrap_or(false),
        colorize: color.should_color(),
        backup: cli.backup.or(file.backup),
        log_file: cli.log_file.or(file.log_file),
    }
}
