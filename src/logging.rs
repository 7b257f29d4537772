use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

const MAX_ENTRIES: usize = 500;

/// Routes diagnostics to stderr. `RUST_LOG` overrides the level picked from
/// the flags.
pub fn init(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[derive(Debug, Serialize)]
pub struct ChangeLogEntry<'a> {
    pub timestamp: &'a str,
    pub input: &'a Path,
    pub output: &'a Path,
    pub action: &'a str,
    pub changed_lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<&'a Path>,
}

/// Appends one JSON line describing a run to `log_path`.
pub fn record_run(
    log_path: &Path,
    input: &Path,
    output: &Path,
    action: &str,
    changed_lines: usize,
    backup: Option<&Path>,
) -> Result<()> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = ChangeLogEntry {
        timestamp: &timestamp,
        input,
        output,
        action,
        changed_lines,
        backup,
    };
    let json = serde_json::to_string(&entry)?;

    if let Some(dir) = log_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    writeln!(file, "{json}")?;
    truncate_log(log_path)?;
    Ok(())
}

fn truncate_log(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let excess = text.lines().count().saturating_sub(MAX_ENTRIES);
    if excess == 0 {
        return Ok(());
    }
    let kept: String = text.lines().skip(excess).flat_map(|line| [line, "\n"]).collect();
    fs::write(path, kept).with_context(|| format!("trimming {}", path.display()))?;
    Ok(())
}
