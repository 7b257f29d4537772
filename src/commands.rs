use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::diff::print_diff;
use crate::encoding::EolPolicy;
use crate::files::FileImage;
use crate::format::FormattingOptions;
use crate::logging::record_run;
use crate::save::{create_backup, write_atomic};
use crate::todo::TodoTxt;
use crate::transform::format_lines;

#[derive(Debug, Clone)]
pub struct FormatRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub eol: EolPolicy,
    pub options: FormattingOptions,
    pub dry_run: bool,
    pub diff: bool,
    pub colorize: bool,
    /// `None` disables backups; an empty path means "next to the file".
    pub backup: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Unchanged,
    Written,
    WouldChange,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Unchanged | RunStatus::Written => 0,
            RunStatus::WouldChange => 2,
        }
    }
}

pub fn run_format(req: &FormatRequest) -> Result<RunStatus> {
    let image = FileImage::read(&req.input, req.eol)?;
    tracing::info!(
        path = %req.input.display(),
        lines = image.lines.len(),
        eol = %image.eol,
        bom = image.has_bom,
        "loaded"
    );

    let changes = format_lines(&TodoTxt, &image.lines, &req.options);
    let output = req.output.clone().unwrap_or_else(|| req.input.clone());
    let changed_lines = changes.changed().count();

    if !changes.any_changed() {
        tracing::info!(path = %req.input.display(), "no changes needed");
        journal(req, &output, "unchanged", 0, None);
        return Ok(RunStatus::Unchanged);
    }
    tracing::info!(path = %req.input.display(), changed_lines, "changes detected");

    if req.diff {
        let label = req.input.display().to_string();
        print_diff(
            &label,
            &changes.original_lines(),
            &changes.formatted_lines(),
            req.colorize,
        )?;
    }

    if req.dry_run {
        journal(req, &output, "dry-run", changed_lines, None);
        return Ok(RunStatus::WouldChange);
    }

    let backup = match &req.backup {
        Some(dir) => backup_destination(&output, dir)?,
        None => None,
    };

    let data = image.encode(&changes.formatted_lines());
    write_atomic(&output, &data, Some(&req.input))
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(path = %output.display(), "updated");

    journal(req, &output, "written", changed_lines, backup.as_deref());
    Ok(RunStatus::Written)
}

fn backup_destination(output: &Path, dir: &Path) -> Result<Option<PathBuf>> {
    if !output.exists() {
        tracing::info!(path = %output.display(), "nothing to back up yet");
        return Ok(None);
    }
    let backup = create_backup(output, dir)
        .with_context(|| format!("backing up {}; file left untouched", output.display()))?;
    tracing::info!(backup = %backup.display(), "backup created");
    Ok(Some(backup))
}

fn journal(req: &FormatRequest, output: &Path, action: &str, changed: usize, backup: Option<&Path>) {
    let Some(log_file) = &req.log_file else {
        return;
    };
    if let Err(err) = record_run(log_file, &req.input, output, action, changed, backup) {
        tracing::warn!("could not update change log {}: {err:#}", log_file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SortMode;
    use std::fs;
    use tempfile::tempdir;

    fn request(input: &Path) -> FormatRequest {
        FormatRequest {
            input: input.to_path_buf(),
            output: None,
            eol: EolPolicy::Auto,
            options: FormattingOptions::default(),
            dry_run: false,
            diff: false,
            colorize: false,
            backup: None,
            log_file: None,
        }
    }

    #[test]
    fn rewrites_only_task_lines_and_keeps_shape() {
        let temp = tempdir().expect("temp dir");
        let input = temp.path().join("todo.txt");
        fs::write(
            &input,
            b"\xEF\xBB\xBF# list\r\n\r\nFix    bug   @work\r\n  \r\n2025-02-31 bad   date",
        )
        .expect("seed");

        let status = run_format(&request(&input)).expect("runs");
        assert_eq!(status, RunStatus::Written);
        assert_eq!(
            fs::read(&input).expect("read"),
            b"\xEF\xBB\xBF# list\r\n\r\nFix bug @work\r\n  \r\n2025-02-31 bad   date".to_vec()
        );
    }

    #[test]
    fn clean_file_is_not_touched() {
        let temp = tempdir().expect("temp dir");
        let input = temp.path().join("todo.txt");
        let bytes = b"(A) Call mom @phone\n# comment\n\nPay rent due:2025-02-01\n";
        fs::write(&input, bytes).expect("seed");

        let mut req = request(&input);
        req.backup = Some(PathBuf::new());
        assert_eq!(run_format(&req).expect("runs"), RunStatus::Unchanged);
        assert_eq!(fs::read(&input).expect("read"), bytes.to_vec());
        assert_eq!(fs::read_dir(temp.path()).expect("dir").count(), 1);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let temp = tempdir().expect("temp dir");
        let input = temp.path().join("todo.txt");
        fs::write(&input, "Fix    bug\n").expect("seed");
        let log = temp.path().join("runs.jsonl");

        let mut req = request(&input);
        req.dry_run = true;
        req.backup = Some(PathBuf::new());
        req.log_file = Some(log.clone());
        let status = run_format(&req).expect("runs");

        assert_eq!(status, RunStatus::WouldChange);
        assert_eq!(status.exit_code(), 2);
        assert_eq!(fs::read_to_string(&input).expect("read"), "Fix    bug\n");
        assert!(fs::read_to_string(&log).expect("log").contains("\"dry-run\""));
        assert_eq!(fs::read_dir(temp.path()).expect("dir").count(), 2);
    }

    #[test]
    fn backup_precedes_rewrite() {
        let temp = tempdir().expect("temp dir");
        let input = temp.path().join("todo.txt");
        fs::write(&input, "Fix    bug\n").expect("seed");
        let backups = temp.path().join("bak");

        let mut req = request(&input);
        req.backup = Some(backups.clone());
        run_format(&req).expect("runs");

        let saved: Vec<_> = fs::read_dir(&backups)
            .expect("backup dir")
            .map(|entry| entry.expect("entry").path())
            .collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("todo.txt.") && name.ends_with(".bak"));
        assert_eq!(fs::read_to_string(&saved[0]).expect("backup"), "Fix    bug\n");
        assert_eq!(fs::read_to_string(&input).expect("read"), "Fix bug\n");
    }

    #[test]
    fn failed_backup_aborts_the_write() {
        let temp = tempdir().expect("temp dir");
        let input = temp.path().join("todo.txt");
        fs::write(&input, "Fix    bug\n").expect("seed");
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "").expect("seed blocker");

        let mut req = request(&input);
        req.backup = Some(blocker.join("backups"));
        let err = run_format(&req).unwrap_err();

        assert!(format!("{err:#}").contains("file left untouched"));
        assert_eq!(fs::read_to_string(&input).expect("read"), "Fix    bug\n");
        let mut names: Vec<String> = fs::read_dir(temp.path())
            .expect("dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["not-a-dir", "todo.txt"]);
    }

    #[test]
    fn separate_output_leaves_input_alone() {
        let temp = tempdir().expect("temp dir");
        let input = temp.path().join("todo.txt");
        fs::write(&input, "Plan  @b  @a\n").expect("seed");
        let output = temp.path().join("out").join("sorted.txt");

        let mut req = request(&input);
        req.output = Some(output.clone());
        req.eol = EolPolicy::Crlf;
        req.options.sort_tags = SortMode::Alpha;
        assert_eq!(run_format(&req).expect("runs"), RunStatus::Written);

        assert_eq!(fs::read_to_string(&input).expect("input"), "Plan  @b  @a\n");
        assert_eq!(fs::read_to_string(&output).expect("output"), "Plan @a @b\r\n");
    }

    #[test]
    fn missing_input_is_an_error() {
        let temp = tempdir().expect("temp dir");
        let err = run_format(&request(&temp.path().join("absent.txt"))).unwrap_err();
        assert!(format!("{err:#}").contains("absent.txt"));
    }
}
