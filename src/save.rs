use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::Builder;
use time::OffsetDateTime;
use time::macros::format_description;

const TEMP_PREFIX: &str = ".todotxtfmt-";

/// Replaces `path` with `data` so readers see either the old or the new file.
///
/// `perms_from` supplies permission bits when `path` does not exist yet.
pub fn write_atomic(path: &Path, data: &[u8], perms_from: Option<&Path>) -> Result<()> {
    write_atomic_with(path, data, perms_from, |_| Ok(()))
}

fn write_atomic_with<F>(
    path: &Path,
    data: &[u8],
    perms_from: Option<&Path>,
    before_commit: F,
) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let dir = parent_dir(path);
    fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;

    // Dropping `temp` on any early return removes the file.
    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    temp.write_all(data)
        .with_context(|| format!("writing temp file {}", temp.path().display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temp file {}", temp.path().display()))?;

    let perms_source = if path.exists() { Some(path) } else { perms_from };
    if let Some(source) = perms_source {
        if let Ok(meta) = fs::metadata(source) {
            fs::set_permissions(temp.path(), meta.permissions())
                .with_context(|| format!("copying permissions from {}", source.display()))?;
        }
    }

    before_commit(temp.path())?;

    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing {}", path.display()))?;

    #[cfg(unix)]
    {
        if let Err(err) = fs::File::open(dir).and_then(|parent| parent.sync_all()) {
            tracing::warn!("could not sync directory {}: {err}", dir.display());
        }
    }

    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Copies `path` into `backup_dir` (or next to `path` when `backup_dir` is
/// empty) as `name.YYYYMMDD-HHMMSS.bak`.
pub fn create_backup(path: &Path, backup_dir: &Path) -> Result<PathBuf> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    create_backup_at(path, backup_dir, now)
}

fn create_backup_at(path: &Path, backup_dir: &Path, now: OffsetDateTime) -> Result<PathBuf> {
    let dir = if backup_dir.as_os_str().is_empty() {
        parent_dir(path)
    } else {
        backup_dir
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("creating backup directory {}", dir.display()))?;

    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("cannot derive a backup name from {}", path.display());
    };
    let stamp = now
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("formatting backup timestamp")?;

    // name.STAMP.bak, then name.STAMP.bak1, name.STAMP.bak2, ...
    let base = format!("{name}.{stamp}.bak");
    let candidate = std::iter::once(dir.join(&base))
        .chain((1..=u16::MAX).map(|n| dir.join(format!("{base}{n}"))))
        .find(|candidate| !candidate.exists())
        .with_context(|| format!("no free backup name for {base} in {}", dir.display()))?;

    // fs::copy carries the permission bits over.
    fs::copy(path, &candidate)
        .with_context(|| format!("creating backup {}", candidate.display()))?;
    Ok(candidate)
}
