use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::encoding::{self, EolPolicy, LineEnding, UTF8_BOM};

/// One file's on-disk shape: its logical lines plus everything needed to put
/// them back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImage {
    pub lines: Vec<String>,
    pub eol: LineEnding,
    pub has_bom: bool,
    pub has_final_terminator: bool,
}

impl FileImage {
    pub fn read(path: &Path, policy: EolPolicy) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(&bytes, policy).with_context(|| format!("decoding {}", path.display()))
    }

    pub fn from_bytes(bytes: &[u8], policy: EolPolicy) -> Result<Self> {
        let decoded = encoding::decode(bytes)?;
        let text = decoded.text;
        let detected = LineEnding::detect(&text);
        let has_final_terminator = text.ends_with('\n');

        let mut lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
        if lines.last().is_some_and(|last| last.is_empty()) {
            lines.pop();
        }
        if detected == LineEnding::Crlf {
            for line in &mut lines {
                if line.ends_with('\r') {
                    line.pop();
                }
            }
        }

        Ok(Self {
            lines,
            eol: policy.resolve(detected),
            has_bom: decoded.had_bom,
            has_final_terminator,
        })
    }

    /// Reassembles `lines` using this image's BOM, terminator and
    /// final-terminator policy.
    pub fn encode(&self, lines: &[String]) -> Vec<u8> {
        let eol = self.eol.as_str();
        let body_len: usize = lines.iter().map(|line| line.len() + eol.len()).sum();
        let mut out = Vec::with_capacity(UTF8_BOM.len() + body_len);
        if self.has_bom {
            out.extend_from_slice(&UTF8_BOM);
        }
        for (idx, line) in lines.iter().enumerate() {
            out.extend_from_slice(line.as_bytes());
            if idx + 1 < lines.len() || self.has_final_terminator {
                out.extend_from_slice(eol.as_bytes());
            }
        }
        out
    }
}

const TODO_FILE_VARS: [&str; 2] = ["TODO_FILE", "DONE_FILE"];

/// Picks the file to format: an explicit path, then `$TODO_FILE`,
/// `$DONE_FILE`, then the usual todo.txt locations.
pub fn resolve_input(explicit: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("determining working directory")?;
    resolve_input_from(explicit, |name| std::env::var_os(name), &cwd)
}

fn resolve_input_from<F>(explicit: Option<&Path>, env: F, cwd: &Path) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    for var in TODO_FILE_VARS {
        if let Some(value) = env(var).filter(|value| !value.is_empty()) {
            tracing::debug!(var, "input taken from environment");
            return Ok(PathBuf::from(value));
        }
    }

    let mut candidates = Vec::new();
    if let Some(home) = env("HOME").filter(|home| !home.is_empty()) {
        let home = PathBuf::from(home);
        candidates.push(home.join("Documents").join("todo").join("todo.txt"));
        candidates.push(home.join("todo.txt"));
    }
    candidates.push(cwd.join("todo.txt"));

    if let Some(found) = candidates.into_iter().find(|path| path.is_file()) {
        return Ok(found);
    }

    bail!("no input file found; set TODO_FILE or pass a file");
}
