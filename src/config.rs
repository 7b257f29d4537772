use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::diff::ColorChoice;
use crate::encoding::EolPolicy;
use crate::format::SortMode;

/// Defaults read from `--config`; command-line flags take precedence.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub sort_tags: Option<SortMode>,
    pub sort_meta: Option<SortMode>,
    pub keep_eol: Option<EolPolicy>,
    pub diff: Option<bool>,
    pub backup: Option<PathBuf>,
    pub color: Option<ColorChoice>,
    pub verbose: Option<bool>,
    pub log_file: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed = if is_json {
        serde_json::from_slice(&data).map_err(anyhow::Error::from)
    } else if data.iter().all(u8::is_ascii_whitespace) {
        Ok(FileConfig::default())
    } else {
        serde_yaml::from_slice(&data).map_err(anyhow::Error::from)
    };
    parsed.with_context(|| format!("parsing config {}", path.display()))
}
