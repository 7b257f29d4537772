use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::ValueEnum;
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

pub fn print_diff(label: &str, original: &[String], formatted: &[String], colorize: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_diff(&mut out, label, original, formatted, colorize).context("writing diff")?;
    out.flush().context("flushing diff")
}

/// Writes `-old`/`+new` pairs for every index where the two sides differ.
pub fn write_diff<W: Write>(
    out: &mut W,
    label: &str,
    original: &[String],
    formatted: &[String],
    colorize: bool,
) -> io::Result<()> {
    writeln!(out, "--- {label}")?;
    writeln!(out, "+++ {label} (formatted)")?;

    let count = original.len().max(formatted.len());
    for idx in 0..count {
        let old = original.get(idx).map(String::as_str);
        let new = formatted.get(idx).map(String::as_str);
        if old == new {
            continue;
        }
        writeln!(out, "@@ line {} @@", idx + 1)?;
        match (old, new, colorize) {
            (Some(old), Some(new), true) => write_word_pair(out, old, new)?,
            _ => {
                if let Some(old) = old {
                    write_side(out, '-', old, colorize)?;
                }
                if let Some(new) = new {
                    write_side(out, '+', new, colorize)?;
                }
            }
        }
    }

    Ok(())
}

fn write_side<W: Write>(out: &mut W, sign: char, text: &str, colorize: bool) -> io::Result<()> {
    if colorize {
        let color = if sign == '-' { RED } else { GREEN };
        writeln!(out, "{color}{sign}{text}{RESET}")
    } else {
        writeln!(out, "{sign}{text}")
    }
}

fn write_word_pair<W: Write>(out: &mut W, old: &str, new: &str) -> io::Result<()> {
    let diff = TextDiff::from_words(old, new);

    write!(out, "{RED}-")?;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => write!(out, "{}", change.value())?,
            ChangeTag::Delete => write!(out, "{BOLD}{}{RESET}{RED}", change.value())?,
            ChangeTag::Insert => {}
        }
    }
    writeln!(out, "{RESET}")?;

    write!(out, "{GREEN}+")?;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => write!(out, "{}", change.value())?,
            ChangeTag::Insert => write!(out, "{BOLD}{}{RESET}{GREEN}", change.value())?,
            ChangeTag::Delete => {}
        }
    }
    writeln!(out, "{RESET}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(original: &[&str], formatted: &[&str], colorize: bool) -> String {
        let original: Vec<String> = original.iter().map(|s| (*s).to_owned()).collect();
        let formatted: Vec<String> = formatted.iter().map(|s| (*s).to_owned()).collect();
        let mut buf = Vec::new();
        write_diff(&mut buf, "todo.txt", &original, &formatted, colorize).expect("diff");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn only_differing_lines_are_listed() {
        let out = render(
            &["# keep", "Fix    bug", "Call mom"],
            &["# keep", "Fix bug", "Call mom"],
            false,
        );
        assert_eq!(
            out,
            "--- todo.txt\n+++ todo.txt (formatted)\n@@ line 2 @@\n-Fix    bug\n+Fix bug\n"
        );
    }

    #[test]
    fn identical_sides_print_only_the_header() {
        let out = render(&["a"], &["a"], false);
        assert_eq!(out, "--- todo.txt\n+++ todo.txt (formatted)\n");
    }

    #[test]
    fn colored_pairs_reconstruct_both_sides() {
        let out = render(&["Plan @b @a"], &["Plan @a @b"], true);
        let plain = out
            .replace(RED, "")
            .replace(GREEN, "")
            .replace(BOLD, "")
            .replace(RESET, "");
        assert!(plain.contains("\n-Plan @b @a\n"));
        assert!(plain.contains("\n+Plan @a @b\n"));
        assert!(out.contains(BOLD));
    }
}
