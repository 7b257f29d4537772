use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::normalize::{collapse_whitespace, is_date_key, normalize_date_value};
use crate::todo::{TaskSyntax, TokenKind, split_metadata};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    None,
    #[value(alias = "alphabetical")]
    #[serde(alias = "alphabetical")]
    Alpha,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormattingOptions {
    pub sort_tags: SortMode,
    pub sort_meta: SortMode,
    pub verbose: bool,
}

pub fn format_task<S: TaskSyntax>(syntax: &S, task: &S::Task, opts: &FormattingOptions) -> String {
    let rendered = collapse_whitespace(&syntax.render(task));

    let mut head = Vec::new();
    let mut contexts = Vec::new();
    let mut projects = Vec::new();
    let mut metadata = Vec::new();
    let tokens: Vec<&str> = rendered.split(' ').filter(|tok| !tok.is_empty()).collect();
    // Tags the syntax rendered ahead of description words stay put; moving
    // them could turn a description word into a marker.
    let anchored = tokens
        .iter()
        .rposition(|tok| TokenKind::of(tok) == TokenKind::Text)
        .map_or(0, |idx| idx + 1);
    for (idx, &token) in tokens.iter().enumerate() {
        match TokenKind::of(token) {
            TokenKind::Metadata if idx < anchored => head.push(normalize_metadata(token)),
            _ if idx < anchored => head.push(token.to_owned()),
            TokenKind::Context => contexts.push(token.to_owned()),
            TokenKind::Project => projects.push(token.to_owned()),
            TokenKind::Metadata => metadata.push(normalize_metadata(token)),
            TokenKind::Text => head.push(token.to_owned()),
        }
    }

    apply_sort(&mut contexts, opts.sort_tags);
    apply_sort(&mut projects, opts.sort_tags);
    apply_sort(&mut metadata, opts.sort_meta);

    head.extend(contexts);
    head.extend(projects);
    head.extend(metadata);
    head.join(" ")
}

fn normalize_metadata(token: &str) -> String {
    let Some((key, value)) = split_metadata(token) else {
        return token.to_owned();
    };
    if !is_date_key(key) {
        return token.to_owned();
    }
    match normalize_date_value(value) {
        Some(date) => format!("{key}:{date}"),
        None => token.to_owned(),
    }
}

fn apply_sort(tokens: &mut Vec<String>, mode: SortMode) {
    if mode == SortMode::Alpha {
        tokens.sort();
        tokens.dedup();
    }
}
