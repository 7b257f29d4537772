//! todo.txt task syntax.
//!
//! The formatting pipeline only talks to [`TaskSyntax`]; [`TodoTxt`] is the
//! parser shipped with the tool.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use time::Date;
use time::macros::format_description;

static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date shape pattern compiles")
});

static PRIORITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([A-Z])\)$").expect("priority pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("no task text after markers")]
    Empty,
}

/// Parser/serializer capability consumed by the formatter.
pub trait TaskSyntax {
    type Task;

    fn parse(&self, line: &str) -> Result<Self::Task, ParseError>;

    fn render(&self, task: &Self::Task) -> String;
}

/// What a single rendered token means to the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Context,
    Project,
    Metadata,
    Text,
}

impl TokenKind {
    pub fn of(token: &str) -> Self {
        if token.len() > 1 && token.starts_with('@') {
            TokenKind::Context
        } else if token.len() > 1 && token.starts_with('+') {
            TokenKind::Project
        } else if split_metadata(token).is_some() {
            TokenKind::Metadata
        } else {
            TokenKind::Text
        }
    }
}

/// Splits `key:value`; URLs (`scheme://...`) are not metadata.
pub fn split_metadata(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once(':')?;
    if key.is_empty() || value.is_empty() || value.starts_with("//") {
        return None;
    }
    if key.chars().any(char::is_whitespace) || value.chars().any(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub completed: bool,
    pub completion_date: Option<Date>,
    pub priority: Option<char>,
    pub creation_date: Option<Date>,
    pub description: Vec<String>,
    pub contexts: Vec<String>,
    pub projects: Vec<String>,
    pub metadata: Vec<(String, String)>,
}

impl Task {
    fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.contexts.is_empty()
            && self.projects.is_empty()
            && self.metadata.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TodoTxt;

impl TaskSyntax for TodoTxt {
    type Task = Task;

    fn parse(&self, line: &str) -> Result<Task, ParseError> {
        let mut task = Task::default();
        let mut tokens = line.split_whitespace().peekable();

        if tokens.peek() == Some(&"x") {
            tokens.next();
            task.completed = true;
            if let Some(date) = tokens.next_if(|tok| DATE_SHAPE.is_match(tok)) {
                task.completion_date = Some(parse_iso_date(date)?);
            }
        }

        if let Some(tok) = tokens.next_if(|tok| PRIORITY.is_match(tok)) {
            task.priority = tok.chars().nth(1);
        }

        if let Some(date) = tokens.next_if(|tok| DATE_SHAPE.is_match(tok)) {
            task.creation_date = Some(parse_iso_date(date)?);
        }

        for tok in tokens {
            match TokenKind::of(tok) {
                TokenKind::Context => task.contexts.push(tok[1..].to_owned()),
                TokenKind::Project => task.projects.push(tok[1..].to_owned()),
                TokenKind::Metadata => {
                    if let Some((key, value)) = split_metadata(tok) {
                        task.metadata.push((key.to_owned(), value.to_owned()));
                    }
                }
                TokenKind::Text => task.description.push(tok.to_owned()),
            }
        }

        if task.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(task)
    }

    fn render(&self, task: &Task) -> String {
        let mut parts: Vec<String> = Vec::new();
        if task.completed {
            parts.push("x".to_owned());
            if let Some(date) = task.completion_date {
                parts.push(format_iso_date(date));
            }
        }
        if let Some(priority) = task.priority {
            parts.push(format!("({priority})"));
        }
        if let Some(date) = task.creation_date {
            parts.push(format_iso_date(date));
        }

        let mut tags: Vec<String> = task
            .contexts
            .iter()
            .map(|ctx| format!("@{ctx}"))
            .chain(task.projects.iter().map(|proj| format!("+{proj}")))
            .chain(
                task.metadata
                    .iter()
                    .map(|(key, value)| format!("{key}:{value}")),
            )
            .collect();
        // A first word that would read back as a marker needs a tag in front of it.
        let leads_with_marker = task
            .description
            .first()
            .is_some_and(|word| reads_as_marker(task, word));
        if leads_with_marker && !tags.is_empty() {
            parts.push(tags.remove(0));
        }

        parts.extend(task.description.iter().cloned());
        parts.extend(tags);
        parts.join(" ")
    }
}

/// Whether `word`, placed right after the markers `task` already has, would
/// be parsed as one more marker.
fn reads_as_marker(task: &Task, word: &str) -> bool {
    if task.creation_date.is_some() {
        return false;
    }
    if DATE_SHAPE.is_match(word) {
        return true;
    }
    if task.priority.is_some() {
        return false;
    }
    PRIORITY.is_match(word) || (word == "x" && !task.completed)
}

pub fn parse_iso_date(value: &str) -> Result<Date, ParseError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ParseError::InvalidDate(value.to_owned()))
}

pub fn format_iso_date(date: Date) -> String {
    let (year, month, day) = (date.year(), u8::from(date.month()), date.day());
    format!("{year:04}-{month:02}-{day:02}")
}
