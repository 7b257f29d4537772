use crate::todo::{ParseError, TaskSyntax};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    Task,
    Raw,
}

#[derive(Debug)]
pub enum ClassifiedLine<T> {
    Blank,
    Comment,
    Task(T),
    Raw(ParseError),
}

impl<T> ClassifiedLine<T> {
    pub fn kind(&self) -> LineKind {
        match self {
            ClassifiedLine::Blank => LineKind::Blank,
            ClassifiedLine::Comment => LineKind::Comment,
            ClassifiedLine::Task(_) => LineKind::Task,
            ClassifiedLine::Raw(_) => LineKind::Raw,
        }
    }
}

/// Classifies one logical line. Trimming only affects the decision; callers
/// keep the original text for anything that is not a task.
pub fn classify<S: TaskSyntax>(syntax: &S, line: &str) -> ClassifiedLine<S::Task> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ClassifiedLine::Blank;
    }
    if trimmed.starts_with('#') {
        return ClassifiedLine::Comment;
    }
    match syntax.parse(trimmed) {
        Ok(task) => ClassifiedLine::Task(task),
        Err(err) => ClassifiedLine::Raw(err),
    }
}
