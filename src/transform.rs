use crate::classify::{ClassifiedLine, LineKind, classify};
use crate::format::{FormattingOptions, format_task};
use crate::todo::TaskSyntax;

/// One line before and after formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    pub number: usize,
    pub kind: LineKind,
    pub original: String,
    pub formatted: String,
}

impl LineChange {
    /// Only task lines can change; everything else is copied through.
    pub fn changed(&self) -> bool {
        self.kind == LineKind::Task && self.original != self.formatted
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub lines: Vec<LineChange>,
}

impl ChangeSet {
    pub fn any_changed(&self) -> bool {
        self.lines.iter().any(LineChange::changed)
    }

    pub fn changed(&self) -> impl Iterator<Item = &LineChange> {
        self.lines.iter().filter(|line| line.changed())
    }

    pub fn original_lines(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.original.clone()).collect()
    }

    pub fn formatted_lines(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.formatted.clone()).collect()
    }
}

pub fn format_lines<S: TaskSyntax>(
    syntax: &S,
    lines: &[String],
    opts: &FormattingOptions,
) -> ChangeSet {
    let lines = lines
        .iter()
        .enumerate()
        .map(|(idx, original)| {
            let classified = classify(syntax, original);
            let kind = classified.kind();
            let formatted = match classified {
                ClassifiedLine::Task(task) => format_task(syntax, &task, opts),
                ClassifiedLine::Raw(err) => {
                    tracing::info!(line = idx + 1, %err, "left unparsed line as-is");
                    original.clone()
                }
                ClassifiedLine::Blank | ClassifiedLine::Comment => original.clone(),
            };
            let change = LineChange {
                number: idx + 1,
                kind,
                original: original.clone(),
                formatted,
            };
            if opts.verbose && change.changed() {
                tracing::info!(
                    line = change.number,
                    before = %change.original,
                    after = %change.formatted,
                    "line changed"
                );
            }
            change
        })
        .collect();

    ChangeSet { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SortMode;
    use crate::todo::TodoTxt;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|line| (*line).to_owned()).collect()
    }

    #[test]
    fn blank_comment_and_raw_lines_pass_through() {
        let input = lines(&["", "   ", "#  spaced   comment", "2025-02-31 bad   date", "ok"]);
        let opts = FormattingOptions {
            sort_tags: SortMode::Alpha,
            sort_meta: SortMode::Alpha,
            verbose: true,
        };
        let set = format_lines(&TodoTxt, &input, &opts);
        assert_eq!(set.formatted_lines(), input);
        assert!(!set.any_changed());
    }

    #[test]
    fn one_changed_task_marks_the_file() {
        let input = lines(&["# header", "Buy   milk", "Call mom"]);
        let set = format_lines(&TodoTxt, &input, &FormattingOptions::default());
        assert!(set.any_changed());
        let changed: Vec<_> = set.changed().map(|line| line.number).collect();
        assert_eq!(changed, vec![2]);
        assert_eq!(set.formatted_lines()[1], "Buy milk");
    }

    #[test]
    fn indented_task_counts_as_changed() {
        let input = lines(&["  Call mom"]);
        let set = format_lines(&TodoTxt, &input, &FormattingOptions::default());
        assert!(set.any_changed());
        assert_eq!(set.formatted_lines(), vec!["Call mom"]);
    }

    #[test]
    fn second_pass_finds_nothing() {
        let input = lines(&["x  2025-01-02 Done @b @a due:2025/01/01", "", "# c", "(B) Plan +q"]);
        let opts = FormattingOptions {
            sort_tags: SortMode::Alpha,
            ..FormattingOptions::default()
        };
        let first = format_lines(&TodoTxt, &input, &opts);
        assert!(first.any_changed());
        let second = format_lines(&TodoTxt, &first.formatted_lines(), &opts);
        assert!(!second.any_changed());
    }
}
