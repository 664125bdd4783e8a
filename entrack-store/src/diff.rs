use crate::models::UpdateRecord;
use similar::{ChangeTag, TextDiff};

/// Unchanged lines kept around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Line diff between the old and new value of one recorded update, grouped
/// into hunks.
#[derive(Debug, Clone)]
pub struct ValueDiff {
    pub label: String,
    pub hunks: Vec<DiffHunk>,
}

#[derive(Debug, Clone)]
pub struct DiffHunk {
    /// 1-based first line of the hunk in the old value.
    pub old_start: usize,
    pub old_len: usize,
    /// 1-based first line of the hunk in the new value.
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub content: String,
    pub old_line_number: Option<usize>,
    pub new_line_number: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineType {
    Context,
    Addition,
    Deletion,
}

impl DiffLineType {
    pub fn prefix(&self) -> &'static str {
        match self {
            DiffLineType::Addition => "+",
            DiffLineType::Deletion => "-",
            DiffLineType::Context => " ",
        }
    }
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_len, self.new_start, self.new_len
        )
    }
}

impl ValueDiff {
    pub fn from_update(update: &UpdateRecord) -> Self {
        Self::with_context(update, CONTEXT_LINES)
    }

    pub fn with_context(update: &UpdateRecord, context_lines: usize) -> Self {
        ValueDiff {
            label: format!("{}.{} ({})", update.class, update.property, update.entity_id),
            hunks: compute_hunks(&update.old_value, &update.new_value, context_lines),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.hunks.is_empty()
    }

    pub fn format_unified(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("--- {}\n", self.label));
        output.push_str(&format!("+++ {}\n", self.label));

        for hunk in &self.hunks {
            output.push_str(&hunk.header());
            output.push('\n');
            for line in &hunk.lines {
                output.push_str(line.line_type.prefix());
                output.push_str(&line.content);
            }
        }

        output
    }
}

fn compute_hunks(old_text: &str, new_text: &str, context_lines: usize) -> Vec<DiffHunk> {
    let old_text = with_trailing_newline(old_text);
    let new_text = with_trailing_newline(new_text);
    let diff = TextDiff::from_lines(old_text.as_str(), new_text.as_str());

    let mut hunks = Vec::new();
    for group in diff.grouped_ops(context_lines) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let lines = group
            .iter()
            .flat_map(|op| diff.iter_changes(op))
            .map(|change| DiffLine {
                line_type: match change.tag() {
                    ChangeTag::Delete => DiffLineType::Deletion,
                    ChangeTag::Insert => DiffLineType::Addition,
                    ChangeTag::Equal => DiffLineType::Context,
                },
                content: change.to_string(),
                old_line_number: change.old_index().map(|i| i + 1),
                new_line_number: change.new_index().map(|i| i + 1),
            })
            .collect();

        hunks.push(DiffHunk {
            old_start: old_range.start + 1,
            old_len: old_range.len(),
            new_start: new_range.start + 1,
            new_len: new_range.len(),
            lines,
        });
    }

    hunks
}

fn with_trailing_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpdateKind;
    use uuid::Uuid;

    fn update(old_value: &str, new_value: &str) -> UpdateRecord {
        UpdateRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Playlist",
            "tracks",
            UpdateKind::Forced,
        )
        .with_values(old_value.to_string(), new_value.to_string())
    }

    #[test]
    fn test_insertion_is_numbered_in_new_value() {
        let diff = ValueDiff::from_update(&update(
            "[\n    \"a\",\n    \"b\",\n]",
            "[\n    \"a\",\n    \"c\",\n    \"b\",\n]",
        ));

        assert_eq!(diff.hunks.len(), 1);
        let hunk = &diff.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_len), (1, 4));
        assert_eq!((hunk.new_start, hunk.new_len), (1, 5));

        let added: Vec<_> = hunk
            .lines
            .iter()
            .filter(|l| l.line_type == DiffLineType::Addition)
            .collect();
        assert_eq!(added.len(), 1);
        assert!(added[0].content.contains("\"c\""));
        assert_eq!(added[0].old_line_number, None);
        assert_eq!(added[0].new_line_number, Some(3));
        assert!(!hunk
            .lines
            .iter()
            .any(|l| l.line_type == DiffLineType::Deletion));
    }

    #[test]
    fn test_format_unified_has_hunk_header() {
        let diff = ValueDiff::from_update(&update("[\n    1,\n]", "[\n    2,\n]"));

        assert!(diff.label.starts_with("Playlist.tracks"));
        assert!(diff.has_changes());

        let unified = diff.format_unified();
        assert!(unified.contains("@@ -1,3 +1,3 @@\n"));
        assert!(unified.contains("-    1,\n"));
        assert!(unified.contains("+    2,\n"));
    }

    #[test]
    fn test_distant_changes_get_separate_hunks() {
        let old: Vec<String> = (1..=20).map(|i| format!("{},", i)).collect();
        let mut new = old.clone();
        new[1] = "two,".to_string();
        new[18] = "nineteen,".to_string();

        let diff = ValueDiff::with_context(&update(&old.join("\n"), &new.join("\n")), 1);

        assert_eq!(diff.hunks.len(), 2);
        assert_eq!(diff.hunks[0].old_start, 1);
        assert_eq!(diff.hunks[1].old_start, 18);
        assert_eq!(diff.hunks[1].header(), "@@ -18,3 +18,3 @@");
    }

    #[test]
    fn test_identical_values_have_no_changes() {
        let diff = ValueDiff::from_update(&update("5", "5"));

        assert!(!diff.has_changes());
        assert!(diff.hunks.is_empty());
        assert_eq!(diff.format_unified().lines().count(), 2);
    }
}
