//! Span-addressed text edits
//!
//! An [`Edit`] records the byte span and exact text it was computed from.
//! Applying it re-checks that text against the live content; an edit whose
//! span no longer holds the original text is reported stale, never
//! substituted somewhere else.

use serde::Serialize;
use std::ops::Range;

/// One replacement inside one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    /// Byte span of `original` in the content the edit was computed from
    pub span: Range<usize>,
    /// 1-based line of the span start
    pub line: usize,
    pub original: String,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Range<usize>, line: usize, original: &str, replacement: String) -> Self {
        Edit {
            span,
            line,
            original: original.to_string(),
            replacement,
        }
    }
}

/// Why an edit was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    /// The span no longer holds the original text
    Changed,
    /// The span overlaps an edit that was already applied
    Overlap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleEdit {
    /// Position of the edit in the slice given to [`apply_edits`]
    #[serde(skip)]
    pub index: usize,
    pub edit: Edit,
    pub reason: StaleReason,
}

/// Result of applying an edit set to one document's content.
#[derive(Debug, Clone)]
pub struct Applied {
    pub content: String,
    pub applied: usize,
    pub stale: Vec<StaleEdit>,
}

impl Applied {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Apply `edits` to `content`.
///
/// Edits are applied back to front so earlier spans keep their offsets.
pub fn apply_edits(content: &str, edits: &[Edit]) -> Applied {
    let mut ordered: Vec<(usize, &Edit)> = edits.iter().enumerate().collect();
    ordered.sort_by(|(_, a), (_, b)| {
        b.span.start.cmp(&a.span.start).then(b.span.end.cmp(&a.span.end))
    });

    let mut out = content.to_string();
    // start of the last applied edit
    let mut limit: Option<usize> = None;
    let mut applied = 0;
    let mut stale = Vec::new();

    for (index, edit) in ordered {
        let reason = if limit.is_some_and(|limit| edit.span.end > limit) {
            Some(StaleReason::Overlap)
        } else if out.get(edit.span.clone()) != Some(edit.original.as_str()) {
            Some(StaleReason::Changed)
        } else {
            None
        };
        if let Some(reason) = reason {
            stale.push(StaleEdit {
                index,
                edit: edit.clone(),
                reason,
            });
            continue;
        }

        out.replace_range(edit.span.clone(), &edit.replacement);
        limit = Some(edit.span.start);
        applied += 1;
    }

    stale.sort_by_key(|s| s.edit.span.start);
    Applied {
        content: out,
        applied,
        stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit_at(content: &str, needle: &str, replacement: &str) -> Edit {
        let start = content.find(needle).unwrap();
        Edit::new(start..start + needle.len(), 1, needle, replacement.to_string())
    }

    #[test]
    fn test_apply_multiple_edits() {
        let content = "see [a](./a.md) and [b](sub/../b.md)\n";
        let edits = vec![
            edit_at(content, "./a.md", "a.md"),
            edit_at(content, "sub/../b.md", "b.md"),
        ];
        let result = apply_edits(content, &edits);
        assert_eq!(result.content, "see [a](a.md) and [b](b.md)\n");
        assert_eq!(result.applied, 2);
        assert!(result.stale.is_empty());
    }

    #[test]
    fn test_only_the_recorded_occurrence_is_replaced() {
        let content = "## Setup\ntext\n## Setup\n";
        let second = content.rfind("## Setup").unwrap();
        let edit = Edit::new(
            second..second + 8,
            3,
            "## Setup",
            "## Setup {: #setup-2}".to_string(),
        );
        let result = apply_edits(content, &[edit]);
        assert_eq!(result.content, "## Setup\ntext\n## Setup {: #setup-2}\n");
    }

    #[test]
    fn test_changed_content_marks_edit_stale() {
        let original = "# Title\n";
        let edit = edit_at(original, "# Title", "# Title {: #title}");
        let live = "# Other\n";
        let result = apply_edits(live, &[edit]);
        assert_eq!(result.applied, 0);
        assert!(!result.changed());
        assert_eq!(result.content, live);
        assert_eq!(result.stale[0].reason, StaleReason::Changed);
    }

    #[test]
    fn test_shifted_text_is_not_searched_for() {
        let original = "# Title\n";
        let edit = edit_at(original, "# Title", "# Title {: #title}");
        let live = "intro\n# Title\n";
        let result = apply_edits(live, &[edit]);
        assert_eq!(result.applied, 0);
        assert_eq!(result.content, live);
    }

    #[test]
    fn test_overlapping_edits() {
        let content = "## See [x](./x.md)\n";
        let line = Edit::new(0..18, 1, "## See [x](./x.md)", "## See [x](./x.md) {: #see-x}".into());
        let link = edit_at(content, "./x.md", "x.md");
        let result = apply_edits(content, &[line, link]);
        assert_eq!(result.applied, 1);
        assert_eq!(result.stale.len(), 1);
        assert_eq!(result.stale[0].reason, StaleReason::Overlap);
        assert_eq!(result.stale[0].index, 0);
        assert_eq!(result.content, "## See [x](x.md)\n");
    }

    #[test]
    fn test_out_of_bounds_span_is_stale() {
        let edit = Edit::new(10..20, 1, "whatever", "x".into());
        let result = apply_edits("short", &[edit]);
        assert_eq!(result.stale.len(), 1);
        assert_eq!(result.stale[0].reason, StaleReason::Changed);
        assert_eq!(result.content, "short");
    }
}
