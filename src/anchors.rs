//! Heading anchor normalization
//!
//! Every heading converges to the canonical form `## Text {: #anchor}`.
//! Headings without an anchor get one derived from their text; legacy
//! `{#anchor}` annotations are rewritten without changing the identifier.
//! Running the normalizer over its own output yields no further edits.

use crate::edit::Edit;
use crate::scan::{extract, HeadingDeclaration};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Anchor identifier for a heading text.
///
/// Lower-cased, whitespace runs become a single `-`, and anything that is
/// neither alphanumeric nor `-` is dropped.
pub fn anchor_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    let mut in_space = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                id.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch.is_alphanumeric() || ch == '-' {
            id.extend(ch.to_lowercase());
        }
    }

    id
}

/// The canonical heading line.
pub fn canonical_line(level: u8, text: &str, anchor: &str) -> String {
    format!("{} {} {{: #{}}}", "#".repeat(level as usize), text, anchor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorIssueKind {
    /// Same level and text as an earlier heading
    DuplicateHeading,
    /// Resolves to an anchor already used by another heading
    AnchorCollision,
    /// Heading text yields an empty anchor
    EmptyAnchor,
}

/// A heading the normalizer refused to touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorIssue {
    pub kind: AnchorIssueKind,
    pub line: usize,
    pub heading: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub anchor: String,
    /// Line of the heading this one clashes with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts_with: Option<usize>,
}

/// Edits and issues for one document.
#[derive(Debug, Clone, Default)]
pub struct AnchorPlan {
    pub edits: Vec<Edit>,
    pub issues: Vec<AnchorIssue>,
}

/// Compute the anchor edits for `headings`, scanned from `content`.
///
/// Explicit anchors claim their identifier first, so a derived anchor
/// never duplicates one the author already wrote further down.
pub fn normalize_headings(content: &str, headings: &[HeadingDeclaration]) -> AnchorPlan {
    let mut plan = AnchorPlan::default();

    let mut explicit: HashMap<&str, usize> = HashMap::new();
    for heading in headings.iter().filter(|h| h.duplicate_of.is_none()) {
        if let Some(anchor) = heading.anchor.as_deref() {
            explicit.entry(anchor).or_insert(heading.line);
        }
    }
    let mut derived: HashMap<String, usize> = HashMap::new();

    for heading in headings {
        if let Some(first) = heading.duplicate_of {
            warn!(line = heading.line, heading = %heading.text, "duplicate heading skipped");
            plan.issues.push(AnchorIssue {
                kind: AnchorIssueKind::DuplicateHeading,
                line: heading.line,
                heading: heading.text.clone(),
                anchor: String::new(),
                conflicts_with: Some(first),
            });
            continue;
        }

        let anchor = match heading.anchor.as_deref() {
            Some(existing) => {
                let owner = explicit.get(existing).copied().unwrap_or(heading.line);
                if owner != heading.line {
                    plan.issues.push(collision(heading, existing, owner));
                    continue;
                }
                existing.to_string()
            }
            None => {
                let id = anchor_id(&heading.text);
                if id.is_empty() {
                    plan.issues.push(AnchorIssue {
                        kind: AnchorIssueKind::EmptyAnchor,
                        line: heading.line,
                        heading: heading.text.clone(),
                        anchor: String::new(),
                        conflicts_with: None,
                    });
                    continue;
                }
                let owner = explicit
                    .get(id.as_str())
                    .or_else(|| derived.get(&id))
                    .copied();
                if let Some(owner) = owner {
                    plan.issues.push(collision(heading, &id, owner));
                    continue;
                }
                derived.insert(id.clone(), heading.line);
                id
            }
        };

        let old = &content[heading.span.clone()];
        let new = canonical_line(heading.level, &heading.text, &anchor);
        if old != new {
            debug!(line = heading.line, "{} -> {}", old, new);
            plan.edits.push(Edit::new(heading.span.clone(), heading.line, old, new));
        }
    }

    plan
}

fn collision(heading: &HeadingDeclaration, anchor: &str, owner: usize) -> AnchorIssue {
    warn!(
        line = heading.line,
        anchor, "anchor already used on line {}", owner
    );
    AnchorIssue {
        kind: AnchorIssueKind::AnchorCollision,
        line: heading.line,
        heading: heading.text.clone(),
        anchor: anchor.to_string(),
        conflicts_with: Some(owner),
    }
}

/// Scan `content` and compute its anchor edits.
pub fn normalize_content(content: &str) -> AnchorPlan {
    normalize_headings(content, &extract(content).headings)
}
