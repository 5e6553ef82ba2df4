//! Fix plan: the proposed edits of a scan, and how they get applied
//!
//! A [`FixPlan`] is computed once from a [`TreeScan`]. Applying it takes a
//! disposition per category and re-reads every file right before writing,
//! so edits computed from an outdated snapshot are skipped, not guessed.

use crate::anchors::{normalize_headings, AnchorIssue};
use crate::check_links::{detect_missing, MissingReport};
use crate::config::Settings;
use crate::edit::{apply_edits, Applied, Edit};
use crate::error::DocError;
use crate::repair::link_repairs;
use crate::scan::TreeScan;
use crate::schema::{ApplySummary, Declined, FileFailure, NotCreated, StaleReport};
use crate::templates::{materialize, Materialized, TemplateSource};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Issue category, dispositioned independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Links,
    Anchors,
    Missing,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Links, Category::Anchors, Category::Missing];

    pub fn label(self) -> &'static str {
        match self {
            Category::Links => "link repairs",
            Category::Anchors => "anchor normalizations",
            Category::Missing => "missing targets",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to do with one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    /// Apply every change in the category
    All,
    /// Confirm each file; a file's changes are applied all or nothing
    PerFile,
    /// Leave the category alone
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispositions {
    pub links: Disposition,
    pub anchors: Disposition,
    pub missing: Disposition,
}

impl Dispositions {
    pub fn uniform(disposition: Disposition) -> Self {
        Dispositions {
            links: disposition,
            anchors: disposition,
            missing: disposition,
        }
    }

    pub fn get(&self, category: Category) -> Disposition {
        match category {
            Category::Links => self.links,
            Category::Anchors => self.anchors,
            Category::Missing => self.missing,
        }
    }

    pub fn set(&mut self, category: Category, disposition: Disposition) {
        match category {
            Category::Links => self.links = disposition,
            Category::Anchors => self.anchors = disposition,
            Category::Missing => self.missing = disposition,
        }
    }
}

/// Edits of one category, grouped by root-relative document path.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FileEdits(pub BTreeMap<PathBuf, Vec<Edit>>);

impl FileEdits {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.0.len()
    }

    pub fn edit_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Vec<Edit>)> {
        self.0.iter()
    }

    fn insert(&mut self, path: PathBuf, edits: Vec<Edit>) {
        if !edits.is_empty() {
            self.0.insert(path, edits);
        }
    }
}

/// Every change a scan proposes, before any confirmation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixPlan {
    pub links: FileEdits,
    pub anchors: FileEdits,
    pub missing: MissingReport,
    /// Headings the normalizer refused to touch
    pub anchor_issues: BTreeMap<PathBuf, Vec<AnchorIssue>>,
}

impl FixPlan {
    pub fn build(settings: &Settings, scan: &TreeScan) -> Self {
        let mut plan = FixPlan::default();

        for doc in &scan.documents {
            plan.links.insert(doc.path.clone(), link_repairs(settings, doc));

            let anchors = normalize_headings(&doc.content, &doc.headings);
            plan.anchors.insert(doc.path.clone(), anchors.edits);
            if !anchors.issues.is_empty() {
                plan.anchor_issues.insert(doc.path.clone(), anchors.issues);
            }
        }
        plan.missing = detect_missing(settings, &scan.documents);

        debug!(
            links = plan.links.edit_count(),
            anchors = plan.anchors.edit_count(),
            missing = plan.missing.targets.len(),
            "plan built"
        );
        plan
    }

    /// No actionable change in any category.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.anchors.is_empty() && self.missing.is_empty()
    }

    pub fn has(&self, category: Category) -> bool {
        match category {
            Category::Links => !self.links.is_empty(),
            Category::Anchors => !self.anchors.is_empty(),
            Category::Missing => !self.missing.is_empty(),
        }
    }

    pub fn file_count(&self, category: Category) -> usize {
        match category {
            Category::Links => self.links.file_count(),
            Category::Anchors => self.anchors.file_count(),
            Category::Missing => self.missing.by_document.len(),
        }
    }
}

/// One line per change, as shown before confirmation.
pub fn describe_edits(edits: &[Edit]) -> Vec<String> {
    edits
        .iter()
        .map(|e| format!("line {}: {} -> {}", e.line, e.original, e.replacement))
        .collect()
}

/// Per-file confirmation for the per-file disposition.
pub trait Confirm {
    /// Whether to apply the listed `changes` of `category` to `file`.
    fn confirm(&mut self, category: Category, file: &Path, changes: &[String]) -> bool;
}

/// Answers yes to everything (non-interactive mode).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _: Category, _: &Path, _: &[String]) -> bool {
        true
    }
}

/// Outcome of applying one file's edit set.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub applied: usize,
    pub written: bool,
    pub stale: Vec<crate::edit::StaleEdit>,
}

/// Apply `edits` to the live content of `file` (root-relative).
///
/// The file is rewritten only if at least one edit applied, and then in a
/// single replace so it is never left half written.
pub async fn apply_to_file(
    settings: &Settings,
    file: &Path,
    edits: &[Edit],
) -> Result<FileOutcome, DocError> {
    let path = settings.absolute(file);
    let live = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| DocError::io(&path, e))?;

    let Applied {
        content,
        applied,
        stale,
    } = apply_edits(&live, edits);

    for s in &stale {
        warn!(
            document = %file.display(),
            line = s.edit.line,
            reason = ?s.reason,
            "stale edit skipped: {}", s.edit.original
        );
    }

    if applied == 0 {
        return Ok(FileOutcome {
            applied,
            written: false,
            stale,
        });
    }

    write_replacing(&path, &content).await?;
    info!(document = %file.display(), applied, "updated");
    Ok(FileOutcome {
        applied,
        written: true,
        stale,
    })
}

/// Write through a sibling temp file and rename it over `path`.
async fn write_replacing(path: &Path, content: &str) -> Result<(), DocError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.docmend-tmp", file_name));

    tokio::fs::write(&temp, content)
        .await
        .map_err(|e| DocError::io(&temp, e))?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(DocError::io(path, e));
    }
    Ok(())
}

/// Apply the confirmed parts of `plan`.
///
/// Confirmation runs per category in order: links, anchors, missing. The
/// link and anchor edits accepted for a file are then applied together on a
/// single read of its live content, so one category never shifts the spans
/// of another. A failure on one file is recorded and the run continues with
/// the next.
pub async fn apply_plan(
    settings: &Settings,
    plan: &FixPlan,
    dispositions: &Dispositions,
    confirm: &mut dyn Confirm,
    templates: &TemplateSource,
) -> ApplySummary {
    let mut summary = ApplySummary::default();
    let mut accepted: BTreeMap<&PathBuf, Vec<(Category, Edit)>> = BTreeMap::new();

    for (category, edits) in [
        (Category::Links, &plan.links),
        (Category::Anchors, &plan.anchors),
    ] {
        let disposition = dispositions.get(category);
        if disposition == Disposition::Skip {
            continue;
        }
        for (file, file_edits) in edits.iter() {
            if disposition == Disposition::PerFile
                && !confirm.confirm(category, file, &describe_edits(file_edits))
            {
                summary.declined.push(Declined {
                    file: file.clone(),
                    category,
                });
                continue;
            }
            accepted
                .entry(file)
                .or_default()
                .extend(file_edits.iter().map(|e| (category, e.clone())));
        }
    }

    for (file, tagged) in accepted {
        let edits: Vec<Edit> = tagged.iter().map(|(_, e)| e.clone()).collect();
        match apply_to_file(settings, file, &edits).await {
            Ok(outcome) => {
                summary.applied_edits += outcome.applied;
                if outcome.written {
                    summary.record_written(file);
                }
                summary
                    .stale
                    .extend(outcome.stale.into_iter().map(|s| StaleReport {
                        file: file.clone(),
                        category: tagged[s.index].0,
                        line: s.edit.line,
                        original: s.edit.original,
                        reason: s.reason,
                    }));
            }
            Err(e) => {
                error!(document = %file.display(), "{}", e);
                summary.failed.push(FileFailure::new(file, &e));
            }
        }
    }

    match dispositions.missing {
        Disposition::Skip => {}
        Disposition::All => {
            let targets: Vec<_> = plan.missing.targets.iter().collect();
            create_targets(settings, templates, &targets, &mut summary).await;
        }
        Disposition::PerFile => {
            let mut done: HashSet<PathBuf> = HashSet::new();
            for (file, refs) in &plan.missing.by_document {
                let targets: Vec<_> = plan
                    .missing
                    .targets_of(file)
                    .into_iter()
                    .filter(|t| !done.contains(&t.path))
                    .collect();
                if targets.is_empty() {
                    continue;
                }
                let changes: Vec<String> = refs
                    .iter()
                    .map(|r| format!("line {}: create {}", r.line, r.target))
                    .collect();
                if !confirm.confirm(Category::Missing, file, &changes) {
                    summary.declined.push(Declined {
                        file: file.clone(),
                        category: Category::Missing,
                    });
                    continue;
                }
                done.extend(targets.iter().map(|t| t.path.clone()));
                create_targets(settings, templates, &targets, &mut summary).await;
            }
        }
    }

    summary
}

async fn create_targets(
    settings: &Settings,
    templates: &TemplateSource,
    targets: &[&crate::check_links::MissingTarget],
    summary: &mut ApplySummary,
) {
    for target in targets {
        match materialize(settings, templates, &target.path).await {
            Ok(Materialized::Created(_)) => summary.created.push(target.target.clone()),
            Ok(Materialized::Skipped(reason)) => summary.not_created.push(NotCreated {
                target: target.target.clone(),
                reason,
            }),
            Err(e) => {
                error!(target_doc = %target.target, "{}", e);
                summary
                    .failed
                    .push(FileFailure::new(Path::new(&target.target), &e));
            }
        }
    }
}
