//! check-links command: Report references to documents that do not exist
//!
//! Prints missing targets per document and the deduplicated global set as
//! compact JSON; `--strict` turns any missing target into exit status 1.

use crate::config::{CommonArgs, DirectoryPolicy, Settings};
use crate::resolve::display_relative;
use crate::scan::{scan_tree, ScannedDocument};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args)]
pub struct CheckLinksArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Exit with status 1 when any target is missing
    #[arg(long)]
    pub strict: bool,
}

/// What a resolved path points at on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    File,
    /// Directory holding an index document
    IndexedDirectory,
    Directory,
    Absent,
}

impl TargetState {
    /// Inspect `path` on disk.
    pub fn of(path: &Path, index_name: &str) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => TargetState::File,
            Ok(meta) if meta.is_dir() => {
                if path.join(index_name).is_file() || path.join("index.md").is_file() {
                    TargetState::IndexedDirectory
                } else {
                    TargetState::Directory
                }
            }
            _ => TargetState::Absent,
        }
    }

    /// Whether this state satisfies a reference under `policy`.
    pub fn is_present(self, policy: DirectoryPolicy) -> bool {
        match self {
            TargetState::File => true,
            TargetState::IndexedDirectory => policy != DirectoryPolicy::Reject,
            TargetState::Directory => policy == DirectoryPolicy::Any,
            TargetState::Absent => false,
        }
    }
}

/// Set the existence flag of every resolved reference in `doc`.
pub fn mark_presence(settings: &Settings, doc: &mut ScannedDocument) {
    for reference in &mut doc.references {
        let Some(resolved) = reference.resolved() else {
            continue;
        };
        let state = TargetState::of(&resolved.path, &settings.index_name);
        reference.exists = Some(state.is_present(settings.dir_policy));
        if state == TargetState::Directory || state == TargetState::IndexedDirectory {
            debug!(link = %reference.raw, ?state, "reference points at a directory");
        }
    }
}

/// A missing target as referenced from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReference {
    /// Target as written
    pub raw: String,
    /// Resolved target, relative to the root when inside it
    pub target: String,
    pub line: usize,
}

/// One absent target with everything that refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTarget {
    pub target: String,
    #[serde(skip)]
    pub path: PathBuf,
    /// Distinct raw spellings used to reach it
    pub referenced_as: Vec<String>,
    pub cited_in: Vec<PathBuf>,
}

/// Missing references per document, plus the deduplicated global set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MissingReport {
    pub by_document: BTreeMap<PathBuf, Vec<MissingReference>>,
    pub targets: Vec<MissingTarget>,
}

impl MissingReport {
    pub fn is_empty(&self) -> bool {
        self.by_document.is_empty()
    }

    /// Global targets referenced from `document`.
    pub fn targets_of(&self, document: &Path) -> Vec<&MissingTarget> {
        self.targets
            .iter()
            .filter(|t| t.cited_in.iter().any(|c| c == document))
            .collect()
    }
}

/// Collect every (document, absent target) pair exactly once.
pub fn detect_missing(settings: &Settings, documents: &[ScannedDocument]) -> MissingReport {
    let mut report = MissingReport::default();
    let mut global: BTreeMap<PathBuf, MissingTarget> = BTreeMap::new();

    for doc in documents {
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut missing = Vec::new();

        for reference in &doc.references {
            if reference.exists != Some(false) {
                continue;
            }
            let Some(resolved) = reference.resolved() else {
                continue;
            };
            let target = display_relative(&settings.root, &resolved.path);

            let entry = global
                .entry(resolved.path.clone())
                .or_insert_with(|| MissingTarget {
                    target: target.clone(),
                    path: resolved.path.clone(),
                    referenced_as: Vec::new(),
                    cited_in: Vec::new(),
                });
            if !entry.referenced_as.contains(&reference.raw) {
                entry.referenced_as.push(reference.raw.clone());
            }

            if !seen.insert(resolved.path.as_path()) {
                continue;
            }
            entry.cited_in.push(doc.path.clone());
            missing.push(MissingReference {
                raw: reference.raw.clone(),
                target,
                line: reference.line,
            });
        }

        if !missing.is_empty() {
            report.by_document.insert(doc.path.clone(), missing);
        }
    }

    report.targets = global.into_values().collect();
    report
}

/// Run the check-links command
pub async fn run_check_links(args: CheckLinksArgs) -> Result<()> {
    let settings = Settings::from_args(&args.common)?;
    eprintln!("Checking references under {}...", settings.root.display());

    let scan = scan_tree(&settings).await?;
    let report = detect_missing(&settings, &scan.documents);

    println!("{}", serde_json::to_string(&report)?);

    let references: usize = report.by_document.values().map(Vec::len).sum();
    eprintln!(
        "Done: {} missing targets ({} references in {} documents)",
        report.targets.len(),
        references,
        report.by_document.len()
    );

    if args.strict && !report.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
