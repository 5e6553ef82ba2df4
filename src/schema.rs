//! Report schema
//!
//! JSON shapes printed by the scan and fix commands.

use crate::edit::StaleReason;
use crate::error::ResolveError;
use crate::plan::{Category, FixPlan};
use crate::scan::{Resolution, TreeScan};
use crate::templates::SkipReason;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A document that could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: String,
}

impl FileFailure {
    pub fn new(file: &Path, error: &dyn std::fmt::Display) -> Self {
        FileFailure {
            file: file.to_path_buf(),
            error: error.to_string(),
        }
    }
}

/// A reference whose target could not be turned into a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedReference {
    pub file: PathBuf,
    pub line: usize,
    pub raw: String,
    pub error: String,
}

/// Everything a scan found, before anything is written.
#[derive(Debug, Serialize)]
pub struct IssueReport<'a> {
    pub documents: usize,
    pub references: usize,
    #[serde(flatten)]
    pub plan: &'a FixPlan,
    pub malformed: Vec<MalformedReference>,
    pub unreadable: &'a [FileFailure],
}

impl<'a> IssueReport<'a> {
    pub fn new(scan: &'a TreeScan, plan: &'a FixPlan) -> Self {
        let mut malformed = Vec::new();
        let mut references = 0;

        for doc in &scan.documents {
            references += doc.references.len();
            for reference in &doc.references {
                if let Resolution::Malformed(err) = &reference.resolution {
                    malformed.push(malformed_entry(&doc.path, reference.line, &reference.raw, err));
                }
            }
        }

        IssueReport {
            documents: scan.documents.len(),
            references,
            plan,
            malformed,
            unreadable: &scan.failures,
        }
    }
}

fn malformed_entry(file: &Path, line: usize, raw: &str, err: &ResolveError) -> MalformedReference {
    MalformedReference {
        file: file.to_path_buf(),
        line,
        raw: raw.to_string(),
        error: err.to_string(),
    }
}

/// An edit skipped at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReport {
    pub file: PathBuf,
    pub category: Category,
    pub line: usize,
    pub original: String,
    pub reason: StaleReason,
}

/// A file the user chose not to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declined {
    pub file: PathBuf,
    pub category: Category,
}

/// A missing target that was not created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotCreated {
    pub target: String,
    pub reason: SkipReason,
}

/// What the apply pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplySummary {
    pub applied_edits: usize,
    pub written: Vec<PathBuf>,
    pub created: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stale: Vec<StaleReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FileFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub declined: Vec<Declined>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_created: Vec<NotCreated>,
}

impl ApplySummary {
    pub fn record_written(&mut self, file: &Path) {
        if !self.written.iter().any(|w| w == file) {
            self.written.push(file.to_path_buf());
        }
    }
}
