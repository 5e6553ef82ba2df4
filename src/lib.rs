//! docmend: Reference integrity for markdown documentation trees
//!
//! Commands:
//! - scan: Report every proposed change as JSON
//! - check-links: Report references to documents that do not exist
//! - anchors: Normalize heading anchors
//! - fix: Scan, confirm and apply link, anchor and missing-target fixes
//! - template: Synthesize starter content for a missing document
//! - nav: Rebuild the site manifest's navigation
//! - serve: Fix cycle, then the site server

pub mod anchors;
pub mod check_links;
pub mod config;
pub mod edit;
pub mod error;
pub mod fix;
pub mod nav;
pub mod plan;
pub mod repair;
pub mod resolve;
pub mod scan;
pub mod schema;
pub mod serve;
pub mod templates;

pub use anchors::{anchor_id, normalize_content, normalize_headings, AnchorIssue, AnchorPlan};
pub use check_links::{detect_missing, MissingReport, MissingTarget};
pub use config::{DirectoryPolicy, Settings};
pub use edit::{apply_edits, Applied, Edit, StaleReason};
pub use error::{DocError, ResolveError};
pub use nav::{build_nav, update_manifest, NavEntry, NavNode};
pub use plan::{apply_plan, Category, Confirm, Disposition, Dispositions, FixPlan};
pub use resolve::{resolve, ReferenceKind, Resolved};
pub use scan::{scan_tree, ScannedDocument, TreeScan};
pub use schema::{ApplySummary, IssueReport};
pub use templates::{materialize, synthesize, DocKind, TemplateSource};
