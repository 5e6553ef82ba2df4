//! scan command: Extract references and headings from the documentation tree
//!
//! Walks every document under the root once, records each link target and
//! heading with its exact byte span, and prints the resulting issue report
//! as compact JSON.

use crate::check_links::mark_presence;
use crate::config::{CommonArgs, Settings};
use crate::error::{DocError, ResolveError};
use crate::plan::FixPlan;
use crate::resolve::{classify, resolve, ReferenceKind, Resolved};
use crate::schema::{FileFailure, IssueReport};
use anyhow::Result;
use clap::Args;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// `[text](target)` and `![alt](target "title")`
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!?\[([^\]\n]*)\]\(\s*([^)\s]+)(?:\s+"[^"\n]*")?\s*\)"#).expect("link pattern")
});

/// ATX heading with an optional `{#id}` or `{: #id}` annotation
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})[ \t]+(.*?)(?:[ \t]*\{(:?)[ \t]*#([^\s{}]+)[ \t]*\})?[ \t]*$")
        .expect("heading pattern")
});

/// How a link target was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// External, fragment-only or mail target; recorded but not resolved
    NotLocal,
    Resolved(Resolved),
    Malformed(ResolveError),
}

/// A link occurrence inside a document.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Display text between the brackets
    pub text: String,
    /// Target exactly as written
    pub raw: String,
    /// Byte span of `raw`
    pub span: Range<usize>,
    pub line: usize,
    pub kind: ReferenceKind,
    pub resolution: Resolution,
    /// Filesystem presence; `None` until checked, and for non-local targets
    pub exists: Option<bool>,
}

impl Reference {
    pub fn resolved(&self) -> Option<&Resolved> {
        match &self.resolution {
            Resolution::Resolved(r) => Some(r),
            _ => None,
        }
    }
}

/// Form of an existing heading anchor annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorStyle {
    /// `{#id}`
    Legacy,
    /// `{: #id}`
    Canonical,
}

/// A heading occurrence inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingDeclaration {
    pub level: u8,
    pub text: String,
    pub anchor: Option<String>,
    pub style: Option<AnchorStyle>,
    /// Byte span of the heading line, excluding the line terminator
    pub span: Range<usize>,
    pub line: usize,
    /// Line of an earlier heading with the same level and text
    pub duplicate_of: Option<usize>,
}

/// Links and headings found in raw content, in document order.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub links: Vec<RawLink>,
    pub headings: Vec<HeadingDeclaration>,
}

/// A link before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub text: String,
    pub raw: String,
    pub span: Range<usize>,
    pub line: usize,
}

/// Byte offset to 1-based line number.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

/// Opening fence marker of a code block: the fence char and its run length.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = rest.chars().take_while(|c| *c == ch).count();
    (run >= 3).then_some((ch, run))
}

/// Extract every link and heading from `content`.
///
/// Lines inside fenced code blocks contribute neither. Headings with the
/// same level and text as an earlier one are kept but marked as duplicates.
pub fn extract(content: &str) -> Extracted {
    let index = LineIndex::new(content);
    let mut headings = Vec::new();
    let mut fenced: Vec<Range<usize>> = Vec::new();
    let mut open_fence: Option<(char, usize, usize)> = None;
    let mut seen: HashMap<(u8, String), usize> = HashMap::new();

    let mut offset = 0;
    for (idx, raw_line) in content.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let start = offset;
        offset += raw_line.len();
        let line = raw_line.trim_end_matches('\n').trim_end_matches('\r');

        if let Some((ch, run, fence_start)) = open_fence {
            if let Some((close_ch, close_run)) = fence_marker(line) {
                if close_ch == ch && close_run >= run && line.trim().chars().all(|c| c == ch) {
                    fenced.push(fence_start..start + line.len());
                    open_fence = None;
                }
            }
            continue;
        }
        if let Some((ch, run)) = fence_marker(line) {
            open_fence = Some((ch, run, start));
            continue;
        }

        let Some(caps) = HEADING_RE.captures(line) else {
            continue;
        };
        let level = caps[1].len() as u8;
        let text = strip_closing_sequence(&caps[2]).to_string();
        if text.is_empty() {
            continue;
        }
        let anchor = caps.get(4).map(|m| m.as_str().to_string());
        let style = anchor.as_ref().map(|_| match caps.get(3) {
            Some(colon) if !colon.as_str().is_empty() => AnchorStyle::Canonical,
            _ => AnchorStyle::Legacy,
        });

        let duplicate_of = match seen.get(&(level, text.clone())) {
            Some(&first) => {
                debug!(line = line_no, heading = %text, "duplicate heading");
                Some(first)
            }
            None => {
                seen.insert((level, text.clone()), line_no);
                None
            }
        };

        headings.push(HeadingDeclaration {
            level,
            text,
            anchor,
            style,
            span: start..start + line.len(),
            line: line_no,
            duplicate_of,
        });
    }
    if let Some((_, _, fence_start)) = open_fence {
        fenced.push(fence_start..content.len());
    }

    let links = LINK_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if fenced.iter().any(|r| r.contains(&whole.start())) {
                return None;
            }
            let target = caps.get(2)?;
            Some(RawLink {
                text: caps[1].to_string(),
                raw: target.as_str().to_string(),
                span: target.range(),
                line: index.line_of(target.start()),
            })
        })
        .collect();

    Extracted { links, headings }
}

/// Drop a closing `##` run from ATX heading text.
fn strip_closing_sequence(text: &str) -> &str {
    let text = text.trim();
    let stripped = text.trim_end_matches('#');
    if stripped.len() == text.len() {
        return text;
    }
    if stripped.is_empty() || stripped.ends_with([' ', '\t']) {
        stripped.trim_end()
    } else {
        text
    }
}

/// A document with its extracted references and headings.
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    /// Path relative to the root
    pub path: PathBuf,
    /// Content as read during the scan
    pub content: String,
    pub references: Vec<Reference>,
    pub headings: Vec<HeadingDeclaration>,
}

impl ScannedDocument {
    /// Extract and resolve every reference in `content`.
    pub fn new(settings: &Settings, path: PathBuf, content: String) -> Self {
        let Extracted { links, headings } = extract(&content);

        let references = links
            .into_iter()
            .map(|link| {
                let kind = classify(&link.raw);
                let resolution = if kind.is_local() {
                    match resolve(&settings.root, &path, &link.raw) {
                        Ok(resolved) => Resolution::Resolved(resolved),
                        Err(e) => {
                            warn!(
                                document = %path.display(),
                                line = link.line,
                                link = %link.raw,
                                "unresolvable reference: {}", e
                            );
                            Resolution::Malformed(e)
                        }
                    }
                } else {
                    Resolution::NotLocal
                };

                Reference {
                    text: link.text,
                    raw: link.raw,
                    span: link.span,
                    line: link.line,
                    kind,
                    resolution,
                    exists: None,
                }
            })
            .collect();

        ScannedDocument {
            path,
            content,
            references,
            headings,
        }
    }
}

/// Every document under the root, scanned once.
#[derive(Debug, Default)]
pub struct TreeScan {
    pub documents: Vec<ScannedDocument>,
    pub failures: Vec<FileFailure>,
}

/// Root-relative paths of every document under the root, sorted.
pub fn discover_documents(settings: &Settings) -> Result<Vec<PathBuf>, DocError> {
    if !settings.root.is_dir() {
        return Err(DocError::MissingRoot(settings.root.clone()));
    }

    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&settings.root.to_string_lossy()),
        settings.extension
    );
    let entries = glob::glob(&pattern)?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => {
                if let Ok(rel) = path.strip_prefix(&settings.root) {
                    files.push(rel.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Scan the whole tree: read, extract, resolve, and check presence.
///
/// A document that cannot be read is recorded as a failure; the walk goes on.
pub async fn scan_tree(settings: &Settings) -> Result<TreeScan, DocError> {
    let files = discover_documents(settings)?;
    let mut scan = TreeScan::default();

    for rel in files {
        let path = settings.absolute(&rel);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let mut doc = ScannedDocument::new(settings, rel, content);
                mark_presence(settings, &mut doc);
                scan.documents.push(doc);
            }
            Err(e) => {
                error!(document = %rel.display(), "cannot read document: {}", e);
                scan.failures.push(FileFailure::new(&rel, &e));
            }
        }
    }

    info!(
        documents = scan.documents.len(),
        failures = scan.failures.len(),
        "scanned {}",
        settings.root.display()
    );
    Ok(scan)
}

/// Run the scan command
pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let settings = Settings::from_args(&args.common)?;
    eprintln!("Scanning {}...", settings.root.display());

    let scan = scan_tree(&settings).await?;
    let plan = FixPlan::build(&settings, &scan);
    let report = IssueReport::new(&scan, &plan);

    println!("{}", serde_json::to_string(&report)?);
    eprintln!(
        "Done: {} documents, {} link repairs, {} anchor edits, {} missing targets",
        report.documents,
        plan.links.edit_count(),
        plan.anchors.edit_count(),
        plan.missing.targets.len()
    );

    Ok(())
}

/// Look up a scanned document by its root-relative path.
pub fn find_document<'a>(scan: &'a TreeScan, path: &Path) -> Option<&'a ScannedDocument> {
    scan.documents.iter().find(|doc| doc.path == path)
}
