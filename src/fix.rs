//! fix command: Scan, report, confirm, apply
//!
//! Every category is reported before anything is written. Dispositions are
//! collected once per category (from flags or a prompt), then the plan is
//! applied against live file content.

use crate::config::{CommonArgs, Settings};
use crate::plan::{
    apply_plan, describe_edits, AssumeYes, Category, Confirm, Disposition, Dispositions, FixPlan,
};
use crate::scan::{scan_tree, TreeScan};
use crate::schema::{ApplySummary, IssueReport};
use crate::templates::TemplateSource;
use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct FixArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Disposition for link repairs (prompted when not given)
    #[arg(long, value_enum)]
    pub links: Option<Disposition>,

    /// Disposition for anchor normalizations (prompted when not given)
    #[arg(long, value_enum)]
    pub anchors: Option<Disposition>,

    /// Disposition for missing targets (prompted when not given)
    #[arg(long, value_enum)]
    pub missing: Option<Disposition>,

    /// Answer yes to every prompt; unset categories are applied in full
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Directory holding <kind>.md templates for missing targets
    #[arg(long, env = "DOCMEND_TEMPLATES")]
    pub templates: Option<PathBuf>,
}

#[derive(Args)]
pub struct AnchorsArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Disposition for anchor normalizations (prompted when not given)
    #[arg(long, value_enum)]
    pub apply: Option<Disposition>,

    /// Answer yes to every prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Interactive answers read from `input`, questions written to `output`.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on the terminal; questions go to stderr so stdout stays JSON.
    pub fn terminal() -> Self {
        Prompt::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompt { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// One trimmed line, `None` at end of input.
    fn answer(&mut self, question: &str) -> Option<String> {
        let _ = write!(self.output, "{}", question);
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    /// Ask how to handle `category`. End of input means skip.
    pub fn choose(&mut self, category: Category, files: usize) -> Disposition {
        let label = category.label();
        let _ = writeln!(self.output, "\nFound {} files with {}", files, label);
        let _ = writeln!(self.output, "How would you like to handle {}?", label);
        let _ = writeln!(self.output, "1. Apply all");
        let _ = writeln!(self.output, "2. Review file by file");
        let _ = writeln!(self.output, "3. Skip");

        loop {
            let Some(answer) = self.answer("Enter your choice (1-3): ") else {
                return Disposition::Skip;
            };
            match answer.as_str() {
                "1" => return Disposition::All,
                "2" => return Disposition::PerFile,
                "3" => return Disposition::Skip,
                _ => {
                    let _ = writeln!(self.output, "Please enter 1, 2 or 3.");
                }
            }
        }
    }

    /// `[y/N]` question; anything but yes is no.
    pub fn yes_no(&mut self, question: &str) -> bool {
        self.answer(&format!("{} [y/N]: ", question))
            .is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"))
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, category: Category, file: &Path, changes: &[String]) -> bool {
        let _ = writeln!(self.output, "\nFile: {}", file.display());
        for change in changes {
            let _ = writeln!(self.output, "  {}", change);
        }
        self.yes_no(&format!("Apply {} to this file?", category.label()))
    }
}

/// Human-readable issue report.
pub fn print_report(out: &mut impl Write, scan: &TreeScan, plan: &FixPlan) -> io::Result<()> {
    let report = IssueReport::new(scan, plan);
    writeln!(
        out,
        "Scanned {} documents ({} references)",
        report.documents, report.references
    )?;

    for (category, edits) in [
        (Category::Links, &plan.links),
        (Category::Anchors, &plan.anchors),
    ] {
        if edits.is_empty() {
            continue;
        }
        writeln!(
            out,
            "\n{}: {} changes in {} files",
            category.label(),
            edits.edit_count(),
            edits.file_count()
        )?;
        for (file, file_edits) in edits.iter() {
            for change in describe_edits(file_edits) {
                writeln!(out, "  {}: {}", file.display(), change)?;
            }
        }
    }

    if !plan.missing.is_empty() {
        writeln!(
            out,
            "\n{}: {} (referenced from {} documents)",
            Category::Missing.label(),
            plan.missing.targets.len(),
            plan.missing.by_document.len()
        )?;
        for target in &plan.missing.targets {
            let cited: Vec<String> = target
                .cited_in
                .iter()
                .map(|c| c.display().to_string())
                .collect();
            writeln!(out, "  {} <- {}", target.target, cited.join(", "))?;
        }
    }

    if !plan.anchor_issues.is_empty() {
        writeln!(out, "\nheading issues (not changed):")?;
        for (file, issues) in &plan.anchor_issues {
            for issue in issues {
                writeln!(
                    out,
                    "  {}:{}: {:?} {}",
                    file.display(),
                    issue.line,
                    issue.kind,
                    issue.heading
                )?;
            }
        }
    }

    for m in &report.malformed {
        writeln!(out, "  malformed {}:{}: {} ({})", m.file.display(), m.line, m.raw, m.error)?;
    }
    for f in report.unreadable {
        writeln!(out, "  unreadable {}: {}", f.file.display(), f.error)?;
    }
    Ok(())
}

/// Preset answers for one fix cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    pub links: Option<Disposition>,
    pub anchors: Option<Disposition>,
    pub missing: Option<Disposition>,
    pub assume_yes: bool,
    pub templates: TemplateSource,
}

impl CycleOptions {
    fn preset(&self, category: Category) -> Option<Disposition> {
        match category {
            Category::Links => self.links,
            Category::Anchors => self.anchors,
            Category::Missing => self.missing,
        }
    }
}

/// Scan the tree, report, collect dispositions, apply.
pub async fn run_cycle<R: BufRead, W: Write>(
    settings: &Settings,
    options: &CycleOptions,
    prompt: &mut Prompt<R, W>,
) -> Result<ApplySummary> {
    let scan = scan_tree(settings).await?;
    let plan = FixPlan::build(settings, &scan);

    print_report(prompt.output(), &scan, &plan).context("Failed to write report")?;

    let mut dispositions = Dispositions::uniform(Disposition::Skip);
    for category in Category::ALL {
        if !plan.has(category) {
            continue;
        }
        let disposition = match options.preset(category) {
            Some(preset) => preset,
            None if options.assume_yes => Disposition::All,
            None => prompt.choose(category, plan.file_count(category)),
        };
        dispositions.set(category, disposition);
    }

    if dispositions == Dispositions::uniform(Disposition::Skip) {
        if plan.is_empty() {
            let _ = writeln!(prompt.output(), "No documentation issues found.");
        }
        return Ok(ApplySummary::default());
    }

    let summary = if options.assume_yes {
        apply_plan(settings, &plan, &dispositions, &mut AssumeYes, &options.templates).await
    } else {
        apply_plan(settings, &plan, &dispositions, prompt, &options.templates).await
    };

    info!(
        applied = summary.applied_edits,
        written = summary.written.len(),
        created = summary.created.len(),
        stale = summary.stale.len(),
        failed = summary.failed.len(),
        "fix cycle finished"
    );
    Ok(summary)
}

fn finish(summary: &ApplySummary) -> Result<()> {
    println!("{}", serde_json::to_string(summary)?);
    eprintln!(
        "Done: {} edits applied, {} files written, {} files created",
        summary.applied_edits,
        summary.written.len(),
        summary.created.len()
    );
    if !summary.stale.is_empty() {
        eprintln!("  {} edits were stale and skipped", summary.stale.len());
    }
    if !summary.failed.is_empty() {
        eprintln!("  {} files failed", summary.failed.len());
    }
    Ok(())
}

/// Run the fix command
pub async fn run_fix(args: FixArgs) -> Result<()> {
    let settings = Settings::from_args(&args.common)?;
    eprintln!("Checking documentation under {}...", settings.root.display());

    let options = CycleOptions {
        links: args.links,
        anchors: args.anchors,
        missing: args.missing,
        assume_yes: args.yes,
        templates: TemplateSource::from_option(args.templates),
    };
    let summary = run_cycle(&settings, &options, &mut Prompt::terminal()).await?;
    finish(&summary)
}

/// Run the anchors command
pub async fn run_anchors(args: AnchorsArgs) -> Result<()> {
    let settings = Settings::from_args(&args.common)?;
    eprintln!("Checking heading anchors under {}...", settings.root.display());

    let options = CycleOptions {
        links: Some(Disposition::Skip),
        anchors: args.apply,
        missing: Some(Disposition::Skip),
        assume_yes: args.yes,
        templates: TemplateSource::Builtin,
    };
    let summary = run_cycle(&settings, &options, &mut Prompt::terminal()).await?;
    finish(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn written(prompt: &Prompt<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&prompt.output).to_string()
    }

    fn tree(files: &[(&str, &str)]) -> (TempDir, Settings) {
        let dir = tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let settings = Settings::for_root(dir.path());
        (dir, settings)
    }

    #[test]
    fn test_choose() {
        assert_eq!(prompt("1\n").choose(Category::Links, 2), Disposition::All);
        assert_eq!(prompt("2\n").choose(Category::Links, 2), Disposition::PerFile);
        assert_eq!(prompt(" 3 \n").choose(Category::Links, 2), Disposition::Skip);
    }

    #[test]
    fn test_choose_reasks_and_eof_skips() {
        let mut p = prompt("maybe\n2\n");
        assert_eq!(p.choose(Category::Anchors, 1), Disposition::PerFile);
        assert!(written(&p).contains("Please enter 1, 2 or 3."));

        assert_eq!(prompt("").choose(Category::Anchors, 1), Disposition::Skip);
    }

    #[test]
    fn test_confirm_defaults_to_no() {
        let changes = vec!["line 1: a -> b".to_string()];
        assert!(prompt("y\n").confirm(Category::Links, Path::new("a.md"), &changes));
        assert!(prompt("YES\n").confirm(Category::Links, Path::new("a.md"), &changes));
        assert!(!prompt("\n").confirm(Category::Links, Path::new("a.md"), &changes));
        assert!(!prompt("").confirm(Category::Links, Path::new("a.md"), &changes));

        let mut p = prompt("n\n");
        p.confirm(Category::Links, Path::new("a.md"), &changes);
        let out = written(&p);
        assert!(out.contains("File: a.md"));
        assert!(out.contains("line 1: a -> b"));
        assert!(out.contains("Apply link repairs to this file? [y/N]: "));
    }

    #[tokio::test]
    async fn test_report_lists_every_category() {
        let (_dir, settings) = tree(&[
            ("a.md", "# Alpha\n[b](./b.md) [gone](gone.md)\n# Alpha\n"),
            ("b.md", "# Beta {: #beta}\n"),
        ]);
        let scan = scan_tree(&settings).await.unwrap();
        let plan = FixPlan::build(&settings, &scan);

        let mut out = Vec::new();
        print_report(&mut out, &scan, &plan).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Scanned 2 documents"));
        assert!(out.contains("link repairs: 1 changes in 1 files"));
        assert!(out.contains("a.md: line 2: ./b.md -> b.md"));
        assert!(out.contains("anchor normalizations"));
        assert!(out.contains("gone.md <- a.md"));
        assert!(out.contains("DuplicateHeading"));
    }

    #[tokio::test]
    async fn test_cycle_with_prompts() {
        let (dir, settings) = tree(&[
            ("a.md", "# Alpha\n[b](./b.md)\n"),
            ("b.md", "# Beta {: #beta}\n"),
        ]);
        // links: per file, accepted; anchors: skipped
        let mut p = prompt("2\n3\ny\n");
        let summary = run_cycle(&settings, &CycleOptions::default(), &mut p)
            .await
            .unwrap();

        assert_eq!(summary.applied_edits, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "# Alpha\n[b](b.md)\n"
        );
    }

    #[tokio::test]
    async fn test_cycle_assume_yes_is_idempotent() {
        let (dir, settings) = tree(&[
            ("guides/guide.md", "### Setup Steps\n\n[see config](../tokens/colors.md)\n"),
        ]);
        let options = CycleOptions {
            assume_yes: true,
            ..CycleOptions::default()
        };

        let first = run_cycle(&settings, &options, &mut prompt("")).await.unwrap();
        assert_eq!(first.applied_edits, 1);
        assert_eq!(first.created, vec!["tokens/colors.md"]);
        assert!(dir.path().join("tokens/colors.md").is_file());

        let mut p = prompt("");
        let second = run_cycle(&settings, &options, &mut p).await.unwrap();
        assert_eq!(second.applied_edits, 0);
        assert!(second.written.is_empty());
        assert!(second.created.is_empty());
        assert!(written(&p).contains("No documentation issues found."));
    }

    #[tokio::test]
    async fn test_anchors_only_cycle_leaves_links() {
        let (dir, settings) = tree(&[
            ("a.md", "# Alpha\n[b](./b.md)\n"),
            ("b.md", "# Beta {: #beta}\n"),
        ]);
        let options = CycleOptions {
            links: Some(Disposition::Skip),
            anchors: Some(Disposition::All),
            missing: Some(Disposition::Skip),
            ..CycleOptions::default()
        };
        run_cycle(&settings, &options, &mut prompt("")).await.unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "# Alpha {: #alpha}\n[b](./b.md)\n"
        );
    }
}
