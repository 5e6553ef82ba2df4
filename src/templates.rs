//! template command: Synthesize starter content for documents that do not exist yet
//!
//! The kind of document is inferred from its path, the kind's template is
//! loaded (built in, or from a `--templates` directory) and its placeholders
//! are filled from the file name. Materializing never overwrites a file.

use crate::anchors::anchor_id;
use crate::config::{CommonArgs, Settings};
use crate::error::DocError;
use crate::nav::humanize;
use anyhow::{bail, Result};
use chrono::Local;
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

#[derive(Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Target document, relative to the root
    pub target: PathBuf,

    /// Create the file instead of printing its content
    #[arg(long)]
    pub write: bool,

    /// Directory holding <kind>.md templates (default: built-in templates)
    #[arg(long, env = "DOCMEND_TEMPLATES")]
    pub templates: Option<PathBuf>,
}

/// Document kind, inferred from path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Component,
    Token,
    Changelog,
    Guide,
}

impl DocKind {
    /// Classify `target` by the keywords in its path segments.
    pub fn classify(target: &Path) -> Self {
        let segments: Vec<String> = target
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect();
        let has = |keyword: &str| segments.iter().any(|s| s.contains(keyword));

        if has("components") {
            DocKind::Component
        } else if has("tokens") {
            DocKind::Token
        } else if has("changelog") {
            DocKind::Changelog
        } else {
            DocKind::Guide
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DocKind::Component => "component",
            DocKind::Token => "token",
            DocKind::Changelog => "changelog",
            DocKind::Guide => "guide",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            DocKind::Component => COMPONENT_TEMPLATE,
            DocKind::Token => TOKEN_TEMPLATE,
            DocKind::Changelog => CHANGELOG_TEMPLATE,
            DocKind::Guide => GUIDE_TEMPLATE,
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const COMPONENT_TEMPLATE: &str = "# {title} {: #{anchor}}

The `{component_name}` component, part of `{component_path}`.

## Usage {: #usage}

```tsx
<{component_name} />
```

## Props {: #props}

| Prop | Type | Default | Description |
|------|------|---------|-------------|

## Accessibility {: #accessibility}
";

const TOKEN_TEMPLATE: &str = "# {title} {: #{anchor}}

Design tokens for {token_type}.

## Tokens {: #tokens}

| Token | Value | Usage |
|-------|-------|-------|

## Usage {: #usage}
";

const CHANGELOG_TEMPLATE: &str = "# {title} {: #{anchor}}

_Started {date}._

## Unreleased {: #unreleased}

### Added {: #added}

### Changed {: #changed}

### Fixed {: #fixed}
";

const GUIDE_TEMPLATE: &str = "# {title} {: #{anchor}}

{description}.

## Overview {: #overview}

## Steps {: #steps}

## Related {: #related}
";

/// Where templates come from.
#[derive(Debug, Clone, Default)]
pub enum TemplateSource {
    #[default]
    Builtin,
    /// `<dir>/<kind>.md`
    Directory(PathBuf),
}

impl TemplateSource {
    pub fn from_option(dir: Option<PathBuf>) -> Self {
        dir.map_or(TemplateSource::Builtin, TemplateSource::Directory)
    }

    pub async fn load(&self, kind: DocKind) -> Result<String, DocError> {
        match self {
            TemplateSource::Builtin => Ok(kind.builtin().to_string()),
            TemplateSource::Directory(dir) => {
                let path = dir.join(format!("{}.md", kind.name()));
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| DocError::Template {
                        kind: kind.name().to_string(),
                        reason: format!("{}: {}", path.display(), e),
                    })
            }
        }
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as is.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// Title derived from the file name: `color-tokens.md` -> `Color Tokens`.
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    humanize(&stem)
}

/// Placeholder values for `kind` at `target`.
fn placeholders(kind: DocKind, target: &Path) -> Vec<(&'static str, String)> {
    let title = title_from_path(target);
    let mut vars = vec![("anchor", anchor_id(&title))];

    match kind {
        DocKind::Component => {
            let component_path = target
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            vars.push(("component_name", title.replace(' ', "")));
            vars.push(("component_path", component_path));
        }
        DocKind::Token => vars.push(("token_type", title.to_lowercase())),
        DocKind::Changelog => vars.push(("date", Local::now().format("%Y-%m-%d").to_string())),
        DocKind::Guide => vars.push(("description", format!("Guide for {}", title.to_lowercase()))),
    }

    vars.push(("title", title));
    vars
}

/// Content produced for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    pub kind: DocKind,
    pub content: String,
}

/// Synthesize content for `target` (relative to the root).
///
/// Returns `None` when the template cannot be loaded or renders empty; the
/// caller must then not create the file.
pub async fn synthesize(source: &TemplateSource, target: &Path) -> Option<Synthesized> {
    let kind = DocKind::classify(target);
    let template = match source.load(kind).await {
        Ok(template) => template,
        Err(e) => {
            warn!(target_doc = %target.display(), "{}", e);
            return None;
        }
    };

    let content = render(&template, &placeholders(kind, target));
    if content.trim().is_empty() {
        warn!(target_doc = %target.display(), "{} template is empty", kind);
        return None;
    }
    Some(Synthesized { kind, content })
}

/// Why a target was not created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Exists,
    OutsideRoot,
    NotDocument,
    NoContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialized {
    Created(DocKind),
    Skipped(SkipReason),
}

/// Create `target` (absolute) from its template, with parent directories.
///
/// Writes at most once and never replaces an existing file.
pub async fn materialize(
    settings: &Settings,
    source: &TemplateSource,
    target: &Path,
) -> Result<Materialized, DocError> {
    let Ok(rel) = target.strip_prefix(&settings.root) else {
        warn!(target_doc = %target.display(), "refusing to create a file outside the root");
        return Ok(Materialized::Skipped(SkipReason::OutsideRoot));
    };
    if !settings.is_document(target) {
        return Ok(Materialized::Skipped(SkipReason::NotDocument));
    }
    if tokio::fs::try_exists(target)
        .await
        .map_err(|e| DocError::io(target, e))?
    {
        return Ok(Materialized::Skipped(SkipReason::Exists));
    }

    let Some(synthesized) = synthesize(source, rel).await else {
        return Ok(Materialized::Skipped(SkipReason::NoContent));
    };

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DocError::io(parent, e))?;
    }

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Ok(Materialized::Skipped(SkipReason::Exists));
        }
        Err(e) => return Err(DocError::io(target, e)),
    };
    file.write_all(synthesized.content.as_bytes())
        .await
        .map_err(|e| DocError::io(target, e))?;
    file.flush().await.map_err(|e| DocError::io(target, e))?;

    info!(target_doc = %rel.display(), kind = %synthesized.kind, "created from template");
    Ok(Materialized::Created(synthesized.kind))
}

#[derive(Debug, Serialize)]
pub struct TemplateOutput {
    pub file: String,
    pub kind: DocKind,
    pub result: Materialized,
}

/// Run the template command
pub async fn run_template(args: TemplateArgs) -> Result<()> {
    let settings = Settings::from_args(&args.common)?;
    let source = TemplateSource::from_option(args.templates);
    let target = args.target.strip_prefix("/").unwrap_or(args.target.as_path());

    if !args.write {
        let Some(synthesized) = synthesize(&source, target).await else {
            bail!("No template content for {}", target.display());
        };
        print!("{}", synthesized.content);
        return Ok(());
    }

    let result = materialize(&settings, &source, &settings.absolute(target)).await?;
    let output = TemplateOutput {
        file: target.display().to_string(),
        kind: DocKind::classify(target),
        result,
    };
    println!("{}", serde_json::to_string(&output)?);

    if let Materialized::Skipped(reason) = result {
        eprintln!("Not created: {:?}", reason);
    }
    Ok(())
}
