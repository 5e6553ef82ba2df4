//! nav command: Rebuild the site manifest's navigation from the document tree
//!
//! Every document except directory indexes becomes a page entry under its
//! directory's section. Only the `nav` key of the manifest is replaced; the
//! other keys keep their content and order.

use crate::config::{CommonArgs, Settings};
use crate::error::DocError;
use crate::resolve::to_slash;
use crate::scan::discover_documents;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct NavArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Site manifest to update
    #[arg(long, env = "DOCMEND_MANIFEST", default_value = "mkdocs.yml")]
    pub manifest: PathBuf,

    /// Print the navigation instead of writing the manifest
    #[arg(long)]
    pub dry_run: bool,
}

/// A navigation tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavNode {
    /// Root-relative document path
    Page(String),
    Section(Vec<NavEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub title: String,
    pub node: NavNode,
}

/// `getting-started_guide` -> `Getting Started Guide`
pub fn humanize(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Build the navigation tree from sorted root-relative document paths.
pub fn build_nav(documents: &[PathBuf], index_name: &str) -> Vec<NavEntry> {
    let mut root: Vec<NavEntry> = Vec::new();

    for doc in documents {
        let Some(file_name) = doc.file_name() else {
            continue;
        };
        if file_name == index_name {
            continue;
        }

        let mut level = &mut root;
        if let Some(parent) = doc.parent() {
            for segment in parent.components() {
                let key = segment.as_os_str().to_string_lossy().to_string();
                level = section(level, key);
            }
        }

        let stem = doc
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        level.push(NavEntry {
            title: humanize(&stem),
            node: NavNode::Page(to_slash(doc)),
        });
    }

    root
}

/// The child list of the section named `key`, created on first use.
fn section(level: &mut Vec<NavEntry>, key: String) -> &mut Vec<NavEntry> {
    let idx = match level
        .iter()
        .position(|e| e.title == key && matches!(e.node, NavNode::Section(_)))
    {
        Some(idx) => idx,
        None => {
            level.push(NavEntry {
                title: key,
                node: NavNode::Section(Vec::new()),
            });
            level.len() - 1
        }
    };

    match &mut level[idx].node {
        NavNode::Section(children) => children,
        NavNode::Page(_) => unreachable!("position() matched a section"),
    }
}

/// Render entries in the manifest's list-of-single-key-maps form.
pub fn nav_to_yaml(entries: &[NavEntry]) -> Value {
    Value::Sequence(
        entries
            .iter()
            .map(|entry| {
                let value = match &entry.node {
                    NavNode::Page(path) => Value::String(path.clone()),
                    NavNode::Section(children) => nav_to_yaml(children),
                };
                let mut map = Mapping::new();
                map.insert(Value::String(entry.title.clone()), value);
                Value::Mapping(map)
            })
            .collect(),
    )
}

/// Replace the `nav` key of the manifest at `path`.
///
/// Returns whether the manifest was rewritten; an unchanged nav is not written.
pub async fn update_manifest(path: &Path, nav: Value) -> Result<bool, DocError> {
    if !path.is_file() {
        return Err(DocError::MissingManifest(path.to_path_buf()));
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DocError::io(path, e))?;
    let mut manifest: Value = serde_yaml::from_str(&text).map_err(|source| DocError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Mapping(map) = &mut manifest else {
        return Err(DocError::ManifestShape(path.to_path_buf()));
    };
    let key = Value::String("nav".to_string());
    if map.get(&key) == Some(&nav) {
        return Ok(false);
    }
    map.insert(key, nav);

    let yaml = serde_yaml::to_string(&manifest).map_err(|source| DocError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, yaml)
        .await
        .map_err(|e| DocError::io(path, e))?;
    Ok(true)
}

#[derive(Debug, Serialize)]
pub struct NavOutput {
    pub manifest: String,
    pub pages: usize,
    pub changed: bool,
}

fn count_pages(entries: &[NavEntry]) -> usize {
    entries
        .iter()
        .map(|e| match &e.node {
            NavNode::Page(_) => 1,
            NavNode::Section(children) => count_pages(children),
        })
        .sum()
}

/// Run the nav command
pub async fn run_nav(args: NavArgs) -> Result<()> {
    let settings = Settings::from_args(&args.common)?;
    let documents = discover_documents(&settings)?;
    let nav = build_nav(&documents, &settings.index_name);
    let pages = count_pages(&nav);

    if args.dry_run {
        let mut wrapper = Mapping::new();
        wrapper.insert(Value::String("nav".to_string()), nav_to_yaml(&nav));
        print!("{}", serde_yaml::to_string(&wrapper)?);
        return Ok(());
    }

    let changed = update_manifest(&args.manifest, nav_to_yaml(&nav)).await?;
    info!(manifest = %args.manifest.display(), pages, changed, "navigation updated");

    let output = NavOutput {
        manifest: args.manifest.display().to_string(),
        pages,
        changed,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("getting-started"), "Getting Started");
        assert_eq!(humanize("API_reference"), "Api Reference");
        assert_eq!(humanize("colors"), "Colors");
        assert_eq!(humanize("--x--"), "X");
    }

    #[test]
    fn test_build_nav_groups_by_directory_and_skips_index() {
        let docs = paths(&[
            "README.md",
            "components/README.md",
            "components/button.md",
            "components/forms/text-input.md",
            "getting-started.md",
            "tokens/colors.md",
        ]);
        let nav = build_nav(&docs, "README.md");

        assert_eq!(nav.len(), 3);
        assert_eq!(nav[0].title, "components");
        assert_eq!(nav[1].title, "Getting Started");
        assert_eq!(nav[1].node, NavNode::Page("getting-started.md".to_string()));

        let NavNode::Section(components) = &nav[0].node else {
            panic!("components should be a section");
        };
        assert_eq!(components[0].title, "Button");
        assert_eq!(components[1].title, "forms");
        let NavNode::Section(forms) = &components[1].node else {
            panic!("forms should be a section");
        };
        assert_eq!(
            forms[0].node,
            NavNode::Page("components/forms/text-input.md".to_string())
        );
        assert_eq!(count_pages(&nav), 4);
    }

    #[test]
    fn test_nav_to_yaml_shape() {
        let nav = build_nav(&paths(&["a.md", "sub/b-c.md"]), "README.md");
        let yaml = serde_yaml::to_string(&nav_to_yaml(&nav)).unwrap();
        let parsed: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed[0]["A"], Value::String("a.md".into()));
        assert_eq!(parsed[1]["sub"][0]["B C"], Value::String("sub/b-c.md".into()));
    }

    #[tokio::test]
    async fn test_update_manifest_replaces_only_nav() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("mkdocs.yml");
        fs::write(
            &manifest,
            "site_name: Design System\nnav:\n- Old: old.md\ntheme:\n  name: material\nplugins:\n- search\n",
        )
        .unwrap();

        let nav = build_nav(&paths(&["guide.md"]), "README.md");
        let changed = update_manifest(&manifest, nav_to_yaml(&nav)).await.unwrap();
        assert!(changed);

        let text = fs::read_to_string(&manifest).unwrap();
        let value: Value = serde_yaml::from_str(&text).unwrap();
        let keys: Vec<_> = value
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["site_name", "nav", "theme", "plugins"]);
        assert!(text.contains("- Guide: guide.md"));
        assert!(!text.contains("old.md"));
        assert_eq!(value["theme"]["name"], Value::String("material".into()));

        // same nav again: nothing to write
        let changed = update_manifest(&manifest, nav_to_yaml(&nav)).await.unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_update_manifest_appends_nav_when_absent() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("mkdocs.yml");
        fs::write(&manifest, "site_name: Docs\n").unwrap();

        let nav = build_nav(&paths(&["a.md"]), "README.md");
        update_manifest(&manifest, nav_to_yaml(&nav)).await.unwrap();
        let text = fs::read_to_string(&manifest).unwrap();
        assert!(text.starts_with("site_name: Docs\n"));
        let value: Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(value["nav"][0]["A"], Value::String("a.md".into()));
    }

    #[tokio::test]
    async fn test_update_manifest_missing() {
        let dir = tempdir().unwrap();
        let err = update_manifest(&dir.path().join("mkdocs.yml"), Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::MissingManifest(_)));
    }
}
