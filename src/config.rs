//! Shared command-line options and the resolved settings built from them.

use crate::error::DocError;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How a reference that resolves to a directory is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryPolicy {
    /// A directory never satisfies a reference
    Reject,
    /// A directory satisfies a reference only if it holds an index document
    #[default]
    Index,
    /// Any existing directory satisfies a reference
    Any,
}

/// Options common to every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Documentation root directory
    #[arg(long, env = "DOCMEND_ROOT", default_value = "docs")]
    pub root: PathBuf,

    /// How links that point at a directory are treated
    #[arg(long, env = "DOCMEND_DIR_LINKS", value_enum, default_value_t = DirectoryPolicy::Index)]
    pub dir_links: DirectoryPolicy,

    /// Directory index filename (excluded from navigation)
    #[arg(long, default_value = "README.md")]
    pub index_name: String,

    /// Document file extension
    #[arg(long, default_value = "md")]
    pub ext: String,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute documentation root
    pub root: PathBuf,
    pub extension: String,
    pub index_name: String,
    pub dir_policy: DirectoryPolicy,
}

impl Settings {
    /// Settings with defaults for `root`, without checking that it exists.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Settings {
            root: root.into(),
            extension: "md".to_string(),
            index_name: "README.md".to_string(),
            dir_policy: DirectoryPolicy::default(),
        }
    }

    /// Build settings from command-line options.
    ///
    /// The root is made absolute here, once; a missing root is fatal.
    pub fn from_args(args: &CommonArgs) -> Result<Self, DocError> {
        let root =
            std::path::absolute(&args.root).map_err(|e| DocError::io(args.root.clone(), e))?;
        if !root.is_dir() {
            return Err(DocError::MissingRoot(root));
        }

        Ok(Settings {
            root,
            extension: args.ext.trim_start_matches('.').to_string(),
            index_name: args.index_name.clone(),
            dir_policy: args.dir_links,
        })
    }

    /// Absolute path of a root-relative document path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether `path` carries the document extension.
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
    }
}
