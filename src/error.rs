//! Error types for docmend.

use std::path::PathBuf;
use thiserror::Error;

/// A reference target that cannot be turned into a filesystem path.
///
/// These never abort a scan: the reference is recorded as unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty reference path")]
    Empty,

    #[error("reference contains a NUL byte")]
    NulByte,

    #[error("reference '{0}' climbs above the filesystem root")]
    EscapesRoot(String),
}

/// Errors that concern a whole document, the tree, or the manifest.
#[derive(Debug, Error)]
pub enum DocError {
    #[error("documentation root does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("site manifest not found: {}", .0.display())]
    MissingManifest(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("manifest {} is not a mapping", .0.display())]
    ManifestShape(PathBuf),

    #[error("invalid document pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("cannot load {kind} template: {reason}")]
    Template { kind: String, reason: String },
}

impl DocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_path() {
        let err = DocError::MissingRoot(PathBuf::from("/tmp/nowhere"));
        assert!(err.to_string().contains("/tmp/nowhere"));

        let err = DocError::io(
            "guide.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("guide.md"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::EscapesRoot("../../../x.md".to_string());
        assert!(err.to_string().contains("../../../x.md"));
    }
}
