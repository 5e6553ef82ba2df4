//! Path resolution for document references
//!
//! Turns a raw link target, as written inside a document, into an absolute
//! path under the documentation root. Resolution is lexical: it never
//! consults the process working directory or the filesystem, so the same
//! (root, document, target) triple always yields the same path.

use crate::error::ResolveError;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// What kind of target a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// A path inside (or relative to) the documentation tree
    Local,
    /// Scheme-qualified URL (https://, ftp://, ...)
    External,
    /// In-page anchor (`#section`)
    Fragment,
    /// `mailto:` address
    Mail,
}

impl ReferenceKind {
    pub fn is_local(self) -> bool {
        self == ReferenceKind::Local
    }
}

/// Classify a raw link target.
pub fn classify(raw: &str) -> ReferenceKind {
    let raw = raw.trim();
    if raw.starts_with('#') {
        return ReferenceKind::Fragment;
    }
    if raw
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("mailto:"))
    {
        return ReferenceKind::Mail;
    }
    if raw.starts_with("//") || url::Url::parse(raw).is_ok() {
        return ReferenceKind::External;
    }
    ReferenceKind::Local
}

/// Split a target into its path part and its `#fragment` / `?query` suffix.
pub fn split_target(raw: &str) -> (&str, &str) {
    match raw.find(['#', '?']) {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    }
}

/// A local reference resolved to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    /// Fragment or query carried by the raw target, including its marker
    pub suffix: String,
    /// The raw path part ended with `/`
    pub trailing_slash: bool,
}

/// Resolve `raw` as written inside `document` (relative to `root`).
///
/// A target starting with `/` is rooted at `root`; anything else is relative
/// to the directory containing `document`.
pub fn resolve(root: &Path, document: &Path, raw: &str) -> Result<Resolved, ResolveError> {
    let (path_part, suffix) = split_target(raw.trim());
    if path_part.is_empty() {
        return Err(ResolveError::Empty);
    }
    if path_part.contains('\0') {
        return Err(ResolveError::NulByte);
    }

    let joined = match path_part.strip_prefix('/') {
        Some(rooted) => root.join(rooted.trim_start_matches('/')),
        None => {
            let base = root.join(document);
            let dir = base.parent().unwrap_or(root);
            dir.join(path_part)
        }
    };

    let path = normalize(&joined).map_err(|_| ResolveError::EscapesRoot(raw.to_string()))?;
    Ok(Resolved {
        path,
        suffix: suffix.to_string(),
        trailing_slash: path_part.ends_with('/'),
    })
}

/// Collapse `.` and `..` segments without touching the filesystem.
pub fn normalize(path: &Path) -> Result<PathBuf, ResolveError> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(ResolveError::EscapesRoot(path.display().to_string()));
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(segment) => {
                out.push(segment);
                depth += 1;
            }
        }
    }

    Ok(out)
}

/// Relative path from directory `from` to `to`. Both must be normalized.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel
    }
}

/// Render a path with forward slashes, as links are written.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Display `path` relative to `root` when it lies inside it.
pub fn display_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => to_slash(rel),
        Err(_) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("https://example.com"), ReferenceKind::External);
        assert_eq!(classify("ftp://files.example.com/a"), ReferenceKind::External);
        assert_eq!(classify("//cdn.example.com/x.js"), ReferenceKind::External);
        assert_eq!(classify("#setup"), ReferenceKind::Fragment);
        assert_eq!(classify("MAILTO:team@example.com"), ReferenceKind::Mail);
        assert_eq!(classify("../tokens/colors.md"), ReferenceKind::Local);
        assert_eq!(classify("guide.md#intro"), ReferenceKind::Local);
        assert_eq!(classify("/abs/page.md"), ReferenceKind::Local);
    }

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("a.md#b"), ("a.md", "#b"));
        assert_eq!(split_target("a.md?x=1#b"), ("a.md", "?x=1#b"));
        assert_eq!(split_target("a.md"), ("a.md", ""));
    }

    #[test]
    fn test_resolve_relative_to_document_directory() {
        let root = Path::new("/site/docs");
        let r = resolve(root, Path::new("guides/guide.md"), "../tokens/colors.md").unwrap();
        assert_eq!(r.path, PathBuf::from("/site/docs/tokens/colors.md"));
        assert_eq!(r.suffix, "");

        let r = resolve(root, Path::new("guides/guide.md"), "./setup.md#steps").unwrap();
        assert_eq!(r.path, PathBuf::from("/site/docs/guides/setup.md"));
        assert_eq!(r.suffix, "#steps");
    }

    #[test]
    fn test_resolve_rooted_target() {
        let root = Path::new("/site/docs");
        let r = resolve(root, Path::new("a/b/c.md"), "/tokens/colors.md").unwrap();
        assert_eq!(r.path, PathBuf::from("/site/docs/tokens/colors.md"));
    }

    #[test]
    fn test_resolve_directory_target_keeps_slash_flag() {
        let root = Path::new("/site/docs");
        let r = resolve(root, Path::new("index.md"), "components/").unwrap();
        assert!(r.trailing_slash);
        assert_eq!(r.path, PathBuf::from("/site/docs/components"));
    }

    #[test]
    fn test_resolve_malformed() {
        let root = Path::new("/docs");
        assert_eq!(resolve(root, Path::new("a.md"), "?q=1"), Err(ResolveError::Empty));
        assert_eq!(
            resolve(root, Path::new("a.md"), "x\0.md"),
            Err(ResolveError::NulByte)
        );
        assert!(matches!(
            resolve(root, Path::new("a.md"), "../../../../x.md"),
            Err(ResolveError::EscapesRoot(_))
        ));
    }

    #[test]
    fn test_resolve_is_independent_of_working_directory() {
        // Nothing in resolve() reads the cwd; the same inputs give the same path.
        let root = Path::new("/srv/docs");
        let a = resolve(root, Path::new("x/y.md"), "../z.md").unwrap();
        let b = resolve(root, Path::new("x/y.md"), "../z.md").unwrap();
        assert_eq!(a, b);
        assert!(a.path.is_absolute());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/d/guides"), Path::new("/d/tokens/colors.md")),
            PathBuf::from("../tokens/colors.md")
        );
        assert_eq!(
            relative_path(Path::new("/d/guides"), Path::new("/d/guides/a.md")),
            PathBuf::from("a.md")
        );
        assert_eq!(
            relative_path(Path::new("/d/guides"), Path::new("/d/guides")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_display_relative() {
        let root = Path::new("/d");
        assert_eq!(display_relative(root, Path::new("/d/a/b.md")), "a/b.md");
        assert_eq!(display_relative(root, Path::new("/elsewhere/b.md")), "/elsewhere/b.md");
    }
}
