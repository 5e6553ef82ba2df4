//! Reference repair: rewrite link targets into their canonical relative form.

use crate::config::Settings;
use crate::edit::Edit;
use crate::resolve::{relative_path, split_target, to_slash};
use crate::scan::ScannedDocument;
use tracing::debug;

/// Edits that rewrite each existing local target of `doc` to the shortest
/// relative path from the document's directory.
///
/// Targets that do not exist are left alone; they are reported as missing.
pub fn link_repairs(settings: &Settings, doc: &ScannedDocument) -> Vec<Edit> {
    let doc_path = settings.absolute(&doc.path);
    let Some(doc_dir) = doc_path.parent() else {
        return Vec::new();
    };

    let mut edits = Vec::new();
    for reference in &doc.references {
        if reference.exists != Some(true) {
            continue;
        }
        let Some(resolved) = reference.resolved() else {
            continue;
        };

        let mut target = to_slash(&relative_path(doc_dir, &resolved.path));
        if resolved.trailing_slash && !target.ends_with('/') {
            target.push('/');
        }

        let (written, _) = split_target(&reference.raw);
        if written == target {
            continue;
        }

        let replacement = format!("{}{}", target, resolved.suffix);
        debug!(
            document = %doc.path.display(),
            line = reference.line,
            "{} -> {}", reference.raw, replacement
        );
        edits.push(Edit::new(
            reference.span.clone(),
            reference.line,
            &reference.raw,
            replacement,
        ));
    }

    edits
}
