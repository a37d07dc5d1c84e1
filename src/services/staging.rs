use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::models::UploadedDocument;

/// An exclusively-owned filesystem region holding one request's uploaded
/// document for the duration of its conversion.
///
/// Each scope is a uniquely named directory, so concurrent requests with
/// identical filenames never collide. [`StagingScope::release`] removes the
/// whole tree; `Drop` covers any path that exits before release is reached,
/// so cleanup runs no matter how the request ends.
pub struct StagingScope {
    dir: TempDir,
}

impl StagingScope {
    pub fn acquire(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("distill-").tempdir_in(root)?;
        debug!(scope = %dir.path().display(), "staging scope acquired");
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write the document into the scope under a sanitized filename and
    /// return the absolute path for the conversion step.
    pub fn stage(&self, document: &UploadedDocument) -> io::Result<PathBuf> {
        let path = self.dir.path().join(sanitize_filename(&document.filename));
        fs::write(&path, &document.bytes)?;
        debug!(
            path = %path.display(),
            bytes = document.size(),
            "document staged"
        );
        Ok(path)
    }

    /// Remove the scope. Removal failures are logged, never surfaced: by the
    /// time release runs the request's outcome is already determined.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            warn!(
                scope = %path.display(),
                error = %err,
                "failed to remove staging scope"
            );
        }
    }
}

/// Reduce a client-supplied filename to a single safe path component:
/// only the final segment survives, restricted to `[A-Za-z0-9._-]`, with
/// leading and trailing dots stripped so parent references cannot escape
/// the scope.
pub fn sanitize_filename(raw: &str) -> String {
    let last_segment = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = last_segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(name: &str) -> UploadedDocument {
        UploadedDocument::new(name.to_string(), b"%PDF-1.4 test".to_vec())
    }

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("My Report (v2).pdf"), "MyReportv2.pdf");
    }

    #[test]
    fn sanitize_strips_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("a/b/c.pdf"), "c.pdf");
        assert_eq!(sanitize_filename(".."), "upload.pdf");
        assert_eq!(sanitize_filename(""), "upload.pdf");
    }

    #[test]
    fn staged_file_lands_inside_the_scope() {
        let root = tempfile::tempdir().unwrap();
        let scope = StagingScope::acquire(root.path()).unwrap();
        let path = scope.stage(&document("../../escape.pdf")).unwrap();
        assert!(path.starts_with(scope.root()));
        assert!(path.exists());
        scope.release();
    }

    #[test]
    fn release_removes_the_whole_scope() {
        let root = tempfile::tempdir().unwrap();
        let scope = StagingScope::acquire(root.path()).unwrap();
        let staged = scope.stage(&document("doc.pdf")).unwrap();
        let scope_root = scope.root().to_path_buf();
        scope.release();
        assert!(!staged.exists());
        assert!(!scope_root.exists());
    }

    #[test]
    fn drop_removes_the_scope_on_early_exit() {
        let root = tempfile::tempdir().unwrap();
        let scope_root;
        {
            let scope = StagingScope::acquire(root.path()).unwrap();
            scope.stage(&document("doc.pdf")).unwrap();
            scope_root = scope.root().to_path_buf();
        }
        assert!(!scope_root.exists());
    }

    #[test]
    fn concurrent_scopes_with_identical_filenames_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let first = StagingScope::acquire(root.path()).unwrap();
        let second = StagingScope::acquire(root.path()).unwrap();
        let a = first.stage(&document("same.pdf")).unwrap();
        let b = second.stage(&document("same.pdf")).unwrap();
        assert_ne!(a, b);
        assert_ne!(first.root(), second.root());
        first.release();
        assert!(b.exists());
        second.release();
    }
}
