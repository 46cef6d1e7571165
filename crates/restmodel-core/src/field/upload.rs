//! Uploaded files bound to file-transfer fields.
//!
//! Pending uploads are registered in an [`Uploads`] registry keyed by field
//! id. A field claims its entry, moves the file into a scratch directory it
//! owns, and removes that directory when the last clone of the field drops.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A file received alongside the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-side file name
    pub name: String,
    /// Where the file currently lives
    pub path: PathBuf,
    /// Upload failure reported by whatever received the file
    pub error: Option<String>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: PathBuf::new(),
            error: Some(error.into()),
        }
    }
}

/// Pending uploads keyed by the id of the field that should receive them.
#[derive(Debug, Clone, Default)]
pub struct Uploads {
    files: HashMap<String, UploadedFile>,
}

impl Uploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: impl Into<String>, file: UploadedFile) {
        self.files.insert(field_id.into(), file);
    }

    /// Remove and return the upload for a field.
    pub fn take(&mut self, field_id: &str) -> Option<UploadedFile> {
        self.files.remove(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.files.contains_key(field_id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// An upload moved into a scratch directory owned by its field.
#[derive(Debug)]
pub struct StagedUpload {
    dir: Option<TempDir>,
    path: PathBuf,
    original_name: String,
}

impl StagedUpload {
    /// Move `file` into a fresh directory under `root` (or the system temp dir).
    pub fn stage(file: &UploadedFile, root: Option<&Path>) -> io::Result<Self> {
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix("upload-").tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix("upload-").tempdir()?,
        };

        let file_name = Path::new(&file.name)
            .file_name()
            .map_or_else(|| "upload".into(), |n| n.to_os_string());
        let target = dir.path().join(file_name);

        if fs::rename(&file.path, &target).is_err() {
            // Cross-device moves cannot rename.
            fs::copy(&file.path, &target)?;
            fs::remove_file(&file.path)?;
        }

        tracing::info!(
            from = %file.path.display(),
            to = %target.display(),
            "Staged uploaded file"
        );

        Ok(Self {
            dir: Some(dir),
            path: target,
            original_name: file.name.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let location = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(
                    dir = %location.display(),
                    error = %e,
                    "Failed to remove staged upload"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_moves_and_cleans_up() {
        let incoming = tempfile::tempdir().unwrap();
        let source = incoming.path().join("php1234");
        fs::write(&source, b"hello").unwrap();

        let root = tempfile::tempdir().unwrap();
        let staged =
            StagedUpload::stage(&UploadedFile::new("report.txt", &source), Some(root.path()))
                .unwrap();

        assert!(!source.exists());
        assert!(staged.path().ends_with("report.txt"));
        assert_eq!(fs::read(staged.path()).unwrap(), b"hello");

        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn client_paths_are_reduced_to_a_file_name() {
        let incoming = tempfile::tempdir().unwrap();
        let source = incoming.path().join("tmp");
        fs::write(&source, b"x").unwrap();

        let staged = StagedUpload::stage(&UploadedFile::new("../../etc/passwd", &source), None)
            .unwrap();
        assert!(staged.path().ends_with("passwd"));
        assert_eq!(staged.original_name(), "../../etc/passwd");
    }

    #[test]
    fn registry_hands_out_each_upload_once() {
        let mut uploads = Uploads::new();
        uploads.insert("cv", UploadedFile::new("cv.pdf", "/tmp/x"));
        assert!(uploads.contains("cv"));
        assert!(uploads.take("cv").is_some());
        assert!(uploads.take("cv").is_none());
        assert!(uploads.is_empty());
    }
}
