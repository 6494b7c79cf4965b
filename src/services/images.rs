//! Storage for uploaded menu images.
//!
//! Files are written into one flat directory under the name the browser sent,
//! reduced to its last path component. Equal names overwrite each other.

use crate::errors::ServiceError;
use axum::body::Bytes;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// One file part of a multipart submission
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Bytes,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid file name: {0:?}")]
pub struct InvalidFileName(pub String);

/// Uploads whose names have been checked, ready to be written
#[derive(Debug, Default)]
pub struct StagedImages(Vec<(String, Bytes)>);

impl StagedImages {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reduces a client filename to a bare file name.
    ///
    /// `Ok(None)` means the part carried no file at all (an empty file input).
    pub fn sanitize_filename(raw: &str) -> Result<Option<String>, InvalidFileName> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let name = raw
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or_default()
            .trim();
        if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
            return Err(InvalidFileName(raw.to_string()));
        }
        Ok(Some(name.to_string()))
    }

    /// Checks every name before anything touches the disk
    pub fn stage(uploads: Vec<Upload>) -> Result<StagedImages, InvalidFileName> {
        let mut staged = Vec::with_capacity(uploads.len());
        for upload in uploads {
            if let Some(name) = Self::sanitize_filename(&upload.filename)? {
                staged.push((name, upload.content));
            }
        }
        Ok(StagedImages(staged))
    }

    pub async fn ensure_dir(&self) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Writes the staged files and returns the name of the last one
    pub async fn save(&self, staged: StagedImages) -> Result<Option<String>, ServiceError> {
        if staged.is_empty() {
            return Ok(None);
        }
        self.ensure_dir().await?;

        let mut last = None;
        for (name, content) in staged.0 {
            let destination = self.dir.join(&name);
            debug!(path = %destination.display(), bytes = content.len(), "writing upload");
            tokio::fs::write(&destination, &content).await?;
            info!(file = %name, "image stored");
            last = Some(name);
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("soup.jpg", Some("soup.jpg"))]
    #[case("C:\\Users\\chef\\soup.jpg", Some("soup.jpg"))]
    #[case("../../etc/passwd", Some("passwd"))]
    #[case("  ", None)]
    #[case("", None)]
    fn filenames_are_reduced_to_their_last_component(
        #[case] raw: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            ImageStore::sanitize_filename(raw).unwrap().as_deref(),
            expected
        );
    }

    #[rstest]
    #[case("..")]
    #[case("images/..")]
    #[case("images/")]
    fn unusable_names_are_rejected(#[case] raw: &str) {
        assert!(ImageStore::sanitize_filename(raw).is_err());
    }

    #[tokio::test]
    async fn save_creates_directory_and_keeps_last_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("img"));

        let staged = ImageStore::stage(vec![
            Upload {
                filename: "a.png".into(),
                content: Bytes::from_static(b"first"),
            },
            Upload {
                filename: String::new(),
                content: Bytes::new(),
            },
            Upload {
                filename: "b.png".into(),
                content: Bytes::from_static(b"second"),
            },
        ])
        .unwrap();
        assert_eq!(staged.len(), 2);

        let last = store.save(staged).await.unwrap();
        assert_eq!(last.as_deref(), Some("b.png"));
        assert_eq!(
            std::fs::read(tmp.path().join("img/a.png")).unwrap(),
            b"first"
        );
    }

    #[tokio::test]
    async fn nothing_staged_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("img"));
        assert_eq!(store.save(StagedImages::default()).await.unwrap(), None);
        assert!(!tmp.path().join("img").exists());
    }
}
