//! Exclusive claim of a fresh path under the storage root.

use crate::error::StorageError;
use crate::sanitize::SanitizedName;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Highest collision counter tried before allocation gives up.
pub const MAX_COLLISION_COUNTER: u16 = 255;

/// Claims `name.ext`, then `name-1.ext` up to `name-255.ext`, with an exclusive create.
///
/// Only an "already exists" failure moves on to the next candidate. Any other failure is
/// translated and returned immediately, leaving nothing on disk.
pub(crate) async fn allocate(
    root: &Path,
    sanitized: &SanitizedName,
) -> Result<AllocatedFile, StorageError> {
    ensure_safe(sanitized)?;

    for counter in 0..=MAX_COLLISION_COUNTER {
        let stored_name = candidate(sanitized, counter);
        let path = root.join(&stored_name);

        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => {
                debug!(name = %stored_name, counter, "Claimed upload target");
                return Ok(AllocatedFile { stored_name, path, file: Some(file), armed: true });
            },
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {},
            Err(err) => {
                return Err(StorageError::from_io(
                    err,
                    format!("Failed to create upload target: {}", path.display()),
                ));
            },
        }
    }

    Err(StorageError::AllocationExhausted {
        message: format!("every candidate up to counter {MAX_COLLISION_COUNTER} is taken").into(),
        context: Some(sanitized.to_string().into()),
    })
}

fn candidate(sanitized: &SanitizedName, counter: u16) -> String {
    let (name, extension) = (sanitized.name(), sanitized.extension());
    match (counter, extension.is_empty()) {
        (0, true) => name.to_owned(),
        (0, false) => format!("{name}.{extension}"),
        (n, true) => format!("{name}-{n}"),
        (n, false) => format!("{name}-{n}.{extension}"),
    }
}

fn ensure_safe(sanitized: &SanitizedName) -> Result<(), StorageError> {
    let name_ok = !sanitized.name().is_empty() && is_safe_component(sanitized.name());
    let extension_ok = is_safe_component(sanitized.extension());

    if name_ok && extension_ok {
        Ok(())
    } else {
        Err(StorageError::InvalidFilename {
            message: "name may only contain [0-9a-z-_]".into(),
            context: Some(sanitized.to_string().into()),
        })
    }
}

fn is_safe_component(part: &str) -> bool {
    part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Checks that a stored name is a single `[0-9a-z-_]+(\.[0-9a-z-_]+)?` path component.
pub(crate) fn validate_stored_name(stored_name: &str) -> Result<(), StorageError> {
    let valid = match stored_name.split_once('.') {
        Some((name, extension)) => {
            !name.is_empty()
                && !extension.is_empty()
                && is_safe_component(name)
                && is_safe_component(extension)
        },
        None => !stored_name.is_empty() && is_safe_component(stored_name),
    };

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidFilename {
            message: "not a stored file name".into(),
            context: Some(stored_name.to_owned().into()),
        })
    }
}

/// A freshly created file exclusively owned by one in-flight save.
///
/// Unless [`AllocatedFile::commit`] is called the path is unlinked, either explicitly through
/// [`AllocatedFile::discard`] or on drop.
#[derive(Debug)]
pub(crate) struct AllocatedFile {
    stored_name: String,
    path: PathBuf,
    file: Option<File>,
    armed: bool,
}

impl AllocatedFile {
    pub(crate) fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(chunk).await,
            None => Err(io::Error::new(io::ErrorKind::InvalidInput, "upload target already closed")),
        }
    }

    /// Flushes, fsyncs and closes the handle.
    pub(crate) async fn finish(&mut self) -> io::Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush().await?;
        file.sync_all().await
    }

    /// Keeps the file on disk and hands back its stored name and path.
    pub(crate) fn commit(mut self) -> (String, PathBuf) {
        self.armed = false;
        (std::mem::take(&mut self.stored_name), std::mem::take(&mut self.path))
    }

    /// Closes the handle and removes the partial file.
    pub(crate) async fn discard(mut self) -> io::Result<()> {
        self.armed = false;
        drop(self.file.take());

        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Drop for AllocatedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        drop(self.file.take());

        // Runs on whatever thread drops the save future; there is no async drop to await on.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed abandoned upload"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to remove abandoned upload");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageErrorKind;
    use crate::sanitize::sanitize;
    use tempfile::tempdir;

    #[test]
    fn candidates_follow_the_counter() {
        let photo = sanitize("photo.png");
        assert_eq!(candidate(&photo, 0), "photo.png");
        assert_eq!(candidate(&photo, 1), "photo-1.png");
        assert_eq!(candidate(&photo, 255), "photo-255.png");

        let readme = sanitize("README");
        assert_eq!(candidate(&readme, 0), "readme");
        assert_eq!(candidate(&readme, 7), "readme-7");
    }

    #[test]
    fn stored_names_are_single_components() {
        assert!(validate_stored_name("photo-1.png").is_ok());
        assert!(validate_stored_name("readme").is_ok());
        assert!(validate_stored_name("snake_case.txt").is_ok());

        for bad in ["", ".png", "photo.", "../photo.png", "a/b", "a.b.c", "Photo.png", "a b"] {
            let err = validate_stored_name(bad).expect_err(bad);
            assert_eq!(err.kind(), StorageErrorKind::InvalidFilename, "input: {bad:?}");
        }
    }

    #[tokio::test]
    async fn unsafe_names_fail_before_touching_disk() {
        let tmp = tempdir().expect("temp dir");
        let err = allocate(tmp.path(), &sanitize("..")).await.expect_err("empty name");

        assert_eq!(err.kind(), StorageErrorKind::InvalidFilename);
        assert_eq!(std::fs::read_dir(tmp.path()).expect("read dir").count(), 0);
    }

    #[tokio::test]
    async fn second_claim_gets_the_next_counter() {
        let tmp = tempdir().expect("temp dir");
        let sanitized = sanitize("notes.txt");

        let first = allocate(tmp.path(), &sanitized).await.expect("first claim");
        let second = allocate(tmp.path(), &sanitized).await.expect("second claim");

        assert_eq!(first.stored_name(), "notes.txt");
        assert_eq!(second.stored_name(), "notes-1.txt");

        first.commit();
        second.commit();
    }

    #[tokio::test]
    async fn dropping_an_uncommitted_file_removes_it() {
        let tmp = tempdir().expect("temp dir");
        let mut allocated = allocate(tmp.path(), &sanitize("draft.txt")).await.expect("claim");
        allocated.write(b"partial").await.expect("write");
        let path = allocated.path().to_path_buf();

        drop(allocated);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn commit_keeps_the_content() {
        let tmp = tempdir().expect("temp dir");
        let mut allocated = allocate(tmp.path(), &sanitize("kept.txt")).await.expect("claim");
        allocated.write(b"hello").await.expect("write");
        allocated.finish().await.expect("finish");

        let (name, path) = allocated.commit();
        assert_eq!(name, "kept.txt");
        assert_eq!(std::fs::read(path).expect("read back"), b"hello");
    }

    #[tokio::test]
    async fn discard_removes_the_path() {
        let tmp = tempdir().expect("temp dir");
        let allocated = allocate(tmp.path(), &sanitize("gone.txt")).await.expect("claim");
        let path = allocated.path().to_path_buf();

        allocated.discard().await.expect("discard");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_root_is_internal() {
        let tmp = tempdir().expect("temp dir");
        let missing = tmp.path().join("nope");

        let err = allocate(&missing, &sanitize("a.txt")).await.expect_err("no root");
        assert_eq!(err.kind(), StorageErrorKind::Internal);
    }
}
