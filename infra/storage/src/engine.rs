//! The [`Storage`] handle and the save pipeline.
//!
//! A save runs sanitize, validate, guard, allocate and stream in that order. Validation
//! failures never touch the filesystem; anything that fails after allocation removes the
//! partial file before the error is returned.

use crate::allocator::{self, AllocatedFile};
use crate::builder::StorageBuilder;
use crate::error::StorageError;
use crate::guard::SizeGuarded;
use crate::sanitize::{SanitizedName, sanitize};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use fxhash::FxHashSet;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The internal shared state of a [`Storage`] instance.
#[derive(Debug)]
pub struct StorageInner {
    /// Canonical directory every upload lands in.
    pub(crate) root: PathBuf,
    /// Lowercase extensions accepted by [`Storage::save`].
    pub(crate) allowed_extensions: FxHashSet<String>,
    /// Inclusive byte ceiling for a single upload.
    pub(crate) max_size: u64,
}

impl StorageInner {
    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Case-insensitive membership test against the allowlist.
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(&extension.to_ascii_lowercase())
    }
}

/// A file committed by one of the save operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Stored name relative to the root, e.g. `photo-1.png`.
    pub name: String,
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
}

/// A thread-safe handle to the upload store.
///
/// The handle is reference-counted and can be cloned freely across tasks. Concurrent saves
/// share nothing but the directory itself; exclusive creates keep them from claiming the
/// same path.
///
/// ```rust
/// use futures::stream;
/// use stow_storage::{Storage, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("uploads");
///     let storage = Storage::builder()
///         .root(&root)
///         .allowed_extensions(["png", "txt"])
///         .max_size(1024)
///         .connect()
///         .await?;
///
///     let chunks = stream::iter([Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"hi"))]);
///     let saved = storage.save("../Notes.TXT", chunks).await?;
///     assert_eq!(saved.name, "notes.txt");
///     assert_eq!(saved.size, 2);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// Stores `source` under a sanitized, collision-free version of `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidExtension`] or [`StorageError::InvalidFilename`] when
    /// the sanitized name fails validation, [`StorageError::FileTooLarge`] when the stream
    /// exceeds the configured limit, [`StorageError::AllocationExhausted`] when every
    /// candidate name is taken, and [`StorageError::Io`] for any other failure, including
    /// an error yielded by `source`.
    pub async fn save<'a, S, E>(
        &self,
        file_name: impl Into<Option<&'a str>>,
        source: S,
    ) -> Result<SavedFile, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<io::Error>,
    {
        self.save_with_cancellation(file_name, source, CancellationToken::new()).await
    }

    /// Same as [`Storage::save`], but gives up once `cancel` fires.
    ///
    /// A cancelled save removes its partial file and returns [`StorageError::Io`] wrapping an
    /// [`io::ErrorKind::Interrupted`] cause.
    ///
    /// # Errors
    ///
    /// See [`Storage::save`].
    pub async fn save_with_cancellation<'a, S, E>(
        &self,
        file_name: impl Into<Option<&'a str>>,
        source: S,
        cancel: CancellationToken,
    ) -> Result<SavedFile, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<io::Error>,
    {
        let sanitized = sanitize(file_name);
        self.validate(&sanitized)?;
        debug!(name = %sanitized, "Upload name validated");

        if cancel.is_cancelled() {
            return Err(StorageError::cancelled());
        }

        let source = pin!(source);
        let mut guarded = SizeGuarded::new(source, self.max_size);
        let mut target = allocator::allocate(&self.root, &sanitized).await?;

        match pump(&mut target, &mut guarded, &cancel).await {
            Ok(()) => {
                let size = guarded.guard().running_total();
                let (name, path) = target.commit();
                info!(%name, size, "Upload stored");
                Ok(SavedFile { name, path, size })
            },
            Err(primary) => {
                warn!(name = %target.stored_name(), error = %primary, "Upload failed, removing partial file");
                let path = target.path().to_path_buf();
                if let Err(cleanup) = target.discard().await {
                    error!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
                }
                Err(primary)
            },
        }
    }

    /// Stores everything read from `reader`, see [`Storage::save`].
    ///
    /// # Errors
    ///
    /// See [`Storage::save`].
    pub async fn save_reader<'a, R>(
        &self,
        file_name: impl Into<Option<&'a str>>,
        reader: R,
    ) -> Result<SavedFile, StorageError>
    where
        R: AsyncRead,
    {
        self.save(file_name, ReaderStream::new(reader)).await
    }

    /// Resolves a stored name, as returned in [`SavedFile::name`], to its path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidFilename`] if `stored_name` could not have been
    /// produced by a save.
    pub fn path_of(&self, stored_name: &str) -> Result<PathBuf, StorageError> {
        allocator::validate_stored_name(stored_name)?;
        Ok(self.root.join(stored_name))
    }

    /// # Errors
    ///
    /// Returns [`StorageError::InvalidFilename`] for a malformed name and
    /// [`StorageError::Io`] if existence cannot be determined.
    pub async fn exists(&self, stored_name: &str) -> Result<bool, StorageError> {
        let path = self.path_of(stored_name)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::internal(e, format!("Failed to stat: {}", path.display())))
    }

    /// Removes a previously stored file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidFilename`] for a malformed name and
    /// [`StorageError::Io`] if the file is missing or cannot be removed.
    pub async fn delete(&self, stored_name: &str) -> Result<(), StorageError> {
        let path = self.path_of(stored_name)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::internal(e, format!("Failed to delete: {}", path.display())))?;
        info!(name = %stored_name, "Upload deleted");
        Ok(())
    }

    fn validate(&self, sanitized: &SanitizedName) -> Result<(), StorageError> {
        if sanitized.extension().is_empty() || !self.allowed_extensions.contains(sanitized.extension())
        {
            return Err(StorageError::InvalidExtension {
                message: format!("'{}' is not an allowed extension", sanitized.extension()).into(),
                context: Some(sanitized.to_string().into()),
            });
        }

        if sanitized.name().is_empty() {
            return Err(StorageError::InvalidFilename {
                message: "name is empty after sanitization".into(),
                context: Some(sanitized.to_string().into()),
            });
        }

        Ok(())
    }
}

/// Copies chunks into `target` one at a time, then flushes and fsyncs it.
async fn pump<S>(
    target: &mut AllocatedFile,
    source: &mut S,
    cancel: &CancellationToken,
) -> Result<(), StorageError>
where
    S: Stream<Item = Result<Bytes, StorageError>> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StorageError::cancelled()),
            next = source.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StorageError::cancelled()),
            written = target.write(&chunk) => written.map_err(|e| {
                StorageError::internal(e, format!("Failed to write: {}", target.stored_name()))
            })?,
        }
    }

    target
        .finish()
        .await
        .map_err(|e| StorageError::internal(e, format!("Failed to sync: {}", target.stored_name())))
}
