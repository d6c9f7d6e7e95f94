//! Upload storage engine: takes an untrusted file name and an untrusted byte stream and
//! stores the content under a single root directory.
//!
//! # Guarantees
//!
//! - **Safe names**: every stored name matches `[0-9a-z-]+(\.[0-9a-z]+)?`; separators,
//!   control characters and reserved device names never reach the filesystem.
//! - **No overwrites**: targets are claimed with an exclusive create. Name collisions
//!   resolve to `name-1.ext` through `name-255.ext`.
//! - **Bounded size**: the stream is cut off as soon as it crosses the configured limit.
//! - **No leftovers**: any failure after the target is claimed, including cancellation and
//!   a dropped save future, removes the partial file.
//!
//! # Architectural Overview
//!
//! 1.  **[`sanitize`]**: pure name normalization into a [`SanitizedName`].
//! 2.  **[`SizeGuarded`]**: a `Stream` adapter enforcing the byte ceiling via [`SizeGuard`].
//! 3.  **[`Storage`]**: the thread-safe handle that validates, claims a target and streams
//!     into it.
//! 4.  **[`StorageBuilder`]**: a type-safe fluent builder, also fed by [`StorageSettings`].
//!
//! # Examples
//!
//! ```rust
//! use stow_storage::{Storage, StorageError, StorageErrorKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("uploads");
//!     let storage = Storage::builder()
//!         .root(&root)
//!         .allowed_extensions(["pdf"])
//!         .connect()
//!         .await?;
//!
//!     let first = storage.save_reader("Invoice 2024.pdf", &b"%PDF-1.7"[..]).await?;
//!     let second = storage.save_reader("invoice-2024.pdf", &b"%PDF-1.7"[..]).await?;
//!     assert_eq!(first.name, "invoice-2024.pdf");
//!     assert_eq!(second.name, "invoice-2024-1.pdf");
//!
//!     let err = storage.save_reader("payload.exe", &b"MZ"[..]).await.unwrap_err();
//!     assert_eq!(err.kind(), StorageErrorKind::InvalidExtension);
//!     Ok(())
//! }
//! ```

mod allocator;
mod builder;
mod engine;
mod error;
mod guard;
mod sanitize;
mod settings;

pub use allocator::MAX_COLLISION_COUNTER;
pub use builder::{NoRoot, StorageBuilder, WithRoot};
pub use engine::{SavedFile, Storage, StorageInner};
pub use error::{StorageError, StorageErrorExt, StorageErrorKind};
pub use guard::{SizeGuard, SizeGuarded};
pub use sanitize::{MAX_STORED_NAME_BYTES, SanitizedName, sanitize};
pub use settings::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_SIZE_BYTES, DEFAULT_ROOT, StorageSettings,
};
pub use tokio_util::sync::CancellationToken;
