use crate::engine::{Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use crate::settings::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_SIZE_BYTES, StorageSettings};
use fxhash::FxHashSet;
use private::Sealed;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone)]
struct StorageConfig {
    allowed_extensions: Vec<String>,
    max_size: u64,
    create: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS.map(str::to_owned).to_vec(),
            max_size: DEFAULT_MAX_SIZE_BYTES,
            create: true,
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<FxHashSet<String>, StorageError> {
        if self.max_size == 0 {
            return Err(StorageError::InvalidConfiguration {
                message: "max_size must be greater than zero".into(),
                context: None,
            });
        }

        let mut allowed = FxHashSet::default();
        for extension in &self.allowed_extensions {
            let normalized = extension.trim().to_ascii_lowercase();
            if normalized.is_empty()
                || !normalized.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            {
                return Err(StorageError::InvalidConfiguration {
                    message: format!("extension '{extension}' must match [0-9a-z]+").into(),
                    context: None,
                });
            }
            allowed.insert(normalized);
        }

        if allowed.is_empty() {
            return Err(StorageError::InvalidConfiguration {
                message: "at least one allowed extension is required".into(),
                context: None,
            });
        }

        Ok(allowed)
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StorageConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    /// Replaces the allowlist. Entries are lowercased.
    #[must_use = "Sets the extensions accepted by the storage engine"]
    pub fn allowed_extensions<I, E>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        self.config.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Inclusive byte ceiling per upload.
    #[must_use = "Sets the maximum upload size for the storage engine"]
    pub const fn max_size(mut self, bytes: u64) -> Self {
        self.config.max_size = bytes;
        self
    }

    #[must_use = "Sets whether the storage engine should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, config: self.config }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory path for the storage engine"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }

    /// Seeds a builder from deserialized settings.
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn from_settings(settings: &StorageSettings) -> StorageBuilder<WithRoot> {
        Self::new()
            .allowed_extensions(settings.allowed_extensions.iter().cloned())
            .max_size(settings.max_size_bytes)
            .root(&settings.root)
    }
}

impl StorageBuilder<WithRoot> {
    /// Consumes the configuration and initializes the storage engine.
    ///
    /// This method performs the following boot sequence:
    /// 1. **Validation**: Rejects a zero size limit and empty or malformed extensions.
    /// 2. **Bootstrapping**: Creates the root directory (mode `0o700` on unix) if
    ///    `create(true)` was set.
    /// 3. **Canonicalization**: Resolves the root path to an absolute, physical path.
    /// 4. **Registration**: Returns a thread-safe [`Storage`] handle.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfiguration`] if validation fails.
    /// Returns [`StorageError::Io`] if:
    /// - The root directory does not exist and `create` is false.
    /// - The process lacks permissions to create or resolve the root directory.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let allowed_extensions = self.config.validate()?;
        let root = &self.state.0;

        if self.config.create {
            provision(root)
                .await
                .context(format!("Failed to bootstrap storage root: {}", root.display()))?;
            info!(path = %root.display(), "Bootstrapped storage root directory");
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;

        if !fs::metadata(&canonical).await.context("Failed to inspect storage root")?.is_dir() {
            return Err(StorageError::InvalidConfiguration {
                message: "storage root is not a directory".into(),
                context: Some(canonical.display().to_string().into()),
            });
        }

        info!(
            path = %canonical.display(),
            max_size = self.config.max_size,
            extensions = allowed_extensions.len(),
            "Storage engine ready"
        );

        Ok(Storage {
            inner: Arc::new(StorageInner {
                root: canonical,
                allowed_extensions,
                max_size: self.config.max_size,
            }),
        })
    }
}

async fn provision(root: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(root).await
}
