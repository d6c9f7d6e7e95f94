use std::borrow::Cow;
use std::io;

/// A specialized [`StorageError`] enum of this crate.
///
/// Branch on [`StorageError::kind`] rather than on the rendered message.
#[stow_derive::stow_error]
pub enum StorageError {
    #[error("Invalid filename{}: {message}", format_context(.context))]
    InvalidFilename { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid extension{}: {message}", format_context(.context))]
    InvalidExtension { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("File size is too large{}: maximum allowed size is {limit} bytes", format_context(.context))]
    FileTooLarge { limit: u64, context: Option<Cow<'static, str>> },

    #[error("No free file name left{}: {message}", format_context(.context))]
    AllocationExhausted { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal storage failure{}: {source}", format_context(.context))]
    Io { source: io::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid storage configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Machine-checkable classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    InvalidFilename,
    InvalidExtension,
    FileTooLarge,
    AllocationExhausted,
    /// Any other I/O failure, including cancellation of an in-flight save.
    Internal,
    /// Only produced while provisioning the engine, never by a save.
    InvalidConfiguration,
}

impl StorageError {
    #[must_use]
    pub const fn kind(&self) -> StorageErrorKind {
        match self {
            Self::InvalidFilename { .. } => StorageErrorKind::InvalidFilename,
            Self::InvalidExtension { .. } => StorageErrorKind::InvalidExtension,
            Self::FileTooLarge { .. } => StorageErrorKind::FileTooLarge,
            Self::AllocationExhausted { .. } => StorageErrorKind::AllocationExhausted,
            Self::Io { .. } => StorageErrorKind::Internal,
            Self::InvalidConfiguration { .. } => StorageErrorKind::InvalidConfiguration,
        }
    }

    /// Translates a failure to create the target path, singling out paths the platform
    /// refuses. Only the exclusive create may use this.
    pub(crate) fn from_io(err: io::Error, context: impl Into<Cow<'static, str>>) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidFilename | io::ErrorKind::InvalidInput => Self::InvalidFilename {
                message: err.to_string().into(),
                context: Some(context.into()),
            },
            _ => Self::internal(err, context),
        }
    }

    /// Wraps any I/O failure that happens once the target exists, whatever its kind.
    pub(crate) fn internal(err: io::Error, context: impl Into<Cow<'static, str>>) -> Self {
        Self::Io { source: err, context: Some(context.into()) }
    }

    pub(crate) fn cancelled() -> Self {
        Self::Io {
            source: io::Error::new(io::ErrorKind::Interrupted, "save cancelled"),
            context: Some("Cancellation requested while streaming".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_rejections_become_invalid_filename() {
        let err = StorageError::from_io(
            io::Error::new(io::ErrorKind::InvalidFilename, "name too long"),
            "Creating upload",
        );
        assert_eq!(err.kind(), StorageErrorKind::InvalidFilename);
    }

    #[test]
    fn other_io_failures_stay_internal() {
        let err = StorageError::from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "Creating upload",
        );
        assert_eq!(err.kind(), StorageErrorKind::Internal);
        assert!(err.to_string().contains("Creating upload"));
    }

    #[test]
    fn invalid_input_after_creation_stays_internal() {
        let err = StorageError::internal(
            io::Error::new(io::ErrorKind::InvalidInput, "bad write"),
            "Writing upload",
        );
        assert_eq!(err.kind(), StorageErrorKind::Internal);
    }

    #[test]
    fn cancellation_is_internal_with_interrupted_cause() {
        let StorageError::Io { source, .. } = StorageError::cancelled() else {
            panic!("cancellation should wrap an I/O cause");
        };
        assert_eq!(source.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn messages_render_context() {
        let err = StorageError::FileTooLarge { limit: 16, context: Some("upload.png".into()) };
        assert_eq!(
            err.to_string(),
            "File size is too large (upload.png): maximum allowed size is 16 bytes"
        );
    }
}
