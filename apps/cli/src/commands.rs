use anyhow::Context;
use std::path::Path;
use stow_storage::{CancellationToken, SavedFile, StorageBuilder, StorageSettings, sanitize};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::warn;

const STDIN_MARKER: &str = "-";

/// Streams `file` into the store configured by `settings`. Ctrl-C cancels the upload.
pub async fn save(
    settings: &StorageSettings,
    file: &Path,
    name: Option<&str>,
) -> anyhow::Result<SavedFile> {
    let storage = StorageBuilder::from_settings(settings)
        .connect()
        .await
        .context("Failed to open the upload store")?;

    let from_stdin = file.as_os_str() == STDIN_MARKER;
    let upload_name = name.or_else(|| {
        if from_stdin { None } else { file.file_name().and_then(|n| n.to_str()) }
    });

    let reader: Box<dyn AsyncRead + Send + Unpin> = if from_stdin {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(
            tokio::fs::File::open(file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?,
        )
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling upload");
            trigger.cancel();
        }
    });

    let result = storage.save_with_cancellation(upload_name, ReaderStream::new(reader), cancel).await;
    interrupt.abort();

    result.context("Upload rejected")
}

/// Renders the sanitized parts of `raw` as `name`/`extension` lines.
pub fn sanitize_report(raw: &str) -> String {
    let sanitized = sanitize(raw);
    format!("name: {}\nextension: {}", sanitized.name(), sanitized.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_both_parts() {
        assert_eq!(sanitize_report("../some/../filename.png"), "name: some-filename\nextension: png");
        assert_eq!(sanitize_report(".."), "name: \nextension: ");
    }
}
