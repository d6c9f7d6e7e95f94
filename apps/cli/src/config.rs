use config::{Config, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use stow_storage::StorageSettings;
use tracing::debug;

#[stow_derive::stow_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
    /// Directory for rolling log files; console only when unset.
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "warn".to_owned(), dir: None, json: false }
    }
}

/// Layers an optional TOML file under `STOW__`-prefixed environment variables.
///
/// Nested keys use double underscores, so `STOW__STORAGE__MAX_SIZE_BYTES` maps to
/// `storage.max_size_bytes`. A file passed explicitly must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Config`] if the file is missing or malformed, or if the merged
/// values do not match `T`.
pub fn load_config<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();
    if let Some(path) = path {
        debug!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(Environment::with_prefix("STOW").separator("__"))
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("stow.toml");
        std::fs::write(
            &path,
            "[storage]\nroot = \"/srv/uploads\"\nallowed_extensions = \"png,pdf\"\n\n[log]\nlevel = \"info\"\n",
        )
        .expect("write config");

        let cfg: AppConfig = load_config(Some(&path)).expect("config");

        assert_eq!(cfg.storage.root, PathBuf::from("/srv/uploads"));
        assert_eq!(cfg.storage.allowed_extensions, vec!["png", "pdf"]);
        assert_eq!(cfg.storage.max_size_bytes, stow_storage::DEFAULT_MAX_SIZE_BYTES);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let missing = tmp.path().join("absent.toml");

        assert!(load_config::<AppConfig>(Some(&missing)).is_err());
    }
}
