use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

pub const DEFAULT_ROOT: &str = "/var/stow/";
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "gif", "png", "txt", "pdf"];
/// 50 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Deserializable engine configuration, usually one section of an application config.
///
/// `allowed_extensions` accepts either a list or a comma-separated string, so
/// `STOW__STORAGE__ALLOWED_EXTENSIONS=png,txt` works from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub root: PathBuf,
    #[serde(deserialize_with = "extension_list")]
    pub allowed_extensions: Vec<String>,
    pub max_size_bytes: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS.map(str::to_owned).to_vec(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

fn extension_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Csv(String),
        List(Vec<String>),
    }

    let items = match Repr::deserialize(deserializer)? {
        Repr::Csv(csv) => csv.split(',').map(str::to_owned).collect(),
        Repr::List(list) => list,
    };

    Ok(items.into_iter().map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect())
}
