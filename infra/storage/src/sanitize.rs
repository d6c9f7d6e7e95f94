//! Untrusted file name → `(name, extension)` pair safe to embed in a path.

use std::fmt;

/// Longest candidate the sanitizer will produce, leaving room for a `-255` collision suffix
/// inside the usual 255-byte file name limit.
pub const MAX_STORED_NAME_BYTES: usize = 251;

const MAX_RAW_NAME_BYTES: usize = 255;
const UNSAFE_CHARS: [char; 9] = ['/', '\\', '?', '<', '>', ':', '*', '|', '"'];

/// Lowercase name and extension produced by [`sanitize`].
///
/// `name` only contains `[0-9a-z-]` and `extension` only `[0-9a-z]`. Either may be empty
/// when the input degenerates; rejecting that is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SanitizedName {
    name: String,
    extension: String,
}

impl SanitizedName {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.name, self.extension)
    }
}

/// Renders the canonical `name.extension` form (`name` alone without an extension).
impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extension.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.name, self.extension)
        }
    }
}

/// Sanitizes an untrusted file name. `None` is treated as an empty name.
///
/// Separators and other unsafe characters are removed rather than treated as directory
/// boundaries, so `../some/../file.png` collapses to `some-file`/`png`. Dots inside the
/// name become hyphens, while stray characters in the extension are simply dropped.
///
/// ```rust
/// use stow_storage::sanitize;
///
/// let sanitized = sanitize("../../Report.Final.PNG");
/// assert_eq!(sanitized.name(), "report-final");
/// assert_eq!(sanitized.extension(), "png");
/// ```
#[must_use]
pub fn sanitize<'a>(raw: impl Into<Option<&'a str>>) -> SanitizedName {
    let safe = strip_unsafe(raw.into().unwrap_or_default()).to_lowercase();
    let trimmed = safe.trim_matches('.');

    let (name, extension) = match trimmed.rsplit_once('.') {
        Some((name, extension)) => (slugify_name(name), retain_alnum(extension)),
        None => (slugify_name(trimmed), String::new()),
    };

    let mut name = fit_name(name, &extension);
    if is_reserved_device(&name) {
        name.clear();
    }

    SanitizedName { name, extension }
}

fn strip_unsafe(raw: &str) -> String {
    let kept: String = raw.chars().filter(|c| !c.is_control() && !UNSAFE_CHARS.contains(c)).collect();

    if kept.chars().all(|c| c == '.') || is_reserved_device(&kept) {
        return String::new();
    }

    truncate_bytes(kept.trim_end_matches(['.', ' ']), MAX_RAW_NAME_BYTES).to_owned()
}

/// `con`, `prn`, `aux`, `nul`, `com0`-`com9` and `lpt0`-`lpt9`, with or without an extension.
fn is_reserved_device(name: &str) -> bool {
    let stem = name.split_once('.').map_or(name, |(stem, _)| stem).to_ascii_lowercase();
    let numbered = stem.strip_prefix("com").or_else(|| stem.strip_prefix("lpt"));

    matches!(stem.as_str(), "con" | "prn" | "aux" | "nul")
        || numbered.is_some_and(|digit| matches!(digit.as_bytes(), [b'0'..=b'9']))
}

fn slugify_name(candidate: &str) -> String {
    slug::slugify(candidate)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

fn retain_alnum(candidate: &str) -> String {
    candidate.chars().filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit()).collect()
}

fn fit_name(mut name: String, extension: &str) -> String {
    let reserved = if extension.is_empty() { 0 } else { extension.len() + 1 };
    let budget = MAX_STORED_NAME_BYTES.saturating_sub(reserved);

    if name.len() > budget {
        // ASCII only at this point, any index is a char boundary.
        name.truncate(budget);
        while name.ends_with('-') {
            name.pop();
        }
    }
    name
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(raw: &str) -> (String, String) {
        sanitize(raw).into_parts()
    }

    #[test]
    fn known_vectors() {
        let vectors = [
            ("супер пупер домумент.docx", ("super-puper-domument", "docx")),
            ("......filename0.......", ("filename0", "")),
            ("filename1", ("filename1", "")),
            ("..../filename2", ("filename2", "")),
            ("filename3..", ("filename3", "")),
            ("../../filename4.png", ("filename4", "png")),
            ("/../../filename5.png", ("filename5", "png")),
            ("../some/../filename.png", ("some-filename", "png")),
            ("..", ("", "")),
            (".", ("", "")),
            ("       ../../filename6.png      ", ("filename6", "png")),
            (" >>      ../../filename7.png      ", ("filename7", "png")),
            (".filename8", ("filename8", "")),
            ("../../fi\\le'name.png      ", ("file-name", "png")),
            ("filename.js.png", ("filename-js", "png")),
            ("~/.\u{0}ssh/authorized_keys", ("", "sshauthorizedkeys")),
            ("/\u{0}/hosts", ("hosts", "")),
            ("report.final.png", ("report-final", "png")),
        ];

        for (raw, (name, extension)) in vectors {
            assert_eq!(pair(raw), (name.to_owned(), extension.to_owned()), "input: {raw:?}");
        }
    }

    #[test]
    fn missing_input_is_empty() {
        assert_eq!(sanitize(None::<&str>), SanitizedName::default());
        assert_eq!(sanitize(""), SanitizedName::default());
    }

    #[test]
    fn extension_fragments_are_dropped_not_joined() {
        assert_eq!(pair("photo.p_n-g"), ("photo".to_owned(), "png".to_owned()));
        assert_eq!(pair("photo.ПНГ"), ("photo".to_owned(), String::new()));
    }

    #[test]
    fn reserved_device_names_degenerate() {
        assert_eq!(pair("CON.txt"), (String::new(), String::new()));
        assert_eq!(pair("lpt1"), (String::new(), String::new()));
        assert_eq!(pair("con!"), (String::new(), String::new()));
        assert_eq!(pair("console.txt"), ("console".to_owned(), "txt".to_owned()));
        assert_eq!(pair("com10.txt"), ("com10".to_owned(), "txt".to_owned()));
    }

    #[test]
    fn control_characters_are_removed() {
        assert_eq!(pair("in\u{7}voice\u{85}.pdf"), ("invoice".to_owned(), "pdf".to_owned()));
    }

    #[test]
    fn long_names_fit_with_room_for_a_counter() {
        let raw = format!("{}.png", "a".repeat(250));
        let sanitized = sanitize(raw.as_str());

        assert_eq!(sanitized.extension(), "png");
        assert_eq!(sanitized.to_string().len(), MAX_STORED_NAME_BYTES);
    }

    #[test]
    fn oversized_raw_names_lose_their_tail() {
        let raw = format!("{}.png", "a".repeat(400));
        let sanitized = sanitize(raw.as_str());

        assert_eq!(sanitized.extension(), "");
        assert_eq!(sanitized.name().len(), MAX_STORED_NAME_BYTES);
    }

    #[test]
    fn truncation_never_leaves_a_trailing_hyphen() {
        let raw = format!("{}.jpeg", "ab-".repeat(83));
        let sanitized = sanitize(raw.as_str());

        assert_eq!(sanitized.extension(), "jpeg");
        assert!(!sanitized.name().ends_with('-'));
        assert_eq!(sanitized.name().len(), 245);
    }

    #[test]
    fn raw_truncation_respects_char_boundaries() {
        let raw = "ж".repeat(200);
        assert_eq!(truncate_bytes(&raw, 255).len(), 254);
    }

    #[test]
    fn display_renders_canonical_form() {
        assert_eq!(sanitize("Holiday Photo.JPG").to_string(), "holiday-photo.jpg");
        assert_eq!(sanitize("README").to_string(), "readme");
    }
}
