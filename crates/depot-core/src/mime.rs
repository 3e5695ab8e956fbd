//! # MIME Inference
//!
//! MIME types are inferred from the file extension alone, through the static
//! extension table shipped with `mime_guess`. Lookup is case-insensitive.
//! Unknown or missing extensions map to [`OCTET_STREAM`].

use std::path::Path;

/// Generic binary MIME type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Infer the MIME type of `path` from its extension.
pub fn mime_type_of(path: impl AsRef<Path>) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Optional allow-list applied to declared MIME types at ingestion.
///
/// Disabled by default, in which case every type is permitted. Entries are
/// exact types (`application/pdf`) or top-level wildcards (`image/*`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimePolicy {
    enabled: bool,
    allowed: Vec<String>,
}

impl MimePolicy {
    /// A policy that permits everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A policy that permits only the listed types.
    pub fn allow_list<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled: true,
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Whether the allow-list is enforced.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `mime` passes this policy. Parameters (`; charset=...`) are ignored.
    pub fn permits(&self, mime: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed.iter().any(|entry| match entry.strip_suffix("/*") {
            Some(top) => essence
                .split_once('/')
                .is_some_and(|(t, _)| t == top),
            None => *entry == essence,
        })
    }
}
