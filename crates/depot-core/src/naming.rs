//! # Stored-Name Generation
//!
//! Every blob is written under a name of the form
//!
//! ```text
//! <unix-millis>-<8 random chars>-<normalized basename><extension>
//! ```
//!
//! The timestamp makes names sort by creation time and lets an operator trace
//! a file back to its upload; the random component keeps names from colliding
//! between concurrent requests in the same millisecond; the normalized basename
//! keeps the original filename recognizable.
//!
//! Normalization: NFD decomposition, combining marks dropped, every character
//! outside `[A-Za-z0-9._-]` replaced with `-`, result lowercased.
//!
//! The whole name never exceeds [`MAX_STORED_NAME_LEN`] bytes. Extensions are
//! capped at [`MAX_EXTENSION_LEN`] bytes and the basename is truncated to fit
//! what remains. Every character is ASCII after sanitizing, so byte truncation
//! never splits a character.

use chrono::{DateTime, Utc};
use rand::Rng;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// URL- and filesystem-safe alphabet for the random component.
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of the random component.
pub const RANDOM_ID_LEN: usize = 8;

/// Filename limit (`NAME_MAX`) of common filesystems.
pub const MAX_STORED_NAME_LEN: usize = 255;

/// Longest extension kept, including the leading dot.
pub const MAX_EXTENSION_LEN: usize = 32;

/// Generate a stored name for `original_name` at time `now`.
pub fn stored_name(original_name: &str, now: DateTime<Utc>) -> String {
    let (base, ext) = split_extension(last_segment(original_name));
    let prefix = format!("{}-{}-", now.timestamp_millis(), random_id());

    let mut ext = sanitize_extension(ext);
    ext.truncate(MAX_EXTENSION_LEN);
    let mut base = normalize(base);
    base.truncate(MAX_STORED_NAME_LEN.saturating_sub(prefix.len() + ext.len()));

    format!("{prefix}{base}{ext}")
}

/// Normalize a basename into the safe character set.
pub fn normalize(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if is_safe_char(c) { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
}

/// 8 characters drawn from [`ALPHABET`] with the thread-local CSPRNG.
pub fn random_id() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Client filenames may carry directory components from either platform.
fn last_segment(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Split at the last dot. A leading dot belongs to the basename, so
/// `.env` has no extension and `archive.` has the extension `.`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

/// Same character class as the basename, case preserved.
fn sanitize_extension(ext: &str) -> String {
    ext.chars()
        .map(|c| if is_safe_char(c) { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn fixed_now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    // The random component may itself contain '-', so split by position.
    fn parts(name: &str) -> (&str, &str, &str) {
        let (ts, rest) = name.split_once('-').unwrap();
        let (rand, rest) = rest.split_at(RANDOM_ID_LEN);
        (ts, rand, rest.strip_prefix('-').unwrap())
    }

    #[test]
    fn layout_is_timestamp_random_name_extension() {
        let name = stored_name("Quarterly Report.PDF", fixed_now());
        let (ts, rand, rest) = parts(&name);
        assert_eq!(ts, "1700000000123");
        assert_eq!(rand.len(), RANDOM_ID_LEN);
        assert_eq!(rest, "quarterly-report.PDF");
    }

    #[test]
    fn diacritics_are_stripped() {
        assert_eq!(normalize("Crème Brûlée"), "creme-brulee");
        assert_eq!(normalize("Ångström"), "angstrom");
    }

    #[test]
    fn unsafe_characters_become_dashes() {
        assert_eq!(normalize("a b/c:d*e?"), "a-b-c-d-e-");
        assert_eq!(normalize("日本"), "--");
    }

    #[test]
    fn directory_components_are_dropped() {
        let name = stored_name("../../etc/passwd", fixed_now());
        assert!(name.ends_with("-passwd"));
        let name = stored_name("C:\\Users\\me\\photo.jpg", fixed_now());
        assert!(name.ends_with("-photo.jpg"));
    }

    #[test]
    fn empty_and_extensionless_names() {
        let name = stored_name("", fixed_now());
        let (_, rand, rest) = parts(&name);
        assert_eq!(rand.len(), RANDOM_ID_LEN);
        assert_eq!(rest, "");

        let name = stored_name("Makefile", fixed_now());
        assert!(name.ends_with("-makefile"));
    }

    #[test]
    fn dotfiles_have_no_extension() {
        assert_eq!(split_extension(".env"), (".env", ""));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
    }

    #[test]
    fn same_original_name_same_millisecond_never_collides() {
        let now = fixed_now();
        let names: HashSet<String> = (0..10_000).map(|_| stored_name("same.txt", now)).collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn random_id_uses_alphabet() {
        for _ in 0..100 {
            let id = random_id();
            assert_eq!(id.len(), RANDOM_ID_LEN);
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn long_names_are_truncated_keeping_the_extension() {
        let original = format!("{}.pdf", "a".repeat(240));
        let name = stored_name(&original, fixed_now());
        assert_eq!(name.len(), MAX_STORED_NAME_LEN);
        assert!(name.ends_with("aaa.pdf"));

        let (_, _, rest) = parts(&name);
        assert!(rest.starts_with('a'));
    }

    #[test]
    fn long_extensions_are_capped() {
        let original = format!("x.{}", "e".repeat(300));
        let name = stored_name(&original, fixed_now());
        assert!(name.len() <= MAX_STORED_NAME_LEN);
        assert!(name.ends_with(&format!("x.{}", "e".repeat(MAX_EXTENSION_LEN - 1))));
    }

    #[test]
    fn multibyte_names_fit_after_normalization() {
        let name = stored_name(&"日".repeat(300), fixed_now());
        assert_eq!(name.len(), MAX_STORED_NAME_LEN);
    }

    proptest! {
        #[test]
        fn stored_names_are_filesystem_safe(original in ".*") {
            let name = stored_name(&original, Utc::now());
            prop_assert!(name.chars().all(is_safe_char));
            prop_assert!(crate::uri::is_safe_segment(&name));
        }

        #[test]
        fn stored_names_fit_name_max(original in "\\PC{0,600}") {
            let name = stored_name(&original, Utc::now());
            prop_assert!(name.len() <= MAX_STORED_NAME_LEN, "{} bytes", name.len());
        }

        #[test]
        fn normalized_names_are_lowercase(original in "\\PC*") {
            let normalized = normalize(&original);
            prop_assert_eq!(normalized.to_lowercase(), normalized.clone());
            prop_assert!(normalized.chars().all(is_safe_char));
        }
    }
}
