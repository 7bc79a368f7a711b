//! Release attribute set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Structured attributes extracted from a release name.
///
/// Tag collections are sets: two releases listing the same tags in a
/// different order are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub title: String,
    pub subtitle: String,
    pub alt: String,
    pub version: String,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub series: u32,
    pub episode: u32,
    /// Raw resolution token, e.g. `1080p`.
    pub resolution: String,
    /// Canonical source token, e.g. `WEB-DL`.
    pub source: String,
    pub audio: BTreeSet<String>,
    /// Channel layout string, e.g. `5.1`.
    pub channels: String,
    pub hdr: BTreeSet<String>,
    pub language: BTreeSet<String>,
    pub codec: BTreeSet<String>,
    pub group: String,
    pub other: BTreeSet<String>,
    pub edition: BTreeSet<String>,
    pub cut: BTreeSet<String>,
    /// File extension without the dot.
    pub ext: String,
}

/// Fold a value down to lower-case alphanumerics.
///
/// Used for canonical keys and release-group comparison, where punctuation
/// and case differences must not split a work in two.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("The Office (US)"), "theofficeus");
        assert_eq!(normalize("  Mr. Robot "), "mrrobot");
        assert_eq!(normalize("NTb"), "ntb");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_tag_sets_ignore_order() {
        let mut a = Release::default();
        a.audio.insert("DDP".to_string());
        a.audio.insert("Atmos".to_string());

        let mut b = Release::default();
        b.audio.insert("Atmos".to_string());
        b.audio.insert("DDP".to_string());

        assert_eq!(a, b);
    }
}
