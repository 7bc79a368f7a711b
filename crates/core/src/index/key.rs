//! Canonical grouping key.

use crate::release::{normalize, Release};

/// Key under which releases of the same work are grouped.
///
/// Built from the normalized title fields, the zero-padded date and episode
/// numbers, then every cut and edition tag. Resolution, source, audio and the
/// other quality attributes never take part, so two encodes of one episode
/// share a key.
pub fn canonical_key(release: &Release) -> String {
    let mut key = String::new();
    for part in [
        &release.title,
        &release.subtitle,
        &release.alt,
        &release.version,
    ] {
        key.push_str(&normalize(part));
    }

    key.push_str(&format!(
        "{:04}{:02}{:02}{:02}{:03}",
        release.year, release.month, release.day, release.series, release.episode
    ));

    for tag in release.cut.iter().chain(release.edition.iter()) {
        key.push_str(&normalize(tag));
    }

    key
}
