//! Candidate classification against a title bucket.

use serde::Serialize;
use tracing::debug;

use crate::compare::{walk, Comparator, Side};
use crate::index::Entry;
use crate::metrics;
use crate::release::Release;

/// What a candidate release means relative to what is already held.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Nothing of the same work is held.
    Unique,
    /// An identical release is held; carries the most complete copy.
    ExactDuplicate(Entry),
    /// The candidate is at least as good as every held release. Carries the
    /// comparator that favoured it, when one did.
    AttributeUpgrade(Option<Comparator>),
    /// A held release beats the candidate.
    NotAnUpgrade(Entry, Comparator),
    /// Reserved; not produced by the current chain.
    Indeterminate,
}

/// Wire form of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Unique,
    ExactDuplicate,
    Upgrade,
    NotAnUpgrade,
    Indeterminate,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Unique => "unique",
            Outcome::ExactDuplicate => "exact_duplicate",
            Outcome::Upgrade => "upgrade",
            Outcome::NotAnUpgrade => "not_an_upgrade",
            Outcome::Indeterminate => "indeterminate",
        }
    }
}

impl Decision {
    pub fn outcome(&self) -> Outcome {
        match self {
            Decision::Unique => Outcome::Unique,
            Decision::ExactDuplicate(_) => Outcome::ExactDuplicate,
            Decision::AttributeUpgrade(_) => Outcome::Upgrade,
            Decision::NotAnUpgrade(..) => Outcome::NotAnUpgrade,
            Decision::Indeterminate => Outcome::Indeterminate,
        }
    }

    /// Numeric status reported to callers.
    ///
    /// Exact duplicates map to 240 plus the progress decile of the matched
    /// copy, saturating at 250.
    pub fn status_code(&self) -> u16 {
        match self {
            Decision::Unique | Decision::AttributeUpgrade(_) | Decision::Indeterminate => 200,
            Decision::NotAnUpgrade(_, comparator) => comparator.status_code(),
            Decision::ExactDuplicate(entry) => {
                let decile = (entry.torrent.progress.clamp(0.0, 1.0) * 10.0).floor() as u16;
                (240 + decile).min(250)
            }
        }
    }

    /// The held entry the decision refers to, if any.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Decision::ExactDuplicate(entry) | Decision::NotAnUpgrade(entry, _) => Some(entry),
            _ => None,
        }
    }
}

/// Classify `candidate` against the members of its canonical-key bucket.
///
/// Pure: reads the bucket, touches nothing.
pub fn classify(candidate: &Release, bucket: &[Entry]) -> Decision {
    let decision = decide(candidate, bucket);
    debug!(
        title = %candidate.title,
        outcome = decision.outcome().as_str(),
        code = decision.status_code(),
        "Classified release"
    );
    metrics::DECISIONS
        .with_label_values(&[decision.outcome().as_str()])
        .inc();
    decision
}

fn decide(candidate: &Release, bucket: &[Entry]) -> Decision {
    if bucket.is_empty() {
        return Decision::Unique;
    }

    // Highest progress wins; the earliest member wins a tie.
    let best_duplicate = bucket
        .iter()
        .filter(|entry| entry.release.as_ref() == candidate)
        .fold(None::<&Entry>, |best, entry| match best {
            Some(b) if b.torrent.progress >= entry.torrent.progress => Some(b),
            _ => Some(entry),
        });
    if let Some(entry) = best_duplicate {
        return Decision::ExactDuplicate(entry.clone());
    }

    let mut favoured = None;
    for entry in bucket {
        match walk(candidate, &entry.release) {
            Some(verdict) if verdict.winner == Side::Right => {
                return Decision::NotAnUpgrade(entry.clone(), verdict.comparator);
            }
            Some(verdict) => {
                favoured.get_or_insert(verdict.comparator);
            }
            None => {}
        }
    }

    Decision::AttributeUpgrade(favoured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{ReleaseParser, SceneParser};
    use crate::torrent_client::TorrentInfo;
    use std::sync::Arc;

    fn entry(hash: &str, name: &str, progress: f64) -> Entry {
        Entry {
            torrent: TorrentInfo {
                progress,
                ..TorrentInfo::new(hash, name)
            },
            release: Arc::new(SceneParser.parse(name)),
        }
    }

    fn parse(name: &str) -> Release {
        SceneParser.parse(name)
    }

    #[test]
    fn test_empty_bucket_is_unique() {
        let decision = classify(&parse("Show.S01E01.1080p.WEB-DL"), &[]);
        assert!(matches!(decision, Decision::Unique));
        assert_eq!(decision.status_code(), 200);
    }

    #[test]
    fn test_better_resolution_is_upgrade() {
        let bucket = vec![entry("a", "Show.S01E01.720p.WEB-DL", 1.0)];
        let decision = classify(&parse("Show.S01E01.1080p.WEB-DL"), &bucket);
        assert!(matches!(
            decision,
            Decision::AttributeUpgrade(Some(Comparator::Resolution))
        ));
        assert_eq!(decision.status_code(), 200);
    }

    #[test]
    fn test_exact_duplicate_picks_most_complete() {
        let name = "Movie.2020.1080p.BluRay.x264-GRP";
        let bucket = vec![entry("a", name, 0.4), entry("b", name, 1.0)];
        let decision = classify(&parse(name), &bucket);
        match &decision {
            Decision::ExactDuplicate(e) => assert_eq!(e.torrent.hash, "b"),
            other => panic!("expected exact duplicate, got {:?}", other),
        }
        assert_eq!(decision.status_code(), 250);
    }

    #[test]
    fn test_exact_duplicate_progress_decile() {
        let name = "Movie.2020.1080p.BluRay.x264-GRP";
        let bucket = vec![entry("a", name, 0.47)];
        assert_eq!(classify(&parse(name), &bucket).status_code(), 244);
    }

    #[test]
    fn test_held_better_release_rejects_candidate() {
        let bucket = vec![
            entry("a", "Movie.2020.720p.BluRay.x264-GRP", 1.0),
            entry("b", "Movie.2020.1080p.BluRay.DTS-HD.MA.5.1.x264-GRP", 1.0),
        ];
        let decision = classify(&parse("Movie.2020.1080p.BluRay.AAC2.0.x264-GRP"), &bucket);
        match &decision {
            Decision::NotAnUpgrade(e, comparator) => {
                assert_eq!(e.torrent.hash, "b");
                assert_eq!(*comparator, Comparator::Channels);
            }
            other => panic!("expected not an upgrade, got {:?}", other),
        }
        assert_eq!(decision.status_code(), 203);
    }

    #[test]
    fn test_gated_resolution_does_not_reject() {
        let bucket = vec![entry("a", "Movie.2020.2160p.CAM-GRP", 1.0)];
        let decision = classify(&parse("Movie.2020.1080p.BluRay-GRP"), &bucket);
        assert!(matches!(
            decision,
            Decision::AttributeUpgrade(Some(Comparator::Source))
        ));
    }

    #[test]
    fn test_full_tie_is_upgrade_without_comparator() {
        let bucket = vec![entry("a", "Movie.2020.1080p.BluRay.x264-ONE", 1.0)];
        let decision = classify(&parse("Movie.2020.1080p.BluRay.x264-TWO"), &bucket);
        assert!(matches!(decision, Decision::AttributeUpgrade(None)));
    }
}
