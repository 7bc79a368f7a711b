//! Canonical release election within a bucket.

use chrono::{DateTime, Duration, Utc};

use crate::compare::{walk, Side};
use crate::index::Entry;
use crate::release::Release;
use crate::torrent_client::TorrentInfo;

/// Vote tally keyed by torrent name, kept in insertion order so ties go to
/// the name that entered first.
#[derive(Debug, Default)]
struct Tally(Vec<(String, usize)>);

impl Tally {
    fn reset(&mut self, name: &str) {
        self.0.clear();
        self.0.push((name.to_string(), 1));
    }

    fn vote(&mut self, name: &str) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, votes)) => *votes += 1,
            None => self.0.push((name.to_string(), 1)),
        }
    }

    fn winner(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (name, votes) in &self.0 {
            if best.map_or(true, |(_, b)| *votes > b) {
                best = Some((name, *votes));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// Elect the canonical release of a bucket.
///
/// The first member seeds the parent. Every later member either votes for a
/// title (exact duplicate of the parent, or a full tie) or, when it beats the
/// parent, becomes the parent with a fresh tally.
pub fn elect(bucket: &[Entry]) -> Option<&Entry> {
    let (first, rest) = bucket.split_first()?;

    let mut parent = first;
    let mut tally = Tally::default();
    tally.reset(&parent.torrent.name);

    for member in rest {
        if member.release == parent.release {
            tally.vote(&parent.torrent.name);
            continue;
        }
        match walk(&parent.release, &member.release) {
            Some(verdict) if verdict.winner == Side::Right => {
                parent = member;
                tally.reset(&member.torrent.name);
            }
            Some(_) => {}
            None => tally.vote(&member.torrent.name),
        }
    }

    let name = tally.winner()?;
    bucket.iter().find(|e| e.torrent.name == name)
}

/// Whether a torrent has been complete for at least `grace`.
pub fn settled(torrent: &TorrentInfo, now: DateTime<Utc>, grace: Duration) -> bool {
    torrent.progress >= 1.0
        && torrent
            .completed_at
            .map_or(false, |completed| now - completed >= grace)
}

/// Members that may be removed once `winner` is kept.
///
/// Members are grouped by identical release; a group goes only if every one
/// of its members is settled, and the winner's group always stays.
pub fn removable(
    bucket: &[Entry],
    winner: &Release,
    now: DateTime<Utc>,
    grace: Duration,
) -> Vec<TorrentInfo> {
    let mut seen: Vec<&Release> = Vec::new();
    let mut out = Vec::new();

    for entry in bucket {
        let release = entry.release.as_ref();
        if release == winner || seen.contains(&release) {
            continue;
        }
        seen.push(release);

        let group: Vec<&Entry> = bucket
            .iter()
            .filter(|e| e.release.as_ref() == release)
            .collect();
        if group.iter().all(|e| settled(&e.torrent, now, grace)) {
            out.extend(group.into_iter().map(|e| e.torrent.clone()));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{ReleaseParser, SceneParser};
    use std::sync::Arc;

    const GRACE: i64 = 1_209_600;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(hash: &str, name: &str, progress: f64, completed_secs_ago: Option<i64>) -> Entry {
        Entry {
            torrent: TorrentInfo {
                progress,
                completed_at: completed_secs_ago.map(|s| now() - Duration::seconds(s)),
                ..TorrentInfo::new(hash, name)
            },
            release: Arc::new(SceneParser.parse(name)),
        }
    }

    fn old(hash: &str, name: &str) -> Entry {
        entry(hash, name, 1.0, Some(GRACE * 2))
    }

    #[test]
    fn test_elect_empty() {
        assert!(elect(&[]).is_none());
    }

    #[test]
    fn test_elect_best_member() {
        let bucket = vec![
            old("a", "Movie.2020.720p.BluRay.x264-GRP"),
            old("b", "Movie.2020.1080p.BluRay.x264-GRP"),
            old("c", "Movie.2020.480p.BluRay.x264-GRP"),
        ];
        assert_eq!(elect(&bucket).unwrap().torrent.hash, "b");
    }

    #[test]
    fn test_elect_tie_votes_for_earliest() {
        // Full tie between ONE and TWO: both hold one vote, ONE entered first.
        let bucket = vec![
            old("a", "Movie.2020.1080p.BluRay.x264-ONE"),
            old("b", "Movie.2020.1080p.BluRay.x264-TWO"),
        ];
        assert_eq!(elect(&bucket).unwrap().torrent.hash, "a");
    }

    #[test]
    fn test_elect_majority_of_tied_titles() {
        let bucket = vec![
            old("a", "Movie.2020.1080p.BluRay.x264-ONE"),
            old("b", "Movie.2020.1080p.BluRay.x264-TWO"),
            old("c", "Movie.2020.1080p.BluRay.x264-TWO"),
        ];
        assert_eq!(elect(&bucket).unwrap().torrent.name, "Movie.2020.1080p.BluRay.x264-TWO");
    }

    #[test]
    fn test_removable_excludes_winner_group() {
        let bucket = vec![
            old("a", "Movie.2020.720p.BluRay.x264-GRP"),
            old("b", "Movie.2020.1080p.BluRay.x264-GRP"),
            old("c", "Movie.2020.1080p.BluRay.x264-GRP"),
        ];
        let winner = elect(&bucket).unwrap();
        let removable = removable(&bucket, &winner.release, now(), Duration::seconds(GRACE));
        let hashes: Vec<&str> = removable.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["a"]);
    }

    #[test]
    fn test_incomplete_member_retains_group() {
        let bucket = vec![
            old("a", "Movie.2020.720p.BluRay.x264-GRP"),
            entry("a2", "Movie.2020.720p.BluRay.x264-GRP", 0.9, Some(GRACE * 2)),
            old("b", "Movie.2020.1080p.BluRay.x264-GRP"),
        ];
        let winner = elect(&bucket).unwrap();
        assert!(removable(&bucket, &winner.release, now(), Duration::seconds(GRACE)).is_empty());
    }

    #[test]
    fn test_recent_completion_retains_group() {
        let bucket = vec![
            entry("a", "Movie.2020.720p.BluRay.x264-GRP", 1.0, Some(GRACE - 1)),
            old("b", "Movie.2020.1080p.BluRay.x264-GRP"),
        ];
        let winner = elect(&bucket).unwrap();
        assert!(removable(&bucket, &winner.release, now(), Duration::seconds(GRACE)).is_empty());
    }

    #[test]
    fn test_missing_completion_time_is_not_settled() {
        let t = entry("a", "Movie", 1.0, None).torrent;
        assert!(!settled(&t, now(), Duration::seconds(GRACE)));
        let t = entry("a", "Movie", 1.0, Some(GRACE)).torrent;
        assert!(settled(&t, now(), Duration::seconds(GRACE)));
    }
}
