//! Dedup sweep over an identity's whole index.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::Clock;
use crate::index::{IndexError, TitleIndex};
use crate::metrics;
use crate::torrent_client::{ClientIdentity, TorrentClient, TorrentClientError};

use super::{elect, removable};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Failed to remove {attempted} torrents: {source}")]
    Removal {
        attempted: usize,
        #[source]
        source: TorrentClientError,
    },
}

/// What a sweep removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub removed: Vec<String>,
}

impl SweepReport {
    pub fn count(&self) -> usize {
        self.removed.len()
    }
}

/// Removes superseded duplicates that have seeded past the grace period.
pub struct DedupSweeper {
    grace: Duration,
    clock: Arc<dyn Clock>,
}

impl DedupSweeper {
    pub fn new(grace: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { grace, clock }
    }

    /// Elect a canonical release per bucket and delete every eligible
    /// non-canonical group, data included, in a single client call.
    pub async fn sweep(
        &self,
        index: &TitleIndex,
        identity: &ClientIdentity,
        client: &dyn TorrentClient,
        bypass: bool,
    ) -> Result<SweepReport, SweepError> {
        let snapshot = index.snapshot(identity, client, bypass).await?;
        let now = self.clock.now();

        let mut hashes = Vec::new();
        for (key, _) in snapshot.buckets() {
            let entries = index.entries(&snapshot, key);
            let Some(winner) = elect(&entries) else {
                continue;
            };
            debug!(key, winner = %winner.torrent.name, "Elected canonical release");

            for torrent in removable(&entries, &winner.release, now, self.grace) {
                info!(hash = %torrent.hash, name = %torrent.name, "Queued for removal");
                hashes.push(torrent.hash);
            }
        }

        if hashes.is_empty() {
            return Ok(SweepReport::default());
        }

        if let Err(e) = client.remove_torrents(&hashes, true).await {
            warn!(attempted = hashes.len(), error = %e, "Bulk removal failed");
            return Err(SweepError::Removal {
                attempted: hashes.len(),
                source: e,
            });
        }

        metrics::SWEEP_REMOVALS.inc_by(hashes.len() as u64);
        index.invalidate(identity).await;
        Ok(SweepReport { removed: hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use crate::cache::{ManualClock, TtlCache};
    use crate::release::SceneParser;
    use crate::testing::MockTorrentClient;
    use crate::torrent_client::TorrentInfo;

    const GRACE: i64 = 1_209_600;

    fn setup() -> (TitleIndex, DedupSweeper, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let index = TitleIndex::new(
            Arc::new(SceneParser),
            TtlCache::new(
                NonZeroUsize::new(64).unwrap(),
                Duration::minutes(15),
                clock.clone(),
            ),
            Duration::minutes(5),
            clock.clone(),
        );
        let sweeper = DedupSweeper::new(Duration::seconds(GRACE), clock.clone());
        (index, sweeper, clock)
    }

    fn torrent(clock: &ManualClock, hash: &str, name: &str, age_secs: i64) -> TorrentInfo {
        TorrentInfo {
            completed_at: Some(clock.now() - Duration::seconds(age_secs)),
            ..TorrentInfo::new(hash, name)
        }
    }

    fn identity() -> ClientIdentity {
        ClientIdentity::new("http://qb", "admin", "secret")
    }

    #[tokio::test]
    async fn test_sweep_removes_superseded() {
        let (index, sweeper, clock) = setup();
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(torrent(&clock, "a", "Movie.2020.720p.BluRay.x264-GRP", GRACE * 2))
            .await;
        client
            .add_mock_torrent(torrent(&clock, "b", "Movie.2020.1080p.BluRay.x264-GRP", GRACE * 2))
            .await;
        client
            .add_mock_torrent(torrent(&clock, "c", "Other.2019.720p.WEB-DL-GRP", GRACE * 2))
            .await;

        let report = sweeper.sweep(&index, &identity(), &client, false).await.unwrap();
        assert_eq!(report.removed, vec!["a".to_string()]);
        assert_eq!(client.calls_for("remove").await[0].detail, "a|true");
        assert!(!client.has_torrent("a").await);
    }

    #[tokio::test]
    async fn test_sweep_nothing_eligible() {
        let (index, sweeper, clock) = setup();
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(torrent(&clock, "a", "Movie.2020.720p.BluRay.x264-GRP", 60))
            .await;
        client
            .add_mock_torrent(torrent(&clock, "b", "Movie.2020.1080p.BluRay.x264-GRP", GRACE * 2))
            .await;

        let report = sweeper.sweep(&index, &identity(), &client, false).await.unwrap();
        assert_eq!(report.count(), 0);
        assert_eq!(client.call_count("remove").await, 0);
    }

    #[tokio::test]
    async fn test_sweep_reports_attempted_count_on_failure() {
        let (index, sweeper, clock) = setup();
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(torrent(&clock, "a", "Movie.2020.720p.BluRay.x264-GRP", GRACE * 2))
            .await;
        client
            .add_mock_torrent(torrent(&clock, "b", "Movie.2020.1080p.BluRay.x264-GRP", GRACE * 2))
            .await;
        client.fail_operation("remove", 1).await;

        let result = sweeper.sweep(&index, &identity(), &client, false).await;
        assert!(matches!(result, Err(SweepError::Removal { attempted: 1, .. })));
    }
}
