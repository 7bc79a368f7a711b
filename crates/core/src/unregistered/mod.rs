//! Unregistered sweep.
//!
//! Trackers report why they reject an announce in a free-text message. A
//! torrent whose tracker says it was deleted, trumped or never registered is
//! removed from the client (data kept, it may back other torrents). Torrents
//! with no working tracker are re-announced.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::index::{IndexError, TitleIndex};
use crate::metrics;
use crate::torrent_client::{
    ClientIdentity, TorrentClient, TorrentInfo, TrackerEntry, TrackerStatus,
};

/// Tracker listings fetched at once.
const TRACKER_FETCH_CONCURRENCY: usize = 8;

/// Lower-case fragments of tracker messages meaning the torrent is gone.
pub const DEAD_TRACKER_PHRASES: &[&str] = &[
    "unregistered",
    "not registered",
    "not found",
    "not exist",
    "unknown",
    "uploaded",
    "upgraded",
    "season pack",
    "packs are available",
    "pack is available",
    "internal available",
    "season pack out",
    "dead",
    "dupe",
    "complete season uploaded",
    "problem with",
    "specifically banned",
    "trumped",
    "i'm sorry dave, i can't do that",
];

/// Tracker health of one torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerVerdict {
    /// A tracker reported the torrent as gone.
    Dead(String),
    Alive,
    /// No tracker is working.
    Silent,
}

/// Judge a torrent's tracker list. Disabled entries (DHT, PeX, LSD) and
/// trackers that were never contacted or are mid-update are ignored.
pub fn judge(trackers: &[TrackerEntry]) -> TrackerVerdict {
    let mut alive = false;
    for tracker in trackers {
        match tracker.status {
            TrackerStatus::Working => alive = true,
            TrackerStatus::NotWorking => {}
            _ => continue,
        }

        let message = tracker.message.to_lowercase();
        if DEAD_TRACKER_PHRASES.iter().any(|p| message.contains(p)) {
            return TrackerVerdict::Dead(tracker.message.clone());
        }
    }

    if alive {
        TrackerVerdict::Alive
    } else {
        TrackerVerdict::Silent
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UnregisteredReport {
    pub deleted: Vec<String>,
    pub reannounced: Vec<String>,
}

impl UnregisteredReport {
    pub fn count(&self) -> usize {
        self.deleted.len()
    }
}

/// Walk every torrent of an identity and act on its tracker verdict.
pub async fn sweep_unregistered(
    index: &TitleIndex,
    identity: &ClientIdentity,
    client: &dyn TorrentClient,
    bypass: bool,
) -> Result<UnregisteredReport, IndexError> {
    let snapshot = index.snapshot(identity, client, bypass).await?;
    let mut report = UnregisteredReport::default();

    let torrents: Vec<&TorrentInfo> = snapshot.torrents().filter(|t| !t.hash.is_empty()).collect();
    let mut fetches = Vec::with_capacity(torrents.len());
    for torrent in torrents {
        fetches.push(async move {
            let trackers = match client.trackers(&torrent.hash).await {
                Ok(trackers) => trackers,
                Err(e) => {
                    debug!(hash = %torrent.hash, error = %e, "Tracker listing failed");
                    Vec::new()
                }
            };
            (torrent, judge(&trackers))
        });
    }
    let verdicts: Vec<(&TorrentInfo, TrackerVerdict)> = stream::iter(fetches)
    .buffered(TRACKER_FETCH_CONCURRENCY)
    .collect()
    .await;

    for (torrent, verdict) in verdicts {
        match verdict {
            TrackerVerdict::Dead(message) => {
                let hashes = [torrent.hash.clone()];
                match client.remove_torrents(&hashes, false).await {
                    Ok(()) => {
                        info!(hash = %torrent.hash, name = %torrent.name, message = %message, "Removed unregistered torrent");
                        metrics::UNREGISTERED_DELETIONS.inc();
                        report.deleted.push(torrent.hash.clone());
                    }
                    Err(e) => {
                        warn!(hash = %torrent.hash, error = %e, "Failed to remove unregistered torrent")
                    }
                }
            }
            TrackerVerdict::Silent => {
                if let Err(e) = client.reannounce_torrent(&torrent.hash).await {
                    debug!(hash = %torrent.hash, error = %e, "Reannounce failed");
                }
                report.reannounced.push(torrent.hash.clone());
            }
            TrackerVerdict::Alive => {}
        }
    }

    if !report.deleted.is_empty() {
        index.invalidate(identity).await;
    }
    Ok(report)
}
