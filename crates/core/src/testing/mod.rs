//! Testing utilities and mock implementations.
//!
//! This module provides a mock download client and client factory, allowing
//! the classifier, sweeps and reconciler to be exercised end to end without a
//! running qBittorrent.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedwarden_core::testing::{fixtures, MockTorrentClient, PendingAdd};
//!
//! let client = MockTorrentClient::new();
//! client.add_mock_torrent(fixtures::seeding("abc", "Show.S01E01.1080p.WEB-DL-GRP")).await;
//! client.queue_add(PendingAdd::new(fixtures::paused_download("def", "Show.S01E01.1080p.WEB-DL-GRP", 0.95))).await;
//! ```

mod mock_torrent_client;

pub use mock_torrent_client::{
    MockClientFactory, MockTorrentClient, PendingAdd, RecordedAdd, RecordedCall,
};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::torrent_client::{
        ClientIdentity, TorrentFileEntry, TorrentInfo, TorrentState, TrackerEntry, TrackerStatus,
    };

    /// Identity used by tests that do not care about credentials.
    pub fn identity() -> ClientIdentity {
        ClientIdentity::new("http://qbittorrent.local:8080", "admin", "adminadmin")
    }

    /// A complete, seeding torrent.
    pub fn seeding(hash: &str, name: &str) -> TorrentInfo {
        TorrentInfo::new(hash, name)
    }

    /// A complete torrent that finished at `completed_at`.
    pub fn completed_at(hash: &str, name: &str, completed_at: DateTime<Utc>) -> TorrentInfo {
        TorrentInfo {
            completed_at: Some(completed_at),
            ..TorrentInfo::new(hash, name)
        }
    }

    /// A torrent still downloading at `progress`.
    pub fn downloading(hash: &str, name: &str, progress: f64) -> TorrentInfo {
        TorrentInfo {
            state: TorrentState::Downloading,
            progress,
            ..TorrentInfo::new(hash, name)
        }
    }

    /// A freshly added torrent paused below full progress.
    pub fn paused_download(hash: &str, name: &str, progress: f64) -> TorrentInfo {
        TorrentInfo {
            state: TorrentState::PausedDownloading,
            progress,
            ..TorrentInfo::new(hash, name)
        }
    }

    /// A file entry with the given progress.
    pub fn file(index: u32, name: &str, progress: f64) -> TorrentFileEntry {
        TorrentFileEntry {
            index,
            name: name.to_string(),
            size: 1024 * 1024 * 700,
            progress,
        }
    }

    /// A tracker entry.
    pub fn tracker(status: TrackerStatus, message: &str) -> TrackerEntry {
        TrackerEntry {
            url: "https://tracker.example.org/announce".to_string(),
            status,
            message: message.to_string(),
        }
    }
}
