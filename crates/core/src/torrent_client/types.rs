//! Types for torrent client operations.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lifecycle state of a torrent as reported by the client.
///
/// Mirrors the qBittorrent state strings; the reconciler branches on the
/// distinction between paused-complete and paused-incomplete, so these are not
/// collapsed into coarser buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    Downloading,
    ForcedDownloading,
    MetadataDownloading,
    StalledDownloading,
    Uploading,
    ForcedUploading,
    StalledUploading,
    PausedDownloading,
    PausedUploading,
    Queued,
    CheckingDownloading,
    CheckingUploading,
    CheckingResumeData,
    Moving,
    MissingFiles,
    Error,
    Unknown,
}

impl TorrentState {
    /// Returns the qBittorrent wire string for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::ForcedDownloading => "forcedDL",
            TorrentState::MetadataDownloading => "metaDL",
            TorrentState::StalledDownloading => "stalledDL",
            TorrentState::Uploading => "uploading",
            TorrentState::ForcedUploading => "forcedUP",
            TorrentState::StalledUploading => "stalledUP",
            TorrentState::PausedDownloading => "pausedDL",
            TorrentState::PausedUploading => "pausedUP",
            TorrentState::Queued => "queued",
            TorrentState::CheckingDownloading => "checkingDL",
            TorrentState::CheckingUploading => "checkingUP",
            TorrentState::CheckingResumeData => "checkingResumeData",
            TorrentState::Moving => "moving",
            TorrentState::MissingFiles => "missingFiles",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }

    /// The client is verifying or moving data.
    pub fn is_checking(&self) -> bool {
        matches!(
            self,
            TorrentState::CheckingDownloading
                | TorrentState::CheckingUploading
                | TorrentState::CheckingResumeData
                | TorrentState::Moving
        )
    }

    /// Seeding-equivalent states.
    pub fn is_seeding(&self) -> bool {
        matches!(
            self,
            TorrentState::Uploading | TorrentState::ForcedUploading | TorrentState::StalledUploading
        )
    }

    /// Active-download-equivalent states.
    pub fn is_downloading(&self) -> bool {
        matches!(
            self,
            TorrentState::Downloading | TorrentState::StalledDownloading
        )
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            TorrentState::PausedDownloading | TorrentState::PausedUploading
        )
    }

    /// States in which a freshly submitted torrent may sit before it has
    /// been confirmed, used to discover its hash by name.
    pub fn is_unsettled(&self) -> bool {
        self.is_paused()
            || self.is_checking()
            || matches!(self, TorrentState::MissingFiles | TorrentState::Error)
    }
}

/// Snapshot of a torrent as listed by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// When the torrent was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// When the torrent completed downloading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Save path on disk.
    pub save_path: String,
    /// Category/label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Automatic torrent management enabled.
    pub auto_managed: bool,
}

impl TorrentInfo {
    /// Minimal snapshot, mostly useful for tests and fixtures.
    pub fn new(hash: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            name: name.into(),
            state: TorrentState::StalledUploading,
            progress: 1.0,
            size_bytes: 0,
            added_at: None,
            completed_at: None,
            save_path: String::new(),
            category: None,
            auto_managed: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// A single file inside a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFileEntry {
    pub index: u32,
    /// Path relative to the save path.
    pub name: String,
    pub size: u64,
    pub progress: f64,
}

impl TorrentFileEntry {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Tracker status as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStatus {
    Disabled,
    NotContacted,
    Working,
    Updating,
    NotWorking,
}

impl TrackerStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TrackerStatus::Disabled,
            2 => TrackerStatus::Working,
            3 => TrackerStatus::Updating,
            4 => TrackerStatus::NotWorking,
            _ => TrackerStatus::NotContacted,
        }
    }
}

/// A tracker attached to a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub url: String,
    pub status: TrackerStatus,
    pub message: String,
}

/// A client-side category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub save_path: String,
}

/// How the client lays out files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentLayout {
    #[default]
    Original,
    Subfolder,
    NoSubfolder,
}

impl ContentLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLayout::Original => "Original",
            ContentLayout::Subfolder => "Subfolder",
            ContentLayout::NoSubfolder => "NoSubfolder",
        }
    }
}

/// Options for adding a torrent from a `.torrent` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddTorrentOptions {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub paused: bool,
    pub skip_hash_check: bool,
    pub content_layout: ContentLayout,
    /// Explicit save path; disables automatic management for the torrent.
    pub save_path: Option<String>,
}

/// Filters for listing torrents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentFilters {
    /// Restrict to these hashes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<String>,
    /// Filter by category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TorrentFilters {
    pub fn hash(hash: impl Into<String>) -> Self {
        Self {
            hashes: vec![hash.into()],
            category: None,
        }
    }

    /// Check if any filters are set.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty() && self.category.is_none()
    }

    /// Whether a snapshot passes these filters.
    pub fn matches(&self, torrent: &TorrentInfo) -> bool {
        let hash_ok = self.hashes.is_empty()
            || self
                .hashes
                .iter()
                .any(|h| h.eq_ignore_ascii_case(&torrent.hash));
        let category_ok = match &self.category {
            Some(category) => torrent.category.as_deref() == Some(category.as_str()),
            None => true,
        };
        hash_ok && category_ok
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List torrents, optionally filtered.
    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Get a specific torrent by hash.
    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError>;

    /// File listing of a torrent.
    async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFileEntry>, TorrentClientError>;

    /// Trackers of a torrent.
    async fn trackers(&self, hash: &str) -> Result<Vec<TrackerEntry>, TorrentClientError>;

    /// All categories, keyed by name.
    async fn categories(&self) -> Result<HashMap<String, Category>, TorrentClientError>;

    async fn create_category(&self, name: &str, save_path: &str) -> Result<(), TorrentClientError>;

    /// Add a torrent from a `.torrent` file on disk.
    async fn add_torrent_file(
        &self,
        path: &Path,
        options: &AddTorrentOptions,
    ) -> Result<(), TorrentClientError>;

    /// Remove torrents in one call.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), TorrentClientError>;

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Recheck/verify torrent files.
    async fn recheck_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    async fn reannounce_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Move the torrent's data to a new save path.
    async fn set_location(&self, hash: &str, location: &str) -> Result<(), TorrentClientError>;

    async fn rename_file(
        &self,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), TorrentClientError>;

    async fn set_auto_management(&self, hash: &str, enabled: bool)
        -> Result<(), TorrentClientError>;

    async fn set_force_start(&self, hash: &str, enabled: bool) -> Result<(), TorrentClientError>;

    async fn add_tags(&self, hash: &str, tags: &[String]) -> Result<(), TorrentClientError>;

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), TorrentClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torrent_state_as_str() {
        assert_eq!(TorrentState::Downloading.as_str(), "downloading");
        assert_eq!(TorrentState::StalledUploading.as_str(), "stalledUP");
        assert_eq!(TorrentState::PausedDownloading.as_str(), "pausedDL");
        assert_eq!(TorrentState::PausedUploading.as_str(), "pausedUP");
        assert_eq!(TorrentState::CheckingResumeData.as_str(), "checkingResumeData");
        assert_eq!(TorrentState::MissingFiles.as_str(), "missingFiles");
        assert_eq!(TorrentState::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_torrent_state_predicates() {
        assert!(TorrentState::Moving.is_checking());
        assert!(TorrentState::CheckingUploading.is_checking());
        assert!(!TorrentState::PausedDownloading.is_checking());

        assert!(TorrentState::ForcedUploading.is_seeding());
        assert!(TorrentState::StalledDownloading.is_downloading());
        assert!(!TorrentState::ForcedDownloading.is_downloading());

        assert!(TorrentState::PausedDownloading.is_unsettled());
        assert!(TorrentState::MissingFiles.is_unsettled());
        assert!(!TorrentState::Uploading.is_unsettled());
    }

    #[test]
    fn test_torrent_state_serialization() {
        assert_eq!(
            serde_json::to_string(&TorrentState::PausedDownloading).unwrap(),
            "\"paused_downloading\""
        );
    }

    #[test]
    fn test_tracker_status_from_code() {
        assert_eq!(TrackerStatus::from_code(0), TrackerStatus::Disabled);
        assert_eq!(TrackerStatus::from_code(1), TrackerStatus::NotContacted);
        assert_eq!(TrackerStatus::from_code(2), TrackerStatus::Working);
        assert_eq!(TrackerStatus::from_code(4), TrackerStatus::NotWorking);
    }

    #[test]
    fn test_torrent_filters() {
        let torrent = TorrentInfo {
            category: Some("movies".to_string()),
            ..TorrentInfo::new("ABC", "Movie")
        };

        assert!(TorrentFilters::default().is_empty());
        assert!(TorrentFilters::default().matches(&torrent));
        assert!(TorrentFilters::hash("abc").matches(&torrent));
        assert!(!TorrentFilters::hash("def").matches(&torrent));

        let by_category = TorrentFilters {
            category: Some("tv".to_string()),
            ..Default::default()
        };
        assert!(!by_category.is_empty());
        assert!(!by_category.matches(&torrent));
    }

    #[test]
    fn test_content_layout_as_str() {
        assert_eq!(ContentLayout::default().as_str(), "Original");
        assert_eq!(ContentLayout::NoSubfolder.as_str(), "NoSubfolder");
    }
}
