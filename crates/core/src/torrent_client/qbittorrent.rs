//! qBittorrent torrent client implementation (Web API v2).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{multipart, Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::pool::ClientIdentity;
use super::{
    AddTorrentOptions, Category, TorrentClient, TorrentClientError, TorrentFileEntry,
    TorrentFilters, TorrentInfo, TorrentState, TrackerEntry, TrackerStatus,
};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    /// Set once the cookie jar holds a valid session.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client for one identity.
    pub fn new(identity: &ClientIdentity, timeout_secs: u32) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&identity.host),
            username: identity.username.clone(),
            password: identity.password.clone(),
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Log in and store the session cookie. Exposed so callers can validate
    /// credentials eagerly.
    pub async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url);

        let params = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!(host = %self.base_url, "qBittorrent login successful");
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Send a request, logging in again once if the session expired.
    async fn send_authenticated<F>(&self, build: F) -> Result<String, TorrentClientError>
    where
        F: Fn() -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let response = build().send().await.map_err(map_send_error)?;

        let response = if response.status().as_u16() == 403 {
            warn!(host = %self.base_url, "qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;
            build().send().await.map_err(map_send_error)?
        } else {
            response
        };

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(TorrentClientError::TorrentNotFound(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    /// Make an authenticated GET request.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.send_authenticated(|| self.client.get(&url)).await
    }

    /// Make an authenticated POST request with form data.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.send_authenticated(|| self.client.post(&url).form(params))
            .await
    }

    /// Make an authenticated POST request with multipart data.
    ///
    /// Multipart bodies cannot be replayed, so there is no re-login retry.
    async fn post_multipart(
        &self,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }
        if body.contains("Fails.") {
            return Err(TorrentClientError::InvalidTorrent(
                "client rejected torrent".to_string(),
            ));
        }

        Ok(body)
    }

    async fn post_hash(&self, endpoint: &str, hash: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        self.post_form(endpoint, &[("hashes", &hash_lower)]).await?;
        Ok(())
    }
}

fn normalize_base_url(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn map_send_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, TorrentClientError> {
    serde_json::from_str(body)
        .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    completion_on: i64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    auto_tmm: bool,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            progress: self.progress,
            size_bytes: self.size.max(0) as u64,
            added_at: timestamp_to_datetime(self.added_on),
            completed_at: timestamp_to_datetime(self.completion_on),
            save_path: self.save_path,
            category: if self.category.is_empty() {
                None
            } else {
                Some(self.category)
            },
            auto_managed: self.auto_tmm,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QBFile {
    #[serde(default)]
    index: Option<u32>,
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    progress: f64,
}

#[derive(Debug, Deserialize)]
struct QBTracker {
    url: String,
    status: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct QBCategory {
    name: String,
    #[serde(default, rename = "savePath")]
    save_path: String,
}

/// Parse qBittorrent state string to TorrentState.
fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "allocating" => TorrentState::Downloading,
        "forcedDL" => TorrentState::ForcedDownloading,
        "metaDL" | "forcedMetaDL" => TorrentState::MetadataDownloading,
        "stalledDL" => TorrentState::StalledDownloading,
        "uploading" => TorrentState::Uploading,
        "forcedUP" => TorrentState::ForcedUploading,
        "stalledUP" => TorrentState::StalledUploading,
        "pausedDL" | "stoppedDL" => TorrentState::PausedDownloading,
        "pausedUP" | "stoppedUP" => TorrentState::PausedUploading,
        "queuedDL" | "queuedUP" => TorrentState::Queued,
        "checkingDL" => TorrentState::CheckingDownloading,
        "checkingUP" => TorrentState::CheckingUploading,
        "checkingResumeData" => TorrentState::CheckingResumeData,
        "moving" => TorrentState::Moving,
        "missingFiles" => TorrentState::MissingFiles,
        "error" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

/// Convert Unix timestamp to DateTime<Utc>.
fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let mut endpoint = "/api/v2/torrents/info".to_string();
        let mut query_parts = Vec::new();

        if !filters.hashes.is_empty() {
            let hashes: Vec<String> = filters.hashes.iter().map(|h| h.to_lowercase()).collect();
            query_parts.push(format!("hashes={}", hashes.join("|")));
        }

        if let Some(category) = &filters.category {
            query_parts.push(format!("category={}", urlencoding::encode(category)));
        }

        if !query_parts.is_empty() {
            endpoint.push('?');
            endpoint.push_str(&query_parts.join("&"));
        }

        let response = self.get(&endpoint).await?;
        let torrents: Vec<QBTorrentInfo> = parse_json(&response)?;

        Ok(torrents.into_iter().map(|t| t.into_torrent_info()).collect())
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        self.list_torrents(&TorrentFilters::hash(hash))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFileEntry>, TorrentClientError> {
        let endpoint = format!("/api/v2/torrents/files?hash={}", hash.to_lowercase());
        let response = self.get(&endpoint).await?;
        let files: Vec<QBFile> = parse_json(&response)?;

        Ok(files
            .into_iter()
            .enumerate()
            .map(|(position, f)| TorrentFileEntry {
                index: f.index.unwrap_or(position as u32),
                name: f.name,
                size: f.size.max(0) as u64,
                progress: f.progress,
            })
            .collect())
    }

    async fn trackers(&self, hash: &str) -> Result<Vec<TrackerEntry>, TorrentClientError> {
        let endpoint = format!("/api/v2/torrents/trackers?hash={}", hash.to_lowercase());
        let response = self.get(&endpoint).await?;
        let trackers: Vec<QBTracker> = parse_json(&response)?;

        Ok(trackers
            .into_iter()
            .map(|t| TrackerEntry {
                url: t.url,
                status: TrackerStatus::from_code(t.status),
                message: t.msg,
            })
            .collect())
    }

    async fn categories(&self) -> Result<HashMap<String, Category>, TorrentClientError> {
        let response = self.get("/api/v2/torrents/categories").await?;
        let categories: HashMap<String, QBCategory> = parse_json(&response)?;

        Ok(categories
            .into_iter()
            .map(|(key, c)| {
                (
                    key,
                    Category {
                        name: c.name,
                        save_path: c.save_path,
                    },
                )
            })
            .collect())
    }

    async fn create_category(&self, name: &str, save_path: &str) -> Result<(), TorrentClientError> {
        self.post_form(
            "/api/v2/torrents/createCategory",
            &[("category", name), ("savePath", save_path)],
        )
        .await?;
        Ok(())
    }

    async fn add_torrent_file(
        &self,
        path: &Path,
        options: &AddTorrentOptions,
    ) -> Result<(), TorrentClientError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.torrent".to_string());

        let file_part = multipart::Part::bytes(data)
            .file_name(filename)
            .mime_str("application/x-bittorrent")
            .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("torrents", file_part)
            .text("paused", options.paused.to_string())
            .text("stopped", options.paused.to_string())
            .text("skip_checking", options.skip_hash_check.to_string())
            .text("contentLayout", options.content_layout.as_str());

        if let Some(category) = &options.category {
            form = form.text("category", category.clone());
        }
        if !options.tags.is_empty() {
            form = form.text("tags", options.tags.join(","));
        }
        if let Some(save_path) = &options.save_path {
            form = form
                .text("savepath", save_path.clone())
                .text("autoTMM", "false");
        }

        self.post_multipart("/api/v2/torrents/add", form).await?;
        Ok(())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        let joined = hashes
            .iter()
            .map(|h| h.to_lowercase())
            .collect::<Vec<_>>()
            .join("|");
        let delete_str = if delete_files { "true" } else { "false" };

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &joined), ("deleteFiles", delete_str)],
        )
        .await?;

        Ok(())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.post_hash("/api/v2/torrents/pause", hash).await
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.post_hash("/api/v2/torrents/resume", hash).await
    }

    async fn recheck_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.post_hash("/api/v2/torrents/recheck", hash).await
    }

    async fn reannounce_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.post_hash("/api/v2/torrents/reannounce", hash).await
    }

    async fn set_location(&self, hash: &str, location: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        self.post_form(
            "/api/v2/torrents/setLocation",
            &[("hashes", &hash_lower), ("location", location)],
        )
        .await?;
        Ok(())
    }

    async fn rename_file(
        &self,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        self.post_form(
            "/api/v2/torrents/renameFile",
            &[
                ("hash", &hash_lower),
                ("oldPath", old_path),
                ("newPath", new_path),
            ],
        )
        .await?;
        Ok(())
    }

    async fn set_auto_management(
        &self,
        hash: &str,
        enabled: bool,
    ) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let enable = enabled.to_string();
        self.post_form(
            "/api/v2/torrents/setAutoManagement",
            &[("hashes", &hash_lower), ("enable", &enable)],
        )
        .await?;
        Ok(())
    }

    async fn set_force_start(&self, hash: &str, enabled: bool) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let value = enabled.to_string();
        self.post_form(
            "/api/v2/torrents/setForceStart",
            &[("hashes", &hash_lower), ("value", &value)],
        )
        .await?;
        Ok(())
    }

    async fn add_tags(&self, hash: &str, tags: &[String]) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let joined = tags.join(",");
        self.post_form(
            "/api/v2/torrents/addTags",
            &[("hashes", &hash_lower), ("tags", &joined)],
        )
        .await?;
        Ok(())
    }

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        self.post_form(
            "/api/v2/torrents/setCategory",
            &[("hashes", &hash_lower), ("category", category)],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_qb_state_downloading() {
        assert_eq!(parse_qb_state("downloading"), TorrentState::Downloading);
        assert_eq!(parse_qb_state("forcedDL"), TorrentState::ForcedDownloading);
        assert_eq!(parse_qb_state("metaDL"), TorrentState::MetadataDownloading);
        assert_eq!(parse_qb_state("stalledDL"), TorrentState::StalledDownloading);
    }

    #[test]
    fn test_parse_qb_state_seeding() {
        assert_eq!(parse_qb_state("uploading"), TorrentState::Uploading);
        assert_eq!(parse_qb_state("forcedUP"), TorrentState::ForcedUploading);
        assert_eq!(parse_qb_state("stalledUP"), TorrentState::StalledUploading);
    }

    #[test]
    fn test_parse_qb_state_paused() {
        assert_eq!(parse_qb_state("pausedDL"), TorrentState::PausedDownloading);
        assert_eq!(parse_qb_state("stoppedDL"), TorrentState::PausedDownloading);
        assert_eq!(parse_qb_state("pausedUP"), TorrentState::PausedUploading);
        assert_eq!(parse_qb_state("stoppedUP"), TorrentState::PausedUploading);
    }

    #[test]
    fn test_parse_qb_state_checking() {
        assert_eq!(parse_qb_state("checkingDL"), TorrentState::CheckingDownloading);
        assert_eq!(parse_qb_state("checkingUP"), TorrentState::CheckingUploading);
        assert_eq!(parse_qb_state("checkingResumeData"), TorrentState::CheckingResumeData);
        assert_eq!(parse_qb_state("moving"), TorrentState::Moving);
    }

    #[test]
    fn test_parse_qb_state_errors() {
        assert_eq!(parse_qb_state("error"), TorrentState::Error);
        assert_eq!(parse_qb_state("missingFiles"), TorrentState::MissingFiles);
        assert_eq!(parse_qb_state("something_else"), TorrentState::Unknown);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://qb:8080/"), "http://qb:8080");
        assert_eq!(normalize_base_url("127.0.0.1:8080"), "http://127.0.0.1:8080");
        assert_eq!(normalize_base_url("https://seedbox.example"), "https://seedbox.example");
    }

    #[test]
    fn test_timestamp_to_datetime() {
        let dt = timestamp_to_datetime(1703980800).unwrap();
        assert_eq!(dt.year(), 2023);

        assert!(timestamp_to_datetime(-1).is_none());
        assert!(timestamp_to_datetime(0).is_none());
    }

    #[test]
    fn test_qb_torrent_info_conversion() {
        let json = r#"[{
            "hash": "ABC123",
            "name": "Show.S01E01.1080p.WEB-DL-GRP",
            "state": "pausedDL",
            "progress": 0.5,
            "size": 1000000,
            "added_on": 1703980800,
            "completion_on": 0,
            "save_path": "/downloads",
            "category": "tv",
            "auto_tmm": true
        }]"#;

        let parsed: Vec<QBTorrentInfo> = parse_json(json).unwrap();
        let info = parsed.into_iter().next().unwrap().into_torrent_info();
        assert_eq!(info.hash, "abc123");
        assert_eq!(info.state, TorrentState::PausedDownloading);
        assert!((info.progress - 0.5).abs() < 0.001);
        assert_eq!(info.size_bytes, 1000000);
        assert!(info.added_at.is_some());
        assert!(info.completed_at.is_none());
        assert_eq!(info.category, Some("tv".to_string()));
        assert!(info.auto_managed);
    }

    #[test]
    fn test_qb_category_parsing() {
        let json = r#"{"tv": {"name": "tv", "savePath": "/data/tv"}}"#;
        let parsed: HashMap<String, QBCategory> = parse_json(json).unwrap();
        assert_eq!(parsed["tv"].save_path, "/data/tv");
    }

    #[test]
    fn test_qb_tracker_parsing() {
        let json = r#"[{"url": "** [DHT] **", "status": 0, "msg": ""},
                       {"url": "https://t.example/announce", "status": 4, "msg": "Unregistered torrent"}]"#;
        let parsed: Vec<QBTracker> = parse_json(json).unwrap();
        assert_eq!(TrackerStatus::from_code(parsed[1].status), TrackerStatus::NotWorking);
        assert_eq!(parsed[1].msg, "Unregistered torrent");
    }

    #[test]
    fn test_parse_json_error() {
        let result: Result<Vec<QBFile>, _> = parse_json("not json");
        assert!(matches!(result, Err(TorrentClientError::ApiError(_))));
    }
}
