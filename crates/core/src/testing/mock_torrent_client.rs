//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    AddTorrentOptions, Category, ClientFactory, ClientIdentity, TorrentClient, TorrentClientError,
    TorrentFileEntry, TorrentFilters, TorrentInfo, TorrentState, TrackerEntry,
};

/// A recorded client call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Operation name, e.g. `"resume"` or `"set_location"`.
    pub op: String,
    pub hash: Option<String>,
    /// Operation-specific detail (paths, flags).
    pub detail: String,
}

/// A recorded `add_torrent_file` call.
#[derive(Debug, Clone)]
pub struct RecordedAdd {
    pub options: AddTorrentOptions,
    /// Bytes read from the scratch file at submission time.
    pub data: Vec<u8>,
}

/// Torrent that the next `add_torrent_file` call will materialise.
#[derive(Debug, Clone)]
pub struct PendingAdd {
    pub info: TorrentInfo,
    pub files: Vec<TorrentFileEntry>,
    /// States reported by successive `get_torrent` calls.
    pub script: Vec<TorrentState>,
}

impl PendingAdd {
    pub fn new(info: TorrentInfo) -> Self {
        Self {
            info,
            files: Vec::new(),
            script: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<TorrentFileEntry>) -> Self {
        self.files = files;
        self
    }

    pub fn with_script(mut self, script: Vec<TorrentState>) -> Self {
        self.script = script;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    torrents: HashMap<String, TorrentInfo>,
    files: HashMap<String, Vec<TorrentFileEntry>>,
    trackers: HashMap<String, Vec<TrackerEntry>>,
    tags: HashMap<String, Vec<String>>,
    categories: HashMap<String, Category>,
    scripts: HashMap<String, VecDeque<TorrentState>>,
    pending_adds: VecDeque<PendingAdd>,
    added: Vec<RecordedAdd>,
    calls: Vec<RecordedCall>,
    /// Remaining forced failures per operation.
    failures: HashMap<String, u32>,
    next_error: Option<TorrentClientError>,
    hash_counter: u32,
    /// Sleep inside every listing, so concurrent callers overlap.
    list_delay: Option<std::time::Duration>,
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Pre-populated torrents, files, trackers and categories
/// - Scripted state sequences observed through `get_torrent`
/// - Per-operation failure injection
/// - Recorded calls for assertions
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client.add_mock_torrent(TorrentInfo::new("abc", "Show.S01E01.1080p.WEB-DL")).await;
/// client.script_states("abc", vec![TorrentState::CheckingUploading, TorrentState::StalledUploading]).await;
/// client.fail_operation("reannounce", 1).await;
/// ```
#[derive(Debug, Default)]
pub struct MockTorrentClient {
    state: Arc<RwLock<MockState>>,
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a torrent (for testing get/list operations).
    pub async fn add_mock_torrent(&self, info: TorrentInfo) {
        let mut state = self.state.write().await;
        state.torrents.insert(info.hash.clone(), info);
    }

    pub async fn set_files(&self, hash: &str, files: Vec<TorrentFileEntry>) {
        self.state.write().await.files.insert(hash.to_string(), files);
    }

    pub async fn set_trackers(&self, hash: &str, trackers: Vec<TrackerEntry>) {
        self.state
            .write()
            .await
            .trackers
            .insert(hash.to_string(), trackers);
    }

    pub async fn add_category(&self, name: &str, save_path: &str) {
        self.state.write().await.categories.insert(
            name.to_string(),
            Category {
                name: name.to_string(),
                save_path: save_path.to_string(),
            },
        );
    }

    /// States the torrent reports on successive `get_torrent` calls. Once the
    /// script runs out, the last applied state sticks until an action changes it.
    pub async fn script_states(&self, hash: &str, states: Vec<TorrentState>) {
        self.state
            .write()
            .await
            .scripts
            .insert(hash.to_string(), states.into());
    }

    /// Queue the torrent materialised by the next `add_torrent_file` call.
    pub async fn queue_add(&self, pending: PendingAdd) {
        self.state.write().await.pending_adds.push_back(pending);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        self.state.write().await.next_error = Some(error);
    }

    /// Hold every `list_torrents` call for `delay` before answering.
    pub async fn delay_listing(&self, delay: std::time::Duration) {
        self.state.write().await.list_delay = Some(delay);
    }

    /// Make `op` fail `times` times. `u32::MAX` fails forever.
    pub async fn fail_operation(&self, op: &str, times: u32) {
        self.state
            .write()
            .await
            .failures
            .insert(op.to_string(), times);
    }

    /// Recorded calls for one operation.
    pub async fn calls_for(&self, op: &str) -> Vec<RecordedCall> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    pub async fn call_count(&self, op: &str) -> usize {
        self.calls_for(op).await.len()
    }

    /// Get all recorded add_torrent_file calls.
    pub async fn added_torrents(&self) -> Vec<RecordedAdd> {
        self.state.read().await.added.clone()
    }

    /// Check if a torrent exists.
    pub async fn has_torrent(&self, hash: &str) -> bool {
        self.state.read().await.torrents.contains_key(hash)
    }

    /// Get the number of torrents.
    pub async fn torrent_count(&self) -> usize {
        self.state.read().await.torrents.len()
    }

    pub async fn torrent(&self, hash: &str) -> Option<TorrentInfo> {
        self.state.read().await.torrents.get(hash).cloned()
    }

    pub async fn files(&self, hash: &str) -> Vec<TorrentFileEntry> {
        self.state
            .read()
            .await
            .files
            .get(hash)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn tags(&self, hash: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .tags
            .get(hash)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn category(&self, name: &str) -> Option<Category> {
        self.state.read().await.categories.get(name).cloned()
    }

    /// Record the call and apply any injected failure.
    async fn enter(
        &self,
        op: &str,
        hash: Option<&str>,
        detail: impl Into<String>,
    ) -> Result<(), TorrentClientError> {
        let mut state = self.state.write().await;
        state.calls.push(RecordedCall {
            op: op.to_string(),
            hash: hash.map(str::to_string),
            detail: detail.into(),
        });

        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        if let Some(remaining) = state.failures.get_mut(op) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(TorrentClientError::ApiError(format!("injected {} failure", op)));
            }
        }
        Ok(())
    }

    /// Apply `f` to an existing torrent or report it missing.
    async fn update<F>(&self, hash: &str, f: F) -> Result<(), TorrentClientError>
    where
        F: FnOnce(&mut TorrentInfo),
    {
        let mut state = self.state.write().await;
        match state.torrents.get_mut(hash) {
            Some(torrent) => {
                f(torrent);
                Ok(())
            }
            None => Err(TorrentClientError::TorrentNotFound(hash.to_string())),
        }
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        self.enter("list", None, "").await?;

        let delay = self.state.read().await.list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.read().await;
        let mut result: Vec<TorrentInfo> = state
            .torrents
            .values()
            .filter(|t| filters.matches(t))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.hash.cmp(&b.hash));

        Ok(result)
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        self.enter("get", Some(hash), "").await?;

        let mut state = self.state.write().await;
        let next = state.scripts.get_mut(hash).and_then(|s| s.pop_front());
        let torrent = state
            .torrents
            .get_mut(hash)
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))?;
        if let Some(next) = next {
            torrent.state = next;
        }
        Ok(torrent.clone())
    }

    async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFileEntry>, TorrentClientError> {
        self.enter("files", Some(hash), "").await?;

        let state = self.state.read().await;
        if !state.torrents.contains_key(hash) {
            return Err(TorrentClientError::TorrentNotFound(hash.to_string()));
        }
        Ok(state.files.get(hash).cloned().unwrap_or_default())
    }

    async fn trackers(&self, hash: &str) -> Result<Vec<TrackerEntry>, TorrentClientError> {
        self.enter("trackers", Some(hash), "").await?;

        Ok(self
            .state
            .read()
            .await
            .trackers
            .get(hash)
            .cloned()
            .unwrap_or_default())
    }

    async fn categories(&self) -> Result<HashMap<String, Category>, TorrentClientError> {
        self.enter("categories", None, "").await?;
        Ok(self.state.read().await.categories.clone())
    }

    async fn create_category(&self, name: &str, save_path: &str) -> Result<(), TorrentClientError> {
        self.enter("create_category", None, format!("{}={}", name, save_path))
            .await?;
        self.add_category(name, save_path).await;
        Ok(())
    }

    async fn add_torrent_file(
        &self,
        path: &Path,
        options: &AddTorrentOptions,
    ) -> Result<(), TorrentClientError> {
        self.enter("add", None, path.display().to_string()).await?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;

        let mut state = self.state.write().await;
        state.added.push(RecordedAdd {
            options: options.clone(),
            data,
        });

        let pending = match state.pending_adds.pop_front() {
            Some(pending) => pending,
            None => {
                state.hash_counter += 1;
                let hash = format!("mockhash{:08x}", state.hash_counter);
                let mut info = TorrentInfo::new(hash, "upload");
                info.state = TorrentState::PausedUploading;
                PendingAdd::new(info)
            }
        };

        let mut info = pending.info;
        info.added_at = Some(Utc::now());
        info.category = options.category.clone().or(info.category);
        if let Some(save_path) = &options.save_path {
            info.save_path = save_path.clone();
            info.auto_managed = false;
        }

        let hash = info.hash.clone();
        state.tags.insert(hash.clone(), options.tags.clone());
        state.files.insert(hash.clone(), pending.files);
        if !pending.script.is_empty() {
            state.scripts.insert(hash.clone(), pending.script.into());
        }
        state.torrents.insert(hash, info);

        Ok(())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.enter("remove", None, format!("{}|{}", hashes.join(","), delete_files))
            .await?;

        let mut state = self.state.write().await;
        for hash in hashes {
            state.torrents.remove(hash);
            state.scripts.remove(hash);
        }
        Ok(())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.enter("pause", Some(hash), "").await?;
        self.update(hash, |t| {
            t.state = if t.is_complete() {
                TorrentState::PausedUploading
            } else {
                TorrentState::PausedDownloading
            };
        })
        .await
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.enter("resume", Some(hash), "").await?;
        self.update(hash, |t| {
            t.state = if t.is_complete() {
                TorrentState::StalledUploading
            } else {
                TorrentState::Downloading
            };
        })
        .await
    }

    async fn recheck_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.enter("recheck", Some(hash), "").await?;
        self.update(hash, |t| t.state = TorrentState::CheckingUploading)
            .await
    }

    async fn reannounce_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.enter("reannounce", Some(hash), "").await?;
        self.update(hash, |_| {}).await
    }

    async fn set_location(&self, hash: &str, location: &str) -> Result<(), TorrentClientError> {
        self.enter("set_location", Some(hash), location).await?;
        let location = location.to_string();
        self.update(hash, |t| t.save_path = location).await
    }

    async fn rename_file(
        &self,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), TorrentClientError> {
        self.enter("rename_file", Some(hash), format!("{} -> {}", old_path, new_path))
            .await?;

        let mut state = self.state.write().await;
        let file = state
            .files
            .get_mut(hash)
            .and_then(|files| files.iter_mut().find(|f| f.name == old_path))
            .ok_or_else(|| TorrentClientError::ApiError(format!("no such file: {}", old_path)))?;
        file.name = new_path.to_string();
        Ok(())
    }

    async fn set_auto_management(
        &self,
        hash: &str,
        enabled: bool,
    ) -> Result<(), TorrentClientError> {
        self.enter("set_auto_management", Some(hash), enabled.to_string())
            .await?;
        self.update(hash, |t| t.auto_managed = enabled).await
    }

    async fn set_force_start(&self, hash: &str, enabled: bool) -> Result<(), TorrentClientError> {
        self.enter("set_force_start", Some(hash), enabled.to_string())
            .await?;
        self.update(hash, |_| {}).await
    }

    async fn add_tags(&self, hash: &str, tags: &[String]) -> Result<(), TorrentClientError> {
        self.enter("add_tags", Some(hash), tags.join(",")).await?;
        let mut state = self.state.write().await;
        state
            .tags
            .entry(hash.to_string())
            .or_default()
            .extend(tags.iter().cloned());
        Ok(())
    }

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), TorrentClientError> {
        self.enter("set_category", Some(hash), category).await?;
        let category = category.to_string();
        self.update(hash, |t| t.category = Some(category)).await
    }
}

/// Client factory handing out one shared [`MockTorrentClient`].
#[derive(Debug)]
pub struct MockClientFactory {
    client: Arc<MockTorrentClient>,
    connects: AtomicUsize,
    fail: AtomicBool,
}

impl Default for MockClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::with_client(Arc::new(MockTorrentClient::new()))
    }

    pub fn with_client(client: Arc<MockTorrentClient>) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> Arc<MockTorrentClient> {
        Arc::clone(&self.client)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make subsequent connects fail with an authentication error.
    pub fn fail_connect(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn connect(
        &self,
        _identity: &ClientIdentity,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TorrentClientError::AuthenticationFailed(
                "mock refused login".to_string(),
            ));
        }
        Ok(self.client() as Arc<dyn TorrentClient>)
    }
}
