//! Cross-seed job: submission, convergence and managed replacement.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReconcileConfig;
use crate::index::Entry;
use crate::metrics;
use crate::release::Release;
use crate::torrent_client::{
    AddTorrentOptions, ContentLayout, TorrentClient, TorrentFileEntry, TorrentFilters,
    TorrentInfo,
};

use super::{transition, ReconcileError, RetryPolicy, Step};

/// A torrent offered as a cross-seed of something already held.
#[derive(Debug, Clone)]
pub struct CrossSeedRequest {
    pub name: String,
    /// Info-hash, when the caller knows it.
    pub hash: Option<String>,
    pub release: Arc<Release>,
    /// Raw `.torrent` bytes.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The client reported a seeding or downloading state.
    Converged,
    /// Paused below 100% although every file was complete; resumed.
    StaleProgress,
    /// Re-added into a scratch directory and relocated over the existing data.
    Replaced,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Converged => "converged",
            OutcomeKind::StaleProgress => "stale_progress",
            OutcomeKind::Replaced => "replaced",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossSeedOutcome {
    pub kind: OutcomeKind,
    /// Hash of the new entry.
    pub hash: String,
    /// Hash of the held torrent whose data is shared.
    pub matched: String,
}

/// Mutable progress of one job.
#[derive(Debug)]
struct Job<'a> {
    name: &'a str,
    hash: Option<String>,
    matched_hash: &'a str,
    payload: &'a [u8],
    options: AddTorrentOptions,
}

/// Runs cross-seed jobs against a torrent client.
#[derive(Debug, Clone)]
pub struct Reconciler {
    floor: f64,
    submit: RetryPolicy,
    converge: RetryPolicy,
    max_checking_polls: u32,
    tag: String,
    category_suffix: String,
    scratch_subdir: String,
    confirm_stale_progress: bool,
}

impl Reconciler {
    pub fn new(config: &ReconcileConfig) -> Self {
        let base = Duration::from_millis(config.base_delay_ms);
        let jitter = Duration::from_millis(config.max_jitter_ms);
        Self {
            floor: config.completeness_floor,
            submit: RetryPolicy::new(config.submit_attempts, base, jitter),
            converge: RetryPolicy::new(config.converge_attempts, base, jitter),
            max_checking_polls: config.max_checking_polls,
            tag: config.tag.clone(),
            category_suffix: config.category_suffix.clone(),
            scratch_subdir: config.scratch_subdir.clone(),
            confirm_stale_progress: config.confirm_stale_progress,
        }
    }

    /// Replace both retry policies, keeping their attempt budgets.
    pub fn with_pacing(mut self, base_delay: Duration, max_jitter: Duration) -> Self {
        self.submit = RetryPolicy::new(self.submit.attempts, base_delay, max_jitter);
        self.converge = RetryPolicy::new(self.converge.attempts, base_delay, max_jitter);
        self
    }

    /// Attach `request` to the first complete exact duplicate in `bucket`
    /// and drive the new entry to a seeding state.
    ///
    /// On any failure after submission the new entry is deleted once,
    /// keeping its data.
    pub async fn cross_seed(
        &self,
        client: &dyn TorrentClient,
        request: &CrossSeedRequest,
        bucket: &[Entry],
    ) -> Result<CrossSeedOutcome, ReconcileError> {
        let started = Instant::now();
        let result = self.run(client, request, bucket).await;

        let label = match &result {
            Ok(outcome) => outcome.kind.as_str().to_string(),
            Err(e) => e.code().to_string(),
        };
        metrics::RECONCILE_OUTCOMES
            .with_label_values(&[label.as_str()])
            .inc();
        metrics::RECONCILE_DURATION
            .with_label_values(&[label.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => info!(
                name = %request.name,
                hash = %outcome.hash,
                outcome = outcome.kind.as_str(),
                "Cross-seed converged"
            ),
            Err(e) => warn!(name = %request.name, code = e.code(), error = %e, "Cross-seed failed"),
        }
        result
    }

    async fn run(
        &self,
        client: &dyn TorrentClient,
        request: &CrossSeedRequest,
        bucket: &[Entry],
    ) -> Result<CrossSeedOutcome, ReconcileError> {
        if bucket.is_empty() {
            return Err(ReconcileError::NotCrossSubmission);
        }

        let matches = bucket
            .iter()
            .filter(|e| *e.release == *request.release && e.torrent.progress >= 1.0);

        for matched in matches {
            let matched_files = match client.torrent_files(&matched.torrent.hash).await {
                Ok(files) => files,
                Err(e) => {
                    warn!(hash = %matched.torrent.hash, error = %e, "Skipping match without file listing");
                    continue;
                }
            };

            let options = self.options_for(client, &matched.torrent, &matched_files).await?;
            self.submit(client, &request.payload, &options).await?;

            let mut job = Job {
                name: &request.name,
                hash: request.hash.clone(),
                matched_hash: &matched.torrent.hash,
                payload: &request.payload,
                options,
            };

            return match self.converge(client, &mut job, &matched_files).await {
                Ok(kind) => Ok(CrossSeedOutcome {
                    kind,
                    hash: job.hash.unwrap_or_default(),
                    matched: matched.torrent.hash.clone(),
                }),
                Err(e) => {
                    self.discard(client, &job).await;
                    Err(e)
                }
            };
        }

        Err(ReconcileError::NoCompleteMatch)
    }

    // =========================================================================
    // Phase 1: layout and category
    // =========================================================================

    async fn options_for(
        &self,
        client: &dyn TorrentClient,
        matched: &TorrentInfo,
        matched_files: &[TorrentFileEntry],
    ) -> Result<AddTorrentOptions, ReconcileError> {
        let content_layout = match matched_files.first() {
            Some(file) if file.name.starts_with(&matched.name) => ContentLayout::Subfolder,
            _ => ContentLayout::NoSubfolder,
        };

        let mut category = matched.category.clone().unwrap_or_default();
        if !category.is_empty() && !category.ends_with(&self.category_suffix) {
            let categories = client
                .categories()
                .await
                .map_err(ReconcileError::CategoryLookup)?;

            if let Some(existing) = categories.get(&category) {
                let save_path = if existing.save_path.is_empty() {
                    category.clone()
                } else {
                    existing.save_path.clone()
                };
                let derived = format!("{}{}", category, self.category_suffix);
                if !categories.contains_key(&derived) {
                    debug!(category = %derived, save_path = %save_path, "Creating cross-seed category");
                    client
                        .create_category(&derived, &save_path)
                        .await
                        .map_err(|source| ReconcileError::CategoryCreate {
                            category: derived.clone(),
                            source,
                        })?;
                }
                category = derived;
            }
        }

        Ok(AddTorrentOptions {
            category: (!category.is_empty()).then_some(category),
            tags: vec![self.tag.clone()],
            paused: true,
            skip_hash_check: true,
            content_layout,
            save_path: None,
        })
    }

    // =========================================================================
    // Phase 2: submission
    // =========================================================================

    async fn submit(
        &self,
        client: &dyn TorrentClient,
        payload: &[u8],
        options: &AddTorrentOptions,
    ) -> Result<(), ReconcileError> {
        let mut last_error = String::new();
        for attempt in 1..=self.submit.attempts {
            metrics::RECONCILE_ATTEMPTS.with_label_values(&["submit"]).inc();
            match submit_once(client, payload, options).await {
                Ok(()) => return Ok(()),
                Err(message) => {
                    warn!(attempt, error = %message, "Submission attempt failed");
                    last_error = message;
                    if attempt < self.submit.attempts {
                        self.submit.pause().await;
                    }
                }
            }
        }

        Err(ReconcileError::SubmitFailed {
            attempts: self.submit.attempts,
            message: last_error,
        })
    }

    // =========================================================================
    // Phase 3: convergence
    // =========================================================================

    async fn converge(
        &self,
        client: &dyn TorrentClient,
        job: &mut Job<'_>,
        matched_files: &[TorrentFileEntry],
    ) -> Result<OutcomeKind, ReconcileError> {
        let mut attempts = 0;
        let mut checking_polls = 0;

        loop {
            let error = match self.step(client, job, matched_files).await {
                Ok(kind) => return Ok(kind),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if let ReconcileError::StillChecking(state) = &error {
                metrics::RECONCILE_ATTEMPTS.with_label_values(&["checking"]).inc();
                checking_polls += 1;
                if checking_polls >= self.max_checking_polls {
                    return Err(error);
                }
                debug!(state = state.as_str(), polls = checking_polls, "Waiting on check");
            } else {
                metrics::RECONCILE_ATTEMPTS.with_label_values(&["converge"]).inc();
                attempts += 1;
                if attempts >= self.converge.attempts {
                    return Err(error);
                }
                debug!(attempt = attempts, code = error.code(), error = %error, "Not converged yet");
            }

            self.converge.pause().await;
        }
    }

    async fn step(
        &self,
        client: &dyn TorrentClient,
        job: &mut Job<'_>,
        matched_files: &[TorrentFileEntry],
    ) -> Result<OutcomeKind, ReconcileError> {
        let torrent = locate(client, job).await?;

        match transition(torrent.state, torrent.progress, self.floor) {
            Step::Announce => {
                reannounce(client, &torrent.hash).await;
                Ok(OutcomeKind::Converged)
            }
            Step::Recheck => {
                if let Err(e) = client.recheck_torrent(&torrent.hash).await {
                    warn!(hash = %torrent.hash, error = %e, "Recheck request failed");
                }
                Err(ReconcileError::Rechecking)
            }
            Step::Resume => {
                client
                    .resume_torrent(&torrent.hash)
                    .await
                    .map_err(ReconcileError::ResumeFailed)?;
                Err(ReconcileError::PausedUp)
            }
            Step::Abort => Err(ReconcileError::DataMismatch {
                progress: torrent.progress,
            }),
            Step::InspectFiles => self.inspect(client, job, &torrent, matched_files).await,
            Step::WaitChecking => Err(ReconcileError::StillChecking(torrent.state)),
            Step::Continue => Err(ReconcileError::NotConverged(torrent.state)),
        }
    }

    /// Paused download above the floor: resume when the files are all there,
    /// otherwise replace the entry so the client re-derives the missing parts.
    async fn inspect(
        &self,
        client: &dyn TorrentClient,
        job: &Job<'_>,
        torrent: &TorrentInfo,
        matched_files: &[TorrentFileEntry],
    ) -> Result<OutcomeKind, ReconcileError> {
        let mut files = client
            .torrent_files(&torrent.hash)
            .await
            .map_err(ReconcileError::FilesUnavailable)?;

        if files.iter().all(TorrentFileEntry::is_complete) && self.confirm_stale_progress {
            files = client
                .torrent_files(&torrent.hash)
                .await
                .map_err(ReconcileError::FilesUnavailable)?;
        }

        if files.iter().all(TorrentFileEntry::is_complete) {
            client
                .resume_torrent(&torrent.hash)
                .await
                .map_err(ReconcileError::ResumeValidFailed)?;
            reannounce(client, &torrent.hash).await;
            return Ok(OutcomeKind::StaleProgress);
        }

        self.replace(client, job, torrent, &files, matched_files).await
    }

    // =========================================================================
    // Managed replacement
    // =========================================================================

    async fn replace(
        &self,
        client: &dyn TorrentClient,
        job: &Job<'_>,
        torrent: &TorrentInfo,
        files: &[TorrentFileEntry],
        matched_files: &[TorrentFileEntry],
    ) -> Result<OutcomeKind, ReconcileError> {
        let hash = torrent.hash.clone();
        let original_path = torrent.save_path.clone();
        let auto_managed = torrent.auto_managed;
        info!(hash = %hash, save_path = %original_path, "Replacing partial cross-seed");

        client
            .remove_torrents(std::slice::from_ref(&hash), false)
            .await
            .map_err(ReconcileError::DeleteFailed)?;

        let mut options = job.options.clone();
        options.save_path = Some(scratch_path(&original_path, &self.scratch_subdir));
        if let Err(message) = submit_once(client, job.payload, &options).await {
            if let Err(e) = client
                .remove_torrents(std::slice::from_ref(&hash), false)
                .await
            {
                debug!(hash = %hash, error = %e, "Nothing to clean after failed resubmission");
            }
            return Err(ReconcileError::ResubmitFailed(message));
        }

        let current = self.await_check(client, &hash).await?;

        for file in files.iter().filter(|f| !f.is_complete()) {
            if !matched_files.iter().any(|m| m.name == file.name) {
                continue;
            }
            let renamed = collision_free_name(&file.name, &hash);
            if let Err(e) = client.rename_file(&hash, &file.name, &renamed).await {
                warn!(hash = %hash, file = %file.name, error = %e, "Rename failed");
            }
        }

        client
            .set_location(&hash, &original_path)
            .await
            .map_err(ReconcileError::RelocateFailed)?;

        if current.auto_managed != auto_managed {
            client
                .set_auto_management(&hash, auto_managed)
                .await
                .map_err(ReconcileError::AutoManagementFailed)?;
        }

        client
            .recheck_torrent(&hash)
            .await
            .map_err(ReconcileError::RecheckFailed)?;
        client
            .resume_torrent(&hash)
            .await
            .map_err(ReconcileError::FinalResumeFailed)?;
        reannounce(client, &hash).await;

        Ok(OutcomeKind::Replaced)
    }

    /// Poll the resubmitted entry until it leaves the checking states.
    async fn await_check(
        &self,
        client: &dyn TorrentClient,
        hash: &str,
    ) -> Result<TorrentInfo, ReconcileError> {
        for poll in 0..self.max_checking_polls {
            match client.get_torrent(hash).await {
                Ok(torrent) if !torrent.state.is_checking() => return Ok(torrent),
                Ok(torrent) => debug!(hash, poll, state = torrent.state.as_str(), "Still checking"),
                Err(e) => debug!(hash, poll, error = %e, "Resubmitted entry not visible yet"),
            }
            metrics::RECONCILE_ATTEMPTS.with_label_values(&["checking"]).inc();
            self.converge.pause().await;
        }

        Err(ReconcileError::ResubmitFailed(format!(
            "entry did not settle after {} checking polls",
            self.max_checking_polls
        )))
    }

    async fn discard(&self, client: &dyn TorrentClient, job: &Job<'_>) {
        let Some(hash) = &job.hash else {
            debug!(name = job.name, "No hash known for failed job, nothing to discard");
            return;
        };
        if let Err(e) = client
            .remove_torrents(std::slice::from_ref(hash), false)
            .await
        {
            warn!(hash = %hash, error = %e, "Failed to discard unconverged entry");
        }
    }
}

/// Write the payload to a scratch file and hand it to the client.
/// The file is deleted when the handle drops.
async fn submit_once(
    client: &dyn TorrentClient,
    payload: &[u8],
    options: &AddTorrentOptions,
) -> Result<(), String> {
    let mut file = tempfile::Builder::new()
        .prefix("seedwarden-")
        .suffix(".torrent")
        .tempfile()
        .map_err(|e| e.to_string())?;
    file.write_all(payload).map_err(|e| e.to_string())?;
    file.flush().map_err(|e| e.to_string())?;

    client
        .add_torrent_file(file.path(), options)
        .await
        .map_err(|e| e.to_string())
}

/// Find the new entry, by hash when known, else by name among entries in a
/// just-added state. The matched torrent itself is never taken.
async fn locate(
    client: &dyn TorrentClient,
    job: &mut Job<'_>,
) -> Result<TorrentInfo, ReconcileError> {
    if let Some(hash) = &job.hash {
        return client
            .get_torrent(hash)
            .await
            .map_err(|e| ReconcileError::NotFound(e.to_string()));
    }

    let torrents = client
        .list_torrents(&TorrentFilters::default())
        .await
        .map_err(|e| ReconcileError::NotFound(e.to_string()))?;

    let found = torrents.into_iter().find(|t| {
        t.name == job.name && t.hash != job.matched_hash && t.state.is_unsettled()
    });

    match found {
        Some(torrent) => {
            debug!(name = job.name, hash = %torrent.hash, "Discovered hash by name");
            job.hash = Some(torrent.hash.clone());
            Ok(torrent)
        }
        None => Err(ReconcileError::NotFound(job.name.to_string())),
    }
}

async fn reannounce(client: &dyn TorrentClient, hash: &str) {
    if let Err(e) = client.reannounce_torrent(hash).await {
        warn!(hash, error = %e, "Reannounce failed");
    }
}

fn scratch_path(save_path: &str, subdir: &str) -> String {
    format!("{}/{}", save_path.trim_end_matches('/'), subdir)
}

/// `dir/file` becomes `dir/<hash>_file`; a top-level `file` becomes `<hash>/file`.
fn collision_free_name(name: &str, hash: &str) -> String {
    match name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/{}_{}", dir, hash, file),
        None => format!("{}/{}", hash, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTorrentClient, PendingAdd};
    use crate::torrent_client::TorrentState;

    fn reconciler() -> Reconciler {
        Reconciler::new(&ReconcileConfig::default()).with_pacing(Duration::ZERO, Duration::ZERO)
    }

    fn release() -> Arc<Release> {
        Arc::new(Release {
            title: "Movie".to_string(),
            year: 2020,
            resolution: "1080p".to_string(),
            ..Release::default()
        })
    }

    fn matched() -> Entry {
        let mut torrent = TorrentInfo::new("held", "Movie.2020.1080p.BluRay.x264-GRP");
        torrent.category = Some("movies".to_string());
        torrent.save_path = "/data/movies".to_string();
        Entry {
            torrent,
            release: release(),
        }
    }

    fn file(name: &str, progress: f64) -> TorrentFileEntry {
        TorrentFileEntry {
            index: 0,
            name: name.to_string(),
            size: 1000,
            progress,
        }
    }

    fn request() -> CrossSeedRequest {
        CrossSeedRequest {
            name: "Movie.2020.1080p.BluRay.x264-GRP".to_string(),
            hash: Some("new".to_string()),
            release: release(),
            payload: b"d4:infod4:name5:moviee".to_vec(),
        }
    }

    async fn client_with_match() -> MockTorrentClient {
        let client = MockTorrentClient::new();
        let entry = matched();
        client.add_mock_torrent(entry.torrent.clone()).await;
        client
            .set_files("held", vec![file("Movie.2020.1080p.BluRay.x264-GRP/movie.mkv", 1.0)])
            .await;
        client.add_category("movies", "/data/movies").await;
        client
    }

    fn pending(state: TorrentState, progress: f64) -> PendingAdd {
        let mut info = TorrentInfo::new("new", "Movie.2020.1080p.BluRay.x264-GRP");
        info.state = state;
        info.progress = progress;
        PendingAdd::new(info)
    }

    #[test]
    fn test_collision_free_name() {
        assert_eq!(collision_free_name("dir/a.mkv", "abc"), "dir/abc_a.mkv");
        assert_eq!(collision_free_name("a/b/c.nfo", "abc"), "a/b/abc_c.nfo");
        assert_eq!(collision_free_name("a.mkv", "abc"), "abc/a.mkv");
    }

    #[test]
    fn test_scratch_path() {
        assert_eq!(scratch_path("/data/movies", ".tmp"), "/data/movies/.tmp");
        assert_eq!(scratch_path("/data/movies/", ".tmp"), "/data/movies/.tmp");
    }

    #[tokio::test]
    async fn test_empty_bucket_is_not_cross() {
        let client = MockTorrentClient::new();
        let err = reconciler().cross_seed(&client, &request(), &[]).await.unwrap_err();
        assert_eq!(err.code(), 420);
    }

    #[tokio::test]
    async fn test_incomplete_match_is_skipped() {
        let client = client_with_match().await;
        let mut entry = matched();
        entry.torrent.progress = 0.5;
        let err = reconciler()
            .cross_seed(&client, &request(), &[entry])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 414);
        assert_eq!(client.call_count("add").await, 0);
    }

    #[tokio::test]
    async fn test_different_release_is_skipped() {
        let client = client_with_match().await;
        let mut req = request();
        req.release = Arc::new(Release {
            resolution: "720p".to_string(),
            ..(*release()).clone()
        });
        let err = reconciler()
            .cross_seed(&client, &req, &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 414);
    }

    #[tokio::test]
    async fn test_match_without_files_is_skipped() {
        let client = client_with_match().await;
        client.fail_operation("files", 1).await;
        let err = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 414);
    }

    #[tokio::test]
    async fn test_seeding_converges_with_derived_category() {
        let client = client_with_match().await;
        client
            .queue_add(pending(TorrentState::StalledUploading, 1.0))
            .await;

        let outcome = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap();

        assert_eq!(outcome.kind, OutcomeKind::Converged);
        assert_eq!(outcome.hash, "new");
        assert_eq!(outcome.matched, "held");

        let added = client.added_torrents().await;
        assert_eq!(added.len(), 1);
        let options = &added[0].options;
        assert_eq!(options.category.as_deref(), Some("movies.cross-seed"));
        assert_eq!(options.tags, vec!["seedwarden".to_string()]);
        assert!(options.paused);
        assert!(options.skip_hash_check);
        assert_eq!(options.content_layout, ContentLayout::Subfolder);
        assert_eq!(added[0].data, request().payload);

        let category = client.category("movies.cross-seed").await.unwrap();
        assert_eq!(category.save_path, "/data/movies");
        assert_eq!(client.call_count("reannounce").await, 1);
    }

    #[tokio::test]
    async fn test_existing_derived_category_not_recreated() {
        let client = client_with_match().await;
        client.add_category("movies.cross-seed", "/data/movies").await;
        client
            .queue_add(pending(TorrentState::StalledUploading, 1.0))
            .await;

        reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap();
        assert_eq!(client.call_count("create_category").await, 0);
    }

    #[tokio::test]
    async fn test_flat_layout_when_first_file_not_under_name() {
        let client = client_with_match().await;
        client.set_files("held", vec![file("movie.mkv", 1.0)]).await;
        client
            .queue_add(pending(TorrentState::StalledUploading, 1.0))
            .await;

        reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap();
        let added = client.added_torrents().await;
        assert_eq!(added[0].options.content_layout, ContentLayout::NoSubfolder);
    }

    #[tokio::test]
    async fn test_category_lookup_failure() {
        let client = client_with_match().await;
        client.fail_operation("categories", 1).await;
        let err = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 496);
    }

    #[tokio::test]
    async fn test_category_create_failure() {
        let client = client_with_match().await;
        client.fail_operation("create_category", 1).await;
        let err = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 495);
    }

    #[tokio::test]
    async fn test_submission_retries_then_succeeds() {
        let client = client_with_match().await;
        client.fail_operation("add", 3).await;
        client
            .queue_add(pending(TorrentState::StalledUploading, 1.0))
            .await;

        let outcome = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Converged);
        assert_eq!(client.call_count("add").await, 4);
    }

    #[tokio::test]
    async fn test_submission_exhaustion() {
        let client = client_with_match().await;
        client.fail_operation("add", u32::MAX).await;

        let err = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 490);
        assert_eq!(client.call_count("add").await, 7);
        assert_eq!(client.call_count("remove").await, 0);
    }

    #[tokio::test]
    async fn test_hash_discovered_by_name() {
        let client = client_with_match().await;
        client
            .queue_add(pending(TorrentState::PausedUploading, 1.0))
            .await;
        let mut req = request();
        req.hash = None;

        let outcome = reconciler()
            .cross_seed(&client, &req, &[matched()])
            .await
            .unwrap();
        assert_eq!(outcome.hash, "new");
        assert_eq!(client.call_count("resume").await, 1);
    }

    #[tokio::test]
    async fn test_data_mismatch_is_unrecoverable() {
        let client = client_with_match().await;
        client
            .queue_add(pending(TorrentState::PausedDownloading, 0.75))
            .await;

        let err = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 466);
        assert_eq!(client.call_count("get").await, 1);
        assert_eq!(client.call_count("recheck").await, 0);
        assert_eq!(client.call_count("resume").await, 0);

        let removes = client.calls_for("remove").await;
        assert_eq!(removes.len(), 1);
        assert_eq!(removes[0].detail, "new|false");
        assert!(!client.has_torrent("new").await);
        assert!(client.has_torrent("held").await);
    }

    #[tokio::test]
    async fn test_not_converged_exhausts_budget() {
        let client = client_with_match().await;
        client.queue_add(pending(TorrentState::Queued, 0.0)).await;

        let err = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 410);
        assert_eq!(client.call_count("get").await, 47);
        assert_eq!(client.call_count("remove").await, 1);
    }

    #[tokio::test]
    async fn test_checking_polls_do_not_consume_budget() {
        let client = client_with_match().await;
        let mut script = vec![TorrentState::CheckingUploading; 60];
        script.push(TorrentState::StalledUploading);
        client
            .queue_add(pending(TorrentState::CheckingUploading, 1.0).with_script(script))
            .await;

        let outcome = reconciler()
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Converged);
        assert_eq!(client.call_count("get").await, 61);
    }

    #[tokio::test]
    async fn test_checking_is_capped() {
        let client = client_with_match().await;
        client
            .queue_add(pending(TorrentState::CheckingUploading, 1.0))
            .await;
        let mut config = ReconcileConfig::default();
        config.max_checking_polls = 5;
        let reconciler =
            Reconciler::new(&config).with_pacing(Duration::ZERO, Duration::ZERO);

        let err = reconciler
            .cross_seed(&client, &request(), &[matched()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 412);
        assert_eq!(client.call_count("get").await, 5);
    }
}
