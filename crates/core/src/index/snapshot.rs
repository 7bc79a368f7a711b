//! Per-identity title index snapshots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{Clock, TtlCache};
use crate::metrics;
use crate::release::{Release, ReleaseParser};
use crate::torrent_client::{
    ClientIdentity, TorrentClient, TorrentClientError, TorrentFilters, TorrentInfo,
};

use super::canonical_key;

/// Errors raised while building an index snapshot.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Torrent listing failed: {0}")]
    Listing(#[from] TorrentClientError),
}

/// A torrent paired with its parsed release.
#[derive(Debug, Clone)]
pub struct Entry {
    pub torrent: TorrentInfo,
    pub release: Arc<Release>,
}

/// Immutable view of one identity's torrents grouped by canonical key.
#[derive(Debug)]
pub struct TitleSnapshot {
    /// Increments on every rebuild for the identity.
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    buckets: HashMap<String, Vec<TorrentInfo>>,
}

impl TitleSnapshot {
    /// Torrents sharing `key`, ordered by (name, hash).
    pub fn bucket(&self, key: &str) -> &[TorrentInfo] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All non-empty buckets, in key order.
    pub fn buckets(&self) -> Vec<(&str, &[TorrentInfo])> {
        let mut buckets: Vec<(&str, &[TorrentInfo])> = self
            .buckets
            .iter()
            .map(|(key, torrents)| (key.as_str(), torrents.as_slice()))
            .collect();
        buckets.sort_by(|a, b| a.0.cmp(b.0));
        buckets
    }

    /// Every torrent in the snapshot, in bucket order.
    pub fn torrents(&self) -> impl Iterator<Item = &TorrentInfo> + '_ {
        self.buckets()
            .into_iter()
            .flat_map(|(_, torrents)| torrents.iter())
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[derive(Default)]
struct Slot {
    current: RwLock<Option<Arc<TitleSnapshot>>>,
    /// Generation of the last finished rebuild, readable while one is running.
    finished: AtomicU64,
}

/// Grouped view of each identity's torrents, rebuilt on a freshness window.
///
/// Concurrent callers for one identity share a single rebuild: the slot is
/// checked under its read lock and re-checked under its write lock before
/// the client is listed. A caller that finds a newer generation than the one
/// it saw on arrival reuses it, bypass or not.
pub struct TitleIndex {
    parser: Arc<dyn ReleaseParser>,
    releases: TtlCache<String, Arc<Release>>,
    slots: Mutex<HashMap<ClientIdentity, Arc<Slot>>>,
    snapshot_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TitleIndex {
    pub fn new(
        parser: Arc<dyn ReleaseParser>,
        releases: TtlCache<String, Arc<Release>>,
        snapshot_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            parser,
            releases,
            slots: Mutex::new(HashMap::new()),
            snapshot_ttl,
            clock,
        }
    }

    pub fn parser(&self) -> &dyn ReleaseParser {
        self.parser.as_ref()
    }

    /// Parsed release for `name`, memoized.
    pub fn release(&self, name: &str) -> Arc<Release> {
        self.releases
            .get_or_insert_with(name.to_string(), || Arc::new(self.parser.parse(name)))
    }

    /// Canonical key for a raw release name.
    pub fn key_for(&self, name: &str) -> String {
        canonical_key(&self.release(name))
    }

    /// Bucket members of `key` paired with their releases.
    pub fn entries(&self, snapshot: &TitleSnapshot, key: &str) -> Vec<Entry> {
        snapshot
            .bucket(key)
            .iter()
            .map(|torrent| Entry {
                release: self.release(&torrent.name),
                torrent: torrent.clone(),
            })
            .collect()
    }

    /// Current snapshot for `identity`, rebuilding it when stale.
    ///
    /// With `bypass` set the freshness window is ignored, but a rebuild that
    /// finished after this caller arrived is reused.
    pub async fn snapshot(
        &self,
        identity: &ClientIdentity,
        client: &dyn TorrentClient,
        bypass: bool,
    ) -> Result<Arc<TitleSnapshot>, IndexError> {
        let slot = self.slot(identity);
        let observed = slot.finished.load(Ordering::Acquire);

        if !bypass {
            let current = slot.current.read().await;
            if let Some(snapshot) = current.as_ref().filter(|s| self.is_fresh(s)) {
                return Ok(Arc::clone(snapshot));
            }
        }

        let mut current = slot.current.write().await;
        if let Some(snapshot) = current.as_ref() {
            if snapshot.generation > observed || (!bypass && self.is_fresh(snapshot)) {
                debug!(host = %identity.host, generation = snapshot.generation, "Reusing concurrent rebuild");
                return Ok(Arc::clone(snapshot));
            }
        }

        let generation = current.as_ref().map_or(0, |s| s.generation) + 1;
        let torrents = match client.list_torrents(&TorrentFilters::default()).await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(host = %identity.host, error = %e, "Failed to list torrents");
                metrics::SNAPSHOT_REBUILDS.with_label_values(&["failure"]).inc();
                return Err(e.into());
            }
        };

        let snapshot = Arc::new(self.build(generation, torrents));
        info!(
            host = %identity.host,
            generation,
            torrents = snapshot.len(),
            "Rebuilt title index"
        );
        metrics::SNAPSHOT_REBUILDS.with_label_values(&["success"]).inc();

        *current = Some(Arc::clone(&snapshot));
        slot.finished.store(generation, Ordering::Release);
        Ok(snapshot)
    }

    /// Drop the identity's snapshot so the next caller rebuilds it.
    pub async fn invalidate(&self, identity: &ClientIdentity) {
        let slot = self.slot(identity);
        let mut current = slot.current.write().await;
        // Same generation: callers already waiting still rebuild.
        if let Some(snapshot) = current.take() {
            *current = Some(Arc::new(TitleSnapshot {
                generation: snapshot.generation,
                built_at: DateTime::<Utc>::MIN_UTC,
                buckets: HashMap::new(),
            }));
        }
    }

    fn slot(&self, identity: &ClientIdentity) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(identity.clone()).or_default())
    }

    fn is_fresh(&self, snapshot: &TitleSnapshot) -> bool {
        self.clock.now() - snapshot.built_at < self.snapshot_ttl
    }

    fn build(&self, generation: u64, torrents: Vec<TorrentInfo>) -> TitleSnapshot {
        let mut buckets: HashMap<String, Vec<TorrentInfo>> = HashMap::new();
        for torrent in torrents {
            let key = canonical_key(&self.release(&torrent.name));
            buckets.entry(key).or_default().push(torrent);
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.hash.cmp(&b.hash)));
        }

        TitleSnapshot {
            generation,
            built_at: self.clock.now(),
            buckets,
        }
    }
}
