use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Duration;
use seedwarden_core::{
    ClientFactory, ClientPool, Clock, Config, DedupSweeper, Reconciler, SanitizedConfig,
    SceneParser, TitleIndex, TtlCache,
};

/// Shared application state
pub struct AppState {
    config: Config,
    clients: ClientPool,
    index: TitleIndex,
    sweeper: DedupSweeper,
    reconciler: Reconciler,
}

impl AppState {
    pub fn new(config: Config, factory: Arc<dyn ClientFactory>, clock: Arc<dyn Clock>) -> Self {
        let cache = &config.cache;
        let clients = ClientPool::new(
            factory,
            TtlCache::new(
                capacity(cache.client_capacity),
                secs(cache.client_ttl_secs),
                Arc::clone(&clock),
            ),
        );
        let index = TitleIndex::new(
            Arc::new(SceneParser::new()),
            TtlCache::new(
                capacity(cache.release_capacity),
                secs(cache.release_ttl_secs),
                Arc::clone(&clock),
            ),
            secs(cache.snapshot_ttl_secs),
            Arc::clone(&clock),
        );
        let sweeper = DedupSweeper::new(
            Duration::seconds(config.sweep.grace_period_secs),
            Arc::clone(&clock),
        );
        let reconciler = Reconciler::new(&config.reconcile);

        Self {
            config,
            clients,
            index,
            sweeper,
            reconciler,
        }
    }

    /// Swap the reconciler, e.g. for one without retry delays.
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn clients(&self) -> &ClientPool {
        &self.clients
    }

    pub fn index(&self) -> &TitleIndex {
        &self.index
    }

    pub fn sweeper(&self) -> &DedupSweeper {
        &self.sweeper
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

fn secs(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Validation rejects zero; fall back to one entry rather than panic.
fn capacity(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}
