pub mod cache;
pub mod classify;
pub mod compare;
pub mod config;
pub mod dedup;
pub mod index;
pub mod metrics;
pub mod reconcile;
pub mod release;
pub mod testing;
pub mod torrent_client;
pub mod unregistered;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use classify::{classify, Decision, Outcome};
pub use compare::{walk, Comparator, Side, Verdict};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, CacheConfig,
    ClientConfig, Config, ConfigError, ReconcileConfig, SanitizedConfig, ServerConfig,
    SweepConfig,
};
pub use dedup::{DedupSweeper, SweepError, SweepReport};
pub use index::{canonical_key, Entry, IndexError, TitleIndex, TitleSnapshot};
pub use reconcile::{
    decode_torrent_payload, CrossSeedOutcome, CrossSeedRequest, OutcomeKind, PayloadError,
    ReconcileError, Reconciler, RetryPolicy,
};
pub use release::{normalize, Release, ReleaseParser, SceneParser};
pub use torrent_client::{
    ClientFactory, ClientIdentity, ClientPool, QBittorrentClient, QBittorrentFactory,
    TorrentClient, TorrentClientError, TorrentInfo, TorrentState,
};
pub use unregistered::{sweep_unregistered, UnregisteredReport};
