use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Overall per-request timeout. Cross-seed reconciliation runs inside
    /// this window and is abandoned when it elapses.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    6940
}

fn default_request_timeout() -> u64 {
    300
}

/// Freshness windows for the per-identity caches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// How long a torrent listing snapshot stays fresh.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,
    /// How long a parsed release stays cached.
    #[serde(default = "default_release_ttl")]
    pub release_ttl_secs: u64,
    /// How long a logged-in client handle is reused.
    #[serde(default = "default_client_ttl")]
    pub client_ttl_secs: u64,
    /// Most parsed releases kept at once.
    #[serde(default = "default_release_capacity")]
    pub release_capacity: usize,
    /// Most client handles kept at once.
    #[serde(default = "default_client_capacity")]
    pub client_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: default_snapshot_ttl(),
            release_ttl_secs: default_release_ttl(),
            client_ttl_secs: default_client_ttl(),
            release_capacity: default_release_capacity(),
            client_capacity: default_client_capacity(),
        }
    }
}

fn default_snapshot_ttl() -> u64 {
    300
}

fn default_release_ttl() -> u64 {
    900
}

fn default_client_ttl() -> u64 {
    300
}

fn default_release_capacity() -> usize {
    10_000
}

fn default_client_capacity() -> usize {
    64
}

/// Download client connection settings shared by every identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_client_timeout(),
        }
    }
}

fn default_client_timeout() -> u32 {
    30
}

/// Cross-seed reconciliation parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Minimum progress below which a name match is treated as a data mismatch.
    #[serde(default = "default_floor")]
    pub completeness_floor: f64,
    /// Attempts for handing the torrent to the client.
    #[serde(default = "default_submit_attempts")]
    pub submit_attempts: u32,
    /// Attempts for the convergence loop.
    #[serde(default = "default_converge_attempts")]
    pub converge_attempts: u32,
    /// Base delay between attempts (milliseconds).
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound of the random jitter added to each delay (milliseconds).
    #[serde(default = "default_max_jitter")]
    pub max_jitter_ms: u64,
    /// Polls spent waiting on checking states before giving up.
    /// These polls do not consume the convergence budget.
    #[serde(default = "default_max_checking_polls")]
    pub max_checking_polls: u32,
    /// Tag applied to every submitted torrent.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Suffix appended to the matched torrent's category.
    #[serde(default = "default_category_suffix")]
    pub category_suffix: String,
    /// Subdirectory of the save path used during managed replacement.
    #[serde(default = "default_scratch_subdir")]
    pub scratch_subdir: String,
    /// Re-fetch the file listing before resuming an apparently stale entry.
    #[serde(default)]
    pub confirm_stale_progress: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            completeness_floor: default_floor(),
            submit_attempts: default_submit_attempts(),
            converge_attempts: default_converge_attempts(),
            base_delay_ms: default_base_delay(),
            max_jitter_ms: default_max_jitter(),
            max_checking_polls: default_max_checking_polls(),
            tag: default_tag(),
            category_suffix: default_category_suffix(),
            scratch_subdir: default_scratch_subdir(),
            confirm_stale_progress: false,
        }
    }
}

fn default_floor() -> f64 {
    0.8
}

fn default_submit_attempts() -> u32 {
    7
}

fn default_converge_attempts() -> u32 {
    47
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_jitter() -> u64 {
    1000
}

fn default_max_checking_polls() -> u32 {
    45
}

fn default_tag() -> String {
    "seedwarden".to_string()
}

fn default_category_suffix() -> String {
    ".cross-seed".to_string()
}

fn default_scratch_subdir() -> String {
    ".tmp".to_string()
}

/// Dedup sweep configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    /// Seconds a duplicate must have been complete before it may be removed.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: default_grace_period(),
        }
    }
}

fn default_grace_period() -> i64 {
    1_209_600
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub client: ClientConfig,
    pub reconcile: ReconcileConfig,
    pub sweep: SweepConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        // No secrets live in the file config; credentials arrive per request.
        Self {
            server: config.server.clone(),
            cache: config.cache.clone(),
            client: config.client.clone(),
            reconcile: config.reconcile.clone(),
            sweep: config.sweep.clone(),
        }
    }
}
