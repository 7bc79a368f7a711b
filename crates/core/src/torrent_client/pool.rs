//! Per-identity client handles.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::TtlCache;

use super::{QBittorrentClient, TorrentClient, TorrentClientError};

/// Credentials addressing one download-client account.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl ClientIdentity {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Produces connected client handles.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError>;
}

/// Factory for qBittorrent Web API clients. Logs in eagerly so bad
/// credentials surface at connect time.
#[derive(Debug, Clone)]
pub struct QBittorrentFactory {
    timeout_secs: u32,
}

impl QBittorrentFactory {
    pub fn new(timeout_secs: u32) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl ClientFactory for QBittorrentFactory {
    async fn connect(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
        let client = QBittorrentClient::new(identity, self.timeout_secs)?;
        client.login().await?;
        Ok(Arc::new(client))
    }
}

/// Memoizes client handles per identity for a freshness window.
pub struct ClientPool {
    factory: Arc<dyn ClientFactory>,
    clients: TtlCache<ClientIdentity, Arc<dyn TorrentClient>>,
}

impl ClientPool {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        clients: TtlCache<ClientIdentity, Arc<dyn TorrentClient>>,
    ) -> Self {
        Self { factory, clients }
    }

    /// Cached handle for `identity`, connecting on a miss.
    pub async fn get(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
        if let Some(client) = self.clients.get(identity) {
            return Ok(client);
        }

        let purged = self.clients.purge_expired();
        debug!(host = %identity.host, user = %identity.username, purged, "Connecting download client");
        let client = self.factory.connect(identity).await?;
        self.clients.insert(identity.clone(), Arc::clone(&client));
        Ok(client)
    }

    /// Drop a handle, e.g. after it stopped working.
    pub fn evict(&self, identity: &ClientIdentity) {
        self.clients.remove(identity);
    }
}
