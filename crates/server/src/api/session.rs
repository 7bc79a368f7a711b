//! Client connection and snapshot lookup shared by the release endpoints.

use std::sync::Arc;

use seedwarden_core::{TitleSnapshot, TorrentClient};
use tracing::warn;

use super::request::{MessageResponse, Reply, ReleaseRequest};
use crate::state::AppState;

/// Status codes an endpoint reports when connecting or listing fails.
#[derive(Debug, Clone, Copy)]
pub struct FailureCodes {
    pub client: u16,
    pub listing: u16,
}

/// Codes used by upgrade, clean and unregistered.
pub const MAINTENANCE_CODES: FailureCodes = FailureCodes {
    client: 471,
    listing: 468,
};

pub struct Session {
    pub client: Arc<dyn TorrentClient>,
    pub snapshot: Arc<TitleSnapshot>,
}

/// Connect to the caller's client and take an index snapshot.
pub async fn open(
    state: &AppState,
    req: &ReleaseRequest,
    codes: FailureCodes,
) -> Result<Session, Reply<MessageResponse>> {
    let identity = req.identity();

    let client = state.clients().get(&identity).await.map_err(|e| {
        warn!(host = %identity.host, error = %e, "Unable to get client");
        Reply::message(codes.client, format!("Unable to get client: {}", e))
    })?;

    let snapshot = match state
        .index()
        .snapshot(&identity, client.as_ref(), req.cache_bypass)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            // The session may have expired; reconnect on the next request.
            state.clients().evict(&identity);
            return Err(Reply::message(
                codes.listing,
                format!("Unable to get result: {}", e),
            ));
        }
    };

    Ok(Session { client, snapshot })
}
