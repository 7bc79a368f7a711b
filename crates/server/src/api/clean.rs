//! POST /api/clean

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse};
use serde::Serialize;
use seedwarden_core::SweepError;
use tracing::info;

use super::request::{Reply, ReleaseRequest};
use super::session::MAINTENANCE_CODES;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CleanResponse {
    pub message: String,
    pub removed: Vec<String>,
}

/// Remove superseded duplicates past the grace period.
pub async fn clean(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let Some(req) = ReleaseRequest::parse(&body) else {
        return Reply::message(470, "Unable to decode request").into_response();
    };

    let identity = req.identity();
    let client = match state.clients().get(&identity).await {
        Ok(client) => client,
        Err(e) => {
            return Reply::message(
                MAINTENANCE_CODES.client,
                format!("Unable to get client: {}", e),
            )
            .into_response()
        }
    };

    let result = state
        .sweeper()
        .sweep(state.index(), &identity, client.as_ref(), req.cache_bypass)
        .await;

    match result {
        Ok(report) if report.count() == 0 => Reply::message(205, "Nothing to remove").into_response(),
        Ok(report) => {
            info!(count = report.count(), "Dedup sweep finished");
            Reply {
                code: 200,
                body: CleanResponse {
                    message: format!("Removed {}", report.count()),
                    removed: report.removed,
                },
            }
            .into_response()
        }
        Err(SweepError::Index(e)) => {
            state.clients().evict(&identity);
            Reply::message(MAINTENANCE_CODES.listing, format!("Unable to get result: {}", e))
                .into_response()
        }
        Err(e @ SweepError::Removal { .. }) => {
            Reply::message(420, format!("Failed to delete torrents: {}", e)).into_response()
        }
    }
}
