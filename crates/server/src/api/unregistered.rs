//! POST /api/unregistered

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse};
use serde::Serialize;
use seedwarden_core::sweep_unregistered;

use super::request::{Reply, ReleaseRequest};
use super::session::MAINTENANCE_CODES;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnregisteredResponse {
    pub message: String,
    pub deleted: Vec<String>,
    pub reannounced: usize,
}

/// Remove torrents whose trackers no longer know them.
pub async fn unregistered(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
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

    match sweep_unregistered(state.index(), &identity, client.as_ref(), req.cache_bypass).await {
        Ok(report) => Reply {
            code: 200,
            body: UnregisteredResponse {
                message: format!("Unregistered torrents deleted: {}", report.count()),
                reannounced: report.reannounced.len(),
                deleted: report.deleted,
            },
        }
        .into_response(),
        Err(e) => {
            state.clients().evict(&identity);
            Reply::message(MAINTENANCE_CODES.listing, format!("Unable to get result: {}", e))
                .into_response()
        }
    }
}
