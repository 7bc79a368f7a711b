//! POST /api/cross

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse};
use seedwarden_core::{canonical_key, decode_torrent_payload, CrossSeedOutcome, CrossSeedRequest};
use serde::Serialize;

use super::request::{Reply, ReleaseRequest};
use super::session::{self, FailureCodes};
use crate::state::AppState;

const CROSS_CODES: FailureCodes = FailureCodes {
    client: 498,
    listing: 497,
};

#[derive(Debug, Serialize)]
pub struct CrossResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: CrossSeedOutcome,
}

/// Attach a cross-seed to held data and wait until it seeds.
pub async fn cross(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let Some(req) = ReleaseRequest::parse(&body) else {
        return Reply::message(470, "Unable to decode request").into_response();
    };
    if req.name.is_empty() {
        return Reply::message(499, "No title passed").into_response();
    }

    let payload = match decode_torrent_payload(&req.torrent) {
        Ok(payload) => payload,
        Err(e) => {
            return Reply::message(470, format!("Unable to decode torrent: {}", e)).into_response()
        }
    };

    let session = match session::open(&state, &req, CROSS_CODES).await {
        Ok(session) => session,
        Err(reply) => return reply.into_response(),
    };

    let release = state.index().release(&req.name);
    let key = canonical_key(&release);
    let bucket = state.index().entries(&session.snapshot, &key);

    let request = CrossSeedRequest {
        name: req.name.clone(),
        hash: req.known_hash(),
        release,
        payload,
    };

    let result = state
        .reconciler()
        .cross_seed(session.client.as_ref(), &request, &bucket)
        .await;

    match result {
        Ok(outcome) => {
            state.index().invalidate(&req.identity()).await;
            Reply {
                code: 200,
                body: CrossResponse {
                    message: format!("Crossed: {}", req.name),
                    outcome,
                },
            }
            .into_response()
        }
        Err(e) => Reply::message(e.code(), format!("Failed to cross {}: {}", req.name, e))
            .into_response(),
    }
}
