//! POST /api/upgrade

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse};
use serde::Serialize;
use seedwarden_core::{canonical_key, classify, Decision, Outcome};

use super::request::{Reply, ReleaseRequest};
use super::session::{self, MAINTENANCE_CODES};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UpgradeResponse {
    pub message: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<&'static str>,
    /// Held torrent the decision refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// Classify a release against what the caller's client already holds.
pub async fn upgrade(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let Some(req) = ReleaseRequest::parse(&body) else {
        return Reply::message(470, "Unable to decode request").into_response();
    };
    if req.name.is_empty() {
        return Reply::message(469, "No title passed").into_response();
    }

    let session = match session::open(&state, &req, MAINTENANCE_CODES).await {
        Ok(session) => session,
        Err(reply) => return reply.into_response(),
    };

    let release = state.index().release(&req.name);
    let key = canonical_key(&release);
    let bucket = state.index().entries(&session.snapshot, &key);
    let decision = classify(&release, &bucket);

    let message = match &decision {
        Decision::Unique => format!("Unique submission: {}", req.name),
        Decision::AttributeUpgrade(_) => format!("Upgrade: {}", req.name),
        Decision::ExactDuplicate(entry) => format!(
            "Cross submission: {} (held {:.0}%)",
            entry.torrent.name,
            entry.torrent.progress * 100.0
        ),
        Decision::NotAnUpgrade(entry, comparator) => format!(
            "Not an upgrade by {}: {}",
            comparator.as_str(),
            entry.torrent.name
        ),
        Decision::Indeterminate => format!("Undecided: {}", req.name),
    };

    let comparator = match &decision {
        Decision::NotAnUpgrade(_, c) | Decision::AttributeUpgrade(Some(c)) => Some(c.as_str()),
        _ => None,
    };

    Reply {
        code: decision.status_code(),
        body: UpgradeResponse {
            message,
            outcome: decision.outcome(),
            comparator,
            hash: decision.entry().map(|e| e.torrent.hash.clone()),
            progress: decision.entry().map(|e| e.torrent.progress),
        },
    }
    .into_response()
}
