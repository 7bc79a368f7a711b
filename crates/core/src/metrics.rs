//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Classification (decisions, unrecognised release tokens)
//! - Title index (snapshot rebuilds)
//! - Dedup and unregistered sweeps (removals)
//! - Cross-seed reconciliation (outcomes, attempts, duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Classification Metrics
// =============================================================================

/// Classifier decisions by outcome.
pub static DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedwarden_decisions_total", "Total classification decisions"),
        &["outcome"], // "unique", "exact_duplicate", "upgrade", "not_an_upgrade", "indeterminate"
    )
    .unwrap()
});

/// Release tokens missing from a comparator's rank table.
pub static UNKNOWN_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedwarden_unknown_tokens_total",
            "Release tokens not present in a comparator rank table",
        ),
        &["comparator"],
    )
    .unwrap()
});

// =============================================================================
// Title Index Metrics
// =============================================================================

/// Snapshot rebuilds (one client listing each).
pub static SNAPSHOT_REBUILDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedwarden_snapshot_rebuilds_total",
            "Title index snapshot rebuilds",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Sweep Metrics
// =============================================================================

/// Torrents removed by the dedup sweep.
pub static SWEEP_REMOVALS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "seedwarden_sweep_removals_total",
        "Torrents removed by the dedup sweep",
    )
    .unwrap()
});

/// Torrents removed by the unregistered sweep.
pub static UNREGISTERED_DELETIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "seedwarden_unregistered_deletions_total",
        "Torrents removed because their tracker no longer knows them",
    )
    .unwrap()
});

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Reconciliation outcomes by result.
pub static RECONCILE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedwarden_reconcile_outcomes_total",
            "Cross-seed reconciliation outcomes",
        ),
        &["result"], // "converged", "stale_progress", "replaced", or the error code
    )
    .unwrap()
});

/// Attempts spent per reconciliation phase.
pub static RECONCILE_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedwarden_reconcile_attempts_total",
            "Attempts spent by reconciliation phase",
        ),
        &["phase"], // "submit", "converge", "checking"
    )
    .unwrap()
});

/// Duration of a reconciliation job in seconds.
pub static RECONCILE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedwarden_reconcile_duration_seconds",
            "Duration of cross-seed reconciliation",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Classification
        Box::new(DECISIONS.clone()),
        Box::new(UNKNOWN_TOKENS.clone()),
        // Index
        Box::new(SNAPSHOT_REBUILDS.clone()),
        // Sweeps
        Box::new(SWEEP_REMOVALS.clone()),
        Box::new(UNREGISTERED_DELETIONS.clone()),
        // Reconciliation
        Box::new(RECONCILE_OUTCOMES.clone()),
        Box::new(RECONCILE_ATTEMPTS.clone()),
        Box::new(RECONCILE_DURATION.clone()),
    ]
}
