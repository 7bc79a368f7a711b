use super::{types::Config, ConfigError};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let floor = config.reconcile.completeness_floor;
    if !(0.0..=1.0).contains(&floor) {
        return Err(ConfigError::ValidationError(format!(
            "reconcile.completeness_floor must be within [0, 1], got {}",
            floor
        )));
    }

    if config.reconcile.submit_attempts == 0 || config.reconcile.converge_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "reconcile attempt budgets must be at least 1".to_string(),
        ));
    }

    if config.reconcile.category_suffix.is_empty() {
        return Err(ConfigError::ValidationError(
            "reconcile.category_suffix cannot be empty".to_string(),
        ));
    }

    if config.cache.release_capacity == 0 || config.cache.client_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "cache capacities must be at least 1".to_string(),
        ));
    }

    let budget_ms = worst_case_reconcile_ms(config);
    let timeout_ms = config.server.request_timeout_secs.saturating_mul(1000);
    if budget_ms > timeout_ms {
        return Err(ConfigError::ValidationError(format!(
            "reconcile retry budget ({} ms worst case) exceeds server.request_timeout_secs ({} s)",
            budget_ms, config.server.request_timeout_secs
        )));
    }

    if config.sweep.grace_period_secs < 0 {
        return Err(ConfigError::ValidationError(
            "sweep.grace_period_secs cannot be negative".to_string(),
        ));
    }

    Ok(())
}

/// Longest a cross-seed job can spend sleeping between polls: every submit
/// attempt, every convergence attempt, and the checking cap twice (main loop
/// and managed replacement), each at full jitter.
fn worst_case_reconcile_ms(config: &Config) -> u64 {
    let r = &config.reconcile;
    let polls = u64::from(r.submit_attempts)
        + u64::from(r.converge_attempts)
        + 2 * u64::from(r.max_checking_polls);
    polls.saturating_mul(r.base_delay_ms.saturating_add(r.max_jitter_ms))
}
