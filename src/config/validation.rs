//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and value ranges (timeouts > 0, adjustment >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BroadcasterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is handed to any client

use thiserror::Error;

use crate::config::schema::BroadcasterConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid URL for {field}: '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("fees.gas_adjustment must be at least 1.0, got {0}")]
    GasAdjustmentTooLow(f64),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BroadcasterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "chain.rest_url", &config.chain.rest_url);
    for failover in &config.chain.failover_urls {
        check_url(&mut errors, "chain.failover_urls", failover);
    }

    if config.chain.chain_id.trim().is_empty() {
        errors.push(ValidationError::Empty("chain.chain_id"));
    }
    if config.chain.bech32_prefix.trim().is_empty() {
        errors.push(ValidationError::Empty("chain.bech32_prefix"));
    }
    if config.chain.request_timeout_secs == 0 {
        errors.push(ValidationError::NotPositive("chain.request_timeout_secs"));
    }

    if config.fees.denom.trim().is_empty() {
        errors.push(ValidationError::Empty("fees.denom"));
    }
    if !(config.fees.gas_price > 0.0) {
        errors.push(ValidationError::NotPositive("fees.gas_price"));
    }
    if !(config.fees.gas_adjustment >= 1.0) {
        errors.push(ValidationError::GasAdjustmentTooLow(config.fees.gas_adjustment));
    }
    if config.fees.gas_limit == Some(0) {
        errors.push(ValidationError::NotPositive("fees.gas_limit"));
    }

    if config.broadcast.poll_interval_ms == 0 {
        errors.push(ValidationError::NotPositive("broadcast.poll_interval_ms"));
    }
    if config.broadcast.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::NotPositive("broadcast.confirmation_timeout_secs"));
    }
    if config.broadcast.timeout_height_margin == Some(0) {
        errors.push(ValidationError::NotPositive("broadcast.timeout_height_margin"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BroadcasterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = BroadcasterConfig::default();
        config.chain.rest_url = "not a url".to_string();
        config.chain.failover_urls.push("ftp://node".to_string());
        config.fees.gas_adjustment = 0.5;
        config.broadcast.poll_interval_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::GasAdjustmentTooLow(0.5)));
        assert!(errors.contains(&ValidationError::NotPositive("broadcast.poll_interval_ms")));
    }
}
