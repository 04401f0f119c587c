//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every rewrite rule once to surface pattern and origin errors
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate rule names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::resolver::{api_rewrite_with_source, API_RULE_NAME};
use crate::routing::rule::{RewriteRule, RuleError};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("rewrite {name:?}: {error}")]
    InvalidRule { name: String, error: RuleError },

    #[error("rewrite name {0:?} is used more than once")]
    DuplicateRuleName(String),

    #[error("observability.log_format: {0:?} is not one of \"pretty\", \"json\"")]
    InvalidLogFormat(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        &mut errors,
        "listener.bind_address",
        &config.listener.bind_address,
    );
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.upstream_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("security.max_body_size"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::InvalidLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if let Err(error) = api_rewrite_with_source(&config.api.source, config.api.origin.as_deref()) {
        errors.push(ValidationError::InvalidRule {
            name: API_RULE_NAME.to_string(),
            error,
        });
    }

    let mut names: HashSet<&str> = HashSet::from([API_RULE_NAME]);
    for rewrite in &config.rewrites {
        if !names.insert(&rewrite.name) {
            errors.push(ValidationError::DuplicateRuleName(rewrite.name.clone()));
        }
        if let Err(error) = RewriteRule::from_config(rewrite) {
            errors.push(ValidationError::InvalidRule {
                name: rewrite.name.clone(),
                error,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
