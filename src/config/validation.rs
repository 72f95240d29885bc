//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (cap, limits, cycle lengths >= 1)
//! - Check peer and worker addresses parse as URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use url::Url;

use crate::config::schema::NodeConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.identity.trim().is_empty() {
        errors.push(ValidationError::new("identity", "must not be empty"));
    }
    if config.active_identity.trim().is_empty() {
        errors.push(ValidationError::new("active_identity", "must not be empty"));
    }

    at_least_one(&mut errors, "window.cap", config.window.cap as u64);
    at_least_one(&mut errors, "window.excess_limit", config.window.excess_limit as u64);
    at_least_one(&mut errors, "window.duration_secs", config.window.duration_secs);
    at_least_one(&mut errors, "arbitration.max_attempts", config.arbitration.max_attempts as u64);
    at_least_one(&mut errors, "arbitration.attempt_timeout_ms", config.arbitration.attempt_timeout_ms);

    let mut seen = HashSet::new();
    for (i, peer) in config.peers.iter().enumerate() {
        if peer.identity == config.identity {
            errors.push(ValidationError::new(
                format!("peers[{}].identity", i),
                "must differ from this instance's identity",
            ));
        }
        if !seen.insert(peer.identity.as_str()) {
            errors.push(ValidationError::new(
                format!("peers[{}].identity", i),
                format!("duplicate peer identity '{}'", peer.identity),
            ));
        }
        check_url(&mut errors, format!("peers[{}].address", i), &peer.address);
    }

    if let Some(addr) = &config.health_aggregator {
        check_url(&mut errors, "health_aggregator".to_string(), addr);
    }

    if config.load_generator.enabled {
        at_least_one(&mut errors, "load_generator.interval_secs", config.load_generator.interval_secs);
    }

    if config.balancer.enabled {
        at_least_one(&mut errors, "balancer.window_size", config.balancer.window_size as u64);
        at_least_one(&mut errors, "balancer.threshold", config.balancer.threshold as u64);
        if config.balancer.workers.is_empty() {
            errors.push(ValidationError::new("balancer.workers", "at least one worker is required"));
        }
        for (i, worker) in config.balancer.workers.iter().enumerate() {
            check_url(&mut errors, format!("balancer.workers[{}].address", i), &worker.address);
        }
    }

    if config.health_monitor.enabled {
        at_least_one(&mut errors, "health_monitor.interval_secs", config.health_monitor.interval_secs);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn at_least_one(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be at least 1"));
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: String, value: &str) {
    if let Err(e) = Url::parse(value) {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PeerConfig, WorkerConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&NodeConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_cap_and_limit_rejected() {
        let mut config = NodeConfig::default();
        config.window.cap = 0;
        config.window.excess_limit = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"window.cap"));
        assert!(fields.contains(&"window.excess_limit"));
    }

    #[test]
    fn test_peer_identity_checks() {
        let mut config = NodeConfig::default();
        config.peers.push(PeerConfig {
            identity: config.identity.clone(),
            address: "http://127.0.0.1:8081".into(),
        });
        config.peers.push(PeerConfig {
            identity: "instance-2".into(),
            address: "not a url".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "peers[0].identity");
        assert_eq!(errors[1].field, "peers[1].address");
    }

    #[test]
    fn test_enabled_balancer_needs_workers() {
        let mut config = NodeConfig::default();
        config.balancer.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "balancer.workers");

        config.balancer.workers.push(WorkerConfig {
            name: "w1".into(),
            address: "http://127.0.0.1:9001".into(),
        });
        assert!(validate_config(&config).is_ok());
    }
}
