//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for an instance.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a cooperating instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This instance's identity.
    pub identity: String,

    /// Identity of the instance that starts out active.
    pub active_identity: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Cooperating peer instances.
    pub peers: Vec<PeerConfig>,

    /// Optional health aggregator that receives down-notifications.
    pub health_aggregator: Option<String>,

    /// Admission window settings.
    pub window: WindowConfig,

    /// Crash arbitration settings.
    pub arbitration: ArbitrationConfig,

    /// Synthetic load generator settings.
    pub load_generator: LoadGeneratorConfig,

    /// Load-balancer cycler settings.
    pub balancer: BalancerConfig,

    /// Peer health monitor settings.
    pub health_monitor: HealthMonitorConfig,

    /// Admin surface settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Persistence settings.
    pub store: StoreConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identity: "instance-1".to_string(),
            active_identity: "instance-1".to_string(),
            listener: ListenerConfig::default(),
            peers: Vec::new(),
            health_aggregator: None,
            window: WindowConfig::default(),
            arbitration: ArbitrationConfig::default(),
            load_generator: LoadGeneratorConfig::default(),
            balancer: BalancerConfig::default(),
            health_monitor: HealthMonitorConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// A cooperating peer instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    /// Peer identity.
    pub identity: String,

    /// Base URL of the peer (e.g., "http://127.0.0.1:8081").
    pub address: String,
}

/// Admission window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Requests allowed per window before they count as excess.
    pub cap: u32,

    /// Excess above which crash arbitration runs.
    pub excess_limit: u32,

    /// Window length in seconds.
    pub duration_secs: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            cap: 20,
            excess_limit: 60,
            duration_secs: 60,
        }
    }
}

/// Crash arbitration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// Attempts at fetching the peer's draw before treating it as unreachable.
    pub max_attempts: u32,

    /// Timeout for a single draw fetch in milliseconds.
    pub attempt_timeout_ms: u64,

    /// Base delay for exponential backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub backoff_max_ms: u64,

    /// Redraws on equal draws before falling back to identity order.
    pub max_redraws: u32,

    /// Delay before a downed instance comes back, in seconds.
    pub restart_delay_secs: u64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 500,
            backoff_base_ms: 100,
            backoff_max_ms: 500,
            max_redraws: 8,
            restart_delay_secs: 10,
        }
    }
}

/// Synthetic load generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadGeneratorConfig {
    /// Enable the generator (only the active instance generates load).
    pub enabled: bool,

    /// Burst interval in seconds.
    pub interval_secs: u64,

    /// Maximum requests per burst (inclusive).
    pub max_burst: u32,

    /// Length of generated payloads.
    pub payload_len: usize,
}

impl Default for LoadGeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            max_burst: 100,
            payload_len: 10,
        }
    }
}

/// Load-balancer cycler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Enable the cycler endpoint.
    pub enabled: bool,

    /// Requests served by the full worker set each cycle.
    pub window_size: u32,

    /// Requests served after one worker is taken down.
    pub threshold: u32,

    /// Backend workers.
    pub workers: Vec<WorkerConfig>,

    /// Timeout for a single worker call in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_size: 20,
            threshold: 60,
            workers: Vec::new(),
            request_timeout_ms: 2000,
        }
    }
}

/// Backend worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Worker name for logging/metrics.
    pub name: String,

    /// Base URL of the worker (e.g., "http://127.0.0.1:8082").
    pub address: String,
}

/// Peer health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthMonitorConfig {
    /// Enable periodic peer health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            timeout_secs: 2,
        }
    }
}

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding snapshots and records. In-memory when absent.
    pub path: Option<String>,
}
