//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NodeConfig (validated, immutable)
//!     → handed to startup.rs, sliced per subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Invalid configuration is fatal at startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::ArbitrationConfig;
pub use schema::BalancerConfig;
pub use schema::HealthMonitorConfig;
pub use schema::ListenerConfig;
pub use schema::LoadGeneratorConfig;
pub use schema::NodeConfig;
pub use schema::ObservabilityConfig;
pub use schema::PeerConfig;
pub use schema::WindowConfig;
pub use schema::WorkerConfig;
