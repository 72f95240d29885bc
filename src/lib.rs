//! Fault-tolerant instance pair with windowed admission and crash arbitration.

pub mod admin;
pub mod admission;
pub mod arbitration;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod loadgen;
pub mod observability;
pub mod peer;
pub mod replication;
pub mod resilience;
pub mod store;

pub use admission::{Admission, RejectReason, RequestGovernor};
pub use config::schema::NodeConfig;
pub use error::{CoordError, CoordResult};
pub use lifecycle::{Node, Shutdown};
