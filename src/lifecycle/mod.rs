//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Instance (instance.rs, restart.rs):
//!     arbitration loss / self-named notify-down
//!     → mark_down (alive=false, notify aggregator + peers)
//!     → deferred restart (alive=true, clean window, flag operational)
//!
//! Process (startup.rs, shutdown.rs, signals.rs):
//!     Validate config → Build node → Spawn background tasks → Serve
//!     SIGTERM/SIGINT → broadcast shutdown → tasks exit → server drains
//! ```

pub mod instance;
pub mod restart;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use instance::{DownNotice, InstanceLifecycle};
pub use restart::RestartHandle;
pub use shutdown::Shutdown;
pub use startup::Node;
