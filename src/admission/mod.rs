//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! POST /requests, LoadGenerator
//!     → governor.rs (RequestGovernor::accept)
//!         → window.rs (tick, excess)
//!         → state.rs  (single lock over window, instance, snapshot)
//!         → arbitration / lifecycle / replication
//! ```
//!
//! # Design Decisions
//! - Outcomes are values (`Admission`), not errors
//! - Arbitration runs outside the state lock
//! - At most one arbitration per window (breach latch)

pub mod governor;
pub mod state;
pub mod window;

pub use governor::{Admission, RejectReason, RequestGovernor, Status};
pub use state::{CoreState, InstanceState, SharedState};
pub use window::{Tick, WindowedCounter};
