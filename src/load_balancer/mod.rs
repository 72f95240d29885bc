//! Load-balancer cycler subsystem.
//!
//! # Data Flow
//! ```text
//! POST /loadbalancer
//!     → cycler.rs (advance cycle position)
//!         - cycle start: switch down workers on   (POST /alive?alive=true)
//!         - shutdown position: draw per up worker (arbitration::contest)
//!                              switch one off     (POST /alive?alive=false)
//!     → pool.rs (workers currently up)
//!     → fan out payload                           (POST /requests)
//! ```
//!
//! # Design Decisions
//! - Workers are instances of this same service, driven through `PeerClient`
//! - Worker state is the cycler's local view of each switch

pub mod cycler;
pub mod pool;
pub mod worker;

pub use cycler::{CycleAction, CycleReport, LoadBalancerCycler};
pub use pool::WorkerPool;
pub use worker::{Worker, WorkerState, WorkerView};
