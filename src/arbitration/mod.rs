//! Arbitration subsystem.
//!
//! # Data Flow
//! ```text
//! RequestGovernor (excess breach)
//!     → arbiter.rs (local draw + peer draw via GET /peer-draw)
//!     → contest.rs (highest draw yields)
//!     → Verdict::{Winner, Loser}
//!
//! LoadBalancerCycler (cycle boundary)
//!     → draw.rs (one draw per worker)
//!     → contest.rs (highest draw yields, ties by uniform pick)
//! ```
//!
//! # Design Decisions
//! - Draw sources are injectable so rounds can be replayed deterministically
//! - An unreachable peer is a typed outcome, never a numeric guess

pub mod arbiter;
pub mod contest;
pub mod draw;

pub use arbiter::{CrashArbitrator, Phase, PeerDraw, Round, Verdict, UNREACHABLE_DRAW};
pub use contest::{highest, Yielding};
pub use draw::{DrawSource, RandomDraws, ScriptedDraws, DRAW_MAX, DRAW_MIN};
