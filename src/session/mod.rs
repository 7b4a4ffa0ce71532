//! Deterministic session module
//!
//! All gameplay logic lives here. This module must stay pure and deterministic:
//! - Fixed-interval ticks only
//! - Seeded RNG only
//! - Insertion order is the tie-break order
//! - No rendering or platform dependencies

pub mod clock;
pub mod problem;
pub mod resolve;
pub mod state;
pub mod tick;

pub use clock::{Scheduler, TickTimer};
pub use problem::{LevelSpec, Problem, ProblemGenerator, TableSpec, level_requirements};
pub use resolve::Resolution;
pub use state::{GamePhase, Session, Snapshot, Viewport};
pub use tick::{SessionEvent, TickKind};
