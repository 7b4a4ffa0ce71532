//! Fixed-interval timers for the host loop
//!
//! The host feeds elapsed wall time in; due ticks come back out as events.
//! Tests bypass this and drive the session's tick methods directly. Pausing
//! is not the timers' concern: ticks keep firing and the session turns them
//! into no-ops.

use super::tick::TickKind;
use crate::consts::*;

/// Longest stretch of elapsed time honored per update; anything beyond is
/// dropped so a stalled host cannot trigger a catch-up avalanche
const MAX_ELAPSED_MS: u64 = 100;

/// Accumulator turning elapsed time into due fixed-interval ticks
#[derive(Debug, Clone)]
pub struct TickTimer {
    interval_ms: u64,
    accumulated_ms: u64,
}

impl TickTimer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            accumulated_ms: 0,
        }
    }

    /// Number of ticks that became due after `elapsed_ms` more time passed
    pub fn advance(&mut self, elapsed_ms: u64) -> u64 {
        self.accumulated_ms += elapsed_ms;
        let due = self.accumulated_ms / self.interval_ms;
        self.accumulated_ms %= self.interval_ms;
        due
    }

    /// Drop accumulated time
    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
    }
}

/// The session's two timers: spawn and advance
#[derive(Debug, Clone)]
pub struct Scheduler {
    spawn: TickTimer,
    advance: TickTimer,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            spawn: TickTimer::new(SPAWN_INTERVAL_MS),
            advance: TickTimer::new(ADVANCE_INTERVAL_MS),
        }
    }

    /// Due ticks for `elapsed_ms` more wall time. Advance ticks are listed
    /// before spawn ticks; the two streams are otherwise independent.
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<TickKind> {
        let elapsed_ms = elapsed_ms.min(MAX_ELAPSED_MS);
        let mut due = Vec::new();
        for _ in 0..self.advance.advance(elapsed_ms) {
            due.push(TickKind::Advance);
        }
        for _ in 0..self.spawn.advance(elapsed_ms) {
            due.push(TickKind::Spawn);
        }
        due
    }

    /// Clear accumulated timer state (on session reset)
    pub fn reset(&mut self) {
        self.spawn.reset();
        self.advance.reset();
    }
}
