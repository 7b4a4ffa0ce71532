//! Session state and phase machine
//!
//! Everything the presentation layer observes lives here. State mutates only
//! through the operations on [`Session`]; ticks and submits are no-ops
//! outside the `Running` phase.

use serde::{Deserialize, Serialize};

use super::problem::{Problem, ProblemGenerator, level_requirements};
use crate::consts::*;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first user interaction
    NotStarted,
    /// Active gameplay, the only phase that processes ticks
    Running,
    /// Explicitly paused
    Paused,
    /// Level requirement met, waiting for continue
    LevelComplete,
    /// Run ended; terminal until reset
    GameOver,
}

/// Viewport dimensions, supplied by the presentation layer at tick time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Point-in-time view of the session for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub level: u32,
    pub score: u64,
    pub lives: u8,
    pub level_progress: u32,
    pub problems_needed: u32,
    pub problems: Vec<Problem>,
    pub phase: GamePhase,
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct Session {
    pub(super) generator: ProblemGenerator,
    pub(super) level: u32,
    pub(super) score: u64,
    pub(super) lives: u8,
    pub(super) level_progress: u32,
    /// Insertion order is the tie-break order for overflow and wrong answers
    pub(super) problems: Vec<Problem>,
    pub(super) phase: GamePhase,
    pub(super) pending_input: String,
    /// At most one incorrect resolution in flight
    pub(super) resolving_incorrect: bool,
}

impl Session {
    /// Create a fresh session; the seed drives the problem stream
    pub fn new(seed: u64) -> Self {
        Self {
            generator: ProblemGenerator::new(seed),
            level: 1,
            score: 0,
            lives: STARTING_LIVES,
            level_progress: 0,
            problems: Vec::new(),
            phase: GamePhase::NotStarted,
            pending_input: String::new(),
            resolving_incorrect: false,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    pub fn level_progress(&self) -> u32 {
        self.level_progress
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Replace the unsubmitted input text (ignored outside Running)
    pub fn set_pending_input(&mut self, text: &str) {
        if self.phase == GamePhase::Running {
            self.pending_input = text.to_string();
        }
    }

    /// Activate the session on the first user interaction. Idempotent.
    pub fn first_interaction(&mut self) {
        if self.phase == GamePhase::NotStarted {
            self.phase = GamePhase::Running;
            log::info!("session started");
        }
    }

    /// Toggle between Running and Paused. The LevelComplete display takes
    /// priority over the pause overlay, so toggling is rejected there.
    pub fn toggle_pause(&mut self) {
        match self.phase {
            GamePhase::Running => self.phase = GamePhase::Paused,
            GamePhase::Paused => self.phase = GamePhase::Running,
            _ => {}
        }
    }

    /// Advance past a completed level
    pub fn continue_level(&mut self) {
        if self.phase != GamePhase::LevelComplete {
            return;
        }
        self.level += 1;
        self.level_progress = 0;
        self.problems.clear();
        self.phase = GamePhase::Running;
        log::info!("continuing to level {}", self.level);
    }

    /// Full reset back to a fresh running session. Works from any phase
    /// except NotStarted, where activation is `first_interaction`'s job.
    pub fn reset(&mut self) {
        if self.phase == GamePhase::NotStarted {
            return;
        }
        self.level = 1;
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level_progress = 0;
        self.problems.clear();
        self.pending_input.clear();
        self.resolving_incorrect = false;
        self.phase = GamePhase::Running;
        log::info!("session reset");
    }

    /// Snapshot for the presentation layer
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            level: self.level,
            score: self.score,
            lives: self.lives,
            level_progress: self.level_progress,
            problems_needed: level_requirements(self.level).problems_needed,
            problems: self.problems.clone(),
            phase: self.phase,
        }
    }
}
