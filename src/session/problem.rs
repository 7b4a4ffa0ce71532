//! Problem generation
//!
//! Pure aside from the seeded RNG and id allocation: the same seed replays
//! the same problem stream.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Which multiplication table a level draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableSpec {
    /// Levels 1-11 drill one fixed table
    Fixed(u32),
    /// Level 12 and beyond draws from any table 2-12
    Random,
}

/// What a level asks of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub table: TableSpec,
    /// Correct answers required to clear the level
    pub problems_needed: u32,
}

/// Table and clear requirement for a level
pub fn level_requirements(level: u32) -> LevelSpec {
    if level <= 11 {
        LevelSpec {
            table: TableSpec::Fixed(level + 1),
            problems_needed: level + 4,
        }
    } else {
        LevelSpec {
            table: TableSpec::Random,
            problems_needed: level + 4,
        }
    }
}

/// A falling problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: u64,
    pub operand1: u32,
    pub operand2: u32,
    /// Always `operand1 * operand2`, fixed at creation
    pub answer: u32,
    /// `x` fixed at creation, `y` advances each tick
    pub pos: Vec2,
    /// Constant for the problem's lifetime
    pub fall_speed: f32,
}

impl Problem {
    /// Whether the problem has fallen past the bottom of the viewport
    pub fn is_below(&self, viewport_height: f32) -> bool {
        self.pos.y > viewport_height
    }
}

/// Problem factory owning the RNG and the monotonic id allocator
#[derive(Debug, Clone)]
pub struct ProblemGenerator {
    rng: Pcg32,
    next_id: u64,
}

impl ProblemGenerator {
    /// Create a generator with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Produce a new problem for the given level at the top of the viewport
    pub fn generate(&mut self, level: u32, viewport_width: f32) -> Problem {
        let operand1 = match level_requirements(level).table {
            TableSpec::Fixed(table) => table,
            TableSpec::Random => self.rng.random_range(2..=12),
        };
        let operand2 = self.rng.random_range(1..=10);

        // Keep the whole block on screen
        let max_x = (viewport_width - BLOCK_WIDTH).max(1.0);
        let x = self.rng.random_range(0.0..max_x);
        let fall_speed = self.rng.random_range(FALL_SPEED_MIN..FALL_SPEED_MAX);

        let id = self.next_id;
        self.next_id += 1;

        Problem {
            id,
            operand1,
            operand2,
            answer: operand1 * operand2,
            pos: Vec2::new(x, 0.0),
            fall_speed,
        }
    }
}
