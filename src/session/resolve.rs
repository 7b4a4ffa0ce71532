//! Answer resolution
//!
//! Matches submitted text against the active problems. A correct answer
//! resolves the earliest-inserted problem with that product; a wrong guess
//! always penalizes the longest-falling problem. The `resolving_incorrect`
//! guard keeps the life decrement from double-counting when a wrong keystroke
//! and a bottom overflow land in the same tick window.

use super::problem::level_requirements;
use super::state::{GamePhase, Session};
use crate::consts::*;

/// Outcome of one submitted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Correct(u64),
    Incorrect(u64),
    /// Ignored: not running, nothing falling, or unparseable input
    NoOp,
}

impl Session {
    /// Match typed input against the active problems
    pub fn submit(&mut self, text: &str) -> Resolution {
        if self.phase != GamePhase::Running || self.problems.is_empty() {
            return Resolution::NoOp;
        }
        let Ok(value) = text.trim().parse::<i64>() else {
            return Resolution::NoOp;
        };

        let matched = self
            .problems
            .iter()
            .find(|p| i64::from(p.answer) == value)
            .map(|p| p.id);

        match matched {
            Some(id) => {
                self.apply_correct(id);
                Resolution::Correct(id)
            }
            None => {
                // Penalize the problem that has been falling the longest
                let oldest = self.problems[0].id;
                if self.apply_incorrect(oldest) {
                    Resolution::Incorrect(oldest)
                } else {
                    Resolution::NoOp
                }
            }
        }
    }

    pub(super) fn apply_correct(&mut self, id: u64) {
        self.problems.retain(|p| p.id != id);
        self.score += SCORE_PER_ANSWER;
        self.level_progress += 1;
        self.pending_input.clear();

        if self.level_progress >= level_requirements(self.level).problems_needed {
            self.phase = GamePhase::LevelComplete;
            log::info!("level {} complete, score {}", self.level, self.score);
        }
    }

    /// Process one incorrect resolution. Returns false when dropped because
    /// another incorrect resolution is already in flight.
    pub(super) fn apply_incorrect(&mut self, id: u64) -> bool {
        if self.resolving_incorrect {
            return false;
        }
        self.resolving_incorrect = true;

        self.problems.retain(|p| p.id != id);
        self.pending_input.clear();
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.phase = GamePhase::GameOver;
            log::info!("game over at level {}, final score {}", self.level, self.score);
        }

        self.resolving_incorrect = false;
        true
    }
}
