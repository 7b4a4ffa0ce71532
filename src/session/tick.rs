//! Tick processing and the inbound event surface
//!
//! Two independent periodic triggers drive the session while Running:
//! problem spawning and fall advancement. Within one advance tick, movement
//! happens before overflow detection, and at most one overflowed problem is
//! resolved; the rest stay active and overflow again on later ticks.

use super::state::{GamePhase, Session, Viewport};

/// The two periodic tick kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Spawn,
    Advance,
}

/// Inbound events accepted from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Tick(TickKind),
    /// Submit the typed answer text
    Submit(String),
    TogglePause,
    /// Passthrough so the host can route its settings dialog; the core
    /// does nothing with it
    RequestSettings,
    ContinueLevel,
    Reset,
    FirstInteraction,
}

impl Session {
    /// Spawn tick: append one newly generated problem. No-op outside Running.
    pub fn spawn_tick(&mut self, viewport: Viewport) {
        if self.phase != GamePhase::Running {
            return;
        }
        let problem = self.generator.generate(self.level, viewport.width);
        log::debug!(
            "spawned {}x{} at x={:.0} (id {})",
            problem.operand1,
            problem.operand2,
            problem.pos.x,
            problem.id
        );
        self.problems.push(problem);
    }

    /// Advance tick: move every problem by its fall speed, then resolve at
    /// most one bottom overflow as an incorrect answer.
    pub fn advance_tick(&mut self, viewport: Viewport) {
        if self.phase != GamePhase::Running {
            return;
        }
        for problem in &mut self.problems {
            problem.pos.y += problem.fall_speed;
        }

        if self.resolving_incorrect {
            return;
        }
        let overflowed = self
            .problems
            .iter()
            .find(|p| p.is_below(viewport.height))
            .map(|p| p.id);
        if let Some(id) = overflowed {
            self.apply_incorrect(id);
        }
    }

    /// Single dispatch point for the presentation boundary
    pub fn handle_event(&mut self, event: SessionEvent, viewport: Viewport) {
        match event {
            SessionEvent::Tick(TickKind::Spawn) => self.spawn_tick(viewport),
            SessionEvent::Tick(TickKind::Advance) => self.advance_tick(viewport),
            SessionEvent::Submit(text) => {
                self.submit(&text);
            }
            SessionEvent::TogglePause => self.toggle_pause(),
            SessionEvent::RequestSettings => {}
            SessionEvent::ContinueLevel => self.continue_level(),
            SessionEvent::Reset => self.reset(),
            SessionEvent::FirstInteraction => self.first_interaction(),
        }
    }
}
