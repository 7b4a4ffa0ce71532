//! Mathfall entry point
//!
//! Headless demo driver: runs a scripted session against the core with
//! deterministic 16ms frames, exercising the full presentation boundary
//! (ticks, submits, phase transitions, audio lifecycle, preference
//! persistence). A real host renders snapshots instead of logging them.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use mathfall::{
    AudioController, GamePhase, MemoryStore, NullSink, Preferences, Scheduler, Session,
    SessionEvent, Viewport,
};

const MUSIC_URL: &str = "music/study-session.mp3";
const FRAME_MS: u64 = 16;
/// Simulated wall-clock cap for the demo run
const DEMO_LIMIT_MS: u64 = 120_000;
/// Caller-side policy: retry music this long after an audio error
const AUDIO_RETRY_MS: u64 = 3000;

fn main() {
    env_logger::init();

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0xC0FFEE);
    log::info!("mathfall demo starting with seed {seed}");

    let viewport = Viewport {
        width: 1280.0,
        height: 720.0,
    };

    let mut store = MemoryStore::new();
    let prefs = Preferences::load(&store);

    let mut audio = AudioController::new(NullSink::new());
    audio.set_loading_callback(Some(Box::new(|loading| {
        log::debug!("audio loading: {loading}");
    })));
    // Timed auto-retry is this driver's policy, not the controller's
    let audio_failed = Rc::new(Cell::new(false));
    let flag = audio_failed.clone();
    audio.set_error_callback(Some(Box::new(move |error| {
        log::warn!("audio error surfaced to host: {error}");
        flag.set(true);
    })));

    let mut session = Session::new(seed);
    let mut scheduler = Scheduler::new();

    // First interaction activates the session and starts the music
    session.handle_event(SessionEvent::FirstInteraction, viewport);
    audio.init(MUSIC_URL);
    audio.set_volume(prefs.music_volume);
    if prefs.music_enabled {
        audio.restart();
    }

    let mut now_ms: u64 = 0;
    let mut retry_at: Option<u64> = None;

    while session.phase() != GamePhase::GameOver && now_ms < DEMO_LIMIT_MS {
        now_ms += FRAME_MS;
        for kind in scheduler.advance(FRAME_MS) {
            session.handle_event(SessionEvent::Tick(kind), viewport);
        }
        audio.update(FRAME_MS);

        if audio_failed.take() {
            retry_at = Some(now_ms + AUDIO_RETRY_MS);
        }
        if retry_at.is_some_and(|at| now_ms >= at) {
            retry_at = None;
            if prefs.music_enabled {
                audio.restart();
            }
        }

        // Scripted player: answer the oldest problem every two seconds,
        // fumbling every fifth one
        if now_ms % 2000 == 0 {
            let snapshot = session.snapshot();
            if let Some(oldest) = snapshot.problems.first() {
                let text = if oldest.id % 5 == 0 {
                    "1".to_string() // never a valid product here
                } else {
                    oldest.answer.to_string()
                };
                session.handle_event(SessionEvent::Submit(text), viewport);
            }
            let snapshot = session.snapshot();
            log::info!(
                "t={:>6}ms level {} score {} lives {} progress {}/{} falling {}",
                now_ms,
                snapshot.level,
                snapshot.score,
                snapshot.lives,
                snapshot.level_progress,
                snapshot.problems_needed,
                snapshot.problems.len(),
            );
        }

        if session.phase() == GamePhase::LevelComplete {
            let snapshot = session.snapshot();
            log::info!(
                "level {} complete with score {}",
                snapshot.level,
                snapshot.score
            );
            if snapshot.level >= 2 {
                break;
            }
            session.handle_event(SessionEvent::ContinueLevel, viewport);
            scheduler.reset();
        }
    }

    let snapshot = session.snapshot();
    log::info!(
        "demo finished at t={now_ms}ms: level {}, score {}, lives {}, phase {:?}, audio {:?}",
        snapshot.level,
        snapshot.score,
        snapshot.lives,
        snapshot.phase,
        audio.status(),
    );

    audio.teardown();
    prefs.save(&mut store);
}
