//! Background music controller with fade transitions
//!
//! Owns one URL-identified streaming resource through an injected
//! [`AudioSink`], the seam between controller policy and whatever the host
//! actually plays audio with. All load and playback failures are non-fatal:
//! the controller attempts a bounded recovery (one re-initialization on a
//! failed play) and otherwise surfaces the error through the error callback
//! for the caller to decide. Timed auto-retry is caller policy.
//!
//! Volume never jumps: play fades in over one second, pause fades out over
//! half a second and only then stops the stream, so there is no audible
//! click. A newer fade always supersedes the one in flight.

use std::collections::VecDeque;

use thiserror::Error;

use crate::consts::*;
use crate::ease_in_out_quad;

/// Load/playback failures surfaced through the error callback
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("failed to load audio source {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("playback failed: {reason}")]
    Playback { reason: String },
}

/// Asynchronous events a sink reports back to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// The resource buffered enough to play through
    ReadyToPlay,
    LoadFailed(String),
    /// Natural end of the stream
    PlaybackEnded,
}

/// Host playback seam. Implementations wrap the platform audio handle.
pub trait AudioSink {
    /// Begin loading a source; readiness or failure arrives via `poll_event`
    fn load(&mut self, url: &str);
    /// Release the current resource and drop any pending events
    fn unload(&mut self);
    fn play(&mut self) -> Result<(), String>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn seek_start(&mut self);
    fn has_ended(&self) -> bool;
    /// Drain one pending event, if any
    fn poll_event(&mut self) -> Option<SinkEvent>;
}

/// Load lifecycle of the audio resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Uninitialized,
    Loading,
    Ready,
}

/// An in-flight volume ramp
#[derive(Debug, Clone)]
struct Fade {
    from: f32,
    to: f32,
    duration_ms: u64,
    elapsed_ms: u64,
    /// Issue the actual sink pause once the ramp completes
    pause_when_done: bool,
}

/// Observable controller state for HUD and settings display
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStatus {
    pub playing: bool,
    pub loading: bool,
    pub ready: bool,
    pub volume: f32,
    pub last_error: Option<AudioError>,
}

/// Background music controller
pub struct AudioController<S: AudioSink> {
    sink: S,
    source_url: Option<String>,
    load_state: LoadState,
    playing: bool,
    looping: bool,
    loading: bool,
    target_volume: f32,
    fade: Option<Fade>,
    fade_accum_ms: u64,
    last_error: Option<AudioError>,
    on_loading: Option<Box<dyn FnMut(bool)>>,
    on_error: Option<Box<dyn FnMut(&AudioError)>>,
}

impl<S: AudioSink> AudioController<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            source_url: None,
            load_state: LoadState::Uninitialized,
            playing: false,
            looping: true,
            loading: false,
            target_volume: DEFAULT_VOLUME,
            fade: None,
            fade_accum_ms: 0,
            last_error: None,
            on_loading: None,
            on_error: None,
        }
    }

    /// Register the loading-state hook. Single slot: the last registration
    /// wins, `None` clears it.
    pub fn set_loading_callback(&mut self, callback: Option<Box<dyn FnMut(bool)>>) {
        self.on_loading = callback;
    }

    /// Register the error hook. Single slot, last registration wins. Errors
    /// raised while no hook is attached are dropped.
    pub fn set_error_callback(&mut self, callback: Option<Box<dyn FnMut(&AudioError)>>) {
        self.on_error = callback;
    }

    /// Begin loading `url`. Idempotent while the same source is live:
    /// repeated calls do not reallocate the resource.
    pub fn init(&mut self, url: &str) {
        self.set_loading(true);

        let same_source =
            self.source_url.as_deref() == Some(url) && self.load_state != LoadState::Uninitialized;
        self.source_url = Some(url.to_string());
        if same_source {
            self.set_loading(false);
            return;
        }

        // Tear down whatever was loaded before and start silent for the
        // eventual fade-in
        if self.load_state != LoadState::Uninitialized {
            self.sink.pause();
            self.sink.unload();
        }
        self.fade = None;
        self.sink.set_volume(0.0);
        self.load_state = LoadState::Loading;
        self.sink.load(url);
        log::info!("loading audio source {url}");
    }

    /// Start playback and fade the volume in. With no live resource but a
    /// known source URL, re-initializes instead; playback then begins on a
    /// later call.
    pub fn play(&mut self) {
        if self.load_state == LoadState::Uninitialized {
            if let Some(url) = self.source_url.clone() {
                self.init(&url);
            }
            return;
        }
        if self.playing {
            // Supersede a pending fade-out so a pause-then-play flurry
            // keeps the stream alive
            if self.fade.as_ref().is_some_and(|f| f.pause_when_done) {
                self.start_fade(self.sink.volume(), self.target_volume, FADE_IN_MS, false);
            }
            return;
        }

        self.set_loading(true);
        if self.sink.has_ended() {
            self.sink.seek_start();
        }
        match self.sink.play() {
            Ok(()) => {
                self.playing = true;
                self.set_loading(false);
                self.start_fade(0.0, self.target_volume, FADE_IN_MS, false);
            }
            Err(reason) => {
                self.handle_error(AudioError::Playback { reason });
                // One automatic recovery attempt: reload the source
                if let Some(url) = self.source_url.clone() {
                    self.load_state = LoadState::Uninitialized;
                    self.init(&url);
                }
            }
        }
    }

    /// Fade out, then stop. The sink pause is issued only once the ramp
    /// completes (or never, if a newer fade supersedes it).
    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.start_fade(self.sink.volume(), 0.0, FADE_OUT_MS, true);
    }

    /// Clamp to [0, 1] and adopt as the new target. Re-fades while playing,
    /// otherwise applies directly.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.target_volume = volume;
        if self.playing {
            self.start_fade(self.sink.volume(), volume, FADE_IN_MS, false);
        } else {
            self.sink.set_volume(volume);
        }
    }

    /// Rewind to the start and play
    pub fn restart(&mut self) {
        if self.load_state == LoadState::Uninitialized {
            if self.source_url.is_none() {
                return;
            }
        } else {
            self.sink.seek_start();
        }
        self.play();
    }

    /// Whether reaching the natural end restarts playback
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Advance fades and drain sink events. The host calls this from its
    /// frame loop with elapsed wall time.
    pub fn update(&mut self, elapsed_ms: u64) {
        self.drain_sink_events();
        self.advance_fade(elapsed_ms);
    }

    /// Stop playback, drop the resource and clear both observer hooks
    pub fn teardown(&mut self) {
        self.fade = None;
        self.fade_accum_ms = 0;
        self.sink.pause();
        self.sink.unload();
        self.load_state = LoadState::Uninitialized;
        self.playing = false;
        self.set_loading(false);
        self.on_loading = None;
        self.on_error = None;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_ready(&self) -> bool {
        self.load_state == LoadState::Ready
    }

    pub fn status(&self) -> AudioStatus {
        AudioStatus {
            playing: self.playing,
            loading: self.loading,
            ready: self.is_ready(),
            volume: self.sink.volume(),
            last_error: self.last_error.clone(),
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        if let Some(callback) = self.on_loading.as_mut() {
            callback(loading);
        }
    }

    fn handle_error(&mut self, error: AudioError) {
        log::error!("audio error: {error}");
        self.playing = false;
        self.set_loading(false);
        self.last_error = Some(error.clone());
        if let Some(callback) = self.on_error.as_mut() {
            callback(&error);
        }
    }

    fn start_fade(&mut self, from: f32, to: f32, duration_ms: u64, pause_when_done: bool) {
        // A newer fade supersedes any fade in progress
        self.fade = Some(Fade {
            from,
            to,
            duration_ms,
            elapsed_ms: 0,
            pause_when_done,
        });
        self.fade_accum_ms = 0;
    }

    fn drain_sink_events(&mut self) {
        while let Some(event) = self.sink.poll_event() {
            match event {
                SinkEvent::ReadyToPlay => {
                    self.load_state = LoadState::Ready;
                    self.set_loading(false);
                    if self.playing {
                        self.start_fade(self.sink.volume(), self.target_volume, FADE_IN_MS, false);
                    }
                }
                SinkEvent::LoadFailed(reason) => {
                    let url = self.source_url.clone().unwrap_or_default();
                    self.load_state = LoadState::Uninitialized;
                    self.handle_error(AudioError::Load { url, reason });
                }
                SinkEvent::PlaybackEnded => {
                    if self.looping {
                        self.sink.seek_start();
                        if let Err(reason) = self.sink.play() {
                            self.handle_error(AudioError::Playback { reason });
                        }
                    } else {
                        self.playing = false;
                    }
                }
            }
        }
    }

    /// Step the in-flight fade in fixed quanta so the curve sounds the same
    /// regardless of the host's frame cadence
    fn advance_fade(&mut self, elapsed_ms: u64) {
        if self.fade.is_none() {
            return;
        }
        self.fade_accum_ms += elapsed_ms;
        while self.fade_accum_ms >= FADE_STEP_MS {
            self.fade_accum_ms -= FADE_STEP_MS;
            let Some(fade) = self.fade.as_mut() else {
                break;
            };
            fade.elapsed_ms += FADE_STEP_MS;
            let progress = (fade.elapsed_ms as f32 / fade.duration_ms as f32).min(1.0);
            let volume = fade.from + (fade.to - fade.from) * ease_in_out_quad(progress);
            self.sink.set_volume(volume);

            if progress >= 1.0 {
                let pause_now = fade.pause_when_done;
                self.fade = None;
                self.fade_accum_ms = 0;
                if pause_now {
                    self.sink.pause();
                    self.playing = false;
                }
                break;
            }
        }
    }
}

/// Silent sink for headless hosts and tests: every operation succeeds and a
/// load reports ready on the next poll.
#[derive(Debug, Default)]
pub struct NullSink {
    url: Option<String>,
    volume: f32,
    playing: bool,
    ended: bool,
    events: VecDeque<SinkEvent>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for NullSink {
    fn load(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.events.push_back(SinkEvent::ReadyToPlay);
    }

    fn unload(&mut self) {
        self.url = None;
        self.playing = false;
        self.events.clear();
    }

    fn play(&mut self) -> Result<(), String> {
        if self.url.is_none() {
            return Err("no source loaded".to_string());
        }
        self.playing = true;
        self.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn seek_start(&mut self) {
        self.ended = false;
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn poll_event(&mut self) -> Option<SinkEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const URL: &str = "music/study-session.mp3";

    /// Wall time after which a fade of `duration_ms` has certainly finished:
    /// fades advance in whole 16ms quanta, so completion lands on the first
    /// step at or past the duration
    fn fade_time(duration_ms: u64) -> u64 {
        duration_ms.div_ceil(FADE_STEP_MS) * FADE_STEP_MS
    }

    /// Scripted sink recording every call for assertions
    #[derive(Debug, Default)]
    struct TestSink {
        calls: Vec<String>,
        play_results: VecDeque<Result<(), String>>,
        events: VecDeque<SinkEvent>,
        url: Option<String>,
        volume: f32,
        ended: bool,
    }

    impl TestSink {
        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl AudioSink for TestSink {
        fn load(&mut self, url: &str) {
            self.calls.push("load".to_string());
            self.url = Some(url.to_string());
        }

        fn unload(&mut self) {
            self.calls.push("unload".to_string());
            self.url = None;
            self.events.clear();
        }

        fn play(&mut self) -> Result<(), String> {
            self.calls.push("play".to_string());
            self.play_results.pop_front().unwrap_or(Ok(()))
        }

        fn pause(&mut self) {
            self.calls.push("pause".to_string());
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn volume(&self) -> f32 {
            self.volume
        }

        fn seek_start(&mut self) {
            self.calls.push("seek_start".to_string());
            self.ended = false;
        }

        fn has_ended(&self) -> bool {
            self.ended
        }

        fn poll_event(&mut self) -> Option<SinkEvent> {
            self.events.pop_front()
        }
    }

    fn ready_controller() -> AudioController<TestSink> {
        let mut controller = AudioController::new(TestSink::default());
        controller.init(URL);
        controller.sink.events.push_back(SinkEvent::ReadyToPlay);
        controller.update(0);
        controller
    }

    #[test]
    fn test_init_idempotent_for_same_source() {
        let mut controller = AudioController::new(TestSink::default());
        controller.init(URL);
        controller.init(URL);
        assert_eq!(controller.sink.count("load"), 1);
    }

    #[test]
    fn test_init_new_source_reallocates() {
        let mut controller = AudioController::new(TestSink::default());
        controller.init(URL);
        controller.init("music/other.mp3");
        assert_eq!(controller.sink.count("load"), 2);
        assert_eq!(controller.sink.count("unload"), 1);
        // Volume reset for the fade-in
        assert_eq!(controller.sink.volume(), 0.0);
    }

    #[test]
    fn test_ready_event_clears_loading() {
        let observed = Rc::new(RefCell::new(Vec::new()));
        let hook = observed.clone();

        let mut controller = AudioController::new(TestSink::default());
        controller.set_loading_callback(Some(Box::new(move |loading| {
            hook.borrow_mut().push(loading);
        })));
        controller.init(URL);
        assert!(controller.status().loading);

        controller.sink.events.push_back(SinkEvent::ReadyToPlay);
        controller.update(0);
        assert!(!controller.status().loading);
        assert!(controller.is_ready());
        assert_eq!(*observed.borrow(), vec![true, false]);
    }

    #[test]
    fn test_play_fades_to_target() {
        let mut controller = ready_controller();
        controller.set_volume(0.8);
        controller.play();
        assert!(controller.is_playing());

        controller.update(FADE_IN_MS / 2);
        let midway = controller.sink.volume();
        assert!(midway > 0.0 && midway < 0.8);

        controller.update(fade_time(FADE_IN_MS));
        assert!((controller.sink.volume() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_play_without_resource_reinitializes_only() {
        let mut controller = AudioController::new(TestSink::default());
        controller.init(URL);
        controller.teardown();

        // Source URL is remembered; play re-initializes but does not start
        controller.play();
        assert_eq!(controller.sink.count("load"), 2);
        assert_eq!(controller.sink.count("play"), 0);
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_play_failure_raises_error_and_reinitializes_once() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let hook = errors.clone();

        let mut controller = ready_controller();
        controller.set_error_callback(Some(Box::new(move |error| {
            hook.borrow_mut().push(error.clone());
        })));
        controller.sink.play_results.push_back(Err("decoder stall".to_string()));

        controller.play();
        assert!(!controller.is_playing());
        assert_eq!(controller.sink.count("play"), 1);
        assert_eq!(controller.sink.count("load"), 2); // initial + recovery
        assert_eq!(
            *errors.borrow(),
            vec![AudioError::Playback {
                reason: "decoder stall".to_string()
            }]
        );
    }

    #[test]
    fn test_pause_fades_out_before_stopping() {
        let mut controller = ready_controller();
        controller.play();
        controller.update(fade_time(FADE_IN_MS));
        controller.pause();

        controller.update(FADE_OUT_MS / 2);
        assert!(controller.is_playing());
        assert_eq!(controller.sink.count("pause"), 0);
        assert!(controller.sink.volume() > 0.0);

        controller.update(fade_time(FADE_OUT_MS));
        assert!(!controller.is_playing());
        assert_eq!(controller.sink.count("pause"), 1);
        assert_eq!(controller.sink.volume(), 0.0);
    }

    #[test]
    fn test_newer_fade_cancels_pending_pause() {
        let mut controller = ready_controller();
        controller.play();
        controller.update(fade_time(FADE_IN_MS));
        controller.pause();
        controller.update(FADE_OUT_MS / 2);

        // Volume change supersedes the fade-out; the stream keeps playing
        controller.set_volume(0.9);
        controller.update(fade_time(FADE_IN_MS));
        assert!(controller.is_playing());
        assert_eq!(controller.sink.count("pause"), 0);
        assert!((controller.sink.volume() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_play_during_fade_out_keeps_stream_alive() {
        let mut controller = ready_controller();
        controller.play();
        controller.update(fade_time(FADE_IN_MS));
        controller.pause();
        controller.update(FADE_OUT_MS / 2);

        controller.play();
        controller.update(fade_time(FADE_IN_MS));
        assert!(controller.is_playing());
        assert_eq!(controller.sink.count("pause"), 0);
        assert!((controller.sink.volume() - DEFAULT_VOLUME).abs() < 1e-6);
    }

    // Scenario: volume requests outside [0, 1] clamp to the bounds
    #[test]
    fn test_set_volume_clamps() {
        let mut controller = ready_controller();
        controller.set_volume(1.5);
        assert_eq!(controller.sink.volume(), 1.0);
        controller.set_volume(-0.2);
        assert_eq!(controller.sink.volume(), 0.0);
    }

    #[test]
    fn test_set_volume_while_stopped_applies_directly() {
        let mut controller = ready_controller();
        controller.set_volume(0.3);
        // No fade when nothing is playing
        assert_eq!(controller.sink.volume(), 0.3);
        assert!(controller.fade.is_none());
    }

    #[test]
    fn test_restart_seeks_then_plays() {
        let mut controller = ready_controller();
        controller.restart();
        assert!(controller.is_playing());
        let seek = controller.calls_position("seek_start");
        let play = controller.calls_position("play");
        assert!(seek < play);
    }

    #[test]
    fn test_looping_restarts_on_natural_end() {
        let mut controller = ready_controller();
        controller.play();
        controller.update(fade_time(FADE_IN_MS));

        controller.sink.events.push_back(SinkEvent::PlaybackEnded);
        controller.sink.ended = true;
        controller.update(0);
        assert!(controller.is_playing());
        assert_eq!(controller.sink.count("seek_start"), 1);
        assert_eq!(controller.sink.count("play"), 2);
    }

    #[test]
    fn test_loop_restart_failure_raises_error() {
        let errors = Rc::new(RefCell::new(0));
        let hook = errors.clone();

        let mut controller = ready_controller();
        controller.set_error_callback(Some(Box::new(move |_| {
            *hook.borrow_mut() += 1;
        })));
        controller.play();
        controller.update(fade_time(FADE_IN_MS));

        controller.sink.play_results.push_back(Err("restart refused".to_string()));
        controller.sink.events.push_back(SinkEvent::PlaybackEnded);
        controller.update(0);
        assert_eq!(*errors.borrow(), 1);
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_natural_end_without_looping_just_stops() {
        let mut controller = ready_controller();
        controller.set_looping(false);
        controller.play();
        controller.update(fade_time(FADE_IN_MS));

        controller.sink.events.push_back(SinkEvent::PlaybackEnded);
        controller.update(0);
        assert!(!controller.is_playing());
        assert_eq!(controller.sink.count("play"), 1);
    }

    #[test]
    fn test_load_failure_surfaces_error() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let hook = errors.clone();

        let mut controller = AudioController::new(TestSink::default());
        controller.set_error_callback(Some(Box::new(move |error| {
            hook.borrow_mut().push(error.clone());
        })));
        controller.init(URL);
        controller.sink.events.push_back(SinkEvent::LoadFailed("404".to_string()));
        controller.update(0);

        assert_eq!(errors.borrow().len(), 1);
        assert!(matches!(&errors.borrow()[0], AudioError::Load { url, .. } if url == URL));
        assert!(!controller.is_ready());
    }

    #[test]
    fn test_error_without_listener_is_dropped() {
        let mut controller = AudioController::new(TestSink::default());
        controller.init(URL);
        controller.sink.events.push_back(SinkEvent::LoadFailed("404".to_string()));
        controller.update(0);
        // No panic, error retained only as status
        assert!(controller.status().last_error.is_some());
    }

    #[test]
    fn test_callback_single_slot_last_wins() {
        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(0));

        let mut controller = AudioController::new(TestSink::default());
        let hook = first.clone();
        controller.set_loading_callback(Some(Box::new(move |_| *hook.borrow_mut() += 1)));
        let hook = second.clone();
        controller.set_loading_callback(Some(Box::new(move |_| *hook.borrow_mut() += 1)));

        controller.init(URL);
        assert_eq!(*first.borrow(), 0);
        assert!(*second.borrow() > 0);
    }

    #[test]
    fn test_teardown_clears_callbacks_and_resource() {
        let calls = Rc::new(RefCell::new(0));
        let hook = calls.clone();

        let mut controller = ready_controller();
        controller.set_error_callback(Some(Box::new(move |_| *hook.borrow_mut() += 1)));
        controller.play();
        controller.teardown();
        assert!(!controller.is_playing());
        assert!(!controller.is_ready());

        // Events after teardown no longer reach the cleared hooks
        controller.sink.events.push_back(SinkEvent::LoadFailed("late".to_string()));
        controller.update(0);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_null_sink_reports_ready() {
        let mut controller = AudioController::new(NullSink::new());
        controller.init(URL);
        controller.update(0);
        assert!(controller.is_ready());
        controller.play();
        assert!(controller.is_playing());
    }

    impl AudioController<TestSink> {
        fn calls_position(&self, call: &str) -> usize {
            self.sink.calls.iter().position(|c| c == call).unwrap()
        }
    }
}
