//! Persisted user preferences
//!
//! Two keys survive across sessions, string-encoded the way LocalStorage-shaped
//! host storage keeps everything: `musicEnabled` (JSON boolean) and
//! `musicVolume` (decimal float). Read at initialization, written on explicit
//! save only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::audio::{AudioController, AudioSink};
use crate::consts::DEFAULT_VOLUME;

/// String key/value storage seam, the shape of browser LocalStorage
pub trait PrefStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str);
}

/// In-memory store for tests and headless hosts
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_string(), value.to_string());
    }
}

/// User preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub music_enabled: bool,
    /// Target music volume, 0.0 - 1.0
    pub music_volume: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            music_enabled: true,
            music_volume: DEFAULT_VOLUME,
        }
    }
}

impl Preferences {
    const MUSIC_ENABLED_KEY: &'static str = "musicEnabled";
    const MUSIC_VOLUME_KEY: &'static str = "musicVolume";

    /// Load from the store, falling back to defaults for missing or
    /// unparseable entries
    pub fn load(store: &dyn PrefStore) -> Self {
        let defaults = Self::default();
        let music_enabled = store
            .get_item(Self::MUSIC_ENABLED_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(defaults.music_enabled);
        let music_volume = store
            .get_item(Self::MUSIC_VOLUME_KEY)
            .and_then(|raw| raw.parse::<f32>().ok())
            .map(|volume| volume.clamp(0.0, 1.0))
            .unwrap_or(defaults.music_volume);

        log::info!("loaded preferences: music {music_enabled}, volume {music_volume:.2}");
        Self {
            music_enabled,
            music_volume,
        }
    }

    /// Write both keys (explicit save)
    pub fn save(&self, store: &mut dyn PrefStore) {
        store.set_item(
            Self::MUSIC_ENABLED_KEY,
            if self.music_enabled { "true" } else { "false" },
        );
        store.set_item(Self::MUSIC_VOLUME_KEY, &self.music_volume.to_string());
        log::info!("preferences saved");
    }

    /// Push saved preferences into the audio controller: enabled music
    /// restarts playback, disabled music fades it out
    pub fn apply_to_audio<S: AudioSink>(&self, audio: &mut AudioController<S>) {
        audio.set_volume(self.music_volume);
        if self.music_enabled {
            audio.restart();
        } else {
            audio.pause();
        }
    }
}
