//! Side-effect dispatch: notification sounds and OS notifications.
//!
//! Feedback only -- a playback rejection or a missing notification daemon
//! is logged and swallowed, never allowed to touch timer state. The sound
//! path is a capability interface with a direct implementation (spawn a
//! system playback command) and a delegated one that hands the request to a
//! helper surface through the shared store.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::EffectError;
use crate::state::{Phase, TimerState};
use crate::store::StateStore;

/// Store key a helper surface watches for delegated playback requests.
pub const SOUND_REQUEST_KEY: &str = "effects.sound";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKey {
    Start,
    Break,
}

pub trait SoundPlayer: Send + Sync {
    fn play(&self, key: SoundKey, volume: u8) -> Result<(), EffectError>;
}

/// Plays through whichever system playback command is on PATH.
///
/// Candidate commands and stock sound files follow the usual desktop
/// layouts (PulseAudio, ALSA, macOS).
pub struct CommandSoundPlayer {
    bin: &'static str,
}

const PLAYERS: &[&str] = &["paplay", "aplay", "afplay"];

fn sound_file(bin: &str, key: SoundKey) -> &'static str {
    match (bin, key) {
        ("paplay", SoundKey::Start) => "/usr/share/sounds/freedesktop/stereo/bell.oga",
        ("paplay", SoundKey::Break) => "/usr/share/sounds/freedesktop/stereo/complete.oga",
        ("aplay", _) => "/usr/share/sounds/alsa/Front_Center.wav",
        ("afplay", SoundKey::Start) => "/System/Library/Sounds/Ping.aiff",
        ("afplay", SoundKey::Break) => "/System/Library/Sounds/Glass.aiff",
        _ => "/usr/share/sounds/freedesktop/stereo/complete.oga",
    }
}

fn binary_on_path(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
        .unwrap_or(false)
}

impl CommandSoundPlayer {
    /// Capability probe: `Some` only if a known playback command exists.
    pub fn detect() -> Option<Self> {
        PLAYERS
            .iter()
            .copied()
            .find(|bin| binary_on_path(bin))
            .map(|bin| Self { bin })
    }
}

impl SoundPlayer for CommandSoundPlayer {
    fn play(&self, key: SoundKey, volume: u8) -> Result<(), EffectError> {
        let file = sound_file(self.bin, key);
        let mut cmd = std::process::Command::new(self.bin);
        match self.bin {
            // paplay volume is linear 0..65536.
            "paplay" => {
                cmd.arg(format!("--volume={}", u32::from(volume.min(100)) * 65536 / 100));
            }
            "afplay" => {
                cmd.arg("-v").arg(format!("{:.2}", f64::from(volume.min(100)) / 100.0));
            }
            _ => {}
        }
        cmd.arg(file)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|err| EffectError::Playback(err.to_string()))
    }
}

/// Used where direct media capability is missing: writes the request to the
/// shared store for a dedicated helper surface to pick up and play.
pub struct DelegatedSoundPlayer {
    store: Arc<dyn StateStore>,
}

impl DelegatedSoundPlayer {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

impl SoundPlayer for DelegatedSoundPlayer {
    fn play(&self, key: SoundKey, volume: u8) -> Result<(), EffectError> {
        // The timestamp makes back-to-back identical requests distinct writes.
        let request = serde_json::json!({
            "key": key,
            "volume": volume,
            "at": Utc::now().timestamp_millis(),
        });
        self.store
            .set(SOUND_REQUEST_KEY, &request.to_string())
            .map_err(|err| EffectError::Playback(err.to_string()))
    }
}

/// Discards every request. The quiet default for tests and headless runs.
#[derive(Default)]
pub struct NullSoundPlayer;

impl SoundPlayer for NullSoundPlayer {
    fn play(&self, _key: SoundKey, _volume: u8) -> Result<(), EffectError> {
        Ok(())
    }
}

pub trait Notifier: Send + Sync {
    /// Lazily verify the permission to show notifications. Returning
    /// `false` makes the authority turn `notifications_enabled` back off.
    fn ensure_permission(&self) -> bool;
    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError>;
}

/// OS notifications via the desktop notification daemon.
#[derive(Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn ensure_permission(&self) -> bool {
        // Desktop daemons don't gate on a permission grant; showing simply
        // fails later if none is running, and that failure is swallowed.
        true
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("studydesk")
            .show()
            .map(drop)
            .map_err(|err| EffectError::Notification(err.to_string()))
    }
}

/// Produces the feedback for session start and phase transitions, honoring
/// the user preferences carried in `TimerState`. Every failure is logged
/// and dropped here.
pub struct EffectDispatcher {
    sound: Box<dyn SoundPlayer>,
    notifier: Box<dyn Notifier>,
}

impl EffectDispatcher {
    pub fn new(sound: Box<dyn SoundPlayer>, notifier: Box<dyn Notifier>) -> Self {
        Self { sound, notifier }
    }

    /// Probe capabilities at startup: direct playback if a player command
    /// exists, otherwise delegate through the shared store.
    pub fn detect(store: Arc<dyn StateStore>) -> Self {
        let sound: Box<dyn SoundPlayer> = match CommandSoundPlayer::detect() {
            Some(player) => Box::new(player),
            None => {
                tracing::debug!("no playback command found, delegating sound through the store");
                Box::new(DelegatedSoundPlayer::new(store))
            }
        };
        Self::new(sound, Box::new(DesktopNotifier))
    }

    /// No sound, no notifications. For tests and non-interactive callers.
    pub fn silent() -> Self {
        Self::new(Box::new(NullSoundPlayer), Box::new(DesktopNotifier))
    }

    pub fn ensure_notification_permission(&self) -> bool {
        self.notifier.ensure_permission()
    }

    pub fn session_started(&self, state: &TimerState) {
        self.play(state, SoundKey::Start);
        self.show(state, "Study session started", "Time to focus 📚");
    }

    pub fn phase_changed(&self, state: &TimerState) {
        match state.phase {
            Phase::Break => {
                self.play(state, SoundKey::Break);
                self.show(state, "Break time ☕", "Step away for a few minutes.");
            }
            Phase::LongBreak => {
                self.play(state, SoundKey::Break);
                self.show(state, "Long break 🌴", "Great work! Take a longer rest.");
            }
            Phase::Studying => {
                self.play(state, SoundKey::Start);
                self.show(state, "Back to studying 📚", "Break is over, let's continue.");
            }
        }
    }

    fn play(&self, state: &TimerState, key: SoundKey) {
        if !state.audio_enabled {
            return;
        }
        if let Err(err) = self.sound.play(key, state.audio_volume) {
            tracing::warn!(%err, ?key, "sound playback failed");
        }
    }

    fn show(&self, state: &TimerState, title: &str, body: &str) {
        if !state.notifications_enabled {
            return;
        }
        if let Err(err) = self.notifier.notify(title, body) {
            tracing::warn!(%err, title, "notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn delegated_player_writes_a_request() {
        let store = MemoryStore::new();
        let player = DelegatedSoundPlayer::new(Arc::new(store.clone()));
        player.play(SoundKey::Break, 80).unwrap();
        let raw = store.get(SOUND_REQUEST_KEY).unwrap().unwrap();
        let request: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(request["key"], "break");
        assert_eq!(request["volume"], 80);
    }

    #[test]
    fn dispatcher_respects_audio_toggle() {
        // A player that fails loudly would surface misuse; the dispatcher
        // must not call it when audio is off.
        struct Exploding;
        impl SoundPlayer for Exploding {
            fn play(&self, _: SoundKey, _: u8) -> Result<(), EffectError> {
                panic!("played while audio disabled");
            }
        }
        struct Silent;
        impl Notifier for Silent {
            fn ensure_permission(&self) -> bool {
                true
            }
            fn notify(&self, _: &str, _: &str) -> Result<(), EffectError> {
                Ok(())
            }
        }
        let dispatcher = EffectDispatcher::new(Box::new(Exploding), Box::new(Silent));
        let mut state = TimerState::default();
        state.audio_enabled = false;
        state.notifications_enabled = false;
        dispatcher.session_started(&state);
        dispatcher.phase_changed(&state);
    }
}
