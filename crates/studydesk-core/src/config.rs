//! TOML-based application configuration.
//!
//! Seeds the first `TimerState` and carries host-level preferences that are
//! not part of the synchronized timer blob. Stored at
//! `~/.config/studydesk/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::state::TimerState;
use crate::store::data_dir;
use crate::technique::TechniqueId;

/// Timer defaults applied to a fresh state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_technique")]
    pub technique: TechniqueId,
    #[serde(default = "default_true")]
    pub show_countdown: bool,
}

/// Notification and audio defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub audio: bool,
    #[serde(default = "default_50")]
    pub volume: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_technique() -> TechniqueId {
    TechniqueId::Pomodoro
}
fn default_true() -> bool {
    true
}
fn default_50() -> u8 {
    50
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            technique: default_technique(),
            show_countdown: default_true(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            audio: default_true(),
            volume: default_50(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|err| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/studydesk"),
            message: err.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the config, falling back to defaults on any failure. A broken
    /// config file should never keep the timer from coming up.
    pub fn load() -> Self {
        let Ok(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(%err, ?path, "unparsable config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self).map_err(|err| ConfigError::SaveFailed {
            path: path.clone(),
            message: err.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|err| ConfigError::SaveFailed {
            path,
            message: err.to_string(),
        })
    }

    /// First-run seed for the shared timer state.
    pub fn initial_state(&self) -> TimerState {
        TimerState {
            technique: self.timer.technique,
            show_countdown: self.timer.show_countdown,
            notifications_enabled: self.notifications.enabled,
            audio_enabled: self.notifications.audio,
            audio_volume: self.notifications.volume.min(100),
            ..TimerState::default()
        }
    }

    // ── Dotted-key access for the CLI ────────────────────────────────

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "timer.technique" => Some(self.timer.technique.as_str().to_string()),
            "timer.show_countdown" => Some(self.timer.show_countdown.to_string()),
            "notifications.enabled" => Some(self.notifications.enabled.to_string()),
            "notifications.audio" => Some(self.notifications.audio.to_string()),
            "notifications.volume" => Some(self.notifications.volume.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        match key {
            "timer.technique" => {
                self.timer.technique =
                    TechniqueId::parse(value).ok_or_else(|| invalid("unknown technique"))?;
            }
            "timer.show_countdown" => {
                self.timer.show_countdown = value.parse().map_err(|_| invalid("expected bool"))?;
            }
            "notifications.enabled" => {
                self.notifications.enabled = value.parse().map_err(|_| invalid("expected bool"))?;
            }
            "notifications.audio" => {
                self.notifications.audio = value.parse().map_err(|_| invalid("expected bool"))?;
            }
            "notifications.volume" => {
                let volume: u8 = value.parse().map_err(|_| invalid("expected 0-100"))?;
                if volume > 100 {
                    return Err(invalid("expected 0-100"));
                }
                self.notifications.volume = volume;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.timer.technique, TechniqueId::Pomodoro);
        assert!(config.timer.show_countdown);
        assert!(config.notifications.audio);
        assert_eq!(config.notifications.volume, 50);
    }

    #[test]
    fn partial_toml_fills_the_rest() {
        let config: Config = toml::from_str(
            "[notifications]\nvolume = 80\n",
        )
        .unwrap();
        assert_eq!(config.notifications.volume, 80);
        assert!(config.notifications.audio);
        assert_eq!(config.timer.technique, TechniqueId::Pomodoro);
    }

    #[test]
    fn initial_state_carries_defaults() {
        let mut config = Config::default();
        config.timer.technique = TechniqueId::DeepWork;
        config.notifications.volume = 30;
        let state = config.initial_state();
        assert_eq!(state.technique, TechniqueId::DeepWork);
        assert_eq!(state.audio_volume, 30);
        assert!(!state.running);
    }

    #[test]
    fn dotted_key_get_covers_all_keys() {
        let config = Config::default();
        for key in [
            "timer.technique",
            "timer.show_countdown",
            "notifications.enabled",
            "notifications.audio",
            "notifications.volume",
        ] {
            assert!(config.get(key).is_some(), "missing {key}");
        }
        assert!(config.get("nope").is_none());
    }

    #[test]
    fn technique_round_trips_through_toml() {
        let mut config = Config::default();
        config.timer.technique = TechniqueId::Flow;
        let raw = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&raw).unwrap();
        assert_eq!(back.timer.technique, TechniqueId::Flow);
    }
}
