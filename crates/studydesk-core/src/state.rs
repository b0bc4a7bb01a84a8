//! Canonical timer state and the session record derived from it.
//!
//! `TimerState` is the single persisted entity every UI surface reads. The
//! elapsed fields are always recomputed from the stored wall-clock
//! timestamps, never from a tick counter, which is what keeps them correct
//! across process suspension.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::technique::TechniqueId;

/// Version tag for the persisted blob. Bump on incompatible shape changes;
/// a mismatched blob is discarded at load time in favor of defaults.
pub const SCHEMA_VERSION: u32 = 1;

/// Well-known store key holding the serialized `TimerState`.
pub const STATE_KEY: &str = "timer.state";

/// One segment of a technique's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "studying")]
    Studying,
    #[serde(rename = "break")]
    Break,
    #[serde(rename = "longBreak")]
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::Break | Phase::LongBreak)
    }
}

/// The canonical, persisted timer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    #[serde(default)]
    pub schema_version: u32,
    pub running: bool,
    pub technique: TechniqueId,
    pub phase: Phase,
    /// Wall-clock start of the whole session.
    pub start_ts: Option<DateTime<Utc>>,
    /// Derived: whole seconds since `start_ts`, recomputed each tick.
    pub elapsed: u64,
    /// Wall-clock start of the current phase.
    pub phase_start_ts: Option<DateTime<Utc>>,
    /// Derived: whole seconds since `phase_start_ts`.
    pub phase_elapsed: u64,
    /// Completed `studying` phases; decides when a long break is due.
    pub study_phases_completed: u32,

    // Session metadata, opaque to the state machine.
    pub course_id: Option<String>,
    #[serde(default)]
    pub note: String,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,

    // User preferences carried alongside the timer.
    pub audio_enabled: bool,
    pub audio_volume: u8,
    pub notifications_enabled: bool,
    pub show_countdown: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            running: false,
            technique: TechniqueId::Pomodoro,
            phase: Phase::Studying,
            start_ts: None,
            elapsed: 0,
            phase_start_ts: None,
            phase_elapsed: 0,
            study_phases_completed: 0,
            course_id: None,
            note: String::new(),
            mood_start: None,
            mood_end: None,
            audio_enabled: true,
            audio_volume: 50,
            notifications_enabled: false,
            show_countdown: true,
        }
    }
}

impl TimerState {
    /// Reset every running/elapsed/phase field to idle defaults. Session
    /// metadata and preferences are left untouched.
    pub fn clear_run_fields(&mut self) {
        self.running = false;
        self.phase = Phase::Studying;
        self.start_ts = None;
        self.elapsed = 0;
        self.phase_start_ts = None;
        self.phase_elapsed = 0;
        self.study_phases_completed = 0;
    }

    /// Serialize for the shared store.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a persisted blob, discarding unparsable or
    /// wrong-schema-version payloads.
    pub fn decode(json: &str) -> Option<Self> {
        match serde_json::from_str::<TimerState>(json) {
            Ok(state) if state.schema_version == SCHEMA_VERSION => Some(state),
            Ok(state) => {
                tracing::warn!(
                    found = state.schema_version,
                    expected = SCHEMA_VERSION,
                    "discarding persisted timer state with wrong schema version"
                );
                None
            }
            Err(err) => {
                tracing::warn!(%err, "discarding unparsable persisted timer state");
                None
            }
        }
    }

    /// Merge a partial settings update.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(technique) = patch.technique {
            self.technique = technique;
        }
        if let Some(course_id) = &patch.course_id {
            self.course_id = Some(course_id.clone());
        }
        if let Some(note) = &patch.note {
            self.note = note.clone();
        }
        if let Some(mood) = &patch.mood_start {
            self.mood_start = Some(mood.clone());
        }
        if let Some(mood) = &patch.mood_end {
            self.mood_end = Some(mood.clone());
        }
        if let Some(enabled) = patch.audio_enabled {
            self.audio_enabled = enabled;
        }
        if let Some(volume) = patch.audio_volume {
            self.audio_volume = volume.min(100);
        }
        if let Some(enabled) = patch.notifications_enabled {
            self.notifications_enabled = enabled;
        }
        if let Some(show) = patch.show_countdown {
            self.show_countdown = show;
        }
    }
}

/// Partial update for the settings subset of `TimerState`. UI surfaces never
/// touch phase/elapsed fields through this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub technique: Option<TechniqueId>,
    pub course_id: Option<String>,
    pub note: Option<String>,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
    pub audio_enabled: Option<bool>,
    pub audio_volume: Option<u8>,
    pub notifications_enabled: Option<bool>,
    pub show_countdown: Option<bool>,
}

/// Append-only record of one completed study session, built at `stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: Uuid,
    pub course_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_min: u64,
    pub technique: TechniqueId,
    #[serde(default)]
    pub note: String,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
}

/// Session duration in whole minutes: rounded, floored at 1 so even a
/// 30-second session counts for something.
pub fn duration_min_from_secs(elapsed_secs: u64) -> u64 {
    ((elapsed_secs as f64 / 60.0).round() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_defaults() {
        let state = TimerState::default();
        assert!(!state.running);
        assert_eq!(state.phase, Phase::Studying);
        assert_eq!(state.start_ts, None);
        assert_eq!(state.elapsed, 0);
        assert_eq!(state.phase_elapsed, 0);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut state = TimerState::default();
        state.running = true;
        state.start_ts = Some(Utc::now());
        state.course_id = Some("math-101".into());
        let decoded = TimerState::decode(&state.encode().unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn decode_rejects_wrong_schema_version() {
        let mut state = TimerState::default();
        state.schema_version = SCHEMA_VERSION + 1;
        assert!(TimerState::decode(&state.encode().unwrap()).is_none());
        // A blob with no version tag at all defaults to 0 and is rejected too.
        assert!(TimerState::decode(r#"{"running":false}"#).is_none());
        assert!(TimerState::decode("not json").is_none());
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let json = TimerState::default().encode().unwrap();
        assert!(json.contains("\"startTs\""));
        assert!(json.contains("\"phaseElapsed\""));
        assert!(json.contains("\"studyPhasesCompleted\""));
        assert!(json.contains("\"notificationsEnabled\""));
    }

    #[test]
    fn apply_merges_only_given_fields() {
        let mut state = TimerState::default();
        state.note = "keep me".into();
        state.apply(&SettingsPatch {
            technique: Some(TechniqueId::DeepWork),
            audio_volume: Some(200),
            ..Default::default()
        });
        assert_eq!(state.technique, TechniqueId::DeepWork);
        assert_eq!(state.audio_volume, 100); // clamped
        assert_eq!(state.note, "keep me");
    }

    #[test]
    fn duration_rounding() {
        assert_eq!(duration_min_from_secs(30), 1);
        assert_eq!(duration_min_from_secs(0), 1);
        assert_eq!(duration_min_from_secs(125), 2);
        assert_eq!(duration_min_from_secs(25 * 60), 25);
    }
}
