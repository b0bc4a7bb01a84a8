//! Study technique configuration table.
//!
//! A technique names the durations of each phase of the study/break cycle
//! and how many study phases fit between long breaks. The table is a pure
//! lookup: no state, no IO.

use serde::{Deserialize, Serialize};

use crate::state::Phase;

/// Built-in techniques.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TechniqueId {
    /// Pomodoro 25/5 with a 15-minute long break every 4 study phases.
    Pomodoro,
    /// Deep Work 50/10 with a 30-minute long break every 3 study phases.
    DeepWork,
    /// Flow: unbounded study, no breaks.
    Flow,
}

/// Phase durations and long-break cadence for one technique.
///
/// `None` means the phase is unbounded and never triggers a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechniqueConfig {
    pub label: &'static str,
    pub study_min: Option<u64>,
    pub break_min: Option<u64>,
    pub long_break_min: Option<u64>,
    /// Number of completed study phases between long breaks.
    pub long_break_interval: u32,
}

const POMODORO: TechniqueConfig = TechniqueConfig {
    label: "Pomodoro 25/5",
    study_min: Some(25),
    break_min: Some(5),
    long_break_min: Some(15),
    long_break_interval: 4,
};

const DEEP_WORK: TechniqueConfig = TechniqueConfig {
    label: "Deep Work 50/10",
    study_min: Some(50),
    break_min: Some(10),
    long_break_min: Some(30),
    long_break_interval: 3,
};

const FLOW: TechniqueConfig = TechniqueConfig {
    label: "Flow",
    study_min: None,
    break_min: None,
    long_break_min: None,
    long_break_interval: u32::MAX,
};

impl TechniqueId {
    pub const ALL: [TechniqueId; 3] = [TechniqueId::Pomodoro, TechniqueId::DeepWork, TechniqueId::Flow];

    pub fn config(self) -> &'static TechniqueConfig {
        match self {
            TechniqueId::Pomodoro => &POMODORO,
            TechniqueId::DeepWork => &DEEP_WORK,
            TechniqueId::Flow => &FLOW,
        }
    }

    /// Stable string form, matching the serde tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TechniqueId::Pomodoro => "pomodoro",
            TechniqueId::DeepWork => "deepWork",
            TechniqueId::Flow => "flow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl TechniqueConfig {
    /// Configured duration of `phase` in seconds, `None` if unbounded.
    ///
    /// Uses saturating arithmetic to tolerate absurd custom values.
    pub fn phase_duration_secs(&self, phase: Phase) -> Option<u64> {
        let minutes = match phase {
            Phase::Studying => self.study_min,
            Phase::Break => self.break_min,
            Phase::LongBreak => self.long_break_min,
        };
        minutes.map(|m| m.saturating_mul(60))
    }

    /// Whether the technique has any break to switch into at all.
    pub fn has_break(&self) -> bool {
        matches!(self.break_min, Some(m) if m > 0)
    }

    /// Whether a long break is configured.
    pub fn has_long_break(&self) -> bool {
        matches!(self.long_break_min, Some(m) if m > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pomodoro_table_values() {
        let cfg = TechniqueId::Pomodoro.config();
        assert_eq!(cfg.phase_duration_secs(Phase::Studying), Some(25 * 60));
        assert_eq!(cfg.phase_duration_secs(Phase::Break), Some(5 * 60));
        assert_eq!(cfg.phase_duration_secs(Phase::LongBreak), Some(15 * 60));
        assert_eq!(cfg.long_break_interval, 4);
    }

    #[test]
    fn flow_is_unbounded_and_breakless() {
        let cfg = TechniqueId::Flow.config();
        assert_eq!(cfg.phase_duration_secs(Phase::Studying), None);
        assert!(!cfg.has_break());
        assert!(!cfg.has_long_break());
    }

    #[test]
    fn string_roundtrip() {
        for t in TechniqueId::ALL {
            assert_eq!(TechniqueId::parse(t.as_str()), Some(t));
        }
        assert_eq!(TechniqueId::parse("siesta"), None);
    }

    #[test]
    fn serde_tags_match_as_str() {
        for t in TechniqueId::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }
}
