//! Compact status indicator derived from timer state.
//!
//! Pure function `(TimerState) -> Badge` for a toolbar-badge-sized display:
//! a phase prefix plus minutes remaining (or elapsed, for unbounded
//! phases), with an hour form once a full hour remains.

use serde::Serialize;

use crate::state::{Phase, TimerState};

pub const COLOR_STUDYING: &str = "#4caf50";
pub const COLOR_BREAK: &str = "#ff9800";
pub const COLOR_LONG_BREAK: &str = "#2196f3";
pub const COLOR_IDLE: &str = "#9e9e9e";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: String,
    pub color: &'static str,
}

impl Badge {
    fn empty() -> Self {
        Self {
            text: String::new(),
            color: COLOR_IDLE,
        }
    }
}

fn phase_prefix(phase: Phase) -> &'static str {
    match phase {
        Phase::Studying => "📖",
        Phase::Break => "☕",
        Phase::LongBreak => "🌴",
    }
}

fn phase_color(phase: Phase) -> &'static str {
    match phase {
        Phase::Studying => COLOR_STUDYING,
        Phase::Break => COLOR_BREAK,
        Phase::LongBreak => COLOR_LONG_BREAK,
    }
}

/// Derive the indicator for `state`. Cleared (empty text, neutral color)
/// when the timer is not running.
pub fn badge(state: &TimerState) -> Badge {
    if !state.running {
        return Badge::empty();
    }

    let prefix = phase_prefix(state.phase);
    let color = phase_color(state.phase);

    if !state.show_countdown {
        return Badge {
            text: prefix.to_string(),
            color,
        };
    }

    let config = state.technique.config();
    let minutes = match config.phase_duration_secs(state.phase) {
        // Bounded phase: minutes remaining, rounded up.
        Some(total) => total.saturating_sub(state.phase_elapsed).div_ceil(60),
        // Unbounded phase: minutes elapsed instead.
        None => state.phase_elapsed / 60,
    };

    let text = if minutes >= 60 {
        format!("{prefix}{}h", minutes / 60)
    } else {
        format!("{prefix}{minutes}")
    };

    Badge { text, color }
}
