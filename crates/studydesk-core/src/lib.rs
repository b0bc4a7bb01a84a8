//! # Studydesk Core Library
//!
//! Core logic for the Studydesk background study session timer: one
//! authoritative, persisted timer that tracks a study/break cycle and keeps
//! every independently running UI surface (popup, panel, full-page tab, the
//! CLI) showing the same phase and elapsed time.
//!
//! ## Architecture
//!
//! - **Timer Authority**: a wall-clock-based state machine that requires
//!   the caller to invoke `tick()` periodically; elapsed values are always
//!   derived from persisted timestamps, so host suspension causes no drift
//! - **Shared State Store**: key/value storage with change notification,
//!   composed from adapters tried in priority order (SQLite, JSON files,
//!   memory)
//! - **Command Router**: typed `timer.*` messages from any surface,
//!   answered with the resulting state; foreign families pass through
//! - **Side Effects**: sounds and OS notifications, decoupled from state
//!   correctness
//!
//! ## Key Components
//!
//! - [`TimerAuthority`]: the single writer of canonical timer state
//! - [`FallbackStore`]: the cross-context synchronization primitive
//! - [`CommandRouter`]: command de-multiplexing for UI surfaces
//! - [`SessionLog`]: append-only record of completed sessions

pub mod authority;
pub mod clock;
pub mod config;
pub mod effects;
pub mod error;
pub mod events;
pub mod indicator;
pub mod router;
pub mod sessions;
pub mod state;
pub mod store;
pub mod technique;

pub use authority::TimerAuthority;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use effects::{EffectDispatcher, Notifier, SoundKey, SoundPlayer};
pub use error::{ConfigError, CoreError, EffectError, Result, SessionLogError, StoreError};
pub use events::Broadcast;
pub use indicator::{badge, Badge};
pub use router::{Command, CommandResponse, CommandRouter};
pub use sessions::{SessionLog, Stats};
pub use state::{Phase, SettingsPatch, StudySession, TimerState, SCHEMA_VERSION, STATE_KEY};
pub use store::{FallbackStore, JsonFileStore, MemoryStore, SqliteStore, StateStore};
pub use technique::{TechniqueConfig, TechniqueId};
