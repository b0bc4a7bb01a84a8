//! Command router: de-multiplexes typed commands from any UI surface into
//! timer authority calls.
//!
//! Messages are discriminated by a `type` tag (`timer.start`, `timer.stop`,
//! ...). Anything outside the `timer.*` family is reported as unhandled, so
//! an outer dispatcher can route other command families over the same
//! channel; malformed `timer.*` messages are answered with `success: false`.
//!
//! Side-effect failures never reach a response; a command always resolves
//! with the resulting state. Store write failures surface as
//! `success: false` with the in-memory state, which stays the best
//! available truth until a write succeeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::authority::TimerAuthority;
use crate::state::{SettingsPatch, StudySession, TimerState};

/// Commands accepted from UI surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "timer.start")]
    Start {
        #[serde(rename = "courseId", default, skip_serializing_if = "Option::is_none")]
        course_id: Option<String>,
    },
    #[serde(rename = "timer.stop")]
    Stop,
    #[serde(rename = "timer.reset")]
    Reset,
    #[serde(rename = "timer.getState")]
    GetState,
    #[serde(rename = "timer.updateState")]
    UpdateState {
        #[serde(flatten)]
        patch: SettingsPatch,
    },
}

/// Response to every handled command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub state: TimerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<StudySession>,
}

impl CommandResponse {
    fn ok(state: TimerState) -> Self {
        Self {
            success: true,
            state,
            session: None,
        }
    }

    fn failed(state: TimerState) -> Self {
        Self {
            success: false,
            state,
            session: None,
        }
    }
}

pub struct CommandRouter {
    authority: Arc<TimerAuthority>,
}

impl CommandRouter {
    pub fn new(authority: Arc<TimerAuthority>) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &Arc<TimerAuthority> {
        &self.authority
    }

    /// Route a raw message. `None` means "not ours": the message belongs to
    /// another command family and other routers should see it. Anything in
    /// the `timer.*` family is answered, even when malformed.
    pub async fn route_value(&self, message: &serde_json::Value) -> Option<CommandResponse> {
        let tag = message.get("type").and_then(|t| t.as_str())?;
        if !tag.starts_with("timer.") {
            return None;
        }
        match serde_json::from_value::<Command>(message.clone()) {
            Ok(command) => Some(self.dispatch(command).await),
            Err(err) => {
                tracing::warn!(%err, tag, "malformed timer command");
                Some(CommandResponse::failed(self.authority.state()))
            }
        }
    }

    /// Apply a parsed command and answer with the resulting state.
    pub async fn dispatch(&self, command: Command) -> CommandResponse {
        match command {
            Command::Start { course_id } => self.respond(self.authority.start(course_id)),
            Command::Stop => match self.authority.stop() {
                Ok((state, session)) => CommandResponse {
                    success: true,
                    state,
                    session,
                },
                Err(err) => {
                    tracing::warn!(%err, "stop failed to persist");
                    CommandResponse::failed(self.authority.state())
                }
            },
            Command::Reset => self.respond(self.authority.reset()),
            Command::GetState => CommandResponse::ok(self.authority.state()),
            Command::UpdateState { patch } => self.respond(self.authority.update_settings(&patch)),
        }
    }

    fn respond(&self, result: crate::error::Result<TimerState>) -> CommandResponse {
        match result {
            Ok(state) => CommandResponse::ok(state),
            Err(err) => {
                tracing::warn!(%err, "command failed to persist");
                CommandResponse::failed(self.authority.state())
            }
        }
    }
}
