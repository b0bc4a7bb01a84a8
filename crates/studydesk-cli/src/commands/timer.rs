use std::sync::Arc;

use clap::Subcommand;
use studydesk_core::{
    badge, Command, CommandRouter, Config, EffectDispatcher, FallbackStore, SessionLog,
    SettingsPatch, StateStore, SystemClock, TechniqueId, TimerAuthority,
};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a study session
    Start {
        /// Course to attribute the session to
        #[arg(long)]
        course: Option<String>,
    },
    /// Stop the session and record it in the session log
    Stop,
    /// Zero elapsed time and the long-break counter
    Reset,
    /// Tick once, then print the current state and status badge as JSON
    Status,
    /// Update timer settings
    Set {
        /// Technique id: pomodoro, deepWork or flow
        #[arg(long)]
        technique: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        audio: Option<bool>,
        /// Sound volume, 0-100
        #[arg(long)]
        volume: Option<u8>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        countdown: Option<bool>,
    },
}

/// One router per invocation: state is loaded from the shared store, acted
/// on, and persisted back by the authority itself.
fn router() -> CommandRouter {
    let store: Arc<dyn StateStore> = Arc::new(FallbackStore::open_default());
    let effects = EffectDispatcher::detect(store.clone());
    let authority = TimerAuthority::with_seed(
        store,
        effects,
        Arc::new(SystemClock),
        Config::load().initial_state(),
    );
    CommandRouter::new(authority)
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let router = router();
    match action {
        TimerAction::Start { course } => {
            let response = router.dispatch(Command::Start { course_id: course }).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        TimerAction::Stop => {
            let response = router.dispatch(Command::Stop).await;
            if let Some(session) = &response.session {
                SessionLog::open()?.append(session)?;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        TimerAction::Reset => {
            let response = router.dispatch(Command::Reset).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        TimerAction::Status => {
            let state = router.authority().tick()?;
            let output = serde_json::json!({
                "state": state,
                "badge": badge(&state),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        TimerAction::Set {
            technique,
            course,
            note,
            audio,
            volume,
            notifications,
            countdown,
        } => {
            let technique = match technique {
                Some(raw) => Some(
                    TechniqueId::parse(&raw)
                        .ok_or_else(|| format!("unknown technique: {raw}"))?,
                ),
                None => None,
            };
            let patch = SettingsPatch {
                technique,
                course_id: course,
                note,
                audio_enabled: audio,
                audio_volume: volume,
                notifications_enabled: notifications,
                show_countdown: countdown,
                ..Default::default()
            };
            let response = router.dispatch(Command::UpdateState { patch }).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
