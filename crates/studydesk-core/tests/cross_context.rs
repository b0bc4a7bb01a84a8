//! Cross-context propagation tests.
//!
//! Two "contexts" are two independent authority instances holding separate
//! handles to the same backing store, the way a popup and a side panel each
//! host their own instance in separate processes. The store's change
//! notification is the only thing keeping them consistent.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use studydesk_core::{
    Command, CommandRouter, EffectDispatcher, ManualClock, MemoryStore, SettingsPatch, StateStore,
    TimerAuthority, TimerState, STATE_KEY,
};

fn context(store: &MemoryStore, clock: &ManualClock) -> Arc<TimerAuthority> {
    TimerAuthority::new(
        Arc::new(store.clone()),
        EffectDispatcher::silent(),
        Arc::new(clock.clone()),
    )
}

#[test]
fn start_in_one_context_is_observed_by_the_other() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap());
    let popup = context(&store, &clock);
    let panel = context(&store, &clock);

    // The panel's own store handle also watches for the raw change event.
    let observed: Arc<Mutex<Vec<TimerState>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    store.subscribe(Arc::new(move |key, value| {
        if key == STATE_KEY {
            if let Some(state) = TimerState::decode(value) {
                sink.lock().unwrap().push(state);
            }
        }
    }));

    let started = popup.start(Some("math-101".into())).unwrap();

    // The panel's in-memory copy converged without any direct call.
    let panel_state = panel.state();
    assert!(panel_state.running);
    assert_eq!(panel_state.start_ts, started.start_ts);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].start_ts, started.start_ts);
}

#[test]
fn settings_changed_anywhere_propagate_everywhere() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap());
    let tab = context(&store, &clock);
    let panel = context(&store, &clock);

    tab.update_settings(&SettingsPatch {
        audio_volume: Some(15),
        note: Some("library, third floor".into()),
        ..Default::default()
    })
    .unwrap();

    let seen = panel.state();
    assert_eq!(seen.audio_volume, 15);
    assert_eq!(seen.note, "library, third floor");
}

#[test]
fn a_second_context_ticks_state_started_elsewhere() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap());
    let popup = context(&store, &clock);
    let panel = context(&store, &clock);

    popup.start(None).unwrap();
    clock.advance_secs(90);
    // The popup process is suspended; the panel's tick still derives the
    // right elapsed time from the shared timestamps.
    let state = panel.tick().unwrap();
    assert_eq!(state.elapsed, 90);

    // And the popup adopts the panel's recomputation in turn.
    assert_eq!(popup.state().elapsed, 90);
}

#[tokio::test]
async fn a_fresh_context_reads_the_last_persisted_state() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap());
    let router = CommandRouter::new(context(&store, &clock));
    router.dispatch(Command::Start { course_id: None }).await;

    // A surface opened later bootstraps from the store, not from defaults.
    let late_comer = context(&store, &clock);
    assert!(late_comer.state().running);
}
