//! Timer authority: the single writer of canonical timer state.
//!
//! A wall-clock-based state machine with no internal thread of its own --
//! the host calls `tick()` once per second (or uses [`TimerAuthority::spawn_ticker`]).
//! Elapsed values are always re-derived from `now - start_ts`, never from a
//! tick counter, so a suspended and resumed host process picks up with the
//! correct times on its first tick.
//!
//! Every process may host its own authority instance; the shared store's
//! change listener keeps each instance's in-memory copy eventually
//! consistent with the last accepted write (last write wins).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::clock::Clock;
use crate::effects::EffectDispatcher;
use crate::error::Result;
use crate::events::Broadcast;
use crate::state::{duration_min_from_secs, Phase, SettingsPatch, StudySession, TimerState, STATE_KEY};
use crate::store::StateStore;

pub struct TimerAuthority {
    state: Mutex<TimerState>,
    store: Arc<dyn StateStore>,
    effects: EffectDispatcher,
    clock: Arc<dyn Clock>,
    broadcast: broadcast::Sender<Broadcast>,
}

fn elapsed_secs(since: Option<chrono::DateTime<chrono::Utc>>, now: chrono::DateTime<chrono::Utc>) -> u64 {
    since.map(|ts| (now - ts).num_seconds().max(0) as u64).unwrap_or(0)
}

impl TimerAuthority {
    /// Construct with injected dependencies. The persisted state is adopted
    /// if present and schema-compatible, otherwise `seed` is used.
    ///
    /// The authority subscribes to the store so writes from other contexts
    /// replace its in-memory copy.
    pub fn with_seed(
        store: Arc<dyn StateStore>,
        effects: EffectDispatcher,
        clock: Arc<dyn Clock>,
        seed: TimerState,
    ) -> Arc<Self> {
        let initial = match store.get(STATE_KEY) {
            Ok(Some(raw)) => TimerState::decode(&raw).unwrap_or(seed),
            Ok(None) => seed,
            Err(err) => {
                tracing::warn!(%err, "could not read persisted timer state");
                seed
            }
        };
        let (tx, _) = broadcast::channel(16);
        let authority = Arc::new(Self {
            state: Mutex::new(initial),
            store: store.clone(),
            effects,
            clock,
            broadcast: tx,
        });
        let weak = Arc::downgrade(&authority);
        store.subscribe(Arc::new(move |key, value| {
            if key != STATE_KEY {
                return;
            }
            let Some(authority) = weak.upgrade() else { return };
            if let Some(next) = TimerState::decode(value) {
                *authority.locked() = next;
            }
        }));
        authority
    }

    pub fn new(
        store: Arc<dyn StateStore>,
        effects: EffectDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Self::with_seed(store, effects, clock, TimerState::default())
    }

    /// Snapshot copy of the current state, never the live value.
    pub fn state(&self) -> TimerState {
        self.locked().clone()
    }

    /// Receive every broadcast state push from this authority.
    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.broadcast.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session. No-op if already running. Stamps both timestamps
    /// from the injected clock and fires the start side effect.
    pub fn start(&self, course_id: Option<String>) -> Result<TimerState> {
        let (snapshot, started) = {
            let mut st = self.locked();
            if st.running {
                (st.clone(), false)
            } else {
                let now = self.clock.now();
                st.running = true;
                st.phase = Phase::Studying;
                st.start_ts = Some(now);
                st.phase_start_ts = Some(now);
                st.elapsed = 0;
                st.phase_elapsed = 0;
                if course_id.is_some() {
                    st.course_id = course_id;
                }
                (st.clone(), true)
            }
        };
        if started {
            self.persist(&snapshot)?;
            self.push(&snapshot);
            self.effects.session_started(&snapshot);
        }
        Ok(snapshot)
    }

    /// Stop the session, returning the derived [`StudySession`] for the
    /// session log. Idempotent when idle (`None` session, state untouched).
    ///
    /// Manual stop deliberately plays no sound; only phase transitions do.
    pub fn stop(&self) -> Result<(TimerState, Option<StudySession>)> {
        let (snapshot, session) = {
            let mut st = self.locked();
            if !st.running {
                (st.clone(), None)
            } else {
                let now = self.clock.now();
                let elapsed = elapsed_secs(st.start_ts, now);
                let session = StudySession {
                    id: Uuid::new_v4(),
                    course_id: st.course_id.clone(),
                    started_at: st.start_ts.unwrap_or(now),
                    ended_at: now,
                    duration_min: duration_min_from_secs(elapsed),
                    technique: st.technique,
                    note: st.note.clone(),
                    mood_start: st.mood_start.clone(),
                    mood_end: st.mood_end.clone(),
                };
                st.clear_run_fields();
                (st.clone(), Some(session))
            }
        };
        if session.is_some() {
            self.persist(&snapshot)?;
            self.push(&snapshot);
        }
        Ok((snapshot, session))
    }

    /// Zero the elapsed fields and the long-break counter. When running,
    /// both timestamps are re-stamped so derivation stays consistent.
    /// Idempotent when already at defaults.
    pub fn reset(&self) -> Result<TimerState> {
        let (snapshot, changed) = {
            let mut st = self.locked();
            let before = st.clone();
            st.elapsed = 0;
            st.phase_elapsed = 0;
            st.study_phases_completed = 0;
            st.phase = Phase::Studying;
            if st.running {
                let now = self.clock.now();
                st.start_ts = Some(now);
                st.phase_start_ts = Some(now);
            }
            (st.clone(), *st != before)
        };
        if changed {
            self.persist(&snapshot)?;
            self.push(&snapshot);
        }
        Ok(snapshot)
    }

    /// Merge a partial settings update. Turning notifications on runs the
    /// permission probe; on denial the flag is forced back off and that
    /// decision is persisted, so the UI toggle reflects reality.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<TimerState> {
        let enabling = patch.notifications_enabled == Some(true);
        let snapshot = {
            let mut st = self.locked();
            st.apply(patch);
            if enabling && !self.effects.ensure_notification_permission() {
                tracing::info!("notification permission denied, disabling notifications");
                st.notifications_enabled = false;
            }
            st.clone()
        };
        self.persist(&snapshot)?;
        self.push(&snapshot);
        Ok(snapshot)
    }

    /// Recompute elapsed values from the wall clock and evaluate the
    /// phase-transition policy. Safe to call at any cadence: missed ticks
    /// cause no drift because nothing accumulates per call.
    pub fn tick(&self) -> Result<TimerState> {
        let (snapshot, transitioned) = {
            let mut st = self.locked();
            if !st.running {
                return Ok(st.clone());
            }
            let now = self.clock.now();
            st.elapsed = elapsed_secs(st.start_ts, now);
            st.phase_elapsed = elapsed_secs(st.phase_start_ts, now);

            let config = st.technique.config();
            let mut transitioned = false;
            if let Some(limit) = config.phase_duration_secs(st.phase) {
                if st.phase_elapsed >= limit {
                    st.phase = match st.phase {
                        Phase::Studying => {
                            st.study_phases_completed += 1;
                            if !config.has_break() {
                                // No break configured: straight back to studying.
                                Phase::Studying
                            } else if config.has_long_break()
                                && st.study_phases_completed % config.long_break_interval == 0
                            {
                                Phase::LongBreak
                            } else {
                                Phase::Break
                            }
                        }
                        Phase::Break | Phase::LongBreak => Phase::Studying,
                    };
                    st.phase_start_ts = Some(now);
                    st.phase_elapsed = 0;
                    transitioned = true;
                }
            }
            (st.clone(), transitioned)
        };
        self.persist(&snapshot)?;
        self.push(&snapshot);
        if transitioned {
            self.effects.phase_changed(&snapshot);
        }
        Ok(snapshot)
    }

    /// Drive `tick()` once per second on the tokio runtime, for long-lived
    /// surfaces. Best-effort: a throttled host just means fewer ticks.
    pub fn spawn_ticker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(authority) = weak.upgrade() else { break };
                if let Err(err) = authority.tick() {
                    tracing::warn!(%err, "tick failed to persist");
                }
            }
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn locked(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, snapshot: &TimerState) -> Result<()> {
        let raw = snapshot.encode()?;
        self.store.set(STATE_KEY, &raw)?;
        Ok(())
    }

    fn push(&self, snapshot: &TimerState) {
        // Nobody listening is fine.
        let _ = self.broadcast.send(Broadcast::State {
            state: snapshot.clone(),
        });
    }
}
