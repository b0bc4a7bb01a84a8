//! SQLite-backed session log.
//!
//! The append-only collaborator that receives a [`StudySession`] from every
//! `stop`. Also answers the simple daily/all-time statistics the stats
//! views want.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionLogError;
use crate::state::StudySession;
use crate::store::data_dir;
use crate::technique::TechniqueId;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_study_min: u64,
    pub today_sessions: u64,
    pub today_study_min: u64,
}

/// Append-only store of completed study sessions.
pub struct SessionLog {
    conn: Connection,
}

impl SessionLog {
    /// Open the log at `~/.config/studydesk/studydesk.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, SessionLogError> {
        let path = data_dir()
            .map_err(|err| SessionLogError::QueryFailed(err.to_string()))?
            .join("studydesk.db");
        let conn = Connection::open(&path).map_err(|source| SessionLogError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let log = Self { conn };
        log.migrate()?;
        Ok(log)
    }

    /// Open an in-memory log (for tests).
    pub fn open_memory() -> Result<Self, SessionLogError> {
        let conn = Connection::open_in_memory()?;
        let log = Self { conn };
        log.migrate()?;
        Ok(log)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS study_sessions (
                id           TEXT PRIMARY KEY,
                course_id    TEXT,
                started_at   TEXT NOT NULL,
                ended_at     TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                technique    TEXT NOT NULL,
                note         TEXT NOT NULL DEFAULT '',
                mood_start   TEXT,
                mood_end     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_study_sessions_ended_at ON study_sessions(ended_at);",
        )?;
        Ok(())
    }

    /// Append one session. Sessions are immutable once written.
    pub fn append(&self, session: &StudySession) -> Result<(), SessionLogError> {
        self.conn.execute(
            "INSERT INTO study_sessions
                 (id, course_id, started_at, ended_at, duration_min, technique, note, mood_start, mood_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id.to_string(),
                session.course_id,
                session.started_at.to_rfc3339(),
                session.ended_at.to_rfc3339(),
                session.duration_min,
                session.technique.as_str(),
                session.note,
                session.mood_start,
                session.mood_end,
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<StudySession>, SessionLogError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_id, started_at, ended_at, duration_min, technique, note, mood_start, mood_end
             FROM study_sessions ORDER BY ended_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let id: String = row.get(0)?;
            let started_at: String = row.get(2)?;
            let ended_at: String = row.get(3)?;
            let technique: String = row.get(5)?;
            let id = Uuid::parse_str(&id).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })?;
            Ok(StudySession {
                id,
                course_id: row.get(1)?,
                started_at: parse_ts(&started_at),
                ended_at: parse_ts(&ended_at),
                duration_min: row.get(4)?,
                technique: TechniqueId::parse(&technique).unwrap_or(TechniqueId::Pomodoro),
                note: row.get(6)?,
                mood_start: row.get(7)?,
                mood_end: row.get(8)?,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    pub fn stats_all(&self) -> Result<Stats, SessionLogError> {
        let (total_sessions, total_study_min) = self.totals_since(None)?;
        let today = format!("{}T00:00:00+00:00", Utc::now().format("%Y-%m-%d"));
        let (today_sessions, today_study_min) = self.totals_since(Some(&today))?;
        Ok(Stats {
            total_sessions,
            total_study_min,
            today_sessions,
            today_study_min,
        })
    }

    pub fn stats_today(&self) -> Result<Stats, SessionLogError> {
        let stats = self.stats_all()?;
        Ok(Stats {
            total_sessions: stats.today_sessions,
            total_study_min: stats.today_study_min,
            ..stats
        })
    }

    fn totals_since(&self, since: Option<&str>) -> Result<(u64, u64), SessionLogError> {
        let (sql, bound) = match since {
            Some(ts) => (
                "SELECT COUNT(*), COALESCE(SUM(duration_min), 0) FROM study_sessions WHERE ended_at >= ?1",
                Some(ts),
            ),
            None => (
                "SELECT COUNT(*), COALESCE(SUM(duration_min), 0) FROM study_sessions",
                None,
            ),
        };
        let result = match bound {
            Some(ts) => self.conn.query_row(sql, params![ts], |row| {
                Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?))
            })?,
            None => self
                .conn
                .query_row(sql, [], |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)))?,
        };
        Ok(result)
    }
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(course: &str, minutes: u64) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            course_id: Some(course.into()),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            duration_min: minutes,
            technique: TechniqueId::Pomodoro,
            note: String::new(),
            mood_start: Some("🙂".into()),
            mood_end: None,
        }
    }

    #[test]
    fn append_and_read_back() {
        let log = SessionLog::open_memory().unwrap();
        let first = session("math-101", 25);
        log.append(&first).unwrap();
        log.append(&session("phys-202", 50)).unwrap();

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        let found = recent.iter().find(|s| s.id == first.id).unwrap();
        assert_eq!(found.course_id.as_deref(), Some("math-101"));
        assert_eq!(found.duration_min, 25);
        assert_eq!(found.mood_start.as_deref(), Some("🙂"));
    }

    #[test]
    fn stats_accumulate() {
        let log = SessionLog::open_memory().unwrap();
        log.append(&session("a", 25)).unwrap();
        log.append(&session("b", 50)).unwrap();
        let stats = log.stats_all().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_study_min, 75);
        // Freshly written sessions are today's sessions.
        assert_eq!(stats.today_sessions, 2);
    }

    #[test]
    fn corrupt_session_id_is_an_error_not_a_nil_uuid() {
        let log = SessionLog::open_memory().unwrap();
        log.append(&session("math-101", 25)).unwrap();
        log.conn
            .execute(
                "INSERT INTO study_sessions
                     (id, started_at, ended_at, duration_min, technique)
                 VALUES ('not-a-uuid', ?1, ?1, 10, 'pomodoro')",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();

        let err = log.recent(10).unwrap_err();
        assert!(matches!(err, SessionLogError::QueryFailed(_)));
    }

    #[test]
    fn recent_honors_limit() {
        let log = SessionLog::open_memory().unwrap();
        for i in 0..5 {
            log.append(&session(&format!("c-{i}"), 10)).unwrap();
        }
        assert_eq!(log.recent(3).unwrap().len(), 3);
    }
}
