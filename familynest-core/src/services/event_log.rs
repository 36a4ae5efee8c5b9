//! Session event log backed by DuckDB
//!
//! Every lifecycle step the session manager takes (restore, login,
//! registration, logout, swallowed fetch failures) becomes one row in
//! `logs.duckdb` inside the app directory. Rows carry the event kind, the
//! backend and an error message at most; no user data is ever written.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;

const DB_FILE: &str = "logs.duckdb";

/// Which front-end produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    /// Library embedded in another application
    Embedded,
}

impl EntryPoint {
    fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Embedded => "embedded",
        }
    }
}

/// Kinds of event the log accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    SessionRestored,
    /// A persisted session was unreadable or incomplete and was cleared
    SessionRestoreDiscarded,
    LoginSucceeded,
    LoginFailed,
    RegistrationFailed,
    /// Accounts could not be fetched; the session continued with none
    AccountFetchFailed,
    LoggedOut,
    /// A CLI command exited with an error
    CommandFailed,
}

impl SessionEvent {
    pub const ALL: [SessionEvent; 8] = [
        SessionEvent::SessionRestored,
        SessionEvent::SessionRestoreDiscarded,
        SessionEvent::LoginSucceeded,
        SessionEvent::LoginFailed,
        SessionEvent::RegistrationFailed,
        SessionEvent::AccountFetchFailed,
        SessionEvent::LoggedOut,
        SessionEvent::CommandFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionEvent::SessionRestored => "session_restored",
            SessionEvent::SessionRestoreDiscarded => "session_restore_discarded",
            SessionEvent::LoginSucceeded => "login_succeeded",
            SessionEvent::LoginFailed => "login_failed",
            SessionEvent::RegistrationFailed => "registration_failed",
            SessionEvent::AccountFetchFailed => "account_fetch_failed",
            SessionEvent::LoggedOut => "logged_out",
            SessionEvent::CommandFailed => "command_failed",
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionEvent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|e| e.as_str()).collect();
                format!("unknown event '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// An event about to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub event: SessionEvent,
    /// Account service backend ("mock", "http")
    pub backend: Option<String>,
    /// CLI subcommand that was running
    pub command: Option<String>,
    pub error_message: Option<String>,
}

impl LogEvent {
    pub fn new(event: SessionEvent) -> Self {
        Self {
            event,
            backend: None,
            command: None,
            error_message: None,
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A row read back from the log
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEvent {
    pub id: i64,
    /// Unix milliseconds
    pub recorded_at: i64,
    /// Stored as text so rows written by newer versions still load
    pub event: String,
    pub backend: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
}

impl RecordedEvent {
    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Occurrences of one event kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventCount {
    pub event: String,
    pub total: u64,
    /// Rows of this kind that carry an error message
    pub failures: u64,
    /// Unix milliseconds of the newest row
    pub last_recorded_at: i64,
}

/// Which rows `EventLog::recent` returns, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub event: Option<SessionEvent>,
    pub failures_only: bool,
    pub limit: usize,
}

impl EventFilter {
    pub fn latest(limit: usize) -> Self {
        Self {
            event: None,
            failures_only: false,
            limit,
        }
    }

    pub fn only(mut self, event: SessionEvent) -> Self {
        self.event = Some(event);
        self
    }

    pub fn failures(mut self) -> Self {
        self.failures_only = true;
        self
    }
}

/// Append-only store of session events
pub struct EventLog {
    conn: Mutex<Connection>,
    path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl EventLog {
    /// Open `logs.duckdb` in `app_dir`, creating and migrating it as needed
    pub fn open(app_dir: &Path, entry_point: EntryPoint, app_version: impl Into<String>) -> Result<Self> {
        let path = app_dir.join(DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open event log at {:?}", path))?;
        migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Event log connection poisoned"))
    }

    pub fn record(&self, event: LogEvent) -> Result<()> {
        let recorded_at = chrono::Utc::now().timestamp_millis();
        self.conn()?.execute(
            "INSERT INTO session_events (
                recorded_at, event, backend, command, error_message,
                entry_point, app_version, platform
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                recorded_at,
                event.event.as_str(),
                event.backend,
                event.command,
                event.error_message,
                self.entry_point.as_str(),
                self.app_version,
                std::env::consts::OS,
            ],
        )?;
        Ok(())
    }

    pub fn recent(&self, filter: &EventFilter) -> Result<Vec<RecordedEvent>> {
        let mut clauses = Vec::new();
        let mut args: Vec<&str> = Vec::new();
        if let Some(event) = filter.event {
            clauses.push("event = ?");
            args.push(event.as_str());
        }
        if filter.failures_only {
            clauses.push("error_message IS NOT NULL");
        }

        let mut sql = String::from(
            "SELECT id, recorded_at, event, backend, command, error_message,
                    entry_point, app_version, platform
             FROM session_events",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY recorded_at DESC, id DESC LIMIT {}", filter.limit));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(duckdb::params_from_iter(args), |row| {
            Ok(RecordedEvent {
                id: row.get(0)?,
                recorded_at: row.get(1)?,
                event: row.get(2)?,
                backend: row.get(3)?,
                command: row.get(4)?,
                error_message: row.get(5)?,
                entry_point: row.get(6)?,
                app_version: row.get(7)?,
                platform: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Per-event totals, most frequent first
    pub fn counts(&self) -> Result<Vec<EventCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*), COUNT(error_message), MAX(recorded_at)
             FROM session_events
             GROUP BY event
             ORDER BY COUNT(*) DESC, event",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EventCount {
                event: row.get(0)?,
                total: row.get::<_, i64>(1)? as u64,
                failures: row.get::<_, i64>(2)? as u64,
                last_recorded_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Delete rows recorded before `cutoff_ms` (unix ms)
    pub fn prune_before(&self, cutoff_ms: i64) -> Result<u64> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM session_events WHERE recorded_at < ?", [cutoff_ms])?;
        Ok(deleted as u64)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sys_migrations (
            migration_name VARCHAR PRIMARY KEY,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    )?;

    for (name, sql) in LOG_MIGRATIONS {
        let applied: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_migrations WHERE migration_name = ?",
            [name],
            |row| row.get(0),
        )?;
        if applied > 0 {
            continue;
        }
        tracing::debug!(migration = name, "Applying event log migration");
        conn.execute_batch(sql)
            .with_context(|| format!("Event log migration {} failed", name))?;
        conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
    }
    Ok(())
}
