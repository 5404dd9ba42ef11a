//! SQLite-based store implementation

use chrono::{DateTime, Local};
use lectern_api::{Presentation, PresentationStatus};
use lectern_util::{PresentationId, ProjectId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, Store, StoreError, StoreResult};

const PRESENTATION_COLUMNS: &str =
    "id, project_id, project_name, description, group_id, start_time, end_time, status";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Scheduled presentations
            CREATE TABLE IF NOT EXISTS presentations (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                project_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                group_id TEXT NOT NULL DEFAULT '',
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                status TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Columns exactly as stored, before any parsing
struct PresentationRow {
    id: String,
    project_id: String,
    project_name: String,
    description: String,
    group_id: String,
    start_time: String,
    end_time: String,
    status: String,
}

impl PresentationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            project_name: row.get(2)?,
            description: row.get(3)?,
            group_id: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            status: row.get(7)?,
        })
    }

    fn into_presentation(self) -> StoreResult<Presentation> {
        let corrupt = |message: String| StoreError::CorruptRecord {
            id: self.id.clone(),
            message,
        };

        let id: PresentationId = self
            .id
            .parse()
            .map_err(|e: uuid::Error| corrupt(format!("bad id: {}", e)))?;
        let start_time =
            parse_timestamp(&self.start_time).map_err(|e| corrupt(format!("bad start_time: {}", e)))?;
        let end_time =
            parse_timestamp(&self.end_time).map_err(|e| corrupt(format!("bad end_time: {}", e)))?;
        let status: PresentationStatus = self.status.parse().map_err(corrupt)?;

        Ok(Presentation {
            id,
            project_id: ProjectId::new(self.project_id),
            project_name: self.project_name,
            description: self.description,
            group_id: self.group_id,
            start_time,
            end_time,
            status,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Local>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Local))
}

fn insert_row(conn: &Connection, p: &Presentation) -> StoreResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO presentations ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            PRESENTATION_COLUMNS
        ),
        params![
            p.id.to_string(),
            p.project_id.as_str(),
            p.project_name,
            p.description,
            p.group_id,
            p.start_time.to_rfc3339(),
            p.end_time.to_rfc3339(),
            p.status.as_str(),
        ],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn list_presentations(&self) -> StoreResult<Vec<Presentation>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM presentations",
            PRESENTATION_COLUMNS
        ))?;
        let rows = stmt.query_map([], PresentationRow::from_row)?;

        let mut presentations = Vec::new();
        for row in rows {
            presentations.push(row?.into_presentation()?);
        }

        presentations.sort_by_key(|p| p.start_time);
        Ok(presentations)
    }

    fn get_presentation(&self, id: &PresentationId) -> StoreResult<Option<Presentation>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM presentations WHERE id = ?",
                    PRESENTATION_COLUMNS
                ),
                [id.to_string()],
                PresentationRow::from_row,
            )
            .optional()?;

        row.map(PresentationRow::into_presentation).transpose()
    }

    fn insert_presentation(&self, presentation: &Presentation) -> StoreResult<()> {
        let conn = self.conn()?;
        insert_row(&conn, presentation)?;

        debug!(presentation_id = %presentation.id, "Presentation inserted");
        Ok(())
    }

    fn update_presentation(&self, p: &Presentation) -> StoreResult<bool> {
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE presentations
            SET project_id = ?, project_name = ?, description = ?, group_id = ?,
                start_time = ?, end_time = ?, status = ?
            WHERE id = ?
            "#,
            params![
                p.project_id.as_str(),
                p.project_name,
                p.description,
                p.group_id,
                p.start_time.to_rfc3339(),
                p.end_time.to_rfc3339(),
                p.status.as_str(),
                p.id.to_string(),
            ],
        )?;

        debug!(presentation_id = %p.id, updated, "Presentation update");
        Ok(updated > 0)
    }

    fn delete_presentation(&self, id: &PresentationId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM presentations WHERE id = ?", [id.to_string()])?;
        Ok(deleted > 0)
    }

    fn replace_presentations(&self, presentations: &[Presentation]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM presentations", [])?;
        for presentation in presentations {
            insert_row(&tx, presentation)?;
        }
        tx.commit()?;

        debug!(count = presentations.len(), "Presentations replaced");
        Ok(())
    }

    fn update_statuses(&self, statuses: &[(PresentationId, PresentationStatus)]) -> StoreResult<()> {
        if statuses.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE presentations SET status = ? WHERE id = ?")?;
            for (id, status) in statuses {
                stmt.execute(params![status.as_str(), id.to_string()])?;
            }
        }
        tx.commit()?;

        debug!(count = statuses.len(), "Statuses written");
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = parse_timestamp(&timestamp_str).unwrap_or_else(|_| lectern_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
