//! SQLite-based sync storage for privileged server-side use

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{SyncStore, WRITE_CHUNK};
use crate::error::StorageError;
use crate::models::{
    CalendarListEntry, EventRecord, EventUid, IntegrationPatch, IntegrationRecord, SyncStatus,
};

/// Database migrations
///
/// Applied in order; the user_version pragma tracks progress.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Provider integration state, one row per user
            CREATE TABLE integrations (
                user_id TEXT PRIMARY KEY,
                access_token TEXT,
                refresh_token TEXT,
                token_type TEXT,
                scope TEXT,
                expires_at INTEGER,
                sync_tokens TEXT NOT NULL DEFAULT '{}',
                last_synced_at TEXT,
                calendar_list TEXT NOT NULL DEFAULT '[]',
                last_sync_status TEXT NOT NULL DEFAULT 'idle',
                last_sync_error TEXT,
                updated_at TEXT NOT NULL
            );

            -- Imported events, keyed by the composite event uid
            CREATE TABLE events (
                user_id TEXT NOT NULL,
                event_uid TEXT NOT NULL,
                calendar_id TEXT NOT NULL,
                record TEXT NOT NULL,
                PRIMARY KEY (user_id, event_uid)
            );

            CREATE INDEX idx_events_user_calendar
                ON events(user_id, calendar_id);
            "#,
        ),
    ])
}

/// SQLite implementation of [`SyncStore`].
///
/// Queryable columns are explicit; the list/map-shaped fields and the
/// full event record travel as JSON text.
pub struct SqliteSyncStore {
    conn: Mutex<Connection>,
}

impl SqliteSyncStore {
    /// Open (or create) the database at `db_path` and run migrations.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut conn = Connection::open(db_path.as_ref())?;

        // WAL for concurrent readers during writes; NORMAL sync is safe
        // with WAL and avoids an fsync per transaction.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn write_record(
        conn: &Connection,
        user_id: &str,
        record: &IntegrationRecord,
    ) -> Result<(), StorageError> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO integrations (
                user_id, access_token, refresh_token, token_type, scope,
                expires_at, sync_tokens, last_synced_at, calendar_list,
                last_sync_status, last_sync_error, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                user_id,
                record.access_token,
                record.refresh_token,
                record.token_type,
                record.scope,
                record.expires_at,
                serde_json::to_string(&record.sync_tokens)?,
                record.last_synced_at.map(|t| t.to_rfc3339()),
                serde_json::to_string(&record.calendar_list)?,
                status_to_str(record.last_sync_status),
                record.last_sync_error,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn read_record(
        conn: &Connection,
        user_id: &str,
    ) -> Result<Option<IntegrationRecord>, StorageError> {
        let row = conn
            .query_row(
                r#"
                SELECT access_token, refresh_token, token_type, scope,
                       expires_at, sync_tokens, last_synced_at, calendar_list,
                       last_sync_status, last_sync_error, updated_at
                FROM integrations WHERE user_id = ?1
                "#,
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            access_token,
            refresh_token,
            token_type,
            scope,
            expires_at,
            sync_tokens,
            last_synced_at,
            calendar_list,
            last_sync_status,
            last_sync_error,
            updated_at,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(IntegrationRecord {
            access_token,
            refresh_token,
            token_type,
            scope,
            expires_at,
            sync_tokens: serde_json::from_str(&sync_tokens)?,
            last_synced_at: last_synced_at.as_deref().map(parse_instant).transpose()?,
            calendar_list: serde_json::from_str::<Vec<CalendarListEntry>>(&calendar_list)?,
            last_sync_status: status_from_str(&last_sync_status)?,
            last_sync_error,
            updated_at: parse_instant(&updated_at)?,
        }))
    }
}

impl SyncStore for SqliteSyncStore {
    fn load_integration(&self, user_id: &str) -> Result<Option<IntegrationRecord>, StorageError> {
        let conn = self.conn.lock().unwrap();
        Self::read_record(&conn, user_id)
    }

    fn ensure_integration(&self, user_id: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO integrations (user_id, updated_at) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn update_integration(
        &self,
        user_id: &str,
        patch: IntegrationPatch,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut record =
            Self::read_record(&tx, user_id)?.unwrap_or_else(IntegrationRecord::empty);
        patch.apply(&mut record);
        record.updated_at = Utc::now();
        Self::write_record(&tx, user_id, &record)?;

        tx.commit()?;
        Ok(())
    }

    fn upsert_events(&self, user_id: &str, events: &[EventRecord]) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().unwrap();
        for chunk in events.chunks(WRITE_CHUNK) {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO events (user_id, event_uid, calendar_id, record)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(user_id, event_uid) DO UPDATE SET
                        calendar_id = excluded.calendar_id,
                        record = excluded.record
                    "#,
                )?;
                for record in chunk {
                    stmt.execute(params![
                        user_id,
                        record.uid().as_str(),
                        record.calendar_id,
                        serde_json::to_string(record)?,
                    ])?;
                }
            }
            tx.commit()?;
        }
        Ok(())
    }

    fn remove_events(&self, user_id: &str, uids: &[EventUid]) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().unwrap();
        for chunk in uids.chunks(WRITE_CHUNK) {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare("DELETE FROM events WHERE user_id = ?1 AND event_uid = ?2")?;
                for uid in chunk {
                    stmt.execute(params![user_id, uid.as_str()])?;
                }
            }
            tx.commit()?;
        }
        Ok(())
    }

    fn list_event_uids_by_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<Vec<EventUid>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_uid FROM events
             WHERE user_id = ?1 AND calendar_id = ?2
             ORDER BY event_uid",
        )?;
        let uids = stmt
            .query_map(params![user_id, calendar_id], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(uids.into_iter().map(EventUid::new).collect())
    }
}

fn status_to_str(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Idle => "idle",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Error => "error",
    }
}

fn status_from_str(s: &str) -> Result<SyncStatus, StorageError> {
    match s {
        "idle" => Ok(SyncStatus::Idle),
        "syncing" => Ok(SyncStatus::Syncing),
        "error" => Ok(SyncStatus::Error),
        other => Err(StorageError::Corrupt(format!(
            "unknown sync status: {}",
            other
        ))),
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp {}: {}", s, e)))
}
