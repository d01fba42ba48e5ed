//! SQLite database layer for consultations and vitals

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::records::{
    ConsultationRecord, InteractionRecord, RecordStore, SaveOutcome, VitalKind, VitalStatus,
    VitalsRecord,
};

/// SQLite database wrapper (thread-safe via Arc<Mutex>)
#[derive(Clone)]
pub struct ConsultationDb {
    conn: Arc<Mutex<Connection>>,
}

impl ConsultationDb {
    /// Open (or create) the database at `path` and apply the schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        info!("Initializing consultation database at {:?}", path.as_ref());
        Self::init(conn)
    }

    /// Database that lives only as long as this handle
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS consultations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                input TEXT NOT NULL,
                response TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_consultations_user
                ON consultations(user_id, created_at);
            CREATE TABLE IF NOT EXISTS vitals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                unit TEXT NOT NULL,
                status TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vitals_user
                ON vitals(user_id, recorded_at);",
        )
        .context("Failed to create schema")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
        conn.lock().unwrap_or_else(|poisoned| {
            warn!("Database mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Insert a consultation row, returning its id
    pub async fn insert_consultation(
        &self,
        user_id: &str,
        record: &InteractionRecord,
    ) -> Result<String> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();
        let input = record.input.clone();
        let timestamp = record.timestamp.clone();
        let response_json = serde_json::to_string(&record.response)?;

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let conn = Self::lock(&conn);

            conn.execute(
                "INSERT INTO consultations (id, user_id, input, response, timestamp, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, &user_id, &input, &response_json, &timestamp, Self::now()],
            )?;

            debug!("Inserted consultation {} for user {}", id, user_id);
            Ok(id)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Most recent consultations for a user, newest first
    pub async fn list_consultations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConsultationRecord>> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = Self::lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, user_id, input, response, timestamp, created_at
                 FROM consultations
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let records = stmt
                .query_map(params![&user_id, limit as i64], Self::row_to_consultation)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(records)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    fn row_to_consultation(row: &rusqlite::Row) -> rusqlite::Result<ConsultationRecord> {
        let response_str: String = row.get(3)?;
        let response = serde_json::from_str(&response_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ConsultationRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            input: row.get(2)?,
            response,
            timestamp: row.get(4)?,
            created_at: row
                .get::<_, String>(5)?
                .parse()
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Append a vitals reading for a user
    pub async fn record_vital(
        &self,
        user_id: &str,
        kind: VitalKind,
        value: &str,
        unit: &str,
        status: VitalStatus,
    ) -> Result<VitalsRecord> {
        let conn = Arc::clone(&self.conn);
        let record = VitalsRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            kind,
            value: value.to_owned(),
            unit: unit.to_owned(),
            status,
            recorded_at: Utc::now(),
        };

        tokio::task::spawn_blocking(move || {
            let conn = Self::lock(&conn);
            conn.execute(
                "INSERT INTO vitals (id, user_id, kind, value, unit, status, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &record.id,
                    &record.user_id,
                    record.kind.as_str(),
                    &record.value,
                    &record.unit,
                    record.status.as_str(),
                    record
                        .recorded_at
                        .to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )?;

            debug!("Recorded {} vital for user {}", record.kind, record.user_id);
            Ok(record)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// All vitals readings for a user, oldest first
    pub async fn list_vitals(&self, user_id: &str) -> Result<Vec<VitalsRecord>> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = Self::lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, value, unit, status, recorded_at
                 FROM vitals
                 WHERE user_id = ?1
                 ORDER BY recorded_at ASC, rowid ASC",
            )?;

            let vitals = stmt
                .query_map(params![&user_id], Self::row_to_vital)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(vitals)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    fn row_to_vital(row: &rusqlite::Row) -> rusqlite::Result<VitalsRecord> {
        let kind: String = row.get(2)?;
        let status: String = row.get(5)?;
        let conversion = |idx: usize, e: anyhow::Error| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                e.into(),
            )
        };

        Ok(VitalsRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: kind.parse().map_err(|e| conversion(2, e))?,
            value: row.get(3)?,
            unit: row.get(4)?,
            status: status.parse().map_err(|e| conversion(5, e))?,
            recorded_at: row
                .get::<_, String>(6)?
                .parse()
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl RecordStore for ConsultationDb {
    async fn save(&self, user_id: &str, record: &InteractionRecord) -> Result<SaveOutcome> {
        let id = self.insert_consultation(user_id, record).await?;
        Ok(SaveOutcome { success: true, id })
    }
}
