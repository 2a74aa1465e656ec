//! SQLite-backed durable operation queue.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    op::{PAYLOAD_FORMAT_VERSION, PayloadEnvelope, QueuedOperation},
    payload::Payload,
    types::{OpId, OpKind, OpSeq, OpStatus},
};

use super::{PersistResult, QueueBackend};

const SELECT_COLUMNS: &str =
    "SELECT id, seq, kind, payload, created_at_ms, status, last_error, attempts FROM queued_ops";

/// SQLite implementation of [`crate::persist::QueueBackend`].
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens or creates a SQLite-backed queue at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite queue.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    fn query(&self, sql: &str, kind: Option<OpKind>) -> PersistResult<Vec<QueuedOperation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match kind {
            Some(kind) => stmt.query_map(params![kind.as_str()], decode_row)?,
            None => stmt.query_map([], decode_row)?,
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl QueueBackend for SqliteBackend {
    fn insert(&mut self, op: &QueuedOperation) -> PersistResult<()> {
        let payload = serde_json::to_vec(&PayloadEnvelope::new(op.payload.clone()))?;
        self.conn.execute(
            "INSERT INTO queued_ops(id, seq, kind, payload, created_at_ms, status, last_error, attempts) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                op.id.to_string(),
                op.seq as i64,
                op.kind.as_str(),
                payload,
                op.created_at_ms as i64,
                op.status.as_str(),
                op.last_error,
                op.attempts,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: OpId) -> PersistResult<Option<QueuedOperation>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let op = self
            .conn
            .query_row(&sql, params![id.to_string()], decode_row)
            .optional()?;
        Ok(op)
    }

    fn list_kind(&self, kind: OpKind) -> PersistResult<Vec<QueuedOperation>> {
        self.query(&format!("{SELECT_COLUMNS} WHERE kind = ?1 ORDER BY rowid ASC"), Some(kind))
    }

    fn list_all(&self) -> PersistResult<Vec<QueuedOperation>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY rowid ASC"), None)
    }

    fn update_status(
        &mut self,
        id: OpId,
        status: OpStatus,
        last_error: Option<&str>,
        attempts: u32,
    ) -> PersistResult<bool> {
        let changed = self.conn.execute(
            "UPDATE queued_ops SET status = ?2, last_error = ?3, attempts = ?4 WHERE id = ?1",
            params![id.to_string(), status.as_str(), last_error, attempts],
        )?;
        Ok(changed > 0)
    }

    fn delete_with_status(&mut self, status: OpStatus) -> PersistResult<usize> {
        let count = self
            .conn
            .execute("DELETE FROM queued_ops WHERE status = ?1", params![status.as_str()])?;
        Ok(count)
    }

    fn count_live(&self) -> PersistResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM queued_ops WHERE status IN (?1, ?2)",
            params![OpStatus::Pending.as_str(), OpStatus::Failed.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn max_seq(&self) -> PersistResult<OpSeq> {
        let seq: Option<i64> = self
            .conn
            .query_row("SELECT MAX(seq) FROM queued_ops", [], |row| row.get(0))?;
        Ok(seq.unwrap_or(0) as OpSeq)
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

fn decode_row(row: &Row<'_>) -> rusqlite::Result<QueuedOperation> {
    let id: String = row.get(0)?;
    let seq: i64 = row.get(1)?;
    let kind: String = row.get(2)?;
    let payload: Vec<u8> = row.get(3)?;
    let created_at_ms: i64 = row.get(4)?;
    let status: String = row.get(5)?;
    let last_error: Option<String> = row.get(6)?;
    let attempts: u32 = row.get(7)?;

    let id = OpId::parse_str(&id).map_err(|err| conversion_error(0, err.to_string()))?;
    let kind = OpKind::parse(&kind).ok_or_else(|| conversion_error(2, format!("unknown kind {kind}")))?;
    let status =
        OpStatus::parse(&status).ok_or_else(|| conversion_error(5, format!("unknown status {status}")))?;
    let payload = decode_payload(&payload).map_err(|err| conversion_error(3, err))?;
    if payload.kind() != kind {
        return Err(conversion_error(3, format!("payload does not match kind {kind}")));
    }

    Ok(QueuedOperation {
        id,
        seq: seq as OpSeq,
        kind,
        payload,
        created_at_ms: created_at_ms as u64,
        status,
        last_error,
        attempts,
    })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::other(message)),
    )
}

fn decode_payload(blob: &[u8]) -> Result<Payload, String> {
    let envelope = serde_json::from_slice::<PayloadEnvelope>(blob)
        .map_err(|e| format!("payload decode failed: {e}"))?;
    if envelope.format_version != PAYLOAD_FORMAT_VERSION {
        return Err(format!(
            "unsupported payload format version: {}",
            envelope.format_version
        ));
    }
    Ok(envelope.payload)
}
