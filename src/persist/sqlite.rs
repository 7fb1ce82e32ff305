//! SQLite-backed authoritative operation store.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    operation::{GroupOperation, Operation, ProducerContext},
    types::{GroupOperationId, OpKind, OperationId, PrivacyLevel, ProducerType, SecurityLevel, SyncStatus},
};

use super::{GroupHistoryPage, HistoryFilter, OperationStore, StoreError, StoreResult, UndoRedoOutcome};

const OP_COLUMNS: &str = "id, user_id, session_id, device_id, canvas_id, folder_id, \
     operation_type, target_table, target_id, target_title, previous_state, next_state, \
     changes_diff, affected_fields, batch_id, batch_sequence, is_undone, undone_at_ms, \
     sync_status, producer_type, producer_id, producer_context, permission_used, \
     security_level, created_at_ms";

const GROUP_COLUMNS: &str = "id, group_id, operation_id, user_id, summary, icon, privacy, \
     is_visible, reaction_count, comment_count, created_at_ms";

/// SQLite implementation of [`OperationStore`].
///
/// Keeps the at-most-one-persisted-copy of each target entity in an
/// `entities` table: `persist` applies the operation's next state, the undo
/// and redo procedures apply the inverse and forward states inside the same
/// transaction that flips the undone flag.
pub struct SqliteOperationStore {
    conn: Connection,
}

impl SqliteOperationStore {
    /// Opens or creates a store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Point lookup of one operation row.
    pub fn operation(&self, id: OperationId) -> StoreResult<Option<Operation>> {
        let sql = format!("SELECT {OP_COLUMNS} FROM operations WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.to_string()], decode_operation)
            .optional()?)
    }

    /// Current persisted state of a target entity, `None` once removed.
    pub fn entity_state(&self, target_table: &str, target_id: &str) -> StoreResult<Option<Value>> {
        let raw: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT state FROM entities WHERE target_table = ?1 AND target_id = ?2",
                params![target_table, target_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw.flatten() {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn apply_entity_state(
        tx: &rusqlite::Transaction<'_>,
        target_table: &str,
        target_id: &str,
        state: Option<&Value>,
        ts_ms: u64,
    ) -> StoreResult<()> {
        let text = state.map(serde_json::to_string).transpose()?;
        tx.execute(
            "INSERT INTO entities(target_table, target_id, state, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(target_table, target_id) \
             DO UPDATE SET state = excluded.state, updated_at_ms = excluded.updated_at_ms",
            params![target_table, target_id, text, ts_ms as i64],
        )?;
        Ok(())
    }

    fn apply_flip(
        &mut self,
        operation_id: OperationId,
        user_id: &str,
        to_undone: bool,
    ) -> StoreResult<UndoRedoOutcome> {
        let tx = self.conn.transaction()?;

        let row: Option<(String, String, Option<String>, Option<String>, String, bool)> = tx
            .query_row(
                "SELECT target_table, target_id, previous_state, next_state, operation_type, \
                 is_undone FROM operations WHERE id = ?1 AND user_id = ?2",
                params![operation_id.to_string(), user_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((target_table, target_id, previous_state, next_state, kind_raw, is_undone)) = row
        else {
            return Err(StoreError::MissingOperation(operation_id));
        };

        if to_undone && is_undone {
            return Err(StoreError::AlreadyUndone(operation_id));
        }
        if !to_undone && !is_undone {
            return Err(StoreError::NotUndone(operation_id));
        }

        let kind = OpKind::parse(&kind_raw)
            .ok_or_else(|| StoreError::Message(format!("unknown operation_type: {kind_raw}")))?;

        let restore_raw = if to_undone { previous_state } else { next_state };
        let restore_state: Option<Value> = restore_raw
            .map(|text| serde_json::from_str(&text))
            .transpose()?;

        let now = now_ms();
        let undone_at: Option<i64> = to_undone.then_some(now as i64);
        tx.execute(
            "UPDATE operations SET is_undone = ?2, undone_at_ms = ?3 WHERE id = ?1",
            params![operation_id.to_string(), to_undone, undone_at],
        )?;

        Self::apply_entity_state(&tx, &target_table, &target_id, restore_state.as_ref(), now)?;
        tx.commit()?;

        Ok(UndoRedoOutcome {
            target_table,
            target_id,
            restore_state,
            kind,
        })
    }
}

impl OperationStore for SqliteOperationStore {
    fn persist(&mut self, op: &Operation) -> StoreResult<Operation> {
        let mut stored = op.clone();
        stored.created_at_ms = now_ms();
        stored.sync_status = SyncStatus::Synced;

        let changes_diff = if stored.changes_diff.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&stored.changes_diff)?)
        };
        let previous_state = stored
            .previous_state
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let next_state = stored
            .next_state
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let affected_fields = serde_json::to_string(&stored.affected_fields)?;
        let producer_context = stored
            .producer_context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO operations(id, user_id, session_id, device_id, canvas_id, folder_id, \
             operation_type, target_table, target_id, target_title, previous_state, next_state, \
             changes_diff, affected_fields, batch_id, batch_sequence, is_undone, undone_at_ms, \
             sync_status, producer_type, producer_id, producer_context, permission_used, \
             security_level, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
            params![
                stored.id.to_string(),
                stored.user_id,
                stored.session_id.to_string(),
                stored.device_id.map(|v| v.to_string()),
                stored.canvas_id,
                stored.folder_id,
                stored.kind.as_str(),
                stored.target_table,
                stored.target_id,
                stored.target_title,
                previous_state,
                next_state,
                changes_diff,
                affected_fields,
                stored.batch_id.map(|v| v.to_string()),
                stored.batch_sequence,
                stored.is_undone,
                stored.undone_at_ms.map(|v| v as i64),
                stored.sync_status.as_str(),
                stored.producer_type.as_str(),
                stored.producer_id,
                producer_context,
                stored.permission_used,
                stored.security_level.as_str(),
                stored.created_at_ms as i64,
            ],
        )?;
        Self::apply_entity_state(
            &tx,
            &stored.target_table,
            &stored.target_id,
            stored.next_state.as_ref(),
            stored.created_at_ms,
        )?;
        tx.commit()?;

        Ok(stored)
    }

    fn persist_group(&mut self, group_op: &GroupOperation) -> StoreResult<GroupOperation> {
        let mut stored = group_op.clone();
        stored.created_at_ms = now_ms();

        self.conn.execute(
            "INSERT INTO group_operations(id, group_id, operation_id, user_id, summary, icon, \
             privacy, is_visible, reaction_count, comment_count, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                stored.id.to_string(),
                stored.group_id,
                stored.operation_id.to_string(),
                stored.user_id,
                stored.summary,
                stored.icon,
                stored.privacy.as_str(),
                stored.is_visible,
                stored.reaction_count,
                stored.comment_count,
                stored.created_at_ms as i64,
            ],
        )?;
        Ok(stored)
    }

    fn undo(&mut self, operation_id: OperationId, user_id: &str) -> StoreResult<UndoRedoOutcome> {
        self.apply_flip(operation_id, user_id, true)
    }

    fn redo(&mut self, operation_id: OperationId, user_id: &str) -> StoreResult<UndoRedoOutcome> {
        self.apply_flip(operation_id, user_id, false)
    }

    fn load_history(
        &mut self,
        user_id: &str,
        filter: &HistoryFilter,
    ) -> StoreResult<Vec<Operation>> {
        let mut sql = format!("SELECT {OP_COLUMNS} FROM operations WHERE user_id = ?1");
        let mut binds: Vec<rusqlite::types::Value> = vec![user_id.to_string().into()];

        if let Some(session_id) = filter.session_id {
            binds.push(session_id.to_string().into());
            sql.push_str(&format!(" AND session_id = ?{}", binds.len()));
        }
        if let Some(canvas_id) = &filter.canvas_id {
            binds.push(canvas_id.clone().into());
            sql.push_str(&format!(" AND canvas_id = ?{}", binds.len()));
        }
        if !filter.include_undone {
            sql.push_str(" AND is_undone = 0");
        }
        binds.push((filter.limit as i64).into());
        sql.push_str(&format!(
            " ORDER BY created_at_ms DESC, rowid DESC LIMIT ?{}",
            binds.len()
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(binds), decode_operation)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn load_group_history(
        &mut self,
        group_id: &str,
        page: &GroupHistoryPage,
    ) -> StoreResult<Vec<GroupOperation>> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM group_operations \
             WHERE group_id = ?1 AND is_visible = 1 \
             ORDER BY created_at_ms DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![group_id, page.limit as i64, page.offset as i64],
            decode_group_operation,
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn add_group_reaction(&mut self, group_op_id: GroupOperationId) -> StoreResult<u32> {
        self.bump_group_counter(group_op_id, "reaction_count")
    }

    fn add_group_comment(&mut self, group_op_id: GroupOperationId) -> StoreResult<u32> {
        self.bump_group_counter(group_op_id, "comment_count")
    }
}

impl SqliteOperationStore {
    fn bump_group_counter(&mut self, group_op_id: GroupOperationId, column: &str) -> StoreResult<u32> {
        let updated = self.conn.execute(
            &format!("UPDATE group_operations SET {column} = {column} + 1 WHERE id = ?1"),
            params![group_op_id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::Message(format!(
                "missing group operation {group_op_id}"
            )));
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT {column} FROM group_operations WHERE id = ?1"),
            params![group_op_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }
}

fn decode_operation(row: &Row<'_>) -> rusqlite::Result<Operation> {
    let id: String = row.get(0)?;
    let session_id: String = row.get(2)?;
    let device_id: Option<String> = row.get(3)?;
    let kind_raw: String = row.get(6)?;
    let previous_state: Option<String> = row.get(10)?;
    let next_state: Option<String> = row.get(11)?;
    let changes_diff: Option<String> = row.get(12)?;
    let affected_fields: String = row.get(13)?;
    let batch_id: Option<String> = row.get(14)?;
    let undone_at_ms: Option<i64> = row.get(17)?;
    let sync_raw: String = row.get(18)?;
    let producer_raw: String = row.get(19)?;
    let producer_context: Option<String> = row.get(21)?;
    let level_raw: String = row.get(23)?;
    let created_at_ms: i64 = row.get(24)?;

    Ok(Operation {
        id: parse_uuid(&id)?,
        user_id: row.get(1)?,
        session_id: parse_uuid(&session_id)?,
        device_id: device_id.as_deref().map(parse_uuid).transpose()?,
        canvas_id: row.get(4)?,
        folder_id: row.get(5)?,
        kind: OpKind::parse(&kind_raw).ok_or_else(|| decode_err("operation_type"))?,
        target_table: row.get(7)?,
        target_id: row.get(8)?,
        target_title: row.get(9)?,
        previous_state: parse_json(previous_state.as_deref())?,
        next_state: parse_json(next_state.as_deref())?,
        changes_diff: match changes_diff.as_deref() {
            Some(text) => serde_json::from_str(text).map_err(|_| decode_err("changes_diff"))?,
            None => serde_json::Map::new(),
        },
        affected_fields: serde_json::from_str(&affected_fields)
            .map_err(|_| decode_err("affected_fields"))?,
        batch_id: batch_id.as_deref().map(parse_uuid).transpose()?,
        batch_sequence: row.get(15)?,
        is_undone: row.get(16)?,
        undone_at_ms: undone_at_ms.map(|v| v as u64),
        sync_status: SyncStatus::parse(&sync_raw).ok_or_else(|| decode_err("sync_status"))?,
        producer_type: ProducerType::parse(&producer_raw)
            .ok_or_else(|| decode_err("producer_type"))?,
        producer_id: row.get(20)?,
        producer_context: producer_context
            .as_deref()
            .map(|text| serde_json::from_str::<ProducerContext>(text))
            .transpose()
            .map_err(|_| decode_err("producer_context"))?,
        permission_used: row.get(22)?,
        security_level: SecurityLevel::parse(&level_raw)
            .ok_or_else(|| decode_err("security_level"))?,
        created_at_ms: created_at_ms as u64,
    })
}

fn decode_group_operation(row: &Row<'_>) -> rusqlite::Result<GroupOperation> {
    let id: String = row.get(0)?;
    let operation_id: String = row.get(2)?;
    let privacy_raw: String = row.get(6)?;
    let reaction_count: i64 = row.get(8)?;
    let comment_count: i64 = row.get(9)?;
    let created_at_ms: i64 = row.get(10)?;

    Ok(GroupOperation {
        id: parse_uuid(&id)?,
        group_id: row.get(1)?,
        operation_id: parse_uuid(&operation_id)?,
        user_id: row.get(3)?,
        summary: row.get(4)?,
        icon: row.get(5)?,
        privacy: PrivacyLevel::parse(&privacy_raw).ok_or_else(|| decode_err("privacy"))?,
        is_visible: row.get(7)?,
        reaction_count: reaction_count as u32,
        comment_count: comment_count as u32,
        created_at_ms: created_at_ms as u64,
    })
}

fn parse_uuid(text: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(text).map_err(|_| decode_err("uuid"))
}

fn parse_json(text: Option<&str>) -> rusqlite::Result<Option<Value>> {
    text.map(|t| serde_json::from_str(t).map_err(|_| decode_err("json state")))
        .transpose()
}

fn decode_err(what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::other(format!("malformed column: {what}"))),
    )
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
