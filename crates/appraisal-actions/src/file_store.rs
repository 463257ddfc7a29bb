//! File-backed execution store using redb.
//!
//! Executions live in `executions.redb` inside the store directory. Every
//! operation opens the database, runs one transaction and closes it again.
//! redb holds an exclusive file lock while a database is open, so operations
//! from different processes (each CLI command is one) run one at a time:
//! the pending check and the insert, or the status check and the update,
//! commit together in a single write transaction.
//!
//! # Table design
//!
//! ```text
//! executions      id                           -> JSON ActionExecution
//! pending         participant_id \x1f rule_id  -> id
//! by_participant  (participant_id, seq)        -> id
//! meta            "next_seq"                   -> u64
//! ```
//!
//! `seq` is a store-wide insertion counter, so a range scan over
//! `by_participant` yields a participant's executions in creation order.
//! Records are updated in place and never removed.

use appraisal_core::{ActionExecution, ExecutionStatus};
use async_trait::async_trait;
use redb::{
    Database, DatabaseError, ReadOnlyTable, ReadTransaction, ReadableTable, TableDefinition,
    TableError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::StoreError;
use crate::store::ExecutionStore;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const EXECUTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("executions");
const PENDING: TableDefinition<&str, &str> = TableDefinition::new("pending");
const BY_PARTICIPANT: TableDefinition<(&str, u64), &str> = TableDefinition::new("by_participant");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_SEQ: &str = "next_seq";
const DATABASE_FILE: &str = "executions.redb";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(10);

fn db_error<E: Into<redb::Error>>(e: E) -> StoreError {
    StoreError::Database(e.into())
}

fn pending_key(participant_id: &str, rule_id: &str) -> String {
    format!("{participant_id}\u{1f}{rule_id}")
}

fn decode(bytes: &[u8]) -> Result<ActionExecution, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Open a table for reading. A table that was never written reads as empty.
fn read_table<K: redb::Key + 'static, V: redb::Value + 'static>(
    txn: &ReadTransaction,
    definition: TableDefinition<K, V>,
) -> Result<Option<ReadOnlyTable<K, V>>, StoreError> {
    match txn.open_table(definition) {
        Ok(table) => Ok(Some(table)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(db_error(e)),
    }
}

fn lookup(
    executions: &ReadOnlyTable<&str, &[u8]>,
    id: &str,
) -> Result<Option<ActionExecution>, StoreError> {
    match executions.get(id).map_err(db_error)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// FileExecutionStore
// ---------------------------------------------------------------------------

/// Execution store shared by every process that opens the same directory.
#[derive(Debug, Clone)]
pub struct FileExecutionStore {
    directory: PathBuf,
    lock_timeout: Duration,
}

impl FileExecutionStore {
    /// Use (or create) the store in `directory`.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        }

        tracing::debug!("Using execution store at {}", directory.display());
        Ok(Self {
            directory,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Set how long an operation waits while another handle holds the database.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.directory.join(DATABASE_FILE)
    }

    /// Open the database, waiting for other holders up to the lock timeout.
    async fn open(&self) -> Result<Database, StoreError> {
        let path = self.database_path();
        let deadline = Instant::now() + self.lock_timeout;

        loop {
            match Database::create(&path) {
                Ok(db) => return Ok(db),
                Err(DatabaseError::DatabaseAlreadyOpen) => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::Busy(path.display().to_string()));
                    }
                    tokio::time::sleep(OPEN_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(db_error(e)),
            }
        }
    }
}

#[async_trait]
impl ExecutionStore for FileExecutionStore {
    async fn insert_pending(
        &self,
        execution: ActionExecution,
    ) -> Result<ActionExecution, StoreError> {
        let value = serde_json::to_vec(&execution)?;
        let key = pending_key(&execution.participant_id, &execution.rule_id);

        let db = self.open().await?;
        let txn = db.begin_write().map_err(db_error)?;
        {
            let mut pending = txn.open_table(PENDING).map_err(db_error)?;
            let existing = pending
                .get(key.as_str())
                .map_err(db_error)?
                .map(|guard| guard.value().to_string());
            if let Some(existing_id) = existing {
                return Err(StoreError::PendingConflict {
                    participant_id: execution.participant_id.clone(),
                    rule_id: execution.rule_id.clone(),
                    existing_id,
                });
            }

            let mut meta = txn.open_table(META).map_err(db_error)?;
            let seq = meta
                .get(NEXT_SEQ)
                .map_err(db_error)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            meta.insert(NEXT_SEQ, seq + 1).map_err(db_error)?;

            let mut executions = txn.open_table(EXECUTIONS).map_err(db_error)?;
            executions
                .insert(execution.id.as_str(), value.as_slice())
                .map_err(db_error)?;

            let mut by_participant = txn.open_table(BY_PARTICIPANT).map_err(db_error)?;
            by_participant
                .insert(
                    (execution.participant_id.as_str(), seq),
                    execution.id.as_str(),
                )
                .map_err(db_error)?;

            pending
                .insert(key.as_str(), execution.id.as_str())
                .map_err(db_error)?;
        }
        txn.commit().map_err(db_error)?;

        tracing::debug!("Stored pending execution: {}", execution.id);
        Ok(execution)
    }

    async fn find_pending(
        &self,
        participant_id: &str,
        rule_id: &str,
    ) -> Result<Option<ActionExecution>, StoreError> {
        let db = self.open().await?;
        let txn = db.begin_read().map_err(db_error)?;

        let Some(pending) = read_table(&txn, PENDING)? else {
            return Ok(None);
        };
        let id = pending
            .get(pending_key(participant_id, rule_id).as_str())
            .map_err(db_error)?
            .map(|guard| guard.value().to_string());

        match (id, read_table(&txn, EXECUTIONS)?) {
            (Some(id), Some(executions)) => lookup(&executions, &id),
            _ => Ok(None),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<ActionExecution>, StoreError> {
        let db = self.open().await?;
        let txn = db.begin_read().map_err(db_error)?;

        match read_table(&txn, EXECUTIONS)? {
            Some(executions) => lookup(&executions, id),
            None => Ok(None),
        }
    }

    async fn compare_and_set(
        &self,
        id: &str,
        expected: ExecutionStatus,
        updated: ActionExecution,
    ) -> Result<ActionExecution, StoreError> {
        if updated.id != id {
            return Err(StoreError::IdMismatch {
                expected: id.to_string(),
                actual: updated.id.clone(),
            });
        }
        let value = serde_json::to_vec(&updated)?;
        let key = pending_key(&updated.participant_id, &updated.rule_id);

        let db = self.open().await?;
        let txn = db.begin_write().map_err(db_error)?;
        {
            let mut executions = txn.open_table(EXECUTIONS).map_err(db_error)?;
            let current = match executions.get(id).map_err(db_error)? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StoreError::NotFound(id.to_string())),
            };
            if current.status != expected {
                return Err(StoreError::StatusMismatch {
                    id: id.to_string(),
                    expected,
                    actual: current.status,
                });
            }
            executions.insert(id, value.as_slice()).map_err(db_error)?;

            let mut pending = txn.open_table(PENDING).map_err(db_error)?;
            if updated.is_pending() {
                pending.insert(key.as_str(), id).map_err(db_error)?;
            } else {
                let held = pending
                    .get(key.as_str())
                    .map_err(db_error)?
                    .is_some_and(|guard| guard.value() == id);
                if held {
                    pending.remove(key.as_str()).map_err(db_error)?;
                }
            }
        }
        txn.commit().map_err(db_error)?;

        tracing::debug!("Stored execution {} as {}", id, updated.status);
        Ok(updated)
    }

    async fn list_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ActionExecution>, StoreError> {
        let db = self.open().await?;
        let txn = db.begin_read().map_err(db_error)?;

        let (Some(by_participant), Some(executions)) = (
            read_table(&txn, BY_PARTICIPANT)?,
            read_table(&txn, EXECUTIONS)?,
        ) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        for entry in by_participant
            .range((participant_id, 0u64)..=(participant_id, u64::MAX))
            .map_err(db_error)?
        {
            let (_, id) = entry.map_err(db_error)?;
            if let Some(execution) = lookup(&executions, id.value())? {
                result.push(execution);
            }
        }
        Ok(result)
    }
}
