//! Audit storage backends.

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::logger::AuditFilter;
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit event.
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Query audit events with filters, oldest first.
    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError>;

    /// Count audit events matching a filter (ignores limit/offset).
    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        let unbounded = AuditFilter {
            limit: None,
            offset: None,
            ..filter
        };
        Ok(self.query(unbounded).await?.len())
    }

    /// Get an audit event by ID.
    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError>;
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullStorage;

impl NullStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(vec![])
    }

    async fn get(&self, _event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(None)
    }
}

/// Console storage (prints human-readable lines to stdout).
#[derive(Debug, Default)]
pub struct ConsoleStorage;

impl ConsoleStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        println!("{}", event.to_log_line());
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        // Console storage doesn't support querying
        Ok(vec![])
    }

    async fn get(&self, _event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(None)
    }
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_events(events: Vec<AuditEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    fn push(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events
            .write()
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire write lock: {}", e)))?
            .push(event);
        Ok(())
    }

    fn filtered(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire read lock: {}", e)))?;

        let results = events
            .iter()
            .filter(|e| filter.matches(e))
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(results)
    }

    fn find(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire read lock: {}", e)))?;
        Ok(events.iter().find(|e| e.event_id == event_id).cloned())
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.push(event)
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.filtered(&filter)
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.find(event_id)
    }
}

/// File storage (appends JSON Lines to a log file).
///
/// Existing events are loaded on open so queries span restarts.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    cache: MemoryStorage,
}

impl FileStorage {
    /// Open (or create) the log file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let events = Self::load(&path)?;
        tracing::debug!(path = %path.display(), events = events.len(), "Loaded audit log");

        Ok(Self {
            path,
            cache: MemoryStorage::with_events(events),
        })
    }

    fn load(path: &Path) -> Result<Vec<AuditEvent>, AuditError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(path)?);
        let mut events = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<AuditEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse audit event on line {} of {}: {}",
                        line_num + 1,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(events)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        self.cache.push(event)
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.cache.filtered(&filter)
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.cache.find(event_id)
    }
}

/// File storage that also prints each event to the console.
#[derive(Debug)]
pub struct DualStorage {
    file: FileStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self {
            file: FileStorage::new(path)?,
            console: ConsoleStorage::new(),
        })
    }
}

#[async_trait]
impl AuditStorage for DualStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.console.store(event.clone()).await?;
        self.file.store(event).await
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.file.query(filter).await
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.file.get(event_id).await
    }
}
