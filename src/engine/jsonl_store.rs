//! Append-only JSON Lines record store
//!
//! Every create and every terminal update appends one line:
//!
//! ```text
//! {"op":"create","record":{...}}
//! {"op":"update","record":{...}}
//! ```
//!
//! Reopening a log replays it; the last line for an id wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::record::{ExecutionRecord, ExecutionRecordStore, RecordUpdate, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogOp {
    Create,
    Update,
}

#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    op: LogOp,
    record: ExecutionRecord,
}

#[derive(Debug, Default)]
struct LogState {
    records: HashMap<String, ExecutionRecord>,
    order: Vec<String>,
}

impl LogState {
    fn apply(&mut self, line: LogLine) {
        if !self.records.contains_key(&line.record.id) {
            self.order.push(line.record.id.clone());
        }
        self.records.insert(line.record.id.clone(), line.record);
    }
}

pub struct JsonlRecordStore {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl JsonlRecordStore {
    /// Open (or create) a log file, replaying any existing lines
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut state = LogState::default();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (idx, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<LogLine>(line) {
                        Ok(entry) => state.apply(entry),
                        Err(e) => warn!(
                            path = %path.display(),
                            line = idx + 1,
                            "Skipping unreadable record line: {}", e
                        ),
                    }
                }
                debug!(path = %path.display(), records = state.order.len(), "Replayed record log");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &LogLine) -> Result<(), StoreError> {
        let mut json = serde_json::to_string(line)?;
        json.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionRecordStore for JsonlRecordStore {
    async fn create(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }

        let line = LogLine {
            op: LogOp::Create,
            record: record.clone(),
        };
        self.append(&line).await?;
        state.apply(line);
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        update: &RecordUpdate,
    ) -> Result<ExecutionRecord, StoreError> {
        let mut state = self.state.lock().await;
        let mut record = state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id: id.to_string(),
                status: record.status,
            });
        }

        record.apply(update);
        let line = LogLine {
            op: LogOp::Update,
            record: record.clone(),
        };
        self.append(&line).await?;
        state.apply(line);
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError> {
        Ok(self.state.lock().await.records.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }
}
