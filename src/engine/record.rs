//! Execution records and the stores that persist them
//!
//! A record is created in `running` right before an executor is invoked and
//! is updated exactly once to a terminal status afterwards. Stores never
//! delete records.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::agent::{ExecutorDescriptor, TaskInput};

/// Lifecycle status of an execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Never written by the registry; kept for stores that pre-queue work
    Queued,
    Running,
    Completed,
    Failed,
    Timeout,
}

impl RecordStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Audit row for one executor invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub executor_type: String,
    pub executor_name: String,
    pub status: RecordStatus,

    /// Serialized task input
    pub input: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// A fresh `running` record for the executor registered under `agent_type`
    pub fn running(agent_type: &str, descriptor: &ExecutorDescriptor, input: &TaskInput) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            executor_type: agent_type.to_string(),
            executor_name: descriptor.name.clone(),
            status: RecordStatus::Running,
            input: serde_json::to_value(input).unwrap_or(Value::Null),
            output: None,
            error: None,
            task_id: input.task_id.clone(),
            project_id: input.project_id.clone(),
            duration_ms: None,
            tokens_used: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Apply a terminal update in place
    pub fn apply(&mut self, update: &RecordUpdate) {
        self.status = update.status;
        self.output = update.output.clone();
        self.error = update.error.clone();
        self.duration_ms = Some(update.duration_ms);
        self.tokens_used = update.tokens_used;
        self.updated_at = update.completed_at;
        self.completed_at = Some(update.completed_at);
    }
}

/// The single terminal write applied to a running record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    pub status: RecordStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,

    pub completed_at: DateTime<Utc>,
}

impl RecordUpdate {
    /// Completed update; duration is measured from `started_at`
    pub fn completed(
        started_at: DateTime<Utc>,
        output: Value,
        tokens_used: Option<u64>,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            status: RecordStatus::Completed,
            output: Some(output),
            error: None,
            duration_ms: elapsed_ms(started_at, completed_at),
            tokens_used,
            completed_at,
        }
    }

    /// Failed (or timed out) update; duration is measured from `started_at`
    pub fn failed(started_at: DateTime<Utc>, status: RecordStatus, error: String) -> Self {
        let completed_at = Utc::now();
        Self {
            status,
            output: None,
            error: Some(error),
            duration_ms: elapsed_ms(started_at, completed_at),
            tokens_used: None,
            completed_at,
        }
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Execution record not found: {0}")]
    NotFound(String),

    #[error("Execution record already exists: {0}")]
    Duplicate(String),

    #[error("Execution record {id} is already {status}")]
    AlreadyTerminal { id: String, status: RecordStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence boundary for execution records
#[async_trait]
pub trait ExecutionRecordStore: Send + Sync {
    /// Persist a new record
    async fn create(&self, record: &ExecutionRecord) -> Result<(), StoreError>;

    /// Apply the terminal update to an existing record and return it
    async fn update(&self, id: &str, update: &RecordUpdate)
        -> Result<ExecutionRecord, StoreError>;

    /// Look a record up by id
    async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError>;

    /// All records, oldest first
    async fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError>;
}

/// Process-local store, the default when no store is configured
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, ExecutionRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ExecutionRecordStore for InMemoryRecordStore {
    async fn create(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        update: &RecordUpdate,
    ) -> Result<ExecutionRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id: id.to_string(),
                status: record.status,
            });
        }

        record.apply(update);
        Ok(record.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(records)
    }
}
