//! Executor contract
//!
//! An executor ("agent") is an opaque unit that receives a task description
//! plus contextual data and produces a result or a failure reason. The
//! orchestration core only ever talks to executors through the [`Executor`]
//! trait; what an executor does with the task text is its own business.
//!
//! - `rule_based` - Keyword/regex driven executor configured from YAML

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod rule_based;

pub use rule_based::{ResponseRule, RuleExecutor};

/// Static metadata for a registered executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorDescriptor {
    /// Display name
    pub name: String,

    /// Unique registry key
    #[serde(rename = "type")]
    pub agent_type: String,

    /// Disabled executors are never registered
    pub enabled: bool,

    /// Free-form role label
    pub role: String,

    pub description: String,

    /// Per-run deadline, only applied when timeout enforcement is on
    pub timeout_ms: u64,

    /// Extra attempts, only applied when retry enforcement is on
    pub retry_attempts: u32,

    /// Capacity hint, only applied when concurrency enforcement is on
    pub max_concurrent: usize,
}

impl ExecutorDescriptor {
    /// Create an enabled descriptor with default limits
    pub fn new(agent_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent_type: agent_type.into(),
            enabled: true,
            role: String::new(),
            description: String::new(),
            timeout_ms: default_timeout_ms(),
            retry_attempts: 0,
            max_concurrent: default_max_concurrent(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

pub(crate) fn default_timeout_ms() -> u64 {
    30_000
}

pub(crate) fn default_max_concurrent() -> usize {
    4
}

/// Metadata stamped onto every task input by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,

    /// Opaque caller-supplied extras from `TaskRequest::metadata`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskMetadata {
    /// Fresh metadata with the current time and a new request id
    pub fn stamp() -> Self {
        Self::stamp_with(Map::new())
    }

    /// Like [`TaskMetadata::stamp`], carrying caller extras
    ///
    /// Extras named `timestamp` or `requestId` are dropped.
    pub fn stamp_with(mut extra: Map<String, Value>) -> Self {
        extra.remove("timestamp");
        extra.remove("requestId");
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            extra,
        }
    }
}

/// Input handed to an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub task: String,

    #[serde(default)]
    pub context: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    pub metadata: TaskMetadata,
}

/// What an executor hands back on success
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

impl AgentOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// Reasons an executor can give for not producing a result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentFailure {
    #[error("{0}")]
    Failed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Executor panicked: {0}")]
    Panicked(String),
}

impl AgentFailure {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A named unit that performs one task
///
/// Implementations must be cheap to share: the registry stores them behind an
/// `Arc` and concurrent runs against the same executor are allowed.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Metadata used for registration gating, listing and status reports
    fn descriptor(&self) -> &ExecutorDescriptor;

    /// Run a single task
    async fn run(&self, input: &TaskInput) -> Result<AgentOutput, AgentFailure>;
}
