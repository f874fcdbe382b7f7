//! Agent registry
//!
//! Owns the set of registered executors and is the only way to run a single
//! task. Every run is wrapped in the execution-record lifecycle:
//!
//! 1. Resolve the executor (unknown type fails before anything is written)
//! 2. Stamp the input with a timestamp and a fresh request id
//! 3. Persist a `running` record
//! 4. Invoke the executor
//! 5. Persist exactly one terminal update (`completed`, `failed` or `timeout`)
//!
//! `timeoutMs`, `retryAttempts` and `maxConcurrent` are descriptor metadata.
//! They are only applied when the matching [`EnforcementPolicy`] flag is set.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use super::error::TaskError;
use super::record::{
    ExecutionRecord, ExecutionRecordStore, InMemoryRecordStore, RecordStatus, RecordUpdate,
};
use super::result::TaskResult;
use crate::agent::{
    AgentFailure, AgentOutput, Executor, ExecutorDescriptor, TaskInput, TaskMetadata,
};
use crate::workflow::TaskRequest;

/// Which declared executor limits the registry actually applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnforcementPolicy {
    /// Fail runs that exceed `timeout_ms` with a `timeout` record
    #[serde(default)]
    pub timeouts: bool,

    /// Allow at most `max_concurrent` simultaneous runs per type
    #[serde(default)]
    pub concurrency: bool,

    /// Re-invoke a failing executor up to `retry_attempts` more times
    #[serde(default)]
    pub retries: bool,
}

impl EnforcementPolicy {
    /// Metadata only, nothing enforced
    pub fn metadata_only() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            timeouts: true,
            concurrency: true,
            retries: true,
        }
    }
}

/// Status line reported for each registered executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorStatus {
    pub name: String,
    pub enabled: bool,
    pub role: String,
    pub description: String,

    /// No probing is done; always `true`
    pub healthy: bool,
}

#[derive(Clone)]
struct RegisteredExecutor {
    executor: Arc<dyn Executor>,
    permits: Arc<Semaphore>,
}

/// Why a single invocation produced no output
#[derive(Debug)]
enum InvocationFailure {
    Agent(AgentFailure),
    TimedOut(u64),
}

impl InvocationFailure {
    fn status(&self) -> RecordStatus {
        match self {
            Self::Agent(_) => RecordStatus::Failed,
            Self::TimedOut(_) => RecordStatus::Timeout,
        }
    }
}

impl std::fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agent(failure) => write!(f, "{}", failure),
            Self::TimedOut(ms) => write!(f, "Timed out after {}ms", ms),
        }
    }
}

pub struct AgentRegistry {
    executors: RwLock<HashMap<String, RegisteredExecutor>>,
    store: Arc<dyn ExecutionRecordStore>,
    policy: EnforcementPolicy,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryRecordStore::new()))
    }
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn ExecutionRecordStore>) -> Self {
        Self {
            executors: RwLock::new(HashMap::new()),
            store,
            policy: EnforcementPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EnforcementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> EnforcementPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn ExecutionRecordStore> {
        &self.store
    }

    /// Register an executor under `agent_type`
    ///
    /// Disabled executors are skipped and `false` is returned, as are
    /// executors whose descriptor declares a different type. A type that is
    /// already registered is replaced.
    pub async fn register(&self, agent_type: impl Into<String>, executor: Arc<dyn Executor>) -> bool {
        let agent_type = agent_type.into();
        let descriptor = executor.descriptor();

        if !descriptor.enabled {
            info!(agent_type = %agent_type, "Skipping disabled executor '{}'", descriptor.name);
            return false;
        }

        if descriptor.agent_type != agent_type {
            warn!(
                agent_type = %agent_type,
                declared = %descriptor.agent_type,
                "Refusing executor '{}': descriptor declares a different type",
                descriptor.name
            );
            return false;
        }

        let permits = Arc::new(Semaphore::new(permit_count(descriptor.max_concurrent)));
        let name = descriptor.name.clone();

        let previous = self
            .executors
            .write()
            .await
            .insert(agent_type.clone(), RegisteredExecutor { executor, permits });

        if previous.is_some() {
            warn!(agent_type = %agent_type, "Replacing registered executor with '{}'", name);
        } else {
            info!(agent_type = %agent_type, "Registered executor '{}'", name);
        }
        true
    }

    /// Exact-match lookup
    pub async fn get(&self, agent_type: &str) -> Result<Arc<dyn Executor>, TaskError> {
        self.entry(agent_type).await.map(|e| e.executor)
    }

    pub async fn contains(&self, agent_type: &str) -> bool {
        self.executors.read().await.contains_key(agent_type)
    }

    pub async fn len(&self) -> usize {
        self.executors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.executors.read().await.is_empty()
    }

    /// Descriptors of all registered executors, ordered by type
    pub async fn list_executors(&self) -> Vec<ExecutorDescriptor> {
        let executors = self.executors.read().await;
        let mut types: Vec<&String> = executors.keys().collect();
        types.sort();
        types
            .into_iter()
            .map(|t| executors[t].executor.descriptor().clone())
            .collect()
    }

    /// Status map keyed by registered type
    pub async fn executor_status(&self) -> BTreeMap<String, ExecutorStatus> {
        self.executors
            .read()
            .await
            .iter()
            .map(|(agent_type, entry)| {
                let d = entry.executor.descriptor();
                (
                    agent_type.clone(),
                    ExecutorStatus {
                        name: d.name.clone(),
                        enabled: d.enabled,
                        role: d.role.clone(),
                        description: d.description.clone(),
                        healthy: true,
                    },
                )
            })
            .collect()
    }

    async fn entry(&self, agent_type: &str) -> Result<RegisteredExecutor, TaskError> {
        self.executors
            .read()
            .await
            .get(agent_type)
            .cloned()
            .ok_or_else(|| TaskError::AgentNotFound(agent_type.to_string()))
    }

    /// Run one task end to end with audit bookkeeping
    #[instrument(skip(self, request), fields(agent_type = %request.agent_type))]
    pub async fn run_task(&self, request: TaskRequest) -> Result<TaskResult, TaskError> {
        let entry = self.entry(&request.agent_type).await?;
        let descriptor = entry.executor.descriptor().clone();

        let input = TaskInput {
            task: request.task,
            context: request
                .context
                .unwrap_or_else(|| Value::Object(Map::new())),
            project_id: request.project_id,
            task_id: request.task_id,
            metadata: TaskMetadata::stamp_with(request.metadata),
        };

        let _permit = if self.policy.concurrency {
            debug!("Waiting for a run slot ({} max)", descriptor.max_concurrent);
            entry.permits.clone().acquire_owned().await.ok()
        } else {
            None
        };

        let record = ExecutionRecord::running(&request.agent_type, &descriptor, &input);
        if let Err(e) = self.store.create(&record).await {
            error!(request_id = %input.metadata.request_id, "Failed to persist running record: {}", e);
            return Err(TaskError::execution_failed(TaskResult::failure(format!(
                "Failed to create execution record: {}",
                e
            ))));
        }

        debug!(record_id = %record.id, request_id = %input.metadata.request_id, "Invoking executor");

        match self.invoke(&entry.executor, &descriptor, &input).await {
            Ok(output) => {
                let update =
                    RecordUpdate::completed(record.started_at, output.result.clone(), output.tokens_used);
                self.finish(&record.id, &update).await;

                info!(record_id = %record.id, duration_ms = update.duration_ms, "Task completed");
                Ok(TaskResult {
                    success: true,
                    result: Some(output.result),
                    error: None,
                    duration_ms: update.duration_ms,
                    tokens_used: output.tokens_used,
                    execution_record_id: Some(record.id),
                })
            }
            Err(failure) => {
                let message = failure.to_string();
                let update =
                    RecordUpdate::failed(record.started_at, failure.status(), message.clone());
                self.finish(&record.id, &update).await;

                warn!(record_id = %record.id, status = %update.status, "Task failed: {}", message);
                Err(TaskError::execution_failed(TaskResult {
                    success: false,
                    result: None,
                    error: Some(message),
                    duration_ms: update.duration_ms,
                    tokens_used: None,
                    execution_record_id: Some(record.id),
                }))
            }
        }
    }

    async fn finish(&self, record_id: &str, update: &RecordUpdate) {
        if let Err(e) = self.store.update(record_id, update).await {
            error!(record_id = %record_id, "Failed to persist {} state: {}", update.status, e);
        }
    }

    async fn invoke(
        &self,
        executor: &Arc<dyn Executor>,
        descriptor: &ExecutorDescriptor,
        input: &TaskInput,
    ) -> Result<AgentOutput, InvocationFailure> {
        let attempts = if self.policy.retries {
            descriptor.retry_attempts + 1
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.invoke_once(executor, descriptor, input).await {
                Ok(output) => return Ok(output),
                Err(failure) if attempt < attempts => {
                    warn!(attempt, attempts, "Attempt failed, retrying: {}", failure);
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn invoke_once(
        &self,
        executor: &Arc<dyn Executor>,
        descriptor: &ExecutorDescriptor,
        input: &TaskInput,
    ) -> Result<AgentOutput, InvocationFailure> {
        let run = AssertUnwindSafe(executor.run(input)).catch_unwind();

        let outcome = if self.policy.timeouts {
            match tokio::time::timeout(Duration::from_millis(descriptor.timeout_ms), run).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(InvocationFailure::TimedOut(descriptor.timeout_ms)),
            }
        } else {
            run.await
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(failure)) => Err(InvocationFailure::Agent(failure)),
            Err(panic) => Err(InvocationFailure::Agent(AgentFailure::Panicked(
                panic_message(panic.as_ref()),
            ))),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Semaphore size for a declared `max_concurrent`, kept within tokio's limits
fn permit_count(max_concurrent: usize) -> usize {
    max_concurrent.clamp(1, Semaphore::MAX_PERMITS)
}
