//! Task, batch, and workflow result types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::WorkflowStep;

/// Outcome of a single task run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,

    /// Absent only when the running record could not be persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_record_id: Option<String>,
}

impl TaskResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Placeholder for a batch request that never reached an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureStub {
    pub success: bool,
    pub error: String,
    pub agent_type: String,
}

impl FailureStub {
    pub fn new(agent_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            agent_type: agent_type.into(),
        }
    }
}

/// One position in a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Result(TaskResult),
    Stub(FailureStub),
}

impl BatchEntry {
    pub fn success(&self) -> bool {
        match self {
            Self::Result(r) => r.success,
            Self::Stub(_) => false,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Result(r) => r.error.as_deref(),
            Self::Stub(s) => Some(&s.error),
        }
    }

    pub fn as_result(&self) -> Option<&TaskResult> {
        match self {
            Self::Result(r) => Some(r),
            Self::Stub(_) => None,
        }
    }
}

/// Position-aligned results of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn from_entries(results: Vec<BatchEntry>) -> Self {
        let successful = results.iter().filter(|e| e.success()).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Terminal status of an attempted workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// Entry in a workflow's ordered step log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEntry {
    pub step: WorkflowStep,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepEntry {
    pub fn completed(step: WorkflowStep, result: TaskResult) -> Self {
        Self {
            step,
            status: StepStatus::Completed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(step: WorkflowStep, error: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Report of a workflow run (complete, or partial when aborted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub name: String,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,

    /// Steps passed over because a dependency had no result
    #[serde(default)]
    pub skipped_steps: usize,

    /// Successful step results keyed by the step's task description
    pub results: BTreeMap<String, TaskResult>,

    /// Attempted steps in execution order; skipped steps are absent
    pub steps: Vec<StepEntry>,
}

impl WorkflowRun {
    pub fn new(name: impl Into<String>, total_steps: usize) -> Self {
        Self {
            name: name.into(),
            total_steps,
            completed_steps: 0,
            failed_steps: 0,
            skipped_steps: 0,
            results: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    pub(crate) fn record_completed(&mut self, step: WorkflowStep, result: TaskResult) {
        self.results.insert(step.task.clone(), result.clone());
        self.steps.push(StepEntry::completed(step, result));
        self.completed_steps += 1;
    }

    pub(crate) fn record_failed(&mut self, step: WorkflowStep, error: impl Into<String>) {
        self.steps.push(StepEntry::failed(step, error));
        self.failed_steps += 1;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped_steps += 1;
    }

    /// Steps never reached, which is non-zero only after an abort
    pub fn not_run_steps(&self) -> usize {
        self.total_steps
            .saturating_sub(self.completed_steps + self.failed_steps + self.skipped_steps)
    }

    pub fn success(&self) -> bool {
        self.failed_steps == 0
    }
}
