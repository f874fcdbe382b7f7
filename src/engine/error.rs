//! Orchestration error types

use super::result::{FailureStub, TaskResult, WorkflowRun};

/// Errors returned by a single task run
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The type is unregistered (or was disabled at registration time).
    /// Raised before any execution record exists.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// The executor failed, panicked or timed out. The terminal record has
    /// already been written; `result` carries its id and timing.
    #[error("Execution failed: {}", .result.error.as_deref().unwrap_or("unknown error"))]
    ExecutionFailed { result: Box<TaskResult> },
}

impl TaskError {
    pub(crate) fn execution_failed(result: TaskResult) -> Self {
        Self::ExecutionFailed {
            result: Box::new(result),
        }
    }

    /// Human-readable reason without the variant prefix
    pub fn reason(&self) -> String {
        match self {
            Self::AgentNotFound(_) => self.to_string(),
            Self::ExecutionFailed { result } => result
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }

    /// Flatten into the `success: false` result shape callers inspect
    pub fn into_task_result(self) -> TaskResult {
        match self {
            Self::AgentNotFound(_) => TaskResult::failure(self.to_string()),
            Self::ExecutionFailed { result } => *result,
        }
    }

    /// Batch placeholder for a request that never reached an executor
    pub fn into_stub(self, agent_type: &str) -> FailureStub {
        FailureStub::new(agent_type, self.reason())
    }
}

/// Errors returned by a workflow run
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// A step failed under the abort policy. The remaining steps were never
    /// attempted; `run` holds everything executed up to and including the
    /// failing step.
    #[error("Workflow '{}' aborted at step '{step}': {error}", .run.name)]
    Aborted {
        step: String,
        error: String,
        run: Box<WorkflowRun>,
    },
}

impl WorkflowError {
    /// The partial run carried by an abort
    pub fn partial_run(&self) -> &WorkflowRun {
        match self {
            Self::Aborted { run, .. } => run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_flattens_to_failure() {
        let result = TaskError::AgentNotFound("ghost".into()).into_task_result();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Agent not found: ghost"));
        assert!(result.execution_record_id.is_none());
    }

    #[test]
    fn test_execution_failure_keeps_record() {
        let failed = TaskResult {
            success: false,
            error: Some("boom".into()),
            execution_record_id: Some("rec-1".into()),
            duration_ms: 7,
            ..Default::default()
        };
        let err = TaskError::execution_failed(failed.clone());

        assert_eq!(err.to_string(), "Execution failed: boom");
        assert_eq!(err.reason(), "boom");
        assert_eq!(err.into_task_result(), failed);
    }

    #[test]
    fn test_stub_from_not_found() {
        let stub = TaskError::AgentNotFound("ghost".into()).into_stub("ghost");
        assert_eq!(stub.agent_type, "ghost");
        assert!(!stub.success);
    }
}
