//! Task dispatcher
//!
//! The outer task-request entry point. Wraps [`AgentRegistry::run_task`] with
//! the `task_started` / `task_completed` / `task_failed` notifications. The
//! registry itself never publishes.

use std::sync::Arc;

use serde_json::json;

use super::error::TaskError;
use super::registry::AgentRegistry;
use super::result::TaskResult;
use crate::events::{Event, EventName, EventPublisher, Scope};
use crate::workflow::TaskRequest;

#[derive(Clone)]
pub struct TaskDispatcher {
    registry: Arc<AgentRegistry>,
    publisher: Arc<dyn EventPublisher>,
}

impl TaskDispatcher {
    pub fn new(registry: Arc<AgentRegistry>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    /// Publish an event scoped to `project_id` (or global)
    pub async fn emit(&self, project_id: Option<&str>, name: EventName, payload: serde_json::Value) {
        self.publisher
            .publish(Event::new(Scope::from_project(project_id), name, payload))
            .await;
    }

    pub async fn dispatch(&self, request: TaskRequest) -> Result<TaskResult, TaskError> {
        let project_id = request.project_id.clone();
        let agent_type = request.agent_type.clone();
        let task = request.task.clone();
        let task_id = request.task_id.clone();

        self.emit(
            project_id.as_deref(),
            EventName::TaskStarted,
            json!({
                "agentType": agent_type,
                "task": task,
                "taskId": task_id,
            }),
        )
        .await;

        let outcome = self.registry.run_task(request).await;

        match &outcome {
            Ok(result) => {
                self.emit(
                    project_id.as_deref(),
                    EventName::TaskCompleted,
                    json!({
                        "agentType": agent_type,
                        "task": task,
                        "taskId": task_id,
                        "executionRecordId": result.execution_record_id,
                        "durationMs": result.duration_ms,
                        "result": result.result,
                    }),
                )
                .await;
            }
            Err(err) => {
                let record_id = match err {
                    TaskError::ExecutionFailed { result } => result.execution_record_id.clone(),
                    TaskError::AgentNotFound(_) => None,
                };
                self.emit(
                    project_id.as_deref(),
                    EventName::TaskFailed,
                    json!({
                        "agentType": agent_type,
                        "task": task,
                        "taskId": task_id,
                        "executionRecordId": record_id,
                        "error": err.reason(),
                    }),
                )
                .await;
            }
        }

        outcome
    }
}
