//! Orchestrator facade
//!
//! Bundles the registry, dispatcher, batch runner and workflow orchestrator
//! behind the five operations callers use.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::batch::BatchRunner;
use super::dispatch::TaskDispatcher;
use super::error::{TaskError, WorkflowError};
use super::registry::{AgentRegistry, ExecutorStatus};
use super::result::{BatchReport, TaskResult, WorkflowRun};
use super::workflow_runner::WorkflowOrchestrator;
use crate::agent::ExecutorDescriptor;
use crate::events::{EventPublisher, TracingPublisher};
use crate::workflow::{TaskRequest, WorkflowDefinition};

pub struct Orchestrator {
    dispatcher: TaskDispatcher,
    batch: BatchRunner,
    workflows: WorkflowOrchestrator,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, publisher: Arc<dyn EventPublisher>) -> Self {
        let dispatcher = TaskDispatcher::new(registry, publisher);
        Self {
            batch: BatchRunner::new(dispatcher.clone()),
            workflows: WorkflowOrchestrator::new(dispatcher.clone()),
            dispatcher,
        }
    }

    /// Orchestrator that publishes events to the tracing log only
    pub fn with_registry(registry: Arc<AgentRegistry>) -> Self {
        Self::new(registry, Arc::new(TracingPublisher))
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.dispatcher.registry()
    }

    pub async fn run_task(&self, request: TaskRequest) -> Result<TaskResult, TaskError> {
        self.dispatcher.dispatch(request).await
    }

    pub async fn run_many(&self, requests: Vec<TaskRequest>) -> BatchReport {
        self.batch.run_many(requests).await
    }

    pub async fn run_workflow(
        &self,
        workflow: WorkflowDefinition,
    ) -> Result<WorkflowRun, WorkflowError> {
        self.workflows.run_workflow(workflow).await
    }

    pub async fn list_executors(&self) -> Vec<ExecutorDescriptor> {
        self.registry().list_executors().await
    }

    pub async fn executor_status(&self) -> BTreeMap<String, ExecutorStatus> {
        self.registry().executor_status().await
    }
}
