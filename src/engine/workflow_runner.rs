//! Workflow orchestrator
//!
//! Runs a workflow's steps strictly in list order, one at a time. There is no
//! topological re-ordering: a step whose dependencies have not produced a
//! result *by the time it is reached* is skipped, and a skipped step never
//! becomes available as a dependency for later steps.
//!
//! Per step: `pending -> skipped | completed | failed`.

use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use super::dispatch::TaskDispatcher;
use super::error::WorkflowError;
use super::result::WorkflowRun;
use crate::events::EventName;
use crate::workflow::{TaskRequest, WorkflowDefinition, WorkflowStep};

pub struct WorkflowOrchestrator {
    dispatcher: TaskDispatcher,
}

impl WorkflowOrchestrator {
    pub fn new(dispatcher: TaskDispatcher) -> Self {
        Self { dispatcher }
    }

    #[instrument(skip(self, workflow), fields(workflow_name = %workflow.name))]
    pub async fn run_workflow(
        &self,
        workflow: WorkflowDefinition,
    ) -> Result<WorkflowRun, WorkflowError> {
        let project_id = workflow.project_id.as_deref();
        let mut run = WorkflowRun::new(&workflow.name, workflow.steps.len());

        if workflow.continues_by_name() {
            warn!(
                "Workflow '{}' has no on_failure policy; continuing past failures because of its name",
                workflow.name
            );
        }
        info!(
            "Starting workflow: {} ({} steps, on_failure: {:?})",
            workflow.name,
            workflow.steps.len(),
            workflow.failure_policy()
        );
        self.dispatcher
            .emit(
                project_id,
                EventName::WorkflowStarted,
                json!({ "name": workflow.name, "totalSteps": run.total_steps }),
            )
            .await;

        for (idx, step) in workflow.steps.iter().enumerate() {
            let missing = missing_dependencies(step, &run);
            if !missing.is_empty() {
                warn!(
                    "Skipping step {} '{}': unmet dependencies {:?}",
                    idx + 1,
                    step.task,
                    missing
                );
                self.dispatcher
                    .emit(
                        project_id,
                        EventName::WorkflowStepSkipped,
                        json!({ "name": workflow.name, "step": step.task, "missing": missing }),
                    )
                    .await;
                run.record_skipped();
                continue;
            }

            if let Some(condition) = &step.condition {
                info!("Step '{}' has condition '{}' (not evaluated)", step.task, condition);
            }

            let request = TaskRequest {
                agent_type: step.agent_type.clone(),
                task: step.task.clone(),
                context: Some(previous_results_context(&run)),
                project_id: workflow.project_id.clone(),
                task_id: None,
                metadata: Default::default(),
            };

            match self.dispatcher.dispatch(request).await {
                Ok(result) => {
                    info!("Step {} '{}' completed", idx + 1, step.task);
                    run.record_completed(step.clone(), result);
                }
                Err(err) => {
                    let reason = err.reason();
                    error!("Step {} '{}' failed: {}", idx + 1, step.task, reason);
                    run.record_failed(step.clone(), reason.clone());

                    if workflow.aborts_on_failure() {
                        self.dispatcher
                            .emit(
                                project_id,
                                EventName::WorkflowFailed,
                                json!({
                                    "name": workflow.name,
                                    "step": step.task,
                                    "error": reason,
                                    "completedSteps": run.completed_steps,
                                }),
                            )
                            .await;
                        return Err(WorkflowError::Aborted {
                            step: step.task.clone(),
                            error: reason,
                            run: Box::new(run),
                        });
                    }
                }
            }
        }

        info!(
            completed = run.completed_steps,
            failed = run.failed_steps,
            skipped = run.skipped_steps,
            "Workflow finished: {}",
            workflow.name
        );
        self.dispatcher
            .emit(
                project_id,
                EventName::WorkflowCompleted,
                json!({
                    "name": run.name,
                    "totalSteps": run.total_steps,
                    "completedSteps": run.completed_steps,
                    "failedSteps": run.failed_steps,
                    "skippedSteps": run.skipped_steps,
                }),
            )
            .await;

        Ok(run)
    }
}

fn missing_dependencies<'a>(step: &'a WorkflowStep, run: &WorkflowRun) -> Vec<&'a str> {
    step.dependencies
        .iter()
        .filter(|dep| !run.results.contains_key(dep.as_str()))
        .map(String::as_str)
        .collect()
}

fn previous_results_context(run: &WorkflowRun) -> Value {
    json!({ "previousResults": run.results })
}
