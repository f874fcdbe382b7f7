//! Request and workflow definitions
//!
//! This module contains the caller-facing types:
//! - `TaskRequest` - One task addressed to an executor type
//! - `WorkflowDefinition`, `WorkflowStep`, `FailurePolicy` - Multi-step workflows
//! - `loader` - Load workflows and batch files from YAML

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod loader;

pub use loader::{LoadError, WorkflowLoader};

/// A single task addressed to an executor type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    #[serde(alias = "agent_type")]
    pub agent_type: String,

    pub task: String,

    #[serde(default)]
    pub context: Option<Value>,

    #[serde(default, alias = "project_id")]
    pub project_id: Option<String>,

    #[serde(default, alias = "task_id")]
    pub task_id: Option<String>,

    /// Extra keys stored under the record's input metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl TaskRequest {
    pub fn new(agent_type: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task: task.into(),
            context: None,
            project_id: None,
            task_id: None,
            metadata: Map::new(),
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One step of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    #[serde(alias = "agent_type")]
    pub agent_type: String,

    /// Task description; also the key this step's result is stored under
    pub task: String,

    /// Task keys that must already have produced a result
    #[serde(default, alias = "depends_on")]
    pub dependencies: Vec<String>,

    /// Carried through to reports but never evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl WorkflowStep {
    pub fn new(agent_type: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task: task.into(),
            dependencies: Vec::new(),
            condition: None,
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// What a workflow does when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the failing step; later steps are never attempted
    #[default]
    Abort,
    /// Record the failure and move on to the next step
    Continue,
}

/// Workflow name that implies [`FailurePolicy::Continue`] when no policy is set
pub const LEGACY_CONTINUE_NAME: &str = "non-critical";

/// A named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub name: String,

    /// Explicit failure policy; see [`WorkflowDefinition::failure_policy`]
    #[serde(default, alias = "on_failure", skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailurePolicy>,

    /// Scope for events published while the workflow runs
    #[serde(default, alias = "project_id")]
    pub project_id: Option<String>,

    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            on_failure: None,
            project_id: None,
            steps,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = Some(policy);
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Policy in effect for this workflow
    ///
    /// An explicit `on_failure` always wins. Without one, a workflow named
    /// exactly [`LEGACY_CONTINUE_NAME`] continues past failed steps and every
    /// other workflow aborts.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self.on_failure {
            Some(policy) => policy,
            None if self.continues_by_name() => FailurePolicy::Continue,
            None => FailurePolicy::Abort,
        }
    }

    /// True when the policy comes from the workflow name rather than `on_failure`
    pub fn continues_by_name(&self) -> bool {
        self.on_failure.is_none() && self.name == LEGACY_CONTINUE_NAME
    }

    pub fn aborts_on_failure(&self) -> bool {
        self.failure_policy() == FailurePolicy::Abort
    }

    /// Dependency keys that no step in this workflow produces
    ///
    /// Steps depending on these are always skipped at run time.
    pub fn unresolvable_dependencies(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for (idx, step) in self.steps.iter().enumerate() {
            for dep in &step.dependencies {
                let produced_earlier = self.steps[..idx].iter().any(|s| &s.task == dep);
                if !produced_earlier {
                    missing.push((step.task.clone(), dep.clone()));
                }
            }
        }
        missing
    }
}
