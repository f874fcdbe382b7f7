//! # Agent Orchestrator
//!
//! A task orchestration core for a multi-agent system: named executors are
//! registered by type, single tasks run with an audited execution record,
//! batches fan out concurrently, and workflows run their steps in order with
//! dependency checks and a configurable failure policy.
//!
//! ## Features
//!
//! - **Executor registry** - Register executors by type, look up, list, report status
//! - **Execution records** - Every run that reaches an executor leaves a terminal record
//! - **Batch runs** - Independent requests run concurrently, failures never abort the batch
//! - **Workflows** - Ordered steps, dependency skipping, `abort` or `continue` on failure
//! - **Events** - Task and workflow lifecycle events, scoped per project
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agent_orchestrator::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(AgentRegistry::default());
//!     registry
//!         .register(
//!             "reviewer",
//!             Arc::new(RuleExecutor::constant(
//!                 ExecutorDescriptor::new("reviewer", "Code Reviewer"),
//!                 "looks good",
//!             )),
//!         )
//!         .await;
//!
//!     let orchestrator = Orchestrator::with_registry(registry);
//!     let result = orchestrator
//!         .run_task(TaskRequest::new("reviewer", "review the login module"))
//!         .await?;
//!
//!     println!("Task completed: success={}", result.success);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod engine;
pub mod events;
pub mod workflow;

// Re-export main types
pub use agent::{
    AgentFailure, AgentOutput, Executor, ExecutorDescriptor, ResponseRule, RuleExecutor,
    TaskInput, TaskMetadata,
};
pub use config::{AgentConfig, ConfigError, OrchestratorConfig, StoreConfig};
pub use engine::{
    AgentRegistry, BatchEntry, BatchReport, BatchRunner, EnforcementPolicy, ExecutionRecord,
    ExecutionRecordStore, ExecutorStatus, FailureStub, InMemoryRecordStore, JsonlRecordStore,
    Orchestrator, RecordStatus, RecordUpdate, StepEntry, StepStatus, StoreError, TaskDispatcher,
    TaskError, TaskResult, WorkflowError, WorkflowOrchestrator, WorkflowRun,
};
pub use events::{Event, EventHub, EventName, EventPublisher, Scope, TracingPublisher};
pub use workflow::{
    FailurePolicy, LoadError, TaskRequest, WorkflowDefinition, WorkflowLoader, WorkflowStep,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::{
        AgentFailure, AgentOutput, Executor, ExecutorDescriptor, ResponseRule, RuleExecutor,
        TaskInput,
    };
    pub use crate::config::OrchestratorConfig;
    pub use crate::engine::{
        AgentRegistry, BatchEntry, BatchReport, EnforcementPolicy, ExecutionRecordStore,
        InMemoryRecordStore, Orchestrator, RecordStatus, TaskError, TaskResult, WorkflowError,
        WorkflowRun,
    };
    pub use crate::events::{EventHub, EventName, EventPublisher, Scope, TracingPublisher};
    pub use crate::workflow::{
        FailurePolicy, LoadError, TaskRequest, WorkflowDefinition, WorkflowLoader, WorkflowStep,
    };
}
