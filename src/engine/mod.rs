//! Task orchestration engine
//!
//! This module contains:
//! - `registry` - Executor registry and the audited single-task run
//! - `record` - Execution records and the in-memory store
//! - `jsonl_store` - Append-only JSON Lines record store
//! - `dispatch` - Event-publishing task entry point
//! - `batch` - Concurrent fan-out of independent requests
//! - `workflow_runner` - Ordered, dependency-checked workflow execution
//! - `orchestrator` - Facade over all of the above
//! - `error` - Task and workflow error types
//! - `result` - Task, batch, and workflow result types

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod jsonl_store;
pub mod orchestrator;
pub mod record;
pub mod registry;
pub mod result;
pub mod workflow_runner;

pub use batch::BatchRunner;
pub use dispatch::TaskDispatcher;
pub use error::{TaskError, WorkflowError};
pub use jsonl_store::JsonlRecordStore;
pub use orchestrator::Orchestrator;
pub use record::{
    ExecutionRecord, ExecutionRecordStore, InMemoryRecordStore, RecordStatus, RecordUpdate,
    StoreError,
};
pub use registry::{AgentRegistry, EnforcementPolicy, ExecutorStatus};
pub use result::{
    BatchEntry, BatchReport, FailureStub, StepEntry, StepStatus, TaskResult, WorkflowRun,
};
pub use workflow_runner::WorkflowOrchestrator;
