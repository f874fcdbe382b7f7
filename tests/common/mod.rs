#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_orchestrator::prelude::*;
use agent_orchestrator::{Event, TaskInput};
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Mutex;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write test file");
}

/// Echoes the task back, optionally after a delay
pub struct EchoExecutor {
    descriptor: ExecutorDescriptor,
    delay: Duration,
}

impl EchoExecutor {
    pub fn new(agent_type: &str) -> Self {
        Self {
            descriptor: ExecutorDescriptor::new(agent_type, format!("{} agent", agent_type)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_descriptor(mut self, descriptor: ExecutorDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }
}

#[async_trait]
impl Executor for EchoExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn run(&self, input: &TaskInput) -> Result<AgentOutput, AgentFailure> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(AgentOutput::new(json!({ "echo": input.task })).with_tokens(7))
    }
}

/// Fails on every call and counts how often it was called
pub struct FailingExecutor {
    descriptor: ExecutorDescriptor,
    message: String,
    pub calls: AtomicU32,
}

impl FailingExecutor {
    pub fn new(agent_type: &str, message: &str) -> Self {
        Self {
            descriptor: ExecutorDescriptor::new(agent_type, format!("{} agent", agent_type)),
            message: message.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_descriptor(mut self, descriptor: ExecutorDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for FailingExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn run(&self, _input: &TaskInput) -> Result<AgentOutput, AgentFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AgentFailure::failed(self.message.clone()))
    }
}

/// Tracks how many runs are inside `run` at once
///
/// Each run holds its slot for `hold`, so overlapping runs are observed
/// without timing assertions.
pub struct InFlightExecutor {
    descriptor: ExecutorDescriptor,
    hold: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightExecutor {
    pub fn new(descriptor: ExecutorDescriptor) -> Self {
        Self {
            descriptor,
            hold: Duration::from_millis(50),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for InFlightExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn run(&self, input: &TaskInput) -> Result<AgentOutput, AgentFailure> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(AgentOutput::new(json!({ "echo": input.task })))
    }
}

/// Publisher that keeps every event for later inspection
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<Event>>,
}

impl RecordingPublisher {
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn names(&self) -> Vec<EventName> {
        self.events
            .lock()
            .await
            .iter()
            .map(|e| e.event_name)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: Event) {
        self.events.lock().await.push(event);
    }
}

/// Registry with `echo`, `slow` (100ms) and `broken` executors
pub async fn standard_registry() -> Arc<AgentRegistry> {
    let registry = Arc::new(AgentRegistry::default());
    registry
        .register("echo", Arc::new(EchoExecutor::new("echo")))
        .await;
    registry
        .register(
            "slow",
            Arc::new(EchoExecutor::new("slow").with_delay(Duration::from_millis(100))),
        )
        .await;
    registry
        .register("broken", Arc::new(FailingExecutor::new("broken", "agent exploded")))
        .await;
    registry
}

pub async fn orchestrator_with_events() -> (Orchestrator, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let orchestrator = Orchestrator::new(standard_registry().await, publisher.clone());
    (orchestrator, publisher)
}
