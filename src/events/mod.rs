//! Status-change events
//!
//! The core publishes events through the [`EventPublisher`] trait and never
//! waits on subscribers. Two publishers ship with the crate:
//! - [`EventHub`] - in-process fan-out to subscribers grouped by scope
//! - [`TracingPublisher`] - writes every event to the tracing log

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Grouping key for subscribers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Project(String),
}

impl Scope {
    pub fn from_project(project_id: Option<&str>) -> Self {
        match project_id {
            Some(id) => Self::Project(id.to_string()),
            None => Self::Global,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Project(id) => write!(f, "project:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    BatchCompleted,
    WorkflowStarted,
    WorkflowStepSkipped,
    WorkflowCompleted,
    WorkflowFailed,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::TaskFailed => "task_failed",
            Self::BatchCompleted => "batch_completed",
            Self::WorkflowStarted => "workflow_started",
            Self::WorkflowStepSkipped => "workflow_step_skipped",
            Self::WorkflowCompleted => "workflow_completed",
            Self::WorkflowFailed => "workflow_failed",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub scope: Scope,
    pub event_name: EventName,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(scope: Scope, event_name: EventName, payload: Value) -> Self {
        Self {
            scope,
            event_name,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Outbound boundary for status-change notifications
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Event);
}

/// Publisher that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, event: Event) {
        info!(
            scope = %event.scope,
            event = %event.event_name,
            payload = %event.payload,
            "Event published"
        );
    }
}

/// In-process fan-out hub
///
/// Subscribers receive only the events of the scope they subscribed to.
/// Closed subscriptions are pruned on the next publish to that scope.
#[derive(Debug)]
pub struct EventHub {
    subscribers: Mutex<HashMap<Scope, Vec<async_channel::Sender<Event>>>>,
    capacity: usize,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Hub whose per-subscriber buffers hold at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn subscribe(&self, scope: Scope) -> async_channel::Receiver<Event> {
        let (tx, rx) = async_channel::bounded(self.capacity);
        self.lock().entry(scope).or_default().push(tx);
        rx
    }

    pub fn subscriber_count(&self, scope: &Scope) -> usize {
        self.lock().get(scope).map(|s| s.len()).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Scope, Vec<async_channel::Sender<Event>>>> {
        // A poisoned map is still structurally valid.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventPublisher for EventHub {
    async fn publish(&self, event: Event) {
        let mut subscribers = self.lock();
        let Some(senders) = subscribers.get_mut(&event.scope) else {
            return;
        };

        senders.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(async_channel::TrySendError::Full(_)) => {
                debug!(scope = %event.scope, event = %event.event_name, "Subscriber lagging, event dropped");
                true
            }
            Err(async_channel::TrySendError::Closed(_)) => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_reach_matching_scope_only() {
        let hub = EventHub::new();
        let project = hub.subscribe(Scope::Project("p1".into()));
        let global = hub.subscribe(Scope::Global);

        hub.publish(Event::new(
            Scope::Project("p1".into()),
            EventName::TaskStarted,
            json!({"task": "x"}),
        ))
        .await;

        let received = project.recv().await.unwrap();
        assert_eq!(received.event_name, EventName::TaskStarted);
        assert_eq!(received.payload["task"], "x");
        assert!(global.is_empty());
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_pruned() {
        let hub = EventHub::new();
        let rx = hub.subscribe(Scope::Global);
        drop(rx);

        hub.publish(Event::new(Scope::Global, EventName::TaskCompleted, Value::Null))
            .await;
        assert_eq!(hub.subscriber_count(&Scope::Global), 0);
    }

    #[tokio::test]
    async fn test_full_subscriber_is_kept() {
        let hub = EventHub::with_capacity(1);
        let rx = hub.subscribe(Scope::Global);

        for _ in 0..3 {
            hub.publish(Event::new(Scope::Global, EventName::TaskFailed, Value::Null))
                .await;
        }

        assert_eq!(rx.len(), 1);
        assert_eq!(hub.subscriber_count(&Scope::Global), 1);
    }

    #[test]
    fn test_scope_from_project() {
        assert_eq!(Scope::from_project(None), Scope::Global);
        assert_eq!(
            Scope::from_project(Some("web")).to_string(),
            "project:web"
        );
    }

    #[test]
    fn test_event_wire_shape() {
        let event = Event::new(Scope::Global, EventName::WorkflowStepSkipped, json!({}));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventName"], "workflow_step_skipped");
        assert_eq!(json["scope"], "global");
    }
}
