//! Batch runner
//!
//! Fires every request at once and waits for all of them. A failing request
//! never aborts the batch: executor failures keep their failed result and
//! requests that never reached an executor become a
//! [`FailureStub`](super::result::FailureStub).

use futures::future::join_all;
use serde_json::json;
use tracing::{info, instrument};

use super::dispatch::TaskDispatcher;
use super::error::TaskError;
use super::result::{BatchEntry, BatchReport};
use crate::events::EventName;
use crate::workflow::TaskRequest;

pub struct BatchRunner {
    dispatcher: TaskDispatcher,
}

impl BatchRunner {
    pub fn new(dispatcher: TaskDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Run all requests concurrently; entries line up with `requests`
    #[instrument(skip(self, requests), fields(batch_size = requests.len()))]
    pub async fn run_many(&self, requests: Vec<TaskRequest>) -> BatchReport {
        let futures = requests.into_iter().map(|request| {
            let agent_type = request.agent_type.clone();
            async move {
                match self.dispatcher.dispatch(request).await {
                    Ok(result) => BatchEntry::Result(result),
                    Err(TaskError::ExecutionFailed { result }) => BatchEntry::Result(*result),
                    Err(err) => BatchEntry::Stub(err.into_stub(&agent_type)),
                }
            }
        });

        let report = BatchReport::from_entries(join_all(futures).await);

        info!(
            total = report.total,
            successful = report.successful,
            failed = report.failed,
            "Batch finished"
        );

        self.dispatcher
            .emit(
                None,
                EventName::BatchCompleted,
                json!({
                    "total": report.total,
                    "successful": report.successful,
                    "failed": report.failed,
                }),
            )
            .await;

        report
    }
}
