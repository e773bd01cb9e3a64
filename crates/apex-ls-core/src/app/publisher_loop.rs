//! QueueStatePublisher - pushes `apex/queueStateChanged` to the client.
//!
//! # Flow
//! 1. Tick every `interval`
//! 2. Skip the tick if no counter moved since the last push
//! 3. Build the report and send it as a notification
//! 4. Stop when the scheduler shuts down

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::scheduler::PriorityRequestScheduler;
use crate::error::ClientError;
use crate::observability::QueueStateParams;
use crate::ports::ClientConnection;
use crate::ports::client::QUEUE_STATE_CHANGED;

pub struct QueueStatePublisher {
    scheduler: Arc<PriorityRequestScheduler>,
    client: Arc<dyn ClientConnection>,
    interval: Duration,
    params: QueueStateParams,
}

impl QueueStatePublisher {
    pub fn new(
        scheduler: Arc<PriorityRequestScheduler>,
        client: Arc<dyn ClientConnection>,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            client,
            interval,
            params: QueueStateParams::default(),
        }
    }

    pub fn with_params(mut self, params: QueueStateParams) -> Self {
        self.params = params;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let mut shutdown_rx = self.scheduler.subscribe_shutdown();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_generation = None;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let generation = self.scheduler.stats_generation();
            if last_generation == Some(generation) {
                continue;
            }

            match self.publish_once().await {
                Ok(()) => last_generation = Some(generation),
                Err(ClientError::Closed) => {
                    tracing::debug!("client gone, queue state publisher stopping");
                    break;
                }
                Err(err) => tracing::warn!(error = %err, "queue state notification failed"),
            }
        }
    }

    /// Build and send one report.
    pub async fn publish_once(&self) -> Result<(), ClientError> {
        let report = self.scheduler.queue_state(&self.params);
        let params = serde_json::to_value(report).map_err(|e| ClientError::Rejected {
            method: QUEUE_STATE_CHANGED.to_string(),
            message: e.to_string(),
        })?;
        self.client
            .send_notification(QUEUE_STATE_CHANGED, params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SchedulerBuilder;
    use crate::domain::RequestType;
    use crate::registry::PolicyOverrides;
    use crate::test_support::{FnHandler, RecordingClient};
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn publishes_only_when_counters_move() {
        let scheduler = SchedulerBuilder::new()
            .register(
                Arc::new(FnHandler::ok(RequestType::Hover, json!("ok"))),
                PolicyOverrides::none(),
            )
            .build()
            .unwrap();
        let client = Arc::new(RecordingClient::replying(json!(null)));
        let handle = QueueStatePublisher::new(
            Arc::clone(&scheduler),
            client.clone(),
            Duration::from_millis(100),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(client.notifications().len(), 1, "idle ticks are skipped");

        scheduler
            .submit(RequestType::Hover, json!({}), PolicyOverrides::none())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let sent = client.notifications();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, QUEUE_STATE_CHANGED);
        assert_eq!(sent[1].1["metrics"]["totalProcessed"], json!(1));

        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("publisher stops on shutdown")
            .unwrap();
    }
}
