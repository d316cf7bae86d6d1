use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::{
    events::{EnrichedEvent, EventBus},
    workers::{SubscriptionSpec, WorkerBatch, WorkerInputs},
};

#[async_trait]
pub trait Worker: Send + Sized + 'static {
    const SUBSCRIBER_ID: &'static str;

    fn subscription() -> SubscriptionSpec;

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> Result<()>;

    /// Handle batches until `shutdown` fires. A failing `handle` is logged and
    /// the loop keeps going.
    async fn run(
        mut self,
        mut inputs: WorkerInputs,
        bus: Arc<EventBus>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            let batch = tokio::select! {
                _ = shutdown.recv() => {
                    debug!(worker = Self::SUBSCRIBER_ID, "shutting down");
                    return Ok(());
                }
                batch = inputs.next() => batch,
            };

            let events = match batch {
                WorkerBatch::Snapshots(updates) => updates.into_iter().map(|u| u.event).collect(),
                WorkerBatch::FifoItem { event, .. } => vec![event],
            };

            for event in events {
                let event_type = event.event.event_type();
                if let Err(e) = self.handle(event, &bus).await {
                    error!(
                        worker = Self::SUBSCRIBER_ID,
                        event_type,
                        error = %e,
                        "failed to handle event"
                    );
                }
            }
        }
    }
}
