use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    events::{EnrichedEvent, EventBus, downcast_ref},
    fetcher::ContentFetcher,
    queues::QueueKind,
    types::SessionId,
    workers::{
        ContentPipelineFailed, DurationResolved, QuizContentReady, SubscriptionSpec, VideoSelected,
        Worker,
    },
};

struct ActiveVideo {
    session: SessionId,
    url: String,
    cancel: CancellationToken,
}

/// Starts the content pipeline once per video, as soon as its duration is
/// known. Selecting another video cancels whatever is still in flight.
pub struct ContentWorker {
    fetcher: ContentFetcher,
    active: Option<ActiveVideo>,
}

impl ContentWorker {
    pub fn new(fetcher: ContentFetcher) -> Self {
        Self {
            fetcher,
            active: None,
        }
    }

    fn select(&mut self, selected: &VideoSelected) {
        if let Some(previous) = self.active.take() {
            debug!(session = %previous.session, "cancelling content pipeline for replaced video");
            previous.cancel.cancel();
        }

        let session = selected.header.session;
        self.fetcher.attach(session);
        self.active = Some(ActiveVideo {
            session,
            url: selected.url.clone(),
            cancel: CancellationToken::new(),
        });
    }

    fn start(&self, resolved: &DurationResolved, bus: &EventBus) {
        let session = resolved.header.session;
        let Some(active) = self.active.as_ref().filter(|a| a.session == session) else {
            debug!(%session, "duration for a replaced video, ignoring");
            return;
        };
        if !self.fetcher.try_begin(session) {
            debug!(%session, "content pipeline already started");
            return;
        }

        let fetcher = self.fetcher.clone();
        let bus = bus.clone();
        let url = active.url.clone();
        let cancel = active.cancel.clone();
        let parent = resolved.header.event_id;
        let duration = resolved.duration;

        tokio::spawn(async move {
            match fetcher.run(session, &url, duration, &cancel).await {
                None => debug!(%session, "content pipeline result discarded"),
                Some(Ok(content)) => {
                    bus.publish(Arc::new(QuizContentReady::new(
                        session, parent, duration, content,
                    )));
                }
                Some(Err(e)) => {
                    warn!(%session, url = %url, error = %e, "content pipeline failed");
                    bus.publish(Arc::new(ContentPipelineFailed::new(
                        session,
                        parent,
                        e.to_string(),
                    )));
                }
            }
        });
    }
}

#[async_trait]
impl Worker for ContentWorker {
    const SUBSCRIBER_ID: &'static str = "content.fetcher";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec::new(Self::SUBSCRIBER_ID)
            .input(
                VideoSelected::EVENT_TYPE,
                QueueKind::FifoDropOldest { capacity: 8 },
            )
            .input(
                DurationResolved::EVENT_TYPE,
                QueueKind::FifoDropOldest { capacity: 8 },
            )
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        if let Some(selected) = downcast_ref::<VideoSelected>(&event.event) {
            self.select(selected);
        } else if let Some(resolved) = downcast_ref::<DurationResolved>(&event.event) {
            self.start(resolved, bus);
        }
        Ok(())
    }
}
