use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    events::{EnrichedEvent, EventBus, expect},
    queues::QueueKind,
    reward::RewardAccumulator,
    workers::{QuizScored, RewardAwarded, SubscriptionSpec, Worker},
};

/// Turns accepted scores into rewards. Store round-trips happen here, off the
/// scheduler's timeline.
pub struct RewardWorker {
    rewards: RewardAccumulator,
}

impl RewardWorker {
    pub fn new(rewards: RewardAccumulator) -> Self {
        Self { rewards }
    }
}

#[async_trait]
impl Worker for RewardWorker {
    const SUBSCRIBER_ID: &'static str = "reward.accumulator";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec::new(Self::SUBSCRIBER_ID).input(
            QuizScored::EVENT_TYPE,
            QueueKind::FifoDropOldest { capacity: 16 },
        )
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let scored = expect::<QuizScored>(&event.event, QuizScored::EVENT_TYPE)?;
        let award = self.rewards.award(scored.correct_answers).await;

        bus.publish(Arc::new(RewardAwarded::new(
            scored.header.session,
            scored.header.event_id,
            scored.segment,
            award.amount,
            award.total,
        )));
        Ok(())
    }
}
