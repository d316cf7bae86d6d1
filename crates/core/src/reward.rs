use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::Result;

/// External running total of earned rewards ("stars").
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RewardStore: Send + Sync {
    /// Add `amount` to the total and return the new total.
    async fn add_to_total(&self, amount: u32) -> Result<u64>;
}

#[derive(Debug, Default)]
pub struct InMemoryRewardStore {
    total: Mutex<u64>,
}

impl InMemoryRewardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn total(&self) -> u64 {
        *self.total.lock().await
    }
}

#[async_trait]
impl RewardStore for InMemoryRewardStore {
    async fn add_to_total(&self, amount: u32) -> Result<u64> {
        let mut total = self.total.lock().await;
        *total += u64::from(amount);
        Ok(*total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub amount: u32,
    /// New running total, if the store accepted the write.
    pub total: Option<u64>,
}

pub struct RewardAccumulator {
    store: Arc<dyn RewardStore>,
    points_per_correct_answer: u32,
}

impl RewardAccumulator {
    pub fn new(store: Arc<dyn RewardStore>, points_per_correct_answer: u32) -> Self {
        Self {
            store,
            points_per_correct_answer,
        }
    }

    pub fn points(&self, correct_answers: u32) -> u32 {
        correct_answers.saturating_mul(self.points_per_correct_answer)
    }

    /// Compute the reward and hand it to the store. A failing store is logged
    /// and otherwise ignored.
    pub async fn award(&self, correct_answers: u32) -> Award {
        let amount = self.points(correct_answers);

        match self.store.add_to_total(amount).await {
            Ok(total) => {
                info!(correct_answers, amount, total, "reward recorded");
                Award {
                    amount,
                    total: Some(total),
                }
            }
            Err(e) => {
                error!(correct_answers, amount, error = %e, "failed to record reward");
                Award {
                    amount,
                    total: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use rstest::rstest;

    use super::*;
    use crate::error::VidquizError;

    #[tokio::test]
    async fn award_hands_amount_to_store_once() {
        let mut store = MockRewardStore::new();
        store
            .expect_add_to_total()
            .with(eq(40))
            .times(1)
            .returning(|amount| Ok(u64::from(amount) + 100));

        let rewards = RewardAccumulator::new(Arc::new(store), 10);
        assert_eq!(
            rewards.award(4).await,
            Award {
                amount: 40,
                total: Some(140)
            }
        );
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let mut store = MockRewardStore::new();
        store.expect_add_to_total().times(1).returning(|_| {
            Err(VidquizError::RewardStore {
                reason: "offline".into(),
            })
        });

        let rewards = RewardAccumulator::new(Arc::new(store), 10);
        let award = rewards.award(3).await;
        assert_eq!(award.amount, 30);
        assert_eq!(award.total, None);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(2, 10, 20)]
    #[case(5, 3, 15)]
    #[case(u32::MAX, 10, u32::MAX)]
    fn points_per_answer(#[case] correct: u32, #[case] per: u32, #[case] expected: u32) {
        let rewards = RewardAccumulator::new(Arc::new(InMemoryRewardStore::new()), per);
        assert_eq!(rewards.points(correct), expected);
    }

    #[tokio::test]
    async fn in_memory_store_keeps_running_total() {
        let store = Arc::new(InMemoryRewardStore::new());
        let rewards = RewardAccumulator::new(store.clone(), 10);

        rewards.award(2).await;
        rewards.award(1).await;
        assert_eq!(store.total().await, 30);
    }
}
