use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    events::{EnrichedEvent, EventBus, downcast_ref},
    planner::SegmentPlan,
    queues::QueueKind,
    types::{QuizPrompt, SegmentIndex, SessionId},
    workers::{
        ContentPipelineFailed, PlanReady, QuizShown, RewardAwarded, SessionFinished,
        SubscriptionSpec, VideoSelected, Worker,
    },
};

/// What the host has to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "notice")]
pub enum SessionNotice {
    QuizzesReady {
        session: SessionId,
        plan: SegmentPlan,
        playable: usize,
    },
    NoQuizzes {
        session: SessionId,
        reason: String,
    },
    ShowQuiz(QuizPrompt),
    RewardEarned {
        session: SessionId,
        segment: SegmentIndex,
        amount: u32,
        total: Option<u64>,
    },
    Finished {
        session: SessionId,
        shown: Vec<SegmentIndex>,
    },
}

impl SessionNotice {
    pub fn session(&self) -> SessionId {
        match self {
            SessionNotice::QuizzesReady { session, .. }
            | SessionNotice::NoQuizzes { session, .. }
            | SessionNotice::RewardEarned { session, .. }
            | SessionNotice::Finished { session, .. } => *session,
            SessionNotice::ShowQuiz(prompt) => prompt.session,
        }
    }
}

/// Forwards outward-facing events for the current video to the host.
pub struct DisplaySinkWorker {
    notices: mpsc::Sender<SessionNotice>,
    current: Option<SessionId>,
}

impl DisplaySinkWorker {
    pub fn new(notices: mpsc::Sender<SessionNotice>) -> Self {
        Self {
            notices,
            current: None,
        }
    }

    fn notice_for(event: &EnrichedEvent) -> Option<SessionNotice> {
        let session = event.event.session();

        if let Some(ready) = downcast_ref::<PlanReady>(&event.event) {
            return Some(if ready.playable == 0 {
                SessionNotice::NoQuizzes {
                    session,
                    reason: "no playable quizzes were generated".into(),
                }
            } else {
                SessionNotice::QuizzesReady {
                    session,
                    plan: ready.plan.clone(),
                    playable: ready.playable,
                }
            });
        }
        if let Some(failed) = downcast_ref::<ContentPipelineFailed>(&event.event) {
            return Some(SessionNotice::NoQuizzes {
                session,
                reason: failed.message.clone(),
            });
        }
        if let Some(shown) = downcast_ref::<QuizShown>(&event.event) {
            return Some(SessionNotice::ShowQuiz(shown.prompt.clone()));
        }
        if let Some(awarded) = downcast_ref::<RewardAwarded>(&event.event) {
            return Some(SessionNotice::RewardEarned {
                session,
                segment: awarded.segment,
                amount: awarded.amount,
                total: awarded.total,
            });
        }
        if let Some(finished) = downcast_ref::<SessionFinished>(&event.event) {
            return Some(SessionNotice::Finished {
                session,
                shown: finished.shown.clone(),
            });
        }
        None
    }
}

#[async_trait]
impl Worker for DisplaySinkWorker {
    const SUBSCRIBER_ID: &'static str = "display.sink";

    fn subscription() -> SubscriptionSpec {
        let lifecycle = QueueKind::FifoDropOldest { capacity: 32 };

        SubscriptionSpec::new(Self::SUBSCRIBER_ID)
            .input(VideoSelected::EVENT_TYPE, lifecycle)
            .input(PlanReady::EVENT_TYPE, lifecycle)
            .input(ContentPipelineFailed::EVENT_TYPE, lifecycle)
            .input(QuizShown::EVENT_TYPE, lifecycle)
            .input(SessionFinished::EVENT_TYPE, lifecycle)
            .input(
                RewardAwarded::EVENT_TYPE,
                QueueKind::Isolated { output_buffer: 16 },
            )
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        let session = event.event.session();
        if event.event.event_type() == VideoSelected::EVENT_TYPE {
            self.current = Some(session);
            return Ok(());
        }
        if self.current != Some(session) {
            debug!(%session, "notice for a replaced video, dropping");
            return Ok(());
        }

        if let Some(notice) = Self::notice_for(&event) {
            if self.notices.send(notice).await.is_err() {
                debug!("host stopped listening for notices");
            }
        }
        Ok(())
    }
}
