use serde::Serialize;
use uuid::Uuid;

use super::{EventHeader, domain_event};
use crate::{
    planner::SegmentPlan,
    types::{QuizOutcome, QuizPrompt, SegmentIndex, SessionId},
};

/// Trigger times are known for the current video.
#[derive(Debug, Serialize)]
pub struct PlanReady {
    pub header: EventHeader,
    pub plan: SegmentPlan,
    pub playable: usize,
}

impl PlanReady {
    pub const EVENT_TYPE: &'static str = "quiz.plan_ready";

    pub fn new(session: SessionId, parent: Uuid, plan: SegmentPlan, playable: usize) -> Self {
        Self {
            header: EventHeader::new(session, Some(parent)),
            plan,
            playable,
        }
    }
}

domain_event!(PlanReady);

/// A quiz went on screen and playback is paused.
#[derive(Debug, Serialize)]
pub struct QuizShown {
    pub header: EventHeader,
    pub prompt: QuizPrompt,
}

impl QuizShown {
    pub const EVENT_TYPE: &'static str = "quiz.shown";

    pub fn new(parent: Uuid, prompt: QuizPrompt) -> Self {
        Self {
            header: EventHeader::new(prompt.session, Some(parent)),
            prompt,
        }
    }
}

domain_event!(QuizShown);

/// Host report that the quiz on screen was closed.
#[derive(Debug, Serialize)]
pub struct QuizFinished {
    pub header: EventHeader,
    pub outcome: QuizOutcome,
}

impl QuizFinished {
    pub const EVENT_TYPE: &'static str = "quiz.finished";

    pub fn new(session: SessionId, outcome: QuizOutcome) -> Self {
        Self {
            header: EventHeader::new(session, None),
            outcome,
        }
    }
}

domain_event!(QuizFinished);

/// The scheduler accepted a completion; the score is ready to be rewarded.
#[derive(Debug, Serialize)]
pub struct QuizScored {
    pub header: EventHeader,
    pub segment: SegmentIndex,
    pub correct_answers: u32,
}

impl QuizScored {
    pub const EVENT_TYPE: &'static str = "quiz.scored";

    pub fn new(session: SessionId, parent: Uuid, segment: SegmentIndex, correct_answers: u32) -> Self {
        Self {
            header: EventHeader::new(session, Some(parent)),
            segment,
            correct_answers,
        }
    }
}

domain_event!(QuizScored);

#[derive(Debug, Serialize)]
pub struct RewardAwarded {
    pub header: EventHeader,
    pub segment: SegmentIndex,
    pub amount: u32,
    /// Running total after this award; `None` if the store failed.
    pub total: Option<u64>,
}

impl RewardAwarded {
    pub const EVENT_TYPE: &'static str = "reward.awarded";

    pub fn new(
        session: SessionId,
        parent: Uuid,
        segment: SegmentIndex,
        amount: u32,
        total: Option<u64>,
    ) -> Self {
        Self {
            header: EventHeader::new(session, Some(parent)),
            segment,
            amount,
            total,
        }
    }
}

domain_event!(RewardAwarded);

/// Nothing is left to show for this video.
#[derive(Debug, Serialize)]
pub struct SessionFinished {
    pub header: EventHeader,
    pub shown: Vec<SegmentIndex>,
}

impl SessionFinished {
    pub const EVENT_TYPE: &'static str = "session.finished";

    pub fn new(session: SessionId, parent: Uuid, shown: Vec<SegmentIndex>) -> Self {
        Self {
            header: EventHeader::new(session, Some(parent)),
            shown,
        }
    }
}

domain_event!(SessionFinished);
