use std::{collections::BTreeSet, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    clock::PlaybackClock,
    planner::{SegmentPlan, Trigger},
    types::{QuizContentSet, QuizOutcome, QuizPrompt, SegmentIndex, SessionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SchedulerState {
    /// No plan yet for the current video.
    Idle,
    /// Plan loaded, sampling the clock.
    Armed,
    /// One quiz on screen, clock paused.
    QuizActive { segment: SegmentIndex },
    /// Nothing left to fire for this video.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    NoSession,
    QuizActive,
    AlreadyShown,
    NotPlayable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    Fired(QuizPrompt),
    Suppressed(SuppressReason),
}

impl FireOutcome {
    pub fn into_prompt(self) -> Option<QuizPrompt> {
        match self {
            FireOutcome::Fired(prompt) => Some(prompt),
            FireOutcome::Suppressed(_) => None,
        }
    }
}

/// Result of taking a quiz off the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub session: SessionId,
    pub segment: SegmentIndex,
    pub outcome: QuizOutcome,
    /// Set when playback ended while the quiz was up and the final quiz is due now.
    pub follow_up: Option<QuizPrompt>,
    pub state: SchedulerState,
}

/// Decides when each segment's quiz is shown for one video at a time.
///
/// Every transition happens through `&mut self`, so the owner serializes
/// sampling, end-of-playback, and completion reports. The scheduler is the
/// only caller of [`PlaybackClock::pause`] and [`PlaybackClock::resume`].
pub struct QuizScheduler {
    clock: Arc<dyn PlaybackClock>,
    session: Option<SessionId>,
    state: SchedulerState,
    plan: SegmentPlan,
    content: QuizContentSet,
    shown: BTreeSet<SegmentIndex>,
    /// Next plan entry not yet fired or skipped.
    cursor: usize,
    playback_ended: bool,
}

impl QuizScheduler {
    pub fn new(clock: Arc<dyn PlaybackClock>) -> Self {
        Self {
            clock,
            session: None,
            state: SchedulerState::Idle,
            plan: SegmentPlan::default(),
            content: QuizContentSet::empty(),
            shown: BTreeSet::new(),
            cursor: 0,
            playback_ended: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn shown(&self) -> &BTreeSet<SegmentIndex> {
        &self.shown
    }

    pub fn plan(&self) -> &SegmentPlan {
        &self.plan
    }

    pub fn is_current(&self, session: SessionId) -> bool {
        self.session == Some(session)
    }

    /// Drop all state for the previous video and start tracking `session`.
    pub fn begin(&mut self, session: SessionId) {
        self.reset();
        self.session = Some(session);
        info!(%session, "scheduler waiting for quiz content");
    }

    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(%session, state = ?self.state, "scheduler reset");
        }
        self.state = SchedulerState::Idle;
        self.plan = SegmentPlan::default();
        self.content = QuizContentSet::empty();
        self.shown.clear();
        self.cursor = 0;
        self.playback_ended = false;
    }

    /// Install the plan for the current video. If playback already ended, the
    /// end-of-playback quiz is returned right away.
    pub fn load_plan(&mut self, plan: SegmentPlan, content: QuizContentSet) -> Option<QuizPrompt> {
        let Some(session) = self.session else {
            warn!("plan delivered without an active session, ignoring");
            return None;
        };
        if self.state != SchedulerState::Idle {
            warn!(%session, state = ?self.state, "plan already loaded, ignoring");
            return None;
        }

        info!(
            %session,
            segments = plan.len(),
            playable = content.playable_count(),
            "segment plan loaded"
        );
        self.plan = plan;
        self.content = content;
        self.cursor = 0;
        self.state = SchedulerState::Armed;

        if self.playback_ended {
            if let Some(prompt) = self.fire_end_of_playback() {
                return Some(prompt);
            }
        }
        self.settle();
        None
    }

    /// No content will arrive for this video.
    pub fn abandon(&mut self) {
        if self.state == SchedulerState::Idle {
            info!(session = ?self.session, "no quizzes for this video");
            self.state = SchedulerState::Done;
        }
    }

    /// Compare a sampled position against the next numeric trigger. Fires at
    /// most one segment per sample.
    pub fn on_tick(&mut self, position: f64) -> Option<QuizPrompt> {
        if self.state != SchedulerState::Armed {
            return None;
        }
        self.settle();

        let entry = *self.plan.get(self.cursor)?;
        match entry.trigger {
            Trigger::At(at) if position >= at => {
                debug!(segment = entry.segment, position, at, "trigger crossed");
                self.cursor += 1;
                self.fire(entry.segment).into_prompt()
            }
            _ => None,
        }
    }

    /// End-of-playback: fire the final segment. Numeric segments that were
    /// never reached are dropped.
    pub fn on_ended(&mut self) -> Option<QuizPrompt> {
        if self.playback_ended {
            debug!("duplicate end-of-playback notification");
            return None;
        }
        self.playback_ended = true;

        match self.state {
            SchedulerState::Armed => {
                let prompt = self.fire_end_of_playback();
                if prompt.is_none() {
                    self.settle();
                }
                prompt
            }
            // Idle: remembered until the plan arrives. QuizActive: handled on finish.
            _ => None,
        }
    }

    /// Show `segment` now, unless a quiz is already up or it was shown before.
    pub fn fire(&mut self, segment: SegmentIndex) -> FireOutcome {
        let outcome = self.try_fire(segment);
        if let FireOutcome::Suppressed(reason) = &outcome {
            debug!(segment, ?reason, "fire suppressed");
        }
        outcome
    }

    fn try_fire(&mut self, segment: SegmentIndex) -> FireOutcome {
        let Some(session) = self.session else {
            return FireOutcome::Suppressed(SuppressReason::NoSession);
        };
        if matches!(self.state, SchedulerState::QuizActive { .. }) {
            return FireOutcome::Suppressed(SuppressReason::QuizActive);
        }
        if self.shown.contains(&segment) {
            return FireOutcome::Suppressed(SuppressReason::AlreadyShown);
        }
        let Some(quiz) = self.content.get(segment) else {
            return FireOutcome::Suppressed(SuppressReason::NotPlayable);
        };
        let questions = quiz.questions.clone();

        if !self.clock.is_paused() {
            self.clock.pause();
        }
        self.shown.insert(segment);
        self.state = SchedulerState::QuizActive { segment };
        info!(%session, segment, questions = questions.len(), "quiz fired");

        FireOutcome::Fired(QuizPrompt {
            session,
            segment,
            questions,
        })
    }

    /// The display surface is done with the active quiz, completed or dismissed.
    pub fn finish(&mut self, outcome: QuizOutcome) -> Option<Finished> {
        let SchedulerState::QuizActive { segment } = self.state else {
            debug!(state = ?self.state, "finish without an active quiz, ignoring");
            return None;
        };
        let session = self.session?;

        self.state = SchedulerState::Armed;
        let follow_up = if self.playback_ended {
            self.fire_end_of_playback()
        } else {
            None
        };
        if follow_up.is_none() {
            self.clock.resume();
            self.settle();
        }

        info!(
            %session,
            segment,
            correct = outcome.correct_answers(),
            dismissed = outcome.was_dismissed(),
            state = ?self.state,
            "quiz finished"
        );

        Some(Finished {
            session,
            segment,
            outcome,
            follow_up,
            state: self.state,
        })
    }

    fn fire_end_of_playback(&mut self) -> Option<QuizPrompt> {
        if self.cursor >= self.plan.len() {
            return None;
        }
        let last = *self.plan.last()?;
        debug_assert_eq!(last.trigger, Trigger::EndOfPlayback);

        for skipped in &self.plan.entries()[self.cursor..self.plan.len() - 1] {
            debug!(segment = skipped.segment, "trigger never reached before end of playback");
        }
        self.cursor = self.plan.len();
        self.fire(last.segment).into_prompt()
    }

    /// Skip entries without a playable quiz; move to `Done` once nothing is left.
    fn settle(&mut self) {
        if self.state != SchedulerState::Armed {
            return;
        }
        while let Some(entry) = self.plan.get(self.cursor) {
            if self.content.is_playable(entry.segment) {
                break;
            }
            warn!(segment = entry.segment, "segment has no playable quiz, skipping");
            self.cursor += 1;
        }
        if self.cursor >= self.plan.len() {
            info!(session = ?self.session, shown = self.shown.len(), "all segments consumed");
            self.state = SchedulerState::Done;
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        clock::SimulatedClock,
        planner::plan_segments,
        types::{Question, SegmentQuiz},
    };

    fn quiz(tag: &str) -> SegmentQuiz {
        SegmentQuiz {
            questions: vec![Question {
                question: format!("What happened in {tag}?"),
                options: vec!["A. this".into(), "B. that".into()],
                correct_answer: "A".into(),
                explanation: String::new(),
            }],
        }
    }

    fn content(n: usize) -> QuizContentSet {
        (0..n).map(|i| quiz(&format!("segment {i}"))).collect()
    }

    struct Harness {
        clock: Arc<SimulatedClock>,
        scheduler: QuizScheduler,
    }

    impl Harness {
        fn armed(duration: f64, content: QuizContentSet) -> Self {
            let mut h = new_harness();
            let plan = plan_segments(duration, content.len(), 600.0).unwrap();
            assert!(h.scheduler.load_plan(plan, content).is_none());
            h
        }

        fn complete(&mut self, correct_answers: u32) -> Finished {
            self.scheduler
                .finish(QuizOutcome::Completed { correct_answers })
                .expect("a quiz was active")
        }
    }

    fn new_harness() -> Harness {
        let clock = Arc::new(SimulatedClock::with_duration(1250.0));
        let mut scheduler = QuizScheduler::new(clock.clone());
        scheduler.begin(SessionId::new());
        Harness { clock, scheduler }
    }

    #[fixture]
    fn harness() -> Harness {
        new_harness()
    }

    #[test]
    fn full_session_walks_every_segment() {
        let mut h = Harness::armed(1250.0, content(3));
        assert_eq!(h.scheduler.state(), SchedulerState::Armed);

        assert!(h.scheduler.on_tick(300.0).is_none());

        let first = h.scheduler.on_tick(605.0).expect("segment 0 fires");
        assert_eq!(first.segment, 0);
        assert!(h.clock.is_paused());
        assert_eq!(h.scheduler.state(), SchedulerState::QuizActive { segment: 0 });

        assert!(h.scheduler.on_tick(605.0).is_none(), "no fire while active");

        let done = h.complete(2);
        assert_eq!((done.segment, done.outcome.correct_answers()), (0, 2));
        assert_eq!(done.state, SchedulerState::Armed);
        assert!(!h.clock.is_paused());

        assert_eq!(h.scheduler.on_tick(1205.0).unwrap().segment, 1);
        h.complete(1);

        assert!(h.scheduler.on_tick(1249.0).is_none(), "last segment waits for the end");
        assert_eq!(h.scheduler.on_ended().unwrap().segment, 2);
        let last = h.complete(3);

        assert_eq!(last.state, SchedulerState::Done);
        assert_eq!(h.scheduler.shown().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(h.clock.pause_calls(), 3);
        assert_eq!(h.clock.resume_calls(), 3);
    }

    #[rstest]
    fn firing_twice_is_suppressed(mut harness: Harness) {
        let plan = plan_segments(1250.0, 3, 600.0).unwrap();
        harness.scheduler.load_plan(plan, content(3));

        assert!(matches!(harness.scheduler.fire(1), FireOutcome::Fired(_)));
        assert_eq!(
            harness.scheduler.fire(1),
            FireOutcome::Suppressed(SuppressReason::QuizActive)
        );
        assert_eq!(harness.scheduler.shown().len(), 1);
        assert_eq!(harness.clock.pause_calls(), 1);

        harness.complete(0);
        assert_eq!(
            harness.scheduler.fire(1),
            FireOutcome::Suppressed(SuppressReason::AlreadyShown)
        );
    }

    #[test]
    fn one_fire_per_sample_when_many_triggers_crossed() {
        let mut h = Harness::armed(3000.0, content(4));

        assert_eq!(h.scheduler.on_tick(1900.0).unwrap().segment, 0);
        h.complete(0);
        assert_eq!(h.scheduler.on_tick(1900.0).unwrap().segment, 1);
        h.complete(0);
        assert_eq!(h.scheduler.on_tick(1900.0).unwrap().segment, 2);
        h.complete(0);
        assert!(h.scheduler.on_tick(1900.0).is_none());
    }

    #[test]
    fn end_of_playback_skips_unreached_boundaries() {
        let mut h = Harness::armed(900.0, content(3));

        assert_eq!(h.scheduler.on_tick(600.0).unwrap().segment, 0);
        h.complete(1);
        assert!(h.scheduler.on_tick(899.0).is_none());

        assert_eq!(h.scheduler.on_ended().unwrap().segment, 2);
        assert_eq!(h.complete(1).state, SchedulerState::Done);

        assert!(!h.scheduler.shown().contains(&1));
        assert!(h.scheduler.on_tick(1300.0).is_none());
        assert!(h.scheduler.on_ended().is_none());
    }

    #[test]
    fn malformed_segments_never_fire() {
        let mut h = Harness::armed(
            1250.0,
            QuizContentSet::new(vec![Some(quiz("a")), None, Some(quiz("c"))]),
        );

        assert_eq!(h.scheduler.on_tick(600.0).unwrap().segment, 0);
        h.complete(1);
        assert!(h.scheduler.on_tick(1210.0).is_none());
        assert_eq!(h.scheduler.on_ended().unwrap().segment, 2);
        h.complete(1);

        assert_eq!(h.scheduler.state(), SchedulerState::Done);
        assert!(!h.scheduler.shown().contains(&1));
    }

    #[test]
    fn malformed_final_segment_finishes_after_last_numeric() {
        let mut h = Harness::armed(
            1250.0,
            QuizContentSet::new(vec![Some(quiz("a")), None]),
        );
        assert_eq!(h.scheduler.on_tick(601.0).unwrap().segment, 0);
        assert_eq!(h.complete(2).state, SchedulerState::Done);
        assert!(h.scheduler.on_ended().is_none());
    }

    #[rstest]
    fn empty_content_means_no_quizzes(mut harness: Harness) {
        let plan = plan_segments(1250.0, 0, 600.0).unwrap();
        assert!(harness.scheduler.load_plan(plan, QuizContentSet::empty()).is_none());
        assert_eq!(harness.scheduler.state(), SchedulerState::Done);
        assert!(harness.scheduler.on_tick(5000.0).is_none());
        assert!(harness.scheduler.on_ended().is_none());
        assert_eq!(harness.clock.pause_calls(), 0);
    }

    #[rstest]
    fn pipeline_failure_leaves_playback_alone(mut harness: Harness) {
        harness.scheduler.abandon();
        assert_eq!(harness.scheduler.state(), SchedulerState::Done);
        assert!(harness.scheduler.on_tick(700.0).is_none());
        assert!(harness.scheduler.on_ended().is_none());
        assert_eq!(harness.clock.pause_calls(), 0);
    }

    #[rstest]
    fn end_before_content_fires_final_quiz_on_arrival(mut harness: Harness) {
        assert!(harness.scheduler.on_ended().is_none());

        let plan = plan_segments(1250.0, 3, 600.0).unwrap();
        let prompt = harness.scheduler.load_plan(plan, content(3)).unwrap();

        assert_eq!(prompt.segment, 2);
        assert_eq!(harness.complete(0).state, SchedulerState::Done);
    }

    #[test]
    fn end_during_quiz_chains_final_quiz_without_resuming() {
        let mut h = Harness::armed(1250.0, content(3));
        assert_eq!(h.scheduler.on_tick(1200.0).unwrap().segment, 0);
        assert!(h.scheduler.on_ended().is_none());

        let finished = h.complete(2);
        assert_eq!(finished.segment, 0);
        assert_eq!(finished.follow_up.as_ref().map(|p| p.segment), Some(2));
        assert_eq!(finished.state, SchedulerState::QuizActive { segment: 2 });
        assert_eq!(h.clock.resume_calls(), 0);
        assert_eq!(h.clock.pause_calls(), 1);

        assert_eq!(h.complete(1).state, SchedulerState::Done);
        assert_eq!(h.clock.resume_calls(), 1);
    }

    #[test]
    fn dismissal_advances_like_completion() {
        let mut h = Harness::armed(1250.0, content(2));
        h.scheduler.on_tick(600.0).unwrap();

        let finished = h
            .scheduler
            .finish(QuizOutcome::Dismissed { correct_answers: 1 })
            .unwrap();

        assert_eq!(finished.outcome.correct_answers(), 1);
        assert_eq!(finished.state, SchedulerState::Armed);
        assert!(!h.clock.is_paused());
    }

    #[rstest]
    fn finish_without_active_quiz_is_ignored(mut harness: Harness) {
        assert!(
            harness
                .scheduler
                .finish(QuizOutcome::Completed { correct_answers: 4 })
                .is_none()
        );
        assert_eq!(harness.clock.resume_calls(), 0);
    }

    #[test]
    fn begin_discards_previous_video() {
        let mut h = Harness::armed(1250.0, content(3));
        h.scheduler.on_tick(650.0).unwrap();

        let next = SessionId::new();
        h.scheduler.begin(next);

        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
        assert!(h.scheduler.shown().is_empty());
        assert!(h.scheduler.plan().is_empty());
        assert!(h.scheduler.is_current(next));
        assert!(h.scheduler.on_tick(650.0).is_none());
    }

    #[rstest]
    fn plan_is_loaded_once(mut harness: Harness) {
        let plan = plan_segments(1250.0, 2, 600.0).unwrap();
        harness.scheduler.load_plan(plan.clone(), content(2));
        harness.scheduler.on_tick(600.0).unwrap();

        assert!(harness.scheduler.load_plan(plan, content(2)).is_none());
        assert_eq!(harness.scheduler.state(), SchedulerState::QuizActive { segment: 0 });
    }
}
