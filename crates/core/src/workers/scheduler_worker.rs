use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::PlaybackClock,
    config::SchedulerConfig,
    events::{EnrichedEvent, EventBus, expect},
    planner::plan_segments,
    queues::QueueKind,
    scheduler::{QuizScheduler, SchedulerState},
    types::{QuizPrompt, SessionId},
    workers::{
        ContentPipelineFailed, PlanReady, PlaybackEnded, PlaybackSampled, QuizContentReady,
        QuizFinished, QuizScored, QuizShown, SessionFinished, SubscriptionSpec, VideoSelected,
        Worker,
    },
};

/// Sole owner of the [`QuizScheduler`]. Every sample, end-of-playback and
/// completion report for the current video is applied here, one at a time.
pub struct SchedulerWorker {
    scheduler: QuizScheduler,
    boundary_interval_secs: f64,
    finished_announced: bool,
}

impl SchedulerWorker {
    pub fn new(clock: Arc<dyn PlaybackClock>, config: &SchedulerConfig) -> Self {
        Self {
            scheduler: QuizScheduler::new(clock),
            boundary_interval_secs: config.boundary_interval_secs,
            finished_announced: false,
        }
    }

    fn show(&self, bus: &EventBus, parent: Uuid, prompt: Option<QuizPrompt>) {
        if let Some(prompt) = prompt {
            bus.publish(Arc::new(QuizShown::new(parent, prompt)));
        }
    }

    fn load_content(&mut self, ready: &QuizContentReady, parent: Uuid, bus: &EventBus) {
        let session = ready.header.session;
        let plan = match plan_segments(
            ready.duration,
            ready.content.len(),
            self.boundary_interval_secs,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(%session, error = %e, "cannot plan quizzes, giving up on this video");
                self.scheduler.abandon();
                return;
            }
        };

        bus.publish(Arc::new(PlanReady::new(
            session,
            parent,
            plan.clone(),
            ready.content.playable_count(),
        )));
        let prompt = self.scheduler.load_plan(plan, ready.content.clone());
        self.show(bus, parent, prompt);
    }

    fn finish(&mut self, finished: &QuizFinished, parent: Uuid, bus: &EventBus) {
        let Some(done) = self.scheduler.finish(finished.outcome) else {
            return;
        };

        bus.publish(Arc::new(QuizScored::new(
            done.session,
            parent,
            done.segment,
            done.outcome.correct_answers(),
        )));
        self.show(bus, parent, done.follow_up);
    }

    fn announce_if_done(&mut self, session: SessionId, parent: Uuid, bus: &EventBus) {
        if self.finished_announced || self.scheduler.state() != SchedulerState::Done {
            return;
        }
        self.finished_announced = true;

        let shown: Vec<_> = self.scheduler.shown().iter().copied().collect();
        info!(%session, shown = shown.len(), "no quizzes left for this video");
        bus.publish(Arc::new(SessionFinished::new(session, parent, shown)));
    }
}

#[async_trait]
impl Worker for SchedulerWorker {
    const SUBSCRIBER_ID: &'static str = "quiz.scheduler";

    fn subscription() -> SubscriptionSpec {
        let lifecycle = QueueKind::FifoDropOldest { capacity: 16 };

        SubscriptionSpec::new(Self::SUBSCRIBER_ID)
            .input(PlaybackSampled::EVENT_TYPE, QueueKind::Latest1)
            .input(VideoSelected::EVENT_TYPE, lifecycle)
            .input(QuizContentReady::EVENT_TYPE, lifecycle)
            .input(ContentPipelineFailed::EVENT_TYPE, lifecycle)
            .input(PlaybackEnded::EVENT_TYPE, lifecycle)
            .input(QuizFinished::EVENT_TYPE, lifecycle)
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let session = event.event.session();
        let parent = event.event.event_id();
        let event_type = event.event.event_type();

        if event_type == VideoSelected::EVENT_TYPE {
            self.scheduler.begin(session);
            self.finished_announced = false;
            return Ok(());
        }
        if !self.scheduler.is_current(session) {
            debug!(%session, event_type, "event for a replaced video, dropping");
            return Ok(());
        }

        match event_type {
            PlaybackSampled::EVENT_TYPE => {
                let sample = expect::<PlaybackSampled>(&event.event, PlaybackSampled::EVENT_TYPE)?;
                let prompt = self.scheduler.on_tick(sample.position);
                self.show(bus, parent, prompt);
            }
            PlaybackEnded::EVENT_TYPE => {
                let prompt = self.scheduler.on_ended();
                self.show(bus, parent, prompt);
            }
            QuizContentReady::EVENT_TYPE => {
                let ready = expect::<QuizContentReady>(&event.event, QuizContentReady::EVENT_TYPE)?;
                self.load_content(ready, parent, bus);
            }
            ContentPipelineFailed::EVENT_TYPE => {
                self.scheduler.abandon();
            }
            QuizFinished::EVENT_TYPE => {
                let finished = expect::<QuizFinished>(&event.event, QuizFinished::EVENT_TYPE)?;
                self.finish(finished, parent, bus);
            }
            other => anyhow::bail!("unexpected event_type={other}"),
        }

        self.announce_if_done(session, parent, bus);
        Ok(())
    }
}
