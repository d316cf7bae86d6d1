use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{
    sync::{Mutex, broadcast, mpsc, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    clock::PlaybackClock,
    config::SchedulerConfig,
    events::{BusConfig, EventBus, EventBusBuilder},
    fetcher::{ContentFetcher, ContentService, FetchStatus},
    reward::{RewardAccumulator, RewardStore},
    types::{QuizOutcome, SessionId, VideoSource},
    workers::{
        ContentWorker, DisplaySinkWorker, DurationResolved, PlaybackEnded, PlaybackSampled,
        QuizFinished, RewardWorker, SchedulerWorker, SessionNotice, VideoSelected, Worker,
        WorkerWiring,
    },
};

const NOTICE_BUFFER: usize = 32;

struct ActiveVideo {
    source: VideoSource,
    cancel: CancellationToken,
    sampler: JoinHandle<()>,
}

impl ActiveVideo {
    fn stop(self) {
        self.cancel.cancel();
        self.sampler.abort();
    }
}

/// Host-facing controller for a quiz session over one video at a time.
///
/// Owns the event bus and its workers. The host drives playback through the
/// [`PlaybackClock`] it passed in, reports end-of-playback and quiz results
/// here, and renders the [`SessionNotice`]s it receives.
pub struct QuizSession {
    bus: Arc<EventBus>,
    clock: Arc<dyn PlaybackClock>,
    fetch_status: watch::Receiver<FetchStatus>,
    tick_interval: Duration,
    active: Mutex<Option<ActiveVideo>>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<JoinHandle<anyhow::Result<()>>>,
    drains: Vec<JoinHandle<()>>,
}

impl QuizSession {
    pub fn start(
        config: &SchedulerConfig,
        clock: Arc<dyn PlaybackClock>,
        service: Arc<dyn ContentService>,
        store: Arc<dyn RewardStore>,
    ) -> anyhow::Result<(Self, mpsc::Receiver<SessionNotice>)> {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let (notice_tx, notice_rx) = mpsc::channel(NOTICE_BUFFER);

        let (bus, mut wiring, tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(ContentWorker::subscription())
            .subscribe(SchedulerWorker::subscription())
            .subscribe(RewardWorker::subscription())
            .subscribe(DisplaySinkWorker::subscription())
            .build()
            .context("failed to wire event bus")?;
        let bus = Arc::new(bus);

        // Forwarders must drain before anything is published.
        let drains = tasks.spawn_all();

        let fetcher = ContentFetcher::new(service);
        let fetch_status = fetcher.subscribe();

        let workers = vec![
            spawn_worker(ContentWorker::new(fetcher), &mut wiring, &bus, &shutdown_tx)?,
            spawn_worker(
                SchedulerWorker::new(Arc::clone(&clock), config),
                &mut wiring,
                &bus,
                &shutdown_tx,
            )?,
            spawn_worker(
                RewardWorker::new(RewardAccumulator::new(
                    store,
                    config.points_per_correct_answer,
                )),
                &mut wiring,
                &bus,
                &shutdown_tx,
            )?,
            spawn_worker(
                DisplaySinkWorker::new(notice_tx),
                &mut wiring,
                &bus,
                &shutdown_tx,
            )?,
        ];

        let session = Self {
            bus,
            clock,
            fetch_status,
            tick_interval: config.tick_interval,
            active: Mutex::new(None),
            shutdown_tx,
            workers,
            drains,
        };
        Ok((session, notice_rx))
    }

    /// Switch to a new video. Sampling for the previous one stops before
    /// anything is published for the new session.
    pub async fn select_video(&self, url: impl Into<String>) -> SessionId {
        let source = VideoSource::new(url);
        let session = source.session;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!(session = %previous.source.session, "stopping sampler for replaced video");
            previous.stop();
        }

        info!(%session, url = %source.url, "video selected");
        self.bus
            .publish(Arc::new(VideoSelected::new(session, source.url.clone())));

        let cancel = CancellationToken::new();
        let sampler = tokio::spawn(sample_playback(
            session,
            Arc::clone(&self.clock),
            Arc::clone(&self.bus),
            self.tick_interval,
            cancel.clone(),
        ));
        *active = Some(ActiveVideo {
            source,
            cancel,
            sampler,
        });

        session
    }

    pub async fn current_session(&self) -> Option<SessionId> {
        self.active.lock().await.as_ref().map(|a| a.source.session)
    }

    /// Forward the player's end-of-playback notification.
    pub async fn playback_ended(&self) {
        if let Some(session) = self.current_session().await {
            self.bus.publish(Arc::new(PlaybackEnded::new(session)));
        }
    }

    pub async fn complete_quiz(&self, correct_answers: u32) {
        self.report(QuizOutcome::Completed { correct_answers }).await;
    }

    /// The quiz was closed early; answers given so far still count.
    pub async fn dismiss_quiz(&self, correct_answers: u32) {
        self.report(QuizOutcome::Dismissed { correct_answers }).await;
    }

    async fn report(&self, outcome: QuizOutcome) {
        match self.current_session().await {
            Some(session) => self
                .bus
                .publish(Arc::new(QuizFinished::new(session, outcome))),
            None => warn!(?outcome, "quiz result reported without a selected video"),
        }
    }

    /// Content pipeline state, for a "generating quizzes" indicator.
    pub fn fetch_state(&self) -> watch::Receiver<FetchStatus> {
        self.fetch_status.clone()
    }

    pub async fn shutdown(self) {
        if let Some(active) = self.active.lock().await.take() {
            active.stop();
        }

        let _ = self.shutdown_tx.send(());
        for worker in self.workers {
            match worker.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "worker stopped with an error"),
                Err(e) => warn!(error = %e, "worker task failed"),
            }
        }
        for drain in self.drains {
            drain.abort();
        }
        debug!("quiz session shut down");
    }
}

fn spawn_worker<W: Worker>(
    worker: W,
    wiring: &mut WorkerWiring,
    bus: &Arc<EventBus>,
    shutdown_tx: &broadcast::Sender<()>,
) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
    let inputs = wiring
        .take(W::SUBSCRIBER_ID)
        .with_context(|| format!("no inputs wired for subscriber_id={}", W::SUBSCRIBER_ID))?;

    Ok(tokio::spawn(worker.run(
        inputs,
        Arc::clone(bus),
        shutdown_tx.subscribe(),
    )))
}

/// Per-video sampling loop: one [`PlaybackSampled`] per tick, plus a single
/// [`DurationResolved`] once the player reports a usable duration.
async fn sample_playback(
    session: SessionId,
    clock: Arc<dyn PlaybackClock>,
    bus: Arc<EventBus>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut duration_reported = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !duration_reported {
                    if let Some(duration) = clock.duration() {
                        debug!(%session, duration, "duration resolved");
                        bus.publish(Arc::new(DurationResolved::new(session, duration)));
                        duration_reported = true;
                    }
                }
                bus.publish(Arc::new(PlaybackSampled::new(session, clock.current_position())));
            }
        }
    }
    debug!(%session, "sampler stopped");
}
