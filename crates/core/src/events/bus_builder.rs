use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Result;
use tokio::sync::Notify;
use tracing::warn;

use crate::{
    events::{EnrichedEvent, EventBus},
    queues::{FifoDropOldestQueue, IsolatedForwarder, Latest1Queue, QueueKind, StartupTasks},
    routes::{Route, RouteInbox, Routes},
    workers::{
        FifoInput, FifoReceiver, Latest1Input, SubscriptionSpec, WorkerInputs, WorkerWiring,
    },
};

#[derive(Debug, Clone, Copy, Default)]
pub struct BusConfig {
    /// Panic on events nobody subscribed to. Meant for tests.
    pub strict_routing: bool,
}

#[derive(Debug, Default)]
pub struct BusMetrics {
    pub unrouted_publish_total: AtomicU64,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unrouted(&self, event_type: &'static str) {
        self.unrouted_publish_total.fetch_add(1, Ordering::Relaxed);
        warn!(event_type, "published event has no subscribers");
    }

    pub fn unrouted(&self) -> u64 {
        self.unrouted_publish_total.load(Ordering::Relaxed)
    }
}

fn validate(subs: &[SubscriptionSpec]) -> Result<()> {
    let mut seen_subscribers: HashSet<&'static str> = HashSet::new();
    for s in subs {
        if s.subscriber_id.trim().is_empty() {
            anyhow::bail!("empty subscriber_id");
        }
        if !seen_subscribers.insert(s.subscriber_id) {
            anyhow::bail!("duplicate subscriber_id={}", s.subscriber_id);
        }
        if s.inputs.is_empty() {
            anyhow::bail!("subscriber_id={} has no inputs", s.subscriber_id);
        }

        let mut seen_inputs: HashSet<&'static str> = HashSet::new();
        for i in &s.inputs {
            if i.event_type.trim().is_empty() {
                anyhow::bail!("subscriber_id={} has empty event_type", s.subscriber_id);
            }
            if !seen_inputs.insert(i.event_type) {
                anyhow::bail!(
                    "subscriber_id={} has duplicate input event_type={}",
                    s.subscriber_id,
                    i.event_type
                );
            }
            i.queue_kind.validate().map_err(|e| {
                anyhow::anyhow!(
                    "subscriber_id={} event_type={}: {e}",
                    s.subscriber_id,
                    i.event_type
                )
            })?;
        }
    }
    Ok(())
}

pub struct EventBusBuilder {
    cfg: BusConfig,
    subs: Vec<SubscriptionSpec>,
}

impl EventBusBuilder {
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            subs: Vec::new(),
        }
    }

    pub fn subscribe(mut self, s: SubscriptionSpec) -> Self {
        self.subs.push(s);
        self
    }

    pub fn build(self) -> Result<(EventBus, WorkerWiring, StartupTasks)> {
        validate(&self.subs)?;

        let mut routes: HashMap<&'static str, Vec<Route>> = HashMap::new();
        let mut wiring: HashMap<&'static str, WorkerInputs> = HashMap::new();
        let mut tasks = StartupTasks::default();
        let metrics = Arc::new(BusMetrics::new());

        for spec in self.subs {
            let notify_any = Arc::new(Notify::new());
            let mut latest = Vec::new();
            let mut fifos = Vec::new();

            for input in spec.inputs {
                let drops_total = Arc::new(AtomicU64::new(0));

                let inbox = match input.queue_kind {
                    QueueKind::Latest1 => {
                        let q = Arc::new(Latest1Queue::new(Arc::clone(&notify_any)));
                        latest.push(Latest1Input {
                            event_type: input.event_type,
                            queue: Arc::clone(&q),
                        });
                        RouteInbox::Latest1(q)
                    }
                    QueueKind::FifoDropOldest { capacity } => {
                        let q =
                            Arc::new(FifoDropOldestQueue::new(capacity, Arc::clone(&notify_any)));
                        fifos.push(FifoInput::new(
                            input.event_type,
                            FifoReceiver::FifoDropOldest(q.receiver()),
                        ));
                        RouteInbox::FifoDropOldest(q)
                    }
                    QueueKind::Isolated { output_buffer } => {
                        let (fwd, out_rx, drain_task) =
                            IsolatedForwarder::<Arc<EnrichedEvent>>::new(
                                output_buffer,
                                Arc::clone(&notify_any),
                            );
                        tasks.tokio.push(drain_task);
                        fifos.push(FifoInput::new(
                            input.event_type,
                            FifoReceiver::Isolated(out_rx),
                        ));
                        RouteInbox::Isolated(fwd)
                    }
                };

                routes.entry(input.event_type).or_default().push(Route {
                    subscriber_id: spec.subscriber_id,
                    inbox,
                    drops_total,
                });
            }

            wiring.insert(
                spec.subscriber_id,
                WorkerInputs::new(latest, fifos, notify_any),
            );
        }

        let bus = EventBus::new(self.cfg, Routes { table: routes }, metrics);
        Ok((bus, WorkerWiring::new(wiring), tasks))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::workers::InputSpec;

    fn spec(subscriber_id: &'static str, inputs: &[(&'static str, QueueKind)]) -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id,
            inputs: inputs
                .iter()
                .map(|&(event_type, queue_kind)| InputSpec {
                    event_type,
                    queue_kind,
                })
                .collect(),
        }
    }

    #[rstest]
    #[case::empty_subscriber(vec![spec(" ", &[("a", QueueKind::Latest1)])])]
    #[case::duplicate_subscriber(vec![
        spec("w", &[("a", QueueKind::Latest1)]),
        spec("w", &[("b", QueueKind::Latest1)]),
    ])]
    #[case::no_inputs(vec![spec("w", &[])])]
    #[case::duplicate_input(vec![spec("w", &[("a", QueueKind::Latest1), ("a", QueueKind::Latest1)])])]
    #[case::zero_capacity(vec![spec("w", &[("a", QueueKind::FifoDropOldest { capacity: 0 })])])]
    #[case::zero_buffer(vec![spec("w", &[("a", QueueKind::Isolated { output_buffer: 0 })])])]
    fn rejects_bad_subscriptions(#[case] subs: Vec<SubscriptionSpec>) {
        assert!(validate(&subs).is_err());
    }

    #[tokio::test]
    async fn build_hands_out_inputs_once_per_subscriber() {
        let (_bus, mut wiring, tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(spec(
                "w",
                &[
                    ("a", QueueKind::Latest1),
                    ("b", QueueKind::Isolated { output_buffer: 4 }),
                ],
            ))
            .build()
            .unwrap();

        assert_eq!(tasks.tokio.len(), 1);
        assert!(wiring.take("w").is_some());
        assert!(wiring.take("w").is_none());
    }
}
