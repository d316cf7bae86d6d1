use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::{
    events::EnrichedEvent,
    queues::{FifoDropOldestReceiver, Latest1Queue},
};

pub struct Latest1Input {
    pub event_type: &'static str,
    pub queue: Arc<Latest1Queue<Arc<EnrichedEvent>>>,
}

pub enum FifoReceiver {
    FifoDropOldest(FifoDropOldestReceiver<Arc<EnrichedEvent>>),
    Isolated(mpsc::Receiver<Arc<EnrichedEvent>>),
}

impl FifoReceiver {
    fn try_recv(&mut self) -> Option<Arc<EnrichedEvent>> {
        match self {
            FifoReceiver::FifoDropOldest(r) => r.try_recv(),
            FifoReceiver::Isolated(r) => r.try_recv().ok(),
        }
    }
}

pub struct FifoInput {
    pub event_type: &'static str,
    receiver: FifoReceiver,
    /// Head item pulled off the receiver but not yet handed out.
    pending: Option<Arc<EnrichedEvent>>,
}

impl FifoInput {
    pub fn new(event_type: &'static str, receiver: FifoReceiver) -> Self {
        Self {
            event_type,
            receiver,
            pending: None,
        }
    }

    fn peek_seq(&mut self) -> Option<u64> {
        if self.pending.is_none() {
            self.pending = self.receiver.try_recv();
        }
        self.pending.as_ref().map(|e| e.ingest_seq)
    }
}

pub struct WorkerInputs {
    latest: Vec<Latest1Input>,
    fifos: Vec<FifoInput>,
    notify_any: Arc<Notify>,
}

pub enum WorkerBatch {
    Snapshots(Vec<SnapshotUpdate>),
    FifoItem {
        event_type: &'static str,
        event: Arc<EnrichedEvent>,
    },
}

pub struct SnapshotUpdate {
    pub event_type: &'static str,
    pub event: Arc<EnrichedEvent>,
}

impl WorkerInputs {
    pub fn new(latest: Vec<Latest1Input>, fifos: Vec<FifoInput>, notify_any: Arc<Notify>) -> Self {
        Self {
            latest,
            fifos,
            notify_any,
        }
    }

    /// Wait for the next batch. Pending snapshots win; otherwise the FIFO item
    /// with the lowest ingest sequence across all inputs, so events published
    /// in order are handled in order.
    ///
    /// Cancel safe: an item peeked before cancellation stays buffered.
    pub async fn next(&mut self) -> WorkerBatch {
        loop {
            let snaps: Vec<SnapshotUpdate> = self
                .latest
                .iter()
                .filter_map(|l| {
                    l.queue.try_recv().map(|event| SnapshotUpdate {
                        event_type: l.event_type,
                        event,
                    })
                })
                .collect();

            if !snaps.is_empty() {
                return WorkerBatch::Snapshots(snaps);
            }

            let oldest = self
                .fifos
                .iter_mut()
                .enumerate()
                .filter_map(|(i, f)| f.peek_seq().map(|seq| (i, seq)))
                .min_by_key(|&(_, seq)| seq)
                .map(|(i, _)| i);

            if let Some(i) = oldest {
                let fifo = &mut self.fifos[i];
                if let Some(event) = fifo.pending.take() {
                    return WorkerBatch::FifoItem {
                        event_type: fifo.event_type,
                        event,
                    };
                }
            }

            self.notify_any.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::{
        events::Event,
        queues::FifoDropOldestQueue,
        types::SessionId,
        workers::{EventHeader, PlaybackEnded, PlaybackSampled},
    };

    fn enriched(event: Arc<dyn Event>, ingest_seq: u64) -> Arc<EnrichedEvent> {
        Arc::new(EnrichedEvent {
            event,
            ingest_seq,
            ingested_at: Instant::now(),
        })
    }

    #[tokio::test]
    async fn fifo_items_come_out_in_publish_order_after_snapshots() {
        let notify = Arc::new(Notify::new());
        let session = SessionId::new();

        let ended = Arc::new(FifoDropOldestQueue::new(4, Arc::clone(&notify)));
        let other = Arc::new(FifoDropOldestQueue::new(4, Arc::clone(&notify)));
        let samples = Arc::new(Latest1Queue::new(Arc::clone(&notify)));

        let mut inputs = WorkerInputs::new(
            vec![Latest1Input {
                event_type: PlaybackSampled::EVENT_TYPE,
                queue: Arc::clone(&samples),
            }],
            vec![
                FifoInput::new("a", FifoReceiver::FifoDropOldest(ended.receiver())),
                FifoInput::new("b", FifoReceiver::FifoDropOldest(other.receiver())),
            ],
            notify,
        );

        let end = |seq| {
            enriched(
                Arc::new(PlaybackEnded {
                    header: EventHeader::new(session, None),
                }),
                seq,
            )
        };
        ended.push_overwrite(end(3));
        other.push_overwrite(end(1));
        ended.push_overwrite(end(4));
        other.push_overwrite(end(2));
        samples.set(enriched(
            Arc::new(PlaybackSampled {
                header: EventHeader::new(session, None),
                position: 12.0,
            }),
            5,
        ));

        assert!(matches!(inputs.next().await, WorkerBatch::Snapshots(s) if s.len() == 1));

        let mut order = Vec::new();
        for _ in 0..4 {
            match inputs.next().await {
                WorkerBatch::FifoItem { event, .. } => order.push(event.ingest_seq),
                WorkerBatch::Snapshots(_) => panic!("unexpected snapshot"),
            }
        }
        assert_eq!(order, vec![1, 2, 3, 4]);
    }
}
