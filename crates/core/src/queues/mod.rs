pub mod fifo_drop_oldest_queue;
pub mod isolated_forwarder;
pub mod latest1_queue;

pub use fifo_drop_oldest_queue::*;
pub use isolated_forwarder::*;
pub use latest1_queue::*;

/// How a subscriber's inbox for one event type behaves under load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Only the newest value is kept. Used for playback samples.
    Latest1,
    /// Bounded FIFO that evicts the oldest entry when full.
    FifoDropOldest { capacity: usize },
    /// Own forwarding task, so a slow consumer never stalls the publisher.
    Isolated { output_buffer: usize },
}

impl QueueKind {
    pub fn validate(self) -> anyhow::Result<()> {
        match self {
            QueueKind::Latest1 => Ok(()),
            QueueKind::FifoDropOldest { capacity } => {
                anyhow::ensure!(capacity > 0, "capacity must be > 0");
                Ok(())
            }
            QueueKind::Isolated { output_buffer } => {
                anyhow::ensure!(output_buffer > 0, "output_buffer must be > 0");
                Ok(())
            }
        }
    }
}
