use std::{pin::Pin, sync::Arc};

use tokio::sync::{Notify, mpsc};

pub type StartupTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Background tasks the bus needs running before workers start.
#[derive(Default)]
pub struct StartupTasks {
    pub tokio: Vec<StartupTask>,
}

impl StartupTasks {
    pub fn spawn_all(self) -> Vec<tokio::task::JoinHandle<()>> {
        self.tokio.into_iter().map(tokio::spawn).collect()
    }
}

/// Inbox with its own drain task. The publisher only ever does a
/// non-blocking `try_send`; back-pressure from a slow consumer stays on the
/// drain task.
pub struct IsolatedForwarder<T> {
    inbox_tx: mpsc::Sender<T>,
}

const INBOX_CAPACITY: usize = 16;

impl<T: Send + 'static> IsolatedForwarder<T> {
    pub fn new(
        output_buffer: usize,
        notify_any: Arc<Notify>,
    ) -> (IsolatedForwarder<T>, mpsc::Receiver<T>, StartupTask) {
        let (inbox_tx, mut inbox_rx) = mpsc::channel::<T>(INBOX_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel::<T>(output_buffer);

        let drain_task = Box::pin(async move {
            while let Some(value) = inbox_rx.recv().await {
                if out_tx.send(value).await.is_err() {
                    break;
                }
                notify_any.notify_one();
            }
        });

        (IsolatedForwarder { inbox_tx }, out_rx, drain_task)
    }

    pub fn try_send(&self, value: T) -> Result<(), T> {
        self.inbox_tx.try_send(value).map_err(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_in_order_and_notifies() {
        let notify = Arc::new(Notify::new());
        let (fwd, mut rx, task) = IsolatedForwarder::new(4, Arc::clone(&notify));
        tokio::spawn(task);

        fwd.try_send(1).unwrap();
        fwd.try_send(2).unwrap();

        notify.notified().await;
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }
}
