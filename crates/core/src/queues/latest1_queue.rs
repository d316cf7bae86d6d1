use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

/// Single-slot inbox: a newer value overwrites an unread older one.
pub struct Latest1Queue<T> {
    slot: Mutex<Option<T>>,
    notify_any: Arc<Notify>,
}

impl<T> Latest1Queue<T> {
    pub fn new(notify_any: Arc<Notify>) -> Self {
        Self {
            slot: Mutex::new(None),
            notify_any,
        }
    }

    /// Store `value`, returning true if an unread value was replaced.
    pub fn set(&self, value: T) -> bool {
        let replaced = self.lock().replace(value).is_some();
        self.notify_any.notify_one();
        replaced
    }

    pub fn try_recv(&self) -> Option<T> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
