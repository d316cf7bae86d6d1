pub mod content;
pub mod playback;
pub mod quiz;

pub use content::*;
pub use playback::*;
pub use quiz::*;

use std::time::SystemTime;

use serde::Serialize;
use uuid::Uuid;

use crate::types::SessionId;

/// Fields shared by every domain event.
#[derive(Debug, Clone, Serialize)]
pub struct EventHeader {
    pub event_id: Uuid,
    pub parent_ids: Vec<Uuid>,
    pub timestamp: SystemTime,
    pub session: SessionId,
}

impl EventHeader {
    pub fn new(session: SessionId, parent: Option<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            parent_ids: parent.into_iter().collect(),
            timestamp: SystemTime::now(),
            session,
        }
    }
}

/// Implement [`crate::events::Event`] for a struct with a `header: EventHeader`
/// field and an `EVENT_TYPE` constant.
macro_rules! domain_event {
    ($ty:ty) => {
        impl $crate::events::Event for $ty {
            fn event_id(&self) -> ::uuid::Uuid {
                self.header.event_id
            }

            fn parent_ids(&self) -> &[::uuid::Uuid] {
                &self.header.parent_ids
            }

            fn event_type(&self) -> &'static str {
                <$ty>::EVENT_TYPE
            }

            fn timestamp(&self) -> ::std::time::SystemTime {
                self.header.timestamp
            }

            fn session(&self) -> $crate::types::SessionId {
                self.header.session
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
}

pub(crate) use domain_event;
