use serde::Serialize;
use uuid::Uuid;

use super::{EventHeader, domain_event};
use crate::types::{QuizContentSet, SessionId};

#[derive(Debug, Serialize)]
pub struct QuizContentReady {
    pub header: EventHeader,
    pub duration: f64,
    pub content: QuizContentSet,
}

impl QuizContentReady {
    pub const EVENT_TYPE: &'static str = "content.ready";

    pub fn new(session: SessionId, parent: Uuid, duration: f64, content: QuizContentSet) -> Self {
        Self {
            header: EventHeader::new(session, Some(parent)),
            duration,
            content,
        }
    }
}

domain_event!(QuizContentReady);

#[derive(Debug, Serialize)]
pub struct ContentPipelineFailed {
    pub header: EventHeader,
    pub message: String,
}

impl ContentPipelineFailed {
    pub const EVENT_TYPE: &'static str = "content.failed";

    pub fn new(session: SessionId, parent: Uuid, message: String) -> Self {
        Self {
            header: EventHeader::new(session, Some(parent)),
            message,
        }
    }
}

domain_event!(ContentPipelineFailed);
