use serde::Serialize;

use super::{EventHeader, domain_event};
use crate::types::SessionId;

/// The host switched to a new video. Starts a new session.
#[derive(Debug, Serialize)]
pub struct VideoSelected {
    pub header: EventHeader,
    pub url: String,
}

impl VideoSelected {
    pub const EVENT_TYPE: &'static str = "video.selected";

    pub fn new(session: SessionId, url: impl Into<String>) -> Self {
        Self {
            header: EventHeader::new(session, None),
            url: url.into(),
        }
    }
}

domain_event!(VideoSelected);

/// The player reported a stable, positive duration for the first time.
#[derive(Debug, Serialize)]
pub struct DurationResolved {
    pub header: EventHeader,
    pub duration: f64,
}

impl DurationResolved {
    pub const EVENT_TYPE: &'static str = "playback.duration_resolved";

    pub fn new(session: SessionId, duration: f64) -> Self {
        Self {
            header: EventHeader::new(session, None),
            duration,
        }
    }
}

domain_event!(DurationResolved);

#[derive(Debug, Serialize)]
pub struct PlaybackSampled {
    pub header: EventHeader,
    pub position: f64,
}

impl PlaybackSampled {
    pub const EVENT_TYPE: &'static str = "playback.sampled";

    pub fn new(session: SessionId, position: f64) -> Self {
        Self {
            header: EventHeader::new(session, None),
            position,
        }
    }
}

domain_event!(PlaybackSampled);

#[derive(Debug, Serialize)]
pub struct PlaybackEnded {
    pub header: EventHeader,
}

impl PlaybackEnded {
    pub const EVENT_TYPE: &'static str = "playback.ended";

    pub fn new(session: SessionId) -> Self {
        Self {
            header: EventHeader::new(session, None),
        }
    }
}

domain_event!(PlaybackEnded);
