use serde::Serialize;

use crate::{
    error::{Result, VidquizError},
    types::SegmentIndex,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Fires once the playback position reaches this many seconds.
    At(f64),
    /// Fires on the player's end-of-playback notification.
    EndOfPlayback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanEntry {
    pub segment: SegmentIndex,
    pub trigger: Trigger,
}

/// Trigger times for one video, one entry per segment, in firing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentPlan {
    entries: Vec<PlanEntry>,
}

impl SegmentPlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PlanEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&PlanEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }
}

/// Compute trigger times for `count` segments of a video lasting `duration` seconds.
///
/// Segment `i < count - 1` fires at `interval * (i + 1)`; the last one fires on
/// end-of-playback. Numeric triggers past `duration` are kept: they are
/// simply never reached.
pub fn plan_segments(duration: f64, count: usize, interval: f64) -> Result<SegmentPlan> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(VidquizError::InvalidPlanInput {
            reason: format!("duration must be positive, got {duration}"),
        });
    }
    if !interval.is_finite() || interval <= 0.0 {
        return Err(VidquizError::InvalidPlanInput {
            reason: format!("boundary interval must be positive, got {interval}"),
        });
    }

    let entries = (0..count)
        .map(|segment| PlanEntry {
            segment,
            trigger: if segment + 1 == count {
                Trigger::EndOfPlayback
            } else {
                Trigger::At(interval * (segment + 1) as f64)
            },
        })
        .collect();

    Ok(SegmentPlan { entries })
}
