use std::sync::Mutex;

/// Adapter over the video player that owns the real playback position.
///
/// Positions are seconds from the start of the video. `current_position` must
/// not decrease while playing and must stay put while paused; `duration` is
/// `None` until the player has a stable, non-zero value. `pause`/`resume`
/// should be idempotent.
pub trait PlaybackClock: Send + Sync {
    fn current_position(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn pause(&self);
    fn resume(&self);
    fn is_paused(&self) -> bool;
}

#[derive(Debug, Default)]
struct SimulatedState {
    position: f64,
    duration: Option<f64>,
    paused: bool,
    pause_calls: u32,
    resume_calls: u32,
}

/// In-process clock for hosts without a real player, and for tests.
///
/// Position only moves through [`SimulatedClock::advance`] and
/// [`SimulatedClock::seek`].
#[derive(Debug, Default)]
pub struct SimulatedClock {
    state: Mutex<SimulatedState>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(duration: f64) -> Self {
        let clock = Self::new();
        clock.set_duration(duration);
        clock
    }

    pub fn set_duration(&self, duration: f64) {
        let mut state = self.lock();
        state.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
    }

    pub fn seek(&self, position: f64) {
        let mut state = self.lock();
        state.position = clamp_position(position, state.duration);
    }

    /// Move forward by `delta` seconds if playing. Returns true once the end is reached.
    pub fn advance(&self, delta: f64) -> bool {
        let mut state = self.lock();
        if !state.paused && delta > 0.0 {
            state.position = clamp_position(state.position + delta, state.duration);
        }
        state
            .duration
            .is_some_and(|duration| state.position >= duration)
    }

    pub fn pause_calls(&self) -> u32 {
        self.lock().pause_calls
    }

    pub fn resume_calls(&self) -> u32 {
        self.lock().resume_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        // State is plain data, a poisoned guard is still consistent.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn clamp_position(position: f64, duration: Option<f64>) -> f64 {
    let position = position.max(0.0);
    match duration {
        Some(duration) => position.min(duration),
        None => position,
    }
}

impl PlaybackClock for SimulatedClock {
    fn current_position(&self) -> f64 {
        self.lock().position
    }

    fn duration(&self) -> Option<f64> {
        self.lock().duration
    }

    fn pause(&self) {
        let mut state = self.lock();
        state.pause_calls += 1;
        state.paused = true;
    }

    fn resume(&self) {
        let mut state = self.lock();
        state.resume_calls += 1;
        state.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_unknown_until_positive() {
        let clock = SimulatedClock::new();
        assert_eq!(clock.duration(), None);

        clock.set_duration(0.0);
        assert_eq!(clock.duration(), None);

        clock.set_duration(1250.0);
        assert_eq!(clock.duration(), Some(1250.0));
    }

    #[test]
    fn position_is_stable_while_paused() {
        let clock = SimulatedClock::with_duration(100.0);
        clock.advance(10.0);
        clock.pause();
        clock.advance(10.0);
        assert_eq!(clock.current_position(), 10.0);

        clock.resume();
        clock.advance(5.0);
        assert_eq!(clock.current_position(), 15.0);
    }

    #[test]
    fn advance_clamps_and_reports_end() {
        let clock = SimulatedClock::with_duration(30.0);
        assert!(!clock.advance(20.0));
        assert!(clock.advance(20.0));
        assert_eq!(clock.current_position(), 30.0);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let clock = SimulatedClock::new();
        clock.pause();
        clock.pause();
        assert!(clock.is_paused());
        clock.resume();
        clock.resume();
        assert!(!clock.is_paused());
        assert_eq!((clock.pause_calls(), clock.resume_calls()), (2, 2));
    }
}
