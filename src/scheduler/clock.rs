//! Inter-bar pacing (spec.md §4.1, §5 "Suspension points"): the only
//! cooperative suspension point in the loop, so cancellation can be tested
//! without real wall-clock sleeps.

use std::time::Duration;

use crate::feed::EngineMode;

pub trait Sleeper: std::fmt::Debug {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Used by tests and fast offline batch runs to skip real sleeps while
/// keeping the same call sites exercised.
#[derive(Debug, Default)]
pub struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) {}
}

#[derive(Debug)]
pub struct Clock {
    mode: EngineMode,
    replay_speed: f64,
    sleeper: Box<dyn Sleeper>,
}

impl Clock {
    pub fn new(mode: EngineMode, replay_speed: f64, sleeper: Box<dyn Sleeper>) -> Self {
        Self { mode, replay_speed, sleeper }
    }

    /// Live mode paces itself on the producer side (spec.md §5); offline
    /// replay sleeps `bar_interval / replay_speed` between bars.
    pub fn inter_bar_delay(&self, bar_interval: Duration) -> Duration {
        match self.mode {
            EngineMode::Live => Duration::ZERO,
            EngineMode::Offline => bar_interval.div_f64(self.replay_speed.max(1.0)),
        }
    }

    pub fn wait(&self, bar_interval: Duration) {
        self.sleeper.sleep(self.inter_bar_delay(bar_interval));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_mode_never_sleeps_between_bars() {
        let clock = Clock::new(EngineMode::Live, 1.0, Box::new(NoopSleeper));
        assert_eq!(clock.inter_bar_delay(Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn offline_mode_scales_by_replay_speed() {
        let clock = Clock::new(EngineMode::Offline, 60.0, Box::new(NoopSleeper));
        assert_eq!(clock.inter_bar_delay(Duration::from_secs(60)), Duration::from_secs(1));
    }
}
