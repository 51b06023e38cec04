use std::time::Duration;

use rand::Rng;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::infra::SimError;
use crate::rl::EpisodeSummary;

use super::Simulation;

/// Accumulates elapsed time and reports how many whole intervals passed.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    interval: Duration,
    elapsed: Duration,
}

impl PeriodicTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Adds `dt` and returns the number of times the timer fired.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        self.elapsed += dt;
        let mut fired = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            fired += 1;
        }
        fired
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

/// Divides `interval` by `time_scale`. Returns `None` for a non-positive
/// scale or a result that does not fit in a `Duration`.
pub fn scaled_interval(interval: Duration, time_scale: f32) -> Option<Duration> {
    if !time_scale.is_finite() || time_scale <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f32(interval.as_secs_f32() / time_scale).ok()
}

fn scaled_or_err(interval: Duration, time_scale: f32) -> Result<Duration, SimError> {
    scaled_interval(interval, time_scale)
        .map(|d| d.max(Duration::from_millis(1)))
        .ok_or_else(|| SimError::InvalidConfig {
            key: "time_scale".to_string(),
            value: time_scale.to_string(),
        })
}

/// Drives the current episode in wall-clock time: the agent and the fire
/// each get their own interval, both serviced from one task.
pub async fn run_realtime<R: Rng>(
    sim: &mut Simulation<R>,
    time_scale: f32,
) -> Result<Option<EpisodeSummary>, SimError> {
    if sim.agent_interval().is_zero() {
        return Ok(None);
    }
    // A zero fire interval disables spreading, matching `PeriodicTimer`.
    let fire_enabled = !sim.fire_interval().is_zero();

    let mut agent_clock = interval(scaled_or_err(sim.agent_interval(), time_scale)?);
    let mut fire_clock = interval(scaled_or_err(sim.fire_interval(), time_scale)?);
    agent_clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    fire_clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick of a tokio interval completes immediately.
    agent_clock.tick().await;
    fire_clock.tick().await;

    while sim.is_active() {
        tokio::select! {
            _ = fire_clock.tick(), if fire_enabled => {
                sim.fire_tick();
            }
            _ = agent_clock.tick() => {
                sim.agent_tick();
            }
        }
    }

    debug!("Realtime episode {} complete", sim.episode());
    Ok(sim.last_summary())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_on_whole_intervals() {
        let mut timer = PeriodicTimer::new(Duration::from_millis(500));
        assert_eq!(timer.advance(Duration::from_millis(200)), 0);
        assert_eq!(timer.advance(Duration::from_millis(300)), 1);
        assert_eq!(timer.advance(Duration::from_millis(1250)), 2);
        assert_eq!(timer.advance(Duration::from_millis(250)), 1);
    }

    #[test]
    fn test_zero_interval_never_fires() {
        let mut timer = PeriodicTimer::new(Duration::ZERO);
        assert_eq!(timer.advance(Duration::from_secs(10)), 0);
    }

    #[test]
    fn test_reset_discards_partial_progress() {
        let mut timer = PeriodicTimer::new(Duration::from_secs(5));
        timer.advance(Duration::from_secs(4));
        timer.reset();
        assert_eq!(timer.advance(Duration::from_secs(4)), 0);
    }

    #[test]
    fn test_scaled_interval() {
        assert_eq!(
            scaled_interval(Duration::from_secs(2), 4.0),
            Some(Duration::from_millis(500))
        );
        assert_eq!(scaled_interval(Duration::from_secs(2), 0.0), None);
        assert_eq!(scaled_interval(Duration::from_secs(2), -1.0), None);
        assert_eq!(scaled_interval(Duration::from_secs(2), f32::NAN), None);
    }

    #[test]
    fn test_tiny_time_scale_is_rejected_not_overflowed() {
        assert_eq!(scaled_interval(Duration::from_millis(500), 1e-30), None);
        let err = scaled_or_err(Duration::from_millis(500), 1e-30).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { .. }));
    }
}
