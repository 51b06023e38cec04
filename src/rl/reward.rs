//! Reward shaping for a single agent transition.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Blocked,
}

/// Facts about one tick that the reward depends on.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub prior_distance: f32,
    pub current_distance: f32,
    pub outcome: MoveOutcome,
    pub on_fire: bool,
    pub close_to_fire: bool,
    pub reached_exit: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct RewardModel {
    /// Charged on every tick
    pub step_cost: f32,
    /// Multiplier on distance gained towards the objective
    pub progress_scale: f32,
    pub blocked_penalty: f32,
    pub on_fire_penalty: f32,
    pub near_fire_penalty: f32,
    pub exit_bonus: f32,
    pub timeout_penalty: f32,
}

impl Default for RewardModel {
    fn default() -> Self {
        Self {
            step_cost: 0.04,
            progress_scale: 5.0,
            blocked_penalty: 5.0,
            on_fire_penalty: 10.0,
            near_fire_penalty: 2.0,
            exit_bonus: 100.0,
            timeout_penalty: 50.0,
        }
    }
}

impl RewardModel {
    pub fn compute(&self, t: &Transition) -> f32 {
        let mut reward = -self.step_cost;

        // Only progress is rewarded; moving away costs nothing extra.
        let improvement = t.prior_distance - t.current_distance;
        if improvement > 0.0 {
            reward += improvement * self.progress_scale;
        }

        if t.outcome == MoveOutcome::Blocked {
            reward -= self.blocked_penalty;
        }

        if t.on_fire {
            reward -= self.on_fire_penalty;
        } else if t.close_to_fire {
            reward -= self.near_fire_penalty;
        }

        if t.reached_exit {
            reward += self.exit_bonus;
        }

        if t.timed_out {
            reward -= self.timeout_penalty;
        }

        reward
    }
}
