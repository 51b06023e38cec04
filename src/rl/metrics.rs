//! Episode statistics for multi-episode runs

use std::collections::VecDeque;

use crate::state::TerminalReason;

/// Moving average calculator
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f32>,
    window_size: usize,
    sum: f32,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Summary of one finished episode
#[derive(Debug, Clone, Copy)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub reward: f32,
    pub steps: u32,
    pub reason: TerminalReason,
    pub hostage_found: bool,
    pub final_health: f32,
    pub cells_explored: usize,
    pub cells_burning: usize,
}

/// Aggregate metrics across episodes
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    pub num_episodes: usize,
    pub total_reward: f32,
    pub total_steps: u64,
    pub num_exits: usize,
    pub num_timeouts: usize,
    pub num_rescues: usize,
    /// Recent episode rewards
    pub recent_rewards: MovingAverage,
}

impl EvaluationMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            num_episodes: 0,
            total_reward: 0.0,
            total_steps: 0,
            num_exits: 0,
            num_timeouts: 0,
            num_rescues: 0,
            recent_rewards: MovingAverage::new(window_size),
        }
    }

    pub fn record_episode(&mut self, summary: &EpisodeSummary) {
        self.num_episodes += 1;
        self.total_reward += summary.reward;
        self.total_steps += u64::from(summary.steps);
        self.recent_rewards.push(summary.reward);

        match summary.reason {
            TerminalReason::ExitReached => self.num_exits += 1,
            TerminalReason::TimedOut => self.num_timeouts += 1,
        }
        if summary.hostage_found {
            self.num_rescues += 1;
        }
    }

    fn rate(&self, count: usize) -> f32 {
        if self.num_episodes > 0 {
            count as f32 / self.num_episodes as f32
        } else {
            0.0
        }
    }

    pub fn avg_reward(&self) -> f32 {
        if self.num_episodes > 0 {
            self.total_reward / self.num_episodes as f32
        } else {
            0.0
        }
    }

    pub fn avg_steps(&self) -> f32 {
        if self.num_episodes > 0 {
            self.total_steps as f32 / self.num_episodes as f32
        } else {
            0.0
        }
    }

    pub fn exit_rate(&self) -> f32 {
        self.rate(self.num_exits)
    }

    pub fn timeout_rate(&self) -> f32 {
        self.rate(self.num_timeouts)
    }

    pub fn rescue_rate(&self) -> f32 {
        self.rate(self.num_rescues)
    }

    pub fn print_summary(&self) {
        tracing::info!("=== Evaluation Summary ===");
        tracing::info!("Episodes: {}", self.num_episodes);
        tracing::info!("Avg Reward: {:.2}", self.avg_reward());
        tracing::info!(
            "Recent Reward ({} eps): {:.2}",
            self.recent_rewards.len(),
            self.recent_rewards.average()
        );
        tracing::info!("Exit Rate: {:.1}%", self.exit_rate() * 100.0);
        tracing::info!("Timeout Rate: {:.1}%", self.timeout_rate() * 100.0);
        tracing::info!("Rescue Rate: {:.1}%", self.rescue_rate() * 100.0);
        tracing::info!("Avg Steps: {:.1}", self.avg_steps());
    }
}

impl Default for EvaluationMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}
