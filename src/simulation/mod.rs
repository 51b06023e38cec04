//! Episode orchestration: owns the terrain, the fire, the agent and the RNG
//! and schedules fire rounds and agent ticks on two independent timers.

mod fire_spread;
mod scheduler;

pub use fire_spread::{FireLimits, FireSpreadSimulator, SpreadOutcome};
pub use scheduler::{PeriodicTimer, run_realtime, scaled_interval};

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::infra::{Cell, SimError, SimulationObserver};
use crate::rl::{AgentConfig, AgentController, EpisodeSummary, TickReport};
use crate::state::{EpisodePhase, Layout, TerrainGrid};

/// Map used when no layout file is configured.
pub const DEFAULT_LAYOUT: &str = "\
A.........
..........
..####.F..
..#H.#....
..#..#....
..##.#....
..........
....##....
..........
.........E
";

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub agent: AgentConfig,
    pub fire_limits: FireLimits,
    pub agent_interval: Duration,
    pub fire_interval: Duration,
    /// Overrides the `F` marker of the layout
    pub ignition: Option<Cell>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            fire_limits: FireLimits::default(),
            agent_interval: Duration::from_millis(500),
            fire_interval: Duration::from_secs(5),
            ignition: None,
        }
    }
}

pub struct Simulation<R: Rng = StdRng> {
    terrain: TerrainGrid,
    fire: FireSpreadSimulator,
    ignition: Cell,
    agent: AgentController,
    rng: R,
    agent_timer: PeriodicTimer,
    fire_timer: PeriodicTimer,
    observer: Box<dyn SimulationObserver>,
    episode: usize,
    last_summary: Option<EpisodeSummary>,
}

impl<R: Rng> Simulation<R> {
    pub fn new(
        layout: Layout,
        config: &SimulationConfig,
        rng: R,
        observer: impl SimulationObserver + 'static,
    ) -> Result<Self, SimError> {
        let Layout {
            mut terrain,
            agent_start,
            hostage,
            ignition,
        } = layout;

        let hostage = hostage.ok_or(SimError::MissingHostage)?;
        let start = agent_start.ok_or(SimError::MissingAgentStart)?;
        let ignition = config.ignition.or(ignition).ok_or(SimError::MissingIgnition)?;
        if !terrain.in_bounds(&ignition) {
            return Err(SimError::OutOfBounds {
                cell: ignition,
                width: terrain.width,
                height: terrain.height,
            });
        }

        let agent = AgentController::new(config.agent.clone(), &terrain, start, hostage)?;

        let mut fire = FireSpreadSimulator::new(config.fire_limits);
        if !fire.ignite(&mut terrain, ignition) {
            return Err(SimError::Blocked {
                cell: ignition,
                what: "fire",
            });
        }

        let mut sim = Self {
            terrain,
            fire,
            ignition,
            agent,
            rng,
            agent_timer: PeriodicTimer::new(config.agent_interval),
            fire_timer: PeriodicTimer::new(config.fire_interval),
            observer: Box::new(observer),
            episode: 0,
            last_summary: None,
        };
        sim.observer
            .on_episode_start(sim.episode, &sim.terrain, &sim.agent);
        Ok(sim)
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn agent(&self) -> &AgentController {
        &self.agent
    }

    pub fn fire(&self) -> &FireSpreadSimulator {
        &self.fire
    }

    pub fn episode(&self) -> usize {
        self.episode
    }

    pub fn agent_interval(&self) -> Duration {
        self.agent_timer.interval()
    }

    pub fn fire_interval(&self) -> Duration {
        self.fire_timer.interval()
    }

    pub fn is_active(&self) -> bool {
        self.agent.is_active()
    }

    /// Summary of the most recently finished episode.
    pub fn last_summary(&self) -> Option<EpisodeSummary> {
        self.last_summary
    }

    /// Runs one fire spread round. Does nothing once the episode ended.
    pub fn fire_tick(&mut self) -> SpreadOutcome {
        if !self.agent.is_active() || !self.fire.is_active() {
            return SpreadOutcome::Exhausted;
        }
        let outcome = self.fire.spread_round(&mut self.terrain, &mut self.rng);
        self.observer
            .on_fire_round(self.fire.rounds(), outcome, self.terrain.burning_count());
        outcome
    }

    /// Runs one agent step and reports the episode end to the observer.
    pub fn agent_tick(&mut self) -> Option<TickReport> {
        let report = self.agent.tick(&self.terrain, &mut self.rng)?;
        self.observer.on_agent_tick(self.episode, &report);

        if let EpisodePhase::Terminated(reason) = report.phase {
            let runtime = self.agent.runtime();
            let summary = EpisodeSummary {
                episode: self.episode,
                reward: self.agent.episode_reward(),
                steps: runtime.tick,
                reason,
                hostage_found: runtime.hostage_found,
                final_health: runtime.health,
                cells_explored: runtime.explored.len(),
                cells_burning: self.terrain.burning_count(),
            };
            self.last_summary = Some(summary);
            self.observer
                .on_episode_finished(&summary, &self.terrain, &self.agent);
        }
        Some(report)
    }

    /// Advances simulated time by `dt`. Due fire rounds run before due agent
    /// ticks. Returns the agent ticks that ran.
    pub fn advance(&mut self, dt: Duration) -> Vec<TickReport> {
        let fire_rounds = self.fire_timer.advance(dt);
        for _ in 0..fire_rounds {
            self.fire_tick();
        }

        let agent_ticks = self.agent_timer.advance(dt);
        let mut reports = Vec::new();
        for _ in 0..agent_ticks {
            match self.agent_tick() {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        reports
    }

    /// Steps the current episode headless until it ends or `max_ticks`
    /// agent ticks have run.
    pub fn run_episode(&mut self, max_ticks: u32) -> Option<EpisodeSummary> {
        let step = self.agent_timer.interval();
        if step.is_zero() {
            return None;
        }

        let mut ticks = 0;
        while self.agent.is_active() && ticks < max_ticks {
            ticks += self.advance(step).len() as u32;
        }

        if self.agent.is_active() {
            debug!("Episode {} still running after {} ticks", self.episode, ticks);
            return None;
        }
        self.last_summary
    }

    /// Puts out the fire, re-ignites it and restarts the agent. The learned
    /// table and exploration rate carry over.
    pub fn reset_episode(&mut self) {
        self.fire.reset(&mut self.terrain);
        self.fire.ignite(&mut self.terrain, self.ignition);
        self.agent.reset_episode(&self.terrain);
        self.agent_timer.reset();
        self.fire_timer.reset();
        self.last_summary = None;
        self.episode += 1;

        info!("Starting episode {}", self.episode);
        self.observer
            .on_episode_start(self.episode, &self.terrain, &self.agent);
    }
}
