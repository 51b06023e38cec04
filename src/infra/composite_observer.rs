use crate::infra::SimulationObserver;
use crate::rl::{AgentController, EpisodeSummary, TickReport};
use crate::simulation::SpreadOutcome;
use crate::state::TerrainGrid;

/// Forwards every event to each wrapped observer in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: impl SimulationObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }
}

impl SimulationObserver for CompositeObserver {
    fn on_episode_start(&mut self, episode: usize, terrain: &TerrainGrid, agent: &AgentController) {
        for observer in &mut self.observers {
            observer.on_episode_start(episode, terrain, agent);
        }
    }

    fn on_agent_tick(&mut self, episode: usize, report: &TickReport) {
        for observer in &mut self.observers {
            observer.on_agent_tick(episode, report);
        }
    }

    fn on_fire_round(&mut self, round: u32, outcome: SpreadOutcome, burning: usize) {
        for observer in &mut self.observers {
            observer.on_fire_round(round, outcome, burning);
        }
    }

    fn on_episode_finished(
        &mut self,
        summary: &EpisodeSummary,
        terrain: &TerrainGrid,
        agent: &AgentController,
    ) {
        for observer in &mut self.observers {
            observer.on_episode_finished(summary, terrain, agent);
        }
    }
}
