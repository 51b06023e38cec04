use crate::rl::{AgentController, EpisodeSummary, TickReport};
use crate::simulation::SpreadOutcome;
use crate::state::TerrainGrid;

/// Trait for observing simulation events during execution
pub trait SimulationObserver {
    /// Called when an episode starts, after the fire has been ignited
    fn on_episode_start(&mut self, episode: usize, terrain: &TerrainGrid, agent: &AgentController);

    /// Called after every agent tick
    fn on_agent_tick(&mut self, episode: usize, report: &TickReport);

    /// Called after every fire spread round
    fn on_fire_round(&mut self, _round: u32, _outcome: SpreadOutcome, _burning: usize) {
        // Default implementation does nothing
    }

    /// Called once the agent reaches a terminal state
    fn on_episode_finished(
        &mut self,
        summary: &EpisodeSummary,
        terrain: &TerrainGrid,
        agent: &AgentController,
    );
}
