use std::io::{self, Write};

use tracing::{debug, info};

use crate::infra::SimulationObserver;
use crate::rl::{AgentController, EpisodeSummary, TickReport};
use crate::simulation::SpreadOutcome;
use crate::state::TerrainGrid;

/// Logs every event and prints the map when an episode ends.
pub struct DefaultObserver;

impl SimulationObserver for DefaultObserver {
    fn on_episode_start(&mut self, episode: usize, terrain: &TerrainGrid, agent: &AgentController) {
        let runtime = agent.runtime();
        info!("Episode {} started", episode);
        info!("- map size: {}x{}", terrain.width, terrain.height);
        info!("- agent: {}, hostage: {}", runtime.position, agent.hostage());
        info!("- exploration rate: {:.3}", agent.exploration_rate());
    }

    fn on_agent_tick(&mut self, _episode: usize, report: &TickReport) {
        info!(
            "tick: {}, action: {}, pos: {}, reward: {:.2}, health: {:.0}, state: {}",
            report.tick, report.action, report.position, report.reward, report.health, report.next_state,
        );
    }

    fn on_fire_round(&mut self, round: u32, outcome: SpreadOutcome, burning: usize) {
        debug!("fire round {}: {:?}, {} cells burning", round, outcome, burning);
    }

    fn on_episode_finished(
        &mut self,
        summary: &EpisodeSummary,
        terrain: &TerrainGrid,
        agent: &AgentController,
    ) {
        info!("\nEpisode {} finished: {:?}", summary.episode, summary.reason);
        info!("Steps: {}", summary.steps);
        info!("Reward: {:.2}", summary.reward);
        info!("Health: {:.0}", summary.final_health);

        let map = terrain.draw_ascii_map(Some(agent.runtime().position), Some(agent.hostage()));
        let _ = writeln!(io::stdout(), "{}", map);
    }
}
