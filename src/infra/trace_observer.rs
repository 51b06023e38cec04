use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use time::{OffsetDateTime, format_description};
use tracing::{info, warn};

use crate::infra::{SimError, SimulationObserver};
use crate::rl::{AgentController, EpisodeSummary, TickReport};
use crate::state::{EpisodePhase, TerminalReason, TerrainGrid};

/// Writes one CSV line per agent tick, plus the explored-cell order at the
/// end of each episode as a `#` comment line.
pub struct TraceObserver {
    file: File,
    path: PathBuf,
}

impl TraceObserver {
    pub fn new(trace_folder: &str) -> Result<Self, SimError> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format = format_description::parse("[year][month][day]-[hour][minute][second]")
            .map_err(|e| SimError::Timestamp(e.to_string()))?;
        let date_time_str = now
            .format(&format)
            .map_err(|e| SimError::Timestamp(e.to_string()))?;

        let path = Path::new(trace_folder).join(format!("trace-{}.csv", date_time_str));
        Self::create(path)
    }

    pub fn create(path: PathBuf) -> Result<Self, SimError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&path)?;
        writeln!(
            file,
            "episode,tick,action,outcome,x,y,reward,health,time_remaining,state,next_state,phase"
        )?;
        info!("Writing trace to {}", path.display());
        Ok(Self { file, path })
    }

    fn write_tick(&mut self, episode: usize, report: &TickReport) -> io::Result<()> {
        writeln!(
            self.file,
            "{},{},{},{:?},{},{},{:.4},{:.1},{},{},{},{}",
            episode,
            report.tick,
            report.action,
            report.outcome,
            report.position.x,
            report.position.y,
            report.reward,
            report.health,
            report.time_remaining,
            report.state,
            report.next_state,
            phase_label(report.phase),
        )
    }

    fn write_explored(&mut self, episode: usize, agent: &AgentController) -> io::Result<()> {
        let order: Vec<String> = agent
            .runtime()
            .explored
            .order()
            .iter()
            .map(|c| format!("{}:{}", c.x, c.y))
            .collect();
        writeln!(self.file, "# episode {} explored {}", episode, order.join(" "))?;
        self.file.flush()
    }
}

fn phase_label(phase: EpisodePhase) -> &'static str {
    match phase {
        EpisodePhase::Exploring => "Exploring",
        EpisodePhase::HostageFound => "HostageFound",
        EpisodePhase::Terminated(TerminalReason::TimedOut) => "TimedOut",
        EpisodePhase::Terminated(TerminalReason::ExitReached) => "ExitReached",
    }
}

impl SimulationObserver for TraceObserver {
    fn on_episode_start(&mut self, _episode: usize, _terrain: &TerrainGrid, _agent: &AgentController) {}

    fn on_agent_tick(&mut self, episode: usize, report: &TickReport) {
        if let Err(e) = self.write_tick(episode, report) {
            warn!("Failed to write trace line to {}: {}", self.path.display(), e);
        }
    }

    fn on_episode_finished(
        &mut self,
        summary: &EpisodeSummary,
        _terrain: &TerrainGrid,
        agent: &AgentController,
    ) {
        if let Err(e) = self.write_explored(summary.episode, agent) {
            warn!("Failed to write trace line to {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::AgentConfig;
    use crate::simulation::{Simulation, SimulationConfig};
    use crate::state::Layout;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_trace_contains_ticks_and_explored_order() {
        let dir = std::env::temp_dir().join(format!("firerescue-trace-{}", std::process::id()));
        let path = dir.join("trace.csv");
        let observer = TraceObserver::create(path.clone()).unwrap();

        let layout = Layout::parse(
            "#######\n\
             #A.H.E#\n\
             #F#####\n",
        )
        .unwrap();
        let config = SimulationConfig {
            agent: AgentConfig {
                time_limit: 5,
                ..AgentConfig::default()
            },
            ..SimulationConfig::default()
        };
        let mut sim =
            Simulation::new(layout, &config, StdRng::seed_from_u64(1), observer).unwrap();
        let summary = sim.run_episode(100);
        assert!(summary.is_some());
        drop(sim);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].starts_with("episode,tick,action"));
        assert!(lines.iter().any(|l| l.starts_with("0,1,")));
        assert!(lines.iter().any(|l| l.starts_with("# episode 0 explored 1:1")));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
