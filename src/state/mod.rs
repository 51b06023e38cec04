mod agent_state;
mod terrain;

pub use agent_state::{AgentRuntimeState, EpisodePhase, ExploredSet, TerminalReason};
pub use terrain::{Layout, TerrainClass, TerrainGrid, TerrainQuery, Tile};
