pub mod config;
pub mod infra;
pub mod rl;
pub mod simulation;
pub mod state;

// Re-export commonly used types for convenience
pub use config::SimConfig;
pub use infra::{Cell, SimError, WorldPos};
pub use simulation::{Simulation, SimulationConfig};
pub use state::{Layout, TerrainGrid, TerrainQuery};
