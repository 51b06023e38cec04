mod composite_observer;
mod default_observer;
mod error;
mod sim_observer;
mod trace_observer;
mod types;

pub use composite_observer::CompositeObserver;
pub use default_observer::DefaultObserver;
pub use error::SimError;
pub use sim_observer::SimulationObserver;
pub use trace_observer::TraceObserver;
pub use types::{Bounds, Cell, WorldPos};
