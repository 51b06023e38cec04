//! Tabular Q-learning agent
//!
//! ```text
//! terrain + agent runtime
//!     │
//!     ▼
//! StateEncoder ──► DiscreteState (distance bucket × hazard level)
//!     │
//!     ▼
//! DecisionPolicy ──► Action (explore unexplored neighbours, or greedy)
//!     │
//!     ▼
//! AgentController: move, time, health, RewardModel, QTable::update
//! ```

pub mod action_space;
pub mod controller;
pub mod encoder;
pub mod metrics;
pub mod policy;
pub mod q_table;
pub mod reward;

pub use action_space::{Action, NUM_ACTIONS, UnknownAction};
pub use controller::{AgentConfig, AgentController, TickReport};
pub use encoder::{DiscreteState, DistanceBucket, EncoderConfig, HazardLevel, NUM_STATES, StateEncoder};
pub use metrics::{EpisodeSummary, EvaluationMetrics, MovingAverage};
pub use policy::{DecisionPolicy, ExplorationMode, PolicyInput};
pub use q_table::{QTable, QTableConfig};
pub use reward::{MoveOutcome, RewardModel, Transition};
