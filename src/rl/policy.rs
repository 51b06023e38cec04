//! Action selection.
//!
//! `ExploreOnly` never consults the learned values: it walks towards
//! unexplored neighbours at random. `EpsilonGreedy` explores with
//! probability `exploration_rate` and otherwise follows the table.

use std::str::FromStr;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::infra::{Cell, SimError};
use crate::state::ExploredSet;

use super::action_space::Action;
use super::encoder::DiscreteState;
use super::q_table::QTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplorationMode {
    #[default]
    ExploreOnly,
    EpsilonGreedy,
}

impl FromStr for ExplorationMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explore" | "explore-only" => Ok(ExplorationMode::ExploreOnly),
            "epsilon" | "epsilon-greedy" => Ok(ExplorationMode::EpsilonGreedy),
            _ => Err(SimError::InvalidConfig {
                key: "exploration_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Everything the policy looks at for one decision.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    pub state: DiscreteState,
    pub position: Cell,
    pub explored: &'a ExploredSet,
    pub allow_revisit: bool,
    pub exploration_rate: f32,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    mode: ExplorationMode,
}

impl DecisionPolicy {
    pub fn new(mode: ExplorationMode) -> Self {
        Self { mode }
    }

    pub fn choose_action<R: Rng + ?Sized>(
        &self,
        input: &PolicyInput<'_>,
        table: &QTable,
        rng: &mut R,
    ) -> Action {
        match self.mode {
            ExplorationMode::ExploreOnly => explore(input, rng),
            ExplorationMode::EpsilonGreedy => {
                if rng.random::<f32>() < input.exploration_rate {
                    explore(input, rng)
                } else {
                    table.best_action(input.state)
                }
            }
        }
    }
}

/// True when every neighbour has already been visited.
pub fn is_stuck(position: Cell, explored: &ExploredSet) -> bool {
    Action::ALL
        .iter()
        .all(|a| explored.contains(&a.apply(position)))
}

fn explore<R: Rng + ?Sized>(input: &PolicyInput<'_>, rng: &mut R) -> Action {
    let candidates: Vec<Action> = Action::ALL
        .into_iter()
        .filter(|a| input.allow_revisit || !input.explored.contains(&a.apply(input.position)))
        .collect();

    candidates
        .choose(rng)
        .or_else(|| Action::ALL.choose(rng))
        .copied()
        .unwrap_or(Action::Up)
}
