//! Frontier-based stochastic fire spread.
//!
//! Each round every frontier cell tries its four neighbours in random order
//! and ignites the first one that is neither a wall nor an exit. The cells
//! ignited this round become the next frontier.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::infra::Cell;
use crate::state::{TerrainClass, TerrainQuery};

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Upper bounds that stop an otherwise unbounded burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireLimits {
    pub max_rounds: u32,
    pub max_burning: usize,
}

impl Default for FireLimits {
    fn default() -> Self {
        Self {
            max_rounds: 500,
            max_burning: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadOutcome {
    /// The round produced a non-empty frontier of `ignited` cells.
    Spread { ignited: usize },
    /// Nothing left to spread from.
    Exhausted,
    /// A safety limit was hit; spreading has stopped.
    Capped,
}

#[derive(Debug, Clone)]
pub struct FireSpreadSimulator {
    frontier: BTreeSet<Cell>,
    burned: BTreeSet<Cell>,
    rounds: u32,
    limits: FireLimits,
}

impl FireSpreadSimulator {
    pub fn new(limits: FireLimits) -> Self {
        Self {
            frontier: BTreeSet::new(),
            burned: BTreeSet::new(),
            rounds: 0,
            limits,
        }
    }

    /// Sets `cell` on fire and makes it the only frontier cell.
    /// Returns false if the terrain refuses to burn there.
    pub fn ignite<T: TerrainQuery + ?Sized>(&mut self, terrain: &mut T, cell: Cell) -> bool {
        if !terrain.set_fire(cell) {
            warn!("Ignition cell {} cannot burn", cell);
            return false;
        }
        self.frontier.clear();
        self.frontier.insert(cell);
        self.burned.insert(cell);
        debug!("Fire ignited at {}", cell);
        true
    }

    #[tracing::instrument(level = "trace", skip(self, terrain, rng), fields(frontier = self.frontier.len()))]
    pub fn spread_round<T, R>(&mut self, terrain: &mut T, rng: &mut R) -> SpreadOutcome
    where
        T: TerrainQuery + ?Sized,
        R: Rng + ?Sized,
    {
        if self.frontier.is_empty() {
            return SpreadOutcome::Exhausted;
        }
        if self.rounds >= self.limits.max_rounds {
            warn!("Fire stopped after {} rounds", self.rounds);
            self.frontier.clear();
            return SpreadOutcome::Capped;
        }

        let mut next = BTreeSet::new();
        for &source in &self.frontier {
            let mut directions = DIRECTIONS;
            directions.shuffle(rng);

            for (dx, dy) in directions {
                let target = source.offset(dx, dy);
                match terrain.classify(target) {
                    TerrainClass::Wall | TerrainClass::Exit => continue,
                    TerrainClass::Empty | TerrainClass::Fire => {
                        terrain.set_fire(target);
                        self.burned.insert(target);
                        next.insert(target);
                        break;
                    }
                }
            }
        }

        self.rounds += 1;
        self.frontier = next;
        debug!(
            "Fire round {}: frontier {}, burned {}",
            self.rounds,
            self.frontier.len(),
            self.burned.len()
        );

        if self.frontier.is_empty() {
            return SpreadOutcome::Exhausted;
        }
        if self.burned.len() >= self.limits.max_burning {
            warn!("Fire reached the burn area limit of {} cells", self.limits.max_burning);
            self.frontier.clear();
            return SpreadOutcome::Capped;
        }

        SpreadOutcome::Spread {
            ignited: self.frontier.len(),
        }
    }

    /// Puts out every fire and forgets the frontier.
    pub fn reset<T: TerrainQuery + ?Sized>(&mut self, terrain: &mut T) {
        terrain.clear_fire();
        self.frontier.clear();
        self.burned.clear();
        self.rounds = 0;
    }

    pub fn frontier(&self) -> &BTreeSet<Cell> {
        &self.frontier
    }

    pub fn burned(&self) -> &BTreeSet<Cell> {
        &self.burned
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn is_active(&self) -> bool {
        !self.frontier.is_empty()
    }
}
