//! State encoder - collapses the agent's continuous situation into one of
//! sixteen discrete states.

use std::fmt;

use crate::infra::{Cell, WorldPos};
use crate::state::TerrainQuery;

/// Number of distinct discrete states.
pub const NUM_STATES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistanceBucket {
    VeryClose,
    Close,
    Medium,
    Far,
}

impl DistanceBucket {
    pub const ALL: [DistanceBucket; 4] = [
        DistanceBucket::VeryClose,
        DistanceBucket::Close,
        DistanceBucket::Medium,
        DistanceBucket::Far,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceBucket::VeryClose => "VeryClose",
            DistanceBucket::Close => "Close",
            DistanceBucket::Medium => "Medium",
            DistanceBucket::Far => "Far",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HazardLevel {
    Safe,
    CloseToFire,
    OnFire,
    LowHealth,
}

impl HazardLevel {
    pub const ALL: [HazardLevel; 4] = [
        HazardLevel::Safe,
        HazardLevel::CloseToFire,
        HazardLevel::OnFire,
        HazardLevel::LowHealth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HazardLevel::Safe => "Safe",
            HazardLevel::CloseToFire => "CloseToFire",
            HazardLevel::OnFire => "OnFire",
            HazardLevel::LowHealth => "LowHealth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscreteState {
    pub distance: DistanceBucket,
    pub hazard: HazardLevel,
}

impl DiscreteState {
    pub fn new(distance: DistanceBucket, hazard: HazardLevel) -> Self {
        Self { distance, hazard }
    }

    /// Compact index in `0..NUM_STATES`.
    pub fn index(&self) -> usize {
        self.distance as usize * HazardLevel::ALL.len() + self.hazard as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= NUM_STATES {
            return None;
        }
        let per_bucket = HazardLevel::ALL.len();
        Some(Self::new(
            DistanceBucket::ALL[index / per_bucket],
            HazardLevel::ALL[index % per_bucket],
        ))
    }

    pub fn all() -> impl Iterator<Item = DiscreteState> {
        (0..NUM_STATES).filter_map(Self::from_index)
    }
}

impl fmt::Display for DiscreteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.distance.as_str(), self.hazard.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Distances below this are `VeryClose`
    pub very_close: f32,
    /// Distances below this are `Close`
    pub close: f32,
    /// Distances below this are `Medium`, anything further is `Far`
    pub medium: f32,
    /// Health at or below this is `LowHealth`
    pub low_health_threshold: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            very_close: 1.0,
            close: 4.0,
            medium: 7.0,
            low_health_threshold: 20.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateEncoder {
    config: EncoderConfig,
}

impl StateEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn distance_bucket(&self, distance: f32) -> DistanceBucket {
        if distance < self.config.very_close {
            DistanceBucket::VeryClose
        } else if distance < self.config.close {
            DistanceBucket::Close
        } else if distance < self.config.medium {
            DistanceBucket::Medium
        } else {
            DistanceBucket::Far
        }
    }

    /// Low health takes precedence over fire exposure.
    pub fn hazard_level<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        cell: Cell,
        health: f32,
    ) -> HazardLevel {
        if health <= self.config.low_health_threshold {
            HazardLevel::LowHealth
        } else if is_on_fire(terrain, cell) {
            HazardLevel::OnFire
        } else if is_close_to_fire(terrain, cell) {
            HazardLevel::CloseToFire
        } else {
            HazardLevel::Safe
        }
    }

    pub fn encode<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        agent: WorldPos,
        hostage: WorldPos,
        health: f32,
    ) -> DiscreteState {
        let distance = self.distance_bucket(agent.distance(&hostage));
        let hazard = self.hazard_level(terrain, terrain.world_to_cell(agent), health);
        DiscreteState::new(distance, hazard)
    }
}

pub fn is_on_fire<T: TerrainQuery + ?Sized>(terrain: &T, cell: Cell) -> bool {
    terrain.is_fire(cell)
}

/// Any of the four neighbours burning. The cell itself does not count.
pub fn is_close_to_fire<T: TerrainQuery + ?Sized>(terrain: &T, cell: Cell) -> bool {
    cell.neighbors().iter().any(|n| terrain.is_fire(*n))
}
