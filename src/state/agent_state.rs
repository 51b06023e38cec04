use std::collections::HashSet;

use crate::infra::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalReason {
    TimedOut,
    ExitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodePhase {
    Exploring,
    HostageFound,
    Terminated(TerminalReason),
}

impl EpisodePhase {
    pub fn is_active(&self) -> bool {
        !matches!(self, EpisodePhase::Terminated(_))
    }
}

/// Visited cells, with the order of first visits kept for traces.
#[derive(Debug, Clone, Default)]
pub struct ExploredSet {
    visited: HashSet<Cell>,
    order: Vec<Cell>,
}

impl ExploredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cell was not visited before.
    pub fn insert(&mut self, cell: Cell) -> bool {
        if self.visited.insert(cell) {
            self.order.push(cell);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, cell: &Cell) -> bool {
        self.visited.contains(cell)
    }

    pub fn order(&self) -> &[Cell] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AgentRuntimeState {
    pub position: Cell,
    pub health: f32,
    pub time_remaining: i32,
    pub hostage_found: bool,
    pub phase: EpisodePhase,
    /// Distance to the current objective at the end of the previous tick.
    pub previous_distance: f32,
    pub tick: u32,
    pub explored: ExploredSet,
}

impl AgentRuntimeState {
    pub fn new(start: Cell, health: f32, time_limit: i32, initial_distance: f32) -> Self {
        let mut explored = ExploredSet::new();
        explored.insert(start);
        Self {
            position: start,
            health,
            time_remaining: time_limit,
            hostage_found: false,
            phase: EpisodePhase::Exploring,
            previous_distance: initial_distance,
            tick: 0,
            explored,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// Applies passive damage. Health never reports below zero.
    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }
}
