use std::collections::HashMap;

use super::action_space::{Action, NUM_ACTIONS};
use super::encoder::DiscreteState;

#[derive(Debug, Clone, Copy)]
pub struct QTableConfig {
    /// Step size of the TD update
    pub learning_rate: f32,
    /// Weight of the best next-state value
    pub discount_rate: f32,
}

impl Default for QTableConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_rate: 0.99,
        }
    }
}

/// Sparse state -> per-action values.
#[derive(Debug, Clone)]
pub struct QTable {
    values: HashMap<DiscreteState, [f32; NUM_ACTIONS]>,
    config: QTableConfig,
}

impl QTable {
    /// Creates a table with every canonical state present and zeroed.
    pub fn new(config: QTableConfig) -> Self {
        let values = DiscreteState::all()
            .map(|state| (state, [0.0; NUM_ACTIONS]))
            .collect();
        Self { values, config }
    }

    pub fn value(&self, state: DiscreteState, action: Action) -> f32 {
        self.values
            .get(&state)
            .map(|row| row[action.index()])
            .unwrap_or(0.0)
    }

    pub fn max_value(&self, state: DiscreteState) -> f32 {
        self.values
            .get(&state)
            .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .unwrap_or(0.0)
    }

    /// Greedy action; the first action wins ties.
    pub fn best_action(&self, state: DiscreteState) -> Action {
        let Some(row) = self.values.get(&state) else {
            return Action::ALL[0];
        };
        let mut best = Action::ALL[0];
        for action in Action::ALL {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        best
    }

    /// Temporal-difference update. `next_state` is materialised before its
    /// value is read.
    pub fn update(
        &mut self,
        state: DiscreteState,
        action: Action,
        reward: f32,
        next_state: DiscreteState,
    ) -> f32 {
        self.ensure_state(next_state);
        let max_future = self.max_value(next_state);

        let QTableConfig {
            learning_rate,
            discount_rate,
        } = self.config;

        let row = self.ensure_state(state);
        let current = row[action.index()];
        let updated = current + learning_rate * (reward + discount_rate * max_future - current);
        row[action.index()] = updated;
        updated
    }

    pub fn contains(&self, state: DiscreteState) -> bool {
        self.values.contains_key(&state)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DiscreteState, &[f32; NUM_ACTIONS])> {
        self.values.iter()
    }

    fn ensure_state(&mut self, state: DiscreteState) -> &mut [f32; NUM_ACTIONS] {
        self.values.entry(state).or_insert([0.0; NUM_ACTIONS])
    }

    #[cfg(test)]
    fn remove(&mut self, state: DiscreteState) {
        self.values.remove(&state);
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::new(QTableConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::encoder::{DistanceBucket, HazardLevel, NUM_STATES};

    fn state(d: DistanceBucket, h: HazardLevel) -> DiscreteState {
        DiscreteState::new(d, h)
    }

    #[test]
    fn test_pre_populated() {
        let table = QTable::default();
        assert_eq!(table.len(), NUM_STATES);
        for s in DiscreteState::all() {
            for a in Action::ALL {
                assert_eq!(table.value(s, a), 0.0);
            }
            assert_eq!(table.max_value(s), 0.0);
        }
    }

    #[test]
    fn test_td_update() {
        let mut table = QTable::new(QTableConfig {
            learning_rate: 0.5,
            discount_rate: 0.9,
        });
        let s = state(DistanceBucket::Far, HazardLevel::Safe);
        let next = state(DistanceBucket::Medium, HazardLevel::Safe);

        // Seed a future value of 10 on the next state.
        table.update(next, Action::Left, 20.0, next);
        assert!((table.value(next, Action::Left) - 10.0).abs() < 1e-5);

        // 0 + 0.5 * (1 + 0.9 * 10 - 0) = 5
        let updated = table.update(s, Action::Up, 1.0, next);
        assert!((updated - 5.0).abs() < 1e-5);
        assert!((table.value(s, Action::Up) - 5.0).abs() < 1e-5);
        assert_eq!(table.value(s, Action::Down), 0.0);
    }

    #[test]
    fn test_update_initialises_unseen_next_state() {
        let mut table = QTable::default();
        let s = state(DistanceBucket::Close, HazardLevel::Safe);
        let next = state(DistanceBucket::Close, HazardLevel::OnFire);
        table.remove(next);
        assert!(!table.contains(next));

        table.update(s, Action::Right, -1.0, next);

        assert!(table.contains(next));
        for a in Action::ALL {
            assert_eq!(table.value(next, a), 0.0);
        }
        // max over zeroed entries is 0, so the update sees only the reward.
        assert!((table.value(s, Action::Right) - (-0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_best_action_ties_and_max() {
        let mut table = QTable::default();
        let s = state(DistanceBucket::Medium, HazardLevel::CloseToFire);
        assert_eq!(table.best_action(s), Action::Up);

        table.update(s, Action::Left, 3.0, s);
        table.update(s, Action::Down, -3.0, s);
        assert_eq!(table.best_action(s), Action::Left);
        assert!((table.max_value(s) - table.value(s, Action::Left)).abs() < 1e-6);
    }

    #[test]
    fn test_values_stay_finite() {
        let mut table = QTable::default();
        let states: Vec<DiscreteState> = DiscreteState::all().collect();
        let rewards = [-0.04, -5.0, -10.0, 100.0, -50.0, 12.5];
        for i in 0..20_000 {
            let s = states[i % states.len()];
            let next = states[(i * 7 + 3) % states.len()];
            let a = Action::ALL[i % 4];
            table.update(s, a, rewards[i % rewards.len()], next);
        }
        for (_, row) in table.iter() {
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }
}
