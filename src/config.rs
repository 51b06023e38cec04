use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::infra::SimError;
use crate::simulation::{SimulationConfig, scaled_interval};

/// Everything the binary needs for a run: the simulation itself plus how
/// many episodes to play and how to drive them.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub episodes: usize,
    pub seed: Option<u64>,
    /// Speed-up factor for realtime runs
    pub time_scale: f32,
    pub realtime: bool,
    /// Upper bound on agent ticks per headless episode
    pub max_ticks: u32,
    pub map_path: Option<String>,
    pub trace_folder: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            episodes: 1,
            seed: None,
            time_scale: 1.0,
            realtime: false,
            max_ticks: 10_000,
            map_path: None,
            trace_folder: None,
        }
    }
}

impl SimConfig {
    /// Reads `RESCUE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, SimError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys keep their
    /// defaults; values that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SimError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let sim = &mut config.simulation;
        let agent = &mut sim.agent;

        set(&lookup, "RESCUE_TIME_LIMIT", &mut agent.time_limit)?;
        set(&lookup, "RESCUE_LEARNING_RATE", &mut agent.q_table.learning_rate)?;
        set(&lookup, "RESCUE_DISCOUNT_RATE", &mut agent.q_table.discount_rate)?;
        set(&lookup, "RESCUE_EXPLORATION_RATE", &mut agent.exploration_rate)?;
        set(&lookup, "RESCUE_MIN_EXPLORATION_RATE", &mut agent.min_exploration_rate)?;
        set(&lookup, "RESCUE_EXPLORATION_DECAY", &mut agent.exploration_decay_rate)?;
        set(&lookup, "RESCUE_HEALTH", &mut agent.health)?;
        set(&lookup, "RESCUE_HEALTH_DECAY", &mut agent.health_decay_near_fire)?;
        set(&lookup, "RESCUE_LOW_HEALTH", &mut agent.encoder.low_health_threshold)?;
        set(&lookup, "RESCUE_EXPLORATION_MODE", &mut agent.exploration_mode)?;

        if let Some(ms) = get::<u64, _>(&lookup, "RESCUE_FIRE_INTERVAL_MS")? {
            sim.fire_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = get::<u64, _>(&lookup, "RESCUE_AGENT_INTERVAL_MS")? {
            sim.agent_interval = Duration::from_millis(ms);
        }
        set(&lookup, "RESCUE_MAX_FIRE_ROUNDS", &mut sim.fire_limits.max_rounds)?;
        set(&lookup, "RESCUE_MAX_BURN_AREA", &mut sim.fire_limits.max_burning)?;

        set(&lookup, "RESCUE_EPISODES", &mut config.episodes)?;
        config.seed = get(&lookup, "RESCUE_SEED")?;
        set(&lookup, "RESCUE_TIME_SCALE", &mut config.time_scale)?;
        set(&lookup, "RESCUE_REALTIME", &mut config.realtime)?;
        set(&lookup, "RESCUE_MAX_TICKS", &mut config.max_ticks)?;
        config.map_path = lookup("RESCUE_MAP").filter(|v| !v.is_empty());
        config.trace_folder = lookup("RESCUE_TRACE_FOLDER").filter(|v| !v.is_empty());

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SimError> {
        let agent = &self.simulation.agent;
        check("RESCUE_TIME_LIMIT", agent.time_limit, agent.time_limit > 0)?;
        check("RESCUE_HEALTH", agent.health, agent.health > 0.0)?;
        check(
            "RESCUE_EXPLORATION_DECAY",
            agent.exploration_decay_rate,
            (0.0..=1.0).contains(&agent.exploration_decay_rate),
        )?;
        check(
            "RESCUE_AGENT_INTERVAL_MS",
            self.simulation.agent_interval.as_millis(),
            !self.simulation.agent_interval.is_zero(),
        )?;
        let scales = [self.simulation.agent_interval, self.simulation.fire_interval]
            .into_iter()
            .all(|interval| scaled_interval(interval, self.time_scale).is_some());
        check("RESCUE_TIME_SCALE", self.time_scale, scales)?;
        Ok(())
    }
}

fn get<T, F>(lookup: &F, key: &str) -> Result<Option<T>, SimError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SimError::InvalidConfig {
                key: key.to_string(),
                value,
            }),
    }
}

fn set<T, F>(lookup: &F, key: &str, slot: &mut T) -> Result<(), SimError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = get(lookup, key)? {
        *slot = value;
    }
    Ok(())
}

fn check<V: ToString>(key: &str, value: V, ok: bool) -> Result<(), SimError> {
    if ok {
        Ok(())
    } else {
        Err(SimError::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::ExplorationMode;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<SimConfig, SimError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SimConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = from_pairs(&[]).unwrap();
        let agent = &config.simulation.agent;
        assert_eq!(agent.time_limit, 20);
        assert_eq!(agent.q_table.learning_rate, 0.1);
        assert_eq!(agent.q_table.discount_rate, 0.99);
        assert_eq!(agent.exploration_mode, ExplorationMode::ExploreOnly);
        assert_eq!(config.simulation.fire_interval, Duration::from_secs(5));
        assert_eq!(config.simulation.agent_interval, Duration::from_millis(500));
        assert_eq!(config.episodes, 1);
        assert!(config.seed.is_none());
        assert!(config.map_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("RESCUE_TIME_LIMIT", "40"),
            ("RESCUE_LEARNING_RATE", "0.5"),
            ("RESCUE_EXPLORATION_MODE", "epsilon-greedy"),
            ("RESCUE_FIRE_INTERVAL_MS", "250"),
            ("RESCUE_MAX_BURN_AREA", "64"),
            ("RESCUE_EPISODES", "12"),
            ("RESCUE_SEED", "7"),
            ("RESCUE_REALTIME", "true"),
            ("RESCUE_MAP", "maps/office.txt"),
            ("RESCUE_TRACE_FOLDER", ""),
        ])
        .unwrap();
        let agent = &config.simulation.agent;
        assert_eq!(agent.time_limit, 40);
        assert_eq!(agent.q_table.learning_rate, 0.5);
        assert_eq!(agent.exploration_mode, ExplorationMode::EpsilonGreedy);
        assert_eq!(config.simulation.fire_interval, Duration::from_millis(250));
        assert_eq!(config.simulation.fire_limits.max_burning, 64);
        assert_eq!(config.episodes, 12);
        assert_eq!(config.seed, Some(7));
        assert!(config.realtime);
        assert_eq!(config.map_path.as_deref(), Some("maps/office.txt"));
        assert!(config.trace_folder.is_none());
    }

    #[test]
    fn test_unparsable_value_names_the_key() {
        let err = from_pairs(&[("RESCUE_HEALTH", "lots")]).unwrap_err();
        match err {
            SimError::InvalidConfig { key, value } => {
                assert_eq!(key, "RESCUE_HEALTH");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(from_pairs(&[("RESCUE_TIME_LIMIT", "0")]).is_err());
        assert!(from_pairs(&[("RESCUE_AGENT_INTERVAL_MS", "0")]).is_err());
        assert!(from_pairs(&[("RESCUE_EXPLORATION_DECAY", "1.5")]).is_err());
        assert!(from_pairs(&[("RESCUE_EXPLORATION_MODE", "greedy")]).is_err());
        assert!(from_pairs(&[("RESCUE_TIME_SCALE", "0")]).is_err());
    }

    #[test]
    fn test_time_scale_that_overflows_intervals_rejected() {
        let err = from_pairs(&[("RESCUE_TIME_SCALE", "1e-30")]).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { ref key, .. } if key == "RESCUE_TIME_SCALE"));
        assert!(from_pairs(&[("RESCUE_TIME_SCALE", "50")]).is_ok());
    }
}
