//! Agent controller - runs one learning step per tick.
//!
//! Tick order: pick action, attempt the move, spend one time unit, take fire
//! damage, score the transition, update the table, decay exploration.

use rand::Rng;
use tracing::info;

use crate::infra::{Cell, SimError, WorldPos};
use crate::state::{AgentRuntimeState, EpisodePhase, TerminalReason, TerrainQuery};

use super::action_space::Action;
use super::encoder::{DiscreteState, EncoderConfig, StateEncoder, is_close_to_fire, is_on_fire};
use super::policy::{DecisionPolicy, ExplorationMode, PolicyInput, is_stuck};
use super::q_table::{QTable, QTableConfig};
use super::reward::{MoveOutcome, RewardModel, Transition};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ticks available per episode
    pub time_limit: i32,
    /// Starting health
    pub health: f32,
    /// Damage per tick next to fire; doubled when standing in it
    pub health_decay_near_fire: f32,
    pub exploration_rate: f32,
    pub min_exploration_rate: f32,
    /// Multiplicative decay applied to the exploration rate every tick
    pub exploration_decay_rate: f32,
    pub exploration_mode: ExplorationMode,
    pub q_table: QTableConfig,
    pub encoder: EncoderConfig,
    pub reward: RewardModel,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            time_limit: 20,
            health: 100.0,
            health_decay_near_fire: 30.0,
            exploration_rate: 1.0,
            min_exploration_rate: 0.01,
            exploration_decay_rate: 0.75,
            exploration_mode: ExplorationMode::default(),
            q_table: QTableConfig::default(),
            encoder: EncoderConfig::default(),
            reward: RewardModel::default(),
        }
    }
}

/// What happened during one agent tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u32,
    pub action: Action,
    pub outcome: MoveOutcome,
    pub position: Cell,
    pub state: DiscreteState,
    pub next_state: DiscreteState,
    pub reward: f32,
    pub health: f32,
    pub on_fire: bool,
    pub close_to_fire: bool,
    pub time_remaining: i32,
    pub exploration_rate: f32,
    pub phase: EpisodePhase,
}

pub struct AgentController {
    config: AgentConfig,
    start: Cell,
    hostage: Cell,
    encoder: StateEncoder,
    policy: DecisionPolicy,
    table: QTable,
    exploration_rate: f32,
    runtime: AgentRuntimeState,
    episode_reward: f32,
}

impl AgentController {
    pub fn new<T: TerrainQuery + ?Sized>(
        config: AgentConfig,
        terrain: &T,
        start: Cell,
        hostage: Cell,
    ) -> Result<Self, SimError> {
        if terrain.exits().is_empty() {
            return Err(SimError::MissingExits);
        }
        if !terrain.is_passable(start) || terrain.exits().contains(&start) {
            return Err(SimError::Blocked {
                cell: start,
                what: "agent",
            });
        }
        if !terrain.is_passable(hostage) {
            return Err(SimError::Blocked {
                cell: hostage,
                what: "hostage",
            });
        }

        let runtime = Self::fresh_runtime(&config, terrain, start, hostage);
        Ok(Self {
            encoder: StateEncoder::new(config.encoder.clone()),
            policy: DecisionPolicy::new(config.exploration_mode),
            table: QTable::new(config.q_table),
            exploration_rate: config.exploration_rate,
            config,
            start,
            hostage,
            runtime,
            episode_reward: 0.0,
        })
    }

    fn fresh_runtime<T: TerrainQuery + ?Sized>(
        config: &AgentConfig,
        terrain: &T,
        start: Cell,
        hostage: Cell,
    ) -> AgentRuntimeState {
        let distance = terrain
            .cell_to_world(start)
            .distance(&terrain.cell_to_world(hostage));
        AgentRuntimeState::new(start, config.health, config.time_limit, distance)
    }

    /// Starts a new episode. The learned table and exploration rate carry over.
    pub fn reset_episode<T: TerrainQuery + ?Sized>(&mut self, terrain: &T) {
        self.runtime = Self::fresh_runtime(&self.config, terrain, self.start, self.hostage);
        self.episode_reward = 0.0;
    }

    pub fn runtime(&self) -> &AgentRuntimeState {
        &self.runtime
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn hostage(&self) -> Cell {
        self.hostage
    }

    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    pub fn episode_reward(&self) -> f32 {
        self.episode_reward
    }

    pub fn is_active(&self) -> bool {
        self.runtime.is_active()
    }

    pub fn current_state<T: TerrainQuery + ?Sized>(&self, terrain: &T) -> DiscreteState {
        self.encoder.encode(
            terrain,
            terrain.cell_to_world(self.runtime.position),
            terrain.cell_to_world(self.hostage),
            self.runtime.health,
        )
    }

    /// Straight-line distance to the nearest exit, if any exist.
    pub fn nearest_exit_distance<T: TerrainQuery + ?Sized>(terrain: &T, from: WorldPos) -> Option<f32> {
        terrain
            .exits()
            .iter()
            .map(|exit| from.distance(&terrain.cell_to_world(*exit)))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Distance to the hostage until found, then to the nearest exit.
    fn objective_distance<T: TerrainQuery + ?Sized>(&self, terrain: &T, cell: Cell) -> f32 {
        let here = terrain.cell_to_world(cell);
        if self.runtime.hostage_found {
            Self::nearest_exit_distance(terrain, here).unwrap_or(0.0)
        } else {
            here.distance(&terrain.cell_to_world(self.hostage))
        }
    }

    #[tracing::instrument(level = "trace", skip(self, terrain, rng), fields(tick = self.runtime.tick))]
    pub fn tick<T, R>(&mut self, terrain: &T, rng: &mut R) -> Option<TickReport>
    where
        T: TerrainQuery + ?Sized,
        R: Rng + ?Sized,
    {
        if !self.runtime.is_active() {
            return None;
        }
        self.runtime.tick += 1;

        let origin = self.runtime.position;
        let allow_revisit = is_stuck(origin, &self.runtime.explored);
        let state = self.current_state(terrain);

        let input = PolicyInput {
            state,
            position: origin,
            explored: &self.runtime.explored,
            allow_revisit,
            exploration_rate: self.exploration_rate,
        };
        let action = self.policy.choose_action(&input, &self.table, rng);

        let (outcome, reached_exit) = self.attempt_move(terrain, action.apply(origin));

        self.runtime.time_remaining -= 1;

        let position = self.runtime.position;
        let on_fire = is_on_fire(terrain, position);
        let close_to_fire = is_close_to_fire(terrain, position);
        if on_fire {
            self.runtime.take_damage(self.config.health_decay_near_fire * 2.0);
        } else if close_to_fire {
            self.runtime.take_damage(self.config.health_decay_near_fire);
        }

        let timed_out = self.runtime.time_remaining <= 0;
        let current_distance = self.objective_distance(terrain, position);
        let reward = self.config.reward.compute(&Transition {
            prior_distance: self.runtime.previous_distance,
            current_distance,
            outcome,
            on_fire,
            close_to_fire,
            reached_exit,
            // Reaching the exit on the last tick still counts as a rescue.
            timed_out: timed_out && !reached_exit,
        });

        let next_state = self.current_state(terrain);
        self.table.update(state, action, reward, next_state);

        self.exploration_rate = (self.exploration_rate * self.config.exploration_decay_rate)
            .max(self.config.min_exploration_rate);
        self.runtime.previous_distance = current_distance;
        self.episode_reward += reward;

        if reached_exit {
            info!("Exit reached at {} on tick {}", position, self.runtime.tick);
            self.runtime.phase = EpisodePhase::Terminated(TerminalReason::ExitReached);
        } else if timed_out {
            info!("Time out at {} on tick {}", position, self.runtime.tick);
            self.runtime.phase = EpisodePhase::Terminated(TerminalReason::TimedOut);
        }

        Some(TickReport {
            tick: self.runtime.tick,
            action,
            outcome,
            position,
            state,
            next_state,
            reward,
            health: self.runtime.health,
            on_fire,
            close_to_fire,
            time_remaining: self.runtime.time_remaining,
            exploration_rate: self.exploration_rate,
            phase: self.runtime.phase,
        })
    }

    /// Moves the agent if the target is passable. Returns the outcome and
    /// whether the new cell is an exit.
    fn attempt_move<T: TerrainQuery + ?Sized>(&mut self, terrain: &T, target: Cell) -> (MoveOutcome, bool) {
        if !terrain.is_passable(target) {
            return (MoveOutcome::Blocked, false);
        }

        self.runtime.position = target;
        self.runtime.explored.insert(target);

        if !self.runtime.hostage_found && target == self.hostage {
            info!("Hostage found at {} on tick {}", target, self.runtime.tick);
            self.runtime.hostage_found = true;
            self.runtime.phase = EpisodePhase::HostageFound;
            // The objective switches to the exits; progress restarts from here.
            self.runtime.previous_distance =
                Self::nearest_exit_distance(terrain, terrain.cell_to_world(target)).unwrap_or(0.0);
        }

        let reached_exit = terrain.exits().contains(&target);
        (MoveOutcome::Moved, reached_exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Layout, TerrainGrid};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn controller(layout: &Layout, config: AgentConfig) -> AgentController {
        AgentController::new(
            config,
            &layout.terrain,
            layout.agent_start.unwrap(),
            layout.hostage.unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_missing_exits() {
        let grid = TerrainGrid::new(3, 3);
        let result = AgentController::new(
            AgentConfig::default(),
            &grid,
            Cell::new(0, 0),
            Cell::new(2, 2),
        );
        assert!(matches!(result, Err(SimError::MissingExits)));
    }

    #[test]
    fn test_rejects_start_in_wall() {
        let mut grid = TerrainGrid::new(3, 3);
        grid.add_exit(Cell::new(2, 2)).unwrap();
        grid.add_wall(Cell::new(0, 0)).unwrap();
        let result = AgentController::new(
            AgentConfig::default(),
            &grid,
            Cell::new(0, 0),
            Cell::new(1, 1),
        );
        assert!(matches!(result, Err(SimError::Blocked { what: "agent", .. })));
    }

    #[test]
    fn test_rejects_start_on_exit() {
        let mut grid = TerrainGrid::new(3, 3);
        grid.add_exit(Cell::new(0, 0)).unwrap();
        let result = AgentController::new(
            AgentConfig::default(),
            &grid,
            Cell::new(0, 0),
            Cell::new(2, 2),
        );
        assert!(matches!(result, Err(SimError::Blocked { what: "agent", .. })));
    }

    #[test]
    fn test_exit_on_last_tick_beats_timeout() {
        let layout = Layout::parse(
            "###\n\
             #AE\n\
             #H#\n",
        )
        .unwrap();
        let config = AgentConfig {
            time_limit: 1,
            ..AgentConfig::default()
        };

        let mut exits = 0;
        for seed in 0..64 {
            let mut agent = controller(&layout, config.clone());
            let mut rng = StdRng::seed_from_u64(seed);
            let report = agent.tick(&layout.terrain, &mut rng).unwrap();
            assert_eq!(report.time_remaining, 0);
            if report.action != Action::Right {
                assert_eq!(report.phase, EpisodePhase::Terminated(TerminalReason::TimedOut));
                continue;
            }
            exits += 1;
            assert_eq!(report.phase, EpisodePhase::Terminated(TerminalReason::ExitReached));
            assert!(report.reward >= 100.0 - 0.04 - 1e-4);
        }
        assert!(exits > 0);
    }

    #[test]
    fn test_hostage_tick_measures_progress_from_exit() {
        let layout = Layout::parse(
            "######\n\
             #AH.E#\n\
             ######\n",
        )
        .unwrap();
        let config = AgentConfig {
            time_limit: 500,
            ..AgentConfig::default()
        };
        let mut agent = controller(&layout, config);
        let mut rng = StdRng::seed_from_u64(11);

        let found = loop {
            let report = agent.tick(&layout.terrain, &mut rng).unwrap();
            if report.phase == EpisodePhase::HostageFound {
                break report;
            }
        };
        assert_eq!(found.position, Cell::new(2, 1));
        assert_eq!(found.tick, agent.runtime().tick);
        // Exit is two cells away both before and after scoring: no progress term.
        assert!((found.reward + 0.04).abs() < 1e-5);
        assert!((agent.runtime().previous_distance - 2.0).abs() < 1e-5);

        let next = agent.tick(&layout.terrain, &mut rng).unwrap();
        if next.position == Cell::new(3, 1) {
            assert!((next.reward - (5.0 - 0.04)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_blocked_move_is_penalised_and_keeps_position() {
        // Walls on three sides of the start; walls are never explored so
        // bumping into them stays a candidate.
        let layout = Layout::parse(
            "#####\n\
             #A..#\n\
             ##H.#\n\
             ###E#\n",
        )
        .unwrap();
        let mut agent = controller(&layout, AgentConfig::default());
        let mut rng = StdRng::seed_from_u64(0);

        let mut saw_blocked = false;
        for _ in 0..10 {
            let before = agent.runtime().position;
            let Some(report) = agent.tick(&layout.terrain, &mut rng) else {
                break;
            };
            if report.outcome == MoveOutcome::Blocked {
                saw_blocked = true;
                assert_eq!(report.position, before);
                assert!(report.reward <= -5.04 + 1e-4);
            }
        }
        assert!(saw_blocked);
    }

    #[test]
    fn test_corridor_rescue_and_exit() {
        // Explored cells behind the agent are never candidates in a corridor,
        // so it can only bump walls or advance.
        let layout = Layout::parse(
            "#######\n\
             #A.H.E#\n\
             #######\n",
        )
        .unwrap();
        let config = AgentConfig {
            time_limit: 500,
            ..AgentConfig::default()
        };
        let mut agent = controller(&layout, config);
        let mut rng = StdRng::seed_from_u64(3);

        let mut reports = Vec::new();
        while let Some(report) = agent.tick(&layout.terrain, &mut rng) {
            reports.push(report);
        }

        let last = reports.last().unwrap();
        assert_eq!(last.phase, EpisodePhase::Terminated(TerminalReason::ExitReached));
        assert_eq!(last.position, Cell::new(5, 1));
        assert!(last.reward >= 100.0 - 0.04 - 1e-4);
        assert!(agent.runtime().hostage_found);
        assert!(!agent.is_active());
        assert!(agent.tick(&layout.terrain, &mut rng).is_none());
    }

    #[test]
    fn test_timeout_terminates_after_time_limit() {
        let layout = Layout::parse(
            "A....\n\
             .....\n\
             ....H\n\
             #####\n\
             E....\n",
        )
        .unwrap();
        let config = AgentConfig {
            time_limit: 3,
            ..AgentConfig::default()
        };
        let mut agent = controller(&layout, config);
        let mut rng = StdRng::seed_from_u64(8);

        let mut ticks = 0;
        let mut last = None;
        while let Some(report) = agent.tick(&layout.terrain, &mut rng) {
            ticks += 1;
            last = Some(report);
        }
        let last = last.unwrap();
        assert_eq!(ticks, 3);
        assert_eq!(last.time_remaining, 0);
        assert_eq!(last.phase, EpisodePhase::Terminated(TerminalReason::TimedOut));
        assert!(last.reward <= -50.0 + 5.0 * 2.0);
    }

    #[test]
    fn test_fire_damage_and_low_health_state() {
        let mut layout = Layout::parse(
            "A....\n\
             .....\n\
             ....H\n\
             ....E\n",
        )
        .unwrap();
        // Surround the start so every move lands next to or in fire.
        for cell in [Cell::new(0, 1), Cell::new(1, 0), Cell::new(1, 1), Cell::new(2, 0), Cell::new(0, 2)] {
            layout.terrain.set_fire(cell);
        }
        let config = AgentConfig {
            health_decay_near_fire: 45.0,
            ..AgentConfig::default()
        };
        let mut agent = controller(&layout, config);
        let mut rng = StdRng::seed_from_u64(4);

        let report = agent.tick(&layout.terrain, &mut rng).unwrap();
        assert!(report.on_fire || report.close_to_fire);
        let expected = if report.on_fire { 10.0 } else { 55.0 };
        assert!((report.health - expected).abs() < 1e-4);

        let report = agent.tick(&layout.terrain, &mut rng).unwrap();
        assert!(report.health <= 10.0);
        assert_eq!(
            report.next_state.hazard,
            crate::rl::encoder::HazardLevel::LowHealth
        );
    }

    #[test]
    fn test_exploration_rate_decays_to_floor() {
        let layout = Layout::parse(
            "A....\n\
             .....\n\
             ....H\n\
             #####\n\
             E....\n",
        )
        .unwrap();
        let config = AgentConfig {
            time_limit: 100,
            ..AgentConfig::default()
        };
        let mut agent = controller(&layout, config);
        let mut rng = StdRng::seed_from_u64(5);

        agent.tick(&layout.terrain, &mut rng);
        assert!((agent.exploration_rate() - 0.75).abs() < 1e-6);
        for _ in 0..40 {
            agent.tick(&layout.terrain, &mut rng);
        }
        assert!((agent.exploration_rate() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_reset_keeps_learning() {
        let layout = Layout::parse(
            "#######\n\
             #A.H.E#\n\
             #######\n",
        )
        .unwrap();
        let mut agent = controller(&layout, AgentConfig::default());
        let mut rng = StdRng::seed_from_u64(6);
        while agent.tick(&layout.terrain, &mut rng).is_some() {}

        let learned: Vec<f32> = agent.table().iter().flat_map(|(_, row)| *row).collect();
        assert!(learned.iter().any(|v| *v != 0.0));

        agent.reset_episode(&layout.terrain);
        assert!(agent.is_active());
        assert_eq!(agent.runtime().position, Cell::new(1, 1));
        assert!(!agent.runtime().hostage_found);
        assert_eq!(agent.episode_reward(), 0.0);
        let after: Vec<f32> = agent.table().iter().flat_map(|(_, row)| *row).collect();
        assert!(after.iter().any(|v| *v != 0.0));
    }
}
