use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::{Grid, Position, Topology};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Largest grid side. Coordinates are signed 32-bit.
pub const MAX_GRID_SIDE: u32 = i32::MAX as u32;

/// Errors raised when a configuration describes an impossible world.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },
    #[error("grid {width}x{height} is too large, sides are limited to {}", MAX_GRID_SIDE)]
    GridTooLarge { width: u32, height: u32 },
    #[error("decay {0} must lie strictly between 0 and 1")]
    InvalidDecay(f32),
    #[error("diffusion sigma {0} must be finite and non-negative")]
    InvalidSigma(f32),
    #[error("at least one colony is required")]
    NoColonies,
    #[error("{what} at ({}, {}) lies outside the {width}x{height} grid", .pos.x, .pos.y)]
    OutOfBounds {
        what: &'static str,
        pos: Position,
        width: u32,
        height: u32,
    },
    #[error("colony {index}: {field} must be non-negative, got {value}")]
    NegativeColonyValue {
        index: usize,
        field: &'static str,
        value: f32,
    },
    #[error("food amount {amount} at ({}, {}) must be non-negative", .pos.x, .pos.y)]
    NegativeFood { pos: Position, amount: f32 },
    #[error("obstacle at ({}, {}) overlaps a colony or a food source", .pos.x, .pos.y)]
    ObstacleOnOccupiedCell { pos: Position },
    #[error("agent memory must hold at least one position")]
    ZeroMemory,
    #[error("agent parameter {field} must be finite and non-negative, got {value}")]
    InvalidAgentParameter { field: &'static str, value: f32 },
    #[error("probability {field} = {value} must lie in [0, 1]")]
    InvalidProbability { field: &'static str, value: f32 },
    #[error("recruitment model needs a positive grid size and at least one agent")]
    EmptyRecruitment,
}

/// A colony to found at start-up.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ColonyConfig {
    pub position: Position,
    pub radius: f32,
    pub initial_food: f32,
    pub ants: u32,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            position: Position::new(13, 13),
            radius: 1.0,
            initial_food: 1000.0,
            ants: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FoodConfig {
    pub position: Position,
    #[serde(default = "default_food_amount")]
    pub amount: f32,
}

fn default_food_amount() -> f32 {
    crate::simulation::DEFAULT_FOOD_AMOUNT
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ObstacleSpec {
    pub position: Position,
    #[serde(default = "default_obstacle_cost")]
    pub cost: i32,
}

fn default_obstacle_cost() -> i32 {
    -1
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Obstacles scattered on free cells at start-up.
    pub random: u32,
    /// Cost given to every randomly placed obstacle. Negative means impassable.
    pub random_cost: i32,
    pub placed: Vec<ObstacleSpec>,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            random: 10,
            random_cost: -1,
            placed: Vec::new(),
        }
    }
}

/// Behaviour and trait distribution of foraging ants.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Weight of the directional bias against the pheromone bias. 0 disables it.
    pub persistence: f32,
    /// Length of the recent-position window used for the directional bias.
    pub memory: usize,
    /// Added to every neighbour's intensity so that unmarked cells stay reachable.
    pub exploration_bias: f32,
    pub carry_capacity_mean: f32,
    pub carry_capacity_sd: f32,
    pub max_energy_mean: f32,
    pub max_energy_sd: f32,
    pub consumption_mean: f32,
    pub consumption_sd: f32,
    pub consumption_floor: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persistence: 0.0,
            memory: 3,
            exploration_bias: 0.1,
            carry_capacity_mean: 10.0,
            carry_capacity_sd: 1.0,
            max_energy_mean: 15.0,
            max_energy_sd: 1.0,
            consumption_mean: 0.05,
            consumption_sd: 0.05,
            consumption_floor: 0.01,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub topology: Topology,
    pub wrap: bool,
    /// Multiplier applied to every cell after diffusion, in (0, 1).
    pub decay: f32,
    /// Standard deviation of the diffusion kernel, in cells. 0 disables diffusion.
    pub sigma: f32,
    pub births: bool,
    pub deaths: bool,
    /// Keep dead ants in the arena for post-mortem reporting.
    pub retain_dead: bool,
    pub colonies: Vec<ColonyConfig>,
    pub food: Vec<FoodConfig>,
    pub obstacles: ObstacleConfig,
    pub agents: AgentConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let food = [(5, 5), (20, 5), (14, 24)]
            .into_iter()
            .map(|(x, y)| FoodConfig {
                position: Position::new(x, y),
                amount: default_food_amount(),
            })
            .collect();
        Self {
            seed: 42,
            width: 26,
            height: 26,
            topology: Topology::FourConnected,
            wrap: false,
            decay: 0.99,
            sigma: 0.2,
            births: true,
            deaths: true,
            retain_dead: true,
            colonies: vec![ColonyConfig::default()],
            food,
            obstacles: ObstacleConfig::default(),
            agents: AgentConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.width, self.height, self.topology, self.wrap)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(ConfigError::GridTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(ConfigError::InvalidDecay(self.decay));
        }
        if !(self.sigma >= 0.0 && self.sigma.is_finite()) {
            return Err(ConfigError::InvalidSigma(self.sigma));
        }
        if self.colonies.is_empty() {
            return Err(ConfigError::NoColonies);
        }

        let grid = self.grid();
        let in_bounds = |what: &'static str, pos: Position| {
            if grid.contains(pos) {
                Ok(())
            } else {
                Err(ConfigError::OutOfBounds {
                    what,
                    pos,
                    width: self.width,
                    height: self.height,
                })
            }
        };

        for (index, colony) in self.colonies.iter().enumerate() {
            in_bounds("colony", colony.position)?;
            for (field, value) in [
                ("radius", colony.radius),
                ("initial_food", colony.initial_food),
            ] {
                if !(value >= 0.0) {
                    return Err(ConfigError::NegativeColonyValue {
                        index,
                        field,
                        value,
                    });
                }
            }
        }
        for food in &self.food {
            in_bounds("food", food.position)?;
            if !(food.amount >= 0.0) {
                return Err(ConfigError::NegativeFood {
                    pos: food.position,
                    amount: food.amount,
                });
            }
        }
        for obstacle in &self.obstacles.placed {
            in_bounds("obstacle", obstacle.position)?;
            let on_food = self.food.iter().any(|f| f.position == obstacle.position);
            let on_colony = self
                .colonies
                .iter()
                .any(|c| grid.distance(c.position, obstacle.position) <= c.radius);
            if on_food || on_colony {
                return Err(ConfigError::ObstacleOnOccupiedCell {
                    pos: obstacle.position,
                });
            }
        }

        self.agents.validate()
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        for (field, value) in [
            ("persistence", self.persistence),
            ("exploration_bias", self.exploration_bias),
            ("carry_capacity_mean", self.carry_capacity_mean),
            ("carry_capacity_sd", self.carry_capacity_sd),
            ("max_energy_mean", self.max_energy_mean),
            ("max_energy_sd", self.max_energy_sd),
            ("consumption_mean", self.consumption_mean),
            ("consumption_sd", self.consumption_sd),
            ("consumption_floor", self.consumption_floor),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidAgentParameter { field, value });
            }
        }
        Ok(())
    }
}

/// Parameters of the role-recruitment model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RecruitmentConfig {
    pub seed: u64,
    /// Initial number of agents.
    pub agents: u32,
    /// Maximum group size relative to the initial population.
    pub group_fraction: f32,
    /// Side length of the square torus.
    pub size: u32,
    pub topology: Topology,
    pub p_unassigned_to_follower: f32,
    pub p_pheromone_to_unassigned: f32,
    pub p_unassigned_to_pheromone: f32,
    pub p_follower_to_leader: f32,
    pub p_leader_to_unassigned: f32,
    /// Share of leaders in the non-unassigned half of the initial population.
    pub leader_ratio: f32,
    /// Add one unassigned agent every step.
    pub grow: bool,
}

impl Default for RecruitmentConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            agents: 10,
            group_fraction: 1.0,
            size: 10,
            topology: Topology::FourConnected,
            p_unassigned_to_follower: 0.5,
            p_pheromone_to_unassigned: 0.1,
            p_unassigned_to_pheromone: 0.5,
            p_follower_to_leader: 0.8,
            p_leader_to_unassigned: 0.05,
            leader_ratio: 0.5,
            grow: false,
        }
    }
}

impl RecruitmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 || self.agents == 0 {
            return Err(ConfigError::EmptyRecruitment);
        }
        if self.size > MAX_GRID_SIDE {
            return Err(ConfigError::GridTooLarge {
                width: self.size,
                height: self.size,
            });
        }
        for (field, value) in [
            ("p_unassigned_to_follower", self.p_unassigned_to_follower),
            ("p_pheromone_to_unassigned", self.p_pheromone_to_unassigned),
            ("p_unassigned_to_pheromone", self.p_unassigned_to_pheromone),
            ("p_follower_to_leader", self.p_follower_to_leader),
            ("p_leader_to_unassigned", self.p_leader_to_unassigned),
            ("leader_ratio", self.leader_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }
        if !(self.group_fraction >= 0.0 && self.group_fraction.is_finite()) {
            return Err(ConfigError::InvalidAgentParameter {
                field: "group_fraction",
                value: self.group_fraction,
            });
        }
        Ok(())
    }
}

/// Contents of a configuration file: the foraging world plus the optional
/// recruitment model section.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub recruitment: RecruitmentConfig,
}

/// Loads the configuration from a TOML file or uses defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => {
            info!("no config file provided, using defaults");
            Ok(AppConfig::default())
        }
    }
}
