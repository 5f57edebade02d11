use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shared::{AgentView, ColonyView, FoodView, Grid, ObstacleView, Position};
use slotmap::{Key, SlotMap};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::config::{ColonyConfig, ConfigError, SimulationConfig};

use super::ant::{Ant, AntKey, AntRules};
use super::colony::Colony;
use super::map::GameMap;
use super::pathfind::{self, ColonyPaths};
use super::{MAX_PLACEMENT_ATTEMPTS, Obstacle, PheromoneField};

pub struct Simulation {
    pub tick: u64,
    pub map: GameMap,
    pub pheromones: PheromoneField,
    pub colonies: BTreeMap<u32, Colony>,
    pub ants: SlotMap<AntKey, Ant>,
    pub config: SimulationConfig,
    rules: AntRules,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Builds the world described by `config`: food, explicit obstacles,
    /// colonies with their founding ants, then randomly scattered obstacles.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = config.grid();

        let mut map = GameMap::new(grid);
        for food in &config.food {
            map.place_food_at(food.position, food.amount);
        }
        for spec in &config.obstacles.placed {
            if !map.place_obstacle(Obstacle::new(spec.position, spec.cost)) {
                warn!(
                    x = spec.position.x,
                    y = spec.position.y,
                    "duplicate obstacle ignored"
                );
            }
        }

        let mut sim = Self {
            tick: 0,
            map,
            pheromones: PheromoneField::new(grid, config.decay, config.sigma),
            colonies: BTreeMap::new(),
            ants: SlotMap::with_key(),
            config: config.clone(),
            rules: AntRules::from(config),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        };

        for (id, colony_cfg) in config.colonies.iter().enumerate() {
            sim.spawn_colony(id as u32, colony_cfg);
        }
        sim.scatter_obstacles(config.obstacles.random, config.obstacles.random_cost);

        info!(
            width = grid.width,
            height = grid.height,
            colonies = sim.colonies.len(),
            ants = sim.ants.len(),
            obstacles = sim.map.obstacles().len(),
            seed = config.seed,
            "simulation ready"
        );
        Ok(sim)
    }

    fn spawn_colony(&mut self, colony_id: u32, cfg: &ColonyConfig) {
        let mut colony = Colony::new(colony_id, cfg.position, cfg.radius, cfg.initial_food);
        colony.spawn_ants(&mut self.ants, &self.config.agents, cfg.ants, &mut self.rng);
        info!(
            colony = colony_id,
            x = cfg.position.x,
            y = cfg.position.y,
            ants = cfg.ants,
            stash = cfg.initial_food,
            "colony spawned"
        );
        self.colonies.insert(colony_id, colony);
    }

    /// Places `count` obstacles on free cells away from every colony. Gives
    /// up after a bounded number of draws when the grid is too crowded.
    fn scatter_obstacles(&mut self, count: u32, cost: i32) {
        let grid = *self.map.grid();
        let mut placed = 0;
        let mut attempts = 0;
        while placed < count {
            if attempts >= MAX_PLACEMENT_ATTEMPTS {
                warn!(
                    placed,
                    requested = count,
                    "no free cell left for random obstacles"
                );
                break;
            }
            attempts += 1;

            let pos = Position::new(
                self.rng.random_range(0..grid.width as i32),
                self.rng.random_range(0..grid.height as i32),
            );
            if !self.map.is_empty_at(pos)
                || self.colonies.values().any(|c| c.on_colony(pos, &grid))
            {
                continue;
            }
            if self.map.place_obstacle(Obstacle::new(pos, cost)) {
                placed += 1;
            }
        }
        debug!(placed, attempts, "random obstacles placed");
    }

    /// Advances the world by one step.
    pub fn step(&mut self) {
        self.pheromones.step();

        if self.config.births {
            let mut colony_ids: Vec<u32> = self.colonies.keys().copied().collect();
            colony_ids.shuffle(&mut self.rng);
            for colony_id in colony_ids {
                if let Some(colony) = self.colonies.get_mut(&colony_id) {
                    colony.ant_birth(&mut self.ants, &self.config.agents, &mut self.rng);
                }
            }
        }

        let mut order: Vec<AntKey> = self
            .ants
            .iter()
            .filter(|(_, ant)| !ant.is_dead())
            .map(|(key, _)| key)
            .collect();
        order.shuffle(&mut self.rng);

        let mut deaths = 0;
        for key in order {
            let Some(ant) = self.ants.get_mut(key) else {
                continue;
            };
            let Some(colony) = self.colonies.get_mut(&ant.ant_ref.colony_id) else {
                warn!(ant = ?ant.ant_ref, "ant belongs to an unknown colony");
                continue;
            };
            ant.update(
                colony,
                &mut self.map,
                &mut self.pheromones,
                &self.rules,
                &mut self.rng,
            );
            if ant.is_dead() {
                deaths += 1;
            }
        }

        self.count_encounters();

        if !self.config.retain_dead {
            self.ants.retain(|_, ant| !ant.is_dead());
            for colony in self.colonies.values_mut() {
                colony.forget_dead(&self.ants);
            }
        }

        self.tick += 1;
        debug!(
            tick = self.tick,
            live = self.live_count(),
            deaths,
            pending_deposits = self.pheromones.pending(),
            "step complete"
        );
    }

    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Adds, for every live ant, the number of other live ants on its cell.
    fn count_encounters(&mut self) {
        let mut occupancy: HashMap<Position, u32> = HashMap::new();
        for ant in self.ants.values().filter(|a| !a.is_dead()) {
            *occupancy.entry(ant.pos).or_default() += 1;
        }
        for ant in self.ants.values_mut().filter(|a| !a.is_dead()) {
            ant.encounters += occupancy.get(&ant.pos).map_or(0, |n| n.saturating_sub(1));
        }
    }

    pub fn grid(&self) -> &Grid {
        self.map.grid()
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    pub fn get_ant(&self, key: AntKey) -> Option<&Ant> {
        self.ants.get(key)
    }

    pub fn live_count(&self) -> usize {
        self.ants.values().filter(|a| !a.is_dead()).count()
    }

    pub fn dead_count(&self) -> usize {
        self.ants.len() - self.live_count()
    }

    pub fn total_ant_count(&self) -> usize {
        self.ants.len()
    }

    pub fn pheromone_snapshot(&self) -> Vec<Vec<f32>> {
        self.pheromones.snapshot()
    }

    /// Live ants.
    pub fn agents(&self) -> Vec<AgentView> {
        self.ants
            .values()
            .filter(|a| !a.is_dead())
            .map(Ant::view)
            .collect()
    }

    /// Every ant still in the arena, dead ones included.
    pub fn all_agents(&self) -> Vec<AgentView> {
        self.ants.values().map(Ant::view).collect()
    }

    pub fn colonies(&self) -> Vec<ColonyView> {
        self.colonies.values().map(|c| c.view(&self.ants)).collect()
    }

    pub fn obstacles(&self) -> Vec<ObstacleView> {
        self.map.obstacle_views()
    }

    pub fn food_sources(&self) -> Vec<FoodView> {
        self.map.food_sources()
    }

    /// Completed trip lengths keyed by ant id.
    pub fn path_lengths(&self) -> Vec<(u64, Vec<usize>)> {
        self.ants
            .iter()
            .map(|(key, ant)| (key.data().as_ffi(), ant.path_lengths.clone()))
            .collect()
    }

    /// Shortest trails above `threshold` from every colony to every
    /// remaining food source.
    pub fn find_paths(&self, threshold: f32) -> Vec<ColonyPaths> {
        let colonies: Vec<(u32, Position)> =
            self.colonies.values().map(|c| (c.colony_id, c.pos)).collect();
        let food: Vec<Position> = self.food_sources().iter().map(|f| f.position).collect();
        pathfind::find_paths(&self.map, &self.pheromones, threshold, &colonies, &food)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FoodConfig, ObstacleSpec};
    use shared::AntState;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.width = 12;
        config.height = 12;
        config.colonies = vec![ColonyConfig {
            position: Position::new(6, 6),
            ants: 10,
            ..ColonyConfig::default()
        }];
        config.food = vec![FoodConfig {
            position: Position::new(2, 2),
            amount: 30.0,
        }];
        config.obstacles.random = 4;
        config
    }

    #[test]
    fn test_default_world_layout() {
        let sim = Simulation::new(&SimulationConfig::default()).unwrap();
        assert_eq!(sim.total_ant_count(), 30);
        assert_eq!(sim.colonies.len(), 1);
        assert_eq!(sim.food_sources().len(), 3);
        assert_eq!(sim.obstacles().len(), 10);
        let grid = *sim.grid();
        let colony = &sim.colonies[&0];
        for obstacle in sim.obstacles() {
            assert!(!colony.on_colony(obstacle.position, &grid));
            assert!(!sim.map.has_food_at(obstacle.position));
            assert_eq!(obstacle.cost, -1);
        }
        assert!(sim.agents().iter().all(|a| a.position == Position::new(13, 13)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.decay = 1.0;
        assert_eq!(
            Simulation::new(&config).err(),
            Some(ConfigError::InvalidDecay(1.0))
        );
    }

    #[test]
    fn test_step_advances_tick_and_keeps_invariants() {
        let mut sim = Simulation::new(&small_config()).unwrap();
        for _ in 0..200 {
            sim.step();
            for ant in sim.ants.values() {
                assert!(sim.grid().contains(ant.pos));
                assert!(sim.map.is_passable(ant.pos));
                assert!(ant.carried_food >= 0.0);
                assert!(ant.carried_food <= ant.carry_capacity + 1e-4);
            }
            assert!(sim.pheromone_snapshot().iter().flatten().all(|&v| v >= 0.0));
            assert!(sim.colonies.values().all(|c| c.food_stash >= 0.0));
        }
        assert_eq!(sim.tick, 200);
    }

    #[test]
    fn test_no_births_keeps_population() {
        let mut config = small_config();
        config.births = false;
        config.deaths = false;
        let mut sim = Simulation::new(&config).unwrap();
        sim.run(50);
        assert_eq!(sim.total_ant_count(), 10);
        assert_eq!(sim.live_count(), 10);
    }

    #[test]
    fn test_births_grow_rich_colony() {
        let mut config = small_config();
        config.deaths = false;
        // Stash far above the endowment makes births almost certain.
        config.colonies[0].initial_food = 1.0;
        let mut sim = Simulation::new(&config).unwrap();
        sim.colonies.get_mut(&0).unwrap().food_stash = 1000.0;
        sim.run(5);
        assert!(sim.total_ant_count() > 10);
        assert_eq!(sim.colonies[&0].ants.len(), sim.total_ant_count());
    }

    #[test]
    fn test_starved_ants_are_pruned_without_retention() {
        let mut config = small_config();
        config.births = false;
        config.retain_dead = false;
        config.colonies[0].initial_food = 0.0;
        config.food.clear();
        config.agents.max_energy_mean = 0.5;
        config.agents.max_energy_sd = 0.0;
        config.agents.consumption_mean = 0.3;
        config.agents.consumption_sd = 0.0;
        let mut sim = Simulation::new(&config).unwrap();
        sim.run(5);
        assert_eq!(sim.total_ant_count(), 0);
        assert!(sim.colonies[&0].ants.is_empty());
        assert_eq!(sim.colonies()[0].population, 0);
    }

    #[test]
    fn test_dead_ants_are_retained_by_default() {
        let mut config = small_config();
        config.births = false;
        config.colonies[0].initial_food = 0.0;
        config.food.clear();
        config.agents.max_energy_mean = 0.5;
        config.agents.max_energy_sd = 0.0;
        config.agents.consumption_mean = 0.3;
        config.agents.consumption_sd = 0.0;
        let mut sim = Simulation::new(&config).unwrap();
        sim.run(5);
        assert_eq!(sim.live_count(), 0);
        assert_eq!(sim.dead_count(), 10);
        assert!(sim.all_agents().iter().all(|a| a.state == AntState::Dead));
        assert!(sim.agents().is_empty());
    }

    #[test]
    fn test_encounters_count_cell_mates() {
        let mut config = small_config();
        config.obstacles.random = 0;
        let mut sim = Simulation::new(&config).unwrap();
        let keys: Vec<AntKey> = sim.ants.keys().collect();
        for (i, key) in keys.iter().enumerate() {
            let ant = &mut sim.ants[*key];
            // Three ants share (0, 0); the rest are spread out on row 11.
            ant.pos = if i < 3 {
                Position::new(0, 0)
            } else {
                Position::new(i as i32, 11)
            };
        }
        sim.count_encounters();
        let counts: Vec<u32> = keys.iter().map(|k| sim.ants[*k].encounters).collect();
        assert_eq!(&counts[..3], &[2, 2, 2]);
        assert!(counts[3..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_random_obstacles_give_up_on_full_grid() {
        let mut config = SimulationConfig::default();
        config.width = 3;
        config.height = 1;
        config.colonies = vec![ColonyConfig {
            position: Position::new(0, 0),
            radius: 0.0,
            ants: 1,
            ..ColonyConfig::default()
        }];
        config.food = vec![FoodConfig {
            position: Position::new(2, 0),
            amount: 5.0,
        }];
        config.obstacles.random = 5;
        let sim = Simulation::new(&config).unwrap();
        assert_eq!(sim.obstacles().len(), 1);
        assert_eq!(sim.obstacles()[0].position, Position::new(1, 0));
    }

    #[test]
    fn test_explicit_obstacles_are_placed() {
        let mut config = small_config();
        config.obstacles.random = 0;
        config.obstacles.placed = vec![ObstacleSpec {
            position: Position::new(9, 9),
            cost: 2,
        }];
        let sim = Simulation::new(&config).unwrap();
        assert_eq!(
            sim.obstacles(),
            vec![ObstacleView {
                position: Position::new(9, 9),
                cost: 2
            }]
        );
        assert_eq!(sim.map.slowdown_at(Position::new(9, 9)), Some(2));
    }

    #[test]
    fn test_find_paths_uses_current_food() {
        let mut config = small_config();
        config.obstacles.random = 0;
        let mut sim = Simulation::new(&config).unwrap();
        for x in 2..=6 {
            sim.pheromones.data[6][x] = 1.0;
        }
        for y in 2..=6 {
            sim.pheromones.data[y][2] = 1.0;
        }
        let paths = sim.find_paths(0.5);
        assert_eq!(paths.len(), 1);
        let route = &paths[0].paths[0];
        assert_eq!(route.food, Position::new(2, 2));
        assert_eq!(route.path.len(), 9);
    }
}
