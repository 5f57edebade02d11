//! Role-recruitment model: agents random-walk on a torus and change roles
//! when they meet, forming leader/follower groups.

mod role;

pub use role::{Role, RoleCounts};

use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shared::{Grid, Position};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{ConfigError, RecruitmentConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: usize,
    pub pos: Position,
    pub role: Role,
}

pub struct RecruitmentModel {
    pub tick: u64,
    grid: Grid,
    config: RecruitmentConfig,
    agents: Vec<Agent>,
    /// Leader id to follower ids.
    groups: HashMap<usize, Vec<usize>>,
    /// Agent ids per occupied cell.
    occupancy: HashMap<Position, Vec<usize>>,
    max_group_size: usize,
    rng: ChaCha8Rng,
    history: Vec<RoleCounts>,
}

impl RecruitmentModel {
    pub fn new(config: &RecruitmentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.agents as usize;
        let grid = Grid::new(config.size, config.size, config.topology, true);

        let mut model = Self {
            tick: 0,
            grid,
            config: config.clone(),
            agents: Vec::with_capacity(n),
            groups: HashMap::new(),
            occupancy: HashMap::new(),
            max_group_size: ((config.group_fraction * n as f32).round() as usize).max(1),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            history: Vec::new(),
        };

        let unassigned = n / 2;
        let leaders = ((n / 2) as f32 * config.leader_ratio) as usize;
        let pheromone = n - unassigned - leaders;
        for (role, count) in [
            (Role::Unassigned, unassigned),
            (Role::Leader, leaders),
            (Role::Pheromone, pheromone),
        ] {
            for _ in 0..count {
                model.add_agent(role);
            }
        }

        info!(
            agents = n,
            unassigned,
            leaders,
            pheromone,
            max_group_size = model.max_group_size,
            "recruitment model ready"
        );
        Ok(model)
    }

    /// Adds an agent with `role` at a random cell and returns its id.
    pub fn add_agent(&mut self, role: Role) -> usize {
        let id = self.agents.len();
        let pos = Position::new(
            self.rng.random_range(0..self.grid.width as i32),
            self.rng.random_range(0..self.grid.height as i32),
        );
        self.agents.push(Agent { id, pos, role });
        self.occupancy.entry(pos).or_default().push(id);
        id
    }

    /// Every agent walks to a random neighbour and then acts on one random
    /// cellmate, in a fresh random order each step.
    pub fn step(&mut self) -> RoleCounts {
        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.shuffle(&mut self.rng);

        for id in order {
            self.walk(id);
            self.act(id);
        }

        let counts = self.role_counts();
        self.history.push(counts);

        if self.config.grow {
            self.add_agent(Role::Unassigned);
        }
        self.tick += 1;
        debug!(tick = self.tick, ?counts, "recruitment step");
        counts
    }

    pub fn run(&mut self, steps: u64) -> &[RoleCounts] {
        for _ in 0..steps {
            self.step();
        }
        &self.history
    }

    fn walk(&mut self, id: usize) {
        let from = self.agents[id].pos;
        let Some(&to) = self.grid.neighbors(from).choose(&mut self.rng) else {
            return;
        };
        if let Some(ids) = self.occupancy.get_mut(&from) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.occupancy.remove(&from);
            }
        }
        self.occupancy.entry(to).or_default().push(id);
        self.agents[id].pos = to;
    }

    fn random_cellmate(&mut self, id: usize) -> Option<usize> {
        let pos = self.agents[id].pos;
        let mates: Vec<usize> = self
            .occupancy
            .get(&pos)?
            .iter()
            .copied()
            .filter(|&other| other != id)
            .collect();
        mates.choose(&mut self.rng).copied()
    }

    fn act(&mut self, id: usize) {
        let role = self.agents[id].role;
        if let Role::Follower { .. } = role {
            return;
        }
        let Some(other) = self.random_cellmate(id) else {
            return;
        };
        let other_role = self.agents[other].role;
        let roll: f32 = self.rng.random();

        match role {
            Role::Unassigned => match other_role {
                Role::Leader if roll < self.config.p_unassigned_to_follower => {
                    let group = self.groups.entry(other).or_default();
                    if group.len() < self.max_group_size {
                        group.push(id);
                        self.agents[id].role = Role::Follower { leader: other };
                    }
                }
                Role::Pheromone if roll < self.config.p_unassigned_to_pheromone => {
                    self.agents[id].role = Role::Pheromone;
                }
                _ => {}
            },
            Role::Leader => {
                let own_follower = other_role == Role::Follower { leader: id };
                if own_follower && roll < self.config.p_follower_to_leader {
                    self.disband(id, Role::Leader);
                } else if !own_follower && roll < self.config.p_leader_to_unassigned {
                    self.disband(id, Role::Unassigned);
                }
            }
            Role::Pheromone => {
                if other_role != Role::Pheromone && roll < self.config.p_pheromone_to_unassigned {
                    self.agents[id].role = Role::Unassigned;
                }
            }
            Role::Follower { .. } => {}
        }
    }

    /// Gives `leader` and all its followers the role `role` and dissolves the
    /// group.
    fn disband(&mut self, leader: usize, role: Role) {
        let followers = self.groups.remove(&leader).unwrap_or_default();
        debug!(leader, size = followers.len(), role = role.name(), "group disbanded");
        for follower in followers {
            self.agents[follower].role = role;
        }
        self.agents[leader].role = role;
    }

    pub fn role_counts(&self) -> RoleCounts {
        self.agents.iter().map(|a| a.role).collect()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Followers of `leader`, empty when it leads none.
    pub fn group(&self, leader: usize) -> &[usize] {
        self.groups.get(&leader).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn max_group_size(&self) -> usize {
        self.max_group_size
    }

    /// Role counts recorded after each step.
    pub fn history(&self) -> &[RoleCounts] {
        &self.history
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_groups_consistent(model: &RecruitmentModel) {
        for agent in model.agents() {
            match agent.role {
                Role::Follower { leader } => {
                    assert_eq!(model.agents()[leader].role, Role::Leader);
                    assert!(model.group(leader).contains(&agent.id));
                }
                Role::Leader => {
                    let group = model.group(agent.id);
                    assert!(group.len() <= model.max_group_size());
                    for &f in group {
                        assert_eq!(model.agents()[f].role, Role::Follower { leader: agent.id });
                    }
                }
                _ => assert!(model.group(agent.id).is_empty()),
            }
        }
    }

    #[test]
    fn test_initial_division() {
        let model = RecruitmentModel::new(&RecruitmentConfig::default()).unwrap();
        let counts = model.role_counts();
        assert_eq!(counts.unassigned, 5);
        assert_eq!(counts.leaders, 2);
        assert_eq!(counts.pheromone, 3);
        assert_eq!(counts.followers, 0);
        assert_eq!(model.max_group_size(), 10);
    }

    #[test]
    fn test_odd_population_division() {
        let config = RecruitmentConfig {
            agents: 7,
            leader_ratio: 1.0,
            group_fraction: 0.01,
            ..RecruitmentConfig::default()
        };
        let model = RecruitmentModel::new(&config).unwrap();
        let counts = model.role_counts();
        assert_eq!((counts.unassigned, counts.leaders, counts.pheromone), (3, 3, 1));
        assert_eq!(model.max_group_size(), 1);
    }

    #[test]
    fn test_counts_sum_and_groups_stay_consistent() {
        let config = RecruitmentConfig {
            agents: 40,
            size: 5,
            ..RecruitmentConfig::default()
        };
        let mut model = RecruitmentModel::new(&config).unwrap();
        for _ in 0..300 {
            let counts = model.step();
            assert_eq!(counts.total(), 40);
            assert_groups_consistent(&model);
        }
        assert_eq!(model.history().len(), 300);
    }

    #[test]
    fn test_agents_stay_on_torus() {
        let config = RecruitmentConfig {
            agents: 12,
            size: 3,
            topology: shared::Topology::EightConnected,
            ..RecruitmentConfig::default()
        };
        let mut model = RecruitmentModel::new(&config).unwrap();
        model.run(50);
        let occupied: usize = model.agents().iter().filter(|a| model.grid().contains(a.pos)).count();
        assert_eq!(occupied, 12);
    }

    #[test]
    fn test_grow_adds_unassigned() {
        let config = RecruitmentConfig {
            grow: true,
            p_unassigned_to_follower: 0.0,
            p_unassigned_to_pheromone: 0.0,
            p_pheromone_to_unassigned: 0.0,
            p_leader_to_unassigned: 0.0,
            ..RecruitmentConfig::default()
        };
        let mut model = RecruitmentModel::new(&config).unwrap();
        model.run(5);
        assert_eq!(model.agents().len(), 15);
        assert_eq!(model.role_counts().unassigned, 10);
    }

    #[test]
    fn test_certain_transitions() {
        // Only unassigned and pheromone agents, everyone converts on contact.
        let config = RecruitmentConfig {
            agents: 20,
            size: 2,
            leader_ratio: 0.0,
            p_unassigned_to_pheromone: 1.0,
            p_pheromone_to_unassigned: 0.0,
            ..RecruitmentConfig::default()
        };
        let mut model = RecruitmentModel::new(&config).unwrap();
        model.run(60);
        assert_eq!(model.role_counts().pheromone, 20);
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let config = RecruitmentConfig {
            p_follower_to_leader: 1.5,
            ..RecruitmentConfig::default()
        };
        assert!(matches!(
            RecruitmentModel::new(&config),
            Err(ConfigError::InvalidProbability { field: "p_follower_to_leader", .. })
        ));
    }
}
