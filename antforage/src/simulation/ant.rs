use super::{
    Colony, GameMap, PERSISTENCE_MIN_SQUARED_LENGTH, PHEROMONE_DEPOSIT_AMOUNT, PheromoneField,
};
use crate::config::{AgentConfig, SimulationConfig};

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use shared::util::sample_normal;
use shared::{AgentView, AntState, Grid, Position};
use slotmap::{Key, new_key_type};
use std::collections::VecDeque;
use tracing::{debug, warn};

new_key_type! {
    /// Key for ant slotmap.
    pub struct AntKey;
}

/// Reference to an ant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AntRef {
    pub key: AntKey,
    pub colony_id: u32,
}

/// Behaviour switches shared by every ant of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AntRules {
    pub death: bool,
    pub persistence: f32,
    pub memory: usize,
    pub exploration_bias: f32,
}

impl From<&SimulationConfig> for AntRules {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            death: config.deaths,
            persistence: config.agents.persistence,
            memory: config.agents.memory.max(1),
            exploration_bias: config.agents.exploration_bias,
        }
    }
}

/// State of an ant.
pub struct Ant {
    pub ant_ref: AntRef,

    pub pos: Position,
    pub state: AntState,
    pub energy: f32,
    pub max_energy: f32,
    pub energy_consumption: f32,
    pub carried_food: f32,
    pub carry_capacity: f32,

    /// Cells visited since last leaving the colony, without loops.
    pub history: Vec<Position>,
    /// Sliding window of recent cells, oldest first.
    pub last_steps: VecDeque<Position>,
    /// Remaining idle steps imposed by an obstacle.
    pub slow_steps: u32,
    pub encounters: u32,
    /// Length of every completed colony-to-food trip.
    pub path_lengths: Vec<usize>,
}

impl Ant {
    /// Create a new ant with traits drawn from `traits`.
    pub fn new<R: Rng + ?Sized>(
        pos: Position,
        colony_id: u32,
        traits: &AgentConfig,
        rng: &mut R,
    ) -> Self {
        let ant_ref = AntRef {
            key: AntKey::null(),
            colony_id,
        };

        let carry_capacity =
            sample_normal(rng, traits.carry_capacity_mean, traits.carry_capacity_sd).abs();
        let max_energy = sample_normal(rng, traits.max_energy_mean, traits.max_energy_sd).abs();
        let energy_consumption =
            sample_normal(rng, traits.consumption_mean, traits.consumption_sd).abs()
                + traits.consumption_floor;

        Self {
            ant_ref,
            pos,
            state: AntState::Exploring,
            energy: max_energy,
            max_energy,
            energy_consumption,
            carried_food: 0.0,
            carry_capacity,
            history: vec![pos],
            last_steps: std::iter::repeat_n(pos, traits.memory.max(1)).collect(),
            slow_steps: 0,
            encounters: 0,
            path_lengths: Vec::new(),
        }
    }

    /// Advance the ant by one step.
    ///
    /// Order: move (or sit out an obstacle penalty), burn energy, pick up
    /// food, unload at the colony, and finally consider heading home early.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        colony: &mut Colony,
        map: &mut GameMap,
        pheromones: &mut PheromoneField,
        rules: &AntRules,
        rng: &mut R,
    ) {
        let moved = match self.state {
            AntState::Dead => return,
            _ if self.slow_steps > 0 => {
                self.slow_steps -= 1;
                false
            }
            AntState::Exploring => self.explore(map, pheromones, rules, rng),
            AntState::Returning => self.retrace(map, pheromones),
        };

        if moved {
            if let Some(cost) = map.slowdown_at(self.pos) {
                self.slow_steps = cost;
            }
        }

        if rules.death {
            self.metabolize(colony, map);
            if self.is_dead() {
                return;
            }
        }

        self.check_food(colony, map, rules);
        // A food cell emptied by refuelling is never picked up from, so the
        // ant stays out here; keep the trail back contiguous.
        if self.state == AntState::Exploring && self.history.last() != Some(&self.pos) {
            self.remember(self.pos, rules.memory);
        }
        self.check_colony(colony, map.grid(), rules);

        if rules.death {
            self.consider_refuel_trip(colony);
        }
    }

    /// Pick a neighbouring cell from the pheromone (and direction) bias and
    /// walk there. Returns false if every neighbour is blocked.
    fn explore<R: Rng + ?Sized>(
        &mut self,
        map: &GameMap,
        pheromones: &PheromoneField,
        rules: &AntRules,
        rng: &mut R,
    ) -> bool {
        let candidates = pheromones.neighbors(self.pos, map);
        if candidates.is_empty() {
            return false;
        }

        let probabilities = self.move_distribution(&candidates, map.grid(), rules);
        let idx = match WeightedIndex::new(&probabilities) {
            Ok(dist) => dist.sample(rng),
            // All-zero weights: every passable neighbour is equally likely.
            Err(_) => rng.random_range(0..candidates.len()),
        };

        self.advance(candidates[idx].0, map, rules.memory);
        true
    }

    /// Move probabilities over `candidates`. Weights are proportional to
    /// intensity plus the exploration bias, optionally blended with a
    /// preference for keeping the current heading.
    pub fn move_distribution(
        &self,
        candidates: &[(Position, f32)],
        grid: &Grid,
        rules: &AntRules,
    ) -> Vec<f32> {
        let n = candidates.len();
        let pheromone: Vec<f32> = candidates
            .iter()
            .map(|(_, intensity)| intensity.max(0.0) + rules.exploration_bias)
            .collect();
        let Some(mut probabilities) = normalized(pheromone) else {
            return vec![1.0 / n as f32; n];
        };

        if rules.persistence > 0.0 {
            if let Some(direction) = normalized(self.direction_scores(candidates, grid)) {
                for (p, d) in probabilities.iter_mut().zip(&direction) {
                    *p += rules.persistence * d;
                }
                if let Some(blended) = normalized(probabilities.clone()) {
                    probabilities = blended;
                }
            }
        }
        probabilities
    }

    /// Alignment of each candidate with the displacement since the oldest
    /// remembered position. Sideways and backward steps score zero.
    fn direction_scores(&self, candidates: &[(Position, f32)], grid: &Grid) -> Vec<f32> {
        let oldest = self.last_steps.front().copied().unwrap_or(self.pos);
        let (dx, dy) = grid.delta(oldest, self.pos);

        candidates
            .iter()
            .map(|&(candidate, _)| {
                let (sx, sy) = grid.delta(self.pos, candidate);
                // candidate - oldest
                let (vx, vy) = (dx + sx, dy + sy);
                if vx * vx + vy * vy > PERSISTENCE_MIN_SQUARED_LENGTH {
                    ((dx * vx + dy * vy) as f32).max(0.0)
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Step onto `target` and record it. Food cells are not recorded: the
    /// walk back starts from the cell before the food.
    fn advance(&mut self, target: Position, map: &GameMap, memory: usize) {
        self.move_to(target, map.grid());
        if !map.has_food_at(target) {
            self.remember(target, memory);
        }
    }

    /// Appends `pos` to the history, cutting out the loop if it was visited
    /// before, and slides the recent-position window.
    fn remember(&mut self, pos: Position, memory: usize) {
        match self.history.iter().position(|&p| p == pos) {
            Some(first) => self.history.truncate(first + 1),
            None => self.history.push(pos),
        }
        self.last_steps.push_back(pos);
        while self.last_steps.len() > memory {
            self.last_steps.pop_front();
        }
    }

    /// Walk one cell back along the history and mark it.
    fn retrace(&mut self, map: &GameMap, pheromones: &mut PheromoneField) -> bool {
        let Some(previous) = self.history.pop() else {
            warn!(ant = ?self.ant_ref, "returning ant ran out of history, resuming exploration");
            self.history.push(self.pos);
            self.state = AntState::Exploring;
            return false;
        };
        self.move_to(previous, map.grid());
        pheromones.deposit(self.pos, PHEROMONE_DEPOSIT_AMOUNT);
        true
    }

    /// Moves the ant to an adjacent cell.
    ///
    /// # Panics
    /// If `target` is not adjacent to the current position.
    pub fn move_to(&mut self, target: Position, grid: &Grid) {
        assert!(
            grid.is_adjacent(self.pos, target),
            "{:?} cannot move from {:?} to non-adjacent {:?}",
            self.ant_ref,
            self.pos,
            target
        );
        self.pos = target;
    }

    fn metabolize(&mut self, colony: &mut Colony, map: &mut GameMap) {
        self.energy -= self.energy_consumption;
        if self.energy <= 0.0 {
            self.refuel(colony, map);
            if self.energy <= 0.0 {
                self.die();
            }
        }
    }

    /// Eats up to the energy deficit: first from the food under the ant, then
    /// from the colony stash when on the colony, then from its own load.
    fn refuel(&mut self, colony: &mut Colony, map: &mut GameMap) {
        let mut deficit = (self.max_energy - self.energy).max(0.0);
        if deficit <= 0.0 {
            return;
        }

        let eaten = map.take_food_at(self.pos, deficit);
        self.energy += eaten;
        deficit -= eaten;

        if deficit > 0.0 && colony.on_colony(self.pos, map.grid()) {
            let eaten = colony.withdraw(deficit);
            self.energy += eaten;
            deficit -= eaten;
        }

        if deficit > 0.0 && self.carried_food > 0.0 {
            let eaten = deficit.min(self.carried_food);
            self.carried_food -= eaten;
            self.energy += eaten;
        }
        assert!(self.carried_food >= 0.0, "{:?} carries negative food", self.ant_ref);
    }

    fn check_food(&mut self, colony: &mut Colony, map: &mut GameMap, rules: &AntRules) {
        if self.state != AntState::Exploring || !map.has_food_at(self.pos) {
            return;
        }
        if rules.death {
            self.refuel(colony, map);
        }

        let room = (self.carry_capacity - self.carried_food).max(0.0);
        self.carried_food += map.take_food_at(self.pos, room);
        debug_assert!(self.carried_food <= self.carry_capacity + f32::EPSILON);

        self.path_lengths.push(self.history.len() + 1);
        self.state = AntState::Returning;
    }

    fn check_colony(&mut self, colony: &mut Colony, grid: &Grid, rules: &AntRules) {
        if !colony.on_colony(self.pos, grid) {
            return;
        }
        if rules.death {
            let deficit = (self.max_energy - self.energy).max(0.0);
            self.energy += colony.withdraw(deficit);
        }

        colony.stash_food(self.carried_food);
        self.carried_food = 0.0;
        self.history = vec![self.pos];
        self.state = AntState::Exploring;
    }

    /// Turns back early when running low while the colony has food to spare.
    /// Needs at least the current cell and one earlier cell in the history.
    fn consider_refuel_trip(&mut self, colony: &Colony) {
        if self.state == AntState::Exploring
            && self.energy < self.max_energy / 2.0
            && colony.food_stash > 0.0
            && self.history.len() >= 2
        {
            self.history.pop();
            self.state = AntState::Returning;
        }
    }

    fn die(&mut self) {
        debug!(ant = ?self.ant_ref, x = self.pos.x, y = self.pos.y, "ant starved");
        self.state = AntState::Dead;
        self.energy = 0.0;
    }

    /// Returns true if ant is dead.
    pub fn is_dead(&self) -> bool {
        self.state == AntState::Dead
    }

    /// Shortest completed trip, if any.
    pub fn min_path_length(&self) -> Option<usize> {
        self.path_lengths.iter().copied().min()
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.ant_ref.key.data().as_ffi(),
            colony_id: self.ant_ref.colony_id,
            position: self.pos,
            state: self.state,
            carried_food: self.carried_food,
            energy: self.energy,
            encounters: self.encounters,
            path_lengths: self.path_lengths.clone(),
        }
    }
}

/// Scales `weights` to sum to one, or `None` when they sum to zero.
fn normalized(mut weights: Vec<f32>) -> Option<Vec<f32>> {
    let total: f32 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    for w in &mut weights {
        *w /= total;
    }
    Some(weights)
}
