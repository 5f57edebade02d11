use super::ant::{Ant, AntKey};
use crate::config::AgentConfig;

use rand::Rng;
use shared::{ColonyView, Grid, Position};
use slotmap::SlotMap;
use tracing::debug;

pub struct Colony {
    pub colony_id: u32,
    pub pos: Position,
    pub radius: f32,
    pub food_stash: f32,
    /// Total food ever delivered.
    pub food_collected: f32,
    /// Reference endowment for the birth rate.
    pub initial_food: f32,
    pub ants: Vec<AntKey>,
}

impl Colony {
    pub fn new(colony_id: u32, pos: Position, radius: f32, initial_food: f32) -> Self {
        Self {
            colony_id,
            pos,
            radius,
            food_stash: initial_food,
            food_collected: 0.0,
            initial_food,
            ants: Vec::new(),
        }
    }

    pub fn stash_food(&mut self, amount: f32) {
        assert!(amount >= 0.0, "colony {} got negative food {amount}", self.colony_id);
        self.food_stash += amount;
        self.food_collected += amount;
    }

    /// Takes up to `amount` from the stash and returns what was taken.
    pub fn withdraw(&mut self, amount: f32) -> f32 {
        let taken = amount.max(0.0).min(self.food_stash.max(0.0));
        self.food_stash -= taken;
        taken
    }

    #[inline(always)]
    pub fn on_colony(&self, pos: Position, grid: &Grid) -> bool {
        grid.distance(self.pos, pos) <= self.radius
    }

    /// `exp(-2 * initial_food / food_stash)`, or zero for an empty stash.
    pub fn birth_probability(&self) -> f32 {
        if self.food_stash <= 0.0 {
            return 0.0;
        }
        (-2.0 * self.initial_food / self.food_stash).exp()
    }

    pub fn should_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random::<f32>() < self.birth_probability()
    }

    /// Rolls for a birth. A newborn's `max_energy` is paid from the stash.
    pub fn ant_birth<R: Rng + ?Sized>(
        &mut self,
        ants: &mut SlotMap<AntKey, Ant>,
        traits: &AgentConfig,
        rng: &mut R,
    ) -> Option<AntKey> {
        if !self.should_spawn(rng) {
            return None;
        }
        let key = self.spawn_ant(ants, traits, rng);
        let cost = ants[key].max_energy;
        self.withdraw(cost);
        debug!(
            colony = self.colony_id,
            cost,
            stash = self.food_stash,
            "ant born"
        );
        Some(key)
    }

    pub fn spawn_ants<R: Rng + ?Sized>(
        &mut self,
        ants: &mut SlotMap<AntKey, Ant>,
        traits: &AgentConfig,
        count: u32,
        rng: &mut R,
    ) {
        for _ in 0..count {
            self.spawn_ant(ants, traits, rng);
        }
    }

    pub fn spawn_ant<R: Rng + ?Sized>(
        &mut self,
        ants: &mut SlotMap<AntKey, Ant>,
        traits: &AgentConfig,
        rng: &mut R,
    ) -> AntKey {
        let mut ant_instance = Ant::new(self.pos, self.colony_id, traits, rng);
        let key = ants.insert_with_key(|k| {
            ant_instance.ant_ref.key = k;
            ant_instance
        });
        self.ants.push(key);
        key
    }

    /// Live ants belonging to this colony.
    pub fn population(&self, ants: &SlotMap<AntKey, Ant>) -> usize {
        self.ants
            .iter()
            .filter_map(|&k| ants.get(k))
            .filter(|a| !a.is_dead())
            .count()
    }

    pub fn forget_dead(&mut self, ants: &SlotMap<AntKey, Ant>) {
        self.ants.retain(|&k| ants.contains_key(k));
    }

    pub fn view(&self, ants: &SlotMap<AntKey, Ant>) -> ColonyView {
        ColonyView {
            id: self.colony_id,
            position: self.pos,
            radius: self.radius,
            food_stash: self.food_stash,
            food_collected: self.food_collected,
            population: self.population(ants),
            total_ants: self.ants.iter().filter(|&&k| ants.contains_key(k)).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use shared::Topology;

    #[test]
    fn test_spawn_rate_matches_formula() {
        let colony = Colony::new(0, Position::new(5, 5), 1.0, 100.0);
        let expected = (-2.0f32).exp();
        assert!((colony.birth_probability() - expected).abs() < 1e-6);

        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let trials = 10_000;
        let births = (0..trials).filter(|_| colony.should_spawn(&mut rng)).count();
        let rate = births as f32 / trials as f32;
        assert!((rate - expected).abs() < 0.015, "rate {rate} vs {expected}");
    }

    #[test]
    fn test_empty_stash_never_spawns() {
        let mut colony = Colony::new(0, Position::new(0, 0), 1.0, 100.0);
        colony.food_stash = 0.0;
        assert_eq!(colony.birth_probability(), 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut ants = SlotMap::with_key();
        for _ in 0..1000 {
            assert!(colony.ant_birth(&mut ants, &AgentConfig::default(), &mut rng).is_none());
        }
        assert!(ants.is_empty());
    }

    #[test]
    fn test_birth_debits_stash_without_going_negative() {
        let mut colony = Colony::new(3, Position::new(2, 2), 1.0, 1.0);
        // Large stash relative to the endowment: births are near certain.
        colony.food_stash = 5.0;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut ants = SlotMap::with_key();
        let key = loop {
            if let Some(key) = colony.ant_birth(&mut ants, &AgentConfig::default(), &mut rng) {
                break key;
            }
        };
        assert_eq!(ants[key].pos, Position::new(2, 2));
        assert_eq!(ants[key].ant_ref.colony_id, 3);
        assert_eq!(ants[key].ant_ref.key, key);
        // Newborns cost around 15 energy, more than the stash holds.
        assert_eq!(colony.food_stash, 0.0);
        assert_eq!(colony.ants, vec![key]);
    }

    #[test]
    fn test_stash_and_withdraw() {
        let mut colony = Colony::new(0, Position::new(0, 0), 1.0, 2.0);
        colony.stash_food(3.0);
        assert_eq!(colony.food_stash, 5.0);
        assert_eq!(colony.food_collected, 3.0);
        assert_eq!(colony.withdraw(4.0), 4.0);
        assert_eq!(colony.withdraw(4.0), 1.0);
        assert_eq!(colony.food_stash, 0.0);
        // Withdrawals do not reduce the delivery total.
        assert_eq!(colony.food_collected, 3.0);
    }

    #[test]
    fn test_on_colony_uses_euclidean_radius() {
        let grid = Grid::new(10, 10, Topology::EightConnected, false);
        let colony = Colony::new(0, Position::new(5, 5), 1.0, 0.0);
        assert!(colony.on_colony(Position::new(5, 5), &grid));
        assert!(colony.on_colony(Position::new(6, 5), &grid));
        assert!(!colony.on_colony(Position::new(6, 6), &grid));

        let torus = Grid::new(10, 10, Topology::FourConnected, true);
        let corner = Colony::new(0, Position::new(0, 0), 1.0, 0.0);
        assert!(corner.on_colony(Position::new(9, 0), &torus));
        assert!(!corner.on_colony(Position::new(9, 0), &grid));
    }

    #[test]
    fn test_population_skips_dead() {
        let mut colony = Colony::new(0, Position::new(1, 1), 1.0, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut ants = SlotMap::with_key();
        colony.spawn_ants(&mut ants, &AgentConfig::default(), 4, &mut rng);
        assert_eq!(colony.population(&ants), 4);

        let first = colony.ants[0];
        ants[first].state = shared::AntState::Dead;
        assert_eq!(colony.population(&ants), 3);
        assert_eq!(colony.view(&ants).total_ants, 4);

        ants.remove(first);
        colony.forget_dead(&ants);
        assert_eq!(colony.ants.len(), 3);
    }
}
