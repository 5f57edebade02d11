//! Run statistics derived from the simulation state.

use serde::Serialize;

use super::Simulation;

/// Shortest trip any ant has completed.
pub fn min_path_length(sim: &Simulation) -> Option<usize> {
    sim.ants.values().filter_map(|ant| ant.min_path_length()).min()
}

/// Mean over ants with at least one completed trip of their shortest trip.
pub fn mean_min_path_length(sim: &Simulation) -> Option<f32> {
    let minima: Vec<usize> = sim
        .ants
        .values()
        .filter_map(|ant| ant.min_path_length())
        .collect();
    if minima.is_empty() {
        return None;
    }
    Some(minima.iter().sum::<usize>() as f32 / minima.len() as f32)
}

/// Pairwise meetings so far. Each meeting is counted by both ants.
pub fn total_encounters(sim: &Simulation) -> u64 {
    sim.ants.values().map(|ant| ant.encounters as u64).sum::<u64>() / 2
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColonyStash {
    pub colony_id: u32,
    pub food_stash: f32,
    pub population: usize,
}

/// Snapshot of aggregate statistics after one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub tick: u64,
    pub live: usize,
    pub dead: usize,
    pub colonies: Vec<ColonyStash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_path_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_min_path_length: Option<f32>,
    pub encounters: u64,
    pub total_pheromone: f32,
    pub remaining_food: f32,
}

impl StepRecord {
    pub fn capture(sim: &Simulation) -> Self {
        Self {
            tick: sim.tick,
            live: sim.live_count(),
            dead: sim.dead_count(),
            colonies: sim
                .colonies()
                .into_iter()
                .map(|c| ColonyStash {
                    colony_id: c.id,
                    food_stash: c.food_stash,
                    population: c.population,
                })
                .collect(),
            min_path_length: min_path_length(sim),
            mean_min_path_length: mean_min_path_length(sim),
            encounters: total_encounters(sim),
            total_pheromone: sim.pheromones.total(),
            remaining_food: sim.map.total_food(),
        }
    }
}

/// Collects one [`StepRecord`] per recorded step.
#[derive(Debug, Default, Serialize)]
pub struct MetricsRecorder {
    pub records: Vec<StepRecord>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sim: &Simulation) -> &StepRecord {
        self.records.push(StepRecord::capture(sim));
        &self.records[self.records.len() - 1]
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serializes all records as TOML (`[[records]]` tables).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn sim() -> Simulation {
        let mut config = SimulationConfig::default();
        config.colonies[0].ants = 4;
        Simulation::new(&config).unwrap()
    }

    #[test]
    fn test_no_trips_means_no_path_metrics() {
        let sim = sim();
        assert_eq!(min_path_length(&sim), None);
        assert_eq!(mean_min_path_length(&sim), None);
        assert_eq!(total_encounters(&sim), 0);
    }

    #[test]
    fn test_path_metrics_use_per_ant_minimum() {
        let mut sim = sim();
        let keys: Vec<_> = sim.ants.keys().collect();
        sim.ants[keys[0]].path_lengths = vec![12, 8];
        sim.ants[keys[1]].path_lengths = vec![10];
        assert_eq!(min_path_length(&sim), Some(8));
        assert_eq!(mean_min_path_length(&sim), Some(9.0));
    }

    #[test]
    fn test_encounters_are_halved() {
        let mut sim = sim();
        for ant in sim.ants.values_mut() {
            ant.encounters = 3;
        }
        assert_eq!(total_encounters(&sim), 6);
    }

    #[test]
    fn test_recorder_captures_each_step() {
        let mut sim = sim();
        let mut recorder = MetricsRecorder::new();
        for _ in 0..3 {
            sim.step();
            recorder.record(&sim);
        }
        assert_eq!(recorder.len(), 3);
        let last = recorder.last().unwrap();
        assert_eq!(last.tick, 3);
        assert_eq!(last.colonies.len(), 1);
        assert_eq!(last.live + last.dead, sim.total_ant_count());

        let text = recorder.to_toml().unwrap();
        assert!(text.contains("[[records]]"));
        assert!(text.contains("tick = 3"));
    }
}
