pub mod ant;
mod colony;
mod map;
pub mod metrics;
mod obstacle;
pub mod pathfind;
mod pheromone;
mod sim;

// Re-export key types for easier imports
pub use ant::{Ant, AntKey, AntRef, AntRules};
pub use colony::Colony;
pub use map::{GameMap, Terrain};
pub use obstacle::Obstacle;
pub use pathfind::{ColonyPaths, FoodPath};
pub use pheromone::PheromoneField;
pub use sim::Simulation;

// Food constants
pub const DEFAULT_FOOD_AMOUNT: f32 = 50.0;

// Pheromone constants
pub const PHEROMONE_DEPOSIT_AMOUNT: f32 = 1.0; // Queued per returning step
pub const PHEROMONE_UNIT: f32 = 1.0; // Added per queued deposit when the field is flushed

// Ant behavior constants
pub const PERSISTENCE_MIN_SQUARED_LENGTH: i32 = 2; // Summed direction vectors at or below this (~2.1) carry no bias

// Placement constants
pub const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;
