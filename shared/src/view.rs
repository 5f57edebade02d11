use serde::{Deserialize, Serialize};

use crate::grid::Position;

/// Behavioural state of a foraging ant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AntState {
    Exploring,
    Returning,
    Dead,
}

/// Read-only snapshot of one ant, for renderers and metric collectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: u64,
    pub colony_id: u32,
    pub position: Position,
    pub state: AntState,
    pub carried_food: f32,
    pub energy: f32,
    pub encounters: u32,
    pub path_lengths: Vec<usize>, // completed colony-to-food trips
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyView {
    pub id: u32,
    pub position: Position,
    pub radius: f32,
    pub food_stash: f32,
    pub food_collected: f32,
    pub population: usize, // live ants
    pub total_ants: usize, // including retained dead ants
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    pub position: Position,
    pub cost: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub position: Position,
    pub amount: f32,
}
