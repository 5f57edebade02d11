pub mod grid;
pub mod util;
pub mod view;

pub use grid::{Grid, Position, Topology};
pub use view::{AgentView, AntState, ColonyView, FoodView, ObstacleView};
