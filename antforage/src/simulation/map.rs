use shared::{FoodView, Grid, ObstacleView, Position};
use tracing::warn;

use super::Obstacle;

#[derive(Debug, Clone, PartialEq)]
pub enum Terrain {
    Empty,
    Food(f32),
    Obstacle(Obstacle),
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub terrain: Terrain,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            terrain: Terrain::Empty,
        }
    }
}

/// Static layout of the world: food sources and obstacles on a grid.
pub struct GameMap {
    grid: Grid,
    tiles: Vec<Vec<Tile>>,
    obstacles: Vec<Obstacle>,
}

impl GameMap {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            tiles: vec![vec![Tile::default(); grid.width as usize]; grid.height as usize],
            obstacles: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline(always)]
    pub fn get_terrain_at(&self, pos: Position) -> Option<&Terrain> {
        if self.grid.contains(pos) {
            return Some(&self.tiles[pos.y as usize][pos.x as usize].terrain);
        }
        None
    }

    #[inline(always)]
    fn terrain_mut(&mut self, pos: Position) -> Option<&mut Terrain> {
        if self.grid.contains(pos) {
            return Some(&mut self.tiles[pos.y as usize][pos.x as usize].terrain);
        }
        None
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        matches!(self.get_terrain_at(pos), Some(Terrain::Empty))
    }

    /// Adds `amount` to the food at `pos`. Obstacle cells never hold food.
    /// Returns false when nothing was placed.
    pub fn place_food_at(&mut self, pos: Position, amount: f32) -> bool {
        if amount <= 0.0 {
            return false;
        }
        let Some(terrain) = self.terrain_mut(pos) else {
            warn!(x = pos.x, y = pos.y, "food position out of bounds");
            return false;
        };
        match *terrain {
            Terrain::Empty => *terrain = Terrain::Food(amount),
            Terrain::Food(ref mut current) => *current += amount,
            Terrain::Obstacle(_) => {
                warn!(x = pos.x, y = pos.y, "refusing to place food on an obstacle");
                return false;
            }
        }
        true
    }

    #[inline(always)]
    pub fn food_at(&self, pos: Position) -> f32 {
        match self.get_terrain_at(pos) {
            Some(Terrain::Food(amount)) => *amount,
            _ => 0.0,
        }
    }

    #[inline(always)]
    pub fn has_food_at(&self, pos: Position) -> bool {
        self.food_at(pos) > 0.0
    }

    /// Removes up to `amount` food from `pos` and returns what was taken.
    /// A depleted source turns back into empty terrain.
    pub fn take_food_at(&mut self, pos: Position, amount: f32) -> f32 {
        let Some(Terrain::Food(current)) = self.terrain_mut(pos) else {
            return 0.0;
        };
        let taken = amount.max(0.0).min(*current);
        *current -= taken;
        if *current <= 0.0 {
            if let Some(terrain) = self.terrain_mut(pos) {
                *terrain = Terrain::Empty;
            }
        }
        taken
    }

    /// Places an obstacle on an empty cell. Returns false if the cell is taken
    /// or out of bounds.
    pub fn place_obstacle(&mut self, obstacle: Obstacle) -> bool {
        match self.terrain_mut(obstacle.pos()) {
            Some(terrain) if *terrain == Terrain::Empty => {
                *terrain = Terrain::Obstacle(obstacle);
            }
            _ => return false,
        }
        self.obstacles.push(obstacle);
        true
    }

    #[inline(always)]
    pub fn obstacle_at(&self, pos: Position) -> Option<&Obstacle> {
        match self.get_terrain_at(pos) {
            Some(Terrain::Obstacle(obstacle)) => Some(obstacle),
            _ => None,
        }
    }

    /// In bounds and not blocked by an impassable obstacle.
    #[inline(always)]
    pub fn is_passable(&self, pos: Position) -> bool {
        match self.get_terrain_at(pos) {
            Some(Terrain::Obstacle(obstacle)) => obstacle.is_passable(),
            Some(_) => true,
            None => false,
        }
    }

    /// Idle steps imposed on an ant entering `pos`, if the cell carries a
    /// passable obstacle.
    pub fn slowdown_at(&self, pos: Position) -> Option<u32> {
        self.obstacle_at(pos).and_then(Obstacle::slowdown)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Remaining food sources in row-major order.
    pub fn food_sources(&self) -> Vec<FoodView> {
        self.grid
            .cells()
            .filter_map(|pos| match self.get_terrain_at(pos) {
                Some(Terrain::Food(amount)) if *amount > 0.0 => Some(FoodView {
                    position: pos,
                    amount: *amount,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn obstacle_views(&self) -> Vec<ObstacleView> {
        self.obstacles
            .iter()
            .map(|o| ObstacleView {
                position: o.pos(),
                cost: o.cost(),
            })
            .collect()
    }

    pub fn total_food(&self) -> f32 {
        self.food_sources().iter().map(|f| f.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Topology;

    fn map() -> GameMap {
        GameMap::new(Grid::new(5, 5, Topology::FourConnected, false))
    }

    #[test]
    fn test_food_accumulates_and_depletes() {
        let mut map = map();
        let pos = Position::new(2, 2);
        assert!(map.place_food_at(pos, 5.0));
        assert!(map.place_food_at(pos, 5.0));
        assert_eq!(map.food_at(pos), 10.0);

        assert_eq!(map.take_food_at(pos, 4.0), 4.0);
        assert_eq!(map.food_at(pos), 6.0);
        // Clamped to what is available
        assert_eq!(map.take_food_at(pos, 100.0), 6.0);
        assert_eq!(map.get_terrain_at(pos), Some(&Terrain::Empty));
        assert_eq!(map.take_food_at(pos, 1.0), 0.0);
    }

    #[test]
    fn test_obstacles_exclude_food_and_each_other() {
        let mut map = map();
        let pos = Position::new(1, 3);
        assert!(map.place_obstacle(Obstacle::new(pos, -1)));
        assert!(!map.place_obstacle(Obstacle::new(pos, 2)));
        assert!(!map.place_food_at(pos, 5.0));
        assert!(!map.is_passable(pos));
        assert_eq!(map.obstacles().len(), 1);
    }

    #[test]
    fn test_passable_obstacle_slows() {
        let mut map = map();
        let pos = Position::new(0, 0);
        map.place_obstacle(Obstacle::new(pos, 3));
        assert!(map.is_passable(pos));
        assert_eq!(map.slowdown_at(pos), Some(3));
        assert_eq!(map.slowdown_at(Position::new(1, 0)), None);
    }

    #[test]
    fn test_out_of_bounds_is_not_passable() {
        let map = map();
        assert!(!map.is_passable(Position::new(-1, 0)));
        assert!(!map.is_passable(Position::new(5, 0)));
        assert_eq!(map.get_terrain_at(Position::new(0, 5)), None);
    }

    #[test]
    fn test_food_sources_listing() {
        let mut map = map();
        map.place_food_at(Position::new(4, 0), 3.0);
        map.place_food_at(Position::new(0, 4), 2.0);
        let sources = map.food_sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].position, Position::new(4, 0));
        assert_eq!(map.total_food(), 5.0);
    }
}
