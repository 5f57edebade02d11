use shared::Position;

/// A fixed feature of the terrain. A non-negative cost is the number of idle
/// steps imposed on an ant entering the cell; a negative cost makes the cell
/// impassable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pos: Position,
    cost: i32,
}

impl Obstacle {
    pub fn new(pos: Position, cost: i32) -> Self {
        Self { pos, cost }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn cost(&self) -> i32 {
        self.cost
    }

    #[inline(always)]
    pub fn is_passable(&self) -> bool {
        self.cost >= 0
    }

    /// Idle steps imposed on entry, or `None` when the cell cannot be entered.
    pub fn slowdown(&self) -> Option<u32> {
        u32::try_from(self.cost).ok()
    }
}
