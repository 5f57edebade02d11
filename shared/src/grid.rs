use serde::{Deserialize, Serialize};

/// Integer cell coordinates. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Neighbour connectivity of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Topology {
    /// Axis-aligned moves only (von Neumann neighbourhood).
    #[default]
    #[serde(rename = "four")]
    FourConnected,
    /// Diagonals included (Moore neighbourhood).
    #[serde(rename = "eight")]
    EightConnected,
}

const FOUR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const EIGHT_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Topology {
    #[inline(always)]
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Topology::FourConnected => &FOUR_OFFSETS,
            Topology::EightConnected => &EIGHT_OFFSETS,
        }
    }
}

/// Geometry of a rectangular grid: its size, connectivity and whether the
/// edges wrap around (torus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
    pub topology: Topology,
    pub wrap: bool,
}

impl Grid {
    pub fn new(width: u32, height: u32, topology: Topology, wrap: bool) -> Self {
        Self {
            width,
            height,
            topology,
            wrap,
        }
    }

    #[inline(always)]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Maps raw coordinates onto the grid. Out-of-range coordinates wrap on a
    /// torus and are rejected on a bounded grid.
    pub fn normalize(&self, x: i32, y: i32) -> Option<Position> {
        if self.wrap {
            Some(Position::new(
                x.rem_euclid(self.width as i32),
                y.rem_euclid(self.height as i32),
            ))
        } else {
            let pos = Position::new(x, y);
            self.contains(pos).then_some(pos)
        }
    }

    /// Cells adjacent to `pos` under the configured topology, in a fixed order.
    /// On very small tori several offsets can land on the same cell; those are
    /// reported once, and `pos` itself is never reported.
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        let mut out = Vec::with_capacity(8);
        for &(dx, dy) in self.topology.offsets() {
            if let Some(n) = self.normalize(pos.x + dx, pos.y + dy) {
                if n != pos && !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    pub fn is_adjacent(&self, from: Position, to: Position) -> bool {
        self.neighbors(from).contains(&to)
    }

    /// Shortest displacement from `from` to `to`, taking wraparound into account.
    pub fn delta(&self, from: Position, to: Position) -> (i32, i32) {
        let mut dx = to.x - from.x;
        let mut dy = to.y - from.y;
        if self.wrap {
            dx = wrap_axis(dx, self.width as i32);
            dy = wrap_axis(dy, self.height as i32);
        }
        (dx, dy)
    }

    /// Euclidean distance between two cells.
    pub fn distance(&self, a: Position, b: Position) -> f32 {
        let (dx, dy) = self.delta(a, b);
        ((dx * dx + dy * dy) as f32).sqrt()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn wrap_axis(d: i32, size: i32) -> i32 {
    let d = d.rem_euclid(size);
    if d > size / 2 { d - size } else { d }
}
