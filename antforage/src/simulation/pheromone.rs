use shared::util::{gaussian_kernel, reflect_index};
use shared::{Grid, Position};

use super::{GameMap, PHEROMONE_UNIT};

/// Trail intensity over the whole grid.
///
/// Deposits made during a step are only queued; [`PheromoneField::step`]
/// commits them, so every ant acting within one step reads the same field.
#[derive(Clone)]
pub struct PheromoneField {
    grid: Grid,
    pub data: Vec<Vec<f32>>, // data[y][x]
    pub decay_rate: f32,
    pub sigma: f32,
    kernel: Vec<f32>,
    pending: Vec<(Position, f32)>,
}

impl PheromoneField {
    pub fn new(grid: Grid, decay_rate: f32, sigma: f32) -> Self {
        Self {
            grid,
            data: vec![vec![0.0; grid.width as usize]; grid.height as usize],
            decay_rate,
            sigma,
            kernel: gaussian_kernel(sigma),
            pending: Vec::new(),
        }
    }

    /// Queues a deposit for the next flush. Only the occurrence of a deposit
    /// matters: each one adds a single unit when applied.
    #[inline(always)]
    pub fn deposit(&mut self, pos: Position, amount: f32) {
        self.pending.push((pos, amount));
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Applies queued deposits, diffuses, then decays.
    pub fn step(&mut self) {
        for (pos, _amount) in self.pending.drain(..) {
            if self.grid.contains(pos) {
                self.data[pos.y as usize][pos.x as usize] += PHEROMONE_UNIT;
            }
        }
        self.diffuse();
        self.decay();
    }

    fn diffuse(&mut self) {
        if self.kernel.len() == 1 {
            return;
        }
        let width = self.grid.width as usize;
        let height = self.grid.height as usize;
        let radius = (self.kernel.len() / 2) as i64;
        let wrap = self.grid.wrap;
        let index = |i: i64, n: usize| {
            if wrap {
                i.rem_euclid(n as i64) as usize
            } else {
                reflect_index(i, n)
            }
        };

        // Separable blur: rows, then columns.
        let mut rows = vec![vec![0.0; width]; height];
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (k, w) in self.kernel.iter().enumerate() {
                    let sx = index(x as i64 + k as i64 - radius, width);
                    acc += w * self.data[y][sx];
                }
                rows[y][x] = acc;
            }
        }
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (k, w) in self.kernel.iter().enumerate() {
                    let sy = index(y as i64 + k as i64 - radius, height);
                    acc += w * rows[sy][x];
                }
                self.data[y][x] = acc;
            }
        }
    }

    fn decay(&mut self) {
        for row in &mut self.data {
            for cell in row.iter_mut() {
                *cell *= self.decay_rate;
            }
        }
    }

    #[inline(always)]
    pub fn intensity(&self, pos: Position) -> f32 {
        if self.grid.contains(pos) {
            self.data[pos.y as usize][pos.x as usize]
        } else {
            0.0
        }
    }

    /// Passable cells adjacent to `pos` with their current intensity.
    pub fn neighbors(&self, pos: Position, map: &GameMap) -> Vec<(Position, f32)> {
        self.grid
            .neighbors(pos)
            .into_iter()
            .filter(|&n| map.is_passable(n))
            .map(|n| (n, self.intensity(n)))
            .collect()
    }

    /// Cells with intensity at or above `threshold`, in row-major order.
    pub fn threshold(&self, threshold: f32) -> Vec<Position> {
        self.grid
            .cells()
            .filter(|&pos| self.intensity(pos) >= threshold)
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Vec<f32>> {
        self.data.clone()
    }

    pub fn total(&self) -> f32 {
        self.data.iter().flatten().sum()
    }
}
