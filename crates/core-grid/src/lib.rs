//! Uniform spatial grid for O(n) neighborhood queries.
//!
//! The world rectangle is cut into at least 2×2 cells of roughly the
//! requested size. Each cell holds a small vector of entries; an entry is
//! a handle plus the position it was inserted at. The grid never owns
//! particles: it is rebuilt from the store before each query phase and the
//! position snapshots are only trusted within that phase.
//!
//! Per-cell vectors grow by doubling and keep their capacity across
//! `clear`, so a steady-state simulation stops allocating after the first
//! few ticks.

use core_error::{EngineError, Result};
use core_pool::ParticleHandle;

/// One grid entry: a borrowed view of a particle at insertion time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub handle: ParticleHandle,
    pub x: f32,
    pub y: f32,
}

/// Occupancy snapshot returned by [`SpatialGrid::stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub total_cells: usize,
    pub occupied_cells: usize,
    pub empty_cells: usize,
    pub min_per_occupied_cell: usize,
    pub max_per_occupied_cell: usize,
    pub avg_per_occupied_cell: f32,
    pub total_particles: usize,
}

#[derive(Debug)]
pub struct SpatialGrid {
    cells: Vec<Vec<GridEntry>>,
    rows: usize,
    cols: usize,
    cell_width: f32,
    cell_height: f32,
    world_width: f32,
    world_height: f32,
    total: usize,
}

impl SpatialGrid {
    /// Build a grid over a `world_width × world_height` rectangle with
    /// cells of approximately `cell_size` world units.
    pub fn new(world_width: f32, world_height: f32, cell_size: f32) -> Result<Self> {
        if !(world_width > 0.0) || !(world_height > 0.0) || !(cell_size > 0.0) {
            return Err(EngineError::invalid_parameter(
                "grid world dimensions and cell size must be positive",
            ));
        }
        let cols = ((world_width / cell_size).ceil() as usize).max(2);
        let rows = ((world_height / cell_size).ceil() as usize).max(2);
        Ok(Self {
            cells: (0..rows * cols).map(|_| Vec::new()).collect(),
            rows,
            cols,
            cell_width: world_width / cols as f32,
            cell_height: world_height / rows as f32,
            world_width,
            world_height,
            total: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> (f32, f32) {
        (self.cell_width, self.cell_height)
    }

    pub fn world_size(&self) -> (f32, f32) {
        (self.world_width, self.world_height)
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Empty every cell, keeping allocated capacity.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.total = 0;
    }

    /// Cell coordinates for a world position, clamped into grid bounds.
    pub fn world_to_cell(&self, x: f32, y: f32) -> (usize, usize) {
        let col = ((x / self.cell_width) as isize).clamp(0, self.cols as isize - 1) as usize;
        let row = ((y / self.cell_height) as isize).clamp(0, self.rows as isize - 1) as usize;
        (col, row)
    }

    /// Record a particle view in the cell covering `(x, y)`.
    pub fn insert(&mut self, handle: ParticleHandle, x: f32, y: f32) {
        let (col, row) = self.world_to_cell(x, y);
        self.cells[row * self.cols + col].push(GridEntry { handle, x, y });
        self.total += 1;
    }

    /// Entries in the 3×3 block of cells around `(x, y)`; the primary
    /// collision query. Includes the query particle itself if inserted.
    pub fn neighbors(&self, x: f32, y: f32) -> impl Iterator<Item = GridEntry> + '_ {
        let (col, row) = self.world_to_cell(x, y);
        let col_lo = col.saturating_sub(1);
        let col_hi = (col + 1).min(self.cols - 1);
        let row_lo = row.saturating_sub(1);
        let row_hi = (row + 1).min(self.rows - 1);
        (row_lo..=row_hi).flat_map(move |r| {
            (col_lo..=col_hi).flat_map(move |c| self.cells[r * self.cols + c].iter().copied())
        })
    }

    /// Entries within `radius` of `(x, y)`: scans the covering cell block,
    /// then filters by squared distance against the stored positions.
    pub fn radius_query(&self, x: f32, y: f32, radius: f32) -> impl Iterator<Item = GridEntry> + '_ {
        let r = radius.max(0.0);
        let (col_lo, row_lo) = self.world_to_cell(x - r, y - r);
        let (col_hi, row_hi) = self.world_to_cell(x + r, y + r);
        let r_sq = r * r;
        (row_lo..=row_hi)
            .flat_map(move |row| {
                (col_lo..=col_hi)
                    .flat_map(move |c| self.cells[row * self.cols + c].iter().copied())
            })
            .filter(move |e| {
                let dx = e.x - x;
                let dy = e.y - y;
                dx * dx + dy * dy <= r_sq
            })
    }

    pub fn stats(&self) -> GridStats {
        let mut occupied = 0usize;
        let mut min = usize::MAX;
        let mut max = 0usize;
        for cell in &self.cells {
            if !cell.is_empty() {
                occupied += 1;
                min = min.min(cell.len());
                max = max.max(cell.len());
            }
        }
        GridStats {
            total_cells: self.cells.len(),
            occupied_cells: occupied,
            empty_cells: self.cells.len() - occupied,
            min_per_occupied_cell: if occupied == 0 { 0 } else { min },
            max_per_occupied_cell: max,
            avg_per_occupied_cell: if occupied == 0 {
                0.0
            } else {
                self.total as f32 / occupied as f32
            },
            total_particles: self.total,
        }
    }
}
