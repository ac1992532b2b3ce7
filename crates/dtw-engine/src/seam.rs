//! Minimum-energy seam search over the linked grid.
//!
//! A vertical seam runs from the top row to the bottom row, one cell per
//! row; a horizontal seam runs from the left column to the right column,
//! one cell per column. The search is a layered shortest-path dynamic
//! program: each layer is one row (or column), and each cell can be
//! reached from at most three cells of the previous layer (straight
//! across, or one position to either side).
//!
//! Layers are read from the adjacency links rather than from a dense
//! matrix, so the search keeps working after any number of removals.

use serde::{Deserialize, Serialize};

use crate::grid::{CellId, PixelGrid, Side};
use crate::types::{Dimensions, EngineError};

/// Orientation of a seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Top-to-bottom seam; removing it shrinks the width.
    Vertical,
    /// Left-to-right seam; removing it shrinks the height.
    Horizontal,
}

impl Direction {
    /// Side that steps to the next position within a layer.
    #[must_use]
    pub const fn lateral(self) -> Side {
        match self {
            Self::Vertical => Side::Right,
            Self::Horizontal => Side::Down,
        }
    }

    /// Side that steps from one layer to the next.
    #[must_use]
    pub const fn traversal(self) -> Side {
        match self {
            Self::Vertical => Side::Down,
            Self::Horizontal => Side::Right,
        }
    }

    /// Number of layers (cells in a seam) for a grid of `size`.
    #[must_use]
    pub const fn layer_count(self, size: Dimensions) -> u32 {
        match self {
            Self::Vertical => size.height,
            Self::Horizontal => size.width,
        }
    }

    /// Number of positions in each layer for a grid of `size`.
    #[must_use]
    pub const fn layer_len(self, size: Dimensions) -> u32 {
        match self {
            Self::Vertical => size.width,
            Self::Horizontal => size.height,
        }
    }
}

/// A connected one-cell-wide path across the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Seam {
    direction: Direction,
    cells: Vec<CellId>,
    positions: Vec<u32>,
    total_energy: f64,
}

impl Seam {
    #[cfg(test)]
    pub(crate) const fn from_parts(
        direction: Direction,
        cells: Vec<CellId>,
        positions: Vec<u32>,
        total_energy: f64,
    ) -> Self {
        Self {
            direction,
            cells,
            positions,
            total_energy,
        }
    }

    /// Orientation of the seam.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Arena indices from the first layer to the last.
    #[must_use]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Position of each cell within its layer (column for a vertical
    /// seam, row for a horizontal one).
    #[must_use]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Sum of the energies along the seam.
    #[must_use]
    pub const fn total_energy(&self) -> f64 {
        self.total_energy
    }

    /// Number of cells in the seam.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the seam has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether consecutive positions differ by at most one.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.positions.windows(2).all(|w| w[0].abs_diff(w[1]) <= 1)
    }
}

/// Keep `candidate` only on strict improvement, so ties stay with the
/// predecessor found first.
fn relax(best: &mut f64, from: &mut usize, candidate: f64, position: usize) {
    if candidate < *best {
        *best = candidate;
        *from = position;
    }
}

/// Read one layer by walking `lateral` from `first`.
fn read_layer(
    grid: &PixelGrid,
    first: CellId,
    lateral: Side,
    len: usize,
    out: &mut Vec<CellId>,
) -> Result<(), EngineError> {
    let mut cursor = Some(first);
    for p in 0..len {
        let Some(id) = cursor else {
            return Err(EngineError::CorruptTopology(format!(
                "layer ended after {p} of {len} cells"
            )));
        };
        out.push(id);
        cursor = grid.link(id, lateral);
    }
    if let Some(extra) = cursor {
        return Err(EngineError::CorruptTopology(format!(
            "layer continues past {len} cells into cell {extra}"
        )));
    }
    Ok(())
}

/// Find the minimum total-energy seam in `direction`.
///
/// Ties are broken deterministically: within the relaxation the straight
/// predecessor wins, then the one at the lower position; in the final
/// layer the lowest position wins.
///
/// Each cell pulls from its predecessors in the order `p`, `p - 1`,
/// `p + 1` and only a strictly cheaper path replaces the current one, so
/// the same grid always yields the same seam.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if a layer cannot be read
/// from the adjacency links or two consecutive layers disagree in length.
pub fn find_seam(grid: &PixelGrid, direction: Direction) -> Result<Seam, EngineError> {
    let size = grid.dimensions();
    let len = direction.layer_len(size) as usize;
    let layers = direction.layer_count(size) as usize;
    let lateral = direction.lateral();
    let traversal = direction.traversal();

    // Flat `layers x len` tables: cell ids and back-pointers into the
    // previous layer.
    let mut cells: Vec<CellId> = Vec::with_capacity(len * layers);
    let mut back: Vec<usize> = vec![0; len * layers];

    read_layer(grid, grid.start(), lateral, len, &mut cells)?;
    let mut dist: Vec<f64> = cells.iter().map(|&id| grid.energy(id)).collect();
    let mut next_dist = vec![0.0; len];

    for layer in 1..layers {
        let prev = (layer - 1) * len;
        for p in 0..len {
            let above = cells[prev + p];
            let id = grid.link(above, traversal).ok_or_else(|| {
                EngineError::CorruptTopology(format!(
                    "cell {above} has no {traversal:?} neighbour in layer {layer}"
                ))
            })?;
            cells.push(id);
        }
        for p in 0..len.saturating_sub(1) {
            let here = cells[layer * len + p];
            let right = cells[layer * len + p + 1];
            if grid.link(here, lateral) != Some(right) {
                return Err(EngineError::CorruptTopology(format!(
                    "layer {layer} is not contiguous at position {p}"
                )));
            }
        }

        for p in 0..len {
            let energy = grid.energy(cells[layer * len + p]);
            let mut best = dist[p] + energy;
            let mut from = p;
            if p > 0 {
                relax(&mut best, &mut from, dist[p - 1] + energy, p - 1);
            }
            if p + 1 < len {
                relax(&mut best, &mut from, dist[p + 1] + energy, p + 1);
            }
            next_dist[p] = best;
            back[layer * len + p] = from;
        }
        std::mem::swap(&mut dist, &mut next_dist);
    }

    let mut end = 0;
    for p in 1..len {
        if dist[p] < dist[end] {
            end = p;
        }
    }
    let total_energy = dist.get(end).copied().unwrap_or(0.0);

    let mut positions = vec![0u32; layers];
    let mut seam_cells = vec![0; layers];
    let mut p = end;
    for layer in (0..layers).rev() {
        positions[layer] = u32::try_from(p).unwrap_or(u32::MAX);
        seam_cells[layer] = cells[layer * len + p];
        p = back[layer * len + p];
    }

    Ok(Seam {
        direction,
        cells: seam_cells,
        positions,
        total_energy,
    })
}
