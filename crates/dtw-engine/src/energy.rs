//! Dual-gradient energy model.
//!
//! The energy of a cell is the magnitude of the colour change across it:
//! the squared per-channel difference between its left and right
//! neighbours plus the squared per-channel difference between its upper
//! and lower neighbours, square-rooted. Alpha is ignored.
//!
//! A missing neighbour (image boundary) is replaced by the cell itself,
//! so border cells measure the one-sided change towards the interior
//! rather than being treated as free to remove.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::grid::{CellId, PixelGrid, Side};
use crate::types::EngineConfig;

/// Upper bound on any dual-gradient energy: `255 * sqrt(6)` rounded up.
pub const MAX_ENERGY: f64 = 625.0;

/// Sentinel energies used while building and editing the grid.
///
/// Carried by value inside [`PixelGrid`] so every recompute sees the
/// values the engine was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyModel {
    border_energy: f64,
    deleted_energy: f64,
}

impl EnergyModel {
    /// Take the sentinels from an engine configuration.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            border_energy: config.border_energy,
            deleted_energy: config.deleted_energy,
        }
    }

    /// Energy assigned to boundary cells before their gradient is known.
    #[must_use]
    pub const fn border_energy(self) -> f64 {
        self.border_energy
    }

    /// Energy written into removed cells when validation is enabled.
    #[must_use]
    pub const fn deleted_energy(self) -> f64 {
        self.deleted_energy
    }
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Squared RGB distance between two colours.
fn squared_difference(a: Rgba<u8>, b: Rgba<u8>) -> u32 {
    a.0[..3]
        .iter()
        .zip(&b.0[..3])
        .map(|(&p, &q)| {
            let d = u32::from(p.abs_diff(q));
            d * d
        })
        .sum()
}

/// Dual-gradient energy from the four colours surrounding a pixel.
#[must_use]
pub fn dual_gradient(left: Rgba<u8>, right: Rgba<u8>, up: Rgba<u8>, down: Rgba<u8>) -> f64 {
    let dx2 = squared_difference(left, right);
    let dy2 = squared_difference(up, down);
    f64::from(dx2 + dy2).sqrt()
}

/// Energy of `id` from its current neighbours.
#[must_use]
pub fn energy_of(grid: &PixelGrid, id: CellId) -> f64 {
    let neighbour = |side| grid.color(grid.link(id, side).unwrap_or(id));
    dual_gradient(
        neighbour(Side::Left),
        neighbour(Side::Right),
        neighbour(Side::Up),
        neighbour(Side::Down),
    )
}

/// Overwrite the energy of `id` from its current neighbours.
///
/// Must be called for every cell whose neighbour set changed.
pub fn recompute(grid: &mut PixelGrid, id: CellId) {
    let energy = energy_of(grid, id);
    grid.set_energy(id, energy);
}
