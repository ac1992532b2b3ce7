//! Coloring-page stencil: a bilevel outline from a percentile energy
//! threshold.
//!
//! With a detail ratio `R`, the top `N / R` of the `N` live cells by
//! energy are outline candidates. Interior cells above the threshold are
//! drawn black; everything else, including the one-pixel border, stays
//! white.

use image::imageops::{self, FilterType};
use image::Luma;

use crate::grid::{CellId, PixelGrid};
use crate::types::{Dimensions, EngineError, GrayImage, effective_detail_ratio};

/// Pixel value for outline cells.
pub const INK: u8 = 0;
/// Pixel value for background cells.
pub const PAPER: u8 = 255;

/// Energy threshold selecting the top `1 / ratio` of `energies`.
///
/// Returns the largest energy *not* in the selected top fraction, so
/// cells strictly above it are the selection (ties at the threshold are
/// excluded). When the fraction rounds to zero cells the threshold is
/// `+inf`; when it covers every cell it is `-inf`. The slice is
/// reordered.
///
/// `ratio` goes through [`effective_detail_ratio`] first.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn energy_threshold(energies: &mut [f64], ratio: f64) -> f64 {
    let n = energies.len();
    let ratio = effective_detail_ratio(ratio);
    let count = (n as f64 / ratio).floor() as usize;
    if count == 0 {
        return f64::INFINITY;
    }
    if count >= n {
        return f64::NEG_INFINITY;
    }
    let index = n - count - 1;
    let (_, threshold, _) = energies.select_nth_unstable_by(index, f64::total_cmp);
    *threshold
}

/// Threshold over the energies of `ids`.
fn threshold_of(grid: &PixelGrid, ids: &[CellId], ratio: f64) -> f64 {
    let mut energies: Vec<f64> = ids.iter().map(|&id| grid.energy(id)).collect();
    energy_threshold(&mut energies, ratio)
}

/// Render the coloring page for the current grid.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn render_stencil(grid: &PixelGrid, ratio: f64) -> Result<GrayImage, EngineError> {
    let ids = grid.row_major()?;
    let threshold = threshold_of(grid, &ids, ratio);
    let Dimensions { width, height } = grid.dimensions();
    let mut page = GrayImage::from_pixel(width, height, Luma([PAPER]));

    let mut inked = 0usize;
    for (&id, (x, y, pixel)) in ids.iter().zip(page.enumerate_pixels_mut()) {
        let interior = x > 0 && y > 0 && x + 1 < width && y + 1 < height;
        if interior && grid.energy(id) > threshold {
            *pixel = Luma([INK]);
            inked += 1;
        }
    }

    log::info!(
        "rendered {width}x{height} coloring page at ratio {}: {inked} outline pixels (threshold {threshold:.2})",
        effective_detail_ratio(ratio),
    );
    Ok(page)
}

/// Render the coloring page, then scale it to `size` with
/// nearest-neighbour sampling so the result stays bilevel.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDimensions`] if either axis of `size`
/// is zero, and [`EngineError::CorruptTopology`] as for
/// [`render_stencil`].
pub fn render_stencil_scaled(
    grid: &PixelGrid,
    ratio: f64,
    size: Dimensions,
) -> Result<GrayImage, EngineError> {
    if size.width == 0 || size.height == 0 {
        return Err(EngineError::InvalidDimensions {
            width: size.width,
            height: size.height,
            minimum: 1,
        });
    }
    let page = render_stencil(grid, ratio)?;
    if page.dimensions() == (size.width, size.height) {
        return Ok(page);
    }
    Ok(imageops::resize(&page, size.width, size.height, FilterType::Nearest))
}

/// Every live cell above the threshold as white on black, border
/// included.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn threshold_mask(grid: &PixelGrid, ratio: f64) -> Result<GrayImage, EngineError> {
    let ids = grid.row_major()?;
    let threshold = threshold_of(grid, &ids, ratio);
    let Dimensions { width, height } = grid.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (pixel, &id) in mask.pixels_mut().zip(&ids) {
        if grid.energy(id) > threshold {
            *pixel = Luma([u8::MAX]);
        }
    }
    Ok(mask)
}
