//! Debug renderings of the engine's internal state.
//!
//! None of these feed back into resizing or the coloring page; they
//! exist so the intermediate results can be inspected as images.

use image::{Luma, Rgba};

use crate::contour;
use crate::grid::PixelGrid;
use crate::seam::{self, Direction};
use crate::stencil;
use crate::types::{EngineConfig, EngineError, GrayImage, RgbaImage};

/// Colour of the minimum vertical seam in [`seams`].
pub const VERTICAL_SEAM: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Colour of the minimum horizontal seam in [`seams`].
pub const HORIZONTAL_SEAM: Rgba<u8> = Rgba([0, 255, 0, 255]);
/// Colour of the traced contour in [`top_contour`].
pub const CONTOUR: Rgba<u8> = Rgba([255, 0, 255, 255]);
/// Colour of the circle marking the contour's starting cell.
pub const CONTOUR_START: Rgba<u8> = Rgba([255, 255, 0, 255]);

const START_MARK_RADIUS: i32 = 3;

/// The energy map as grayscale, scaled so the highest live energy is
/// white.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn energy(grid: &PixelGrid) -> Result<GrayImage, EngineError> {
    let ids = grid.row_major()?;
    let size = grid.dimensions();
    let peak = ids
        .iter()
        .map(|&id| grid.energy(id))
        .fold(0.0_f64, f64::max);

    let mut image = GrayImage::new(size.width, size.height);
    if peak > 0.0 {
        for (pixel, &id) in image.pixels_mut().zip(&ids) {
            *pixel = Luma([scale_to_byte(grid.energy(id) / peak)]);
        }
    }
    Ok(image)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_to_byte(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// The current grid as a bitmap.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn image(grid: &PixelGrid) -> Result<RgbaImage, EngineError> {
    grid.materialize()
}

/// The current grid with its minimum vertical seam painted
/// [`VERTICAL_SEAM`] and its minimum horizontal seam painted
/// [`HORIZONTAL_SEAM`]. Where they cross, the horizontal seam wins.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn seams(grid: &PixelGrid) -> Result<RgbaImage, EngineError> {
    let mut image = grid.materialize()?;

    let vertical = seam::find_seam(grid, Direction::Vertical)?;
    for (y, &x) in (0..).zip(vertical.positions()) {
        image.put_pixel(x, y, VERTICAL_SEAM);
    }
    let horizontal = seam::find_seam(grid, Direction::Horizontal)?;
    for (x, &y) in (0..).zip(horizontal.positions()) {
        image.put_pixel(x, y, HORIZONTAL_SEAM);
    }
    Ok(image)
}

/// Cells above the stencil threshold for `ratio` in white.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn threshold_mask(grid: &PixelGrid, ratio: f64) -> Result<GrayImage, EngineError> {
    stencil::threshold_mask(grid, ratio)
}

/// The current grid with the contour traced from its highest-energy
/// interior cell painted [`CONTOUR`] and that cell circled in
/// [`CONTOUR_START`].
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn top_contour(grid: &PixelGrid, config: &EngineConfig) -> Result<RgbaImage, EngineError> {
    let mut image = grid.materialize()?;
    let start = contour::hottest_interior_cell(grid)?;

    if let Some(found) = contour::trace_contour(grid, start, config)? {
        for &(x, y) in found.points() {
            image.put_pixel(x, y, CONTOUR);
        }
    }

    let (x, y) = start;
    let center = (
        i32::try_from(x).unwrap_or(i32::MAX),
        i32::try_from(y).unwrap_or(i32::MAX),
    );
    imageproc::drawing::draw_hollow_circle_mut(&mut image, center, START_MARK_RADIUS, CONTOUR_START);
    Ok(image)
}
