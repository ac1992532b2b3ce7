//! The engine facade: one decoded bitmap, many renderings.
//!
//! An [`Engine`] owns a [`PixelGrid`] built once from the source bitmap.
//! [`resize`](Engine::resize) carves a clone so the engine can be asked
//! for several sizes in turn; [`resize_in_place`](Engine::resize_in_place)
//! carves the engine's own grid when the original is no longer needed.

use crate::contour::{self, Contour};
use crate::decode;
use crate::diagnostics::{Clock, NoClock, ResizeDiagnostics};
use crate::dump;
use crate::energy::EnergyModel;
use crate::grid::PixelGrid;
use crate::resize;
use crate::stencil;
use crate::types::{Dimensions, EngineConfig, EngineError, GrayImage, RgbaImage};

/// Seam-carving engine over one source bitmap.
#[derive(Debug, Clone)]
pub struct Engine {
    grid: PixelGrid,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDimensions`] if either side of
    /// `bitmap` is below [`crate::MIN_DIMENSION`].
    pub fn new(bitmap: &RgbaImage) -> Result<Self, EngineError> {
        Self::with_config(bitmap, EngineConfig::default())
    }

    /// Build an engine with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` fails
    /// [`EngineConfig::validate`], and [`EngineError::InvalidDimensions`]
    /// as for [`new`](Self::new).
    pub fn with_config(bitmap: &RgbaImage, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let grid = PixelGrid::build(bitmap, EnergyModel::from_config(&config))?;
        log::info!("built {} engine", grid.dimensions());
        Ok(Self { grid, config })
    }

    /// Decode `bytes` and build an engine from the result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyInput`] or [`EngineError::ImageDecode`]
    /// if decoding fails, otherwise as for
    /// [`with_config`](Self::with_config).
    pub fn from_bytes(bytes: &[u8], config: EngineConfig) -> Result<Self, EngineError> {
        let bitmap = decode::decode(bytes)?;
        Self::with_config(&bitmap, config)
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current logical size.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.grid.dimensions()
    }

    /// The underlying linked grid.
    #[must_use]
    pub const fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    /// The current grid as a bitmap. Before any in-place resize this is
    /// the source bitmap, pixel for pixel.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn original(&self) -> Result<RgbaImage, EngineError> {
        self.grid.materialize()
    }

    /// Resize a copy of the grid to `target` and return it as a bitmap.
    /// The engine itself is unchanged.
    ///
    /// # Errors
    ///
    /// See [`resize::resize`].
    pub fn resize(&self, target: Dimensions) -> Result<RgbaImage, EngineError> {
        self.resize_with_clock(target, &NoClock).map(|(image, _)| image)
    }

    /// [`resize`](Self::resize), also returning timing and seam
    /// statistics measured with `clock`.
    ///
    /// # Errors
    ///
    /// See [`resize::resize`].
    pub fn resize_with_clock<C: Clock>(
        &self,
        target: Dimensions,
        clock: &C,
    ) -> Result<(RgbaImage, ResizeDiagnostics), EngineError> {
        let mut grid = self.grid.clone();
        let diagnostics = resize::resize(&mut grid, target, &self.config, clock)?;
        Ok((grid.materialize()?, diagnostics))
    }

    /// Resize the engine's own grid to `target`.
    ///
    /// On error the grid keeps every seam removed before the failure.
    ///
    /// # Errors
    ///
    /// See [`resize::resize`].
    pub fn resize_in_place<C: Clock>(
        &mut self,
        target: Dimensions,
        clock: &C,
    ) -> Result<ResizeDiagnostics, EngineError> {
        resize::resize(&mut self.grid, target, &self.config, clock)
    }

    /// The coloring page at detail ratio `ratio`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn render_coloring_page(&self, ratio: f64) -> Result<GrayImage, EngineError> {
        stencil::render_stencil(&self.grid, ratio)
    }

    /// The coloring page at detail ratio `ratio`, scaled to `size`.
    ///
    /// # Errors
    ///
    /// See [`stencil::render_stencil_scaled`].
    pub fn render_coloring_page_scaled(
        &self,
        ratio: f64,
        size: Dimensions,
    ) -> Result<GrayImage, EngineError> {
        stencil::render_stencil_scaled(&self.grid, ratio, size)
    }

    /// Trace a contour through the cell at `(x, y)`.
    ///
    /// # Errors
    ///
    /// See [`contour::trace_contour`].
    pub fn trace_contour(&self, x: u32, y: u32) -> Result<Option<Contour>, EngineError> {
        contour::trace_contour(&self.grid, (x, y), &self.config)
    }

    /// Karp's minimum-mean cycle around `(x, y)`.
    ///
    /// # Errors
    ///
    /// See [`contour::reference_contour`].
    pub fn reference_contour(&self, x: u32, y: u32) -> Result<Option<Contour>, EngineError> {
        contour::reference_contour(&self.grid, (x, y), &self.config)
    }

    /// See [`dump::energy`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn dump_energy(&self) -> Result<GrayImage, EngineError> {
        dump::energy(&self.grid)
    }

    /// See [`dump::image`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn dump_image(&self) -> Result<RgbaImage, EngineError> {
        dump::image(&self.grid)
    }

    /// See [`dump::seams`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn dump_seams(&self) -> Result<RgbaImage, EngineError> {
        dump::seams(&self.grid)
    }

    /// See [`dump::threshold_mask`]. Uses the configured detail ratio.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn dump_threshold_mask(&self) -> Result<GrayImage, EngineError> {
        dump::threshold_mask(&self.grid, self.config.detail_ratio)
    }

    /// See [`dump::top_contour`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the grid cannot be
    /// walked.
    pub fn dump_top_contour(&self) -> Result<RgbaImage, EngineError> {
        dump::top_contour(&self.grid, &self.config)
    }
}
