//! dtw-engine: content-aware resizing and coloring-page rendering
//! (sans-IO).
//!
//! A decoded bitmap becomes a [`PixelGrid`]: an arena of cells linked to
//! their four neighbours, each carrying a dual-gradient energy. From
//! there:
//!
//! - [`Engine::resize`] shrinks the image by repeatedly finding and
//!   splicing out the minimum-energy seam.
//! - [`Engine::render_coloring_page`] thresholds the energy map into a
//!   black-on-white outline.
//! - [`contour`] searches for high-energy closed outlines (experimental).
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! bitmaps and byte slices. Reading and writing files lives in the `dtw`
//! binary.

pub mod carve;
pub mod contour;
pub mod decode;
pub mod diagnostics;
pub mod dump;
pub mod energy;
pub mod engine;
pub mod grid;
pub mod resize;
pub mod seam;
pub mod stencil;
pub mod types;

pub use diagnostics::{Clock, NoClock, ResizeDiagnostics};
pub use engine::Engine;
pub use grid::{CellId, PixelGrid, Side};
pub use seam::{Direction, Seam};
pub use types::{
    Dimensions, EngineConfig, EngineError, EnlargementPolicy, GrayImage, MIN_DIMENSION, RgbaImage,
};
