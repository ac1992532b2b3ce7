//! Shared types for the dtw seam-carving engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference the
/// bilevel stencil and energy dumps without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can hand decoded bitmaps
/// to the engine without depending on `image` directly.
pub use image::RgbaImage;

/// Smallest supported width or height, in pixels.
///
/// Seam search needs an interior column/row on either side of a
/// boundary, so anything narrower than three pixels is rejected at
/// construction time.
pub const MIN_DIMENSION: u32 = 3;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether both axes meet [`MIN_DIMENSION`].
    #[must_use]
    pub const fn is_supported(self) -> bool {
        self.width >= MIN_DIMENSION && self.height >= MIN_DIMENSION
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What [`crate::Engine::resize`] does when a requested dimension is
/// larger than the current one.
///
/// The engine only removes seams; it never inserts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnlargementPolicy {
    /// Fail with [`EngineError::UnsupportedEnlargement`] before any seam
    /// is removed.
    #[default]
    Reject,
    /// Leave the oversize dimension untouched and log a warning. The
    /// other dimension is still carved.
    Ignore,
}

impl fmt::Display for EnlargementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("Reject"),
            Self::Ignore => f.write_str("Ignore"),
        }
    }
}

/// Configuration for the seam-carving engine.
///
/// All parameters have defaults matching the behaviour of the console
/// front end. Call [`validate`](Self::validate) (done automatically by
/// [`crate::Engine::with_config`]) before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stencil detail ratio `R`: the top `1/R` of cells by energy are
    /// drawn as outline. Values `<= 0` (or non-finite) fall back to
    /// [`DEFAULT_DETAIL_RATIO`](Self::DEFAULT_DETAIL_RATIO).
    pub detail_ratio: f64,

    /// Behaviour when a resize target exceeds the current size.
    pub enlargement: EnlargementPolicy,

    /// Whether to maintain diagonal neighbour links.
    ///
    /// Seam removal only re-links the four orthogonal neighbours, so
    /// `true` is rejected by [`validate`](Self::validate).
    pub diagonal_adjacency: bool,

    /// Check every link invariant after each seam removal and tombstone
    /// removed cells with [`deleted_energy`](Self::deleted_energy).
    pub validate_topology: bool,

    /// Finite sentinel given to boundary cells before their gradient is
    /// computed. Must exceed any real dual-gradient energy.
    pub border_energy: f64,

    /// Energy written into removed cells when `validate_topology` is on.
    /// Must be negative so it cannot collide with a real energy.
    pub deleted_energy: f64,

    /// Shortest closed walk accepted by contour search.
    pub contour_min_length: usize,

    /// Number of relaxation layers contour search runs.
    pub contour_max_length: usize,

    /// Maximum number of cells the contour search region may contain.
    pub contour_max_cells: usize,
}

impl EngineConfig {
    /// Default stencil detail ratio.
    pub const DEFAULT_DETAIL_RATIO: f64 = 20.0;
    /// Default boundary sentinel energy.
    pub const DEFAULT_BORDER_ENERGY: f64 = 1.0e6;
    /// Default tombstone energy.
    pub const DEFAULT_DELETED_ENERGY: f64 = -1.0;
    /// Default minimum contour length.
    pub const DEFAULT_CONTOUR_MIN_LENGTH: usize = 8;
    /// Default number of contour relaxation layers.
    pub const DEFAULT_CONTOUR_MAX_LENGTH: usize = 64;
    /// Default contour region size.
    pub const DEFAULT_CONTOUR_MAX_CELLS: usize = 256;

    /// The detail ratio actually used by the stencil renderer.
    #[must_use]
    pub fn effective_detail_ratio(&self) -> f64 {
        effective_detail_ratio(self.detail_ratio)
    }

    /// Check the configuration for values the engine cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.diagonal_adjacency {
            return Err(EngineError::InvalidConfig(
                "diagonal adjacency is not maintained by seam removal".to_owned(),
            ));
        }
        if !self.border_energy.is_finite() || self.border_energy <= crate::energy::MAX_ENERGY {
            return Err(EngineError::InvalidConfig(format!(
                "border_energy must be finite and greater than {}, got {}",
                crate::energy::MAX_ENERGY,
                self.border_energy,
            )));
        }
        if self.deleted_energy.is_nan() || self.deleted_energy >= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "deleted_energy must be negative, got {}",
                self.deleted_energy,
            )));
        }
        if self.contour_min_length < 3 {
            return Err(EngineError::InvalidConfig(format!(
                "contour_min_length must be at least 3, got {}",
                self.contour_min_length,
            )));
        }
        if self.contour_max_length < self.contour_min_length {
            return Err(EngineError::InvalidConfig(format!(
                "contour_max_length ({}) is below contour_min_length ({})",
                self.contour_max_length, self.contour_min_length,
            )));
        }
        if self.contour_max_cells < 4 {
            return Err(EngineError::InvalidConfig(format!(
                "contour_max_cells must be at least 4, got {}",
                self.contour_max_cells,
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detail_ratio: Self::DEFAULT_DETAIL_RATIO,
            enlargement: EnlargementPolicy::default(),
            diagonal_adjacency: false,
            validate_topology: false,
            border_energy: Self::DEFAULT_BORDER_ENERGY,
            deleted_energy: Self::DEFAULT_DELETED_ENERGY,
            contour_min_length: Self::DEFAULT_CONTOUR_MIN_LENGTH,
            contour_max_length: Self::DEFAULT_CONTOUR_MAX_LENGTH,
            contour_max_cells: Self::DEFAULT_CONTOUR_MAX_CELLS,
        }
    }
}

/// Map a caller-supplied detail ratio onto the one the stencil uses.
#[must_use]
pub fn effective_detail_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        EngineConfig::DEFAULT_DETAIL_RATIO
    }
}

/// Errors that can occur while building or operating the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Source image or resize target is smaller than the supported minimum.
    #[error("image dimensions {width}x{height} are below the minimum of {minimum}x{minimum}")]
    InvalidDimensions {
        /// Offending width.
        width: u32,
        /// Offending height.
        height: u32,
        /// The minimum allowed in either axis.
        minimum: u32,
    },

    /// A resize target is larger than the current image.
    #[error("cannot enlarge {current} to {requested}: seam insertion is not supported")]
    UnsupportedEnlargement {
        /// Size before the request.
        current: Dimensions,
        /// Size that was asked for.
        requested: Dimensions,
    },

    /// Engine configuration is invalid.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// A logical coordinate lies outside the current grid.
    #[error("cell ({x}, {y}) is outside the current grid")]
    CellOutOfBounds {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },

    /// An internal adjacency invariant was violated.
    #[error("grid topology is corrupt: {0}")]
    CorruptTopology(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_display_and_area() {
        let d = Dimensions::new(640, 480);
        assert_eq!(d.to_string(), "640x480");
        assert_eq!(d.area(), 307_200);
    }

    #[test]
    fn dimensions_support_threshold() {
        assert!(Dimensions::new(3, 3).is_supported());
        assert!(!Dimensions::new(2, 30).is_supported());
        assert!(!Dimensions::new(30, 2).is_supported());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn diagonal_adjacency_is_rejected() {
        let config = EngineConfig {
            diagonal_adjacency: true,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn border_energy_must_dominate_real_energies() {
        let config = EngineConfig {
            border_energy: 10.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            border_energy: f64::INFINITY,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deleted_energy_must_be_negative() {
        let config = EngineConfig {
            deleted_energy: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn contour_lengths_must_be_ordered() {
        let config = EngineConfig {
            contour_min_length: 10,
            contour_max_length: 9,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_detail_ratio_falls_back() {
        assert!((effective_detail_ratio(0.0) - 20.0).abs() < f64::EPSILON);
        assert!((effective_detail_ratio(-3.0) - 20.0).abs() < f64::EPSILON);
        assert!((effective_detail_ratio(f64::NAN) - 20.0).abs() < f64::EPSILON);
        assert!((effective_detail_ratio(7.5) - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = EngineConfig {
            detail_ratio: 12.0,
            enlargement: EnlargementPolicy::Ignore,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn partial_config_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "detail_ratio": 5.0 }"#).unwrap();
        assert!((config.detail_ratio - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.enlargement, EnlargementPolicy::Reject);
    }

    #[test]
    fn enlargement_error_mentions_both_sizes() {
        let err = EngineError::UnsupportedEnlargement {
            current: Dimensions::new(10, 10),
            requested: Dimensions::new(20, 10),
        };
        let msg = err.to_string();
        assert!(msg.contains("10x10"));
        assert!(msg.contains("20x10"));
    }
}
