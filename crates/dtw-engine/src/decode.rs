//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! bitmap the engine is built from.

use crate::types::{EngineError, RgbaImage};

/// Decode raw image bytes into an RGBA bitmap.
///
/// Supports whatever formats the `image` crate was built with. Images
/// without an alpha channel come back fully opaque.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}
