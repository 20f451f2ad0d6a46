//! Decoding of uploaded image bytes

use crate::context::RequestContext;
use crate::error::ExtractError;
use image::{ImageFormat, RgbImage};

/// Decode PNG or JPEG bytes into a 3-channel buffer
pub fn load(bytes: &[u8], ctx: &RequestContext) -> Result<RgbImage, ExtractError> {
    let format = match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
        Ok(other) => {
            tracing::error!(request_id = %ctx.request_id, "Rejected {:?} upload", other);
            return Err(ExtractError::UnsupportedFormat(format!("{:?}", other)));
        }
        Err(_) => {
            tracing::error!(
                request_id = %ctx.request_id,
                "Upload is not a recognizable image ({} bytes)",
                bytes.len()
            );
            return Err(ExtractError::UnsupportedFormat("unknown".to_string()));
        }
    };

    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, "Error loading image: {}", e);
        ExtractError::DecodeFailed(e.to_string())
    })?;

    let rgb = img.into_rgb8();
    tracing::debug!(
        request_id = %ctx.request_id,
        "Image loaded successfully ({}x{}, {:?})",
        rgb.width(),
        rgb.height(),
        format
    );

    Ok(rgb)
}
