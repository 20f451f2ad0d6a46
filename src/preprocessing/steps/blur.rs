use crate::error::ExtractError;
use image::GrayImage;
use imageproc::filter::separable_filter_equal;

/// 5-tap binomial Gaussian (sigma ~1.1), applied along both axes for a 5x5 kernel
const GAUSSIAN_5: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Apply a fixed 5x5 Gaussian blur
/// Suppresses compression artifacts and surface texture that produce false text edges
///
/// Edge pixels are replicated past the border and results are truncated to
/// `u8`. OpenCV's `GaussianBlur` reflects (`BORDER_REFLECT_101`) and rounds,
/// so values can differ by a gray level or two, mostly near the edges.
pub fn apply(image: GrayImage) -> Result<GrayImage, ExtractError> {
    Ok(separable_filter_equal(&image, &GAUSSIAN_5))
}
