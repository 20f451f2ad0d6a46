use crate::error::ExtractError;
use image::{GrayImage, Luma, RgbImage};

/// BT.601 luma weights in 14-bit fixed point (0.299, 0.587, 0.114)
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Convert the color buffer to single-channel luminance
///
/// Uses BT.601 weights with round-to-nearest, the same integer formula as
/// OpenCV's `COLOR_BGR2GRAY`, rather than the Rec.709 weights of
/// `DynamicImage::to_luma8`.
pub fn apply(image: RgbImage) -> Result<GrayImage, ExtractError> {
    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let weighted = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
        Luma([((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8])
    }))
}
