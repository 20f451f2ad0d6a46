use crate::error::ExtractError;
use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

/// Apply Otsu global thresholding
/// Picks the single cutoff that maximizes between-class variance, then maps
/// pixels above it to 255 and everything else to 0
pub fn apply(image: GrayImage) -> Result<GrayImage, ExtractError> {
    let level = otsu_level(&image);
    tracing::debug!("Otsu level: {}", level);
    Ok(threshold(&image, level, ThresholdType::Binary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(img).unwrap();

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_separates_text_from_background() {
        // Dark text band on a light label
        let mut img = GrayImage::from_pixel(50, 20, Luma([230]));
        for y in 8..12 {
            for x in 10..40 {
                img.put_pixel(x, y, Luma([25]));
            }
        }

        let result = apply(img).unwrap();

        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 2).0[0], 255);
    }
}
