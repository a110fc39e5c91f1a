use image::{imageops, RgbImage};

use super::CropRegion;
use crate::panorama::Panorama;

/// Copy a crop out of the panorama. Split regions are concatenated
/// horizontally, tail first.
pub fn extract_crop(panorama: &Panorama, region: &CropRegion) -> RgbImage {
    let src = panorama.image();
    let mut out = RgbImage::new(region.width(), region.height());
    let mut x_off = 0i64;
    for r in region.rects() {
        let part = imageops::crop_imm(src, r.x, r.y, r.width, r.height).to_image();
        imageops::replace(&mut out, &part, x_off, 0);
        x_off += r.width as i64;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PixelRect;
    use crate::test_utils::{decode_gradient, gradient_panorama};

    #[test]
    fn single_region_copies_pixels() {
        let pano = gradient_panorama(64, 32);
        let crop = extract_crop(&pano, &CropRegion::Single(PixelRect::new(10, 4, 6, 3)));
        assert_eq!(crop.dimensions(), (6, 3));
        assert_eq!(decode_gradient(crop.get_pixel(0, 0), 64, 32), (10, 4));
        assert_eq!(decode_gradient(crop.get_pixel(5, 2), 64, 32), (15, 6));
    }

    #[test]
    fn split_region_is_contiguous_across_the_seam() {
        let pano = gradient_panorama(64, 32);
        let region = CropRegion::Split {
            tail: PixelRect::new(60, 8, 4, 2),
            head: PixelRect::new(0, 8, 3, 2),
        };
        let crop = extract_crop(&pano, &region);
        assert_eq!(crop.dimensions(), (7, 2));
        let cols: Vec<u32> = (0..7)
            .map(|x| decode_gradient(crop.get_pixel(x, 1), 64, 32).0)
            .collect();
        assert_eq!(cols, vec![60, 61, 62, 63, 0, 1, 2]);
    }
}
