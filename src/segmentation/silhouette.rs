//! Silhouette fallback segmenter
//!
//! Separates the subject from a roughly uniform backdrop by colour distance
//! to the image border, then labels a fixed vertical band of the silhouette
//! as torso. It has no notion of body parts, so it is only used when no ONNX
//! part model is available and `silhouetteFallback` is switched on, and as a
//! deterministic model in tests.

use image::RgbaImage;

use super::{SegmentationError, SegmentationModel};
use crate::placement::{SegmentationResult, BACKGROUND_PART, TORSO_FRONT};

/// Label for person pixels outside the torso band
pub const OTHER_PART: i32 = 0;

/// Default colour distance separating subject from backdrop
pub const DEFAULT_THRESHOLD: f32 = 60.0;
/// Pixels more transparent than this are background
const ALPHA_CUTOFF: u8 = 16;
/// Torso band as fractions of silhouette height, from the top
const TORSO_TOP: f32 = 0.2;
const TORSO_BOTTOM: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct SilhouetteSegmenter {
    threshold: f32,
}

impl Default for SilhouetteSegmenter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SilhouetteSegmenter {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Mean colour of the outermost pixel ring
    fn border_color(image: &RgbaImage) -> [f32; 3] {
        let (w, h) = image.dimensions();
        let mut sum = [0.0f64; 3];
        let mut count = 0u64;
        for (x, y, px) in image.enumerate_pixels() {
            if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                for c in 0..3 {
                    sum[c] += px[c] as f64;
                }
                count += 1;
            }
        }
        let n = count.max(1) as f64;
        [
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
        ]
    }
}

impl SegmentationModel for SilhouetteSegmenter {
    fn name(&self) -> &str {
        "silhouette"
    }

    fn segment_parts(&self, image: &RgbaImage) -> Result<SegmentationResult, SegmentationError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(SegmentationError::Failed("image has no pixels".to_string()));
        }

        let backdrop = Self::border_color(image);
        let threshold_sq = self.threshold * self.threshold;

        let mut data = vec![BACKGROUND_PART; w as usize * h as usize];
        let mut rows: Option<(u32, u32)> = None;

        for (x, y, px) in image.enumerate_pixels() {
            if px[3] < ALPHA_CUTOFF {
                continue;
            }
            let dist_sq: f32 = (0..3)
                .map(|c| {
                    let d = px[c] as f32 - backdrop[c];
                    d * d
                })
                .sum();
            if dist_sq <= threshold_sq {
                continue;
            }
            data[(y * w + x) as usize] = OTHER_PART;
            rows = Some(match rows {
                Some((top, bottom)) => (top.min(y), bottom.max(y)),
                None => (y, y),
            });
        }

        if let Some((top, bottom)) = rows {
            let extent = (bottom - top) as f32;
            let band_top = top + (extent * TORSO_TOP).ceil() as u32;
            let band_bottom = top + (extent * TORSO_BOTTOM).floor() as u32;
            for y in band_top..=band_bottom.min(h - 1) {
                let row = (y * w) as usize;
                for label in &mut data[row..row + w as usize] {
                    if *label == OTHER_PART {
                        *label = TORSO_FRONT;
                    }
                }
            }
        }

        SegmentationResult::new(w, h, data).map_err(|e| SegmentationError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::TorsoBoundingBox;
    use image::Rgba;

    fn figure() -> RgbaImage {
        RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (5..35).contains(&y) {
                Rgba([30, 30, 40, 255])
            } else {
                Rgba([240, 240, 240, 255])
            }
        })
    }

    #[test]
    fn test_torso_band_of_figure() {
        let mask = SilhouetteSegmenter::default().segment_parts(&figure()).unwrap();
        let bbox = TorsoBoundingBox::scan(&mask);
        assert!(bbox.found);
        assert_eq!((bbox.min_x, bbox.max_x), (10, 29));
        assert_eq!((bbox.min_y, bbox.max_y), (11, 22));
        assert_eq!(mask.part_at(0, 0), Some(BACKGROUND_PART));
        assert_eq!(mask.part_at(15, 6), Some(OTHER_PART));
    }

    #[test]
    fn test_plain_backdrop_has_no_torso() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([200, 200, 200, 255]));
        let mask = SilhouetteSegmenter::default().segment_parts(&img).unwrap();
        assert!(!TorsoBoundingBox::scan(&mask).found);
    }

    #[test]
    fn test_transparent_pixels_are_background() {
        let img = RgbaImage::from_fn(8, 8, |x, _| {
            if x == 4 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let mask = SilhouetteSegmenter::default().segment_parts(&img).unwrap();
        assert!(mask.data.iter().all(|&p| p == BACKGROUND_PART));
    }
}
