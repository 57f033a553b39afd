//! Auto-placement from a body-part segmentation mask
//!
//! Scans the mask for torso pixels and seeds a [`PlacementState`] centred on
//! the torso bounding box.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PlacementState;
use crate::garment::GarmentCalibration;

/// Part id for pixels outside the person
pub const BACKGROUND_PART: i32 = -1;
/// Torso, front facing
pub const TORSO_FRONT: i32 = 12;
/// Torso, back facing
pub const TORSO_BACK: i32 = 13;
/// Part ids treated as torso
pub const TORSO_PARTS: [i32; 2] = [TORSO_FRONT, TORSO_BACK];

/// Ratio between torso width fraction and garment scale (empirically tuned)
const TORSO_SCALE_FACTOR: f32 = 2.0;

#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("no torso detected in segmentation")]
    NotFound,
    #[error("segmentation mask is empty")]
    EmptyMask,
    #[error("segmentation mask has {actual} labels, expected {expected}")]
    MaskSizeMismatch { expected: usize, actual: usize },
}

/// Per-pixel part labels over a photo, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub width: u32,
    pub height: u32,
    pub data: Vec<i32>,
}

impl SegmentationResult {
    pub fn new(width: u32, height: u32, data: Vec<i32>) -> Result<Self, EstimateError> {
        if width == 0 || height == 0 {
            return Err(EstimateError::EmptyMask);
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(EstimateError::MaskSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Mask with every pixel set to background
    pub fn background(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![BACKGROUND_PART; width as usize * height as usize],
        }
    }

    /// Label of a pixel, `None` outside the mask
    pub fn part_at(&self, x: u32, y: u32) -> Option<i32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }

    /// Label every pixel inside an inclusive rectangle
    pub fn fill_rect(&mut self, min: (u32, u32), max: (u32, u32), part: i32) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        for y in min.1..=max.1.min(self.height.saturating_sub(1)) {
            for x in min.0..=max.0.min(self.width.saturating_sub(1)) {
                let idx = (y * self.width + x) as usize;
                self.data[idx] = part;
            }
        }
    }
}

/// Axis-aligned box over torso pixels, in photo pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorsoBoundingBox {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    /// False when no torso pixel was seen; the bounds are then meaningless
    pub found: bool,
}

impl TorsoBoundingBox {
    /// Scan every label and grow the box over torso pixels
    pub fn scan(segmentation: &SegmentationResult) -> Self {
        let width = segmentation.width.max(1);
        let mut bbox = TorsoBoundingBox {
            min_x: segmentation.width,
            max_x: 0,
            min_y: segmentation.height,
            max_y: 0,
            found: false,
        };

        for (i, part) in segmentation.data.iter().enumerate() {
            if !TORSO_PARTS.contains(part) {
                continue;
            }
            let x = i as u32 % width;
            let y = i as u32 / width;
            bbox.min_x = bbox.min_x.min(x);
            bbox.max_x = bbox.max_x.max(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_y = bbox.max_y.max(y);
            bbox.found = true;
        }
        bbox
    }

    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x) as f32
    }

    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y) as f32
    }

    /// Box centre in photo pixels
    pub fn center(&self) -> (f32, f32) {
        (
            self.min_x as f32 + self.width() / 2.0,
            self.min_y as f32 + self.height() / 2.0,
        )
    }
}

/// Size of the element the garment is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Seed placement from a segmentation mask.
///
/// A container without area falls back to the photo's own size.
pub fn estimate_placement(
    segmentation: &SegmentationResult,
    container: ContainerSize,
) -> Result<PlacementState, EstimateError> {
    if segmentation.width == 0 || segmentation.height == 0 {
        return Err(EstimateError::EmptyMask);
    }

    let bbox = TorsoBoundingBox::scan(segmentation);
    if !bbox.found {
        return Err(EstimateError::NotFound);
    }

    let photo_w = segmentation.width as f32;
    let photo_h = segmentation.height as f32;
    let container_w = if container.width > 0.0 { container.width } else { photo_w };
    let container_h = if container.height > 0.0 { container.height } else { photo_h };

    let (center_x, center_y) = bbox.center();
    let rel_x = (center_x / photo_w) * container_w - container_w / 2.0;
    let rel_y = (center_y / photo_h) * container_h - container_h / 2.0;
    let scale = (bbox.width() / photo_w) * TORSO_SCALE_FACTOR;

    tracing::debug!(
        center_x,
        center_y,
        torso_width = bbox.width(),
        rel_x,
        rel_y,
        scale,
        "Estimated garment placement"
    );

    Ok(PlacementState::new(rel_x, rel_y, scale))
}

/// [`estimate_placement`] adjusted by a garment's calibration
pub fn estimate_placement_calibrated(
    segmentation: &SegmentationResult,
    container: ContainerSize,
    calibration: &GarmentCalibration,
) -> Result<PlacementState, EstimateError> {
    let mut state = estimate_placement(segmentation, container)?;
    let container_h = if container.height > 0.0 {
        container.height
    } else {
        segmentation.height as f32
    };
    state.scale *= calibration.scale_factor;
    state.offset_y += calibration.vertical_offset * container_h;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torso_mask() -> SegmentationResult {
        let mut seg = SegmentationResult::background(200, 100);
        seg.fill_rect((10, 20), (110, 70), TORSO_FRONT);
        seg
    }

    #[test]
    fn test_no_torso_is_not_found() {
        let mut seg = SegmentationResult::background(50, 50);
        // Arms and head only
        seg.fill_rect((0, 0), (10, 10), 0);
        seg.fill_rect((30, 30), (40, 40), 7);
        assert_eq!(
            estimate_placement(&seg, ContainerSize::new(400.0, 300.0)),
            Err(EstimateError::NotFound)
        );
        assert!(!TorsoBoundingBox::scan(&seg).found);
    }

    #[test]
    fn test_reference_geometry() {
        let seg = torso_mask();
        let bbox = TorsoBoundingBox::scan(&seg);
        assert!(bbox.found);
        assert_eq!((bbox.min_x, bbox.max_x, bbox.min_y, bbox.max_y), (10, 110, 20, 70));
        assert_eq!(bbox.center(), (60.0, 45.0));
        assert_eq!(bbox.width(), 100.0);

        let state = estimate_placement(&seg, ContainerSize::new(400.0, 300.0)).unwrap();
        assert!((state.offset_x - -80.0).abs() < 1e-4);
        assert!((state.offset_y - -15.0).abs() < 1e-4);
        assert!((state.scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_torso_back_counts() {
        let mut seg = SegmentationResult::background(10, 10);
        seg.fill_rect((2, 2), (5, 7), TORSO_BACK);
        let bbox = TorsoBoundingBox::scan(&seg);
        assert!(bbox.found);
        assert_eq!((bbox.min_x, bbox.max_x), (2, 5));
    }

    #[test]
    fn test_single_pixel_torso_is_degenerate_but_found() {
        let mut seg = SegmentationResult::background(10, 10);
        seg.fill_rect((4, 4), (4, 4), TORSO_FRONT);
        let state = estimate_placement(&seg, ContainerSize::new(10.0, 10.0)).unwrap();
        assert_eq!(state.scale, 0.0);
        assert_eq!(state.offset_x, -1.0);
    }

    #[test]
    fn test_zero_container_falls_back_to_photo() {
        let seg = torso_mask();
        let state = estimate_placement(&seg, ContainerSize::new(0.0, 0.0)).unwrap();
        assert!((state.offset_x - -40.0).abs() < 1e-4);
        assert!((state.offset_y - -5.0).abs() < 1e-4);
    }

    #[test]
    fn test_calibration_identity_and_offset() {
        let seg = torso_mask();
        let container = ContainerSize::new(400.0, 300.0);
        let plain = estimate_placement(&seg, container).unwrap();
        let same =
            estimate_placement_calibrated(&seg, container, &GarmentCalibration::default()).unwrap();
        assert_eq!(plain, same);

        let calibration = GarmentCalibration {
            scale_factor: 0.6,
            vertical_offset: 0.15,
        };
        let tuned = estimate_placement_calibrated(&seg, container, &calibration).unwrap();
        assert!((tuned.scale - 0.6).abs() < 1e-6);
        assert!((tuned.offset_y - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_mask_size_validation() {
        assert_eq!(
            SegmentationResult::new(2, 2, vec![0; 3]),
            Err(EstimateError::MaskSizeMismatch { expected: 4, actual: 3 })
        );
        assert_eq!(SegmentationResult::new(0, 2, vec![]), Err(EstimateError::EmptyMask));
        assert!(SegmentationResult::new(2, 1, vec![12, -1]).is_ok());
    }

    #[test]
    fn test_fill_rect_on_empty_mask() {
        let mut seg = SegmentationResult::background(0, 5);
        seg.fill_rect((0, 0), (3, 3), TORSO_FRONT);
        assert!(seg.data.is_empty());
        assert_eq!(
            estimate_placement(&seg, ContainerSize::new(10.0, 10.0)),
            Err(EstimateError::EmptyMask)
        );
    }
}
