//! ONNX Runtime body-part segmentation
//!
//! Runs a BodyPix-style part model exported to ONNX. The model takes one
//! `[1, 3, S, S]` float input (RGB scaled to -1..1, photo letterboxed into the
//! square) and produces one `[1, 25, h, w]` logit output: channel 0 is
//! background, channels 1..=24 are the body parts in the 24-part layout, so
//! channel `c` maps to part id `c - 1`. The output grid may be coarser than the
//! input (output stride); it is mapped back onto every photo pixel.

use std::path::PathBuf;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use ndarray::{Array4, ArrayView4, Ix4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::{SegmentationError, SegmentationModel};
use crate::placement::{SegmentationResult, BACKGROUND_PART};

/// Body parts in the model's layout
pub const PART_COUNT: usize = 24;
/// Output channels: background plus every part
pub const OUTPUT_CHANNELS: usize = PART_COUNT + 1;

#[derive(Debug, Clone, PartialEq)]
pub struct OnnxConfig {
    pub model_path: PathBuf,
    /// Side of the square model input
    pub input_size: u32,
    pub intra_threads: usize,
}

/// Where the scaled photo sits inside the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    size: u32,
    scale: f32,
    scaled_width: u32,
    scaled_height: u32,
    offset_x: u32,
    offset_y: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, size: u32) -> Self {
        let size_f = size as f32;
        let scale = (size_f / width as f32).min(size_f / height as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            size,
            scale,
            scaled_width,
            scaled_height,
            offset_x: (size - scaled_width) / 2,
            offset_y: (size - scaled_height) / 2,
        }
    }

    /// Photo pixel centre in model input coordinates
    fn to_input(&self, x: u32, y: u32) -> (f32, f32) {
        (
            (x as f32 + 0.5) * self.scale + self.offset_x as f32,
            (y as f32 + 0.5) * self.scale + self.offset_y as f32,
        )
    }
}

/// Resize, centre and normalise a photo into an NCHW tensor
fn preprocess(image: &RgbaImage, letterbox: &Letterbox) -> Array4<f32> {
    let resized = imageops::resize(
        image,
        letterbox.scaled_width,
        letterbox.scaled_height,
        FilterType::Triangle,
    );
    let size = letterbox.size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, px) in resized.enumerate_pixels() {
        let tx = (x + letterbox.offset_x) as usize;
        let ty = (y + letterbox.offset_y) as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = px[c] as f32 / 127.5 - 1.0;
        }
    }
    tensor
}

/// Per-pixel argmax over the logit channels, mapped back to photo pixels
fn labels_from_logits(
    logits: ArrayView4<'_, f32>,
    width: u32,
    height: u32,
    letterbox: &Letterbox,
) -> Result<SegmentationResult, SegmentationError> {
    let shape = logits.shape();
    if shape[0] != 1 || shape[1] != OUTPUT_CHANNELS || shape[2] == 0 || shape[3] == 0 {
        return Err(SegmentationError::Failed(format!(
            "unexpected model output shape {:?}, want [1, {}, h, w]",
            shape, OUTPUT_CHANNELS
        )));
    }
    let (mask_h, mask_w) = (shape[2], shape[3]);
    let ratio_x = mask_w as f32 / letterbox.size as f32;
    let ratio_y = mask_h as f32 / letterbox.size as f32;

    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let (ix, iy) = letterbox.to_input(x, y);
            let mx = ((ix * ratio_x) as usize).min(mask_w - 1);
            let my = ((iy * ratio_y) as usize).min(mask_h - 1);

            let mut best = 0;
            for c in 1..OUTPUT_CHANNELS {
                if logits[[0, c, my, mx]] > logits[[0, best, my, mx]] {
                    best = c;
                }
            }
            data.push(if best == 0 {
                BACKGROUND_PART
            } else {
                best as i32 - 1
            });
        }
    }

    SegmentationResult::new(width, height, data).map_err(|e| SegmentationError::Failed(e.to_string()))
}

/// Part segmentation backed by ONNX Runtime
pub struct OnnxPartSegmenter {
    // Running a session needs exclusive access
    session: Mutex<Session>,
    input_size: u32,
    name: String,
}

impl OnnxPartSegmenter {
    /// Build an inference session for the configured model file
    pub fn load(config: &OnnxConfig) -> Result<Self, SegmentationError> {
        if !config.model_path.is_file() {
            return Err(SegmentationError::Unavailable(format!(
                "segmentation model {} not found",
                config.model_path.display()
            )));
        }
        if config.input_size == 0 {
            return Err(SegmentationError::Unavailable(
                "segmentation input size must be positive".to_string(),
            ));
        }

        let session = Self::build_session(config).map_err(|e| {
            SegmentationError::Unavailable(format!("{}: {}", config.model_path.display(), e))
        })?;

        let name = config
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        tracing::info!(
            model = %config.model_path.display(),
            input_size = config.input_size,
            threads = config.intra_threads,
            "ONNX part segmentation session created"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
            name,
        })
    }

    fn build_session(config: &OnnxConfig) -> Result<Session, String> {
        Session::builder()
            .map_err(|e| format!("failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| format!("failed to set optimization level: {}", e))?
            .with_intra_threads(config.intra_threads.max(1))
            .map_err(|e| format!("failed to set threads: {}", e))?
            .commit_from_file(&config.model_path)
            .map_err(|e| format!("failed to read model: {}", e))
    }
}

impl SegmentationModel for OnnxPartSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn segment_parts(&self, image: &RgbaImage) -> Result<SegmentationResult, SegmentationError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SegmentationError::Failed("image has no pixels".to_string()));
        }

        let letterbox = Letterbox::fit(width, height, self.input_size);
        let input = Tensor::from_array(preprocess(image, &letterbox))
            .map_err(|e| SegmentationError::Failed(format!("input tensor: {}", e)))?;

        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| SegmentationError::Failed(format!("inference: {}", e)))?;
        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| SegmentationError::Failed("model produced no output".to_string()))?;
        let logits = output
            .try_extract_array::<f32>()
            .map_err(|e| SegmentationError::Failed(format!("output tensor: {}", e)))?
            .into_dimensionality::<Ix4>()
            .map_err(|e| SegmentationError::Failed(format!("output tensor: {}", e)))?;

        labels_from_logits(logits, width, height, &letterbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{TorsoBoundingBox, TORSO_FRONT};
    use image::Rgba;

    #[test]
    fn test_letterbox_centres_wide_photo() {
        let lb = Letterbox::fit(200, 100, 64);
        assert_eq!((lb.scaled_width, lb.scaled_height), (64, 32));
        assert_eq!((lb.offset_x, lb.offset_y), (0, 16));
        assert!((lb.scale - 0.32).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_normalises_and_pads() {
        let img = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 255, 255]));
        let lb = Letterbox::fit(4, 2, 4);
        let tensor = preprocess(&img, &lb);
        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        // Padding rows stay zero, photo rows are scaled to -1..1
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 0, 3, 3]], 0.0);
        assert!((tensor[[0, 0, 1, 0]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 1, 2, 3]] + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_labels_follow_argmax_on_coarse_grid() {
        // 8x8 input, 4x4 output: each logit cell covers 2x2 input pixels
        let lb = Letterbox::fit(8, 8, 8);
        let mut logits = Array4::<f32>::zeros((1, OUTPUT_CHANNELS, 4, 4));
        logits.slice_mut(ndarray::s![0, 0, .., ..]).fill(1.0);
        // Torso-front (part 12, channel 13) in the middle cells
        for (my, mx) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
            logits[[0, TORSO_FRONT as usize + 1, my, mx]] = 5.0;
        }
        // Left hand (part 10) in one corner
        logits[[0, 11, 0, 3]] = 2.0;

        let seg = labels_from_logits(logits.view(), 8, 8, &lb).unwrap();
        assert_eq!(seg.part_at(0, 0), Some(BACKGROUND_PART));
        assert_eq!(seg.part_at(7, 0), Some(10));
        let bbox = TorsoBoundingBox::scan(&seg);
        assert!(bbox.found);
        assert_eq!((bbox.min_x, bbox.max_x, bbox.min_y, bbox.max_y), (2, 5, 2, 5));
    }

    #[test]
    fn test_unexpected_output_shape_fails() {
        let lb = Letterbox::fit(4, 4, 4);
        let logits = Array4::<f32>::zeros((1, 2, 4, 4));
        assert!(matches!(
            labels_from_logits(logits.view(), 4, 4, &lb),
            Err(SegmentationError::Failed(_))
        ));
    }

    #[test]
    fn test_missing_model_file_is_unavailable() {
        let config = OnnxConfig {
            model_path: std::env::temp_dir().join(format!("missing-{}.onnx", uuid::Uuid::new_v4())),
            input_size: 256,
            intra_threads: 1,
        };
        assert!(matches!(
            OnnxPartSegmenter::load(&config),
            Err(SegmentationError::Unavailable(_))
        ));
    }
}
