//! Body-part segmentation models
//!
//! The server keeps one model instance for the whole process. It is loaded
//! lazily on first use behind a once-initialised cell; requests arriving
//! during loading wait for the same initialisation.
//!
//! The production model is an ONNX part segmenter ([`onnx`]). The silhouette
//! heuristic is a fallback that has to be switched on explicitly.

pub mod onnx;
pub mod silhouette;

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::placement::SegmentationResult;
use crate::settings::SegmentationSettings;

pub use onnx::{OnnxConfig, OnnxPartSegmenter};
pub use silhouette::SilhouetteSegmenter;

#[derive(Debug, Error, Clone)]
pub enum SegmentationError {
    #[error("segmentation model unavailable: {0}")]
    Unavailable(String),
    #[error("segmentation failed: {0}")]
    Failed(String),
}

/// Produces a per-pixel part mask for a photo
pub trait SegmentationModel: Send + Sync {
    fn name(&self) -> &str;

    fn segment_parts(&self, image: &RgbaImage) -> Result<SegmentationResult, SegmentationError>;
}

type Loader = dyn Fn() -> Result<Arc<dyn SegmentationModel>, SegmentationError> + Send + Sync;

/// Lazily loaded, process-wide segmentation model
pub struct ModelHandle {
    cell: OnceCell<Arc<dyn SegmentationModel>>,
    loader: Box<Loader>,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl ModelHandle {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SegmentationModel>, SegmentationError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// Handle around an already constructed model
    pub fn preloaded(model: Arc<dyn SegmentationModel>) -> Self {
        let handle = Self::new(|| Err(SegmentationError::Unavailable("no loader".to_string())));
        // A fresh cell cannot already be set
        let _ = handle.cell.set(model);
        handle
    }

    /// Handle whose model never loads
    pub fn disabled() -> Self {
        Self::new(|| {
            Err(SegmentationError::Unavailable(
                "segmentation is disabled".to_string(),
            ))
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Get the model, loading it on first use.
    ///
    /// A failed load is not cached; the next call tries again.
    pub async fn get(&self) -> Result<Arc<dyn SegmentationModel>, SegmentationError> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                let loader = &self.loader;
                let model = loader()?;
                tracing::info!(model = model.name(), "Segmentation model loaded");
                Ok::<_, SegmentationError>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Segment a photo on the blocking pool
    pub async fn segment(&self, image: RgbaImage) -> Result<SegmentationResult, SegmentationError> {
        let model = self.get().await?;
        tokio::task::spawn_blocking(move || model.segment_parts(&image))
            .await
            .map_err(|e| SegmentationError::Failed(format!("segmentation task panicked: {}", e)))?
    }
}

/// Load the model described by the settings.
///
/// The ONNX model is tried first. The silhouette heuristic stands in only when
/// `silhouette_fallback` is set.
pub fn load_configured(
    settings: &SegmentationSettings,
) -> Result<Arc<dyn SegmentationModel>, SegmentationError> {
    let onnx = match settings.model_path() {
        Some(model_path) => OnnxPartSegmenter::load(&OnnxConfig {
            model_path,
            input_size: settings.input_size,
            intra_threads: settings.intra_threads,
        })
        .map(|model| Arc::new(model) as Arc<dyn SegmentationModel>),
        None => Err(SegmentationError::Unavailable(
            "no segmentation model path configured".to_string(),
        )),
    };

    match onnx {
        Ok(model) => Ok(model),
        Err(e) if settings.silhouette_fallback => {
            tracing::warn!("{}; using the silhouette fallback", e);
            Ok(Arc::new(SilhouetteSegmenter::new(settings.silhouette_threshold)))
        }
        Err(e) => Err(e),
    }
}

/// Model handle that loads from the settings on first use
pub fn configured_handle(settings: &SegmentationSettings) -> ModelHandle {
    if !settings.enabled {
        return ModelHandle::disabled();
    }
    let settings = settings.clone();
    ModelHandle::new(move || load_configured(&settings))
}
