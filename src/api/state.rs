//! State shared by all API handlers

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{MemoryStore, ProductStore};
use crate::garment::GarmentCalibration;
use crate::generation::ImageGenerator;
use crate::placement::{PlacementConfig, StepConfig};
use crate::segmentation::ModelHandle;
use crate::session::SessionRegistry;

pub type AppStateHandle = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn ProductStore>,
    pub sessions: SessionRegistry,
    /// Loaded on first pose request
    pub segmenter: ModelHandle,
    /// `None` when no API key is configured
    pub generator: Option<Arc<dyn ImageGenerator>>,
    pub placement: PlacementConfig,
    pub steps: StepConfig,
    pub calibration: GarmentCalibration,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn ProductStore>, segmenter: ModelHandle) -> Self {
        Self {
            store,
            sessions: SessionRegistry::new(),
            segmenter,
            generator: None,
            placement: PlacementConfig::default(),
            steps: StepConfig::default(),
            calibration: GarmentCalibration::default(),
            started_at: Instant::now(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_placement(mut self, placement: PlacementConfig, steps: StepConfig) -> Self {
        self.placement = placement;
        self.steps = steps;
        self
    }

    pub fn with_calibration(mut self, calibration: GarmentCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn into_handle(self) -> AppStateHandle {
        Arc::new(self)
    }
}

impl Default for AppState {
    /// Empty catalog, segmentation disabled, no generator
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()), ModelHandle::disabled())
    }
}
