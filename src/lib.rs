//! VTO Server Library
//!
//! Storefront backend for a clothing brand: a product catalog, virtual
//! try-on garment placement, photo-based torso detection and generated
//! product imagery, served over a REST API.

pub mod api;
pub mod catalog;
pub mod garment;
pub mod generation;
pub mod imaging;
pub mod placement;
pub mod segmentation;
pub mod session;
pub mod settings;
pub mod telemetry;

pub use catalog::{MemoryStore, NewProduct, Product, ProductStore};
pub use garment::{GarmentCalibration, GarmentImages, GarmentView};
pub use placement::{
    estimate_placement, estimate_placement_calibrated, InputEvent, InputOutcome,
    PlacementConfig, PlacementController, PlacementState, SegmentationResult, TorsoBoundingBox,
};
pub use segmentation::{
    configured_handle, ModelHandle, OnnxPartSegmenter, SegmentationModel, SilhouetteSegmenter,
};
pub use session::{SessionRegistry, TryOnSession};
pub use settings::ServerSettings;
