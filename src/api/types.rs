//! API request/response types
//!
//! These types are used for JSON serialization in API endpoints.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::garment::{GarmentImages, GarmentView};
use crate::generation::InlineImage;
use crate::placement::{ContainerSize, InputEvent, InputOutcome, PlacementState};
use crate::session::TryOnSession;

// ============================================================================
// Status Types
// ============================================================================

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub segmentation_loaded: bool,
    pub generation_configured: bool,
    pub product_count: usize,
    pub session_count: usize,
}

// ============================================================================
// Try-On Types
// ============================================================================

/// Composite try-on request; both images are data URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTryOnRequest {
    #[serde(default)]
    pub person_image: Option<String>,
    #[serde(default)]
    pub clothing_image: Option<String>,
}

/// Composite try-on response; compositing happens on the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTryOnResponse {
    pub person_image: String,
    pub clothing_image: String,
    pub status: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectPoseRequest {
    #[serde(default)]
    pub person_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectPoseResponse {
    /// Photo with the torso box drawn on it
    pub visualized_image: String,
    pub center: Point,
    pub torso_width: f32,
    pub dimensions: Dimensions,
}

// ============================================================================
// Generation Types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub images: Vec<InlineImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    /// Data URL of the generated image
    pub image: String,
}

// ============================================================================
// Session Types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Take garment images from this product
    #[serde(default)]
    pub product_id: Option<i32>,
    /// Or supply them directly
    #[serde(default)]
    pub images: Option<GarmentImages>,
}

/// Session state as seen by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub placement: PlacementState,
    /// CSS transform for the garment layer
    pub transform: String,
    pub view: GarmentView,
    pub view_image: Option<String>,
    pub open: bool,
    pub fullscreen: bool,
    pub generation: u64,
}

impl From<&TryOnSession> for SessionResponse {
    fn from(session: &TryOnSession) -> Self {
        let placement = session.placement();
        Self {
            id: session.id(),
            placement,
            transform: placement.transform(),
            view: session.view(),
            view_image: session.view_image().map(str::to_string),
            open: session.is_open(),
            fullscreen: session.is_fullscreen(),
            generation: session.generation(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveRequest {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragRequest {
    pub delta_x: f32,
    pub delta_y: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub delta: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewRequest {
    pub view: GarmentView,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FullscreenRequest {
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRequest {
    pub event: InputEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputResponse {
    pub outcome: InputOutcome,
    pub session: SessionResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPlaceRequest {
    #[serde(default)]
    pub person_image: Option<String>,
    /// Size of the rendering container; the photo size is used when absent
    #[serde(default)]
    pub container: Option<ContainerSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPlaceResponse {
    /// False when a newer manual edit made the estimate stale
    pub applied: bool,
    pub estimate: PlacementState,
    pub session: SessionResponse,
}

// ============================================================================
// Error Types
// ============================================================================

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub code: u16,
}

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<ApiError>);

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
            code: status.as_u16(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Pair with its status code for returning from a handler
    pub fn into_failure(self) -> ApiFailure {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self))
    }
}

impl From<ApiError> for ApiFailure {
    fn from(error: ApiError) -> Self {
        error.into_failure()
    }
}
