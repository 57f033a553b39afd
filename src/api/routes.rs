//! API route definitions

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use image::RgbaImage;
use uuid::Uuid;

use super::state::AppStateHandle;
use super::types::*;
use crate::catalog::Product;
use crate::generation::GenerationRequest;
use crate::imaging::{decode_image, encode_png_data_url, visualize_torso, DataUrl};
use crate::placement::{
    estimate_placement_calibrated, ContainerSize, EstimateError, InputOutcome, TorsoBoundingBox,
};
use crate::segmentation::SegmentationError;
use crate::session::TryOnSession;

/// Create the API router with all endpoints
pub fn create_router(state: AppStateHandle) -> Router {
    Router::new()
        // Status
        .route("/api/status", get(status_handler))
        // Catalog
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/sku/:sku", get(get_product_by_sku))
        .route("/api/products", get(list_products))
        .route("/api/products/:id", get(get_product))
        .route("/api/products/sku/:sku", get(get_product_by_sku))
        // Try-on
        .route("/api/vto/image-try-on", post(image_try_on))
        .route("/api/detect-pose", post(detect_pose))
        // Generative images
        .route("/api/generate-image", post(generate_image))
        // Placement sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(close_session))
        .route("/api/sessions/:id/move", post(move_session))
        .route("/api/sessions/:id/drag", post(drag_session))
        .route("/api/sessions/:id/scale", post(scale_session))
        .route("/api/sessions/:id/reset", post(reset_session))
        .route("/api/sessions/:id/view", put(set_session_view))
        .route("/api/sessions/:id/fullscreen", put(set_session_fullscreen))
        .route("/api/sessions/:id/input", post(session_input))
        .route("/api/sessions/:id/auto-place", post(auto_place))
        .with_state(state)
}

// ============================================================================
// Status Handlers
// ============================================================================

async fn status_handler(State(state): State<AppStateHandle>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        segmentation_loaded: state.segmenter.is_loaded(),
        generation_configured: state.generator.is_some(),
        product_count: state.store.list().len(),
        session_count: state.sessions.len(),
    })
}

// ============================================================================
// Catalog Handlers
// ============================================================================

async fn list_products(State(state): State<AppStateHandle>) -> Json<Vec<Product>> {
    Json(state.store.list())
}

async fn get_product(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiFailure> {
    id.parse::<i32>()
        .ok()
        .and_then(|id| state.store.get(id))
        .map(Json)
        .ok_or_else(product_not_found)
}

async fn get_product_by_sku(
    State(state): State<AppStateHandle>,
    Path(sku): Path<String>,
) -> Result<Json<Product>, ApiFailure> {
    state
        .store
        .get_by_sku(&sku)
        .map(Json)
        .ok_or_else(product_not_found)
}

// ============================================================================
// Try-On Handlers
// ============================================================================

async fn image_try_on(
    body: Result<Json<ImageTryOnRequest>, JsonRejection>,
) -> Result<Json<ImageTryOnResponse>, ApiFailure> {
    let req = parse_body(body)?;
    let (Some(person_image), Some(clothing_image)) = (
        non_empty(req.person_image),
        non_empty(req.clothing_image),
    ) else {
        return Err(ApiError::bad_request("Missing images").into_failure());
    };

    tracing::info!("Processing client-side composite try-on");
    Ok(Json(ImageTryOnResponse {
        person_image,
        clothing_image,
        status: "success".to_string(),
        mode: "composite".to_string(),
    }))
}

async fn detect_pose(
    State(state): State<AppStateHandle>,
    body: Result<Json<DetectPoseRequest>, JsonRejection>,
) -> Result<Json<DetectPoseResponse>, ApiFailure> {
    let req = parse_body(body)?;
    let person_image = non_empty(req.person_image)
        .ok_or_else(|| ApiError::bad_request("Missing personImage").into_failure())?;
    let image = decode_photo(&person_image)?;

    let segmentation = state
        .segmenter
        .segment(image.clone())
        .await
        .map_err(segmentation_failure)?;

    let bbox = TorsoBoundingBox::scan(&segmentation);
    if !bbox.found {
        return Err(ApiError::unprocessable("No torso detected").into_failure());
    }

    let visualized_image =
        tokio::task::spawn_blocking(move || encode_png_data_url(&visualize_torso(&image, &bbox)))
            .await
            .map_err(|e| {
                tracing::error!("Pose visualization task failed: {}", e);
                ApiError::internal("Pose detection failed").into_failure()
            })?
            .map_err(|e| {
                tracing::error!("Failed to encode pose visualization: {}", e);
                ApiError::internal("Pose detection failed").into_failure()
            })?;

    let (x, y) = bbox.center();
    Ok(Json(DetectPoseResponse {
        visualized_image,
        center: Point { x, y },
        torso_width: bbox.width(),
        dimensions: Dimensions {
            width: segmentation.width,
            height: segmentation.height,
        },
    }))
}

// ============================================================================
// Generation Handlers
// ============================================================================

async fn generate_image(
    State(state): State<AppStateHandle>,
    body: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>, ApiFailure> {
    let req = parse_body(body)?;
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required").into_failure());
    }
    let Some(generator) = state.generator.as_ref() else {
        return Err(ApiError::unavailable("Image generation is not configured").into_failure());
    };

    let request = GenerationRequest {
        prompt: req.prompt,
        images: req.images,
    };
    match generator.generate(request).await {
        Ok(image) => Ok(Json(GenerateImageResponse { image })),
        Err(e) => {
            tracing::error!("Image generation failed: {}", e);
            Err(ApiError::internal("Failed to generate image").into_failure())
        }
    }
}

// ============================================================================
// Session Handlers
// ============================================================================

async fn create_session(
    State(state): State<AppStateHandle>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiFailure> {
    let req = parse_body(body)?;

    let images = match (req.product_id, req.images) {
        (Some(product_id), _) => Some(
            state
                .store
                .get(product_id)
                .ok_or_else(product_not_found)?
                .images,
        ),
        (None, Some(images)) => {
            images
                .validate()
                .map_err(|e| ApiError::bad_request(e).into_failure())?;
            Some(images)
        }
        (None, None) => None,
    };

    let session = state.sessions.open(state.placement, images);
    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))))
}

async fn get_session(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let id = parse_session_id(&id)?;
    state
        .sessions
        .get(id)
        .map(|s| Json(SessionResponse::from(&s)))
        .ok_or_else(session_not_found)
}

async fn close_session(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let id = parse_session_id(&id)?;
    if state.sessions.close(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found())
    }
}

async fn move_session(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let req = parse_body(body)?;
    update_session(&state, &id, |s| s.move_by(req.dx, req.dy))
}

async fn drag_session(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<DragRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let req = parse_body(body)?;
    update_session(&state, &id, |s| s.drag_to(req.delta_x, req.delta_y))
}

async fn scale_session(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let req = parse_body(body)?;
    update_session(&state, &id, |s| s.scale_by(req.delta))
}

async fn reset_session(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    update_session(&state, &id, TryOnSession::reset)
}

async fn set_session_view(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<ViewRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let req = parse_body(body)?;
    update_session(&state, &id, |s| s.select_view(req.view))
}

async fn set_session_fullscreen(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<FullscreenRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let req = parse_body(body)?;
    update_session(&state, &id, |s| s.set_fullscreen(req.fullscreen))
}

async fn session_input(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<InputRequest>, JsonRejection>,
) -> Result<Json<InputResponse>, ApiFailure> {
    let req = parse_body(body)?;
    let id = parse_session_id(&id)?;
    let steps = state.steps;

    let (outcome, session) = state
        .sessions
        .with_session(id, |s| {
            let outcome = s.apply_input(&req.event, &steps);
            (outcome, SessionResponse::from(&*s))
        })
        .ok_or_else(session_not_found)?;

    if outcome == InputOutcome::Close {
        state.sessions.prune_closed();
    }
    Ok(Json(InputResponse { outcome, session }))
}

async fn auto_place(
    State(state): State<AppStateHandle>,
    Path(id): Path<String>,
    body: Result<Json<AutoPlaceRequest>, JsonRejection>,
) -> Result<Json<AutoPlaceResponse>, ApiFailure> {
    let req = parse_body(body)?;
    let id = parse_session_id(&id)?;
    let ticket = state
        .sessions
        .with_session(id, |s| s.begin_estimation())
        .ok_or_else(session_not_found)?;

    let person_image = non_empty(req.person_image)
        .ok_or_else(|| ApiError::bad_request("Missing personImage").into_failure())?;
    let image = decode_photo(&person_image)?;
    let container = req.container.unwrap_or(ContainerSize::new(0.0, 0.0));

    // The session lock is not held while the model runs
    let segmentation = state
        .segmenter
        .segment(image)
        .await
        .map_err(segmentation_failure)?;

    let estimate = estimate_placement_calibrated(&segmentation, container, &state.calibration)
        .map_err(|e| match e {
            EstimateError::NotFound => ApiError::unprocessable(
                "Could not detect body position. Please try a clearer photo.",
            )
            .into_failure(),
            other => {
                tracing::error!("Placement estimation failed: {}", other);
                ApiError::internal("Placement estimation failed").into_failure()
            }
        })?;

    let (applied, session) = state
        .sessions
        .with_session(id, |s| {
            let applied = s.apply_estimate(ticket, estimate);
            (applied, SessionResponse::from(&*s))
        })
        .ok_or_else(session_not_found)?;

    Ok(Json(AutoPlaceResponse {
        applied,
        estimate,
        session,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiFailure> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()).into_failure())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn decode_photo(data_url: &str) -> Result<RgbaImage, ApiFailure> {
    DataUrl::parse(data_url)
        .and_then(|url| decode_image(&url))
        .map_err(|e| ApiError::bad_request(format!("Invalid image: {}", e)).into_failure())
}

fn segmentation_failure(error: SegmentationError) -> ApiFailure {
    match error {
        SegmentationError::Unavailable(reason) => {
            tracing::warn!("Segmentation unavailable: {}", reason);
            ApiError::unavailable("Body detection is unavailable; place the garment manually")
                .into_failure()
        }
        SegmentationError::Failed(reason) => {
            tracing::error!("Segmentation failed: {}", reason);
            ApiError::internal("Pose detection failed").into_failure()
        }
    }
}

fn update_session(
    state: &AppStateHandle,
    id: &str,
    f: impl FnOnce(&mut TryOnSession),
) -> Result<Json<SessionResponse>, ApiFailure> {
    let id = parse_session_id(id)?;
    state
        .sessions
        .with_session(id, |s| {
            f(s);
            SessionResponse::from(&*s)
        })
        .map(Json)
        .ok_or_else(session_not_found)
}

fn parse_session_id(id: &str) -> Result<Uuid, ApiFailure> {
    Uuid::parse_str(id).map_err(|_| session_not_found())
}

fn product_not_found() -> ApiFailure {
    ApiError::not_found("Product not found").into_failure()
}

fn session_not_found() -> ApiFailure {
    ApiError::not_found("Session not found").into_failure()
}
