//! REST API for the try-on server
//!
//! Catalog lookups, photo-based pose detection, image generation and
//! server-held placement sessions.

pub mod routes;
pub mod server;
pub mod state;
pub mod types;

pub use routes::create_router;
pub use server::{build_app, run_server, spawn_session_sweeper};
pub use state::{AppState, AppStateHandle};
pub use types::*;
