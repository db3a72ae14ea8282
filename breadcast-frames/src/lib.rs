//! breadcast-frames library - recipe frame service
//!
//! Serves a recipe as a sequence of Farcaster frames: a title card, paged
//! ingredient lists, one frame per step and a completion card, each at a
//! chosen batch scale.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod args;
pub mod asset_key;
pub mod cache;
pub mod engine;
pub mod error;
pub mod navigation;
pub mod page;
pub mod pagination;
pub mod prerender;
pub mod render;
pub mod response;
pub mod source;
pub mod startup;

pub use engine::{FrameEngine, RequestUrls};
pub use error::{Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FrameEngine>,
    /// Origin for button targets; taken from the request when unset
    pub public_url: Option<String>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<FrameEngine>, public_url: Option<String>) -> Self {
        Self {
            engine,
            public_url,
            started_at: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .route("/buildinfo", get(api::get_build_info))
        .merge(api::frame_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
