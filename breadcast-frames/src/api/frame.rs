//! Frame endpoint
//!
//! `GET /:recipe_id` and `POST /:recipe_id` answer identically. The POST body
//! (the client's signed frame action) is not read.

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{error, warn};

use crate::args::FrameQuery;
use crate::engine::RequestUrls;
use crate::{AppState, Error};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::RecipeNotFound(_) => (StatusCode::NOT_FOUND, "Recipe not found").into_response(),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Frame generation failed").into_response(),
        }
    }
}

/// GET/POST /:recipe_id
pub async fn serve_frame(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let origin = request_origin(state.public_url.as_deref(), &headers);
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let urls = RequestUrls {
        post_url: format!("{}{}", origin, path_and_query),
        origin,
    };

    let query = FrameQuery::from_pairs(pairs);
    match state.engine.frame(&recipe_id, query, &urls).await {
        Ok(html) => Html(html).into_response(),
        Err(e @ Error::RecipeNotFound(_)) => {
            warn!(recipe_id = %recipe_id, "Recipe not found");
            e.into_response()
        }
        Err(e) => {
            error!(recipe_id = %recipe_id, error = %e, "Frame generation failed");
            match state.engine.error_frame().await {
                Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
                Err(render_error) => {
                    error!(error = %render_error, "Error frame could not be rendered");
                    e.into_response()
                }
            }
        }
    }
}

/// Scheme and authority for button targets
///
/// A configured public URL wins. Otherwise the `Host` header is used with
/// `https`, unless a proxy names another scheme in `X-Forwarded-Proto`.
fn request_origin(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = public_url {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    format!("{}://{}", scheme, host)
}

/// Build frame routes
pub fn frame_routes() -> Router<AppState> {
    Router::new().route("/:recipe_id", get(serve_frame).post(serve_frame))
}
