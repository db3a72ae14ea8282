//! Frame engine
//!
//! One frame request end to end: recipe lookup, argument clamping, asset
//! resolution, navigation and the HTML document.

use crate::args::FrameQuery;
use crate::cache::{AssetCache, RenderJob};
use crate::navigation::FrameState;
use crate::page::PageDescription;
use crate::render::{png_data_uri, Renderer};
use crate::response::{error_document, frame_document, FrameButton};
use crate::source::RecipeSource;
use crate::{Error, Result};
use breadcast_common::cid::is_valid_cid;
use breadcast_common::ObjectStore;
use futures::FutureExt;
use std::sync::Arc;
use tracing::debug;

/// Where the response is served from
#[derive(Debug, Clone)]
pub struct RequestUrls {
    /// Scheme and authority used for button targets, no trailing slash
    pub origin: String,
    /// URL the client posted to, echoed as `fc:frame:post_url`
    pub post_url: String,
}

pub struct FrameEngine {
    source: Arc<dyn RecipeSource>,
    cache: Arc<dyn AssetCache>,
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn ObjectStore>,
}

impl FrameEngine {
    pub fn new(
        source: Arc<dyn RecipeSource>,
        cache: Arc<dyn AssetCache>,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            source,
            cache,
            renderer,
            store,
        }
    }

    /// Frame document for `recipe_id` in the state described by `query`.
    ///
    /// Unknown or malformed identifiers fail with [`Error::RecipeNotFound`]
    /// before anything is rendered.
    pub async fn frame(&self, recipe_id: &str, query: FrameQuery, urls: &RequestUrls) -> Result<String> {
        if !is_valid_cid(recipe_id) {
            return Err(Error::RecipeNotFound(recipe_id.to_string()));
        }
        let recipe = self
            .source
            .recipe(recipe_id)
            .await?
            .ok_or_else(|| Error::RecipeNotFound(recipe_id.to_string()))?;

        let args = query.into_arguments(recipe_id);
        let state = FrameState::resolve(&recipe, &args);
        let key = state.asset_key();

        let image_url = match self.source.prerendered_asset(recipe_id, &key).await {
            Some(cid) => {
                debug!(key = %key, cid = %cid, "Serving prerendered frame image");
                self.store.url_for(&cid)
            }
            None => {
                let page = PageDescription::for_screen(&recipe, state.screen, state.scale, state.page);
                self.cache.resolve(&key, self.render_job(page)).await?
            }
        };

        let buttons: Vec<FrameButton> = state
            .transitions()
            .into_iter()
            .map(|transition| FrameButton {
                label: transition.label.to_string(),
                target: Some(transition.target.url(&urls.origin, recipe_id)),
            })
            .collect();

        Ok(frame_document(&image_url, &urls.post_url, &buttons))
    }

    /// Minimal frame carrying the rendered error page as a data URI
    pub async fn error_frame(&self) -> Result<String> {
        let png = self.renderer.render(&PageDescription::error()).await?;
        Ok(error_document(&png_data_uri(&png)))
    }

    fn render_job(&self, page: PageDescription) -> RenderJob {
        let renderer = Arc::clone(&self.renderer);
        async move { renderer.render(&page).await }.boxed()
    }
}
