//! Component wiring from resolved settings

use std::sync::Arc;

use breadcast_common::config::{CachePolicyKind, ServeMode, Settings};
use breadcast_common::recipe_files::ReloadingFile;
use breadcast_common::store::{GatewayObjectStore, PinataObjectStore};
use breadcast_common::{ObjectStore, RecipeSet, RenderedRecipeSet};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{AssetCache, PinOnceCache, TtlCache};
use crate::render::{Renderer, SvgRenderer};
use crate::source::{LiveSource, PrerenderedSource, RecipeSource};
use crate::{FrameEngine, Result};

/// Pinata when a JWT is configured, otherwise the read-only IPFS gateway
pub fn open_store(settings: &Settings) -> Result<Arc<dyn ObjectStore>> {
    match settings.pinata_jwt.as_deref() {
        Some(jwt) => {
            let store = PinataObjectStore::new(&settings.pinata_api_url, &settings.ipfs_gateway, jwt)?;
            info!("Object store: Pinata via {}", settings.pinata_api_url);
            Ok(Arc::new(store))
        }
        None => {
            warn!("No Pinata JWT configured; reading from {} only", settings.ipfs_gateway);
            Ok(Arc::new(GatewayObjectStore::new(&settings.ipfs_gateway)?))
        }
    }
}

/// Store for commands that upload or unpin; fails without a Pinata JWT
pub fn open_pinning_store(settings: &Settings) -> Result<Arc<dyn ObjectStore>> {
    if settings.pinata_jwt.is_none() {
        return Err(breadcast_common::Error::Config("PINATA_JWT is required for this command".to_string()).into());
    }
    open_store(settings)
}

/// Configured cache policy, downgraded to `ttl` when nothing can be pinned
pub fn effective_cache_policy(settings: &Settings) -> CachePolicyKind {
    match settings.cache {
        CachePolicyKind::PinOnce if settings.pinata_jwt.is_none() => {
            warn!("pin_once cache needs a Pinata JWT; using ttl instead");
            CachePolicyKind::Ttl
        }
        policy => policy,
    }
}

/// Frame engine plus the background tasks that keep its file snapshots fresh
pub struct Components {
    pub engine: FrameEngine,
    pub reloaders: Vec<JoinHandle<()>>,
}

pub async fn build_components(settings: &Settings, store: Arc<dyn ObjectStore>) -> Result<Components> {
    let mut reloaders = Vec::new();

    let source: Arc<dyn RecipeSource> = match settings.mode {
        ServeMode::Prerendered => {
            let rendered = ReloadingFile::<RenderedRecipeSet>::open(settings.rendered_recipes_path()).await?;
            info!(recipes = rendered.snapshot().await.len(), "Serving prerendered recipes");
            reloaders.push(rendered.spawn_reloader(settings.reload_interval));
            Arc::new(PrerenderedSource::new(rendered))
        }
        ServeMode::Live => {
            let recipe_set = ReloadingFile::<RecipeSet>::open(settings.recipe_set_path()).await?;
            info!(recipes = recipe_set.snapshot().await.len(), "Serving live recipes");
            reloaders.push(recipe_set.spawn_reloader(settings.reload_interval));
            Arc::new(LiveSource::new(recipe_set, Arc::clone(&store)))
        }
    };

    let cache: Arc<dyn AssetCache> = match effective_cache_policy(settings) {
        CachePolicyKind::PinOnce => Arc::new(
            PinOnceCache::with_ledger(Arc::clone(&store), settings.pinned_assets_path()).await?,
        ),
        CachePolicyKind::Ttl => {
            info!(ttl_secs = settings.ttl.as_secs(), "Frame images cached in memory");
            Arc::new(TtlCache::new(settings.ttl))
        }
    };

    let renderer: Arc<dyn Renderer> = Arc::new(SvgRenderer::new(Arc::clone(&store), settings.fonts_dir.as_deref()));

    Ok(Components {
        engine: FrameEngine::new(source, cache, renderer, store),
        reloaders,
    })
}
