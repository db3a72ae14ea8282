//! Recipe lookup
//!
//! Prerendered serving reads everything from `rendered-recipes.json`. Live
//! serving checks `recipes.json` for the identifier and fetches the document
//! from the object store.

use crate::cache::SingleFlight;
use crate::Result;
use async_trait::async_trait;
use breadcast_common::recipe_files::ReloadingFile;
use breadcast_common::{ObjectStore, RecipeDocument, RecipeSet, RenderedRecipeSet};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Recipe for a content identifier, `None` if it is not served
    async fn recipe(&self, recipe_id: &str) -> Result<Option<Arc<RecipeDocument>>>;

    /// Content identifier of an image rendered ahead of time
    async fn prerendered_asset(&self, recipe_id: &str, asset_key: &str) -> Option<String>;
}

/// Recipes and their frame images from the rendered recipe set
pub struct PrerenderedSource {
    rendered: Arc<ReloadingFile<RenderedRecipeSet>>,
}

impl PrerenderedSource {
    pub fn new(rendered: Arc<ReloadingFile<RenderedRecipeSet>>) -> Self {
        Self { rendered }
    }
}

#[async_trait]
impl RecipeSource for PrerenderedSource {
    async fn recipe(&self, recipe_id: &str) -> Result<Option<Arc<RecipeDocument>>> {
        let snapshot = self.rendered.snapshot().await;
        Ok(snapshot
            .get(recipe_id)
            .map(|rendered| Arc::new(rendered.recipe_data.clone())))
    }

    async fn prerendered_asset(&self, recipe_id: &str, asset_key: &str) -> Option<String> {
        let snapshot = self.rendered.snapshot().await;
        snapshot
            .get(recipe_id)
            .and_then(|rendered| rendered.asset_cids.get(asset_key))
            .cloned()
    }
}

/// Recipes listed in the recipe set, fetched from the object store on demand
///
/// Documents are content-addressed and never change, so each one is fetched
/// at most once.
pub struct LiveSource {
    recipe_set: Arc<ReloadingFile<RecipeSet>>,
    store: Arc<dyn ObjectStore>,
    documents: Arc<RwLock<HashMap<String, Arc<RecipeDocument>>>>,
    fetches: SingleFlight<Arc<RecipeDocument>>,
}

impl LiveSource {
    pub fn new(recipe_set: Arc<ReloadingFile<RecipeSet>>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            recipe_set,
            store,
            documents: Arc::new(RwLock::new(HashMap::new())),
            fetches: SingleFlight::new(),
        }
    }
}

async fn fetch_document(
    store: Arc<dyn ObjectStore>,
    documents: Arc<RwLock<HashMap<String, Arc<RecipeDocument>>>>,
    recipe_id: String,
    image_cid: String,
) -> Result<Arc<RecipeDocument>> {
    if let Some(document) = documents.read().await.get(&recipe_id) {
        return Ok(Arc::clone(document));
    }

    let bytes = store.get(&recipe_id).await?;
    let mut document: RecipeDocument =
        serde_json::from_slice(&bytes).map_err(breadcast_common::Error::from)?;
    // The recipe set entry names the background; the document may predate it
    document.image_cid.get_or_insert(image_cid);

    info!(recipe_id = %recipe_id, title = %document.title, "Fetched recipe document");
    let document = Arc::new(document);
    documents.write().await.insert(recipe_id, Arc::clone(&document));
    Ok(document)
}

#[async_trait]
impl RecipeSource for LiveSource {
    async fn recipe(&self, recipe_id: &str) -> Result<Option<Arc<RecipeDocument>>> {
        let recipe_set = self.recipe_set.snapshot().await;
        let Some(entry) = recipe_set.values().find(|entry| entry.json_cid == recipe_id) else {
            debug!(recipe_id = %recipe_id, "Not in the recipe set");
            return Ok(None);
        };

        if let Some(document) = self.documents.read().await.get(recipe_id) {
            return Ok(Some(Arc::clone(document)));
        }

        let fetch = fetch_document(
            Arc::clone(&self.store),
            Arc::clone(&self.documents),
            recipe_id.to_string(),
            entry.image_cid.clone(),
        );
        let document = self.fetches.run(recipe_id, fetch).await?;
        Ok(Some(document))
    }

    async fn prerendered_asset(&self, _recipe_id: &str, _asset_key: &str) -> Option<String> {
        None
    }
}
