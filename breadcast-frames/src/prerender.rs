//! Ahead-of-time rendering
//!
//! Renders and pins every frame a recipe can show, at every scale, so the
//! server can run in prerendered mode without a renderer on the request path.

use crate::args::{Screen, MAX_SCALE, MIN_SCALE};
use crate::asset_key::derive_key;
use crate::cache::{AssetCache, PinOnceCache};
use crate::pagination::calculate_pagination;
use crate::page::PageDescription;
use crate::render::Renderer;
use crate::{Error, Result};
use breadcast_common::{ObjectStore, RecipeDocument, RenderedRecipe};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// One frame image to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerenderTarget {
    pub screen: Screen,
    pub scale: u32,
    pub page: u32,
}

impl PrerenderTarget {
    pub fn key(&self, recipe_id: &str) -> String {
        derive_key(recipe_id, self.screen, self.scale, self.page)
    }
}

/// Every reachable frame: title, ingredient pages and steps at each scale,
/// then the completion frame once
pub fn prerender_targets(recipe: &RecipeDocument) -> Vec<PrerenderTarget> {
    let ingredient_pages = calculate_pagination(recipe.ingredients.len(), 1).total_pages.max(1);
    let steps = (recipe.steps.len() as u32).max(1);

    let mut targets = Vec::new();
    for scale in MIN_SCALE..=MAX_SCALE {
        targets.push(PrerenderTarget {
            screen: Screen::Title,
            scale,
            page: 1,
        });
        targets.extend((1..=ingredient_pages).map(|page| PrerenderTarget {
            screen: Screen::Ingredients,
            scale,
            page,
        }));
        targets.extend((1..=steps).map(|page| PrerenderTarget {
            screen: Screen::Steps,
            scale,
            page,
        }));
    }
    targets.push(PrerenderTarget {
        screen: Screen::Completed,
        scale: MIN_SCALE,
        page: 1,
    });
    targets
}

/// Render and pin all frames of `recipe`
///
/// Keys already present in `previous` are kept as they are; re-running after
/// an interrupted pass only renders what is missing.
pub async fn prerender_recipe(
    recipe_id: &str,
    recipe: &RecipeDocument,
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn ObjectStore>,
    previous: Option<&RenderedRecipe>,
) -> Result<RenderedRecipe> {
    let cache = PinOnceCache::new(store);
    if let Some(previous) = previous {
        for (key, cid) in &previous.asset_cids {
            cache.seed(key.clone(), cid.clone()).await;
        }
    }

    let targets = prerender_targets(recipe);
    info!(recipe_id = %recipe_id, frames = targets.len(), "Prerendering recipe");

    let mut asset_cids = BTreeMap::new();
    for target in targets {
        let key = target.key(recipe_id);
        let page = PageDescription::for_screen(recipe, target.screen, target.scale, target.page);
        let renderer = Arc::clone(&renderer);
        let job = async move { renderer.render(&page).await }.boxed();

        cache.resolve(&key, job).await?;
        let cid = cache
            .cid_for(&key)
            .await
            .ok_or_else(|| Error::generation(&key, "no content identifier recorded"))?;
        asset_cids.insert(key, cid);
    }

    Ok(RenderedRecipe {
        recipe_data: recipe.clone(),
        asset_cids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use breadcast_common::store::MemoryObjectStore;
    use breadcast_common::Ingredient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRenderer {
        renders: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for CountingRenderer {
        async fn render(&self, page: &PageDescription) -> Result<Vec<u8>> {
            let n = self.renders.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{:?}-{}-{}", page.kind, page.current_page, n).into_bytes())
        }
    }

    fn recipe() -> RecipeDocument {
        RecipeDocument {
            title: "Focaccia".to_string(),
            description: String::new(),
            total_time_minutes: 0,
            active_time_minutes: 0,
            yields: String::new(),
            ingredients: (0..7)
                .map(|i| Ingredient {
                    name: format!("ingredient {}", i),
                    quantity: 1.0,
                    unit: String::new(),
                })
                .collect(),
            steps: vec!["Mix".to_string(), "Dimple".to_string(), "Bake".to_string()],
            equipment: Vec::new(),
            image_cid: None,
        }
    }

    #[test]
    fn test_targets_cover_every_scale() {
        let targets = prerender_targets(&recipe());
        // (title + 2 ingredient pages + 3 steps) per scale, completion once
        assert_eq!(targets.len(), 6 * MAX_SCALE as usize + 1);

        let keys: Vec<String> = targets.iter().map(|t| t.key("QmR")).collect();
        assert!(keys.contains(&"QmR-title-8".to_string()));
        assert!(keys.contains(&"QmR-ingredients-3-2".to_string()));
        assert!(keys.contains(&"QmR-step-1-3".to_string()));
        assert_eq!(keys.iter().filter(|k| k.as_str() == "QmR-completed").count(), 1);
    }

    #[tokio::test]
    async fn test_prerender_pins_every_frame() {
        let store = Arc::new(MemoryObjectStore::default());
        let renderer = Arc::new(CountingRenderer::default());

        let rendered = prerender_recipe("QmR", &recipe(), renderer.clone(), store.clone(), None)
            .await
            .unwrap();

        assert_eq!(rendered.asset_cids.len(), 6 * MAX_SCALE as usize + 1);
        assert_eq!(renderer.renders.load(Ordering::SeqCst), rendered.asset_cids.len());
        assert_eq!(store.put_count(), rendered.asset_cids.len());
        assert_eq!(rendered.recipe_data.title, "Focaccia");
    }

    #[tokio::test]
    async fn test_previous_assets_are_kept() {
        let store = Arc::new(MemoryObjectStore::default());
        let renderer = Arc::new(CountingRenderer::default());

        let mut previous = RenderedRecipe {
            recipe_data: recipe(),
            asset_cids: BTreeMap::new(),
        };
        previous
            .asset_cids
            .insert("QmR-title-1".to_string(), "QmKeptTitle".to_string());

        let rendered = prerender_recipe("QmR", &recipe(), renderer.clone(), store.clone(), Some(&previous))
            .await
            .unwrap();

        assert_eq!(rendered.asset_cids["QmR-title-1"], "QmKeptTitle");
        assert_eq!(store.put_count(), rendered.asset_cids.len() - 1);
    }
}
