//! Pinned content audit
//!
//! The working set is every content identifier the recipe set files still
//! reference. Anything pinned outside it can be unpinned.

use crate::model::{RecipeSet, RenderedRecipeSet};
use std::collections::{BTreeMap, BTreeSet};

/// Free-tier pin allowance on the pinning service
pub const PINNED_FILES_LIMIT: usize = 500;

/// Union of identifiers referenced by both recipe set files, plus frame images
/// pinned at serve time for a recipe that is still referenced
pub fn active_content_ids(
    recipes: &RecipeSet,
    rendered: &RenderedRecipeSet,
    pinned_assets: &BTreeMap<String, String>,
) -> BTreeSet<String> {
    let mut active = BTreeSet::new();

    for entry in recipes.values() {
        active.insert(entry.json_cid.clone());
        active.insert(entry.image_cid.clone());
    }

    for (recipe_id, rendered_recipe) in rendered {
        active.insert(recipe_id.clone());
        if let Some(image_cid) = &rendered_recipe.recipe_data.image_cid {
            active.insert(image_cid.clone());
        }
        active.extend(rendered_recipe.asset_cids.values().cloned());
    }

    // Asset keys start with the recipe id, which never contains '-'
    let live_assets: Vec<String> = pinned_assets
        .iter()
        .filter(|(key, _)| key.split_once('-').is_some_and(|(recipe_id, _)| active.contains(recipe_id)))
        .map(|(_, cid)| cid.clone())
        .collect();
    active.extend(live_assets);

    active
}

/// Pinned vs referenced comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingSetReport {
    pub pinned_total: usize,
    pub limit: usize,
    /// Pinned and referenced
    pub pinned_active: BTreeSet<String>,
    /// Pinned but no longer referenced; safe to unpin
    pub pinned_inactive: BTreeSet<String>,
    /// Referenced but not pinned; will disappear from gateways eventually
    pub unpinned_active: BTreeSet<String>,
}

impl WorkingSetReport {
    pub fn over_limit(&self) -> usize {
        self.pinned_total.saturating_sub(self.limit)
    }

    /// Share of pinned files that are referenced, in percent
    pub fn active_percentage(&self) -> f64 {
        if self.pinned_total == 0 {
            return 0.0;
        }
        self.pinned_active.len() as f64 * 100.0 / self.pinned_total as f64
    }
}

pub fn compare(active: &BTreeSet<String>, pinned: &BTreeSet<String>, limit: usize) -> WorkingSetReport {
    WorkingSetReport {
        pinned_total: pinned.len(),
        limit,
        pinned_active: pinned.intersection(active).cloned().collect(),
        pinned_inactive: pinned.difference(active).cloned().collect(),
        unpinned_active: active.difference(pinned).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecipeDocument, RecipeSetEntry, RenderedRecipe};

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_active_content_ids_covers_both_files() {
        let mut recipes = RecipeSet::new();
        recipes.insert(
            "focaccia".to_string(),
            RecipeSetEntry {
                json_cid: "QmJson".to_string(),
                image_cid: "QmImage".to_string(),
            },
        );

        let mut rendered = RenderedRecipeSet::new();
        let mut recipe_data: RecipeDocument = serde_json::from_str(r#"{"title":"Focaccia"}"#).unwrap();
        recipe_data.image_cid = Some("QmBackground".to_string());
        let mut rendered_recipe = RenderedRecipe {
            recipe_data,
            asset_cids: Default::default(),
        };
        rendered_recipe
            .asset_cids
            .insert("QmJson-title-1".to_string(), "QmTitle".to_string());
        rendered.insert("QmJson".to_string(), rendered_recipe);

        assert_eq!(
            active_content_ids(&recipes, &rendered, &BTreeMap::new()),
            ids(&["QmBackground", "QmImage", "QmJson", "QmTitle"])
        );
    }

    #[test]
    fn test_serve_time_pins_follow_their_recipe() {
        let mut recipes = RecipeSet::new();
        recipes.insert(
            "focaccia".to_string(),
            RecipeSetEntry {
                json_cid: "QmJson".to_string(),
                image_cid: "QmImage".to_string(),
            },
        );

        let mut pinned_assets = BTreeMap::new();
        pinned_assets.insert("QmJson-step-2-1".to_string(), "QmStep".to_string());
        pinned_assets.insert("QmRemoved-title-1".to_string(), "QmStale".to_string());

        let active = active_content_ids(&recipes, &RenderedRecipeSet::new(), &pinned_assets);
        assert!(active.contains("QmStep"));
        assert!(!active.contains("QmStale"));
        assert!(!active.contains("QmRemoved"));
    }

    #[test]
    fn test_compare_partitions() {
        let active = ids(&["a", "b", "c"]);
        let pinned = ids(&["b", "c", "d", "e"]);

        let report = compare(&active, &pinned, 3);
        assert_eq!(report.pinned_total, 4);
        assert_eq!(report.over_limit(), 1);
        assert_eq!(report.pinned_active, ids(&["b", "c"]));
        assert_eq!(report.pinned_inactive, ids(&["d", "e"]));
        assert_eq!(report.unpinned_active, ids(&["a"]));
        assert!((report.active_percentage() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compare_empty() {
        let report = compare(&BTreeSet::new(), &BTreeSet::new(), PINNED_FILES_LIMIT);
        assert_eq!(report.over_limit(), 0);
        assert_eq!(report.active_percentage(), 0.0);
    }
}
