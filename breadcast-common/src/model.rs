//! Recipe data model
//!
//! JSON shapes match the documents pinned by the ingestion pipeline, so field
//! names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single recipe, addressed by the content identifier of its JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDocument {
    pub title: String,

    /// Free text; may embed `@X<N>` scale placeholders
    #[serde(default)]
    pub description: String,

    #[serde(default, alias = "totalTime")]
    pub total_time_minutes: u32,

    #[serde(default, alias = "activeTime")]
    pub active_time_minutes: u32,

    /// Free text; may embed `@X<N>` scale placeholders
    #[serde(default)]
    pub yields: String,

    #[serde(default)]
    pub ingredients: Vec<Ingredient>,

    /// Step text, 1-indexed externally; may reference ingredients with `@N`
    #[serde(default)]
    pub steps: Vec<String>,

    #[serde(default)]
    pub equipment: Vec<Equipment>,

    /// Content identifier of the background image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cid: Option<String>,
}

/// Ingredient at base (scale 1) quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

/// Tool or vessel a recipe calls for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub name: String,
    #[serde(default = "one")]
    pub count: u32,
    /// Whether more are needed as the recipe is scaled up
    #[serde(default)]
    pub scales_with_recipe: bool,
}

fn one() -> u32 {
    1
}

/// Entry of the named recipe set (`recipes.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSetEntry {
    /// Content identifier of the recipe JSON document
    pub json_cid: String,
    /// Content identifier of the background image
    pub image_cid: String,
}

/// Human-chosen name → recipe content identifiers
pub type RecipeSet = BTreeMap<String, RecipeSetEntry>;

/// Recipe snapshot plus the content identifiers of every pre-rendered frame image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRecipe {
    pub recipe_data: RecipeDocument,
    /// Asset key → content identifier
    #[serde(default)]
    pub asset_cids: BTreeMap<String, String>,
}

/// Recipe content identifier → rendered recipe (`rendered-recipes.json`)
pub type RenderedRecipeSet = BTreeMap<String, RenderedRecipe>;
