//! # Breadcast Common Library
//!
//! Shared code for the Breadcast frame server and its admin tooling:
//! - Recipe data model and the recipe-set file formats
//! - Error type
//! - Configuration loading
//! - Content identifier validation
//! - Object store capability (Pinata pinning + IPFS gateway, in-memory)
//! - Working-set audit of pinned content

pub mod cid;
pub mod config;
pub mod error;
pub mod model;
pub mod recipe_files;
pub mod store;
pub mod working_set;

pub use error::{Error, Result};
pub use model::{Equipment, Ingredient, RecipeDocument, RecipeSet, RecipeSetEntry, RenderedRecipe, RenderedRecipeSet};
pub use store::ObjectStore;
