//! Frame navigation
//!
//! A frame state is a screen, a scale and a page. Each state offers buttons
//! that post back to the server with the arguments of the next state.

use crate::args::{FrameArguments, Screen, MAX_SCALE, MIN_SCALE};
use crate::asset_key::derive_key;
use crate::pagination::calculate_pagination;
use breadcast_common::RecipeDocument;

/// Where a button leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTarget {
    pub screen: Screen,
    pub scale: u32,
    pub page: u32,
}

impl FrameTarget {
    /// `{origin}/{recipe_id}?scale={s}&screen={screen}[&page={p}]`
    pub fn url(&self, origin: &str, recipe_id: &str) -> String {
        let mut url = format!(
            "{}/{}?scale={}&screen={}",
            origin.trim_end_matches('/'),
            recipe_id,
            self.scale,
            self.screen.as_str()
        );
        if self.screen.has_pages() {
            url.push_str(&format!("&page={}", self.page));
        }
        url
    }
}

/// Labelled transition offered by a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub label: &'static str,
    pub target: FrameTarget,
}

/// Navigation state with the page clamped to the recipe's real bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub recipe_id: String,
    pub screen: Screen,
    pub scale: u32,
    /// Always within `1..=last_page`
    pub page: u32,
    /// At least 1, even for recipes without ingredients or steps
    pub last_page: u32,
}

impl FrameState {
    pub fn resolve(recipe: &RecipeDocument, args: &FrameArguments) -> Self {
        let last_page = match args.screen {
            Screen::Ingredients => calculate_pagination(recipe.ingredients.len(), 1).total_pages,
            Screen::Steps => recipe.steps.len() as u32,
            Screen::Title | Screen::Completed => 1,
        }
        .max(1);

        Self {
            recipe_id: args.recipe_id.clone(),
            screen: args.screen,
            scale: args.scale.clamp(MIN_SCALE, MAX_SCALE),
            page: args.page.clamp(1, last_page),
            last_page,
        }
    }

    pub fn asset_key(&self) -> String {
        derive_key(&self.recipe_id, self.screen, self.scale, self.page)
    }

    /// Buttons for this state: primary navigation first, then scale controls
    pub fn transitions(&self) -> Vec<Transition> {
        let mut transitions = Vec::with_capacity(4);
        let mut add = |label: &'static str, screen: Screen, scale: u32, page: u32| {
            transitions.push(Transition {
                label,
                target: FrameTarget { screen, scale, page },
            });
        };

        match self.screen {
            Screen::Title => {
                add("Ingredients", Screen::Ingredients, self.scale, 1);
                add("Steps", Screen::Steps, self.scale, 1);
            }
            Screen::Ingredients | Screen::Steps => {
                if self.page > 1 {
                    add("<", self.screen, self.scale, self.page - 1);
                } else {
                    add("Back", Screen::Title, self.scale, 1);
                }

                if self.page < self.last_page {
                    add(">", self.screen, self.scale, self.page + 1);
                } else if self.screen == Screen::Ingredients {
                    add("Begin", Screen::Steps, self.scale, 1);
                } else {
                    add("Finished 🎉", Screen::Completed, self.scale, 1);
                }
            }
            Screen::Completed => {
                add("Return to Start", Screen::Title, self.scale, 1);
            }
        }

        // Completion has no scale of its own
        let scalable = self.screen != Screen::Completed;
        if scalable && self.scale > MIN_SCALE {
            add("Scale -", self.screen, (self.scale - 1).clamp(MIN_SCALE, MAX_SCALE), self.page);
        }
        if scalable && self.scale < MAX_SCALE {
            add("Scale +", self.screen, (self.scale + 1).clamp(MIN_SCALE, MAX_SCALE), self.page);
        }

        transitions
    }
}
