//! Asset key derivation
//!
//! One key per visually distinct frame image. Keys double as upload file
//! names and as lookup keys in `rendered-recipes.json`, so the format is
//! stable.

use crate::args::Screen;

/// Derive the cache key for a frame image.
///
/// `page` must already be clamped to the recipe's bounds. It is ignored for
/// the title and completion screens; the completion screen ignores scale too.
///
/// # Examples
///
/// ```
/// use breadcast_frames::args::Screen;
/// use breadcast_frames::asset_key::derive_key;
///
/// assert_eq!(derive_key("QmR", Screen::Title, 2, 1), "QmR-title-2");
/// assert_eq!(derive_key("QmR", Screen::Ingredients, 1, 3), "QmR-ingredients-1-3");
/// assert_eq!(derive_key("QmR", Screen::Steps, 4, 2), "QmR-step-4-2");
/// assert_eq!(derive_key("QmR", Screen::Completed, 8, 5), "QmR-completed");
/// ```
pub fn derive_key(recipe_id: &str, screen: Screen, scale: u32, page: u32) -> String {
    match screen {
        Screen::Title => format!("{}-title-{}", recipe_id, scale),
        Screen::Ingredients => format!("{}-ingredients-{}-{}", recipe_id, scale, page),
        Screen::Steps => format!("{}-step-{}-{}", recipe_id, scale, page),
        Screen::Completed => format!("{}-completed", recipe_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_distinguish_visible_states() {
        let mut keys = HashSet::new();
        for scale in 1..=8 {
            assert!(keys.insert(derive_key("QmR", Screen::Title, scale, 1)));
            for page in 1..=4 {
                assert!(keys.insert(derive_key("QmR", Screen::Ingredients, scale, page)));
                assert!(keys.insert(derive_key("QmR", Screen::Steps, scale, page)));
            }
        }
        assert!(keys.insert(derive_key("QmR", Screen::Completed, 1, 1)));
        assert_eq!(keys.len(), 8 + 8 * 4 * 2 + 1);
    }

    #[test]
    fn test_title_ignores_page_and_completed_ignores_scale() {
        assert_eq!(
            derive_key("QmR", Screen::Title, 3, 1),
            derive_key("QmR", Screen::Title, 3, 7)
        );
        assert_eq!(
            derive_key("QmR", Screen::Completed, 1, 1),
            derive_key("QmR", Screen::Completed, 8, 3)
        );
    }
}
