//! Request arguments
//!
//! Query parameters are lenient: anything unparseable falls back to its
//! default and numbers are clamped, so every request maps to a valid state.

use serde::Deserialize;
use std::fmt;

pub const MIN_SCALE: u32 = 1;
pub const MAX_SCALE: u32 = 8;

/// Which part of the recipe a frame shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Title,
    Ingredients,
    Steps,
    Completed,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Title, Screen::Ingredients, Screen::Steps, Screen::Completed];

    /// Wire name used in the `screen` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Title => "title",
            Screen::Ingredients => "ingredients",
            Screen::Steps => "steps",
            Screen::Completed => "complete",
        }
    }

    /// Total parse: unknown or missing values map to `Title`
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|v| Screen::ALL.into_iter().find(|s| s.as_str() == v))
            .unwrap_or(Screen::Title)
    }

    /// Whether the screen is paginated (and carries a page in its URL and key)
    pub fn has_pages(&self) -> bool {
        matches!(self, Screen::Ingredients | Screen::Steps)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw query string of a frame request
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FrameQuery {
    pub scale: Option<String>,
    pub screen: Option<String>,
    pub page: Option<String>,
}

/// Sanitized arguments of a frame request
///
/// `page` is only clamped from below here; the upper bound depends on the
/// recipe and is applied when the navigation state is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameArguments {
    pub recipe_id: String,
    pub screen: Screen,
    pub scale: u32,
    pub page: u32,
}

impl FrameQuery {
    /// Collect decoded query pairs, keeping the first value of a repeated key
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = FrameQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "scale" => &mut query.scale,
                "screen" => &mut query.screen,
                "page" => &mut query.page,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    pub fn into_arguments(self, recipe_id: impl Into<String>) -> FrameArguments {
        let scale = parse_leading_int(self.scale.as_deref())
            .unwrap_or(MIN_SCALE as i64)
            .clamp(MIN_SCALE as i64, MAX_SCALE as i64) as u32;
        let page = parse_leading_int(self.page.as_deref())
            .unwrap_or(1)
            .clamp(1, u32::MAX as i64) as u32;

        FrameArguments {
            recipe_id: recipe_id.into(),
            screen: Screen::parse(self.screen.as_deref()),
            scale,
            page,
        }
    }
}

/// Integer prefix of `value` (`"3"`, `"3px"` and `" 3"` all give 3)
fn parse_leading_int(value: Option<&str>) -> Option<i64> {
    let value = value?.trim_start();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Overflowing digit strings saturate
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}
