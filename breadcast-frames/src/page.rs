//! Page descriptions
//!
//! A [`PageDescription`] is everything a frame image shows, with scaling,
//! pagination and step markup already applied. Renderers only lay it out.

use crate::args::Screen;
use crate::pagination::calculate_pagination;
use breadcast_common::{Ingredient, RecipeDocument};
use std::fmt;
use tracing::debug;

pub const COMPLETED_HEADING: &str = "Thank You for Using Breadcast";
pub const COMPLETED_MESSAGE: &str = "Feedback & suggestions greatly appreciated.";
pub const ERROR_HEADING: &str = "For some reason we cannot display the requested content.";
pub const ERROR_MESSAGE: &str = "Please leave feedback and/or try again later.";

/// Discriminates the page layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Title,
    Ingredients,
    Step,
    Completed,
    Error,
}

/// Ingredient with its quantity multiplied by the recipe scale
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl ScaledIngredient {
    pub fn new(ingredient: &Ingredient, scale: u32) -> Self {
        Self {
            name: ingredient.name.clone(),
            quantity: ingredient.quantity * scale as f64,
            unit: ingredient.unit.clone(),
        }
    }

    /// Quantity as shown on the card: no decimal point for whole numbers, at
    /// most two decimals otherwise.
    pub fn quantity_text(&self) -> String {
        format_quantity(self.quantity)
    }
}

/// One piece of page body
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Word of step text
    Word(String),
    /// Ingredient referenced inline from step text
    Chip(ScaledIngredient),
    /// Row of the ingredient list
    IngredientLine(ScaledIngredient),
    /// Free-standing paragraph
    Paragraph(String),
}

/// Everything one frame image shows
#[derive(Debug, Clone, PartialEq)]
pub struct PageDescription {
    pub kind: PageKind,
    pub title: String,
    /// Active/total time line
    pub subtitle: Option<String>,
    pub yield_line: Option<String>,
    pub body: Vec<Fragment>,
    /// 1-indexed; zero on unpaginated pages
    pub current_page: u32,
    /// Dot indicator is drawn when greater than one
    pub total_pages: u32,
    /// `None` on completion and error pages
    pub scale_label: Option<&'static str>,
    pub background_cid: Option<String>,
}

impl PageDescription {
    /// Describe the page for `screen`. `page` is clamped against the recipe.
    pub fn for_screen(recipe: &RecipeDocument, screen: Screen, scale: u32, page: u32) -> Self {
        match screen {
            Screen::Title => Self::title(recipe, scale),
            Screen::Ingredients => Self::ingredients(recipe, scale, page),
            Screen::Steps => Self::step(recipe, scale, page),
            Screen::Completed => Self::completed(recipe),
        }
    }

    pub fn title(recipe: &RecipeDocument, scale: u32) -> Self {
        let description = scale_placeholders(&recipe.description, scale);
        let yields = scale_placeholders(&recipe.yields, scale);

        Self {
            kind: PageKind::Title,
            title: recipe.title.clone(),
            subtitle: time_line(recipe.active_time_minutes, recipe.total_time_minutes),
            yield_line: non_empty(yields),
            body: non_empty(description).map(Fragment::Paragraph).into_iter().collect(),
            current_page: 0,
            total_pages: 0,
            scale_label: scale_label(scale),
            background_cid: recipe.image_cid.clone(),
        }
    }

    pub fn ingredients(recipe: &RecipeDocument, scale: u32, page: u32) -> Self {
        let pagination = calculate_pagination(recipe.ingredients.len(), page);
        let body = pagination
            .slice(&recipe.ingredients)
            .iter()
            .map(|ingredient| Fragment::IngredientLine(ScaledIngredient::new(ingredient, scale)))
            .collect();

        Self {
            kind: PageKind::Ingredients,
            title: recipe.title.clone(),
            subtitle: None,
            yield_line: None,
            body,
            current_page: pagination.page,
            total_pages: pagination.total_pages,
            scale_label: scale_label(scale),
            background_cid: recipe.image_cid.clone(),
        }
    }

    pub fn step(recipe: &RecipeDocument, scale: u32, step: u32) -> Self {
        let step_count = recipe.steps.len() as u32;
        let step = step.clamp(1, step_count.max(1));
        let body = recipe
            .steps
            .get(step as usize - 1)
            .map(|text| parse_step_text(text, &recipe.ingredients, scale))
            .unwrap_or_default();

        Self {
            kind: PageKind::Step,
            title: recipe.title.clone(),
            subtitle: None,
            yield_line: None,
            body,
            current_page: step,
            total_pages: step_count,
            scale_label: scale_label(scale),
            background_cid: recipe.image_cid.clone(),
        }
    }

    pub fn completed(recipe: &RecipeDocument) -> Self {
        Self::message(PageKind::Completed, COMPLETED_HEADING, COMPLETED_MESSAGE, recipe.image_cid.clone())
    }

    pub fn error() -> Self {
        Self::message(PageKind::Error, ERROR_HEADING, ERROR_MESSAGE, None)
    }

    fn message(kind: PageKind, heading: &str, message: &str, background_cid: Option<String>) -> Self {
        Self {
            kind,
            title: heading.to_string(),
            subtitle: None,
            yield_line: None,
            body: vec![Fragment::Paragraph(message.to_string())],
            current_page: 0,
            total_pages: 0,
            scale_label: None,
            background_cid,
        }
    }
}

/// Replace every `@X<N>` with `N * scale`.
///
/// Markers whose digits do not fit are left as written.
///
/// # Examples
///
/// ```
/// use breadcast_frames::page::scale_placeholders;
///
/// assert_eq!(scale_placeholders("Makes @X3 loaves", 2), "Makes 6 loaves");
/// assert_eq!(scale_placeholders("Makes @X3 loaves", 1), "Makes 3 loaves");
/// assert_eq!(scale_placeholders("no markers", 5), "no markers");
/// ```
pub fn scale_placeholders(text: &str, scale: u32) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("@X") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let digits = leading_digits(after);

        let scaled = after[..digits]
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(scale as u64));
        match scaled {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[pos..pos + 2 + digits]),
        }
        rest = &after[digits..];
    }

    out.push_str(rest);
    out
}

/// Split step text into words and ingredient chips.
///
/// `@N` references the N-th ingredient (1-indexed). References outside the
/// ingredient list are dropped.
pub fn parse_step_text(text: &str, ingredients: &[Ingredient], scale: u32) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = text;

    while let Some((start, end, number)) = find_ingredient_marker(rest) {
        push_words(&mut fragments, &rest[..start]);

        match number.checked_sub(1).and_then(|index| ingredients.get(index)) {
            Some(ingredient) => fragments.push(Fragment::Chip(ScaledIngredient::new(ingredient, scale))),
            None => debug!(
                marker = %&rest[start..end],
                ingredient_count = ingredients.len(),
                "Dropping ingredient reference outside the ingredient list"
            ),
        }

        rest = &rest[end..];
    }

    push_words(&mut fragments, rest);
    fragments
}

/// `(start, end, number)` of the first `@<digits>` in `text`
fn find_ingredient_marker(text: &str) -> Option<(usize, usize, usize)> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('@') {
        let at = search_from + offset;
        let digits = leading_digits(&text[at + 1..]);
        if digits > 0 {
            let end = at + 1 + digits;
            let number = text[at + 1..end].parse::<usize>().unwrap_or(usize::MAX);
            return Some((at, end, number));
        }
        search_from = at + 1;
    }
    None
}

fn push_words(fragments: &mut Vec<Fragment>, span: &str) {
    fragments.extend(
        span.split(' ')
            .filter(|word| !word.is_empty())
            .map(|word| Fragment::Word(word.to_string())),
    );
}

fn leading_digits(text: &str) -> usize {
    text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len())
}

/// Label of the scale pill
pub fn scale_label(scale: u32) -> Option<&'static str> {
    match scale {
        1 => Some("Single recipe"),
        2 => Some("Double recipe"),
        3 => Some("Triple recipe"),
        4 => Some("Quadruple recipe"),
        5 => Some("Quintuple recipe"),
        6 => Some("Sextuple recipe"),
        7 => Some("Septuple recipe"),
        8 => Some("Octuple recipe"),
        _ => None,
    }
}

/// `"1 hrs, 30 mins"`, `"45 mins"`, `"2 hrs"`; empty for zero
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let remaining = minutes % 60;

    match (hours, remaining) {
        (0, 0) => String::new(),
        (0, m) => format!("{} mins", m),
        (h, 0) => format!("{} hrs", h),
        (h, m) => format!("{} hrs, {} mins", h, m),
    }
}

fn time_line(active: u32, total: u32) -> Option<String> {
    if active > 0 && active != total {
        return Some(format!("{} active  {} total", format_minutes(active), format_minutes(total)));
    }
    non_empty(format_minutes(total))
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        return format!("{}", quantity);
    }
    let fixed = format!("{:.2}", quantity);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl fmt::Display for ScaledIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} {}", self.quantity_text(), self.name)
        } else {
            write!(f, "{} {} {}", self.quantity_text(), self.unit, self.name)
        }
    }
}
