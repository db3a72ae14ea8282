use super::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::page::{Fragment, PageDescription, PageKind, ScaledIngredient};
use std::fmt::Write;

const WIDTH: f32 = FRAME_WIDTH as f32;
const HEIGHT: f32 = FRAME_HEIGHT as f32;
const MARGIN: f32 = 16.0;

const ACCENT: &str = "#7851A9";
const CREAM: &str = "rgb(252,251,244)";
const INK: &str = "#2b2118";
const MUTED: &str = "#8a8a8a";

const HEADING_FONT: &str = "DM Serif Display, serif";
const TEXT_FONT: &str = "Quattrocento, serif";
const LABEL_FONT: &str = "Dosis, sans-serif";
const QUANTITY_FONT: &str = "Spline Sans Mono, monospace";

/// Rough advance of one character relative to the font size
const CHAR_WIDTH: f32 = 0.52;

/// Lay out `page` as an SVG document of the frame size.
///
/// With a background the document is an overlay: transparent on the right,
/// cream on the left so the text stays readable.
pub fn page_svg(page: &PageDescription, with_background: bool) -> String {
    let mut svg = SvgDocument::new();

    if with_background {
        svg.fade_overlay();
    } else {
        svg.push(format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            WIDTH, HEIGHT, CREAM
        ));
    }

    match page.kind {
        PageKind::Completed | PageKind::Error => svg.message(page),
        PageKind::Title | PageKind::Ingredients | PageKind::Step => {
            let header_bottom = svg.header(page);
            let body_top = svg.subtitles(page, header_bottom);
            match page.kind {
                PageKind::Title => svg.paragraphs(&page.body, body_top),
                PageKind::Ingredients => svg.ingredient_lines(&page.body, body_top),
                _ => svg.step_flow(&page.body, body_top),
            }
            svg.page_dots(page.current_page, page.total_pages);
        }
    }

    svg.finish()
}

struct SvgDocument {
    content: String,
}

struct TextStyle {
    size: f32,
    font: &'static str,
    fill: &'static str,
    anchor: &'static str,
    bold: bool,
}

impl TextStyle {
    fn new(size: f32, font: &'static str) -> Self {
        Self {
            size,
            font,
            fill: INK,
            anchor: "start",
            bold: false,
        }
    }

    fn fill(mut self, fill: &'static str) -> Self {
        self.fill = fill;
        self
    }

    fn anchor(mut self, anchor: &'static str) -> Self {
        self.anchor = anchor;
        self
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

impl SvgDocument {
    fn new() -> Self {
        Self {
            content: String::new(),
        }
    }

    fn push(&mut self, element: String) {
        self.content.push_str(&element);
        self.content.push('\n');
    }

    fn text(&mut self, x: f32, y: f32, style: &TextStyle, content: &str) {
        self.push(format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{}" font-family="{}" fill="{}" text-anchor="{}"{}>{}</text>"#,
            x,
            y,
            style.size,
            style.font,
            style.fill,
            style.anchor,
            if style.bold { r#" font-weight="bold""# } else { "" },
            escape_xml(content)
        ));
    }

    fn fade_overlay(&mut self) {
        self.push(
            concat!(
                r#"<defs><linearGradient id="fade" x1="0" y1="0" x2="1" y2="0.55">"#,
                r#"<stop offset="0" stop-color="rgb(252,251,244)" stop-opacity="1"/>"#,
                r#"<stop offset="0.45" stop-color="rgb(252,251,244)" stop-opacity="0.95"/>"#,
                r#"<stop offset="0.55" stop-color="rgb(252,251,244)" stop-opacity="0.9"/>"#,
                r#"<stop offset="0.73" stop-color="rgb(252,251,244)" stop-opacity="0.65"/>"#,
                r#"<stop offset="1" stop-color="rgb(252,251,244)" stop-opacity="0"/>"#,
                r#"</linearGradient></defs>"#
            )
            .to_string(),
        );
        self.push(format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="url(#fade)"/>"#,
            WIDTH, HEIGHT
        ));
    }

    /// Title and scale pill; returns the bottom of the title block
    fn header(&mut self, page: &PageDescription) -> f32 {
        let style = TextStyle::new(34.0, HEADING_FONT);
        let lines = wrap_text(&page.title, style.size, WIDTH * 0.72);
        let mut y = 48.0;
        for line in lines.iter().take(2) {
            self.text(MARGIN, y, &style, line);
            y += 38.0;
        }

        if let Some(label) = page.scale_label {
            let size = 17.0;
            let width = text_width(label, size) + 24.0;
            let x = WIDTH - MARGIN - width;
            self.push(format!(
                r#"<rect x="{:.1}" y="18" width="{:.1}" height="30" rx="15" fill="{}"/>"#,
                x, width, ACCENT
            ));
            let pill = TextStyle::new(size, LABEL_FONT).fill("white").anchor("middle");
            self.text(x + width / 2.0, 39.0, &pill, label);
        }

        y - 38.0
    }

    /// Time and yield lines; returns where the body starts
    fn subtitles(&mut self, page: &PageDescription, top: f32) -> f32 {
        let style = TextStyle::new(19.0, LABEL_FONT);
        let mut y = top + 6.0;
        for line in [&page.subtitle, &page.yield_line].into_iter().flatten() {
            y += 26.0;
            self.text(MARGIN, y, &style, line);
        }
        y + 12.0
    }

    fn paragraphs(&mut self, body: &[Fragment], top: f32) {
        let style = TextStyle::new(21.0, TEXT_FONT);
        let mut y = top + 20.0;
        for fragment in body {
            if let Fragment::Paragraph(text) = fragment {
                for line in wrap_text(text, style.size, WIDTH * 0.68) {
                    if y > HEIGHT - 30.0 {
                        return;
                    }
                    self.text(MARGIN, y, &style, &line);
                    y += 28.0;
                }
                y += 10.0;
            }
        }
    }

    fn ingredient_lines(&mut self, body: &[Fragment], top: f32) {
        let lines: Vec<&ScaledIngredient> = body
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::IngredientLine(ingredient) => Some(ingredient),
                _ => None,
            })
            .collect();

        let line_height = 38.0;
        let available = HEIGHT - 36.0 - top;
        let mut y = top + (available - line_height * lines.len() as f32).max(0.0) / 2.0 + 26.0;
        let column = WIDTH * 0.38;

        for ingredient in lines {
            self.push(format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="{}"><tspan font-family="{}" font-size="21" font-weight="bold">{}</tspan><tspan font-family="{}" font-size="19" dx="6">{}</tspan></text>"#,
                column,
                y,
                INK,
                QUANTITY_FONT,
                escape_xml(&ingredient.quantity_text()),
                LABEL_FONT,
                escape_xml(&ingredient.unit)
            ));
            self.text(column + 24.0, y, &TextStyle::new(22.0, TEXT_FONT), &ingredient.name);
            y += line_height;
        }
    }

    /// Words and ingredient chips flowed left to right, wrapping at the margin
    fn step_flow(&mut self, body: &[Fragment], top: f32) {
        let word_style = TextStyle::new(24.0, TEXT_FONT);
        let chip_style = TextStyle::new(24.0, TEXT_FONT).bold().anchor("middle");
        let amount_style = TextStyle::new(15.0, QUANTITY_FONT).fill(ACCENT).anchor("middle");
        let space = 7.0;
        let line_height = 60.0;

        let mut x = MARGIN;
        let mut y = top + 36.0;

        for fragment in body {
            let width = match fragment {
                Fragment::Word(word) => text_width(word, word_style.size),
                Fragment::Chip(ingredient) => text_width(&ingredient.name, chip_style.size)
                    .max(text_width(&amount_text(ingredient), amount_style.size))
                    .max(60.0),
                _ => continue,
            };

            if x > MARGIN && x + width > WIDTH - MARGIN {
                x = MARGIN;
                y += line_height;
            }
            if y > HEIGHT - 30.0 {
                break;
            }

            match fragment {
                Fragment::Word(word) => self.text(x, y, &word_style, word),
                Fragment::Chip(ingredient) => {
                    let center = x + width / 2.0;
                    self.text(center, y, &chip_style, &ingredient.name);
                    self.text(center, y + 20.0, &amount_style, &amount_text(ingredient));
                }
                _ => {}
            }
            x += width + space;
        }
    }

    fn page_dots(&mut self, current: u32, total: u32) {
        if total <= 1 {
            return;
        }
        let spacing = 20.0;
        let start = WIDTH / 2.0 - spacing * (total - 1) as f32 / 2.0;
        for index in 0..total {
            let fill = if index + 1 == current { ACCENT } else { MUTED };
            self.push(format!(
                r#"<circle cx="{:.1}" cy="{:.1}" r="5" fill="{}"/>"#,
                start + spacing * index as f32,
                HEIGHT - 18.0,
                fill
            ));
        }
    }

    /// Centered heading and message for completion and error pages
    fn message(&mut self, page: &PageDescription) {
        let heading = TextStyle::new(30.0, HEADING_FONT).anchor("middle");
        let text = TextStyle::new(21.0, TEXT_FONT).anchor("middle");
        let center = WIDTH / 2.0;

        let mut y = HEIGHT / 2.0 - 24.0;
        for line in wrap_text(&page.title, heading.size, WIDTH * 0.85) {
            self.text(center, y, &heading, &line);
            y += 36.0;
        }
        y += 8.0;
        for fragment in &page.body {
            if let Fragment::Paragraph(message) = fragment {
                for line in wrap_text(message, text.size, WIDTH * 0.85) {
                    self.text(center, y, &text, &line);
                    y += 28.0;
                }
            }
        }
    }

    fn finish(self) -> String {
        let mut out = String::with_capacity(self.content.len() + 160);
        let _ = write!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = FRAME_WIDTH,
            h = FRAME_HEIGHT
        );
        out.push_str(&self.content);
        out.push_str("</svg>\n");
        out
    }
}

fn amount_text(ingredient: &ScaledIngredient) -> String {
    if ingredient.unit.is_empty() {
        ingredient.quantity_text()
    } else {
        format!("{} {}", ingredient.quantity_text(), ingredient.unit)
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * CHAR_WIDTH
}

/// Greedy word wrap by estimated width
fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if !current.is_empty() && text_width(&candidate, size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{COMPLETED_MESSAGE, ERROR_HEADING, ERROR_MESSAGE};
    use breadcast_common::{Ingredient, RecipeDocument};

    fn recipe() -> RecipeDocument {
        RecipeDocument {
            title: "Salt & Pepper Crackers".to_string(),
            description: "Crisp crackers for @X2 people".to_string(),
            total_time_minutes: 45,
            active_time_minutes: 15,
            yields: "@X24 crackers".to_string(),
            ingredients: (1..=7)
                .map(|i| Ingredient {
                    name: format!("ingredient {}", i),
                    quantity: 0.5,
                    unit: "cup".to_string(),
                })
                .collect(),
            steps: vec!["Combine @1 with @2 then rest".to_string()],
            equipment: Vec::new(),
            image_cid: None,
        }
    }

    #[test]
    fn test_title_svg_contains_text() {
        let svg = page_svg(&PageDescription::title(&recipe(), 2), false);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Salt &amp; Pepper Crackers"));
        assert!(svg.contains("Crisp crackers for 4 people"));
        assert!(svg.contains("48 crackers"));
        assert!(svg.contains("Double recipe"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_ingredients_svg_has_dots_for_each_page() {
        let svg = page_svg(&PageDescription::ingredients(&recipe(), 3, 2), true);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("url(#fade)"));
        // 0.5 * 3
        assert!(svg.contains(">1.5<"));
        assert!(svg.contains("ingredient 7"));
        assert!(!svg.contains("ingredient 5<"));
    }

    #[test]
    fn test_step_svg_places_chips() {
        let svg = page_svg(&PageDescription::step(&recipe(), 2, 1), false);
        assert!(svg.contains(">Combine<"));
        assert!(svg.contains(">ingredient 1<"));
        assert!(svg.contains(">1 cup<"));
        // Single step: no page dots
        assert_eq!(svg.matches("<circle").count(), 0);
    }

    #[test]
    fn test_message_pages() {
        let svg = page_svg(&PageDescription::error(), false);
        let heading_lines = wrap_text(ERROR_HEADING, 30.0, WIDTH * 0.85);
        assert!(heading_lines.len() > 1);
        for line in heading_lines.iter().chain(wrap_text(ERROR_MESSAGE, 21.0, WIDTH * 0.85).iter()) {
            assert!(svg.contains(&format!(">{}</text>", escape_xml(line))), "missing line {:?}", line);
        }
        assert!(svg.contains(">For some reason"));
        assert!(!svg.contains("recipe</text>"));

        let recipe = recipe();
        let svg = page_svg(&PageDescription::completed(&recipe), true);
        for line in wrap_text(COMPLETED_MESSAGE, 21.0, WIDTH * 0.85) {
            assert!(svg.contains(&format!(">{}</text>", escape_xml(&line))));
        }
        assert!(svg.contains("Feedback &amp;"));
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four five six", 10.0, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "one two three four five six");
        assert!(wrap_text("", 10.0, 60.0).is_empty());
        // A single long word is never split
        assert_eq!(wrap_text("Supercalifragilistic", 20.0, 10.0).len(), 1);
    }
}
