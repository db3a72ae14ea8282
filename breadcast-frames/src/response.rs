//! Frame HTML documents
//!
//! The body is empty; clients only read the `og:` and `fc:frame` meta tags.

use std::fmt::Write;

/// Button as written into the frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameButton {
    pub label: String,
    /// Post-back URL; buttons without one get no action
    pub target: Option<String>,
}

/// Frame document with image, post URL and buttons (numbered from 1)
pub fn frame_document(image_url: &str, post_url: &str, buttons: &[FrameButton]) -> String {
    let mut head = String::new();
    meta(&mut head, "og:image", image_url);
    meta(&mut head, "fc:frame", "vNext");
    meta(&mut head, "fc:frame:post_url", post_url);
    meta(&mut head, "fc:frame:image", image_url);

    for (index, button) in buttons.iter().enumerate() {
        let number = index + 1;
        meta(&mut head, &format!("fc:frame:button:{}", number), &button.label);
        if let Some(target) = &button.target {
            meta(&mut head, &format!("fc:frame:button:{}:action", number), "post");
            meta(&mut head, &format!("fc:frame:button:{}:target", number), target);
        }
    }

    wrap(&head)
}

/// Frame document with only an image: no post URL, no buttons
pub fn error_document(image_url: &str) -> String {
    let mut head = String::new();
    meta(&mut head, "og:image", image_url);
    meta(&mut head, "fc:frame", "vNext");
    meta(&mut head, "fc:frame:image", image_url);
    wrap(&head)
}

fn meta(head: &mut String, property: &str, content: &str) {
    let _ = writeln!(
        head,
        "    <meta property=\"{}\" content=\"{}\" />",
        escape_attribute(property),
        escape_attribute(content)
    );
}

fn wrap(head: &str) -> String {
    format!("<!DOCTYPE html>\n<html lang=\"en\">\n  <head>\n{}  </head>\n  <body></body>\n</html>\n", head)
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
