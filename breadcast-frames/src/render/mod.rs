//! Frame image rendering
//!
//! Pages are laid out as SVG and rasterized to PNG at the frame size.

mod layout;
mod svg;

pub use layout::page_svg;
pub use svg::SvgRenderer;

use crate::page::PageDescription;
use crate::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Frame image width in pixels
pub const FRAME_WIDTH: u32 = 764;
/// Frame image height in pixels
pub const FRAME_HEIGHT: u32 = 400;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// PNG bytes for `page`
    async fn render(&self, page: &PageDescription) -> Result<Vec<u8>>;
}

/// `data:image/png;base64,...`
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
