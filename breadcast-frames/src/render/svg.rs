use super::{page_svg, Renderer, FRAME_HEIGHT, FRAME_WIDTH};
use crate::page::PageDescription;
use crate::{Error, Result};
use async_trait::async_trait;
use breadcast_common::ObjectStore;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Premultiplied RGBA8 at the frame size
type Background = Arc<Vec<u8>>;

/// Lays pages out as SVG and rasterizes them with resvg
///
/// Background images are fetched from the object store once per content
/// identifier, scaled to cover the frame, and kept in memory.
pub struct SvgRenderer {
    store: Arc<dyn ObjectStore>,
    fontdb: Arc<usvg::fontdb::Database>,
    backgrounds: Mutex<HashMap<String, Background>>,
}

impl SvgRenderer {
    /// System fonts plus any `.ttf`/`.otf`/`.ttc` files in `fonts_dir`
    pub fn new(store: Arc<dyn ObjectStore>, fonts_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = fonts_dir {
            load_fonts_from_dir(&mut db, dir);
        }
        debug!(faces = db.len(), "Font database ready");

        Self {
            store,
            fontdb: Arc::new(db),
            backgrounds: Mutex::new(HashMap::new()),
        }
    }

    /// Background for `cid`, or `None` if it cannot be fetched or decoded
    async fn background(&self, cid: &str) -> Option<Background> {
        if let Some(background) = self.backgrounds.lock().await.get(cid) {
            return Some(Arc::clone(background));
        }

        let bytes = match self.store.get(cid).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(cid = %cid, error = %e, "Background image unavailable, rendering without it");
                return None;
            }
        };

        let decoded = tokio::task::spawn_blocking(move || decode_background(&bytes)).await;
        match decoded {
            Ok(Ok(rgba)) => {
                let background = Arc::new(rgba);
                self.backgrounds
                    .lock()
                    .await
                    .insert(cid.to_string(), Arc::clone(&background));
                Some(background)
            }
            Ok(Err(e)) => {
                warn!(cid = %cid, error = %e, "Background image could not be decoded");
                None
            }
            Err(e) => {
                warn!(cid = %cid, error = %e, "Background decoding task failed");
                None
            }
        }
    }
}

#[async_trait]
impl Renderer for SvgRenderer {
    async fn render(&self, page: &PageDescription) -> Result<Vec<u8>> {
        let background = match &page.background_cid {
            Some(cid) => self.background(cid).await,
            None => None,
        };

        let svg = page_svg(page, background.is_some());
        let fontdb = Arc::clone(&self.fontdb);

        tokio::task::spawn_blocking(move || rasterize(&svg, fontdb, background.as_deref().map(Vec::as_slice)))
            .await
            .map_err(|e| Error::Render(format!("rasterizer task failed: {}", e)))?
    }
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!("Fonts directory {} is not readable", dir.display());
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc") {
            if let Err(e) = db.load_font_file(&path) {
                warn!("Skipping font {}: {}", path.display(), e);
            }
        }
    }
}

/// Decode, scale to cover the frame (cropping the overflow), premultiply
fn decode_background(bytes: &[u8]) -> std::result::Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let covered = decoded.resize_to_fill(FRAME_WIDTH, FRAME_HEIGHT, image::imageops::FilterType::Triangle);
    let mut rgba = covered.to_rgba8().into_raw();
    premultiply_rgba8_in_place(&mut rgba);
    Ok(rgba)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn rasterize(svg: &str, fontdb: Arc<usvg::fontdb::Database>, background: Option<&[u8]>) -> Result<Vec<u8>> {
    let options = usvg::Options {
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| Error::Render(format!("parse svg: {}", e)))?;

    let mut pixmap = Pixmap::new(FRAME_WIDTH, FRAME_HEIGHT)
        .ok_or_else(|| Error::Render("failed to allocate frame pixmap".to_string()))?;

    match background {
        Some(rgba) if rgba.len() == pixmap.data().len() => pixmap.data_mut().copy_from_slice(rgba),
        _ => pixmap.fill(Color::from_rgba8(252, 251, 244, 255)),
    }

    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    encode_png(&pixmap)
}

fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let frame = image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .ok_or_else(|| Error::Render("pixel buffer does not match frame size".to_string()))?;

    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| Error::Render(format!("encode png: {}", e)))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breadcast_common::store::MemoryObjectStore;
    use breadcast_common::{Ingredient, RecipeDocument};

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn recipe(image_cid: Option<String>) -> RecipeDocument {
        RecipeDocument {
            title: "Rye".to_string(),
            description: "Dense and dark".to_string(),
            total_time_minutes: 240,
            active_time_minutes: 40,
            yields: "@X1 loaf".to_string(),
            ingredients: vec![Ingredient {
                name: "rye flour".to_string(),
                quantity: 500.0,
                unit: "g".to_string(),
            }],
            steps: vec!["Mix @1".to_string()],
            equipment: Vec::new(),
            image_cid,
        }
    }

    #[tokio::test]
    async fn test_renders_png_of_frame_size() {
        let store = Arc::new(MemoryObjectStore::default());
        let renderer = SvgRenderer::new(store, None);

        let png = renderer.render(&PageDescription::title(&recipe(None), 1)).await.unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), FRAME_WIDTH);
        assert_eq!(decoded.height(), FRAME_HEIGHT);
    }

    #[tokio::test]
    async fn test_background_is_fetched_once() {
        let store = Arc::new(MemoryObjectStore::default());
        let cid = store.insert(png_bytes(40, 20, [200, 40, 40, 255]));
        let renderer = SvgRenderer::new(store.clone(), None);
        let page = PageDescription::step(&recipe(Some(cid.clone())), 1, 1);

        let png = renderer.render(&page).await.unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        // Right edge is outside the fade overlay
        let px = decoded.get_pixel(FRAME_WIDTH - 1, FRAME_HEIGHT - 1);
        assert!(px[0] > 150 && px[1] < 120, "expected background red, got {:?}", px);

        renderer.render(&page).await.unwrap();
        assert_eq!(renderer.backgrounds.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_background_still_renders() {
        let store = Arc::new(MemoryObjectStore::default());
        let renderer = SvgRenderer::new(store, None);
        let page = PageDescription::completed(&recipe(Some("QmMissing".to_string())));

        let png = renderer.render(&page).await.unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn test_premultiply() {
        let mut px = [100u8, 50, 200, 128];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(
            px,
            [
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128
            ]
        );
    }
}
