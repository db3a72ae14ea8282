//! Integration tests for the breadcast-frames HTTP API
//!
//! Tests cover:
//! - Health and build info endpoints
//! - Frame documents for each screen, GET and POST alike
//! - Not-found handling with no rendering side effects
//! - Single rendering under concurrent identical requests
//! - Error frame when rendering fails

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use breadcast_common::recipe_files::ReloadingFile;
use breadcast_common::store::MemoryObjectStore;
use breadcast_common::{Ingredient, RecipeDocument, RenderedRecipe, RenderedRecipeSet};
use breadcast_frames::cache::PinOnceCache;
use breadcast_frames::page::{PageDescription, PageKind};
use breadcast_frames::render::Renderer;
use breadcast_frames::source::PrerenderedSource;
use breadcast_frames::{build_router, AppState, Error, FrameEngine, Result};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

const RECIPE_ID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
const UNKNOWN_ID: &str = "QmZ4tDuvesekSs4qM5ZBKpXiZGun7S2CYtEZRB3DYXkjGx";

/// Fake renderer: counts calls, optionally fails everything but the error page
struct CountingRenderer {
    renders: AtomicUsize,
    fail_pages: bool,
}

impl CountingRenderer {
    fn new(fail_pages: bool) -> Arc<Self> {
        Arc::new(Self {
            renders: AtomicUsize::new(0),
            fail_pages,
        })
    }

    fn count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for CountingRenderer {
    async fn render(&self, page: &PageDescription) -> Result<Vec<u8>> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_pages && page.kind != PageKind::Error {
            return Err(Error::Render("rasterizer unavailable".to_string()));
        }
        Ok(format!("{:?}-{}-{}", page.kind, page.title, page.current_page).into_bytes())
    }
}

fn recipe() -> RecipeDocument {
    RecipeDocument {
        title: "Sourdough".to_string(),
        description: "Makes @X2 loaves".to_string(),
        total_time_minutes: 1440,
        active_time_minutes: 45,
        yields: "@X2 loaves".to_string(),
        ingredients: (1..=12)
            .map(|i| Ingredient {
                name: format!("ingredient {}", i),
                quantity: 10.0 * i as f64,
                unit: "g".to_string(),
            })
            .collect(),
        steps: vec![
            "Mix @1 and @2".to_string(),
            "Fold".to_string(),
            "Bake".to_string(),
        ],
        equipment: Vec::new(),
        image_cid: None,
    }
}

struct TestApp {
    router: Router,
    renderer: Arc<CountingRenderer>,
    store: Arc<MemoryObjectStore>,
}

/// Test helper: prerendered source with no prerendered images, pin-once cache
fn setup_app(fail_pages: bool, public_url: Option<&str>) -> TestApp {
    let mut set = RenderedRecipeSet::new();
    set.insert(
        RECIPE_ID.to_string(),
        RenderedRecipe {
            recipe_data: recipe(),
            asset_cids: BTreeMap::new(),
        },
    );
    let source = Arc::new(PrerenderedSource::new(ReloadingFile::from_value(
        PathBuf::from("rendered-recipes.json"),
        set,
    )));

    let store = Arc::new(MemoryObjectStore::new("https://gw.example"));
    let renderer = CountingRenderer::new(fail_pages);
    let engine = FrameEngine::new(
        source,
        Arc::new(PinOnceCache::new(store.clone())),
        renderer.clone(),
        store.clone(),
    );

    let state = AppState::new(Arc::new(engine), public_url.map(str::to_string));
    TestApp {
        router: build_router(state),
        renderer,
        store,
    }
}

/// Test helper: request with a Host header
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "frames.example")
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: Extract text body from response
async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

fn button_target(html: &str, number: usize) -> Option<String> {
    let marker = format!("property=\"fc:frame:button:{}:target\" content=\"", number);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].replace("&amp;", "&"))
}

// =============================================================================
// Health / build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(false, None);

    let response = app.router.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "breadcast-frames");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
    assert!(body["uptime_secs"].as_u64().is_some());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = setup_app(false, None);

    let response = app.router.oneshot(test_request("GET", "/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Frames
// =============================================================================

#[tokio::test]
async fn test_title_frame_defaults() {
    let app = setup_app(false, None);
    let uri = format!("/{}", RECIPE_ID);

    let response = app.router.oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = extract_text(response.into_body()).await;
    assert!(html.contains(r#"<meta property="fc:frame" content="vNext" />"#));
    assert!(html.contains(&format!(
        r#"<meta property="fc:frame:post_url" content="https://frames.example/{}" />"#,
        RECIPE_ID
    )));
    assert!(html.contains(r#"<meta property="fc:frame:image" content="https://gw.example/ipfs/Qm"#));
    assert_eq!(
        button_target(&html, 1).unwrap(),
        format!("https://frames.example/{}?scale=1&screen=ingredients&page=1", RECIPE_ID)
    );
    assert_eq!(
        button_target(&html, 2).unwrap(),
        format!("https://frames.example/{}?scale=1&screen=steps&page=1", RECIPE_ID)
    );
    assert_eq!(
        button_target(&html, 3).unwrap(),
        format!("https://frames.example/{}?scale=2&screen=title", RECIPE_ID)
    );
    assert!(button_target(&html, 4).is_none());

    assert_eq!(app.renderer.count(), 1);
    assert_eq!(app.store.put_count(), 1);
}

#[tokio::test]
async fn test_post_matches_get() {
    let app = setup_app(false, Some("https://frames.example"));
    let uri = format!("/{}?scale=3&screen=steps&page=2", RECIPE_ID);

    let get = app.router.clone().oneshot(test_request("GET", &uri)).await.unwrap();
    let post = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"untrustedData":{"buttonIndex":2}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(post.status(), StatusCode::OK);
    let get_html = extract_text(get.into_body()).await;
    let post_html = extract_text(post.into_body()).await;
    assert_eq!(get_html, post_html);
    assert!(get_html.contains(&format!(
        r#"content="https://frames.example/{}?scale=3&amp;screen=steps&amp;page=2""#,
        RECIPE_ID
    )));

    // Second request hits the pinned image
    assert_eq!(app.renderer.count(), 1);
}

#[tokio::test]
async fn test_out_of_range_arguments_are_clamped() {
    let app = setup_app(false, Some("https://frames.example"));
    let uri = format!("/{}?scale=99&screen=ingredients&page=9", RECIPE_ID);

    let response = app.router.oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = extract_text(response.into_body()).await;
    // Last of three pages at the largest scale: back a page, then on to the steps
    assert_eq!(
        button_target(&html, 1).unwrap(),
        format!("https://frames.example/{}?scale=8&screen=ingredients&page=2", RECIPE_ID)
    );
    assert_eq!(
        button_target(&html, 2).unwrap(),
        format!("https://frames.example/{}?scale=8&screen=steps&page=1", RECIPE_ID)
    );
    assert_eq!(
        button_target(&html, 3).unwrap(),
        format!("https://frames.example/{}?scale=7&screen=ingredients&page=3", RECIPE_ID)
    );
    assert!(button_target(&html, 4).is_none());
}

#[tokio::test]
async fn test_garbage_arguments_fall_back_to_defaults() {
    let app = setup_app(false, Some("https://frames.example"));
    let uri = format!("/{}?scale=abc&screen=dessert&page=-4", RECIPE_ID);

    let response = app.router.oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = extract_text(response.into_body()).await;
    assert_eq!(
        button_target(&html, 1).unwrap(),
        format!("https://frames.example/{}?scale=1&screen=ingredients&page=1", RECIPE_ID)
    );
}

#[tokio::test]
async fn test_repeated_query_keys_use_first_value() {
    let app = setup_app(false, Some("https://frames.example"));
    let uri = format!("/{}?scale=2&scale=3&screen=steps&screen=title&page=2&page=1", RECIPE_ID);

    let response = app.router.oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = extract_text(response.into_body()).await;
    assert_eq!(
        button_target(&html, 1).unwrap(),
        format!("https://frames.example/{}?scale=2&screen=steps&page=1", RECIPE_ID)
    );
    assert_eq!(
        button_target(&html, 2).unwrap(),
        format!("https://frames.example/{}?scale=2&screen=steps&page=3", RECIPE_ID)
    );
}

#[tokio::test]
async fn test_forwarded_proto_sets_scheme() {
    let app = setup_app(false, None);
    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", RECIPE_ID))
        .header(header::HOST, "frames.example")
        .header("x-forwarded-proto", "http")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    let html = extract_text(response.into_body()).await;
    assert_eq!(
        button_target(&html, 1).unwrap(),
        format!("http://frames.example/{}?scale=1&screen=ingredients&page=1", RECIPE_ID)
    );
}

#[tokio::test]
async fn test_completed_frame_returns_to_start() {
    let app = setup_app(false, Some("https://frames.example"));
    let uri = format!("/{}?scale=4&screen=complete", RECIPE_ID);

    let response = app.router.oneshot(test_request("POST", &uri)).await.unwrap();
    let html = extract_text(response.into_body()).await;

    assert!(html.contains(r#"property="fc:frame:button:1" content="Return to Start""#));
    assert_eq!(
        button_target(&html, 1).unwrap(),
        format!("https://frames.example/{}?scale=4&screen=title", RECIPE_ID)
    );
    assert!(button_target(&html, 2).is_none());
}

// =============================================================================
// Not found
// =============================================================================

#[tokio::test]
async fn test_unknown_recipe_is_not_found() {
    let app = setup_app(false, None);

    for uri in [format!("/{}", UNKNOWN_ID), "/not-a-cid".to_string()] {
        let response = app.router.clone().oneshot(test_request("GET", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(extract_text(response.into_body()).await, "Recipe not found");
    }

    assert_eq!(app.renderer.count(), 0);
    assert_eq!(app.store.put_count(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_requests_render_once() {
    let app = setup_app(false, None);
    let uri = format!("/{}?scale=2&screen=steps&page=1", RECIPE_ID);

    let requests = (0..8).map(|_| app.router.clone().oneshot(test_request("GET", &uri)));
    let responses = futures::future::join_all(requests).await;

    for response in responses {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }
    assert_eq!(app.renderer.count(), 1);
    assert_eq!(app.store.put_count(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_render_failure_serves_error_frame() {
    let app = setup_app(true, None);
    let uri = format!("/{}", RECIPE_ID);

    let response = app.router.clone().oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let html = extract_text(response.into_body()).await;
    assert!(html.contains(r#"<meta property="fc:frame:image" content="data:image/png;base64,"#));
    assert!(!html.contains("fc:frame:button"));
    assert!(!html.contains("fc:frame:post_url"));
    assert_eq!(app.store.put_count(), 0);

    // The failure is not cached: the next request renders again
    let before = app.renderer.count();
    let response = app.router.oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.renderer.count() > before);
}
