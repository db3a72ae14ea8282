use super::{AssetCache, RenderJob, SingleFlight};
use crate::Result;
use async_trait::async_trait;
use breadcast_common::recipe_files::{load_json_or_default, save_json_pretty};
use breadcast_common::ObjectStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

type Pinned = Arc<RwLock<BTreeMap<String, String>>>;

/// Asset key → content identifier file kept next to the recipe sets
struct Ledger {
    path: PathBuf,
    /// Serializes writers so the newest map is always the last one written
    write: Mutex<()>,
}

impl Ledger {
    async fn save(&self, pinned: &Pinned) {
        let _guard = self.write.lock().await;
        let snapshot = pinned.read().await.clone();
        if let Err(e) = save_json_pretty(&self.path, &snapshot).await {
            warn!(path = %self.path.display(), error = %e, "Failed to save pinned frame images");
        }
    }
}

/// Render once, upload once, remember the content identifier forever
///
/// Images are uploaded under their asset key and served from the gateway.
/// With a ledger file the key map survives restarts.
pub struct PinOnceCache {
    store: Arc<dyn ObjectStore>,
    pinned: Pinned,
    ledger: Option<Arc<Ledger>>,
    flights: SingleFlight<String>,
}

impl PinOnceCache {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            pinned: Arc::new(RwLock::new(BTreeMap::new())),
            ledger: None,
            flights: SingleFlight::new(),
        }
    }

    /// Cache backed by a ledger file: entries already in it are never
    /// regenerated and every new pin is written back.
    pub async fn with_ledger(store: Arc<dyn ObjectStore>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let pinned: BTreeMap<String, String> = load_json_or_default(&path).await?;
        info!(path = %path.display(), entries = pinned.len(), "Loaded pinned frame images");

        Ok(Self {
            store,
            pinned: Arc::new(RwLock::new(pinned)),
            ledger: Some(Arc::new(Ledger {
                path,
                write: Mutex::new(()),
            })),
            flights: SingleFlight::new(),
        })
    }

    pub fn ledger_path(&self) -> Option<&Path> {
        self.ledger.as_ref().map(|ledger| ledger.path.as_path())
    }

    /// Record an already pinned image so it is never regenerated
    pub async fn seed(&self, key: impl Into<String>, cid: impl Into<String>) {
        self.pinned.write().await.entry(key.into()).or_insert(cid.into());
    }

    /// Content identifier recorded for `key`
    pub async fn cid_for(&self, key: &str) -> Option<String> {
        self.pinned.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.pinned.read().await.len()
    }
}

#[async_trait]
impl AssetCache for PinOnceCache {
    async fn resolve(&self, key: &str, job: RenderJob) -> Result<String> {
        if let Some(cid) = self.cid_for(key).await {
            debug!(key = %key, cid = %cid, "Pinned frame image hit");
            return Ok(self.store.url_for(&cid));
        }

        let generation = render_and_pin(
            Arc::clone(&self.pinned),
            Arc::clone(&self.store),
            self.ledger.clone(),
            key.to_string(),
            job,
        );
        let cid = self.flights.run(key, generation).await?;
        Ok(self.store.url_for(&cid))
    }
}

async fn render_and_pin(
    pinned: Pinned,
    store: Arc<dyn ObjectStore>,
    ledger: Option<Arc<Ledger>>,
    key: String,
    job: RenderJob,
) -> Result<String> {
    if let Some(cid) = pinned.read().await.get(&key) {
        return Ok(cid.clone());
    }

    let png = job.await?;
    let cid = store.put(&key, png).await?;
    info!(key = %key, cid = %cid, "Pinned frame image");

    // Write-once: a seeded value wins over a fresh upload
    let cid = pinned.write().await.entry(key).or_insert(cid).clone();
    if let Some(ledger) = ledger {
        ledger.save(&pinned).await;
    }
    Ok(cid)
}
