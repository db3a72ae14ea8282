use super::{AssetCache, RenderJob, SingleFlight};
use crate::render::png_data_uri;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone)]
struct CachedAsset {
    data_uri: String,
    created_at: Instant,
}

impl CachedAsset {
    fn is_fresh(&self, ttl: Duration) -> bool {
        Instant::now() <= self.created_at + ttl
    }
}

type Entries = Arc<RwLock<HashMap<String, CachedAsset>>>;

/// Rendered images kept in memory as PNG data URIs for a fixed time
///
/// Nothing is uploaded; an expired entry is re-rendered on next request.
pub struct TtlCache {
    ttl: Duration,
    entries: Entries,
    flights: SingleFlight<String>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
            flights: SingleFlight::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

async fn lookup_fresh(entries: &Entries, key: &str, ttl: Duration) -> Option<String> {
    entries
        .read()
        .await
        .get(key)
        .filter(|entry| entry.is_fresh(ttl))
        .map(|entry| entry.data_uri.clone())
}

#[async_trait]
impl AssetCache for TtlCache {
    async fn resolve(&self, key: &str, job: RenderJob) -> Result<String> {
        if let Some(data_uri) = lookup_fresh(&self.entries, key, self.ttl).await {
            debug!(key = %key, "Frame image cache hit");
            return Ok(data_uri);
        }

        let generation = render_and_store(Arc::clone(&self.entries), self.ttl, key.to_string(), job);
        self.flights.run(key, generation).await
    }
}

async fn render_and_store(entries: Entries, ttl: Duration, key: String, job: RenderJob) -> Result<String> {
    // Another generation may have finished since the first lookup
    if let Some(data_uri) = lookup_fresh(&entries, &key, ttl).await {
        return Ok(data_uri);
    }

    debug!(key = %key, "Frame image cache miss, rendering");
    let png = job.await?;
    let data_uri = png_data_uri(&png);

    let mut entries = entries.write().await;
    entries.retain(|_, entry| entry.is_fresh(ttl));
    entries.insert(
        key,
        CachedAsset {
            data_uri: data_uri.clone(),
            created_at: Instant::now(),
        },
    );
    Ok(data_uri)
}
