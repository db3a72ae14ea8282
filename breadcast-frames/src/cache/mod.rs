//! Frame image caches
//!
//! Both policies map an asset key to a URL the frame client can load, and
//! both run at most one generation per key at a time.

mod pin_once;
mod single_flight;
mod ttl;

pub use pin_once::PinOnceCache;
pub use single_flight::SingleFlight;
pub use ttl::TtlCache;

use crate::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;

/// Deferred rendering of one frame image; only polled on a cache miss
pub type RenderJob = BoxFuture<'static, Result<Vec<u8>>>;

#[async_trait]
pub trait AssetCache: Send + Sync {
    /// URL of the image for `key`, running `job` if it has to be produced
    async fn resolve(&self, key: &str, job: RenderJob) -> Result<String>;
}
