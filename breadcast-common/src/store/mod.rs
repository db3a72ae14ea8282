//! Content-addressed object store capability
//!
//! Production uses the Pinata pinning API for writes and an IPFS gateway for
//! reads. Without pinning credentials only the gateway is available. Tests use
//! the in-memory store.

mod gateway;
mod memory;
mod pinata;

pub use gateway::GatewayObjectStore;
pub use memory::MemoryObjectStore;
pub use pinata::PinataObjectStore;

use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Put/get/list/delete over content identifiers
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under a human-readable `name`, returning the content identifier
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String>;

    /// Fetch the bytes behind a content identifier
    async fn get(&self, id: &str) -> Result<Vec<u8>>;

    /// Every identifier currently pinned
    async fn list(&self) -> Result<BTreeSet<String>>;

    /// Unpin an identifier
    async fn delete(&self, id: &str) -> Result<()>;

    /// Public URL under which `id` can be fetched
    fn url_for(&self, id: &str) -> String;
}

/// `{gateway}/ipfs/{id}`
pub fn gateway_url(gateway: &str, id: &str) -> String {
    format!("{}/ipfs/{}", gateway.trim_end_matches('/'), id)
}
