use super::{gateway_url, ObjectStore};
use crate::cid::v0_for_bytes;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory object store
///
/// Identifiers are derived from content, so putting the same bytes twice
/// yields the same identifier. Counts uploads for assertions in tests.
pub struct MemoryObjectStore {
    gateway: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            objects: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Insert bytes directly, bypassing the upload counter
    pub fn insert(&self, bytes: Vec<u8>) -> String {
        let id = v0_for_bytes(&bytes);
        self.lock().insert(id.clone(), bytes);
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, _name: &str, bytes: Vec<u8>) -> Result<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(self.insert(bytes))
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object {}", id)))
    }

    async fn list(&self) -> Result<BTreeSet<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.lock().remove(id);
        Ok(())
    }

    fn url_for(&self, id: &str) -> String {
        gateway_url(&self.gateway, id)
    }
}
