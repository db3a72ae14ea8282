use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type SharedOutcome<V> = Shared<BoxFuture<'static, std::result::Result<V, Arc<Error>>>>;

/// One in-flight computation per key
///
/// The first caller for a key spawns the work; later callers await the same
/// outcome. The work runs on its own task, so a caller that goes away does
/// not cancel it. The key is released once the work finishes, whether it
/// succeeded or not.
pub struct SingleFlight<V> {
    inflight: Arc<Mutex<HashMap<String, SharedOutcome<V>>>>,
}

impl<V> SingleFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the run already in flight.
    ///
    /// Anything the work writes before returning is visible to callers that
    /// arrive after the key is released.
    pub async fn run<F>(&self, key: &str, work: F) -> Result<V>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let outcome = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(key) {
                Some(existing) => {
                    debug!(key = %key, "Joining in-flight generation");
                    existing.clone()
                }
                None => {
                    let outcome = self.spawn(key.to_string(), work);
                    inflight.insert(key.to_string(), outcome.clone());
                    outcome
                }
            }
        };

        outcome.await.map_err(|e| Error::generation(key, e))
    }

    /// Number of keys currently in flight
    pub async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }

    fn spawn<F>(&self, key: String, work: F) -> SharedOutcome<V>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let registry = Arc::clone(&self.inflight);
        let task_key = key.clone();

        // Registry lock is held by `run` until the entry is inserted, so the
        // removal below cannot overtake the insertion.
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result.map_err(Arc::new),
                Err(_) => Err(Arc::new(Error::generation(&task_key, "generation panicked"))),
            };
            registry.lock().await.remove(&task_key);
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(Arc::new(Error::generation(&key, e))))
        }
        .boxed()
        .shared()
    }
}

impl<V> Default for SingleFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
