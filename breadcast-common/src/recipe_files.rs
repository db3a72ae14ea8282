//! Recipe set files on disk
//!
//! `recipes.json` and `rendered-recipes.json` are written by the admin tool and
//! only ever read by the frame server, which keeps a snapshot and re-reads the
//! file on a fixed interval.

use crate::model::{RecipeSet, RenderedRecipeSet};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Read a JSON file, treating a missing file as the empty value
pub async fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} does not exist yet, starting empty", path.display());
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn load_recipe_set(path: &Path) -> Result<RecipeSet> {
    load_json_or_default(path).await
}

pub async fn load_rendered_recipe_set(path: &Path) -> Result<RenderedRecipeSet> {
    load_json_or_default(path).await
}

/// Write pretty JSON through a temporary sibling file and rename it into place,
/// so a concurrent reader never sees a half-written file.
pub async fn save_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Periodically re-read JSON snapshot of a file
///
/// Readers always get a complete snapshot. A reload that fails keeps the
/// previous snapshot.
pub struct ReloadingFile<T> {
    path: PathBuf,
    snapshot: RwLock<Arc<T>>,
}

impl<T> ReloadingFile<T>
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
{
    /// Load the initial snapshot. A missing file starts empty; a malformed one
    /// is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let path = path.into();
        let initial = load_json_or_default::<T>(&path).await?;
        info!("Loaded {}", path.display());

        Ok(Arc::new(Self {
            path,
            snapshot: RwLock::new(Arc::new(initial)),
        }))
    }

    /// Wrap an in-memory value; `reload` reads from `path` as usual.
    pub fn from_value(path: impl Into<PathBuf>, value: T) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            snapshot: RwLock::new(Arc::new(value)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Arc<T> {
        self.snapshot.read().await.clone()
    }

    /// Re-read the file and swap the snapshot in
    pub async fn reload(&self) -> Result<()> {
        let fresh = load_json_or_default::<T>(&self.path).await?;
        *self.snapshot.write().await = Arc::new(fresh);
        debug!("Reloaded {}", self.path.display());
        Ok(())
    }

    /// Reload every `interval` until the returned task is aborted
    pub fn spawn_reloader(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let file = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately; the snapshot is already fresh
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = file.reload().await {
                    warn!("Keeping previous snapshot of {}: {}", file.path.display(), e);
                }
            }
        })
    }
}
