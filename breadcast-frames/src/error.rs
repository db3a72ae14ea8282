//! Error types for breadcast-frames

use thiserror::Error;

/// Main error type for the frame service
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from shared code (store, config, files)
    #[error(transparent)]
    Common(#[from] breadcast_common::Error),

    /// Unknown or malformed recipe identifier
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// Producing a frame image failed
    #[error("Frame generation failed for {key}: {reason}")]
    Generation { key: String, reason: String },

    /// Rasterizing a page failed
    #[error("Render error: {0}")]
    Render(String),
}

impl Error {
    pub fn generation(key: &str, reason: impl std::fmt::Display) -> Self {
        Error::Generation {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience Result type using the frame service Error
pub type Result<T> = std::result::Result<T, Error>;
