//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::AssetId;

/// Errors that can occur while fetching or decoding a model payload.
#[derive(Error, Debug)]
pub enum LoadError {
    /// File could not be read.
    #[error("IO error reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File format could not be determined from the extension.
    #[error("Unknown model format: '{0}'")]
    UnknownFormat(String),

    /// The payload was invalid or corrupt.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failure reported by a caller-supplied load routine.
    #[error("{0}")]
    Custom(String),
}

/// Errors surfaced by the stage and the application shell.
#[derive(Error, Debug)]
pub enum SceneError {
    /// A resource failed to load during the load phase.
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// An asset handle did not belong to this stage.
    #[error("Unknown asset {0:?}")]
    UnknownAsset(AssetId),

    /// A lifecycle step was requested from the wrong shell state.
    #[error("Invalid shell state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SceneError> = std::result::Result<T, E>;
