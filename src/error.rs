//! Error types for the library layer.
//!
//! The binary and the sensing sources work in `anyhow::Result`; everything
//! below that boundary returns one of these so callers can tell an empty
//! playlist apart from an inconsistent library.

use crate::mood::Mood;
use thiserror::Error;

/// Invalid static configuration. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Transition matrix has no row for mood '{0}'")]
    MissingRow(Mood),
    #[error("Transition row '{from}' has no entry for mood '{to}'")]
    MissingEntry { from: Mood, to: Mood },
    #[error("Transition row '{from}' has invalid probability {value} for '{to}'")]
    InvalidProbability { from: Mood, to: Mood, value: f64 },
    #[error("Transition row '{from}' sums to {sum}, expected 1.0")]
    RowSum { from: Mood, sum: f64 },
    #[error("Unknown mood '{0}'")]
    UnknownMood(String),
    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Failures of the playlist operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaylistError {
    #[error("Playlist is empty")]
    EmptyPlaylist,
    #[error("Item '{0}' is not in the library")]
    UnknownItem(String),
    #[error("Requested {requested} items but the library only holds {available} distinct items")]
    InsufficientItems { requested: usize, available: usize },
    #[error("Gave up after {attempts} draws without a usable mood ({} of {target} items placed)", .partial.len())]
    Exhausted {
        attempts: usize,
        target: usize,
        partial: Vec<String>,
    },
}

/// Library persistence failures.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
