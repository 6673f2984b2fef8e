//! # Configuration Module
//!
//! This module handles settings and data directory setup for Moodmix.
//! It provides platform-appropriate data storage locations and ensures necessary
//! directories exist.
//!
//! ## Data Storage
//!
//! Moodmix keeps its files in the platform-standard data directory:
//! - Linux: `~/.local/share/moodmix/`
//! - macOS: `~/Library/Application Support/moodmix/`
//! - Windows: `%APPDATA%\moodmix\`
//!
//! Two files live there:
//! - `library.json`: the mood-partitioned library
//! - `config.json`: optional [`Settings`]; every field has a default

use crate::error::ConfigError;
use crate::playlist::{PlaylistConfig, PlaylistEngine};
use crate::state::DEFAULT_HISTORY_LIMIT;
use crate::transition::{TransitionModel, TransitionTable};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns the platform-appropriate data directory for Moodmix.
///
/// The `moodmix` subdirectory is created if it doesn't exist.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The moodmix subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    // Get platform-appropriate data directory
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    // Create moodmix subdirectory
    let moodmix_dir = data_dir.join("moodmix");
    fs::create_dir_all(&moodmix_dir).with_context(|| {
        format!(
            "Failed to create Moodmix data directory at {}. Please check file permissions.",
            moodmix_dir.display()
        )
    })?;

    Ok(moodmix_dir)
}

/// Path of the library file inside the data directory.
///
/// # Examples
///
/// ```no_run
/// use moodmix::config::get_library_path;
///
/// let library_path = get_library_path()?;
/// println!("Library location: {}", library_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_library_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.json"))
}

/// Path of the settings file inside the data directory.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// User-tunable settings, read from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Decay of the seed-mood belief per placed item.
    pub decay: f64,
    /// Consecutive unusable draws before `generate` gives up.
    pub max_attempts: usize,
    /// Playlist length when none is given on the command line.
    pub playlist_length: usize,
    /// Sensing loop tick in milliseconds.
    pub tick_ms: u64,
    /// Detector confidence needed to trust a face.
    pub min_face_confidence: f64,
    /// Mood changes kept in the history.
    pub history_limit: usize,
    /// Custom transition matrix; the built-in one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitions: Option<TransitionTable>,
}

impl Default for Settings {
    fn default() -> Self {
        let playlist = PlaylistConfig::default();
        Self {
            decay: playlist.decay,
            max_attempts: playlist.max_attempts,
            playlist_length: 10,
            tick_ms: 33,
            min_face_confidence: 0.5,
            history_limit: DEFAULT_HISTORY_LIMIT,
            transitions: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Check ranges that serde cannot.
    ///
    /// # Errors
    ///
    /// The first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.playlist_config().validate()?;
        if !(0.0..=1.0).contains(&self.min_face_confidence) {
            return Err(ConfigError::InvalidSetting {
                name: "min_face_confidence",
                reason: format!("{} is outside [0, 1]", self.min_face_confidence),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn playlist_config(&self) -> PlaylistConfig {
        PlaylistConfig {
            decay: self.decay,
            max_attempts: self.max_attempts,
        }
    }

    /// The configured transition model.
    ///
    /// # Errors
    ///
    /// A custom matrix that fails validation.
    pub fn transition_model(&self) -> Result<TransitionModel, ConfigError> {
        match &self.transitions {
            Some(table) => TransitionModel::new(table),
            None => Ok(TransitionModel::default()),
        }
    }

    /// Build the playlist engine these settings describe.
    ///
    /// # Errors
    ///
    /// Any configuration error; callers treat it as fatal.
    pub fn build_engine(&self) -> Result<PlaylistEngine, ConfigError> {
        self.validate()?;
        PlaylistEngine::new(self.transition_model()?, self.playlist_config())
    }

    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Locations of the files a run works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Path to the library file
    pub library_path: PathBuf,
    /// Path to the settings file
    pub settings_path: PathBuf,
}

impl RuntimeConfig {
    /// Use explicit paths where given, the data directory otherwise.
    ///
    /// The data directory is only touched when one of the paths is missing.
    ///
    /// # Errors
    ///
    /// Anything [`get_data_dir`] returns.
    pub fn resolve(library_path: Option<PathBuf>, settings_path: Option<PathBuf>) -> Result<Self> {
        let library_path = match library_path {
            Some(path) => path,
            None => get_library_path()?,
        };
        let settings_path = match settings_path {
            Some(path) => path,
            None => get_settings_path()?,
        };
        Ok(Self::with_paths(library_path, settings_path))
    }

    /// Create configuration with explicit paths, skipping the data directory
    #[must_use]
    pub fn with_paths(library_path: PathBuf, settings_path: PathBuf) -> Self {
        Self {
            library_path,
            settings_path,
        }
    }
}
