//! Mood-aware playlists from a Markov walk over moods.
//!
//! Core modules:
//! - [`mood`] - The six moods and normalized mood vectors
//! - [`classifier`] - Mood classifiers (face-gated visual, audio features)
//! - [`transition`] - Mood-to-mood transition matrix
//! - [`playlist`] - Playlist generation, reordering and distribution
//! - [`library`] - Mood-partitioned item catalog with JSON persistence
//! - [`state`] - Shared current-mood cell with bounded history
//! - [`sensor`] - Background sensing loop feeding the shared state
//!
//! ### Supporting Modules
//!
//! - [`config`] - Settings file and data directory management
//! - [`error`] - Typed errors of the library layer
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use moodmix::classifier::{AudioFeatureClassifier, AudioFeatures, MoodClassifier};
//! use moodmix::library::Library;
//! use moodmix::mood::Mood;
//! use moodmix::playlist::PlaylistEngine;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let library = Library::from_entries([
//!     (Mood::Happy, vec!["sunny.mp3", "upbeat.mp3"]),
//!     (Mood::Energetic, vec!["sprint.mp3"]),
//!     (Mood::Calm, vec!["rain.mp3"]),
//! ]);
//!
//! // Classify what is playing right now
//! let vector = AudioFeatureClassifier::default().classify(&AudioFeatures::new(115.0, 0.6));
//! assert_eq!(vector.argmax(), Mood::Happy);
//!
//! // Walk the transition matrix from there
//! let engine = PlaylistEngine::default();
//! let mut rng = StdRng::seed_from_u64(42);
//! let playlist = engine.generate(&library, vector.argmax(), 3, &mut rng)?;
//! assert_eq!(playlist.len(), 3);
//!
//! let ordered = engine.reorder(&playlist, &library)?;
//! assert_eq!(ordered[0], playlist[0]);
//! # Ok::<(), moodmix::error::PlaylistError>(())
//! ```
//!
//! ## Generation
//!
//! Each step draws the next mood from the current mood's row of the
//! transition matrix, then picks an unused item of that mood uniformly.
//! Draws that land on an exhausted mood are retried, up to
//! [`playlist::PlaylistConfig::max_attempts`] in a row.
//!
//! ## Sensing
//!
//! A [`sensor::SensingLoop`] classifies samples on its own thread and
//! publishes complete snapshots to a [`state::MoodState`]; playlist code
//! reads the latest mood whenever it needs one.
//!
//! ## Error Handling
//!
//! Library operations return the typed errors in [`error`]. The binary works
//! in `anyhow::Result` and adds context at each boundary.

pub mod classifier;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod library;
pub mod mood;
pub mod playlist;
pub mod sensor;
pub mod state;
pub mod transition;
