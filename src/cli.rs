//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Moodmix using Clap derive macros.
//! It provides a type-safe way to parse command-line arguments and route them to
//! appropriate functionality.
//!
//! ## Commands
//!
//! - `add`: File items under a mood in the library
//! - `list`: Show the library, mood by mood
//! - `generate`: Walk the transition matrix to build a playlist
//! - `reorder`: Smooth an existing playlist
//! - `distribution`: Mood shares of a playlist
//! - `classify`: Score one set of audio features
//! - `tag`: Classify a features file and file every item under its mood
//! - `detect`: Run the face-gated classifier on a grayscale PGM frame
//! - `watch`: Replay a features file through the sensing loop, then generate
//!
//! ## Examples
//!
//! ```bash
//! moodmix add happy ~/Music/sunny.flac ~/Music/upbeat.mp3
//! moodmix generate --mood calm --length 12 --reorder
//! moodmix watch session.json --seed 7
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// The library location defaults to the platform data directory; `--library`
/// overrides it for every subcommand.
#[derive(Parser, Debug)]
#[command(name = "moodmix")]
#[command(about = "Moodmix: mood-aware playlists from a Markov walk over moods")]
#[command(version)]
pub struct Args {
    /// Library file to use instead of the one in the data directory
    #[arg(long, global = true, env = "MOODMIX_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Settings file to use instead of the one in the data directory
    #[arg(long, global = true, env = "MOODMIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add items to the library under a mood
    ///
    /// Paths are stored in absolute form. An item already filed under the
    /// same mood is skipped.
    Add {
        /// Mood to file the items under (happy, sad, energetic, calm, focused, relaxed)
        mood: String,

        /// Items to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the library, mood by mood
    List,

    /// Generate a playlist
    ///
    /// Starts from `--mood`, or from the mood that owns the most items when
    /// omitted, and walks the transition matrix until `--length` distinct
    /// items are placed.
    Generate {
        /// Starting mood
        #[arg(long)]
        mood: Option<String>,

        /// Number of items; the configured playlist length when omitted
        #[arg(long)]
        length: Option<usize>,

        /// Seed for a reproducible playlist
        #[arg(long)]
        seed: Option<u64>,

        /// Smooth the result with the greedy reorder
        #[arg(long)]
        reorder: bool,
    },

    /// Reorder items so consecutive moods flow smoothly
    Reorder {
        /// Items in their current order
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Print the mood distribution of a playlist
    Distribution {
        /// Items of the playlist
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Classify one set of audio features
    Classify {
        /// Tempo in beats per minute
        #[arg(long)]
        tempo: f64,

        /// RMS energy
        #[arg(long)]
        energy: f64,

        /// Spectral centroid in Hz
        #[arg(long, default_value_t = 0.0)]
        centroid: f64,

        /// Spectral rolloff in Hz
        #[arg(long, default_value_t = 0.0)]
        rolloff: f64,
    },

    /// Classify every item of a features file and add it to the library
    ///
    /// The file maps item paths to `{ "tempo": .., "energy": .. }` objects.
    Tag {
        /// Features file (JSON)
        features: PathBuf,
    },

    /// Run the face-gated classifier on a binary PGM (P5) frame
    Detect {
        /// Frame file
        frame: PathBuf,

        /// Seed for the emotion model
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replay recorded features through the sensing loop, then generate
    ///
    /// Each entry is one reading. When the replay ends, a playlist is
    /// generated from the last detected mood.
    Watch {
        /// Features file (JSON array, or object whose values are read in key order)
        features: PathBuf,

        /// Seed for a reproducible playlist
        #[arg(long)]
        seed: Option<u64>,

        /// Number of items; the configured playlist length when omitted
        #[arg(long)]
        length: Option<usize>,
    },

    /// Generate shell completions
    ///
    /// Generates completion scripts for various shells to enable tab completion
    /// of commands and options.
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List library items for shell completion (hidden command)
    #[command(hide = true)]
    CompleteItems {
        /// Format for this shell
        #[arg(long)]
        shell: Option<Shell>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let args = Args::try_parse_from([
            "moodmix", "generate", "--mood", "calm", "--length", "5", "--seed", "3", "--reorder",
        ])
        .unwrap();
        match args.command {
            Command::Generate { mood, length, seed, reorder } => {
                assert_eq!(mood.as_deref(), Some("calm"));
                assert_eq!(length, Some(5));
                assert_eq!(seed, Some(3));
                assert!(reorder);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_library_flag_after_subcommand() {
        let args = Args::try_parse_from(["moodmix", "list", "--library", "/tmp/lib.json"]).unwrap();
        assert_eq!(args.library, Some(PathBuf::from("/tmp/lib.json")));
    }

    #[test]
    fn test_add_requires_paths() {
        assert!(Args::try_parse_from(["moodmix", "add", "happy"]).is_err());
    }

    #[test]
    fn test_classify_optional_spectral_features() {
        let args = Args::try_parse_from(["moodmix", "classify", "--tempo", "120", "--energy", "0.6"]).unwrap();
        match args.command {
            Command::Classify { tempo, energy, centroid, rolloff } => {
                assert_eq!(tempo, 120.0);
                assert_eq!(energy, 0.6);
                assert_eq!(centroid, 0.0);
                assert_eq!(rolloff, 0.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
