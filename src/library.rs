//! # Mood Library
//!
//! The catalog of playable items partitioned by mood. Items are opaque
//! strings (normally absolute file paths). The same item may be filed under
//! several moods; lookups resolve it to the first such mood in
//! [`Mood::ALL`] order.
//!
//! ## Persistence
//!
//! The library is stored as one JSON object with a key per mood:
//!
//! ```json
//! { "happy": ["/music/a.mp3"], "sad": [], "energetic": [], "calm": [], "focused": [], "relaxed": [] }
//! ```
//!
//! Loading tolerates missing moods, saving always writes all of them.

use crate::error::LibraryError;
use crate::mood::Mood;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Mood-partitioned catalog of item identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Mood, Vec<String>>", into = "BTreeMap<Mood, Vec<String>>")]
pub struct Library {
    items: [Vec<String>; Mood::COUNT],
}

impl From<BTreeMap<Mood, Vec<String>>> for Library {
    fn from(mut map: BTreeMap<Mood, Vec<String>>) -> Self {
        let mut library = Self::default();
        for mood in Mood::ALL {
            if let Some(items) = map.remove(&mood) {
                library.items[mood.index()] = items;
            }
        }
        library
    }
}

impl From<Library> for BTreeMap<Mood, Vec<String>> {
    fn from(library: Library) -> Self {
        Mood::ALL.into_iter().zip(library.items).collect()
    }
}

impl Library {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from `(mood, items)` pairs. Later pairs for the same
    /// mood are appended.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Mood, Vec<S>)>,
        S: Into<String>,
    {
        let mut library = Self::default();
        for (mood, items) in entries {
            library.items[mood.index()].extend(items.into_iter().map(Into::into));
        }
        library
    }

    /// Load a library from a JSON file. A missing file is an empty library.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] if the file cannot be read, is not valid
    /// JSON or names a mood outside the vocabulary.
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        if !path.exists() {
            debug!("No library at {}, starting empty", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        let library: Self = serde_json::from_str(&text)?;
        info!(
            "Loaded library from {} ({} items)",
            path.display(),
            library.len()
        );
        Ok(library)
    }

    /// Write the library as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] on filesystem or serialization failure.
    pub fn save(&self, path: &Path) -> Result<(), LibraryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        debug!("Saved library to {}", path.display());
        Ok(())
    }

    /// Append `items` under `mood`, skipping ones already listed there.
    /// Returns how many were added.
    pub fn add_items<I, S>(&mut self, mood: Mood, items: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = &mut self.items[mood.index()];
        let before = list.len();
        for item in items {
            let item = item.into();
            if !list.contains(&item) {
                list.push(item);
            }
        }
        let added = list.len() - before;
        debug!("Added {added} items to '{mood}'");
        added
    }

    /// Items filed under `mood`, in insertion order.
    #[must_use]
    pub fn items(&self, mood: Mood) -> &[String] {
        &self.items[mood.index()]
    }

    /// The mood an item belongs to: the first mood in enumeration order that
    /// lists it.
    #[must_use]
    pub fn mood_of(&self, item: &str) -> Option<Mood> {
        Mood::ALL
            .into_iter()
            .find(|mood| self.items(*mood).iter().any(|candidate| candidate == item))
    }

    /// The first item under `mood`, what a plain "play next" picks.
    #[must_use]
    pub fn next_for(&self, mood: Mood) -> Option<&str> {
        self.items(mood).first().map(String::as_str)
    }

    /// Number of distinct items across all moods.
    #[must_use]
    pub fn distinct_items(&self) -> usize {
        self.items
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Total number of entries, counting duplicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(Vec::is_empty)
    }

    /// The mood with the most entries; ties go to the earlier mood.
    /// `None` for an empty library.
    #[must_use]
    pub fn largest_mood(&self) -> Option<Mood> {
        let mut best: Option<(Mood, usize)> = None;
        for (mood, items) in self.iter() {
            if items.len() > best.map_or(0, |(_, n)| n) {
                best = Some((mood, items.len()));
            }
        }
        best.map(|(mood, _)| mood)
    }

    /// `(mood, items)` in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Mood, &[String])> + '_ {
        Mood::ALL.into_iter().map(move |mood| (mood, self.items(mood)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_library() -> Library {
        Library::from_entries([
            (Mood::Happy, vec!["a.mp3", "b.mp3"]),
            (Mood::Sad, vec!["c.mp3"]),
            (Mood::Calm, vec!["b.mp3", "d.mp3"]),
        ])
    }

    #[test]
    fn test_largest_mood() {
        assert_eq!(sample_library().largest_mood(), Some(Mood::Happy));
        assert_eq!(Library::new().largest_mood(), None);

        let library = Library::from_entries([(Mood::Sad, vec!["x"]), (Mood::Focused, vec!["y", "z"])]);
        assert_eq!(library.largest_mood(), Some(Mood::Focused));
    }

    #[test]
    fn test_mood_of_prefers_enumeration_order() {
        let library = sample_library();
        assert_eq!(library.mood_of("b.mp3"), Some(Mood::Happy));
        assert_eq!(library.mood_of("d.mp3"), Some(Mood::Calm));
        assert_eq!(library.mood_of("missing.mp3"), None);
    }

    #[test]
    fn test_counts_handle_duplicates() {
        let library = sample_library();
        assert_eq!(library.len(), 5);
        assert_eq!(library.distinct_items(), 4);
        assert!(!library.is_empty());
        assert!(Library::new().is_empty());
    }

    #[test]
    fn test_add_items_skips_existing() {
        let mut library = sample_library();
        let added = library.add_items(Mood::Happy, ["a.mp3", "e.mp3", "e.mp3"]);
        assert_eq!(added, 1);
        assert_eq!(library.items(Mood::Happy), ["a.mp3", "b.mp3", "e.mp3"]);
    }

    #[test]
    fn test_next_for_returns_first_item() {
        let library = sample_library();
        assert_eq!(library.next_for(Mood::Calm), Some("b.mp3"));
        assert_eq!(library.next_for(Mood::Focused), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("library.json");

        let library = sample_library();
        library.save(&path).unwrap();
        let loaded = Library::load(&path).unwrap();

        assert_eq!(library, loaded);
    }

    #[test]
    fn test_saved_file_lists_every_mood() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.json");
        Library::new().save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for mood in Mood::ALL {
            assert!(value.get(mood.name()).is_some(), "missing key {mood}");
        }
    }

    #[test]
    fn test_load_tolerates_missing_moods() {
        let library: Library = serde_json::from_str(r#"{"sad": ["x"]}"#).unwrap();
        assert_eq!(library.items(Mood::Sad), ["x"]);
        assert!(library.items(Mood::Happy).is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_mood() {
        let result: Result<Library, _> = serde_json::from_str(r#"{"angry": ["x"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let library = Library::load(&temp_dir.path().join("nope.json")).unwrap();
        assert!(library.is_empty());
    }
}
