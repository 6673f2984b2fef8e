//! # Playlist Engine
//!
//! Builds and orders playlists from a mood-partitioned [`Library`] using a
//! [`TransitionModel`].
//!
//! ## Operations
//!
//! - [`PlaylistEngine::generate`]: weighted random walk over moods, one
//!   fresh item per step, with a decaying belief in the seed mood.
//! - [`PlaylistEngine::reorder`]: greedy nearest-neighbour sequencing of an
//!   existing playlist by transition score.
//! - [`PlaylistEngine::distribution`]: share of each mood in a playlist.
//!
//! ## Termination
//!
//! The walk redraws when the drawn mood has nothing left to offer. Requests
//! larger than the library's distinct item count are refused up front, and
//! consecutive empty draws are capped by [`PlaylistConfig::max_attempts`],
//! so `generate` always returns.

use crate::error::{ConfigError, PlaylistError};
use crate::library::Library;
use crate::mood::{Mood, MoodDistribution, MoodVector};
use crate::transition::TransitionModel;
use log::{debug, trace, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Tuning for the random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaylistConfig {
    /// Factor applied to the seed-mood belief after every placed item.
    pub decay: f64,
    /// Consecutive unusable mood draws tolerated before giving up.
    pub max_attempts: usize,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            decay: 0.9,
            max_attempts: 1000,
        }
    }
}

impl PlaylistConfig {
    /// # Errors
    ///
    /// `decay` must lie in `(0, 1]` and `max_attempts` must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(ConfigError::InvalidSetting {
                name: "decay",
                reason: format!("{} is outside (0, 1]", self.decay),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Playlist generator and reorderer over a fixed transition model.
#[derive(Debug, Clone, Default)]
pub struct PlaylistEngine {
    transitions: TransitionModel,
    config: PlaylistConfig,
}

impl PlaylistEngine {
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` is out of range.
    pub fn new(transitions: TransitionModel, config: PlaylistConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { transitions, config })
    }

    #[must_use]
    pub fn transitions(&self) -> &TransitionModel {
        &self.transitions
    }

    #[must_use]
    pub fn config(&self) -> &PlaylistConfig {
        &self.config
    }

    /// Next-mood distribution from `current` given the current belief.
    ///
    /// The transition row is scaled by `belief` and renormalized. If the
    /// scaled row no longer sums to anything usable (belief underflowed),
    /// the plain row is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::mood::Mood;
    /// use moodmix::playlist::PlaylistEngine;
    ///
    /// let engine = PlaylistEngine::default();
    /// let weights = engine.next_mood_weights(Mood::Happy, 1.0);
    /// assert_eq!(weights, engine.transitions().row(Mood::Happy));
    /// ```
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn next_mood_weights(&self, current: Mood, belief: f64) -> MoodVector {
        let row = self.transitions.row(current);
        if belief == 1.0 {
            return row;
        }

        let scaled = row.values().map(|p| p * belief);
        let total: f64 = scaled.iter().sum();

        if total.is_finite() && total > 0.0 {
            MoodVector::from_raw(scaled.map(|p| p / total))
        } else {
            trace!("Belief {belief} collapsed the row for '{current}', using raw row");
            row
        }
    }

    /// Generate `target_len` distinct items by a weighted random walk
    /// starting at `start`.
    ///
    /// Each step draws the next mood from [`Self::next_mood_weights`], then
    /// picks uniformly among that mood's items not yet in the playlist. A
    /// mood with nothing left is redrawn without moving the walk.
    ///
    /// # Errors
    ///
    /// - [`PlaylistError::InsufficientItems`] if the library holds fewer
    ///   distinct items than requested.
    /// - [`PlaylistError::Exhausted`] if `max_attempts` consecutive draws hit
    ///   exhausted moods; the partial playlist is returned inside the error.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        library: &Library,
        start: Mood,
        target_len: usize,
        rng: &mut R,
    ) -> Result<Vec<String>, PlaylistError> {
        if target_len == 0 {
            return Ok(Vec::new());
        }

        let available_total = library.distinct_items();
        if target_len > available_total {
            return Err(PlaylistError::InsufficientItems {
                requested: target_len,
                available: available_total,
            });
        }

        let mut playlist: Vec<String> = Vec::with_capacity(target_len);
        let mut placed: HashSet<String> = HashSet::with_capacity(target_len);
        let mut belief = 1.0_f64;
        let mut current = start;
        let mut failed_draws = 0_usize;

        while playlist.len() < target_len {
            let weights = self.next_mood_weights(current, belief);
            let next = sample_mood(&weights, rng);

            let mut seen = HashSet::new();
            let available: Vec<&String> = library
                .items(next)
                .iter()
                .filter(|item| !placed.contains(*item) && seen.insert(item.as_str()))
                .collect();

            let Some(&item) = available.choose(rng) else {
                failed_draws += 1;
                trace!("Mood '{next}' exhausted (draw {failed_draws})");
                if failed_draws >= self.config.max_attempts {
                    warn!(
                        "Stopping after {failed_draws} unusable draws with {}/{target_len} items",
                        playlist.len()
                    );
                    return Err(PlaylistError::Exhausted {
                        attempts: failed_draws,
                        target: target_len,
                        partial: playlist,
                    });
                }
                continue;
            };

            failed_draws = 0;
            trace!("'{current}' -> '{next}': {item}");
            placed.insert(item.clone());
            playlist.push(item.clone());
            current = next;
            belief *= self.config.decay;
        }

        debug!("Generated {} items starting from '{start}'", playlist.len());
        Ok(playlist)
    }

    /// Generate, then smooth the result with [`Self::reorder`].
    ///
    /// # Errors
    ///
    /// Anything [`Self::generate`] returns.
    pub fn generate_smooth<R: Rng + ?Sized>(
        &self,
        library: &Library,
        start: Mood,
        target_len: usize,
        rng: &mut R,
    ) -> Result<Vec<String>, PlaylistError> {
        let playlist = self.generate(library, start, target_len, rng)?;
        if playlist.is_empty() {
            return Ok(playlist);
        }
        self.reorder(&playlist, library)
    }

    /// Reorder `playlist` so consecutive moods follow likely transitions.
    ///
    /// The first item stays first. Each following slot takes the remaining
    /// item whose mood scores highest from the previous item's mood; ties go
    /// to the item that came earlier in the input. Greedy, O(n²).
    ///
    /// # Errors
    ///
    /// [`PlaylistError::EmptyPlaylist`] for empty input,
    /// [`PlaylistError::UnknownItem`] if an item has no mood in `library`.
    pub fn reorder(&self, playlist: &[String], library: &Library) -> Result<Vec<String>, PlaylistError> {
        if playlist.is_empty() {
            return Err(PlaylistError::EmptyPlaylist);
        }
        let moods = resolve_moods(playlist, library)?;

        let mut ordered = Vec::with_capacity(playlist.len());
        ordered.push(playlist[0].clone());
        let mut last_mood = moods[0];
        let mut remaining: Vec<usize> = (1..playlist.len()).collect();

        while !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_score = self.transitions.score(last_mood, moods[remaining[0]]);
            for (pos, &idx) in remaining.iter().enumerate().skip(1) {
                let score = self.transitions.score(last_mood, moods[idx]);
                if score > best_score {
                    best_pos = pos;
                    best_score = score;
                }
            }

            let idx = remaining.remove(best_pos);
            ordered.push(playlist[idx].clone());
            last_mood = moods[idx];
        }

        Ok(ordered)
    }

    /// Fraction of `playlist` belonging to each mood.
    ///
    /// # Errors
    ///
    /// [`PlaylistError::EmptyPlaylist`] for empty input,
    /// [`PlaylistError::UnknownItem`] if an item has no mood in `library`.
    #[allow(clippy::cast_precision_loss)]
    pub fn distribution(&self, playlist: &[String], library: &Library) -> Result<MoodDistribution, PlaylistError> {
        if playlist.is_empty() {
            return Err(PlaylistError::EmptyPlaylist);
        }

        let mut counts = [0_usize; Mood::COUNT];
        for mood in resolve_moods(playlist, library)? {
            counts[mood.index()] += 1;
        }

        let total = playlist.len() as f64;
        Ok(MoodVector::from_normalized(counts.map(|c| c as f64 / total)))
    }

    /// Mean transition score between consecutive items. Higher is smoother.
    ///
    /// # Errors
    ///
    /// Same as [`Self::distribution`].
    #[allow(clippy::cast_precision_loss)]
    pub fn smoothness(&self, playlist: &[String], library: &Library) -> Result<f64, PlaylistError> {
        if playlist.is_empty() {
            return Err(PlaylistError::EmptyPlaylist);
        }
        let moods = resolve_moods(playlist, library)?;
        if moods.len() < 2 {
            return Ok(1.0);
        }

        let total: f64 = moods
            .windows(2)
            .map(|pair| self.transitions.score(pair[0], pair[1]))
            .sum();
        Ok(total / (moods.len() - 1) as f64)
    }
}

/// Weighted draw of one mood. Falls back to the arg-max if the weights are
/// unusable for sampling.
fn sample_mood<R: Rng + ?Sized>(weights: &MoodVector, rng: &mut R) -> Mood {
    match WeightedIndex::new(weights.values()) {
        Ok(dist) => Mood::ALL[dist.sample(rng)],
        Err(e) => {
            warn!("Cannot sample from {weights}: {e}");
            weights.argmax()
        }
    }
}

/// Mood of every item, in order.
fn resolve_moods(playlist: &[String], library: &Library) -> Result<Vec<Mood>, PlaylistError> {
    playlist
        .iter()
        .map(|item| {
            library
                .mood_of(item)
                .ok_or_else(|| PlaylistError::UnknownItem(item.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_library() -> Library {
        Library::from_entries([(Mood::Happy, vec!["A", "B"]), (Mood::Sad, vec!["C"])])
    }

    fn big_library() -> Library {
        Library::from_entries(Mood::ALL.into_iter().map(|mood| {
            let items: Vec<String> = (0..10).map(|i| format!("{mood}/{i:02}.mp3")).collect();
            (mood, items)
        }))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn sorted(mut items: Vec<String>) -> Vec<String> {
        items.sort();
        items
    }

    #[test]
    fn test_weights_with_full_belief_equal_row() {
        let engine = PlaylistEngine::default();
        let weights = engine.next_mood_weights(Mood::Happy, 1.0);
        assert_eq!(weights.get(Mood::Happy), 0.6);
        assert_eq!(weights.get(Mood::Energetic), 0.2);
        assert_eq!(weights.get(Mood::Focused), 0.1);
        assert_eq!(weights.get(Mood::Calm), 0.05);
        assert_eq!(weights.get(Mood::Relaxed), 0.03);
        assert_eq!(weights.get(Mood::Sad), 0.02);
    }

    #[test]
    fn test_weights_stay_normalized_as_belief_decays() {
        let engine = PlaylistEngine::default();
        let mut belief = 1.0;
        for _ in 0..50 {
            assert!(engine.next_mood_weights(Mood::Calm, belief).is_normalized());
            belief *= 0.9;
        }
        // Underflowed belief falls back to the raw row.
        assert_eq!(engine.next_mood_weights(Mood::Calm, 0.0), engine.transitions().row(Mood::Calm));
    }

    #[test]
    fn test_small_library_generates_permutation() {
        let engine = PlaylistEngine::default();
        let library = small_library();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let playlist = engine.generate(&library, Mood::Happy, 3, &mut rng).unwrap();
            assert_eq!(sorted(playlist), strings(&["A", "B", "C"]));
        }
    }

    #[test]
    fn test_generate_returns_distinct_items_of_requested_length() {
        let engine = PlaylistEngine::default();
        let library = big_library();
        let mut rng = StdRng::seed_from_u64(42);

        for len in [1, 5, 20, 60] {
            let playlist = engine.generate(&library, Mood::Focused, len, &mut rng).unwrap();
            assert_eq!(playlist.len(), len);
            let unique: HashSet<_> = playlist.iter().collect();
            assert_eq!(unique.len(), len, "items must be pairwise distinct");
            assert!(playlist.iter().all(|item| library.mood_of(item).is_some()));
        }
    }

    #[test]
    fn test_generate_is_reproducible_with_seed() {
        let engine = PlaylistEngine::default();
        let library = big_library();
        let a = engine.generate(&library, Mood::Sad, 15, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = engine.generate(&library, Mood::Sad, 15, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_handles_duplicates_across_and_within_moods() {
        let engine = PlaylistEngine::default();
        let library = Library::from_entries([
            (Mood::Happy, vec!["x", "x", "y"]),
            (Mood::Calm, vec!["y", "z"]),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let playlist = engine.generate(&library, Mood::Calm, 3, &mut rng).unwrap();
        assert_eq!(sorted(playlist), strings(&["x", "y", "z"]));
    }

    #[test]
    fn test_generate_zero_length() {
        let engine = PlaylistEngine::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(engine.generate(&Library::new(), Mood::Happy, 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_generate_refuses_oversized_request() {
        let engine = PlaylistEngine::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            engine.generate(&small_library(), Mood::Happy, 4, &mut rng),
            Err(PlaylistError::InsufficientItems { requested: 4, available: 3 })
        );
    }

    #[test]
    fn test_generate_gives_up_on_unreachable_moods() {
        // Happy only ever leads back to happy, so "C" can never be reached.
        let mut rows = [[0.0; Mood::COUNT]; Mood::COUNT];
        for mood in Mood::ALL {
            rows[mood.index()][mood.index()] = 1.0;
        }
        let transitions = TransitionModel::from_rows(rows).unwrap();
        let config = PlaylistConfig { max_attempts: 25, ..PlaylistConfig::default() };
        let engine = PlaylistEngine::new(transitions, config).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        match engine.generate(&small_library(), Mood::Happy, 3, &mut rng) {
            Err(PlaylistError::Exhausted { attempts, target, partial }) => {
                assert_eq!(attempts, 25);
                assert_eq!(target, 3);
                assert_eq!(sorted(partial), strings(&["A", "B"]));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let bad_decay = PlaylistConfig { decay: 1.5, ..PlaylistConfig::default() };
        assert!(PlaylistEngine::new(TransitionModel::default(), bad_decay).is_err());

        let no_attempts = PlaylistConfig { max_attempts: 0, ..PlaylistConfig::default() };
        assert!(PlaylistEngine::new(TransitionModel::default(), no_attempts).is_err());
    }

    #[test]
    fn test_reorder_follows_best_transitions() {
        let engine = PlaylistEngine::default();
        let library = Library::from_entries([
            (Mood::Happy, vec!["h1", "h2"]),
            (Mood::Sad, vec!["s1"]),
            (Mood::Energetic, vec!["e1"]),
            (Mood::Calm, vec!["c1"]),
        ]);

        // From sad the best step is sad itself (none left), then calm (0.2).
        // Calm -> happy (0.1) beats energetic (0.03); happy -> happy (0.6);
        // then energetic is the only one left.
        let input = strings(&["s1", "e1", "h1", "c1", "h2"]);
        let ordered = engine.reorder(&input, &library).unwrap();
        assert_eq!(ordered, strings(&["s1", "c1", "h1", "h2", "e1"]));
    }

    #[test]
    fn test_reorder_ties_keep_input_order() {
        let engine = PlaylistEngine::default();
        let library = Library::from_entries([(Mood::Focused, vec!["f1", "f2", "f3"])]);
        let input = strings(&["f2", "f3", "f1"]);
        assert_eq!(engine.reorder(&input, &library).unwrap(), input);
    }

    #[test]
    fn test_reorder_is_permutation() {
        let engine = PlaylistEngine::default();
        let library = big_library();
        let mut rng = StdRng::seed_from_u64(5);
        let playlist = engine.generate(&library, Mood::Relaxed, 30, &mut rng).unwrap();

        let ordered = engine.reorder(&playlist, &library).unwrap();
        assert_eq!(ordered[0], playlist[0]);
        assert_eq!(sorted(ordered), sorted(playlist));
    }

    #[test]
    fn test_reorder_keeps_duplicate_entries() {
        let engine = PlaylistEngine::default();
        let library = small_library();
        let input = strings(&["C", "A", "C"]);
        let ordered = engine.reorder(&input, &library).unwrap();
        assert_eq!(sorted(ordered), strings(&["A", "C", "C"]));
    }

    #[test]
    fn test_reorder_errors() {
        let engine = PlaylistEngine::default();
        let library = small_library();
        assert_eq!(engine.reorder(&[], &library), Err(PlaylistError::EmptyPlaylist));
        assert_eq!(
            engine.reorder(&strings(&["A", "nope"]), &library),
            Err(PlaylistError::UnknownItem("nope".to_string()))
        );
    }

    #[test]
    fn test_distribution_counts_moods() {
        let engine = PlaylistEngine::default();
        let library = small_library();
        let distribution = engine.distribution(&strings(&["A", "B", "C", "A"]), &library).unwrap();
        assert!(distribution.is_normalized());
        assert!((distribution.get(Mood::Happy) - 0.75).abs() < 1e-12);
        assert!((distribution.get(Mood::Sad) - 0.25).abs() < 1e-12);
        assert_eq!(distribution.get(Mood::Calm), 0.0);
    }

    #[test]
    fn test_distribution_errors() {
        let engine = PlaylistEngine::default();
        let library = small_library();
        assert_eq!(engine.distribution(&[], &library), Err(PlaylistError::EmptyPlaylist));
        assert!(matches!(
            engine.distribution(&strings(&["Z"]), &library),
            Err(PlaylistError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_reorder_is_smoother_than_shuffle() {
        let engine = PlaylistEngine::default();
        let library = big_library();
        let mut rng = StdRng::seed_from_u64(11);
        let mut playlist = engine.generate(&library, Mood::Happy, 40, &mut rng).unwrap();
        playlist.shuffle(&mut rng);

        let before = engine.smoothness(&playlist, &library).unwrap();
        let ordered = engine.reorder(&playlist, &library).unwrap();
        let after = engine.smoothness(&ordered, &library).unwrap();
        assert!(after >= before, "greedy order ({after}) should beat a shuffle ({before})");
    }
}
