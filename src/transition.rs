//! Mood transition model.
//!
//! A fixed row-stochastic matrix: for each current mood, the probability of
//! each next mood. Built and validated once, read-only afterwards.

use crate::error::ConfigError;
use crate::mood::{Mood, MoodVector, SUM_TOLERANCE};
use std::collections::HashMap;

/// Raw `from -> to -> probability` table, the shape used by settings files.
pub type TransitionTable = HashMap<Mood, HashMap<Mood, f64>>;

/// Validated transition matrix indexed by [`Mood::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    rows: [MoodVector; Mood::COUNT],
}

/// Default transition weights, rows in [`Mood::ALL`] order, columns likewise
/// (happy, sad, energetic, calm, focused, relaxed).
const DEFAULT_ROWS: [[f64; Mood::COUNT]; Mood::COUNT] = [
    [0.60, 0.02, 0.20, 0.05, 0.10, 0.03],
    [0.03, 0.50, 0.02, 0.20, 0.10, 0.15],
    [0.25, 0.02, 0.50, 0.05, 0.15, 0.03],
    [0.10, 0.07, 0.03, 0.40, 0.15, 0.25],
    [0.10, 0.03, 0.15, 0.20, 0.45, 0.07],
    [0.10, 0.07, 0.03, 0.25, 0.15, 0.40],
];

impl TransitionModel {
    /// Build a model from a nested table, validating every row.
    ///
    /// Every mood needs a row, every row needs an entry for every mood, all
    /// entries must be finite and non-negative and each row must sum to 1.0.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found. Extra keys cannot occur
    /// because the table is keyed by [`Mood`].
    pub fn new(table: &TransitionTable) -> Result<Self, ConfigError> {
        let mut rows = [[0.0; Mood::COUNT]; Mood::COUNT];

        for from in Mood::ALL {
            let row = table.get(&from).ok_or(ConfigError::MissingRow(from))?;
            for to in Mood::ALL {
                let value = *row.get(&to).ok_or(ConfigError::MissingEntry { from, to })?;
                rows[from.index()][to.index()] = value;
            }
        }

        Self::from_rows(rows)
    }

    /// Build a model from a dense matrix in [`Mood::ALL`] order.
    ///
    /// # Errors
    ///
    /// Same validation as [`TransitionModel::new`].
    pub fn from_rows(rows: [[f64; Mood::COUNT]; Mood::COUNT]) -> Result<Self, ConfigError> {
        for from in Mood::ALL {
            let row = &rows[from.index()];
            for to in Mood::ALL {
                let value = row[to.index()];
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidProbability { from, to, value });
                }
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > SUM_TOLERANCE {
                return Err(ConfigError::RowSum { from, sum });
            }
        }

        log::debug!("Transition model validated ({} rows)", Mood::COUNT);
        Ok(Self {
            rows: rows.map(MoodVector::from_normalized),
        })
    }

    /// Next-mood distribution for `mood`.
    #[must_use]
    pub fn row(&self, mood: Mood) -> MoodVector {
        self.rows[mood.index()]
    }

    /// Probability of moving from `from` to `to`.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::mood::Mood;
    /// use moodmix::transition::TransitionModel;
    ///
    /// let model = TransitionModel::default();
    /// assert_eq!(model.score(Mood::Happy, Mood::Energetic), 0.2);
    /// ```
    #[must_use]
    pub fn score(&self, from: Mood, to: Mood) -> f64 {
        self.rows[from.index()].get(to)
    }

    /// Nested-table form of the matrix, the inverse of [`TransitionModel::new`].
    #[must_use]
    pub fn to_table(&self) -> TransitionTable {
        Mood::ALL
            .into_iter()
            .map(|from| (from, self.row(from).iter().collect()))
            .collect()
    }

    /// Long-run share of each mood when walking the chain, by power iteration.
    ///
    /// This is what the playlist walk drifts towards once the seed mood's
    /// influence has decayed.
    #[must_use]
    pub fn stationary_distribution(&self, iterations: usize) -> MoodVector {
        let mut current = MoodVector::uniform().values();
        for _ in 0..iterations {
            let mut next = [0.0; Mood::COUNT];
            for from in Mood::ALL {
                let weight = current[from.index()];
                for (to, p) in self.row(from).iter() {
                    next[to.index()] += weight * p;
                }
            }
            current = next;
        }
        MoodVector::from_raw(current)
    }
}

impl Default for TransitionModel {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS.map(MoodVector::from_normalized),
        }
    }
}
