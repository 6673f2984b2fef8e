//! The mood vocabulary and probability vectors over it.
//!
//! Every vector is indexed by [`Mood::ALL`] order, so a vector can never be
//! missing a key. That order is also the tie-break order for [`MoodVector::argmax`].

use crate::error::ConfigError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Tolerance used when checking that a vector or matrix row sums to one.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// One label of the fixed emotional-state vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Energetic,
    Calm,
    Focused,
    Relaxed,
}

impl Mood {
    /// Number of moods in the vocabulary.
    pub const COUNT: usize = 6;

    /// Enumeration order. Matrix rows/columns and tie-breaks follow it.
    pub const ALL: [Mood; Mood::COUNT] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Energetic,
        Mood::Calm,
        Mood::Focused,
        Mood::Relaxed,
    ];

    /// Position of this mood in [`Mood::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Mood::Happy => 0,
            Mood::Sad => 1,
            Mood::Energetic => 2,
            Mood::Calm => 3,
            Mood::Focused => 4,
            Mood::Relaxed => 5,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Energetic => "energetic",
            Mood::Calm => "calm",
            Mood::Focused => "focused",
            Mood::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Mood {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownMood(s.to_string()))
    }
}

/// Non-negative weight per mood. Normalized whenever a classifier or the
/// transition model hands one out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodVector([f64; Mood::COUNT]);

/// Fraction of a playlist's items that belong to each mood.
pub type MoodDistribution = MoodVector;

impl MoodVector {
    /// Every mood weighted `1 / Mood::COUNT`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform() -> Self {
        Self([1.0 / Mood::COUNT as f64; Mood::COUNT])
    }

    /// Wrap weights that are already known to be a distribution.
    pub(crate) const fn from_normalized(values: [f64; Mood::COUNT]) -> Self {
        Self(values)
    }

    /// Normalize arbitrary raw scores into a distribution.
    ///
    /// Negative and non-finite scores count as zero. When nothing is left
    /// the result is [`MoodVector::uniform`].
    #[must_use]
    pub fn from_raw(raw: [f64; Mood::COUNT]) -> Self {
        let cleaned = raw.map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 });
        let max = cleaned.iter().copied().fold(0.0, f64::max);
        if max <= 0.0 {
            return Self::uniform();
        }
        // Scaled entries lie in [0, 1], so the sum cannot overflow.
        let scaled = cleaned.map(|v| v / max);
        let total: f64 = scaled.iter().sum();
        Self(scaled.map(|v| v / total))
    }

    #[must_use]
    pub fn get(&self, mood: Mood) -> f64 {
        self.0[mood.index()]
    }

    #[must_use]
    pub fn values(&self) -> [f64; Mood::COUNT] {
        self.0
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// True when all weights are non-negative and they sum to one.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|v| v.is_finite() && *v >= 0.0)
            && (self.sum() - 1.0).abs() <= SUM_TOLERANCE
    }

    /// The most likely mood. Exact ties go to the earliest mood in [`Mood::ALL`].
    #[must_use]
    pub fn argmax(&self) -> Mood {
        let mut best = Mood::ALL[0];
        for mood in Mood::ALL.into_iter().skip(1) {
            if self.get(mood) > self.get(best) {
                best = mood;
            }
        }
        best
    }

    /// `(mood, weight)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Mood, f64)> + '_ {
        Mood::ALL.into_iter().map(move |mood| (mood, self.get(mood)))
    }
}

impl Default for MoodVector {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Serialize for MoodVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Mood::COUNT))?;
        for (mood, value) in self.iter() {
            map.serialize_entry(mood.name(), &value)?;
        }
        map.end()
    }
}

impl fmt::Display for MoodVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(mood, value)| format!("{mood}: {value:.3}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
