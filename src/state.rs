//! Shared current-mood cell.
//!
//! One producer (the sensing loop) publishes complete snapshots; any number
//! of readers (the playlist side, a UI) read the latest one. A snapshot is
//! swapped in whole under a write lock, so a reader never sees half a vector.

use crate::mood::{Mood, MoodVector};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

/// Default number of mood changes kept in the history.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One complete published reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodSnapshot {
    pub vector: MoodVector,
    pub mood: Mood,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl MoodSnapshot {
    /// Weight of the arg-max mood.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.vector.get(self.mood)
    }
}

/// A change of the arg-max mood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodHistoryEntry {
    pub mood: Mood,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct Inner {
    latest: Option<MoodSnapshot>,
    history: VecDeque<MoodHistoryEntry>,
    history_limit: usize,
    sequence: u64,
}

/// Cloneable handle to the shared state. Clones see the same cell.
#[derive(Debug, Clone)]
pub struct MoodState {
    inner: Arc<RwLock<Inner>>,
}

impl Default for MoodState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl MoodState {
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                latest: None,
                history: VecDeque::with_capacity(history_limit),
                history_limit,
                sequence: 0,
            })),
        }
    }

    /// Publish a new reading and return the snapshot that was stored.
    ///
    /// The arg-max mood is derived here; a change of mood is appended to
    /// the history.
    pub fn publish(&self, vector: MoodVector) -> MoodSnapshot {
        let mood = vector.argmax();
        let timestamp = Utc::now();

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.sequence += 1;
        let snapshot = MoodSnapshot {
            vector,
            mood,
            sequence: inner.sequence,
            timestamp,
        };

        let changed = inner.latest.as_ref().map_or(true, |prev| prev.mood != mood);
        if changed && inner.history_limit > 0 {
            debug!("Mood changed to '{mood}' ({:.2})", snapshot.confidence());
            if inner.history.len() == inner.history_limit {
                inner.history.pop_front();
            }
            inner.history.push_back(MoodHistoryEntry {
                mood,
                confidence: snapshot.confidence(),
                timestamp,
            });
        }

        inner.latest = Some(snapshot.clone());
        snapshot
    }

    #[must_use]
    pub fn latest(&self) -> Option<MoodSnapshot> {
        self.read(|inner| inner.latest.clone())
    }

    #[must_use]
    pub fn current_mood(&self) -> Option<Mood> {
        self.read(|inner| inner.latest.as_ref().map(|s| s.mood))
    }

    /// Mood changes, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<MoodHistoryEntry> {
        self.read(|inner| inner.history.iter().cloned().collect())
    }

    /// Number of snapshots published so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.read(|inner| inner.sequence)
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&inner)
    }
}
