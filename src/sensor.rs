//! # Sensing Loop
//!
//! Background producer that turns a stream of samples into published mood
//! readings.
//!
//! ## Architecture
//!
//! The loop runs on its own thread. Every tick it asks a [`SampleSource`]
//! for the next sample, classifies it and publishes the vector to the
//! shared [`MoodState`]. It does not own the playlist side; readers pick up
//! the latest snapshot whenever they want it.
//!
//! - **Tick**: 33 ms by default (~30 samples per second)
//! - **Source errors**: logged, the loop waits one tick and carries on
//! - **End of source**: the loop exits on its own
//! - **Stop**: [`SensingHandle::stop`] raises a flag checked every tick, then
//!   joins. A snapshot is published in a single write, so stopping never
//!   leaves a torn reading behind.

use crate::classifier::MoodClassifier;
use crate::state::MoodState;
use anyhow::Result;
use log::{debug, error, info, trace};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default interval between samples.
pub const DEFAULT_TICK: Duration = Duration::from_millis(33);

/// Supplier of samples, e.g. a camera or an audio analyzer.
pub trait SampleSource {
    type Sample;

    /// Next sample. `Ok(None)` means the source is finished.
    ///
    /// # Errors
    ///
    /// A transient failure; the loop logs it and retries next tick.
    fn next_sample(&mut self) -> Result<Option<Self::Sample>>;
}

/// Source that replays a fixed list of samples.
#[derive(Debug, Clone)]
pub struct ReplaySource<T> {
    samples: VecDeque<T>,
}

impl<T> ReplaySource<T> {
    pub fn new(samples: impl IntoIterator<Item = T>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl<T> SampleSource for ReplaySource<T> {
    type Sample = T;

    fn next_sample(&mut self) -> Result<Option<T>> {
        Ok(self.samples.pop_front())
    }
}

/// Why a sensing loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of samples.
    SourceFinished,
    /// [`SensingHandle::stop`] was called.
    Stopped,
}

/// Summary returned when the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensingReport {
    pub published: u64,
    pub errors: u64,
    pub reason: StopReason,
}

/// Handle to a running sensing loop.
#[derive(Debug)]
pub struct SensingHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<SensingReport>,
}

impl SensingHandle {
    /// Ask the loop to stop after the current tick and wait for it.
    ///
    /// # Errors
    ///
    /// Fails only if the loop thread panicked.
    pub fn stop(self) -> Result<SensingReport> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Wait for the loop to end on its own.
    ///
    /// # Errors
    ///
    /// Fails only if the loop thread panicked.
    pub fn join(self) -> Result<SensingReport> {
        self.thread
            .join()
            .map_err(|_| anyhow::anyhow!("Sensing loop thread panicked"))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.thread.is_finished()
    }
}

/// Classifier, source and target state wired together.
pub struct SensingLoop<C, S> {
    classifier: C,
    source: S,
    state: MoodState,
    tick: Duration,
}

impl<C, S> SensingLoop<C, S>
where
    C: MoodClassifier + Send + 'static,
    S: SampleSource<Sample = C::Sample> + Send + 'static,
{
    pub fn new(classifier: C, source: S, state: MoodState, tick: Duration) -> Self {
        Self {
            classifier,
            source,
            state,
            tick,
        }
    }

    /// Start the loop on a background thread.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    pub fn spawn(self) -> Result<SensingHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("moodmix-sensing".to_string())
            .spawn(move || self.run(&flag))?;
        Ok(SensingHandle { running, thread })
    }

    /// Run the loop on the current thread until the source ends or
    /// `running` goes false.
    pub fn run(mut self, running: &AtomicBool) -> SensingReport {
        info!("Sensing loop started (tick {:?})", self.tick);
        let mut published = 0;
        let mut errors = 0;

        let reason = loop {
            if !running.load(Ordering::SeqCst) {
                break StopReason::Stopped;
            }

            match self.source.next_sample() {
                Ok(Some(sample)) => {
                    let vector = self.classifier.classify(&sample);
                    let snapshot = self.state.publish(vector);
                    published += 1;
                    trace!("Published #{} mood '{}'", snapshot.sequence, snapshot.mood);
                }
                Ok(None) => {
                    debug!("Sample source finished");
                    break StopReason::SourceFinished;
                }
                Err(e) => {
                    errors += 1;
                    error!("Error reading sample: {e:#}");
                }
            }

            if !self.tick.is_zero() {
                thread::sleep(self.tick);
            }
        };

        running.store(false, Ordering::SeqCst);
        info!("Sensing loop ended: {reason:?} after {published} readings ({errors} errors)");
        SensingReport {
            published,
            errors,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{AudioFeatureClassifier, AudioFeatures};
    use crate::mood::Mood;

    /// Fails every other call, forever.
    struct FlakySource {
        calls: u32,
    }

    impl SampleSource for FlakySource {
        type Sample = AudioFeatures;

        fn next_sample(&mut self) -> Result<Option<AudioFeatures>> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                anyhow::bail!("sensor glitch");
            }
            Ok(Some(AudioFeatures::new(190.0, 0.8)))
        }
    }

    #[test]
    fn test_replay_source_drains_in_order() {
        let mut source = ReplaySource::new([1, 2, 3]);
        assert_eq!(source.remaining(), 3);
        assert_eq!(source.next_sample().unwrap(), Some(1));
        assert_eq!(source.next_sample().unwrap(), Some(2));
        assert_eq!(source.next_sample().unwrap(), Some(3));
        assert_eq!(source.next_sample().unwrap(), None);
    }

    #[test]
    fn test_loop_publishes_every_sample() {
        let samples = vec![
            AudioFeatures::new(70.0, 0.4),
            AudioFeatures::new(150.0, 0.7),
            AudioFeatures::new(200.0, 0.8),
        ];
        let state = MoodState::default();
        let handle = SensingLoop::new(
            AudioFeatureClassifier::default(),
            ReplaySource::new(samples),
            state.clone(),
            Duration::ZERO,
        )
        .spawn()
        .unwrap();

        let report = handle.join().unwrap();
        assert_eq!(report.published, 3);
        assert_eq!(report.errors, 0);
        assert_eq!(report.reason, StopReason::SourceFinished);
        assert_eq!(state.published(), 3);
        assert_eq!(state.current_mood(), Some(Mood::Energetic));
    }

    #[test]
    fn test_handle_reports_finished_source() {
        let handle = SensingLoop::new(
            AudioFeatureClassifier::default(),
            ReplaySource::new([AudioFeatures::new(100.0, 0.5)]),
            MoodState::default(),
            Duration::ZERO,
        )
        .spawn()
        .unwrap();

        for _ in 0..1000 {
            if !handle.is_running() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!handle.is_running());
        assert_eq!(handle.join().unwrap().reason, StopReason::SourceFinished);
    }

    #[test]
    fn test_loop_survives_source_errors_and_stops() {
        let state = MoodState::default();
        let handle = SensingLoop::new(
            AudioFeatureClassifier::default(),
            FlakySource { calls: 0 },
            state.clone(),
            Duration::from_millis(1),
        )
        .spawn()
        .unwrap();

        assert!(handle.is_running());
        while state.published() < 5 {
            thread::sleep(Duration::from_millis(1));
        }
        let report = handle.stop().unwrap();

        assert_eq!(report.reason, StopReason::Stopped);
        assert!(report.published >= 5);
        assert!(report.errors >= 4);
        let latest = state.latest().unwrap();
        assert!(latest.vector.is_normalized());
    }
}
