//! # Mood Classifiers
//!
//! Turn one sensed sample into a [`MoodVector`]. Two strategies:
//!
//! - [`FaceGatedClassifier`]: visual. A [`FaceDetector`] gates an
//!   [`EmotionModel`]; no face means the uniform vector.
//! - [`AudioFeatureClassifier`]: audio. Scores each mood by how close the
//!   sample's tempo and energy sit to that mood's profile.
//!
//! Both always return a normalized vector over every mood.

use crate::mood::{Mood, MoodVector};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Anything that maps a sample to a distribution over moods.
pub trait MoodClassifier {
    type Sample;

    /// Classify one sample. The result is always normalized.
    fn classify(&self, sample: &Self::Sample) -> MoodVector;
}

// =============================================================================
// VISUAL
// =============================================================================

/// 8-bit grayscale frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a grayscale buffer. `None` if the buffer does not match the
    /// dimensions.
    #[must_use]
    pub fn from_gray(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        let len = width.checked_mul(height)?;
        (pixels.len() == len).then_some(Self { width, height, pixels })
    }

    /// Frame of a single flat shade.
    #[must_use]
    pub fn filled(width: usize, height: usize, shade: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![shade; width * height],
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        self.pixels[y * self.width + x] = value;
    }
}

/// Rectangle reported by a detector, with its confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub confidence: f64,
}

impl FaceRegion {
    #[must_use]
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Face presence gate. Implementations return the largest face found.
pub trait FaceDetector {
    fn detect(&self, frame: &Frame) -> Option<FaceRegion>;
}

/// Raw per-mood scores for a detected face, in [`Mood::ALL`] order.
/// Need not be normalized.
pub trait EmotionModel {
    fn scores(&self, frame: &Frame, face: &FaceRegion) -> [f64; Mood::COUNT];
}

/// Heuristic detector: a face is a square window with enough luminance
/// variation. Flat or near-flat frames never pass.
///
/// Windows start at `min_size` pixels and double up to the frame size; among
/// windows whose standard deviation reaches `min_stddev` the largest wins,
/// then the highest contrast.
#[derive(Debug, Clone, Copy)]
pub struct ContrastFaceDetector {
    pub min_size: usize,
    pub stride: usize,
    pub min_stddev: f64,
}

impl Default for ContrastFaceDetector {
    fn default() -> Self {
        Self {
            min_size: 30,
            stride: 10,
            min_stddev: 24.0,
        }
    }
}

/// Standard deviation that maps to full detector confidence.
const CONTRAST_SCALE: f64 = 64.0;

/// Summed-area tables for O(1) window mean/variance.
struct IntegralImage {
    width: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralImage {
    fn new(frame: &Frame) -> Self {
        let width = frame.width + 1;
        let mut sum = vec![0.0; width * (frame.height + 1)];
        let mut sum_sq = sum.clone();

        for y in 0..frame.height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..frame.width {
                let v = f64::from(frame.pixel(x, y));
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * width + (x + 1);
                sum[idx] = sum[idx - width] + row_sum;
                sum_sq[idx] = sum_sq[idx - width] + row_sq;
            }
        }

        Self { width, sum, sum_sq }
    }

    fn window(&self, table: &[f64], x: usize, y: usize, size: usize) -> f64 {
        let w = self.width;
        table[(y + size) * w + (x + size)] - table[y * w + (x + size)] - table[(y + size) * w + x]
            + table[y * w + x]
    }

    #[allow(clippy::cast_precision_loss)]
    fn stddev(&self, x: usize, y: usize, size: usize) -> f64 {
        let n = (size * size) as f64;
        let mean = self.window(&self.sum, x, y, size) / n;
        let variance = self.window(&self.sum_sq, x, y, size) / n - mean * mean;
        variance.max(0.0).sqrt()
    }
}

impl FaceDetector for ContrastFaceDetector {
    fn detect(&self, frame: &Frame) -> Option<FaceRegion> {
        let limit = frame.width.min(frame.height);
        if self.min_size == 0 || limit < self.min_size {
            return None;
        }

        let integral = IntegralImage::new(frame);
        let stride = self.stride.max(1);
        let mut best: Option<(usize, f64, usize, usize)> = None;
        let mut size = self.min_size;

        while size <= limit {
            for y in (0..=frame.height - size).step_by(stride) {
                for x in (0..=frame.width - size).step_by(stride) {
                    let stddev = integral.stddev(x, y, size);
                    if stddev < self.min_stddev {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((best_size, best_dev, _, _)) => {
                            size > best_size || (size == best_size && stddev > best_dev)
                        }
                    };
                    if better {
                        best = Some((size, stddev, x, y));
                    }
                }
            }
            size *= 2;
        }

        best.map(|(size, stddev, x, y)| {
            trace!("Face candidate at ({x}, {y}) size {size} stddev {stddev:.1}");
            FaceRegion {
                x,
                y,
                width: size,
                height: size,
                confidence: (stddev / CONTRAST_SCALE).clamp(0.0, 1.0),
            }
        })
    }
}

/// Placeholder emotion model: uniform random raw scores per mood.
///
/// Seeded for reproducible runs; the RNG sits behind a mutex so the model
/// can be shared with the sensing thread.
#[derive(Debug)]
pub struct RandomEmotionModel {
    rng: Mutex<StdRng>,
}

impl RandomEmotionModel {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl EmotionModel for RandomEmotionModel {
    fn scores(&self, _frame: &Frame, _face: &FaceRegion) -> [f64; Mood::COUNT] {
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        std::array::from_fn(|_| rng.gen::<f64>())
    }
}

/// Detect first, classify second. A missing or weak face yields the uniform
/// vector.
#[derive(Debug)]
pub struct FaceGatedClassifier<D, M> {
    detector: D,
    model: M,
    min_confidence: f64,
}

impl<D: FaceDetector, M: EmotionModel> FaceGatedClassifier<D, M> {
    pub fn new(detector: D, model: M, min_confidence: f64) -> Self {
        Self {
            detector,
            model,
            min_confidence,
        }
    }
}

impl<D: FaceDetector, M: EmotionModel> MoodClassifier for FaceGatedClassifier<D, M> {
    type Sample = Frame;

    fn classify(&self, frame: &Frame) -> MoodVector {
        match self.detector.detect(frame) {
            Some(face) if face.confidence >= self.min_confidence => {
                MoodVector::from_raw(self.model.scores(frame, &face))
            }
            Some(face) => {
                debug!(
                    "Face confidence {:.2} below gate {:.2}, using uniform",
                    face.confidence, self.min_confidence
                );
                MoodVector::uniform()
            }
            None => {
                trace!("No face detected, using uniform");
                MoodVector::uniform()
            }
        }
    }
}

// =============================================================================
// AUDIO
// =============================================================================

/// Precomputed audio features of one item or one listening window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Beats per minute.
    pub tempo: f64,
    /// Mean RMS energy.
    pub energy: f64,
    #[serde(default)]
    pub spectral_centroid: f64,
    #[serde(default)]
    pub spectral_rolloff: f64,
}

impl AudioFeatures {
    /// Frame length used by [`AudioFeatures::rms_energy`].
    pub const FRAME_LENGTH: usize = 2048;
    /// Hop between RMS frames.
    pub const HOP_LENGTH: usize = 512;

    #[must_use]
    pub fn new(tempo: f64, energy: f64) -> Self {
        Self {
            tempo,
            energy,
            spectral_centroid: 0.0,
            spectral_rolloff: 0.0,
        }
    }

    /// Mean of per-frame RMS over mono PCM samples.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::classifier::AudioFeatures;
    ///
    /// let square = vec![0.5_f32; 4096];
    /// assert!((AudioFeatures::rms_energy(&square) - 0.5).abs() < 1e-6);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rms_energy(samples: &[f32]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }

        let frame_rms = |frame: &[f32]| -> f64 {
            let power: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
            (power / frame.len() as f64).sqrt()
        };

        if samples.len() <= Self::FRAME_LENGTH {
            return frame_rms(samples);
        }

        let frames: Vec<f64> = (0..=samples.len() - Self::FRAME_LENGTH)
            .step_by(Self::HOP_LENGTH)
            .map(|start| frame_rms(&samples[start..start + Self::FRAME_LENGTH]))
            .collect();
        frames.iter().sum::<f64>() / frames.len() as f64
    }

    /// All fields finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.tempo, self.energy, self.spectral_centroid, self.spectral_rolloff]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Tempo band and energy level characteristic of one mood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodProfile {
    pub tempo_range: (f64, f64),
    pub energy_threshold: f64,
}

/// Weight of the tempo match in the combined score.
const TEMPO_WEIGHT: f64 = 0.4;
/// Weight of the clipped energy match.
const ENERGY_WEIGHT: f64 = 0.4;
/// Weight of the unclipped energy term.
const RESIDUAL_WEIGHT: f64 = 0.2;
/// BPM distance at which the tempo match reaches zero.
const TEMPO_SPAN: f64 = 60.0;

/// Heuristic classifier over [`AudioFeatures`].
#[derive(Debug, Clone)]
pub struct AudioFeatureClassifier {
    profiles: [MoodProfile; Mood::COUNT],
}

impl Default for AudioFeatureClassifier {
    fn default() -> Self {
        let profile = |lo, hi, energy| MoodProfile {
            tempo_range: (lo, hi),
            energy_threshold: energy,
        };
        Self {
            profiles: [
                profile(120.0, 180.0, 0.7),
                profile(60.0, 90.0, 0.4),
                profile(140.0, 200.0, 0.8),
                profile(70.0, 100.0, 0.3),
                profile(100.0, 130.0, 0.5),
                profile(80.0, 110.0, 0.4),
            ],
        }
    }
}

impl AudioFeatureClassifier {
    #[must_use]
    pub fn with_profiles(profiles: [MoodProfile; Mood::COUNT]) -> Self {
        Self { profiles }
    }

    #[must_use]
    pub fn profile(&self, mood: Mood) -> &MoodProfile {
        &self.profiles[mood.index()]
    }

    /// Unnormalized match of `features` against one mood, clipped to `[0, 1]`.
    #[must_use]
    pub fn raw_score(&self, mood: Mood, features: &AudioFeatures) -> f64 {
        let profile = self.profile(mood);
        let (lo, hi) = profile.tempo_range;

        let tempo_distance = ((features.tempo - lo).abs() / TEMPO_SPAN)
            .min((features.tempo - hi).abs() / TEMPO_SPAN)
            .min(1.0);
        let tempo_match = 1.0 - tempo_distance;

        let energy_gap = (features.energy - profile.energy_threshold).abs();
        let energy_match = 1.0 - energy_gap.min(1.0);

        let score =
            TEMPO_WEIGHT * tempo_match + ENERGY_WEIGHT * energy_match + RESIDUAL_WEIGHT * (1.0 - energy_gap);
        score.clamp(0.0, 1.0)
    }

    /// Classify many items at once, in parallel. Output keeps input order.
    #[must_use]
    pub fn classify_batch(&self, items: &[(String, AudioFeatures)]) -> Vec<(String, MoodVector)> {
        items
            .par_iter()
            .map(|(item, features)| (item.clone(), self.classify(features)))
            .collect()
    }
}

impl MoodClassifier for AudioFeatureClassifier {
    type Sample = AudioFeatures;

    fn classify(&self, features: &AudioFeatures) -> MoodVector {
        let raw = Mood::ALL.map(|mood| self.raw_score(mood, features));
        if raw.iter().sum::<f64>() <= 0.0 {
            debug!("All audio mood scores are zero for {features:?}, using uniform");
        }
        MoodVector::from_raw(raw)
    }
}
