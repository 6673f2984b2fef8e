//! # Moodmix Performance Benchmarks
//!
//! Benchmarks for the hot paths of Moodmix.
//!
//! ## Benchmark Categories
//!
//! - **Classification**: Audio scoring, batch tagging and face detection
//! - **Playlist Generation**: Random walk over libraries of growing size
//! - **Reordering**: Greedy O(n²) sequencing
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench classification
//! cargo bench playlist
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use moodmix::classifier::{
    AudioFeatureClassifier, AudioFeatures, ContrastFaceDetector, FaceDetector, Frame, MoodClassifier,
};
use moodmix::library::Library;
use moodmix::mood::Mood;
use moodmix::playlist::PlaylistEngine;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

/// Helper to build a library with `per_mood` items under every mood
fn create_benchmark_library(per_mood: usize) -> Library {
    Library::from_entries(Mood::ALL.map(|mood| {
        let items: Vec<String> = (0..per_mood)
            .map(|i| format!("/music/{mood}/track_{i:04}.flac"))
            .collect();
        (mood, items)
    }))
}

/// Helper to build a features batch spread across all profiles
#[allow(clippy::cast_precision_loss)]
fn create_features(count: usize) -> Vec<(String, AudioFeatures)> {
    (0..count)
        .map(|i| {
            let tempo = 60.0 + (i % 140) as f64;
            let energy = (i % 10) as f64 / 10.0;
            (format!("/music/track_{i:05}.flac"), AudioFeatures::new(tempo, energy))
        })
        .collect()
}

/// Benchmark mood classification
fn benchmark_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let classifier = AudioFeatureClassifier::default();
    let features = AudioFeatures::new(128.0, 0.62);

    group.bench_function("single_audio_classify", |b| {
        b.iter(|| classifier.classify(black_box(&features)))
    });

    for size in [100, 1_000, 10_000] {
        let batch = create_features(size);
        group.bench_with_input(BenchmarkId::new("batch_classify", size), &batch, |b, batch| {
            b.iter(|| classifier.classify_batch(black_box(batch)))
        });
    }

    let mut frame = Frame::filled(320, 240, 128);
    for y in 60..180 {
        for x in 100..220 {
            frame.set_pixel(x, y, if (x / 4 + y / 4) % 2 == 0 { 20 } else { 235 });
        }
    }
    let detector = ContrastFaceDetector::default();
    group.bench_function("face_detect_320x240", |b| {
        b.iter(|| detector.detect(black_box(&frame)))
    });

    group.finish();
}

/// Benchmark playlist generation
fn benchmark_playlist_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("playlist_generation");
    let engine = PlaylistEngine::default();

    for per_mood in [10, 100, 1_000] {
        let library = create_benchmark_library(per_mood);
        group.bench_with_input(BenchmarkId::new("generate_30", per_mood), &library, |b, library| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| engine.generate(black_box(library), Mood::Happy, 30, &mut rng))
        });
    }

    let small = create_benchmark_library(5);
    group.bench_function("drain_library", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| engine.generate(black_box(&small), Mood::Sad, small.distinct_items(), &mut rng))
    });

    group.finish();
}

/// Benchmark greedy reordering
fn benchmark_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");
    let engine = PlaylistEngine::default();
    let library = create_benchmark_library(100);

    for len in [10, 50, 200] {
        let mut rng = StdRng::seed_from_u64(3);
        let playlist = engine
            .generate(&library, Mood::Calm, len, &mut rng)
            .expect("library holds enough items");
        group.bench_with_input(BenchmarkId::new("reorder", len), &playlist, |b, playlist| {
            b.iter_batched(
                || playlist.clone(),
                |playlist| engine.reorder(black_box(&playlist), &library),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// Group all benchmarks
criterion_group!(
    benches,
    benchmark_classification,
    benchmark_playlist_generation,
    benchmark_reorder
);

criterion_main!(benches);
