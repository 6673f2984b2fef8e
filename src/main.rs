use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use moodmix::classifier::{
    AudioFeatureClassifier, AudioFeatures, ContrastFaceDetector, FaceDetector, FaceGatedClassifier, Frame,
    MoodClassifier, RandomEmotionModel,
};
use moodmix::cli::{Args, Command};
use moodmix::completion;
use moodmix::config::{RuntimeConfig, Settings};
use moodmix::error::PlaylistError;
use moodmix::library::Library;
use moodmix::mood::{Mood, MoodVector};
use moodmix::playlist::PlaylistEngine;
use moodmix::sensor::{ReplaySource, SensingLoop};
use moodmix::state::MoodState;
use path_absolutize::Absolutize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main entry point for the Moodmix application.
///
/// Initializes logging, parses command-line arguments, loads settings and
/// routes commands to their handlers. Settings are validated before any
/// command runs, so a bad transition matrix stops the program here.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug moodmix generate` - Enable debug logging
/// - `RUST_LOG=moodmix::playlist=trace moodmix generate` - Every draw of the walk
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    if let Command::Completion { shell } = args.command {
        let mut cmd = Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let runtime = RuntimeConfig::resolve(args.library, args.config)?;
    debug!("Library: {}", runtime.library_path.display());

    if let Command::CompleteItems { shell } = args.command {
        return completion::print_item_completions(&runtime.library_path, shell);
    }

    let settings = Settings::load(&runtime.settings_path)?;
    let engine = settings.build_engine().context("Invalid configuration")?;

    match args.command {
        Command::Add { mood, paths } => add_items(&runtime.library_path, &mood, &paths)?,
        Command::List => list_library(&load_library(&runtime.library_path)?),
        Command::Generate { mood, length, seed, reorder } => {
            let library = load_library(&runtime.library_path)?;
            let start = match mood {
                Some(name) => name.parse::<Mood>()?,
                None => library
                    .largest_mood()
                    .context("Library is empty. Add items with: moodmix add <mood> <paths..>")?,
            };
            let length = length.unwrap_or(settings.playlist_length);
            generate_playlist(&engine, &library, start, length, seed, reorder)?;
        }
        Command::Reorder { items } => {
            let library = load_library(&runtime.library_path)?;
            let ordered = engine.reorder(&items, &library)?;
            print_playlist(&engine, &library, &ordered)?;
        }
        Command::Distribution { items } => {
            let library = load_library(&runtime.library_path)?;
            let distribution = engine.distribution(&items, &library)?;
            print_vector(&distribution);
        }
        Command::Classify { tempo, energy, centroid, rolloff } => {
            let features = AudioFeatures {
                tempo,
                energy,
                spectral_centroid: centroid,
                spectral_rolloff: rolloff,
            };
            if !features.is_valid() {
                bail!("Tempo and energy must be finite and non-negative");
            }
            let vector = AudioFeatureClassifier::default().classify(&features);
            print_vector(&vector);
            println!("Mood: {}", vector.argmax());
        }
        Command::Tag { features } => tag_library(&runtime.library_path, &features)?,
        Command::Detect { frame, seed } => detect_frame(&settings, &frame, seed)?,
        Command::Watch { features, seed, length } => {
            let length = length.unwrap_or(settings.playlist_length);
            watch(&settings, &engine, &runtime.library_path, &features, seed, length)?;
        }
        Command::Completion { .. } | Command::CompleteItems { .. } => {}
    }

    Ok(())
}

fn load_library(path: &Path) -> Result<Library> {
    Library::load(path).with_context(|| format!("Failed to load library from {}", path.display()))
}

fn save_library(library: &Library, path: &Path) -> Result<()> {
    library
        .save(path)
        .with_context(|| format!("Failed to save library to {}", path.display()))
}

fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

fn add_items(library_path: &Path, mood: &str, paths: &[PathBuf]) -> Result<()> {
    let mood: Mood = mood.parse()?;
    let items = paths
        .iter()
        .map(|path| {
            path.absolutize()
                .map(|abs| abs.to_string_lossy().into_owned())
                .with_context(|| format!("Failed to resolve path {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut library = load_library(library_path)?;
    let added = library.add_items(mood, items);
    save_library(&library, library_path)?;

    info!("Library now holds {} entries", library.len());
    println!(
        "Added {added} items to '{mood}' ({} already present)",
        paths.len() - added
    );
    Ok(())
}

fn list_library(library: &Library) {
    if library.is_empty() {
        println!("Library is empty. Add items with: moodmix add <mood> <paths..>");
        return;
    }

    for (mood, items) in library.iter() {
        println!("{mood} ({})", items.len());
        for item in items {
            println!("  {item}");
        }
    }
    println!();
    println!("Total: {} distinct items", library.distinct_items());
}

fn generate_playlist(
    engine: &PlaylistEngine,
    library: &Library,
    start: Mood,
    length: usize,
    seed: Option<u64>,
    reorder: bool,
) -> Result<()> {
    info!("Generating {length} items starting from '{start}'");
    let mut rng = make_rng(seed);
    let result = if reorder {
        engine.generate_smooth(library, start, length, &mut rng)
    } else {
        engine.generate(library, start, length, &mut rng)
    };

    let playlist = settle_playlist(engine, library, result, reorder)?;
    if playlist.is_empty() {
        println!("Nothing to generate");
    } else {
        print_playlist(engine, library, &playlist)?;
    }
    Ok(())
}

/// Accept a partial playlist from an exhausted walk, smoothing it when asked.
fn settle_playlist(
    engine: &PlaylistEngine,
    library: &Library,
    result: Result<Vec<String>, PlaylistError>,
    reorder: bool,
) -> Result<Vec<String>> {
    match result {
        Ok(playlist) => Ok(playlist),
        Err(PlaylistError::Exhausted { attempts, target, partial }) if !partial.is_empty() => {
            warn!("Stopped after {attempts} unusable draws");
            eprintln!("Only {} of {target} items could be placed", partial.len());
            if reorder {
                Ok(engine.reorder(&partial, library)?)
            } else {
                Ok(partial)
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn print_playlist(engine: &PlaylistEngine, library: &Library, playlist: &[String]) -> Result<()> {
    for (i, item) in playlist.iter().enumerate() {
        let mood = library.mood_of(item).map_or("?", Mood::name);
        println!("{:>3}. [{mood:<9}] {item}", i + 1);
    }
    println!("Smoothness: {:.3}", engine.smoothness(playlist, library)?);
    Ok(())
}

fn print_vector(vector: &MoodVector) {
    for (mood, value) in vector.iter() {
        println!("{mood:>10}: {:5.1}%", value * 100.0);
    }
}

/// On-disk features: a list of readings, or items mapped to their features.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeaturesFile {
    List(Vec<AudioFeatures>),
    Named(BTreeMap<String, AudioFeatures>),
}

impl FeaturesFile {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read features from {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid features file {}", path.display()))
    }

    /// Readings in replay order; named entries in key order.
    fn into_samples(self) -> Vec<AudioFeatures> {
        match self {
            Self::List(samples) => samples,
            Self::Named(map) => map.into_values().collect(),
        }
    }
}

fn tag_library(library_path: &Path, features_path: &Path) -> Result<()> {
    let FeaturesFile::Named(map) = FeaturesFile::load(features_path)? else {
        bail!("Tagging needs an object mapping items to features, got a list");
    };

    let entries: Vec<(String, AudioFeatures)> = map
        .into_iter()
        .filter(|(item, features)| {
            let valid = features.is_valid();
            if !valid {
                warn!("Skipping '{item}': invalid features");
            }
            valid
        })
        .collect();

    let classified = AudioFeatureClassifier::default().classify_batch(&entries);

    let mut library = load_library(library_path)?;
    let mut tagged: BTreeMap<Mood, usize> = BTreeMap::new();
    for (item, vector) in classified {
        let mood = vector.argmax();
        debug!("'{item}' -> '{mood}' ({:.2})", vector.get(mood));
        *tagged.entry(mood).or_default() += library.add_items(mood, [item]);
    }
    save_library(&library, library_path)?;

    for (mood, count) in &tagged {
        println!("{mood:>10}: {count} added");
    }
    println!("Tagged {} items", entries.len());
    Ok(())
}

/// Parse a binary PGM (P5) image with 8-bit samples.
fn parse_pgm(bytes: &[u8]) -> Result<Frame> {
    let mut pos = 0;
    let mut fields = [0_usize; 3];
    let magic = next_token(bytes, &mut pos).context("Empty frame file")?;
    if magic != b"P5" {
        bail!("Not a binary PGM file");
    }
    for field in &mut fields {
        let token = next_token(bytes, &mut pos).context("Truncated PGM header")?;
        *field = std::str::from_utf8(token)?
            .parse()
            .context("Invalid number in PGM header")?;
    }
    let [width, height, max_value] = fields;
    if max_value == 0 || max_value > 255 {
        bail!("Unsupported PGM max value {max_value}");
    }

    // Exactly one whitespace byte separates the header from the raster.
    let data = bytes.get(pos + 1..).unwrap_or_default();
    let len = width.checked_mul(height).context("PGM dimensions overflow")?;
    if data.len() < len {
        bail!("PGM raster holds {} bytes, expected {len}", data.len());
    }
    Frame::from_gray(width, height, data[..len].to_vec()).context("PGM dimensions do not match the raster")
}

/// Next whitespace-separated header token, skipping `#` comments.
fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if bytes.get(*pos) == Some(&b'#') {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    (*pos > start).then(|| &bytes[start..*pos])
}

fn detect_frame(settings: &Settings, path: &Path, seed: Option<u64>) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read frame {}", path.display()))?;
    let frame = parse_pgm(&bytes).with_context(|| format!("Invalid frame {}", path.display()))?;

    let detector = ContrastFaceDetector::default();
    match detector.detect(&frame) {
        Some(face) => println!(
            "Face at ({}, {}) {}x{}, confidence {:.2}",
            face.x, face.y, face.width, face.height, face.confidence
        ),
        None => println!("No face detected"),
    }

    let model = seed.map_or_else(RandomEmotionModel::from_entropy, RandomEmotionModel::new);
    let classifier = FaceGatedClassifier::new(detector, model, settings.min_face_confidence);
    let vector = classifier.classify(&frame);
    print_vector(&vector);
    println!("Mood: {}", vector.argmax());
    Ok(())
}

fn watch(
    settings: &Settings,
    engine: &PlaylistEngine,
    library_path: &Path,
    features_path: &Path,
    seed: Option<u64>,
    length: usize,
) -> Result<()> {
    let samples = FeaturesFile::load(features_path)?.into_samples();
    info!("Replaying {} readings", samples.len());

    let state = MoodState::new(settings.history_limit);
    let report = SensingLoop::new(
        AudioFeatureClassifier::default(),
        ReplaySource::new(samples),
        state.clone(),
        settings.tick(),
    )
    .spawn()?
    .join()?;
    debug!("Sensing report: {report:?}");

    for entry in state.history() {
        println!(
            "{}  {:<9} ({:.2})",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.mood,
            entry.confidence
        );
    }

    let snapshot = state.latest().context("Features file holds no readings")?;
    println!(
        "Current mood: {} ({:.0}% after {} readings)",
        snapshot.mood,
        snapshot.confidence() * 100.0,
        report.published
    );

    let library = load_library(library_path)?;
    if let Some(item) = library.next_for(snapshot.mood) {
        println!("Next up: {item}");
    }
    generate_playlist(engine, &library, snapshot.mood, length, seed, true)
}
