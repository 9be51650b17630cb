//! render-notes - offline renderer for the detuned note recordings
//!
//! For every `{note}.wav` in the input directory, writes 21 pitch-shifted
//! copies `{note}-{level}.mp3` (levels 0..=20) into the output directory by
//! resampling with ffmpeg at `TuningLevel::playback_rate()`. The server
//! streams these files as-is, so the names must match the oracle's levels.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::Parser;
use piano_common::{Note, TuningLevel};
use tracing::{info, warn};

/// Command-line arguments for render-notes
#[derive(Parser, Debug)]
#[command(name = "render-notes")]
#[command(about = "Render detuned note variants with ffmpeg")]
#[command(version)]
struct Args {
    /// Directory containing clean `{note}.wav` recordings
    #[arg(short, long, default_value = ".")]
    input: PathBuf,

    /// Directory to write `{note}-{level}.mp3` files into
    #[arg(short, long, default_value = "tuned")]
    output: PathBuf,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg", env = "FFMPEG")]
    ffmpeg: PathBuf,

    /// Source sample rate in kHz
    #[arg(long, default_value = "44.1")]
    sample_rate_khz: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let mut rendered = 0usize;
    for entry in fs::read_dir(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("wav") {
            continue;
        }

        let Some(name) = note_name(&path) else {
            continue;
        };
        let note = match Note::from_name(name) {
            Ok(note) => note,
            Err(_) => {
                warn!("Skipping {}: not a piano key", path.display());
                continue;
            }
        };

        for level in TuningLevel::all() {
            render(&args, &path, note, level)?;
            rendered += 1;
        }
        info!("Rendered {} ({} levels)", note, TuningLevel::all().count());
    }

    info!("Done: {} files in {}", rendered, args.output.display());
    Ok(())
}

/// Note identifier from a file name: everything before the first dot
fn note_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.split('.').next()
}

fn render(args: &Args, source: &Path, note: Note, level: TuningLevel) -> Result<()> {
    let target = args
        .output
        .join(format!("{}.mp3", level.file_stem(note)));
    let filter = format!(
        "asetrate={:.6}*{}k,aresample=44100",
        level.playback_rate(),
        args.sample_rate_khz
    );

    let status = Command::new(&args.ffmpeg)
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(source)
        .arg("-af")
        .arg(&filter)
        .arg(&target)
        .status()
        .with_context(|| format!("Failed to run {}", args.ffmpeg.display()))?;

    if !status.success() {
        bail!("ffmpeg failed for {} ({})", target.display(), status);
    }
    Ok(())
}
