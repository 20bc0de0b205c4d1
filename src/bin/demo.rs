//! demo - end-to-end synthetic run of the upload workflow

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use birdvision::frame::{capture_frame, HeapAllocator};
use birdvision::ingest::{SyntheticVideo, VideoConfig};
use birdvision::prefs::{JsonFileStore, PreferenceStore, Theme, ThemeController};
use birdvision::present::{self, Presentation};
use birdvision::{MockBackend, Session, SessionState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory for the sample photo and preferences file.
    #[arg(long, default_value = "demo_out")]
    out: String,
    /// Simulated analysis latency in milliseconds.
    #[arg(long, default_value_t = 1200)]
    latency_ms: u64,
    /// Width of the synthetic sample photo.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Height of the synthetic sample photo.
    #[arg(long, default_value_t = 480)]
    height: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.width == 0 || args.height == 0 {
        return Err(anyhow!("width and height must be >= 1"));
    }

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)?;

    stage("render sample photo");
    let photo_path = out_dir.join("sample_bird.jpg");
    let mut camera = SyntheticVideo::new(VideoConfig {
        path: "stub://demo".to_string(),
        width: args.width,
        height: args.height,
        warmup_polls: 0,
    });
    let photo = capture_frame(&mut camera, &HeapAllocator::new())?
        .ok_or_else(|| anyhow!("no raster surface for {}x{}", args.width, args.height))?;
    fs::write(&photo_path, &photo.bytes)
        .with_context(|| format!("writing {}", photo_path.display()))?;

    let mut backend = MockBackend::new().with_latency(Duration::from_millis(args.latency_ms));
    let mut session = Session::new();
    let prefs = birdvision::UserPreferences::default();

    stage("select photo");
    let kind = session.select_media(&photo_path);
    println!("  {} -> {}", photo_path.display(), kind);
    println!("  {}", present::render(Presentation::for_session(&session), &prefs));

    stage("analyze photo");
    let started = Instant::now();
    session.analyze(&mut backend)?;
    let photo_elapsed = started.elapsed();
    if session.state() != SessionState::ResultReady {
        return Err(anyhow!("session ended in {:?}", session.state()));
    }
    println!("{}", present::render(Presentation::for_session(&session), &prefs));

    stage("analyze synthetic video");
    session.select_media("stub://demo_clip.mp4");
    session.analyze(&mut backend)?;
    let video_result = session
        .result()
        .map(|result| result.common_name.clone())
        .unwrap_or_default();
    let previews_issued = session.previews().issued();
    let previews_revoked = session.previews().revoked();
    session.clear();

    stage("persist preferences");
    let prefs_path = out_dir.join("prefs.json");
    let mut store = PreferenceStore::open(JsonFileStore::open(&prefs_path));
    store.set_theme(Theme::Dark)?;
    store.flush()?;
    let reloaded = PreferenceStore::open(JsonFileStore::open(&prefs_path));
    let theme = ThemeController::new(reloaded.prefs().theme, Default::default());

    println!();
    println!("demo summary:");
    println!("  sample photo: {} ({} bytes)", photo_path.display(), photo.bytes.len());
    println!("  photo analysis: {} ms", photo_elapsed.as_millis());
    println!("  video result: {}", video_result);
    println!("  backend calls: {}", backend.calls());
    println!(
        "  previews issued/revoked: {}/{}",
        previews_issued, previews_revoked
    );
    println!(
        "  reloaded theme: {} (dark mode {})",
        reloaded.prefs().theme,
        if theme.is_dark() { "on" } else { "off" }
    );
    println!("  preferences file: {}", prefs_path.display());
    println!();
    println!("next steps:");
    println!(
        "  cargo run --bin birdvision -- --prefs {} upload {}",
        prefs_path.display(),
        photo_path.display()
    );

    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
