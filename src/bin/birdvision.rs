//! birdvision - bird identification from the command line
//!
//! Subcommands map onto the four screens:
//! - `home`: overview and navigation
//! - `live`: scan the configured camera until Ctrl-C
//! - `upload <FILE>`: analyse one photo or video
//! - `settings`: show or change preferences
//!
//! `open <PATH>` resolves a screen path (`/live`, `/settings`, ...) the way
//! the router does.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use birdvision::config::BirdvisionConfig;
use birdvision::ingest::open_video;
use birdvision::prefs::{JsonFileStore, PreferenceStore, ThemeController, ALL_KEYS};
use birdvision::present::{self, Presentation};
use birdvision::{BackendRegistry, LiveFeed, Session, View};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "birdvision",
    version,
    about = "Identify birds in photos, videos and live camera feeds"
)]
struct Args {
    /// Preferences file (overrides config and BIRDVISION_PREFS_PATH)
    #[arg(long, value_name = "FILE")]
    prefs: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overview and navigation
    Home,
    /// Scan the live camera feed
    Live {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long, value_name = "SECS")]
        seconds: Option<u64>,
        /// Write a JPEG snapshot of the feed here once a bird is detected
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },
    /// Analyse a photo or video
    Upload {
        file: PathBuf,
        /// Content type to use instead of guessing from the extension
        #[arg(long, value_name = "MIME")]
        content_type: Option<String>,
    },
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Resolve a screen path
    Open { path: String },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Show,
    Set { key: String, value: String },
}

struct App {
    config: BirdvisionConfig,
    prefs: PreferenceStore<JsonFileStore>,
    theme: ThemeController,
    registry: BackendRegistry,
    ui: ui::Ui,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();

    let mut config = BirdvisionConfig::load()?;
    if let Some(path) = args.prefs {
        config.prefs_path = path;
    }
    let prefs = PreferenceStore::open(JsonFileStore::open(&config.prefs_path));
    let theme = ThemeController::new(prefs.prefs().theme, config.system_scheme);
    let registry = config.backend_registry()?;

    let mut app = App {
        config,
        prefs,
        theme,
        registry,
        ui: ui::Ui::from_args(&args.ui, is_tty, !stdout_is_tty),
    };

    let outcome = match args.command {
        Command::Home => app.home(),
        Command::Live { seconds, snapshot } => {
            app.live(seconds.map(Duration::from_secs), snapshot)
        }
        Command::Upload { file, content_type } => app.upload(file, content_type.as_deref()),
        Command::Settings { action } => match action {
            None | Some(SettingsAction::Show) => app.settings(),
            Some(SettingsAction::Set { key, value }) => app.set_preference(&key, &value),
        },
        Command::Open { path } => app.open(&path),
    };

    let flushed = app
        .prefs
        .flush()
        .with_context(|| format!("saving preferences to {}", app.config.prefs_path.display()));
    outcome.and(flushed)
}

impl App {
    fn home(&self) -> Result<()> {
        println!("BirdVision");
        println!("Identify birds from photos, videos and live camera feeds.");
        println!();
        for view in View::ALL {
            if let Some(path) = view.path() {
                println!("  {:<10} {}", path, view);
            }
        }
        println!();
        self.print_theme();
        Ok(())
    }

    fn live(&mut self, limit: Option<Duration>, snapshot: Option<PathBuf>) -> Result<()> {
        let prefs = self.prefs.prefs().clone();
        let camera = {
            let _stage = self.ui.stage("Open camera");
            open_video(self.config.live.video_config())?
        };
        let backend_name = match self.config.analysis.backend.as_str() {
            "mock" => "mock-live",
            _ => self.registry.default_name().unwrap_or("mock-live"),
        };
        let backend = self
            .registry
            .get(backend_name)
            .ok_or_else(|| anyhow!("backend '{}' not registered", backend_name))?;

        let stop = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&stop);
        ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;

        let mut feed = LiveFeed::new(camera)
            .with_scan_delay(self.config.live.scan_delay)
            .with_confidence_threshold(prefs.confidence_threshold);
        let tick_every = Duration::from_secs(1) / prefs.frame_rate.fps().max(1);
        let started = Instant::now();

        log::info!(
            "live feed on {} at {} fps using {}",
            self.config.live.camera,
            prefs.frame_rate.fps(),
            backend_name
        );
        feed.start(started);
        println!("{}", present::render_live(feed.state(), None, &prefs));

        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if limit.is_some_and(|limit| now.duration_since(started) >= limit) {
                break;
            }
            let detected = {
                let mut guard = backend
                    .lock()
                    .map_err(|_| anyhow!("backend lock poisoned"))?;
                feed.tick(now, &mut *guard)?.is_some()
            };
            if detected {
                if let Some(cue) = present::detection_cue(&prefs) {
                    print!("{}", cue);
                }
                println!();
                println!(
                    "{}",
                    present::render_live(feed.state(), feed.detection(), &prefs)
                );
                if let Some(path) = &snapshot {
                    if let Some(frame) = feed.snapshot()? {
                        std::fs::write(path, &frame.bytes)
                            .with_context(|| format!("writing {}", path.display()))?;
                        println!("snapshot: {}", path.display());
                    }
                }
            }
            std::thread::sleep(tick_every);
        }

        feed.stop();
        println!("{}", present::render_live(feed.state(), None, &prefs));
        Ok(())
    }

    fn upload(&mut self, file: PathBuf, content_type: Option<&str>) -> Result<()> {
        let prefs = self.prefs.prefs().clone();
        let mut session = Session::new().with_confidence_threshold(prefs.confidence_threshold);
        let kind = match content_type {
            Some(content_type) => session.select_media_as(&file, content_type),
            None => session.select_media(&file),
        };
        if let Some(asset) = session.asset() {
            println!("{} ({}, {})", asset.file_name(), kind, asset.content_type());
            if let Some(preview) = asset.preview() {
                println!("preview: {}", preview);
            }
        }
        println!("{}", present::render(Presentation::for_session(&session), &prefs));

        let stage = self.ui.stage("Analyze");
        stage.status(present::ANALYZING_MESSAGE);
        match session.analyze(&mut self.registry) {
            Ok(_) => drop(stage),
            Err(e) => {
                stage.fail(&e);
                return Err(e.into());
            }
        }

        println!();
        println!("{}", present::render(Presentation::for_session(&session), &prefs));
        session.clear();
        Ok(())
    }

    fn settings(&self) -> Result<()> {
        for (key, value) in self.prefs.prefs().entries() {
            println!("{:<24} {}", key, value);
        }
        println!();
        self.print_theme();
        println!("preferences file: {}", self.config.prefs_path.display());
        Ok(())
    }

    fn set_preference(&mut self, key: &str, value: &str) -> Result<()> {
        if !ALL_KEYS.contains(&key) {
            return Err(anyhow!(
                "unknown preference '{}'; expected one of {}",
                key,
                ALL_KEYS.join(", ")
            ));
        }
        self.prefs.set(key, value)?;
        self.theme.set_theme(self.prefs.prefs().theme);
        self.settings()
    }

    fn open(&mut self, path: &str) -> Result<()> {
        let view = View::from_path(path);
        match view {
            View::Home => self.home(),
            View::Settings => self.settings(),
            View::Live => {
                println!("{}: run `birdvision live`", view);
                Ok(())
            }
            View::Upload => {
                println!("{}: run `birdvision upload <FILE>`", view);
                println!("{}", present::IDLE_MESSAGE);
                Ok(())
            }
            View::NotFound => Err(anyhow!("404 {}: {}", view, path)),
        }
    }

    fn print_theme(&self) {
        println!(
            "theme: {}{} (dark mode {})",
            self.theme.theme(),
            if self.theme.is_following_system() {
                ", following system"
            } else {
                ""
            },
            if self.theme.is_dark() { "on" } else { "off" }
        );
    }
}
