use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::{BackendRegistry, MockBackend, MOCK_LATENCY};
use crate::ingest::VideoConfig;
use crate::live::SCAN_DELAY;
use crate::prefs::ColorScheme;

const DEFAULT_PREFS_PATH: &str = "birdvision_prefs.json";
const DEFAULT_BACKEND: &str = "mock";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CAMERA_URL: &str = "stub://camera";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize, Default)]
struct BirdvisionConfigFile {
    prefs_path: Option<PathBuf>,
    analysis: Option<AnalysisConfigFile>,
    live: Option<LiveConfigFile>,
    system_scheme: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    backend: Option<String>,
    latency_ms: Option<u64>,
    detect_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LiveConfigFile {
    camera: Option<String>,
    scan_delay_ms: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct BirdvisionConfig {
    pub prefs_path: PathBuf,
    pub analysis: AnalysisSettings,
    pub live: LiveSettings,
    /// Color scheme reported to the theme controller in auto mode.
    pub system_scheme: ColorScheme,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// `mock` or `http`.
    pub backend: String,
    /// Simulated latency of the mock backend.
    pub latency: Duration,
    pub detect_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub camera: String,
    pub scan_delay: Duration,
    pub width: u32,
    pub height: u32,
}

impl LiveSettings {
    pub fn video_config(&self) -> VideoConfig {
        VideoConfig {
            width: self.width,
            height: self.height,
            ..VideoConfig::for_path(self.camera.clone())
        }
    }
}

impl Default for BirdvisionConfig {
    fn default() -> Self {
        // Defaults never fail validation.
        Self::from_file(BirdvisionConfigFile::default())
    }
}

impl BirdvisionConfig {
    /// Load from `BIRDVISION_CONFIG` (if set), then apply `BIRDVISION_*`
    /// overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BIRDVISION_CONFIG").ok();
        let file_cfg = match config_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: BirdvisionConfigFile) -> Self {
        let analysis = file.analysis.unwrap_or_default();
        let live = file.live.unwrap_or_default();
        let system_scheme = file
            .system_scheme
            .as_deref()
            .and_then(|scheme| match scheme.parse() {
                Ok(scheme) => Some(scheme),
                Err(e) => {
                    log::warn!("ignoring system_scheme: {}", e);
                    None
                }
            })
            .unwrap_or_default();
        Self {
            prefs_path: file
                .prefs_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFS_PATH)),
            analysis: AnalysisSettings {
                backend: analysis
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                latency: analysis
                    .latency_ms
                    .map(Duration::from_millis)
                    .unwrap_or(MOCK_LATENCY),
                detect_url: analysis.detect_url,
                timeout: Duration::from_secs(
                    analysis.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                ),
            },
            live: LiveSettings {
                camera: live
                    .camera
                    .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
                scan_delay: live
                    .scan_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(SCAN_DELAY),
                width: live.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: live.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            },
            system_scheme,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_value("BIRDVISION_PREFS_PATH") {
            self.prefs_path = PathBuf::from(path);
        }
        if let Some(backend) = env_value("BIRDVISION_BACKEND") {
            self.analysis.backend = backend;
        }
        if let Some(latency) = env_value("BIRDVISION_ANALYSIS_LATENCY_MS") {
            self.analysis.latency = parse_millis("BIRDVISION_ANALYSIS_LATENCY_MS", &latency)?;
        }
        if let Some(delay) = env_value("BIRDVISION_SCAN_DELAY_MS") {
            self.live.scan_delay = parse_millis("BIRDVISION_SCAN_DELAY_MS", &delay)?;
        }
        if let Some(url) = env_value("BIRDVISION_DETECT_URL") {
            self.analysis.detect_url = Some(url);
        }
        if let Some(scheme) = env_value("BIRDVISION_SYSTEM_SCHEME") {
            self.system_scheme = scheme
                .parse()
                .context("BIRDVISION_SYSTEM_SCHEME must be light or dark")?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.analysis.backend = self.analysis.backend.trim().to_lowercase();
        match self.analysis.backend.as_str() {
            "mock" => {}
            "http" => {
                if self.analysis.detect_url.is_none() {
                    return Err(anyhow!("the http backend requires a detect_url"));
                }
                if !cfg!(feature = "backend-http") {
                    return Err(anyhow!(
                        "the http backend requires the backend-http feature"
                    ));
                }
            }
            other => {
                return Err(anyhow!(
                    "unknown analysis backend '{}'; expected mock or http",
                    other
                ))
            }
        }
        if self.analysis.timeout.is_zero() {
            return Err(anyhow!("analysis timeout must be greater than zero"));
        }
        if self.live.width == 0 || self.live.height == 0 {
            return Err(anyhow!("live camera dimensions must be non-zero"));
        }
        if self.live.camera.trim().is_empty() {
            return Err(anyhow!("live camera must not be empty"));
        }
        Ok(())
    }

    /// Build the backend registry. The configured backend is the default;
    /// the zero-latency live mock is always registered alongside it.
    pub fn backend_registry(&self) -> Result<BackendRegistry> {
        let mut registry = BackendRegistry::new();
        match self.analysis.backend.as_str() {
            "http" => self.register_http(&mut registry)?,
            _ => registry.register(MockBackend::new().with_latency(self.analysis.latency)),
        }
        registry.register(MockBackend::live());
        Ok(registry)
    }

    #[cfg(feature = "backend-http")]
    fn register_http(&self, registry: &mut BackendRegistry) -> Result<()> {
        let url = self
            .analysis
            .detect_url
            .as_deref()
            .ok_or_else(|| anyhow!("the http backend requires a detect_url"))?;
        let backend = crate::detect::HttpBackend::new(url, self.analysis.timeout)?;
        registry.register(backend);
        Ok(())
    }

    #[cfg(not(feature = "backend-http"))]
    fn register_http(&self, _registry: &mut BackendRegistry) -> Result<()> {
        Err(anyhow!("the http backend requires the backend-http feature"))
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    let millis: u64 = value
        .parse()
        .map_err(|_| anyhow!("{} must be an integer number of milliseconds", key))?;
    Ok(Duration::from_millis(millis))
}

fn read_config_file(path: &Path) -> Result<BirdvisionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_mock_workflow() {
        let cfg = BirdvisionConfig::default();
        assert_eq!(cfg.analysis.backend, "mock");
        assert_eq!(cfg.analysis.latency, Duration::from_millis(1200));
        assert_eq!(cfg.live.scan_delay, Duration::from_secs(2));
        assert_eq!(cfg.live.camera, "stub://camera");
        assert_eq!(cfg.system_scheme, ColorScheme::Light);
        assert_eq!(cfg.prefs_path, PathBuf::from("birdvision_prefs.json"));
    }

    #[test]
    fn registry_defaults_to_configured_mock() {
        let cfg = BirdvisionConfig::default();
        let registry = cfg.backend_registry().unwrap();
        assert_eq!(registry.default_name(), Some("mock"));
        assert_eq!(registry.list(), vec!["mock", "mock-live"]);
    }

    #[test]
    fn rejects_unknown_backend_and_bare_http() {
        let mut cfg = BirdvisionConfig::default();
        cfg.analysis.backend = "onnx".into();
        assert!(cfg.validate().is_err());

        let mut cfg = BirdvisionConfig::default();
        cfg.analysis.backend = "HTTP".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn live_settings_build_video_config() {
        let mut cfg = BirdvisionConfig::default();
        cfg.live.width = 320;
        cfg.live.height = 240;
        let video = cfg.live.video_config();
        assert_eq!(video.path, "stub://camera");
        assert_eq!((video.width, video.height), (320, 240));
    }
}
