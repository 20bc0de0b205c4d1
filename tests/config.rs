use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use birdvision::config::BirdvisionConfig;
use birdvision::prefs::ColorScheme;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "BIRDVISION_CONFIG",
        "BIRDVISION_PREFS_PATH",
        "BIRDVISION_BACKEND",
        "BIRDVISION_ANALYSIS_LATENCY_MS",
        "BIRDVISION_SCAN_DELAY_MS",
        "BIRDVISION_DETECT_URL",
        "BIRDVISION_SYSTEM_SCHEME",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "prefs_path": "/var/lib/birdvision/prefs.json",
        "analysis": {
            "backend": "mock",
            "latency_ms": 300,
            "timeout_secs": 5
        },
        "live": {
            "camera": "stub://garden",
            "scan_delay_ms": 500,
            "width": 800,
            "height": 600
        },
        "system_scheme": "dark"
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("BIRDVISION_CONFIG", file.path());
    std::env::set_var("BIRDVISION_SCAN_DELAY_MS", "250");
    std::env::set_var("BIRDVISION_SYSTEM_SCHEME", "light");

    let cfg = BirdvisionConfig::load().expect("load config");

    assert_eq!(cfg.prefs_path.to_str(), Some("/var/lib/birdvision/prefs.json"));
    assert_eq!(cfg.analysis.backend, "mock");
    assert_eq!(cfg.analysis.latency, Duration::from_millis(300));
    assert_eq!(cfg.analysis.timeout, Duration::from_secs(5));
    assert_eq!(cfg.live.camera, "stub://garden");
    assert_eq!(cfg.live.scan_delay, Duration::from_millis(250));
    assert_eq!((cfg.live.width, cfg.live.height), (800, 600));
    assert_eq!(cfg.system_scheme, ColorScheme::Light);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
        prefs_path = "prefs.json"
        system_scheme = "dark"

        [analysis]
        latency_ms = 0

        [live]
        camera = "stub://feeder"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("BIRDVISION_CONFIG", file.path());

    let cfg = BirdvisionConfig::load().expect("load config");
    assert_eq!(cfg.analysis.latency, Duration::ZERO);
    assert_eq!(cfg.live.camera, "stub://feeder");
    assert_eq!(cfg.system_scheme, ColorScheme::Dark);
    assert_eq!(cfg.live.scan_delay, Duration::from_secs(2));

    clear_env();
}

#[test]
fn rejects_bad_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("BIRDVISION_ANALYSIS_LATENCY_MS", "soon");
    assert!(BirdvisionConfig::load().is_err());
    clear_env();

    std::env::set_var("BIRDVISION_BACKEND", "http");
    let err = BirdvisionConfig::load().unwrap_err();
    assert!(err.to_string().contains("detect_url"));
    clear_env();

    std::env::set_var("BIRDVISION_SYSTEM_SCHEME", "sepia");
    assert!(BirdvisionConfig::load().is_err());
    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("BIRDVISION_CONFIG", "/nonexistent/birdvision.json");
    let err = BirdvisionConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
