use std::sync::mpsc::channel;

use birdvision::prefs::{
    ColorScheme, FrameRate, JsonFileStore, LanguageDisplay, PreferenceStore, Theme,
    ThemeController,
};

#[test]
fn dark_theme_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");

    let mut prefs = PreferenceStore::open(JsonFileStore::open(&path));
    prefs.set_theme(Theme::Dark).unwrap();
    drop(prefs);

    let reloaded = PreferenceStore::open(JsonFileStore::open(&path));
    assert_eq!(reloaded.prefs().theme, Theme::Dark);
    let theme = ThemeController::new(reloaded.prefs().theme, ColorScheme::Light);
    assert!(theme.is_dark());
}

#[test]
fn auto_theme_tracks_simulated_os_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");

    let mut prefs = PreferenceStore::open(JsonFileStore::open(&path));
    prefs.set_theme(Theme::Auto).unwrap();

    let (os, events) = channel();
    let mut theme = ThemeController::new(prefs.prefs().theme, ColorScheme::Light);
    assert!(!theme.is_dark());

    os.send(ColorScheme::Dark).unwrap();
    assert!(theme.pump(&events));
    assert!(theme.is_dark());

    prefs.set_theme(Theme::Light).unwrap();
    theme.set_theme(prefs.prefs().theme);
    os.send(ColorScheme::Dark).unwrap();
    assert!(!theme.pump(&events));
    assert!(!theme.is_dark());
}

#[test]
fn flush_persists_every_setting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings").join("prefs.json");

    let mut prefs = PreferenceStore::open(JsonFileStore::open(&path));
    prefs.set_language_display(LanguageDisplay::Localized).unwrap();
    prefs.set_confidence_threshold(60).unwrap();
    prefs.set_bounding_box_animation(false).unwrap();
    prefs.set_frame_rate(FrameRate::High).unwrap();
    prefs.flush().unwrap();

    let reloaded = PreferenceStore::open(JsonFileStore::open(&path));
    let loaded = reloaded.prefs();
    assert_eq!(loaded.theme, Theme::Light);
    assert_eq!(loaded.language_display, LanguageDisplay::Localized);
    assert_eq!(loaded.confidence_threshold, 60);
    assert!(!loaded.bounding_box_animation);
    assert!(loaded.audio_enabled);
    assert_eq!(loaded.frame_rate, FrameRate::High);
}

#[test]
fn tampered_values_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(
        &path,
        r#"{"theme": "neon", "language": "english", "confidence": "eighty"}"#,
    )
    .unwrap();

    let prefs = PreferenceStore::open(JsonFileStore::open(&path));
    assert_eq!(prefs.prefs().theme, Theme::Light);
    assert_eq!(prefs.prefs().language_display, LanguageDisplay::English);
    assert_eq!(prefs.prefs().confidence_threshold, 75);
}
