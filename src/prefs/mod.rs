//! User preferences.
//!
//! Preferences are a flat set of named string values. `PreferenceStore`
//! loads them from a `KeyValueStore` on open, writes each change through
//! immediately, and writes the whole set again on `flush`. `ThemeController`
//! turns the theme preference into the dark-mode flag.

mod store;
mod theme;

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

pub use store::{JsonFileStore, KeyValueStore, MemoryStore, PreferenceStore};
pub use theme::{ColorScheme, ThemeController};

pub const KEY_THEME: &str = "theme";
pub const KEY_LANGUAGE: &str = "language";
pub const KEY_CONFIDENCE: &str = "confidence";
pub const KEY_BOUNDING_BOX_ANIMATION: &str = "bounding_box_animation";
pub const KEY_AUDIO: &str = "audio";
pub const KEY_FRAME_RATE: &str = "frame_rate";

pub const ALL_KEYS: &[&str] = &[
    KEY_THEME,
    KEY_LANGUAGE,
    KEY_CONFIDENCE,
    KEY_BOUNDING_BOX_ANIMATION,
    KEY_AUDIO,
    KEY_FRAME_RATE,
];

pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 75;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the operating system color scheme.
    Auto,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            other => Err(anyhow!("unknown theme '{}'; expected light, dark or auto", other)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which species names to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LanguageDisplay {
    English,
    Localized,
    #[default]
    Both,
}

impl LanguageDisplay {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageDisplay::English => "english",
            LanguageDisplay::Localized => "localized",
            LanguageDisplay::Both => "both",
        }
    }

    pub fn shows_english(self) -> bool {
        matches!(self, LanguageDisplay::English | LanguageDisplay::Both)
    }

    pub fn shows_localized(self) -> bool {
        matches!(self, LanguageDisplay::Localized | LanguageDisplay::Both)
    }
}

impl FromStr for LanguageDisplay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "english" => Ok(LanguageDisplay::English),
            // "sinhala" is what older preference files stored.
            "localized" | "sinhala" => Ok(LanguageDisplay::Localized),
            "both" => Ok(LanguageDisplay::Both),
            other => Err(anyhow!(
                "unknown language display '{}'; expected english, localized or both",
                other
            )),
        }
    }
}

impl fmt::Display for LanguageDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live feed sampling rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameRate {
    Low,
    #[default]
    Medium,
    High,
}

impl FrameRate {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameRate::Low => "low",
            FrameRate::Medium => "medium",
            FrameRate::High => "high",
        }
    }

    pub fn fps(self) -> u32 {
        match self {
            FrameRate::Low => 5,
            FrameRate::Medium => 15,
            FrameRate::High => 30,
        }
    }
}

impl FromStr for FrameRate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(FrameRate::Low),
            "medium" => Ok(FrameRate::Medium),
            "high" => Ok(FrameRate::High),
            other => Err(anyhow!(
                "unknown frame rate '{}'; expected low, medium or high",
                other
            )),
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserPreferences {
    pub theme: Theme,
    pub language_display: LanguageDisplay,
    /// Percentage, 0..=100.
    pub confidence_threshold: u8,
    pub bounding_box_animation: bool,
    pub audio_enabled: bool,
    pub frame_rate: FrameRate,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language_display: LanguageDisplay::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            bounding_box_animation: true,
            audio_enabled: true,
            frame_rate: FrameRate::default(),
        }
    }
}

impl UserPreferences {
    /// Set one preference from its stored string form.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_THEME => self.theme = value.parse()?,
            KEY_LANGUAGE => self.language_display = value.parse()?,
            KEY_CONFIDENCE => self.confidence_threshold = parse_percentage(value)?,
            KEY_BOUNDING_BOX_ANIMATION => self.bounding_box_animation = parse_bool(value)?,
            KEY_AUDIO => self.audio_enabled = parse_bool(value)?,
            KEY_FRAME_RATE => self.frame_rate = value.parse()?,
            other => return Err(anyhow!("unknown preference '{}'", other)),
        }
        Ok(())
    }

    /// Stored string form of one preference.
    pub fn value_of(&self, key: &str) -> Option<String> {
        let value = match key {
            KEY_THEME => self.theme.to_string(),
            KEY_LANGUAGE => self.language_display.to_string(),
            KEY_CONFIDENCE => self.confidence_threshold.to_string(),
            KEY_BOUNDING_BOX_ANIMATION => self.bounding_box_animation.to_string(),
            KEY_AUDIO => self.audio_enabled.to_string(),
            KEY_FRAME_RATE => self.frame_rate.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// All preferences in stored form, in `ALL_KEYS` order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        ALL_KEYS
            .iter()
            .filter_map(|key| self.value_of(key).map(|value| (*key, value)))
            .collect()
    }
}

fn parse_percentage(value: &str) -> Result<u8> {
    let parsed: u8 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("confidence must be an integer percentage, got '{}'", value))?;
    if parsed > 100 {
        return Err(anyhow!("confidence must be within 0..=100, got {}", parsed));
    }
    Ok(parsed)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "on" => Ok(true),
        "false" | "off" => Ok(false),
        other => Err(anyhow!("expected true or false, got '{}'", other)),
    }
}
