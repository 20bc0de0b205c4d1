//! Text rendering of detection results.
//!
//! The confidence threshold is shown next to the result but never hides it.

use std::fmt::Write;

use crate::detect::DetectionResult;
use crate::live::LiveState;
use crate::prefs::{LanguageDisplay, UserPreferences};
use crate::session::{Session, SessionState};

pub const IDLE_MESSAGE: &str = "Upload and click Analyze to see results.";
pub const ANALYZING_MESSAGE: &str = "Analyzing... please wait";
pub const CAMERA_OFF_MESSAGE: &str = "Camera is off";
pub const SCANNING_MESSAGE: &str = "Scanning for birds...";
/// Terminal bell rung when the live feed reports a bird.
pub const DETECTION_CUE: &str = "\x07";

const BAR_CELLS: usize = 20;

/// What the result panel shows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Presentation<'a> {
    Idle,
    Analyzing,
    Ready(&'a DetectionResult),
}

impl<'a> Presentation<'a> {
    pub fn for_session(session: &'a Session) -> Self {
        match (session.state(), session.result()) {
            (_, Some(result)) => Presentation::Ready(result),
            (SessionState::Capturing | SessionState::Analyzing, None) => Presentation::Analyzing,
            _ => Presentation::Idle,
        }
    }
}

/// Render the upload result panel.
pub fn render(presentation: Presentation<'_>, prefs: &UserPreferences) -> String {
    match presentation {
        Presentation::Idle => IDLE_MESSAGE.to_string(),
        Presentation::Analyzing => ANALYZING_MESSAGE.to_string(),
        Presentation::Ready(result) => render_result(result, prefs),
    }
}

/// Render the live panel for the feed's current state.
pub fn render_live(
    state: LiveState,
    detection: Option<&DetectionResult>,
    prefs: &UserPreferences,
) -> String {
    match (state, detection) {
        (LiveState::Off, _) => CAMERA_OFF_MESSAGE.to_string(),
        (_, Some(result)) => render_result(result, prefs),
        (_, None) => SCANNING_MESSAGE.to_string(),
    }
}

/// Audio cue for a fresh live detection, if sound is enabled.
pub fn detection_cue(prefs: &UserPreferences) -> Option<&'static str> {
    prefs.audio_enabled.then_some(DETECTION_CUE)
}

/// Species names in the order the display mode asks for.
pub fn species_names(result: &DetectionResult, mode: LanguageDisplay) -> Vec<&str> {
    let mut names = Vec::with_capacity(2);
    if mode.shows_english() {
        names.push(result.common_name.as_str());
    }
    if mode.shows_localized() && !result.localized_name.is_empty() {
        names.push(result.localized_name.as_str());
    }
    if names.is_empty() {
        // A localized-only view of a record with no localized name.
        names.push(result.common_name.as_str());
    }
    names
}

fn render_result(result: &DetectionResult, prefs: &UserPreferences) -> String {
    let mut out = String::new();
    for name in species_names(result, prefs.language_display) {
        let _ = writeln!(out, "{}", name);
    }
    let _ = writeln!(
        out,
        "Confidence  {} {:.1}%",
        confidence_bar(result.confidence_score),
        result.confidence_score
    );
    let _ = writeln!(out, "Habitat     {}", result.habitat_description);
    let _ = writeln!(out, "Status      {}", result.conservation_status);
    // The overlay preference also governs the textual region line.
    if let Some(region) = result
        .bounding_region
        .as_ref()
        .filter(|_| prefs.bounding_box_animation)
    {
        let _ = writeln!(
            out,
            "Region      x={:.0}% y={:.0}% w={:.0}% h={:.0}%",
            region.x, region.y, region.width, region.height
        );
    }
    if !result.thumbnail_reference.is_empty() {
        let _ = writeln!(out, "Thumbnail   {}", result.thumbnail_reference);
    }
    let _ = write!(out, "Detection threshold: {}%", prefs.confidence_threshold);
    out
}

fn confidence_bar(score: f32) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_CELLS as f32).round() as usize;
    let mut bar = String::with_capacity(BAR_CELLS + 2);
    bar.push('[');
    bar.extend(std::iter::repeat('#').take(filled));
    bar.extend(std::iter::repeat('.').take(BAR_CELLS - filled));
    bar.push(']');
    bar
}
