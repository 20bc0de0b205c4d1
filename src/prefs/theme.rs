use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::sync::mpsc::Receiver;

use super::Theme;

/// Color scheme reported by the operating system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub fn is_dark(self) -> bool {
        matches!(self, ColorScheme::Dark)
    }
}

impl FromStr for ColorScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ColorScheme::Light),
            "dark" => Ok(ColorScheme::Dark),
            other => Err(anyhow!("unknown color scheme '{}'; expected light or dark", other)),
        }
    }
}

/// Owns the dark-mode flag.
///
/// Light and dark themes pin the flag. Auto mirrors the system scheme and
/// keeps following change notifications until a pinned theme is chosen.
#[derive(Debug)]
pub struct ThemeController {
    theme: Theme,
    system: ColorScheme,
    dark: bool,
}

impl ThemeController {
    pub fn new(theme: Theme, system: ColorScheme) -> Self {
        let mut controller = Self {
            theme,
            system,
            dark: false,
        };
        controller.apply();
        controller
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn is_following_system(&self) -> bool {
        self.theme == Theme::Auto
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.apply();
    }

    /// Handle an OS scheme change. Returns true when the flag changed.
    pub fn on_system_change(&mut self, scheme: ColorScheme) -> bool {
        self.system = scheme;
        if !self.is_following_system() {
            return false;
        }
        let before = self.dark;
        self.apply();
        before != self.dark
    }

    /// Drain pending scheme notifications without blocking.
    pub fn pump(&mut self, events: &Receiver<ColorScheme>) -> bool {
        let mut changed = false;
        while let Ok(scheme) = events.try_recv() {
            changed |= self.on_system_change(scheme);
        }
        changed
    }

    fn apply(&mut self) {
        self.dark = match self.theme {
            Theme::Light => false,
            Theme::Dark => true,
            Theme::Auto => self.system.is_dark(),
        };
        log::debug!(
            "dark mode {} (theme {}, system {:?})",
            if self.dark { "on" } else { "off" },
            self.theme,
            self.system
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn pinned_themes_ignore_system() {
        let mut controller = ThemeController::new(Theme::Dark, ColorScheme::Light);
        assert!(controller.is_dark());
        assert!(!controller.on_system_change(ColorScheme::Light));
        assert!(controller.is_dark());

        controller.set_theme(Theme::Light);
        assert!(!controller.on_system_change(ColorScheme::Dark));
        assert!(!controller.is_dark());
    }

    #[test]
    fn auto_tracks_system_until_superseded() {
        let (tx, rx) = channel();
        let mut controller = ThemeController::new(Theme::Auto, ColorScheme::Light);
        assert!(!controller.is_dark());

        tx.send(ColorScheme::Dark).unwrap();
        assert!(controller.pump(&rx));
        assert!(controller.is_dark());

        tx.send(ColorScheme::Light).unwrap();
        tx.send(ColorScheme::Dark).unwrap();
        controller.pump(&rx);
        assert!(controller.is_dark());

        controller.set_theme(Theme::Light);
        tx.send(ColorScheme::Dark).unwrap();
        assert!(!controller.pump(&rx));
        assert!(!controller.is_dark());

        // Switching back to auto picks up the latest reported scheme.
        controller.set_theme(Theme::Auto);
        assert!(controller.is_dark());
    }

    #[test]
    fn parses_scheme_names() {
        assert_eq!("Dark".parse::<ColorScheme>().unwrap(), ColorScheme::Dark);
        assert_eq!(" light ".parse::<ColorScheme>().unwrap(), ColorScheme::Light);
        assert!("sepia".parse::<ColorScheme>().is_err());
    }
}
