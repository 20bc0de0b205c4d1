use std::fmt;

/// Top-level screens, addressed by path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Live,
    Upload,
    Settings,
    NotFound,
}

impl View {
    pub const ALL: [View; 4] = [View::Home, View::Live, View::Upload, View::Settings];

    /// Resolve a path. Trailing slashes are ignored; unknown paths are `NotFound`.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => View::Home,
            "/live" => View::Live,
            "/upload" => View::Upload,
            "/settings" => View::Settings,
            _ => View::NotFound,
        }
    }

    pub fn path(self) -> Option<&'static str> {
        match self {
            View::Home => Some("/"),
            View::Live => Some("/live"),
            View::Upload => Some("/upload"),
            View::Settings => Some("/settings"),
            View::NotFound => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Live => "Live Detection",
            View::Upload => "Upload & Analyze",
            View::Settings => "Settings",
            View::NotFound => "Page Not Found",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
