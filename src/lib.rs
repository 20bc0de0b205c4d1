//! BirdVision
//!
//! Bird identification workflow: pick a photo or video, pull a still frame
//! out of it, hand the frame to a detector backend and render the species
//! result. A live mode does the same against a camera feed.
//!
//! The shipped detector is a mock that returns one fixed record after a
//! simulated delay. Real services plug in behind `DetectorBackend`.
//!
//! # Module Structure
//!
//! - `media`: file classification and preview handles
//! - `frame`: video readiness, raster surfaces, JPEG frame capture
//! - `ingest`: video sources (synthetic `stub://`, FFmpeg files)
//! - `detect`: detector backends, the mock record, the backend registry
//! - `session`: the upload state machine
//! - `live`: the live camera scan loop
//! - `present`: text rendering of results
//! - `prefs`: persisted user preferences and the dark-mode flag
//! - `view`: path routing for the four screens
//! - `config`: runtime configuration (file + environment)

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod live;
pub mod media;
pub mod prefs;
pub mod present;
pub mod session;
pub mod view;

pub use config::BirdvisionConfig;
pub use detect::{
    BackendRegistry, BoundingRegion, DetectionResult, DetectorBackend, MockBackend, Submission,
};
pub use error::{AnalysisError, AnalysisResult};
pub use frame::{capture_frame, EncodedFrame, HeapAllocator, ReadyState, VideoSource};
pub use ingest::{open_video, SyntheticVideo, VideoConfig};
pub use live::{LiveFeed, LiveState};
pub use media::{MediaAsset, MediaKind, PreviewHandle, PreviewRegistry};
pub use prefs::{PreferenceStore, Theme, ThemeController, UserPreferences};
pub use present::{render, Presentation};
pub use session::{Session, SessionState};
pub use view::View;
