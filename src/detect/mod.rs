mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectorBackend, Submission};
#[cfg(feature = "backend-http")]
pub use backends::HttpBackend;
pub use backends::{blue_magpie, MockBackend, MOCK_LATENCY};
pub use registry::BackendRegistry;
pub use result::{BoundingRegion, DetectionResult};
