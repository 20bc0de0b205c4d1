#[cfg(feature = "backend-http")]
pub mod http;
pub mod mock;

#[cfg(feature = "backend-http")]
pub use http::HttpBackend;
pub use mock::{blue_magpie, MockBackend, MOCK_LATENCY};
