use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::{DetectorBackend, Submission};
use crate::detect::result::DetectionResult;
use crate::error::{AnalysisError, AnalysisResult};

/// Named detector backends with a default.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn DetectorBackend>>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run a submission through the default backend.
    pub fn detect(&self, submission: &Submission) -> AnalysisResult<DetectionResult> {
        let backend = self.default_backend().ok_or_else(|| {
            AnalysisError::AnalysisServiceUnavailable("no detector backend registered".into())
        })?;
        let mut guard = backend.lock().map_err(|_| {
            AnalysisError::AnalysisServiceUnavailable("backend lock poisoned".into())
        })?;
        guard.detect(submission)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry handle as a backend, so a `Session` can drive whichever backend
/// is currently the default.
impl DetectorBackend for BackendRegistry {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn detect(&mut self, submission: &Submission) -> AnalysisResult<DetectionResult> {
        BackendRegistry::detect(self, submission)
    }
}
