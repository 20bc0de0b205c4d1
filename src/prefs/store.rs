use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Theme, UserPreferences, ALL_KEYS, KEY_THEME};

/// String key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Store one value. Implementations persist before returning.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-process store. Nothing survives the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object of string values in a single file.
///
/// Every `set` rewrites the file through a sibling temp file and a rename.
/// A failed write leaves both the file and the cached values as they were.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store. A missing file is an empty store; an unreadable or
    /// malformed one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match read_values(&path) {
            Ok(values) => values,
            Err(e) => {
                log::warn!("ignoring preferences file {}: {:#}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_values(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(values)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

fn read_values(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(anyhow!("failed to read {}: {}", path.display(), e)),
    };
    serde_json::from_str(&raw).map_err(|e| anyhow!("invalid preferences file: {}", e))
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// The cached value only changes once the file write succeeds.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.values.clone();
        next.insert(key.to_string(), value.to_string());
        write_values(&self.path, &next)?;
        self.values = next;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        write_values(&self.path, &self.values)
    }
}

/// Typed preferences over a key-value store.
///
/// `open` is the load step, `flush` the teardown step. Values that fail to
/// parse on load are skipped and the default kept.
pub struct PreferenceStore<S: KeyValueStore> {
    store: S,
    prefs: UserPreferences,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn open(store: S) -> Self {
        let mut prefs = UserPreferences::default();
        for key in ALL_KEYS {
            let Some(value) = store.get(key) else {
                continue;
            };
            if let Err(e) = prefs.apply(key, &value) {
                log::warn!("ignoring stored preference {}: {}", key, e);
            }
        }
        log::debug!("preferences loaded: {:?}", prefs);
        Self { store, prefs }
    }

    pub fn prefs(&self) -> &UserPreferences {
        &self.prefs
    }

    /// Parse, apply and persist one preference.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.prefs.clone();
        next.apply(key, value)?;
        let stored = next
            .value_of(key)
            .ok_or_else(|| anyhow!("unknown preference '{}'", key))?;
        self.store.set(key, &stored)?;
        self.prefs = next;
        log::info!("preference {} = {}", key, stored);
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.set(KEY_THEME, theme.as_str())
    }

    pub fn set_language_display(&mut self, language: super::LanguageDisplay) -> Result<()> {
        self.set(super::KEY_LANGUAGE, language.as_str())
    }

    pub fn set_confidence_threshold(&mut self, threshold: u8) -> Result<()> {
        self.set(super::KEY_CONFIDENCE, &threshold.to_string())
    }

    pub fn set_bounding_box_animation(&mut self, enabled: bool) -> Result<()> {
        self.set(super::KEY_BOUNDING_BOX_ANIMATION, &enabled.to_string())
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) -> Result<()> {
        self.set(super::KEY_AUDIO, &enabled.to_string())
    }

    pub fn set_frame_rate(&mut self, rate: super::FrameRate) -> Result<()> {
        self.set(super::KEY_FRAME_RATE, rate.as_str())
    }

    /// Write every preference and flush the backing store.
    pub fn flush(&mut self) -> Result<()> {
        for (key, value) in self.prefs.entries() {
            if self.store.get(key).as_deref() != Some(value.as_str()) {
                self.store.set(key, &value)?;
            }
        }
        self.store.flush()
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
