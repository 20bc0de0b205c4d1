//! Media intake.
//!
//! A selected file becomes a `MediaAsset`: its declared content type is derived
//! from the file name, its kind is classified from that content type, and
//! image/video assets get a revocable preview handle from a `PreviewRegistry`.
//!
//! Preview handles are move-only. The registry takes the handle back on
//! revoke, so a handle cannot be released twice and a dropped asset that was
//! never released shows up in `PreviewRegistry::live_count`.

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, AnalysisResult};

/// Content type reported for files we cannot name.
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

const PREVIEW_SCHEME: &str = "blob:birdvision/";

/// Extensions the `image` crate's format table does not name.
const EXTRA_CONTENT_TYPES: &[(&str, &str)] = &[
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("ogv", "video/ogg"),
    ("3gp", "video/3gpp"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl MediaKind {
    /// Classify by declared content type. Only the `image/` and `video/`
    /// prefixes count; parameters and case are not normalised.
    pub fn classify(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, MediaKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared content type for a path, derived from its extension.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return UNKNOWN_CONTENT_TYPE;
    };
    let ext = ext.to_ascii_lowercase();
    if let Some(format) = image::ImageFormat::from_extension(&ext) {
        return format.to_mime_type();
    }
    EXTRA_CONTENT_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, content_type)| *content_type)
        .unwrap_or(UNKNOWN_CONTENT_TYPE)
}

// ----------------------------------------------------------------------------
// Preview handles
// ----------------------------------------------------------------------------

/// Revocable local reference to selected media. Not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: String,
}

impl PreviewHandle {
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Issues preview handles and tracks which are still live.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashSet<String>,
    issued: u64,
    revoked: u64,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> PreviewHandle {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        let id = format!("{}{}", PREVIEW_SCHEME, hex::encode(bytes));
        self.live.insert(id.clone());
        self.issued += 1;
        PreviewHandle { id }
    }

    /// Release a handle. Returns false if this registry never issued it.
    pub fn revoke(&mut self, handle: PreviewHandle) -> bool {
        let removed = self.live.remove(&handle.id);
        if removed {
            self.revoked += 1;
        } else {
            log::warn!("revoke of unknown preview handle {}", handle.id);
        }
        removed
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live.contains(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn revoked(&self) -> u64 {
        self.revoked
    }
}

// ----------------------------------------------------------------------------
// MediaAsset
// ----------------------------------------------------------------------------

/// A user-selected file.
#[derive(Debug)]
pub struct MediaAsset {
    kind: MediaKind,
    path: PathBuf,
    content_type: String,
    preview: Option<PreviewHandle>,
}

impl MediaAsset {
    /// Select a file, deriving its content type from the file name.
    pub fn select(path: impl Into<PathBuf>, previews: &mut PreviewRegistry) -> Self {
        let path = path.into();
        let content_type = content_type_for_path(&path).to_string();
        Self::with_content_type(path, content_type, previews)
    }

    /// Select a file whose content type was declared by the caller.
    pub fn with_content_type(
        path: impl Into<PathBuf>,
        content_type: impl Into<String>,
        previews: &mut PreviewRegistry,
    ) -> Self {
        let content_type = content_type.into();
        let kind = MediaKind::classify(&content_type);
        let preview = kind.is_supported().then(|| previews.issue());
        Self {
            kind,
            path: path.into(),
            content_type,
            preview,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Read the selected bytes. Unknown kinds are refused.
    pub fn read_bytes(&self) -> AnalysisResult<Vec<u8>> {
        if !self.kind.is_supported() {
            return Err(AnalysisError::UnsupportedMediaType(self.content_type.clone()));
        }
        Ok(std::fs::read(&self.path)?)
    }

    /// Destroy the asset, revoking its preview handle if it had one.
    pub fn release(mut self, previews: &mut PreviewRegistry) {
        if let Some(handle) = self.preview.take() {
            previews.revoke(handle);
        }
    }
}

/// Short content digest for logs. Never log paths or bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_content_type_prefix() {
        assert_eq!(MediaKind::classify("image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::classify("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::classify("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::classify("video/webm"), MediaKind::Video);
        assert_eq!(MediaKind::classify("audio/mpeg"), MediaKind::Unknown);
        assert_eq!(MediaKind::classify("application/pdf"), MediaKind::Unknown);
        assert_eq!(MediaKind::classify(""), MediaKind::Unknown);
        assert_eq!(MediaKind::classify("imagex/png"), MediaKind::Unknown);
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_path(Path::new("bird.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("bird.png")), "image/png");
        assert_eq!(content_type_for_path(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type_for_path(Path::new("clip.webm")), "video/webm");
        assert_eq!(
            content_type_for_path(Path::new("notes.txt")),
            UNKNOWN_CONTENT_TYPE
        );
        assert_eq!(content_type_for_path(Path::new("README")), UNKNOWN_CONTENT_TYPE);
    }

    #[test]
    fn broadcast_and_legacy_formats_are_recognised() {
        for (name, expected) in [
            ("clip.mpg", "video/mpeg"),
            ("clip.MPEG", "video/mpeg"),
            ("clip.ts", "video/mp2t"),
            ("clip.wmv", "video/x-ms-wmv"),
            ("clip.flv", "video/x-flv"),
            ("logo.svg", "image/svg+xml"),
        ] {
            let content_type = content_type_for_path(Path::new(name));
            assert_eq!(content_type, expected, "{name}");
        }

        let mut previews = PreviewRegistry::new();
        let video = MediaAsset::select("feeder.wmv", &mut previews);
        assert_eq!(video.kind(), MediaKind::Video);
        assert!(video.preview().is_some());
        let drawing = MediaAsset::select("sketch.svg", &mut previews);
        assert_eq!(drawing.kind(), MediaKind::Image);
        video.release(&mut previews);
        drawing.release(&mut previews);
    }

    #[test]
    fn unsupported_asset_gets_no_preview() {
        let mut previews = PreviewRegistry::new();
        let asset = MediaAsset::select("notes.txt", &mut previews);
        assert_eq!(asset.kind(), MediaKind::Unknown);
        assert!(asset.preview().is_none());
        assert_eq!(previews.live_count(), 0);
        assert!(matches!(
            asset.read_bytes(),
            Err(AnalysisError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn release_revokes_preview() {
        let mut previews = PreviewRegistry::new();
        let asset = MediaAsset::select("bird.jpeg", &mut previews);
        let handle = asset.preview().expect("preview").as_str().to_string();
        assert!(handle.starts_with(PREVIEW_SCHEME));
        assert_eq!(previews.live_count(), 1);

        asset.release(&mut previews);
        assert_eq!(previews.live_count(), 0);
        assert_eq!(previews.issued(), 1);
        assert_eq!(previews.revoked(), 1);
    }

    #[test]
    fn foreign_handle_is_not_revoked() {
        let mut ours = PreviewRegistry::new();
        let mut theirs = PreviewRegistry::new();
        let handle = theirs.issue();
        assert!(!ours.revoke(handle));
        assert_eq!(ours.revoked(), 0);
        assert_eq!(theirs.live_count(), 1);
    }

    #[test]
    fn declared_content_type_wins_over_extension() {
        let mut previews = PreviewRegistry::new();
        let asset = MediaAsset::with_content_type("upload.bin", "video/mp4", &mut previews);
        assert_eq!(asset.kind(), MediaKind::Video);
        assert!(asset.preview().is_some());
        asset.release(&mut previews);
    }
}
