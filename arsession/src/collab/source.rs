//! Video source contract.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use futures::future::BoxFuture;

use crate::error::SourceError;
use crate::scene::{Dimensions, Orientation};

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Live camera feed.
    Webcam,
    /// A still image, re-read every frame.
    Image { url: String },
    /// A video file.
    Video { url: String },
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Webcam => "webcam",
            SourceKind::Image { .. } => "image",
            SourceKind::Video { .. } => "video",
        }
    }

    /// Build a kind from its config name and an optional media URL.
    pub fn from_parts(name: &str, url: Option<&str>) -> Option<Self> {
        match (name.trim().to_lowercase().as_str(), url) {
            ("webcam", _) => Some(SourceKind::Webcam),
            ("image", Some(url)) if !url.is_empty() => Some(SourceKind::Image {
                url: url.to_string(),
            }),
            ("video", Some(url)) if !url.is_empty() => Some(SourceKind::Video {
                url: url.to_string(),
            }),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            SourceKind::Webcam => None,
            SourceKind::Image { url } | SourceKind::Video { url } => Some(url),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url() {
            Some(url) => write!(f, "{} ({})", self.name(), url),
            None => f.write_str(self.name()),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    /// Parses URL-less kinds only; use [`SourceKind::from_parts`] for files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::from_parts(s, None).ok_or_else(|| s.to_string())
    }
}

/// Source settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Requested size of the longer frame side.
    pub long_side: u32,
    /// Requested size of the shorter frame side.
    pub short_side: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Webcam,
            long_side: 640,
            short_side: 480,
        }
    }
}

impl SourceConfig {
    /// Frame size to request for a viewport: wide for landscape viewports,
    /// tall for portrait ones.
    pub fn requested_for(&self, viewport: Dimensions) -> Dimensions {
        match viewport.orientation() {
            Orientation::Landscape => Dimensions::new(self.long_side, self.short_side),
            Orientation::Portrait => Dimensions::new(self.short_side, self.long_side),
        }
    }
}

/// One captured frame, as handed to the detection context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Monotonic frame counter within the source.
    pub index: u64,
    pub dimensions: Dimensions,
    pub captured_at: Instant,
}

/// A live or file-backed frame producer.
///
/// The source owns an underlying media resource (camera stream, decoder)
/// that is only released by [`dispose`](VideoSource::dispose).
pub trait VideoSource: Send + Sync {
    fn kind(&self) -> &SourceKind;

    /// Dimensions that were asked for. The device may not honor them.
    fn requested(&self) -> Dimensions;

    /// Acquire the media resource. Resolves once, when the source is ready.
    fn init(&self) -> BoxFuture<'_, Result<(), SourceError>>;

    /// Resolves once the first frame can be decoded.
    ///
    /// Actual frame dimensions are only trustworthy after this resolves.
    fn first_frame(&self) -> BoxFuture<'_, Result<(), SourceError>>;

    fn is_ready(&self) -> bool;

    /// Actual frame dimensions; 0×0 until frames are available.
    fn frame_dimensions(&self) -> Dimensions;

    /// The most recent frame, if any.
    fn current_frame(&self) -> Option<Frame>;

    /// Stop and release the media resource. Idempotent.
    fn dispose(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_for_landscape_viewport() {
        let config = SourceConfig::default();
        assert_eq!(
            config.requested_for(Dimensions::new(1920, 1080)),
            Dimensions::new(640, 480)
        );
    }

    #[test]
    fn test_requested_for_portrait_viewport() {
        let config = SourceConfig::default();
        assert_eq!(
            config.requested_for(Dimensions::new(390, 844)),
            Dimensions::new(480, 640)
        );
    }

    #[test]
    fn test_source_kind_from_parts() {
        assert_eq!(SourceKind::from_parts("webcam", None), Some(SourceKind::Webcam));
        assert_eq!(
            SourceKind::from_parts("Video", Some("clip.mp4")),
            Some(SourceKind::Video {
                url: "clip.mp4".to_string()
            })
        );
        assert_eq!(SourceKind::from_parts("image", None), None);
        assert_eq!(SourceKind::from_parts("image", Some("")), None);
        assert_eq!(SourceKind::from_parts("screen", None), None);
    }

    #[test]
    fn test_source_kind_display() {
        let kind = SourceKind::Image {
            url: "img.jpg".to_string(),
        };
        assert_eq!(kind.to_string(), "image (img.jpg)");
        assert_eq!(SourceKind::Webcam.to_string(), "webcam");
    }
}
