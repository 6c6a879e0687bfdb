//! Local capture constraints and track handles

use super::TrackKind;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Audio processing options requested from the capture device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConstraints {
    /// Cancel far-end echo
    pub echo_cancellation: bool,

    /// Suppress stationary background noise
    pub noise_suppression: bool,

    /// Automatic gain control
    pub auto_gain_control: bool,

    /// Capture sample rate in Hz
    pub sample_rate: u32,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: 48_000,
        }
    }
}

/// Requested capture resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPreference {
    /// Negotiate down to the device's minimum supported resolution.
    /// Bandwidth-conserving default, not a user preference.
    DeviceMinimum,

    /// Request an exact resolution
    Exact {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

/// Video capture options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Resolution negotiation target
    pub resolution: ResolutionPreference,

    /// Target frame rate in frames per second
    pub frame_rate: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            resolution: ResolutionPreference::DeviceMinimum,
            frame_rate: 15,
        }
    }
}

/// Combined capture constraints for local media acquisition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Audio processing options
    pub audio: AudioConstraints,

    /// Video capture options
    pub video: VideoConstraints,
}

/// Handle to one local capture track.
///
/// The `enabled` flag is the effector: the capture backend observes it
/// directly, so flipping it mutes/unmutes without renegotiation.
#[derive(Debug)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl LocalTrack {
    /// Create an enabled track handle of the given kind
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    /// Track identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Media kind
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Whether the track currently produces media
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable the track
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Stop the track, releasing the capture device. Irreversible.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether the track has been stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// The local capture stream shared read-only with every peer connection
#[derive(Debug)]
pub struct LocalStream {
    id: String,
    tracks: Vec<Arc<LocalTrack>>,
}

impl LocalStream {
    /// Create a stream owning the given tracks
    pub fn new(tracks: Vec<Arc<LocalTrack>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Stream identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All tracks of the stream
    pub fn tracks(&self) -> &[Arc<LocalTrack>] {
        &self.tracks
    }

    /// The audio track, if captured
    pub fn audio_track(&self) -> Option<&Arc<LocalTrack>> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Audio)
    }

    /// The video track, if captured
    pub fn video_track(&self) -> Option<&Arc<LocalTrack>> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    /// Stop every track of the stream
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Capability that acquires local capture hardware
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire local audio/video capture under the given constraints.
    async fn get_user_media(&self, constraints: &MediaConstraints) -> Result<LocalStream>;
}
