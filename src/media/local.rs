//! Local media controller
//!
//! Owns the capture stream shared by every peer session. Tracks are shared
//! read-only with the connections; only this controller mutates their enabled
//! flags, so the mirrored booleans and the track state cannot diverge.

use super::devices::{LocalStream, LocalTrack, MediaConstraints, MediaDevices};
use crate::Result;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Controller for the process-local capture stream
pub struct LocalMediaController {
    devices: Arc<dyn MediaDevices>,
    stream: RwLock<Option<Arc<LocalStream>>>,
    video_enabled: AtomicBool,
    audio_enabled: AtomicBool,
}

impl LocalMediaController {
    /// Create a controller over the given capture capability
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            stream: RwLock::new(None),
            video_enabled: AtomicBool::new(true),
            audio_enabled: AtomicBool::new(true),
        }
    }

    /// Acquire local capture. With `voice_only` the video track is still
    /// captured but starts disabled, so it can be enabled later without
    /// renegotiation. Acquisition failure is propagated; no peer session can
    /// be created until this succeeds.
    pub async fn initialize(
        &self,
        constraints: &MediaConstraints,
        voice_only: bool,
    ) -> Result<Arc<LocalStream>> {
        let stream = Arc::new(self.devices.get_user_media(constraints).await?);

        if voice_only {
            if let Some(video) = stream.video_track() {
                video.set_enabled(false);
            }
        }

        self.video_enabled
            .store(!voice_only && stream.video_track().is_some(), Ordering::SeqCst);
        self.audio_enabled
            .store(stream.audio_track().is_some(), Ordering::SeqCst);

        if let Some(previous) = self.stream.write().replace(Arc::clone(&stream)) {
            debug!("replacing local stream {}", previous.id());
            previous.stop_all();
        }

        info!(
            "local media ready: {} tracks, voice_only={}",
            stream.tracks().len(),
            voice_only
        );

        Ok(stream)
    }

    /// The current capture stream, if initialized
    pub fn stream(&self) -> Option<Arc<LocalStream>> {
        self.stream.read().clone()
    }

    /// The current capture tracks; empty before initialization
    pub fn tracks(&self) -> Vec<Arc<LocalTrack>> {
        self.stream
            .read()
            .as_ref()
            .map(|s| s.tracks().to_vec())
            .unwrap_or_default()
    }

    /// Flip the video track and return the resulting enabled state.
    /// Returns `false` without mutation when no video track exists.
    pub fn toggle_camera(&self) -> bool {
        let Some(stream) = self.stream() else {
            return false;
        };
        let Some(track) = stream.video_track() else {
            return false;
        };

        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        self.video_enabled.store(enabled, Ordering::SeqCst);
        debug!("camera toggled: enabled={}", enabled);
        enabled
    }

    /// Flip the audio track and return the resulting enabled state.
    /// Returns `false` without mutation when no audio track exists.
    pub fn toggle_microphone(&self) -> bool {
        let Some(stream) = self.stream() else {
            return false;
        };
        let Some(track) = stream.audio_track() else {
            return false;
        };

        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        self.audio_enabled.store(enabled, Ordering::SeqCst);
        debug!("microphone toggled: enabled={}", enabled);
        enabled
    }

    /// Last observed video-enabled state
    pub fn is_camera_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::SeqCst)
    }

    /// Last observed audio-enabled state
    pub fn is_microphone_enabled(&self) -> bool {
        self.audio_enabled.load(Ordering::SeqCst)
    }

    /// Stop every local track and drop the stream. Safe to call repeatedly
    /// and before initialization.
    pub fn destroy(&self) {
        if let Some(stream) = self.stream.write().take() {
            stream.stop_all();
            info!("local media stopped");
        }
    }
}
