//! Configuration types for the conference coordinator

use crate::media::devices::MediaConstraints;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Public STUN server used when ICE discovery fails or returns nothing useful
pub const FALLBACK_STUN_URL: &str = "stun:stun.l.google.com:19302";

/// Main configuration for a conference coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferenceConfig {
    /// ICE server selection policy
    pub ice: IceConfig,

    /// Per-kind outbound bitrate ceilings
    pub bitrate: BitrateCaps,

    /// Local capture constraints
    pub media: MediaConstraints,
}

/// ICE server selection policy applied to fetched descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceConfig {
    /// Maximum number of STUN descriptors kept from discovery (default: 1)
    pub max_stun_servers: usize,

    /// Maximum number of TURN descriptors kept from discovery (default: 2)
    pub max_turn_servers: usize,

    /// STUN-only fallback used when discovery fails
    pub fallback_stun_url: String,
}

/// Maximum outbound bitrate per media kind, in bits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateCaps {
    /// Ceiling for every outbound video encoding (default: 250 kbps)
    pub video_bps: u32,

    /// Ceiling for every outbound audio encoding (default: 128 kbps)
    pub audio_bps: u32,
}

impl Default for ConferenceConfig {
    fn default() -> Self {
        Self {
            ice: IceConfig::default(),
            bitrate: BitrateCaps::default(),
            media: MediaConstraints::default(),
        }
    }
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            max_stun_servers: 1,
            max_turn_servers: 2,
            fallback_stun_url: FALLBACK_STUN_URL.to_string(),
        }
    }
}

impl Default for BitrateCaps {
    fn default() -> Self {
        Self {
            video_bps: 250_000,
            audio_bps: 128_000,
        }
    }
}

impl ConferenceConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if a bitrate ceiling is zero, the capture constraints
    /// are degenerate, or the ICE fallback is empty.
    pub fn validate(&self) -> Result<()> {
        if self.bitrate.video_bps == 0 || self.bitrate.audio_bps == 0 {
            return Err(Error::InvalidConfig(
                "bitrate ceilings must be non-zero".to_string(),
            ));
        }

        if self.media.audio.sample_rate == 0 {
            return Err(Error::InvalidConfig(
                "audio sample rate must be non-zero".to_string(),
            ));
        }

        if self.media.video.frame_rate == 0 {
            return Err(Error::InvalidConfig(
                "video frame rate must be non-zero".to_string(),
            ));
        }

        if self.ice.fallback_stun_url.is_empty() {
            return Err(Error::InvalidConfig(
                "fallback STUN url must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
