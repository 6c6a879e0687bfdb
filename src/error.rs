//! Error types for the conference coordinator

/// Result type alias using the conference Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while coordinating a conference session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signaling delivery error
    #[error("Signaling error: {0}")]
    Signaling(String),

    /// Malformed or unknown signaling payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// SDP negotiation error
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// ICE candidate error
    #[error("ICE candidate error: {0}")]
    IceCandidate(String),

    /// Local media acquisition or track error
    #[error("Media error: {0}")]
    Media(String),

    /// ICE server discovery error
    #[error("ICE server discovery error: {0}")]
    IceDiscovery(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error concerns a single peer's negotiation rather than
    /// the coordinator as a whole
    pub fn is_peer_error(&self) -> bool {
        matches!(
            self,
            Error::Negotiation(_) | Error::IceCandidate(_) | Error::Protocol(_)
        )
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}
