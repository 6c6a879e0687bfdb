//! ICE server discovery and selection
//!
//! Discovery is a capability supplied by the embedding application (an HTTP
//! endpoint in the reference deployment). Whatever it returns is filtered down
//! to at most one STUN and two TURN descriptors; a failed fetch falls back to
//! a single public STUN server and never fails initialization.

use crate::config::IceConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One STUN/TURN descriptor used to configure new peer connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs (`stun:`/`turn:`/`turns:` schemes)
    pub urls: Vec<String>,

    /// Username for TURN authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Credential for TURN authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// Create a credential-less STUN descriptor
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// Whether any of the descriptor's URLs is a STUN endpoint
    pub fn is_stun(&self) -> bool {
        self.urls.iter().any(|u| u.starts_with("stun"))
    }

    /// Whether any of the descriptor's URLs is a TURN endpoint
    pub fn is_turn(&self) -> bool {
        self.urls.iter().any(|u| u.starts_with("turn"))
    }
}

/// Ordered, immutable set of ICE servers shared by every new peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServerSet {
    servers: Vec<IceServer>,
}

impl IceServerSet {
    /// Filter fetched descriptors down to the configured STUN/TURN limits,
    /// preserving their order.
    pub fn from_fetched(fetched: Vec<IceServer>, config: &IceConfig) -> Self {
        let stun = fetched
            .iter()
            .filter(|s| s.is_stun())
            .take(config.max_stun_servers)
            .cloned();
        let turn = fetched
            .iter()
            .filter(|s| s.is_turn())
            .take(config.max_turn_servers)
            .cloned();
        let servers: Vec<IceServer> = stun.chain(turn).collect();

        debug!("selected {} ICE servers from discovery", servers.len());
        Self { servers }
    }

    /// The STUN-only set used when discovery fails
    pub fn fallback(config: &IceConfig) -> Self {
        Self {
            servers: vec![IceServer::stun(config.fallback_stun_url.clone())],
        }
    }

    /// The selected descriptors, in order
    pub fn servers(&self) -> &[IceServer] {
        &self.servers
    }

    /// Number of selected descriptors
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// Capability that discovers ICE servers for this deployment
#[async_trait]
pub trait IceServerProvider: Send + Sync {
    /// Fetch the deployment's ICE server descriptors.
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServer>>;
}

/// [`IceServerProvider`] backed by an HTTP endpoint returning a JSON array of
/// descriptors (the reference deployment serves `/api/ice-servers`).
pub struct HttpIceServerProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpIceServerProvider {
    /// Create a provider for the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IceServerProvider for HttpIceServerProvider {
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServer>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::IceDiscovery(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::IceDiscovery(format!("server rejected request: {}", e)))?;

        response
            .json::<Vec<IceServer>>()
            .await
            .map_err(|e| Error::IceDiscovery(format!("malformed response: {}", e)))
    }
}
