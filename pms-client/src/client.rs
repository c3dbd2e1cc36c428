//! Blocking HTTP client for media-server XML documents

use std::time::Duration;

use tracing::{debug, warn};
use xmltree::Element;

use crate::error::{PmsError, Result};
use crate::paths::ClientIdentity;

/// Timeouts and product information sent with every request
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum time to establish the TCP connection
    pub connect_timeout: Duration,
    /// Maximum time to wait for the response body
    pub read_timeout: Duration,
    /// Value of the `X-Plex-Product` header
    pub product: String,
    /// Value of the `X-Plex-Version` header
    pub version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(20),
            product: "PlexConnect".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A minimal client that fetches XML documents from a media server
///
/// Every call is a single blocking GET. Failures are reported once and never
/// retried; callers decide whether a failed fetch aborts their work.
#[derive(Debug, Clone)]
pub struct PmsClient {
    agent: ureq::Agent,
    config: ClientConfig,
}

impl PmsClient {
    /// Create a new client with default timeouts
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with explicit configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(config.connect_timeout)
                .timeout_read(config.read_timeout)
                .build(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch `base_url + path` and parse the body as XML
    ///
    /// # Arguments
    /// * `base_url` - Server base address, e.g. `http://192.168.1.10:32400`
    /// * `path` - Absolute request path including any query string
    /// * `identity` - Client identity forwarded as `X-Plex-*` headers
    /// * `token` - Access token; omitted from the request when empty
    pub fn fetch(
        &self,
        base_url: &str,
        path: &str,
        identity: &ClientIdentity,
        token: &str,
    ) -> Result<Element> {
        let url = format!("{}{}", base_url, path);
        debug!("Fetching media-server document: {}", url);

        let mut request = self.agent.get(&url).set("User-Agent", &self.config.product);
        for (name, value) in identity.header_pairs(&self.config.product, &self.config.version) {
            request = request.set(name, &value);
        }
        if !token.is_empty() {
            request = request.set("X-Plex-Token", token);
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                warn!("Media server answered HTTP {} for {}", code, url);
                PmsError::Status(code)
            }
            ureq::Error::Transport(transport) => {
                warn!("Media server unreachable at {}: {}", url, transport);
                PmsError::Network(transport.to_string())
            }
        })?;

        let xml_text = response
            .into_string()
            .map_err(|e| PmsError::Network(e.to_string()))?;

        Element::parse(xml_text.as_bytes()).map_err(|e| PmsError::Parse(e.to_string()))
    }
}

impl Default for PmsClient {
    fn default() -> Self {
        Self::new()
    }
}
