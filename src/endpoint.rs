//! Server endpoint resolution
//!
//! Parses the endpoint string handed to the client at construction time,
//! exposes the pieces the protocol session needs (base URL, query
//! parameters), and applies the emulator host-address rewrite.

use std::collections::HashMap;

use rand::Rng;

use crate::common::{Error, Platform, Result};

/// Gateway address through which emulated devices reach the host machine.
///
/// Emulators cannot resolve the loopback address of the machine running the
/// karma server, so `localhost`/`127.0.0.1` endpoints are rewritten to this
/// address.
pub const EMULATOR_GATEWAY: &str = "10.0.2.2";

/// Prefix for synthesized client ids when the endpoint carries no `id` key
const ID_PREFIX: &str = "native";

/// A parsed server endpoint
///
/// Grammar: `scheme://host[:port][/path][?key=value&...]` with `http` or
/// `https` schemes. Anything else fails with [`Error::MalformedEndpoint`],
/// which is fatal: the client cannot proceed without a valid endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl {
    /// URL scheme, `http` or `https`
    pub protocol: String,
    /// Host including the explicit port, if any (`localhost:9876`)
    pub host: String,
    /// Host without the port
    pub hostname: String,
    /// Explicit port, if present
    pub port: Option<u16>,
    /// Path component, possibly empty
    pub pathname: String,
    /// Flat query parameters; duplicate keys keep the last occurrence
    pub query: HashMap<String, String>,
}

impl EndpointUrl {
    /// Parse an endpoint string
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || Error::MalformedEndpoint(raw.to_string());

        let (protocol, rest) = raw.split_once("://").ok_or_else(malformed)?;
        if protocol != "http" && protocol != "https" {
            return Err(malformed());
        }
        // Fragments are not part of the endpoint grammar.
        if rest.contains('#') {
            return Err(malformed());
        }

        let (authority_and_path, search) = match rest.split_once('?') {
            Some((before, after)) => (before, Some(after)),
            None => (rest, None),
        };

        let (authority, pathname) = match authority_and_path.find('/') {
            Some(idx) => {
                let (a, p) = authority_and_path.split_at(idx);
                (a, p.to_string())
            }
            None => (authority_and_path, String::new()),
        };

        let (hostname, port) = match authority.split_once(':') {
            Some((name, port_str)) => {
                let port: u16 = port_str.parse().map_err(|_| malformed())?;
                (name.to_string(), Some(port))
            }
            None => (authority.to_string(), None),
        };
        if hostname.is_empty() {
            return Err(malformed());
        }

        let mut query = HashMap::new();
        if let Some(search) = search {
            for pair in search.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (pair.to_string(), String::new()),
                };
                query.insert(key, value);
            }
        }

        Ok(Self {
            protocol: protocol.to_string(),
            host: authority.to_string(),
            hostname,
            port,
            pathname,
            query,
        })
    }

    /// Rewrite loopback hostnames to the emulator-to-host gateway address
    ///
    /// Only applies when the platform label marks an emulated environment
    /// and the hostname is exactly `localhost` or `127.0.0.1`. The explicit
    /// port is preserved.
    pub fn rewrite_for_emulator(&mut self, platform: &Platform) {
        if !platform.is_emulator() {
            return;
        }
        if self.hostname != "localhost" && self.hostname != "127.0.0.1" {
            return;
        }

        tracing::debug!(
            hostname = %self.hostname,
            gateway = EMULATOR_GATEWAY,
            "Rewriting loopback endpoint for emulated environment"
        );
        self.hostname = EMULATOR_GATEWAY.to_string();
        self.host = match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        };
    }

    /// Base URL used for registration and asset retrieval
    ///
    /// `scheme://host/path` with any trailing slash stripped.
    pub fn base_url(&self) -> String {
        let url = format!("{}://{}{}", self.protocol, self.host, self.pathname);
        url.trim_end_matches('/').to_string()
    }
}

/// Identity this client registers under
///
/// Created once at startup and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Stable client id, from the `id` query key or a random suffix
    pub id: String,
    /// Optional display name from the `displayName` query key
    pub display_name: Option<String>,
    /// Host platform label
    pub platform_label: String,
}

impl ClientIdentity {
    /// Resolve the identity from the endpoint query parameters
    pub fn resolve(url: &EndpointUrl, platform: &Platform) -> Self {
        let id = url
            .query
            .get("id")
            .cloned()
            .unwrap_or_else(|| format!("{}-{}", ID_PREFIX, rand::thread_rng().gen_range(0..10_000)));

        Self {
            id,
            display_name: url.query.get("displayName").cloned(),
            platform_label: platform.label.clone(),
        }
    }
}
