//! Client configuration
//!
//! Options are normally passed programmatically by the embedding host
//! process, but can also be loaded from a TOML file.

use std::path::Path;

use serde::Deserialize;

use super::{Error, Result};

/// Options for constructing a [`crate::KarmaClient`]
#[derive(Debug, Clone, Deserialize)]
pub struct ClientOptions {
    /// Karma server endpoint, `scheme://host[:port][/path][?key=value&...]`.
    ///
    /// Recognized query keys: `id`, `displayName`.
    pub url: String,

    /// Disconnect automatically once one run has completed and the
    /// completion message was acknowledged by the server.
    #[serde(default)]
    pub single_run: bool,
}

impl ClientOptions {
    /// Create options with the given endpoint URL and defaults otherwise
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            single_run: false,
        }
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_run_defaults_to_false() {
        let options: ClientOptions =
            toml::from_str(r#"url = "http://localhost:9876""#).unwrap();
        assert_eq!(options.url, "http://localhost:9876");
        assert!(!options.single_run);
    }

    #[test]
    fn single_run_can_be_enabled() {
        let options: ClientOptions = toml::from_str(
            r#"
            url = "http://localhost:9876"
            single_run = true
            "#,
        )
        .unwrap();
        assert!(options.single_run);
    }
}
