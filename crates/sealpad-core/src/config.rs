use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SealpadError, SealpadResult};

/// Top-level client configuration (loaded from sealpad.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealpadConfig {
    pub remote: RemoteConfig,
    pub crypto: CryptoConfig,
    /// Log level (default: info)
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote store, without trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds; expiry is reported as a transport
    /// failure, never as success
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sealpad.net".into(),
            timeout_secs: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2 iteration count used when deriving content keys
    pub kdf_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: 150_000,
        }
    }
}

impl SealpadConfig {
    /// Load configuration from a TOML file, or defaults if `path` is None.
    pub fn load(path: Option<&Path>) -> SealpadResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| SealpadError::Config(format!("{}: {e}", path.display())))
    }
}
