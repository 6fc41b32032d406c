//! Wire contract with the remote store.
//!
//! Payload shapes are fixed by the server API; field names here are part of
//! the compatibility contract and carry explicit renames where camelCase
//! derivation does not produce them (`currentDBVersion`).

use serde::{Deserialize, Serialize};

/// Schema version this client writes. Sites stored under an older version
/// are upgraded on their next successful save.
pub const EXPECTED_DB_VERSION: u32 = 2;

fn default_db_version() -> u32 {
    EXPECTED_DB_VERSION
}

/// Outcome marker used by every server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Response of `GET /api/json?site=<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSiteResponse {
    pub status: ApiStatus,
    pub is_new: bool,
    /// Envelope string `salt:iv:ciphertext`; absent or null when the site
    /// has no stored content.
    #[serde(default)]
    pub e_content: Option<String>,
    #[serde(rename = "currentDBVersion", default = "default_db_version")]
    pub current_db_version: u32,
    #[serde(rename = "expectedDBVersion", default = "default_db_version")]
    pub expected_db_version: u32,
    /// The server's current concurrency token; absent when the site is new.
    #[serde(default)]
    pub current_hash_content: Option<String>,
}

/// Body of `POST /api/save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSiteRequest {
    pub site: String,
    /// Conditional-write precondition: the token the client last confirmed
    /// matches the server. Null on the first save of a new site.
    pub init_hash_content: Option<String>,
    /// Token of the content being written.
    pub current_hash_content: String,
    /// Envelope string `salt:iv:ciphertext`.
    pub encrypted_content: String,
}

/// Response of `POST /api/save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSiteResponse {
    pub status: ApiStatus,
    /// Token the server stored; becomes the client's next baseline.
    #[serde(default)]
    pub current_hash_content: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /api/delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSiteRequest {
    pub site: String,
    pub init_hash_content: Option<String>,
}

/// Response of `POST /api/delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSiteResponse {
    pub status: ApiStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Substring the server includes in rejection messages when the submitted
/// precondition token is stale. Matching on it classifies a rejection as a
/// conflict rather than a generic failure.
pub const CONFLICT_MESSAGE_MARKER: &str = "modified in the meantime";
