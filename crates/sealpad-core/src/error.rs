use thiserror::Error;

pub type SealpadResult<T> = Result<T, SealpadError>;

#[derive(Debug, Error)]
pub enum SealpadError {
    /// Decryption failed or the fingerprint check did not pass. Users see
    /// this as "wrong password or corrupted data", nothing more specific.
    #[error("wrong password or corrupted data")]
    Authentication,

    /// The server rejected a conditional write or delete because its stored
    /// token no longer matches the submitted baseline. The remedy is an
    /// explicit reload, never an automatic retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Timeout, connection failure, or a non-success response. Local edits
    /// are preserved; retrying is safe thanks to the token precondition.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server returned a payload with an unexpected shape. Shown to
    /// users as a decryption failure but logged separately for diagnosis.
    #[error("malformed server data: {0}")]
    MalformedData(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SealpadError {
    /// Whether the failure is the optimistic-lock conflict case.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SealpadError::Conflict(_))
    }
}
