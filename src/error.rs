use std::path::PathBuf;

use thiserror::Error;

/// Fetching a batch of spot prices failed. Transient by design: the caller
/// skips the current tick and waits for the next scheduled one instead of
/// retrying immediately (upstream rate limits).
#[derive(Debug, Error)]
pub enum PriceFetchError {
    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("price API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("price API returned an unexpected body: {0}")]
    Body(String),
}

/// The alert state file could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file exists but is not valid alert state. Fatal at startup unless
    /// START_FRESH is set: guessing user intent about existing alerts is worse
    /// than refusing to start.
    #[error("alert state file {} is corrupt: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("alert state io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alert state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sending a chat message failed (e.g. the user blocked the bot). Isolated
/// per recipient: never stops the rest of the tick.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
