//! ERPX error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ErpxError>;

#[derive(Error, Debug)]
pub enum ErpxError {
    /// The server returned a falsy session id for the supplied credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// HTTP-level failure or a response body that is not valid XML-RPC.
    #[error("Protocol error (HTTP {status}) for {url}: {message}")]
    Protocol {
        status: u16,
        url: String,
        message: String,
    },

    /// The remote method raised a fault; the fault string is kept verbatim.
    #[error("Remote fault {code}: {message}")]
    RemoteFault { code: i64, message: String },

    /// Missing/invalid configuration: file, profile, numeric setting, batch size.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErpxError {
    /// Whether a bounded retry is allowed to re-attempt the call.
    ///
    /// Remote faults, auth failures and config errors are deterministic and
    /// never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErpxError::Protocol { .. } | ErpxError::Transport(_))
    }
}
