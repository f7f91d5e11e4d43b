use thiserror::Error;

use crate::dav::DavError;
use crate::stream::StreamError;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers carried in every error reply.
// Clients match on these, never on the message string.

/// Stable error code constants.
pub mod error_code {
    pub const OK: i32 = 0;
    pub const FAILED: i32 = 1;
    pub const STREAM: i32 = 2;
    pub const VALIDATION_FAILED: i32 = 3;
    pub const TRANSPORT: i32 = 4;
    pub const UNAUTHENTICATED: i32 = 401;
    pub const UNKNOWN_SIGNATURE: i32 = 404;
    pub const TERMINAL: i32 = 500;
}

// ── RpcError ────────────────────────────────────────────────────────

/// Error surfaced by generated marshalers and their transports.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No dispatch entry for the incoming signature.
    #[error("remote signature not known [{0}]")]
    UnknownSignature(String),

    /// Request or response stream did not match the call layout.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// An input failed DAV validation.
    #[error(transparent)]
    Validation(#[from] DavError),

    /// The auth hook rejected the call.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// Error reply received from the server.
    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },

    /// Unrecoverable; never translated into an error reply.
    #[error("{0}")]
    Terminal(String),

    /// Failure raised by a server implementation.
    #[error("{0}")]
    Failed(String),
}

impl RpcError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> i32 {
        match self {
            RpcError::UnknownSignature(_) => error_code::UNKNOWN_SIGNATURE,
            RpcError::Stream(_) => error_code::STREAM,
            RpcError::Validation(_) => error_code::VALIDATION_FAILED,
            RpcError::Unauthenticated(_) => error_code::UNAUTHENTICATED,
            RpcError::Transport(_) => error_code::TRANSPORT,
            RpcError::Remote { code, .. } => *code,
            RpcError::Terminal(_) => error_code::TERMINAL,
            RpcError::Failed(_) => error_code::FAILED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RpcError::Terminal(_))
    }
}
