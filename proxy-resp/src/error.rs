//! # Error Types
//!
//! Errors surfaced by the RESP value model and its allocator configuration.
//! Building values and allocating from an arena never fail; only byte-to-type
//! conversion and config validation report errors.

use thiserror::Error;

/// Result alias used across the crate.
pub type RespResult<T> = Result<T, RespError>;

/// Errors returned by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RespError {
    /// Leading byte does not name one of the five RESP2 types.
    #[error("unknown resp type byte 0x{0:02x}")]
    UnknownType(u8),
    /// Allocator configuration cannot be honoured.
    #[error("invalid allocator config: {0}")]
    InvalidConfig(&'static str),
}
