//! # Error Types
//!
//! Comprehensive error handling for the session layer.
//!
//! This module defines all error variants that can occur during session
//! operations, from low-level I/O failures to protocol-level faults.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and stream failures; terminate one connection, never the process
//! - **Codec Errors**: malformed or oversized records; recovered locally by dropping the record
//! - **Routing Errors**: sends to peers with no live session; advisory only
//! - **Cryptographic Errors**: challenge-proof encryption/decryption failures
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Engine state-table lock errors
    pub const ERR_AUTH_WRITE_LOCK: &str = "Failed to acquire write lock on auth state table";
    pub const ERR_AUTH_READ_LOCK: &str = "Failed to acquire read lock on auth state table";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";

    /// Cryptographic errors
    pub const ERR_ENCRYPTION_FAILED: &str = "Encryption failed";
    pub const ERR_DECRYPTION_FAILED: &str = "Decryption failed";
}

/// Primary error type for all session-layer operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed message record: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    #[error("Record exceeds maximum size: {0} bytes")]
    OversizedRecord(usize),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("No route to peer: {0}")]
    NoRouteToPeer(String),

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Synchronization primitive poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl ProtocolError {
    /// Whether this error is advisory: the operation failed but the session
    /// layer carries on (record dropped or message undelivered).
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            ProtocolError::MalformedMessage(_) | ProtocolError::NoRouteToPeer(_)
        )
    }
}
