//! Error types for the driver.

use std::io;

use pinwire_protocol::{FrameError, Kind, PeerErrorCode, ProtocolVersion};
use thiserror::Error;

/// Why a single write-and-wait attempt failed.
///
/// These are retried inside [`Engine::send`](crate::Engine::send) and only
/// reach the caller wrapped in [`DriverError::Exhausted`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// No complete frame arrived within the read window.
    #[error("timed out waiting for a response")]
    Timeout,

    /// A complete frame arrived but could not be trusted.
    #[error("corrupt response: {0}")]
    Corrupt(#[from] FrameError),

    /// A valid frame arrived that does not answer the outstanding request.
    #[error("response opcode 0x{actual:02X} does not answer {expected}")]
    Mismatch {
        /// Kind of the outstanding request.
        expected: Kind,
        /// Opcode that arrived instead.
        actual: u8,
    },
}

/// Coarse classification of a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No complete frame within the read window.
    Timeout,
    /// Checksum or structural decode failure.
    Corrupt,
    /// Response kind did not match the outstanding request.
    Mismatch,
    /// Major protocol version differs from the peer's.
    VersionIncompatible,
    /// The peer never answered the handshake.
    HandshakeFailed,
    /// The port could not be opened.
    TransportUnavailable,
    /// The peer answered with an error response.
    PeerRejected,
    /// Anything else: I/O faults, misuse, unsupported features.
    Other,
}

/// Errors surfaced by the driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Every attempt in the retry budget failed.
    #[error("{kind} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Request kind being sent.
        kind: Kind,
        /// Attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        last: AttemptError,
    },

    /// The peer speaks an incompatible major protocol version.
    #[error("peer on {port} speaks protocol {peer}, host requires major version {}", .host.major)]
    VersionIncompatible {
        /// Port the peer is attached to.
        port: String,
        /// Version this host speaks.
        host: ProtocolVersion,
        /// Version the peer reported.
        peer: ProtocolVersion,
    },

    /// The peer did not complete the handshake.
    #[error("handshake with peer on {port} failed")]
    HandshakeFailed {
        /// Port the peer is attached to.
        port: String,
        /// What went wrong.
        #[source]
        source: Box<DriverError>,
    },

    /// The transport could not be opened.
    #[error("unable to open {port}")]
    TransportUnavailable {
        /// Port identifier.
        port: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// The peer answered with an error response.
    #[error("peer rejected {kind}: {code}")]
    PeerRejected {
        /// Request kind that was refused.
        kind: Kind,
        /// Reason the peer gave.
        code: PeerErrorCode,
    },

    /// The engine returned a response of the wrong variant for a typed call.
    #[error("engine returned a {actual:?} response to a {expected} request")]
    UnexpectedResponse {
        /// Kind the typed call expected.
        expected: Kind,
        /// Kind the engine returned.
        actual: Option<Kind>,
    },

    /// Firmware redeployment was requested or required.
    #[error("automatic firmware deployment is not supported ({model})")]
    BootstrapUnsupported {
        /// Device model name.
        model: String,
    },

    /// No profile exists for the requested model.
    #[error("unknown device model: {0}")]
    UnknownModel(String),

    /// The driver has already been closed.
    #[error("driver is closed")]
    Closed,

    /// Transport I/O failure other than a timeout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DriverError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Exhausted { last, .. } => match last {
                AttemptError::Timeout => ErrorKind::Timeout,
                AttemptError::Corrupt(_) => ErrorKind::Corrupt,
                AttemptError::Mismatch { .. } => ErrorKind::Mismatch,
            },
            DriverError::VersionIncompatible { .. } => ErrorKind::VersionIncompatible,
            DriverError::HandshakeFailed { .. } => ErrorKind::HandshakeFailed,
            DriverError::TransportUnavailable { .. } => ErrorKind::TransportUnavailable,
            DriverError::PeerRejected { .. } => ErrorKind::PeerRejected,
            DriverError::UnexpectedResponse { .. }
            | DriverError::BootstrapUnsupported { .. }
            | DriverError::UnknownModel(_)
            | DriverError::Closed
            | DriverError::Io(_) => ErrorKind::Other,
        }
    }

    /// The port this error names, when it names one.
    pub fn port(&self) -> Option<&str> {
        match self {
            DriverError::VersionIncompatible { port, .. }
            | DriverError::HandshakeFailed { port, .. }
            | DriverError::TransportUnavailable { port, .. } => Some(port),
            _ => None,
        }
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
