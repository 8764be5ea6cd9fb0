//! Frame error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes are available than the header declares.
    #[error("frame truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the frame needs.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch: frame carries 0x{received:04X}, computed 0x{computed:04X}")]
    ChecksumMismatch {
        /// Checksum carried by the frame.
        received: u16,
        /// Checksum computed over the frame.
        computed: u16,
    },

    /// No registry entry exists for this opcode.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Payload length does not match the registered layout.
    #[error("payload length for opcode 0x{opcode:02X}: expected {expected}, got {actual}")]
    PayloadLength {
        /// Opcode of the offending frame.
        opcode: u8,
        /// Length the registry specifies.
        expected: usize,
        /// Length the frame carries.
        actual: usize,
    },

    /// A field holds a value outside its enumeration.
    #[error("invalid {field} value: {value}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending byte.
        value: u8,
    },

    /// Payload does not fit the one-byte length field.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed payload.
        max: usize,
        /// Payload length supplied.
        actual: usize,
    },
}
