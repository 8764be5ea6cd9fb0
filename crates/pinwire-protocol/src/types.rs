//! Field types shared by requests and responses.

use crate::constants::*;
use crate::error::FrameError;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    /// 0 V.
    Low,
    /// Supply voltage.
    High,
}

impl TryFrom<u8> for PinLevel {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PinLevel::Low),
            1 => Ok(PinLevel::High),
            _ => Err(FrameError::InvalidField {
                field: "pin level",
                value,
            }),
        }
    }
}

impl From<PinLevel> for u8 {
    fn from(level: PinLevel) -> Self {
        match level {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

impl std::fmt::Display for PinLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinLevel::Low => write!(f, "low"),
            PinLevel::High => write!(f, "high"),
        }
    }
}

/// Electrical configuration of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    /// High-impedance input.
    Input,
    /// Push-pull output.
    Output,
    /// Input with the internal pull-up enabled.
    InputPullup,
}

impl TryFrom<u8> for PinMode {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PinMode::Input),
            1 => Ok(PinMode::Output),
            2 => Ok(PinMode::InputPullup),
            _ => Err(FrameError::InvalidField {
                field: "pin mode",
                value,
            }),
        }
    }
}

impl From<PinMode> for u8 {
    fn from(mode: PinMode) -> Self {
        match mode {
            PinMode::Input => 0,
            PinMode::Output => 1,
            PinMode::InputPullup => 2,
        }
    }
}

impl std::fmt::Display for PinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinMode::Input => write!(f, "input"),
            PinMode::Output => write!(f, "output"),
            PinMode::InputPullup => write!(f, "input-pullup"),
        }
    }
}

/// Bit order for shift register transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// Least significant bit clocked first.
    LsbFirst,
    /// Most significant bit clocked first.
    MsbFirst,
}

impl TryFrom<u8> for BitOrder {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BitOrder::LsbFirst),
            1 => Ok(BitOrder::MsbFirst),
            _ => Err(FrameError::InvalidField {
                field: "bit order",
                value,
            }),
        }
    }
}

impl From<BitOrder> for u8 {
    fn from(order: BitOrder) -> Self {
        match order {
            BitOrder::LsbFirst => 0,
            BitOrder::MsbFirst => 1,
        }
    }
}

/// Protocol version as a (major, minor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    /// Incompatible layout changes bump this.
    pub major: u8,
    /// Backwards-compatible additions bump this.
    pub minor: u8,
}

impl ProtocolVersion {
    /// The version this host speaks.
    pub const CURRENT: ProtocolVersion = ProtocolVersion {
        major: CURRENT_PROTOCOL_MAJOR_VERSION,
        minor: CURRENT_PROTOCOL_MINOR_VERSION,
    };

    /// Create a version.
    pub const fn new(major: u8, minor: u8) -> Self {
        ProtocolVersion { major, minor }
    }

    /// Majors must match exactly; minors may differ.
    pub fn is_compatible_with(&self, other: &ProtocolVersion) -> bool {
        self.major == other.major
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::CURRENT
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error codes reported by the peer in an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerErrorCode {
    /// Request not implemented by the firmware.
    UnsupportedRequest,
    /// Pin does not exist on this board.
    InvalidPin,
    /// A field value was out of range.
    InvalidArgument,
    /// Peer is busy.
    Busy,
    /// Error code with no named meaning.
    ///
    /// Decoding only produces this for bytes outside the named codes.
    /// Building it by hand around a named code's byte is lossy: it encodes
    /// as that byte and decodes back as the named variant.
    Unknown(u8),
}

impl std::fmt::Display for PeerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerErrorCode::UnsupportedRequest => write!(f, "unsupported request"),
            PeerErrorCode::InvalidPin => write!(f, "invalid pin"),
            PeerErrorCode::InvalidArgument => write!(f, "invalid argument"),
            PeerErrorCode::Busy => write!(f, "busy"),
            PeerErrorCode::Unknown(code) => write!(f, "unknown error (0x{:02X})", code),
        }
    }
}

impl From<u8> for PeerErrorCode {
    fn from(code: u8) -> Self {
        match code {
            ERR_CODE_UNSUPPORTED_REQUEST => PeerErrorCode::UnsupportedRequest,
            ERR_CODE_INVALID_PIN => PeerErrorCode::InvalidPin,
            ERR_CODE_INVALID_ARGUMENT => PeerErrorCode::InvalidArgument,
            ERR_CODE_BUSY => PeerErrorCode::Busy,
            _ => PeerErrorCode::Unknown(code),
        }
    }
}

/// Wire byte for a code. `Unknown` passes its byte through unchanged.
impl From<PeerErrorCode> for u8 {
    fn from(code: PeerErrorCode) -> Self {
        match code {
            PeerErrorCode::UnsupportedRequest => ERR_CODE_UNSUPPORTED_REQUEST,
            PeerErrorCode::InvalidPin => ERR_CODE_INVALID_PIN,
            PeerErrorCode::InvalidArgument => ERR_CODE_INVALID_ARGUMENT,
            PeerErrorCode::Busy => ERR_CODE_BUSY,
            PeerErrorCode::Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_error_code_bytes() {
        for code in 0..=u8::MAX {
            assert_eq!(u8::from(PeerErrorCode::from(code)), code);
        }
        assert_eq!(PeerErrorCode::from(0x42), PeerErrorCode::Unknown(0x42));
        // A hand-built Unknown around a named byte normalizes on decode.
        let byte = u8::from(PeerErrorCode::Unknown(ERR_CODE_INVALID_PIN));
        assert_eq!(PeerErrorCode::from(byte), PeerErrorCode::InvalidPin);
    }

    #[test]
    fn test_version_gate_ignores_minor() {
        let host = ProtocolVersion::new(1, 2);
        assert!(host.is_compatible_with(&ProtocolVersion::new(1, 0)));
        assert!(host.is_compatible_with(&ProtocolVersion::new(1, 9)));
        assert!(!host.is_compatible_with(&ProtocolVersion::new(2, 2)));
        assert!(!host.is_compatible_with(&ProtocolVersion::new(0, 2)));
    }

    #[test]
    fn test_enum_bytes_reject_out_of_range() {
        assert_eq!(PinLevel::try_from(1), Ok(PinLevel::High));
        assert!(matches!(
            PinLevel::try_from(2),
            Err(FrameError::InvalidField { field: "pin level", value: 2 })
        ));
        assert_eq!(PinMode::try_from(2), Ok(PinMode::InputPullup));
        assert!(PinMode::try_from(3).is_err());
        assert!(BitOrder::try_from(7).is_err());
    }

    #[test]
    fn test_peer_error_code_mapping() {
        assert_eq!(PeerErrorCode::from(ERR_CODE_INVALID_PIN), PeerErrorCode::InvalidPin);
        assert_eq!(PeerErrorCode::from(0x42), PeerErrorCode::Unknown(0x42));
        assert_eq!(u8::from(PeerErrorCode::Unknown(0x42)), 0x42);
        assert_eq!(u8::from(PeerErrorCode::Busy), ERR_CODE_BUSY);
    }
}
