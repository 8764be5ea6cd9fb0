//! Protocol constants
//!
//! Opcodes, framing sizes and version numbers shared by host and peer.

// ============================================================================
// Request Opcodes (host → peer)
// ============================================================================

/// Version negotiation. Carries no payload.
pub const OP_HANDSHAKE: u8 = 0x01;
/// Read the logic level of a digital pin.
pub const OP_DIGITAL_READ: u8 = 0x02;
/// Drive a digital pin high or low.
pub const OP_DIGITAL_WRITE: u8 = 0x03;
/// Sample an analog input.
pub const OP_ANALOG_READ: u8 = 0x04;
/// Set the PWM duty cycle of a pin.
pub const OP_ANALOG_WRITE: u8 = 0x05;
/// Configure a pin as input, output or input with pull-up.
pub const OP_PIN_MODE: u8 = 0x06;
/// Start a square wave on a pin.
pub const OP_TONE: u8 = 0x07;
/// Stop a square wave on a pin.
pub const OP_NO_TONE: u8 = 0x08;
/// Clock a byte out on a data/clock pin pair.
pub const OP_SHIFT_OUT: u8 = 0x09;
/// Clock a byte in on a data/clock pin pair.
pub const OP_SHIFT_IN: u8 = 0x0A;

// ============================================================================
// Response Opcodes (peer → host)
// ============================================================================

/// Bit set on a request opcode to form its response opcode.
pub const RESPONSE_FLAG: u8 = 0x80;

/// Error response. Payload is `[request opcode, error code]`.
pub const OP_ERROR: u8 = 0xEE;

/// Response opcode for a given request opcode.
pub const fn response_opcode(request: u8) -> u8 {
    request | RESPONSE_FLAG
}

// ============================================================================
// Peer Error Codes
// ============================================================================

/// The peer firmware does not implement this request.
pub const ERR_CODE_UNSUPPORTED_REQUEST: u8 = 1;
/// Pin number is not valid on this board.
pub const ERR_CODE_INVALID_PIN: u8 = 2;
/// A field value is outside the accepted range.
pub const ERR_CODE_INVALID_ARGUMENT: u8 = 3;
/// The peer cannot service the request right now.
pub const ERR_CODE_BUSY: u8 = 4;

// ============================================================================
// Framing
// ============================================================================

/// Opcode byte plus length byte.
pub const HEADER_SIZE: usize = 2;
/// Trailing Fletcher-16 checksum.
pub const CHECKSUM_SIZE: usize = 2;
/// Largest payload a one-byte length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;
/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CHECKSUM_SIZE;

// ============================================================================
// Versioning
// ============================================================================

/// Major protocol version spoken by this host. Must match the peer exactly.
pub const CURRENT_PROTOCOL_MAJOR_VERSION: u8 = 1;
/// Minor protocol version spoken by this host. Mismatches are tolerated.
pub const CURRENT_PROTOCOL_MINOR_VERSION: u8 = 2;

/// Largest value an analog read can report (10-bit ADC).
pub const ANALOG_READ_MAX: u16 = 1023;
