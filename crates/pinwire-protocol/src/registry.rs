//! Type registry.
//!
//! One row per request kind: its opcodes and the fixed payload size on each
//! side of the exchange. The frame codecs validate lengths against this
//! table, and the host driver uses it to know which response answers which
//! request.

use crate::constants::*;

/// The closed set of request/response kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Version negotiation.
    Handshake,
    /// Digital input sample.
    DigitalRead,
    /// Digital output.
    DigitalWrite,
    /// Analog input sample.
    AnalogRead,
    /// PWM output.
    AnalogWrite,
    /// Pin configuration.
    PinMode,
    /// Tone start.
    Tone,
    /// Tone stop.
    NoTone,
    /// Shift register output.
    ShiftOut,
    /// Shift register input.
    ShiftIn,
}

/// Registry entry describing one kind on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    /// The kind this row describes.
    pub kind: Kind,
    /// Human-readable name, used in logs and errors.
    pub name: &'static str,
    /// Opcode of the request frame.
    pub request_opcode: u8,
    /// Opcode of the success response frame.
    pub response_opcode: u8,
    /// Payload bytes in the request.
    pub request_len: usize,
    /// Payload bytes in the response.
    pub response_len: usize,
}

/// Payload bytes of an error response.
pub const ERROR_RESPONSE_LEN: usize = 2;

/// All registered kinds.
pub const REGISTRY: &[KindSpec] = &[
    KindSpec {
        kind: Kind::Handshake,
        name: "handshake",
        request_opcode: OP_HANDSHAKE,
        response_opcode: response_opcode(OP_HANDSHAKE),
        request_len: 0,
        response_len: 2,
    },
    KindSpec {
        kind: Kind::DigitalRead,
        name: "digital-read",
        request_opcode: OP_DIGITAL_READ,
        response_opcode: response_opcode(OP_DIGITAL_READ),
        request_len: 1,
        response_len: 2,
    },
    KindSpec {
        kind: Kind::DigitalWrite,
        name: "digital-write",
        request_opcode: OP_DIGITAL_WRITE,
        response_opcode: response_opcode(OP_DIGITAL_WRITE),
        request_len: 2,
        response_len: 2,
    },
    KindSpec {
        kind: Kind::AnalogRead,
        name: "analog-read",
        request_opcode: OP_ANALOG_READ,
        response_opcode: response_opcode(OP_ANALOG_READ),
        request_len: 1,
        response_len: 3,
    },
    KindSpec {
        kind: Kind::AnalogWrite,
        name: "analog-write",
        request_opcode: OP_ANALOG_WRITE,
        response_opcode: response_opcode(OP_ANALOG_WRITE),
        request_len: 2,
        response_len: 2,
    },
    KindSpec {
        kind: Kind::PinMode,
        name: "pin-mode",
        request_opcode: OP_PIN_MODE,
        response_opcode: response_opcode(OP_PIN_MODE),
        request_len: 2,
        response_len: 2,
    },
    KindSpec {
        kind: Kind::Tone,
        name: "tone",
        request_opcode: OP_TONE,
        response_opcode: response_opcode(OP_TONE),
        request_len: 7,
        response_len: 7,
    },
    KindSpec {
        kind: Kind::NoTone,
        name: "no-tone",
        request_opcode: OP_NO_TONE,
        response_opcode: response_opcode(OP_NO_TONE),
        request_len: 1,
        response_len: 1,
    },
    KindSpec {
        kind: Kind::ShiftOut,
        name: "shift-out",
        request_opcode: OP_SHIFT_OUT,
        response_opcode: response_opcode(OP_SHIFT_OUT),
        request_len: 4,
        response_len: 4,
    },
    KindSpec {
        kind: Kind::ShiftIn,
        name: "shift-in",
        request_opcode: OP_SHIFT_IN,
        response_opcode: response_opcode(OP_SHIFT_IN),
        request_len: 3,
        response_len: 4,
    },
];

impl Kind {
    /// Registry entry for this kind.
    pub fn spec(self) -> &'static KindSpec {
        // Every Kind has exactly one row; the table order follows the enum.
        &REGISTRY[self as usize]
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a kind by its request opcode.
pub fn by_request_opcode(opcode: u8) -> Option<&'static KindSpec> {
    REGISTRY.iter().find(|spec| spec.request_opcode == opcode)
}

/// Look up a kind by its success response opcode.
pub fn by_response_opcode(opcode: u8) -> Option<&'static KindSpec> {
    REGISTRY.iter().find(|spec| spec.response_opcode == opcode)
}

/// Whether a peer → host frame may start with this byte.
pub fn is_response_opcode(opcode: u8) -> bool {
    opcode == OP_ERROR || by_response_opcode(opcode).is_some()
}

/// Whether a host → peer frame may start with this byte.
pub fn is_request_opcode(opcode: u8) -> bool {
    by_request_opcode(opcode).is_some()
}
