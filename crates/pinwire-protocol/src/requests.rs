//! Requests that can be sent to the peer.

use bytes::Buf;

use crate::constants::*;
use crate::error::FrameError;
use crate::frame::{write_frame, RawFrame};
use crate::registry::{self, Kind};
use crate::types::*;

/// Read a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalReadRequest {
    /// Pin number.
    pub pin: u8,
}

/// Drive a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalWriteRequest {
    /// Pin number.
    pub pin: u8,
    /// Level to drive.
    pub level: PinLevel,
}

/// Sample an analog input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogReadRequest {
    /// Analog channel / pin number.
    pub pin: u8,
}

/// Set a PWM duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogWriteRequest {
    /// Pin number.
    pub pin: u8,
    /// Duty cycle, 0 (always off) to 255 (always on).
    pub duty: u8,
}

/// Configure a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinModeRequest {
    /// Pin number.
    pub pin: u8,
    /// Mode to apply.
    pub mode: PinMode,
}

/// Start a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneRequest {
    /// Pin number.
    pub pin: u8,
    /// Frequency in hertz.
    pub frequency_hz: u16,
    /// Duration in milliseconds. Zero plays until a [`NoToneRequest`].
    pub duration_ms: u32,
}

/// Stop a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoToneRequest {
    /// Pin number.
    pub pin: u8,
}

/// Clock a byte out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOutRequest {
    /// Data pin.
    pub data_pin: u8,
    /// Clock pin.
    pub clock_pin: u8,
    /// Bit order.
    pub bit_order: BitOrder,
    /// Byte to shift out.
    pub value: u8,
}

/// Clock a byte in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftInRequest {
    /// Data pin.
    pub data_pin: u8,
    /// Clock pin.
    pub clock_pin: u8,
    /// Bit order.
    pub bit_order: BitOrder,
}

/// Requests that can be sent to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Version negotiation. No payload.
    Handshake,
    /// Read a digital pin.
    DigitalRead(DigitalReadRequest),
    /// Drive a digital pin.
    DigitalWrite(DigitalWriteRequest),
    /// Sample an analog input.
    AnalogRead(AnalogReadRequest),
    /// Set a PWM duty cycle.
    AnalogWrite(AnalogWriteRequest),
    /// Configure a pin.
    PinMode(PinModeRequest),
    /// Start a tone.
    Tone(ToneRequest),
    /// Stop a tone.
    NoTone(NoToneRequest),
    /// Clock a byte out.
    ShiftOut(ShiftOutRequest),
    /// Clock a byte in.
    ShiftIn(ShiftInRequest),
}

impl Request {
    /// Kind of this request.
    pub fn kind(&self) -> Kind {
        match self {
            Request::Handshake => Kind::Handshake,
            Request::DigitalRead(_) => Kind::DigitalRead,
            Request::DigitalWrite(_) => Kind::DigitalWrite,
            Request::AnalogRead(_) => Kind::AnalogRead,
            Request::AnalogWrite(_) => Kind::AnalogWrite,
            Request::PinMode(_) => Kind::PinMode,
            Request::Tone(_) => Kind::Tone,
            Request::NoTone(_) => Kind::NoTone,
            Request::ShiftOut(_) => Kind::ShiftOut,
            Request::ShiftIn(_) => Kind::ShiftIn,
        }
    }

    /// Opcode of this request on the wire.
    pub fn opcode(&self) -> u8 {
        self.kind().spec().request_opcode
    }

    /// Serialize the payload fields in wire order.
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.kind().spec().request_len);

        match self {
            Request::Handshake => {}

            Request::DigitalRead(req) => {
                buf.push(req.pin);
            }

            Request::DigitalWrite(req) => {
                buf.push(req.pin);
                buf.push(req.level.into());
            }

            Request::AnalogRead(req) => {
                buf.push(req.pin);
            }

            Request::AnalogWrite(req) => {
                buf.push(req.pin);
                buf.push(req.duty);
            }

            Request::PinMode(req) => {
                buf.push(req.pin);
                buf.push(req.mode.into());
            }

            Request::Tone(req) => {
                buf.push(req.pin);
                buf.extend_from_slice(&req.frequency_hz.to_le_bytes());
                buf.extend_from_slice(&req.duration_ms.to_le_bytes());
            }

            Request::NoTone(req) => {
                buf.push(req.pin);
            }

            Request::ShiftOut(req) => {
                buf.push(req.data_pin);
                buf.push(req.clock_pin);
                buf.push(req.bit_order.into());
                buf.push(req.value);
            }

            Request::ShiftIn(req) => {
                buf.push(req.data_pin);
                buf.push(req.clock_pin);
                buf.push(req.bit_order.into());
            }
        }

        buf
    }

    /// Encode the request as a complete frame.
    pub fn encode(&self) -> Vec<u8> {
        write_frame(self.opcode(), &self.payload())
    }

    /// Interpret a verified frame as a request.
    pub fn from_frame(frame: &RawFrame) -> Result<Self, FrameError> {
        let spec = registry::by_request_opcode(frame.opcode)
            .ok_or(FrameError::UnknownOpcode(frame.opcode))?;
        if frame.payload.len() != spec.request_len {
            return Err(FrameError::PayloadLength {
                opcode: frame.opcode,
                expected: spec.request_len,
                actual: frame.payload.len(),
            });
        }

        let mut data = &frame.payload[..];
        let request = match frame.opcode {
            OP_HANDSHAKE => Request::Handshake,

            OP_DIGITAL_READ => Request::DigitalRead(DigitalReadRequest { pin: data.get_u8() }),

            OP_DIGITAL_WRITE => Request::DigitalWrite(DigitalWriteRequest {
                pin: data.get_u8(),
                level: PinLevel::try_from(data.get_u8())?,
            }),

            OP_ANALOG_READ => Request::AnalogRead(AnalogReadRequest { pin: data.get_u8() }),

            OP_ANALOG_WRITE => Request::AnalogWrite(AnalogWriteRequest {
                pin: data.get_u8(),
                duty: data.get_u8(),
            }),

            OP_PIN_MODE => Request::PinMode(PinModeRequest {
                pin: data.get_u8(),
                mode: PinMode::try_from(data.get_u8())?,
            }),

            OP_TONE => Request::Tone(ToneRequest {
                pin: data.get_u8(),
                frequency_hz: data.get_u16_le(),
                duration_ms: data.get_u32_le(),
            }),

            OP_NO_TONE => Request::NoTone(NoToneRequest { pin: data.get_u8() }),

            OP_SHIFT_OUT => Request::ShiftOut(ShiftOutRequest {
                data_pin: data.get_u8(),
                clock_pin: data.get_u8(),
                bit_order: BitOrder::try_from(data.get_u8())?,
                value: data.get_u8(),
            }),

            OP_SHIFT_IN => Request::ShiftIn(ShiftInRequest {
                data_pin: data.get_u8(),
                clock_pin: data.get_u8(),
                bit_order: BitOrder::try_from(data.get_u8())?,
            }),

            other => return Err(FrameError::UnknownOpcode(other)),
        };

        Ok(request)
    }
}

impl From<DigitalReadRequest> for Request {
    fn from(req: DigitalReadRequest) -> Self {
        Request::DigitalRead(req)
    }
}

impl From<DigitalWriteRequest> for Request {
    fn from(req: DigitalWriteRequest) -> Self {
        Request::DigitalWrite(req)
    }
}

impl From<AnalogReadRequest> for Request {
    fn from(req: AnalogReadRequest) -> Self {
        Request::AnalogRead(req)
    }
}

impl From<AnalogWriteRequest> for Request {
    fn from(req: AnalogWriteRequest) -> Self {
        Request::AnalogWrite(req)
    }
}

impl From<PinModeRequest> for Request {
    fn from(req: PinModeRequest) -> Self {
        Request::PinMode(req)
    }
}

impl From<ToneRequest> for Request {
    fn from(req: ToneRequest) -> Self {
        Request::Tone(req)
    }
}

impl From<NoToneRequest> for Request {
    fn from(req: NoToneRequest) -> Self {
        Request::NoTone(req)
    }
}

impl From<ShiftOutRequest> for Request {
    fn from(req: ShiftOutRequest) -> Self {
        Request::ShiftOut(req)
    }
}

impl From<ShiftInRequest> for Request {
    fn from(req: ShiftInRequest) -> Self {
        Request::ShiftIn(req)
    }
}
