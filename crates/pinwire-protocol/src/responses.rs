//! Responses received from the peer.

use bytes::Buf;

use crate::constants::*;
use crate::error::FrameError;
use crate::frame::{write_frame, RawFrame};
use crate::registry::{self, Kind, ERROR_RESPONSE_LEN};
use crate::types::*;

/// Handshake answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Protocol version the peer speaks.
    pub version: ProtocolVersion,
}

/// Digital read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalReadResponse {
    /// Pin that was read.
    pub pin: u8,
    /// Level observed.
    pub level: PinLevel,
}

/// Digital write acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalWriteResponse {
    /// Pin that was driven.
    pub pin: u8,
    /// Level the peer applied.
    pub level: PinLevel,
}

/// Analog read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogReadResponse {
    /// Pin that was sampled.
    pub pin: u8,
    /// Raw ADC reading, 0 to [`ANALOG_READ_MAX`].
    pub value: u16,
}

/// Analog write acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogWriteResponse {
    /// Pin that was driven.
    pub pin: u8,
    /// Duty cycle the peer applied.
    pub duty: u8,
}

/// Pin mode acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinModeResponse {
    /// Pin that was configured.
    pub pin: u8,
    /// Mode the peer applied.
    pub mode: PinMode,
}

/// Tone acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneResponse {
    /// Pin playing the tone.
    pub pin: u8,
    /// Frequency in hertz.
    pub frequency_hz: u16,
    /// Duration in milliseconds (0 = until stopped).
    pub duration_ms: u32,
}

/// Tone stop acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoToneResponse {
    /// Pin that was silenced.
    pub pin: u8,
}

/// Shift-out acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOutResponse {
    /// Data pin.
    pub data_pin: u8,
    /// Clock pin.
    pub clock_pin: u8,
    /// Bit order used.
    pub bit_order: BitOrder,
    /// Byte shifted out.
    pub value: u8,
}

/// Shift-in result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftInResponse {
    /// Data pin.
    pub data_pin: u8,
    /// Clock pin.
    pub clock_pin: u8,
    /// Bit order used.
    pub bit_order: BitOrder,
    /// Byte shifted in.
    pub value: u8,
}

/// Responses received from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Handshake answer.
    Handshake(HandshakeResponse),
    /// Digital read result.
    DigitalRead(DigitalReadResponse),
    /// Digital write acknowledgement.
    DigitalWrite(DigitalWriteResponse),
    /// Analog read result.
    AnalogRead(AnalogReadResponse),
    /// Analog write acknowledgement.
    AnalogWrite(AnalogWriteResponse),
    /// Pin mode acknowledgement.
    PinMode(PinModeResponse),
    /// Tone acknowledgement.
    Tone(ToneResponse),
    /// Tone stop acknowledgement.
    NoTone(NoToneResponse),
    /// Shift-out acknowledgement.
    ShiftOut(ShiftOutResponse),
    /// Shift-in result.
    ShiftIn(ShiftInResponse),

    /// The peer refused a request.
    Error {
        /// Opcode of the request being refused.
        request_opcode: u8,
        /// Reason reported by the peer.
        code: PeerErrorCode,
    },
}

impl Response {
    /// Kind this response answers. `None` for an error response.
    pub fn kind(&self) -> Option<Kind> {
        let kind = match self {
            Response::Handshake(_) => Kind::Handshake,
            Response::DigitalRead(_) => Kind::DigitalRead,
            Response::DigitalWrite(_) => Kind::DigitalWrite,
            Response::AnalogRead(_) => Kind::AnalogRead,
            Response::AnalogWrite(_) => Kind::AnalogWrite,
            Response::PinMode(_) => Kind::PinMode,
            Response::Tone(_) => Kind::Tone,
            Response::NoTone(_) => Kind::NoTone,
            Response::ShiftOut(_) => Kind::ShiftOut,
            Response::ShiftIn(_) => Kind::ShiftIn,
            Response::Error { .. } => return None,
        };
        Some(kind)
    }

    /// Opcode of this response on the wire.
    pub fn opcode(&self) -> u8 {
        match self.kind() {
            Some(kind) => kind.spec().response_opcode,
            None => OP_ERROR,
        }
    }

    /// Whether the peer reported success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Error { .. })
    }

    /// Serialize the payload fields in wire order.
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);

        match self {
            Response::Handshake(resp) => {
                buf.push(resp.version.major);
                buf.push(resp.version.minor);
            }

            Response::DigitalRead(resp) => {
                buf.push(resp.pin);
                buf.push(resp.level.into());
            }

            Response::DigitalWrite(resp) => {
                buf.push(resp.pin);
                buf.push(resp.level.into());
            }

            Response::AnalogRead(resp) => {
                buf.push(resp.pin);
                buf.extend_from_slice(&resp.value.to_le_bytes());
            }

            Response::AnalogWrite(resp) => {
                buf.push(resp.pin);
                buf.push(resp.duty);
            }

            Response::PinMode(resp) => {
                buf.push(resp.pin);
                buf.push(resp.mode.into());
            }

            Response::Tone(resp) => {
                buf.push(resp.pin);
                buf.extend_from_slice(&resp.frequency_hz.to_le_bytes());
                buf.extend_from_slice(&resp.duration_ms.to_le_bytes());
            }

            Response::NoTone(resp) => {
                buf.push(resp.pin);
            }

            Response::ShiftOut(resp) => {
                buf.push(resp.data_pin);
                buf.push(resp.clock_pin);
                buf.push(resp.bit_order.into());
                buf.push(resp.value);
            }

            Response::ShiftIn(resp) => {
                buf.push(resp.data_pin);
                buf.push(resp.clock_pin);
                buf.push(resp.bit_order.into());
                buf.push(resp.value);
            }

            Response::Error {
                request_opcode,
                code,
            } => {
                buf.push(*request_opcode);
                buf.push((*code).into());
            }
        }

        buf
    }

    /// Encode the response as a complete frame.
    pub fn encode(&self) -> Vec<u8> {
        write_frame(self.opcode(), &self.payload())
    }

    /// Interpret a verified frame as a response.
    pub fn from_frame(frame: &RawFrame) -> Result<Self, FrameError> {
        if frame.opcode == OP_ERROR {
            check_len(frame, ERROR_RESPONSE_LEN)?;
            return Ok(Response::Error {
                request_opcode: frame.payload[0],
                code: PeerErrorCode::from(frame.payload[1]),
            });
        }

        let spec = registry::by_response_opcode(frame.opcode)
            .ok_or(FrameError::UnknownOpcode(frame.opcode))?;
        check_len(frame, spec.response_len)?;

        let mut data = &frame.payload[..];
        let response = match spec.kind {
            Kind::Handshake => {
                let major = data.get_u8();
                let minor = data.get_u8();
                Response::Handshake(HandshakeResponse {
                    version: ProtocolVersion::new(major, minor),
                })
            }

            Kind::DigitalRead => Response::DigitalRead(DigitalReadResponse {
                pin: data.get_u8(),
                level: PinLevel::try_from(data.get_u8())?,
            }),

            Kind::DigitalWrite => Response::DigitalWrite(DigitalWriteResponse {
                pin: data.get_u8(),
                level: PinLevel::try_from(data.get_u8())?,
            }),

            Kind::AnalogRead => Response::AnalogRead(AnalogReadResponse {
                pin: data.get_u8(),
                value: data.get_u16_le(),
            }),

            Kind::AnalogWrite => Response::AnalogWrite(AnalogWriteResponse {
                pin: data.get_u8(),
                duty: data.get_u8(),
            }),

            Kind::PinMode => Response::PinMode(PinModeResponse {
                pin: data.get_u8(),
                mode: PinMode::try_from(data.get_u8())?,
            }),

            Kind::Tone => Response::Tone(ToneResponse {
                pin: data.get_u8(),
                frequency_hz: data.get_u16_le(),
                duration_ms: data.get_u32_le(),
            }),

            Kind::NoTone => Response::NoTone(NoToneResponse { pin: data.get_u8() }),

            Kind::ShiftOut => Response::ShiftOut(ShiftOutResponse {
                data_pin: data.get_u8(),
                clock_pin: data.get_u8(),
                bit_order: BitOrder::try_from(data.get_u8())?,
                value: data.get_u8(),
            }),

            Kind::ShiftIn => Response::ShiftIn(ShiftInResponse {
                data_pin: data.get_u8(),
                clock_pin: data.get_u8(),
                bit_order: BitOrder::try_from(data.get_u8())?,
                value: data.get_u8(),
            }),
        };

        Ok(response)
    }
}

fn check_len(frame: &RawFrame, expected: usize) -> Result<(), FrameError> {
    if frame.payload.len() != expected {
        return Err(FrameError::PayloadLength {
            opcode: frame.opcode,
            expected,
            actual: frame.payload.len(),
        });
    }
    Ok(())
}
