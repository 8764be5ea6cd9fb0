//! Frame encoding/decoding utilities.
//!
//! ```text
//! +--------+-----+-------------------+--------+--------+
//! | opcode | len | payload[0..len]   | sum_lo | sum_hi |
//! +--------+-----+-------------------+--------+--------+
//! ```
//!
//! The checksum covers opcode, length and payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::constants::*;
use crate::error::FrameError;
use crate::registry;
use crate::{Request, Response};

/// A checksum-verified frame whose payload has not been interpreted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Opcode byte.
    pub opcode: u8,
    /// Payload bytes.
    pub payload: Bytes,
}

impl RawFrame {
    /// Parse one frame from the start of `data`.
    ///
    /// Returns the frame and the number of bytes it occupied. Bytes after the
    /// frame are left alone.
    pub fn parse(data: &[u8]) -> Result<(RawFrame, usize), FrameError> {
        if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(FrameError::Truncated {
                expected: HEADER_SIZE + CHECKSUM_SIZE,
                actual: data.len(),
            });
        }

        let len = data[1] as usize;
        let total = HEADER_SIZE + len + CHECKSUM_SIZE;
        if data.len() < total {
            return Err(FrameError::Truncated {
                expected: total,
                actual: data.len(),
            });
        }

        let body = &data[..HEADER_SIZE + len];
        let received = u16::from_le_bytes([data[HEADER_SIZE + len], data[HEADER_SIZE + len + 1]]);
        let computed = checksum::compute(body);
        if received != computed {
            return Err(FrameError::ChecksumMismatch { received, computed });
        }

        let frame = RawFrame {
            opcode: data[0],
            payload: Bytes::copy_from_slice(&body[HEADER_SIZE..]),
        };
        Ok((frame, total))
    }

    /// Serialize this frame with its checksum.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        encode_frame(self.opcode, &self.payload)
    }
}

/// Build a frame from an opcode and payload.
pub fn encode_frame(opcode: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLong {
            max: MAX_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }
    Ok(write_frame(opcode, payload))
}

/// Frame a payload already known to fit the length byte.
pub(crate) fn write_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    buf.put_u8(opcode);
    buf.put_u8(payload.len() as u8);
    buf.extend_from_slice(payload);
    let sum = checksum::compute(&buf);
    buf.put_u16_le(sum);
    buf
}

/// Decode a peer → host frame into a typed response.
pub fn decode_response(data: &[u8]) -> Result<Response, FrameError> {
    let (frame, _) = RawFrame::parse(data)?;
    Response::from_frame(&frame)
}

/// Decode a host → peer frame into a typed request.
pub fn decode_request(data: &[u8]) -> Result<Request, FrameError> {
    let (frame, _) = RawFrame::parse(data)?;
    Request::from_frame(&frame)
}

/// Which side of the link an assembler is listening to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frames sent by the host.
    HostToPeer,
    /// Frames sent by the peer.
    PeerToHost,
}

impl Direction {
    fn accepts(self, opcode: u8) -> bool {
        match self {
            Direction::HostToPeer => registry::is_request_opcode(opcode),
            Direction::PeerToHost => registry::is_response_opcode(opcode),
        }
    }
}

/// Accumulates bytes from a stream and cuts them into frames.
///
/// A frame may only begin on a registered opcode for the direction being
/// read. Any other leading byte is dropped one at a time until one is found.
/// When a complete candidate fails its checksum the entire buffer is dropped,
/// since nothing behind a corrupt frame can be trusted to be aligned.
#[derive(Debug)]
pub struct FrameAssembler {
    direction: Direction,
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Bytes thrown away while hunting for a frame start.
    skipped: usize,
}

impl FrameAssembler {
    /// Create an assembler for the given direction.
    pub fn new(direction: Direction) -> Self {
        FrameAssembler {
            direction,
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
            skipped: 0,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to cut the next frame from the buffer.
    ///
    /// Returns `None` while more data is needed, `Some(Ok(frame))` for a
    /// frame whose checksum verified, and `Some(Err(_))` when a complete
    /// candidate failed verification, in which case the buffer is now empty.
    /// Stray bytes dropped on the way are counted in [`skipped`](Self::skipped).
    pub fn next_frame(&mut self) -> Option<Result<RawFrame, FrameError>> {
        while !self.buffer.is_empty() && !self.direction.accepts(self.buffer[0]) {
            self.buffer.advance(1);
            self.skipped += 1;
        }

        if self.buffer.len() < HEADER_SIZE {
            return None;
        }
        let total = HEADER_SIZE + self.buffer[1] as usize + CHECKSUM_SIZE;
        if self.buffer.len() < total {
            return None;
        }

        match RawFrame::parse(&self.buffer[..total]) {
            Ok((frame, consumed)) => {
                self.buffer.advance(consumed);
                Some(Ok(frame))
            }
            Err(err) => {
                self.buffer.clear();
                Some(Err(err))
            }
        }
    }

    /// Number of bytes waiting in the buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes dropped during resynchronization.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    fn digital_write_response() -> Vec<u8> {
        Response::DigitalWrite(DigitalWriteResponse {
            pin: 13,
            level: PinLevel::High,
        })
        .encode()
    }

    #[test]
    fn test_frame_layout() {
        let encoded = encode_frame(0x03, &[13, 1]).unwrap();
        assert_eq!(encoded.len(), 6);
        assert_eq!(&encoded[..4], &[0x03, 2, 13, 1]);
        let sum = checksum::compute(&encoded[..4]);
        assert_eq!(&encoded[4..], &sum.to_le_bytes());
    }

    #[test]
    fn test_parse_leaves_trailing_bytes() {
        let mut data = encode_frame(0x88, &[9]).unwrap();
        let len = data.len();
        data.extend_from_slice(&[0xAA, 0xBB]);
        let (frame, consumed) = RawFrame::parse(&data).unwrap();
        assert_eq!(consumed, len);
        assert_eq!(frame.opcode, 0x88);
        assert_eq!(&frame.payload[..], &[9]);
        assert_eq!(frame.to_bytes().unwrap(), &data[..len]);
    }

    #[test]
    fn test_decode_truncated() {
        let encoded = digital_write_response();
        assert!(matches!(
            decode_response(&encoded[..1]),
            Err(FrameError::Truncated { expected: 4, actual: 1 })
        ));
        assert!(matches!(
            decode_response(&encoded[..5]),
            Err(FrameError::Truncated { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut encoded = digital_write_response();
        encoded[2] ^= 0x01;
        assert!(matches!(
            decode_response(&encoded),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_opcode() {
        let encoded = encode_frame(0x9F, &[1, 2]).unwrap();
        assert_eq!(decode_response(&encoded), Err(FrameError::UnknownOpcode(0x9F)));
    }

    #[test]
    fn test_decode_wrong_payload_length() {
        let encoded = encode_frame(0x83, &[13]).unwrap();
        assert_eq!(
            decode_response(&encoded),
            Err(FrameError::PayloadLength {
                opcode: 0x83,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_payload_too_long() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            encode_frame(0x01, &payload),
            Err(FrameError::PayloadTooLong { .. })
        ));
        assert!(encode_frame(0x01, &payload[..MAX_PAYLOAD_SIZE]).is_ok());
    }

    #[test]
    fn test_every_single_bit_flip_rejected() {
        let encoded = digital_write_response();
        let body_len = encoded.len() - CHECKSUM_SIZE;
        // Skip the length byte: flipping it changes where the checksum sits
        // and is caught as truncation or a checksum mismatch instead.
        for index in (0..body_len).filter(|&i| i != 1) {
            for bit in 0..8 {
                let mut flipped = encoded.clone();
                flipped[index] ^= 1 << bit;
                assert!(
                    matches!(
                        RawFrame::parse(&flipped),
                        Err(FrameError::ChecksumMismatch { .. })
                    ),
                    "flip of bit {} in byte {} accepted",
                    bit,
                    index
                );
            }
        }
    }

    #[test]
    fn test_assembler_partial() {
        let mut assembler = FrameAssembler::new(Direction::PeerToHost);
        let encoded = digital_write_response();

        assembler.push(&encoded[..3]);
        assert!(assembler.next_frame().is_none());

        assembler.push(&encoded[3..]);
        let frame = assembler.next_frame().expect("frame").expect("valid");
        assert_eq!(frame.opcode, 0x83);
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_assembler_skips_leading_garbage() {
        let mut assembler = FrameAssembler::new(Direction::PeerToHost);
        assembler.push(&[0x00, 0x13, 0x42]);
        assembler.push(&digital_write_response());

        let frame = assembler.next_frame().expect("frame").expect("valid");
        assert_eq!(frame.opcode, 0x83);
        assert_eq!(assembler.skipped(), 3);
    }

    #[test]
    fn test_assembler_multiple() {
        let mut assembler = FrameAssembler::new(Direction::PeerToHost);
        let first = digital_write_response();
        let second = Response::NoTone(NoToneResponse { pin: 8 }).encode();
        assembler.push(&first);
        assembler.push(&second);

        assert_eq!(assembler.next_frame().unwrap().unwrap().opcode, 0x83);
        assert_eq!(assembler.next_frame().unwrap().unwrap().opcode, 0x88);
        assert!(assembler.next_frame().is_none());
    }

    #[test]
    fn test_assembler_drops_buffer_on_corruption() {
        let mut assembler = FrameAssembler::new(Direction::PeerToHost);
        let mut corrupt = digital_write_response();
        corrupt[3] ^= 0x10;
        assembler.push(&corrupt);
        assembler.push(&digital_write_response());

        assert!(matches!(
            assembler.next_frame(),
            Some(Err(FrameError::ChecksumMismatch { .. }))
        ));
        assert_eq!(assembler.buffered_len(), 0);
        assert!(assembler.next_frame().is_none());
    }

    #[test]
    fn test_assembler_direction() {
        let request = Request::from(NoToneRequest { pin: 3 }).encode();

        let mut host_side = FrameAssembler::new(Direction::PeerToHost);
        host_side.push(&request);
        // 0x08 is not a response opcode, so the whole request is skipped over.
        assert!(host_side.next_frame().is_none());

        let mut peer_side = FrameAssembler::new(Direction::HostToPeer);
        peer_side.push(&request);
        assert_eq!(peer_side.next_frame().unwrap().unwrap().opcode, 0x08);
    }
}
