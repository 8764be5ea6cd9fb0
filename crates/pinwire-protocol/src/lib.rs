//! Pinwire Serial Protocol
//!
//! This crate provides the wire types and codecs for driving a microcontroller
//! over a byte-stream link. The host sends one request frame and the peer
//! answers with exactly one response frame.
//!
//! # Protocol Overview
//!
//! Every frame, in either direction, has the same layout:
//!
//! ```text
//! +--------+-----+-------------------+-------------+
//! | opcode | len | payload[0..len]   | fletcher16  |
//! +--------+-----+-------------------+-------------+
//!    1 B     1 B      len bytes          2 B (LE)
//! ```
//!
//! - **Requests** (host → peer): opcodes `0x01..=0x0A`
//! - **Responses** (peer → host): the request opcode with bit 7 set
//! - **Error response** (peer → host): `0xEE`, payload `[request opcode, code]`
//!
//! Payload layouts for each kind live in the [`registry`] table, which both
//! the codecs and the host driver consult.
//!
//! # Example
//!
//! ```rust
//! use pinwire_protocol::{DigitalWriteRequest, PinLevel, Request};
//!
//! let request = Request::from(DigitalWriteRequest { pin: 13, level: PinLevel::High });
//! let frame = request.encode();
//! assert_eq!(&frame[..4], &[0x03, 2, 13, 1]);
//! ```

pub mod checksum;
mod constants;
mod error;
mod frame;
pub mod registry;
mod requests;
mod responses;
mod types;

pub use constants::*;
pub use error::*;
pub use frame::*;
pub use registry::{Kind, KindSpec};
pub use requests::*;
pub use responses::*;
pub use types::*;
