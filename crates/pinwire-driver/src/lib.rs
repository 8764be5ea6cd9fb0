//! # pinwire-driver
//!
//! Blocking host driver for a microcontroller that speaks the pinwire serial
//! protocol. Each call writes one request frame and waits for exactly one
//! response, retrying over a noisy link within a bounded attempt budget.
//!
//! ## Layers
//!
//! - [`Transport`]: the byte stream ([`SerialTransport`] or [`sim::SimulatedBoard`])
//! - [`Engine`]: framing, per-attempt timeouts, retries, response matching
//! - [`handshake`]: one-time protocol version check
//! - [`Driver`]: session lifecycle and one typed call per request kind
//!
//! ## Example
//!
//! ```no_run
//! use pinwire_driver::{DeviceModel, Driver, DriverConfig};
//! use pinwire_protocol::{DigitalWriteRequest, PinLevel};
//!
//! let config = DriverConfig::new("/dev/ttyACM0", DeviceModel::Uno);
//! let mut driver = Driver::open(config)?;
//! let ack = driver.digital_write(DigitalWriteRequest { pin: 13, level: PinLevel::High })?;
//! assert_eq!(ack.level, PinLevel::High);
//! driver.close();
//! # Ok::<(), pinwire_driver::DriverError>(())
//! ```

mod config;
mod driver;
mod engine;
mod error;
pub mod handshake;
mod profile;
pub mod sim;
pub mod telemetry;
mod transport;

pub use config::DriverConfig;
pub use driver::{Driver, DriverState};
pub use engine::{
    Engine, EngineConfig, RetryBudget, DEFAULT_READ_TIMEOUT, DEFAULT_REQUEST_ATTEMPTS,
    DEFAULT_WRITE_TIMEOUT,
};
pub use error::{AttemptError, DriverError, DriverResult, ErrorKind};
pub use handshake::{PeerInfo, DEFAULT_HANDSHAKE_ATTEMPTS};
pub use profile::{DeviceModel, DeviceProfile, ProfileTable, AUTO_RESET_GRACE_MS, DEFAULT_BAUD_RATE};
pub use telemetry::Telemetry;
pub use transport::{SerialTransport, Transport};
