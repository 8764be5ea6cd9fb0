//! Driver facade.
//!
//! Brings a session up in order (resolve profile, open port, wait out the
//! board's reset, handshake) and exposes one blocking call per request kind.
//!
//! ```text
//! Uninitialized → PortOpening → Handshaking → Ready → Closed
//! ```
//!
//! A failed handshake closes the port and fails construction; a driver is
//! never retried in place.

use std::thread;
use std::time::Duration;

use pinwire_protocol::*;
use tracing::{debug, error, info, warn};

use crate::config::DriverConfig;
use crate::engine::Engine;
use crate::error::{DriverError, DriverResult};
use crate::handshake::{self, PeerInfo};
use crate::profile::DeviceProfile;
use crate::telemetry::Telemetry;
use crate::transport::{SerialTransport, Transport};

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Configuration accepted, nothing opened yet.
    Uninitialized,
    /// Opening the transport.
    PortOpening,
    /// Waiting out the startup grace period and negotiating the version.
    Handshaking,
    /// Accepting requests.
    Ready,
    /// Transport released.
    Closed,
}

fn advance(telemetry: &Telemetry, state: &mut DriverState, next: DriverState) {
    telemetry.scope(|| debug!(from = ?*state, to = ?next, "driver state"));
    *state = next;
}

/// Host-side handle to one microcontroller.
///
/// Owns its transport exclusively. Calls block for at most
/// `(read timeout + write timeout) × attempts`. The type is `Send` but not
/// internally synchronized; wrap it in a mutex to share it between threads.
pub struct Driver<T: Transport = SerialTransport> {
    engine: Engine<T>,
    state: DriverState,
    model: String,
    profile: DeviceProfile,
    peer: PeerInfo,
    request_attempts: u32,
}

impl Driver<SerialTransport> {
    /// Open the serial port named in `config` and bring the session up.
    pub fn open(config: DriverConfig) -> DriverResult<Self> {
        Driver::open_with(config, |port, profile, timeout| {
            SerialTransport::open(port, profile.baud_rate, timeout)
        })
    }
}

impl<T: Transport> Driver<T> {
    /// Bring a session up over the transport returned by `connect`.
    ///
    /// `connect` receives the port name, the resolved profile and the read
    /// timeout, and is called exactly once.
    pub fn open_with<F>(config: DriverConfig, connect: F) -> DriverResult<Self>
    where
        F: FnOnce(&str, &DeviceProfile, Duration) -> DriverResult<T>,
    {
        let telemetry = Telemetry::new(config.dispatch.clone(), &config.port, &config.model);
        let profile = config.resolved_profile();
        let mut state = DriverState::Uninitialized;

        if config.auto_bootstrap || profile.requires_redeploy {
            telemetry.scope(|| warn!("firmware deployment requested but not supported"));
            return Err(DriverError::BootstrapUnsupported {
                model: config.model.clone(),
            });
        }

        advance(&telemetry, &mut state, DriverState::PortOpening);
        let transport = connect(&config.port, &profile, config.read_timeout)?;
        let mut engine = Engine::new(transport, config.engine_config(), telemetry.clone());
        telemetry.scope(|| info!(baud_rate = profile.baud_rate, "port open"));

        advance(&telemetry, &mut state, DriverState::Handshaking);
        let grace = profile.startup_grace();
        if !grace.is_zero() {
            telemetry.scope(|| info!(?grace, "waiting for board to finish reset"));
            thread::sleep(grace);
        }

        let peer = match handshake::negotiate(&mut engine, config.handshake_attempts) {
            Ok(peer) => peer,
            Err(err) => {
                telemetry.scope(|| error!(error = %err, "initialization failed"));
                if let Err(close_err) = engine.transport_mut().close() {
                    telemetry.scope(|| warn!(error = %close_err, "error closing port"));
                }
                return Err(err);
            }
        };

        advance(&telemetry, &mut state, DriverState::Ready);
        Ok(Driver {
            engine,
            state,
            model: config.model,
            profile,
            peer,
            request_attempts: config.request_attempts,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Board model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Profile resolved at construction.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Peer identity learned during the handshake.
    pub fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    /// Port name.
    pub fn port(&self) -> &str {
        &self.peer.port
    }

    /// Send any request with the configured attempt budget.
    pub fn send(&mut self, request: impl Into<Request>) -> DriverResult<Response> {
        let attempts = self.request_attempts;
        self.send_with_attempts(request, attempts)
    }

    /// Send any request with an explicit attempt budget.
    pub fn send_with_attempts(
        &mut self,
        request: impl Into<Request>,
        attempts: u32,
    ) -> DriverResult<Response> {
        if self.state != DriverState::Ready {
            return Err(DriverError::Closed);
        }
        self.engine.send(&request.into(), attempts)
    }

    /// Read a digital pin.
    pub fn digital_read(&mut self, request: DigitalReadRequest) -> DriverResult<DigitalReadResponse> {
        match self.send(request)? {
            Response::DigitalRead(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::DigitalRead, &other)),
        }
    }

    /// Drive a digital pin.
    pub fn digital_write(
        &mut self,
        request: DigitalWriteRequest,
    ) -> DriverResult<DigitalWriteResponse> {
        match self.send(request)? {
            Response::DigitalWrite(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::DigitalWrite, &other)),
        }
    }

    /// Sample an analog input.
    pub fn analog_read(&mut self, request: AnalogReadRequest) -> DriverResult<AnalogReadResponse> {
        match self.send(request)? {
            Response::AnalogRead(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::AnalogRead, &other)),
        }
    }

    /// Set a PWM duty cycle.
    pub fn analog_write(
        &mut self,
        request: AnalogWriteRequest,
    ) -> DriverResult<AnalogWriteResponse> {
        match self.send(request)? {
            Response::AnalogWrite(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::AnalogWrite, &other)),
        }
    }

    /// Configure a pin.
    pub fn pin_mode(&mut self, request: PinModeRequest) -> DriverResult<PinModeResponse> {
        match self.send(request)? {
            Response::PinMode(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::PinMode, &other)),
        }
    }

    /// Start a tone.
    pub fn tone(&mut self, request: ToneRequest) -> DriverResult<ToneResponse> {
        match self.send(request)? {
            Response::Tone(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::Tone, &other)),
        }
    }

    /// Stop a tone.
    pub fn no_tone(&mut self, request: NoToneRequest) -> DriverResult<NoToneResponse> {
        match self.send(request)? {
            Response::NoTone(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::NoTone, &other)),
        }
    }

    /// Clock a byte out.
    pub fn shift_out(&mut self, request: ShiftOutRequest) -> DriverResult<ShiftOutResponse> {
        match self.send(request)? {
            Response::ShiftOut(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::ShiftOut, &other)),
        }
    }

    /// Clock a byte in.
    pub fn shift_in(&mut self, request: ShiftInRequest) -> DriverResult<ShiftInResponse> {
        match self.send(request)? {
            Response::ShiftIn(resp) => Ok(resp),
            other => Err(self.unexpected(Kind::ShiftIn, &other)),
        }
    }

    /// The engine only returns a response of the requested kind, so reaching
    /// this is a bug, not a line fault.
    fn unexpected(&self, expected: Kind, actual: &Response) -> DriverError {
        self.engine.telemetry().scope(|| {
            error!(%expected, actual = ?actual, "engine returned wrong response variant")
        });
        DriverError::UnexpectedResponse {
            expected,
            actual: actual.kind(),
        }
    }

    /// Release the transport. Errors while closing are logged, not returned.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.state == DriverState::Closed {
            return;
        }
        let telemetry = self.engine.telemetry().clone();
        let result = self.engine.transport_mut().close();
        telemetry.scope(|| match result {
            Ok(()) => info!("port closed"),
            Err(err) => warn!(error = %err, "error closing port"),
        });
        advance(&telemetry, &mut self.state, DriverState::Closed);
    }
}

impl<T: Transport> Drop for Driver<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Transport> std::fmt::Debug for Driver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("port", &self.peer.port)
            .field("model", &self.model)
            .field("state", &self.state)
            .field("peer_version", &self.peer.version)
            .finish()
    }
}
