//! Protocol engine.
//!
//! Owns the transport and turns one [`Request`] into exactly one
//! [`Response`]. Each attempt is a full cycle: drop stale input, write the
//! whole frame, then wait up to the read timeout for one frame to come back.
//! Failed attempts are retried from scratch until the budget runs out.

use std::io;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use pinwire_protocol::{
    Direction, FrameAssembler, Kind, RawFrame, Request, Response, MAX_FRAME_SIZE,
};
use tracing::{debug, trace};

use crate::error::{AttemptError, DriverError, DriverResult};
use crate::telemetry::{
    Telemetry, ENGINE_ATTEMPTS, ENGINE_ATTEMPT_FAILURES, ENGINE_ROUND_TRIP, ENGINE_SENDS,
};
use crate::transport::Transport;

/// Default per-attempt read window.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Default per-attempt write window.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);
/// Attempts allowed for an ordinary request.
pub const DEFAULT_REQUEST_ATTEMPTS: u32 = 1;

/// Timing parameters for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long one attempt waits for a complete response frame.
    pub read_timeout: Duration,
    /// How long one attempt may spend writing its frame.
    pub write_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Longest a `send` with `attempts` attempts can block.
    pub fn worst_case(&self, attempts: u32) -> Duration {
        (self.read_timeout + self.write_timeout) * attempts.max(1)
    }
}

/// Attempts remaining for one logical `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    limit: u32,
    used: u32,
}

impl RetryBudget {
    /// A budget of `limit` attempts. Zero is treated as one.
    pub fn new(limit: u32) -> Self {
        RetryBudget {
            limit: limit.max(1),
            used: 0,
        }
    }

    /// Claim the next attempt, returning its 1-based number.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.used < self.limit {
            self.used += 1;
            Some(self.used)
        } else {
            None
        }
    }

    /// Attempts claimed so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Attempts allowed in total.
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// How an attempt ended when it did not produce a response.
enum Failure {
    /// Worth another attempt.
    Retry(AttemptError),
    /// Ends the `send` call immediately.
    Fatal(DriverError),
}

impl From<AttemptError> for Failure {
    fn from(err: AttemptError) -> Self {
        Failure::Retry(err)
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Blocking request/response engine over a [`Transport`].
///
/// Strictly half-duplex: one request is outstanding at a time, enforced by
/// `&mut self`. Callers sharing an engine across threads must serialize
/// access themselves.
pub struct Engine<T: Transport> {
    transport: T,
    assembler: FrameAssembler,
    config: EngineConfig,
    telemetry: Telemetry,
}

impl<T: Transport> Engine<T> {
    /// Create an engine that owns `transport`.
    pub fn new(transport: T, config: EngineConfig, telemetry: Telemetry) -> Self {
        Engine {
            transport,
            assembler: FrameAssembler::new(Direction::PeerToHost),
            config,
            telemetry,
        }
    }

    /// Engine timing parameters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Logging capability this engine emits through.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the engine and return the underlying transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send `request` and block until its response arrives or `max_attempts`
    /// attempts have failed.
    ///
    /// Timeouts, corrupt frames and mismatched responses are retried. A peer
    /// error response naming this request ends the call with
    /// [`DriverError::PeerRejected`]; transport faults other than timeouts end
    /// it with [`DriverError::Io`].
    pub fn send(&mut self, request: &Request, max_attempts: u32) -> DriverResult<Response> {
        let telemetry = self.telemetry.clone();
        telemetry.scope(|| self.send_inner(request, max_attempts))
    }

    fn send_inner(&mut self, request: &Request, max_attempts: u32) -> DriverResult<Response> {
        let kind = request.kind();
        let frame = request.encode();
        let mut budget = RetryBudget::new(max_attempts);
        let started = Instant::now();
        let mut last = AttemptError::Timeout;

        while let Some(attempt) = budget.next_attempt() {
            counter!(ENGINE_ATTEMPTS, "kind" => kind.name()).increment(1);
            trace!(%kind, attempt, bytes = ?frame, "writing request frame");

            match self.attempt(kind, &frame) {
                Ok(response) => {
                    let elapsed = started.elapsed();
                    debug!(%kind, attempt, ?elapsed, "response received");
                    counter!(ENGINE_SENDS, "kind" => kind.name(), "outcome" => "ok").increment(1);
                    histogram!(ENGINE_ROUND_TRIP, "kind" => kind.name())
                        .record(elapsed.as_secs_f64());
                    return Ok(response);
                }
                Err(Failure::Retry(err)) => {
                    debug!(
                        %kind,
                        attempt,
                        limit = budget.limit(),
                        error = %err,
                        "attempt failed"
                    );
                    counter!(
                        ENGINE_ATTEMPT_FAILURES,
                        "kind" => kind.name(),
                        "reason" => failure_label(&err)
                    )
                    .increment(1);
                    last = err;
                }
                Err(Failure::Fatal(err)) => {
                    debug!(%kind, attempt, error = %err, "send aborted");
                    counter!(ENGINE_SENDS, "kind" => kind.name(), "outcome" => "fatal")
                        .increment(1);
                    return Err(err);
                }
            }
        }

        counter!(ENGINE_SENDS, "kind" => kind.name(), "outcome" => "exhausted").increment(1);
        Err(DriverError::Exhausted {
            kind,
            attempts: budget.used(),
            last,
        })
    }

    /// One full write-and-wait cycle.
    fn attempt(&mut self, kind: Kind, frame: &[u8]) -> Result<Response, Failure> {
        // Stale bytes from an earlier attempt must not answer this one.
        self.assembler.clear();
        self.transport
            .discard_input()
            .map_err(|e| Failure::Fatal(e.into()))?;

        self.write(frame)?;
        let raw = self.receive()?;

        let response = Response::from_frame(&raw).map_err(|e| {
            trace!(
                discarded = self.assembler.buffered_len(),
                error = %e,
                "discarding receive buffer after undecodable frame"
            );
            self.assembler.clear();
            AttemptError::Corrupt(e)
        })?;
        trace!(opcode = raw.opcode, payload = ?&raw.payload[..], "response frame");

        let spec = kind.spec();
        match response {
            Response::Error {
                request_opcode,
                code,
            } if request_opcode == spec.request_opcode => {
                Err(Failure::Fatal(DriverError::PeerRejected { kind, code }))
            }
            response if response.kind() == Some(kind) => Ok(response),
            stray => Err(AttemptError::Mismatch {
                expected: kind,
                actual: stray.opcode(),
            }
            .into()),
        }
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), Failure> {
        let timeout = self.config.write_timeout;
        let result = self
            .transport
            .write_all(frame, timeout)
            .and_then(|()| self.transport.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_timeout(&e) => Err(AttemptError::Timeout.into()),
            Err(e) => Err(Failure::Fatal(e.into())),
        }
    }

    /// Read until one frame is assembled or the read window closes.
    fn receive(&mut self) -> Result<RawFrame, Failure> {
        let deadline = Instant::now() + self.config.read_timeout;
        let mut buf = [0u8; MAX_FRAME_SIZE];

        loop {
            let skipped = self.assembler.skipped();
            let buffered = self.assembler.buffered_len();
            let next = self.assembler.next_frame();

            let stray = self.assembler.skipped() - skipped;
            if stray > 0 {
                trace!(stray, "resync: dropped bytes ahead of frame start");
            }
            if let Some(result) = next {
                return result.map_err(|e| {
                    trace!(
                        discarded = buffered - stray,
                        error = %e,
                        "discarding receive buffer after corrupt frame"
                    );
                    AttemptError::Corrupt(e).into()
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AttemptError::Timeout.into());
            }

            match self.transport.read(&mut buf, deadline - now) {
                Ok(0) => {}
                Ok(n) => {
                    trace!(bytes = ?&buf[..n], "received");
                    self.assembler.push(&buf[..n]);
                }
                Err(e) if is_timeout(&e) => {}
                Err(e) => return Err(Failure::Fatal(e.into())),
            }
        }
    }
}

fn failure_label(err: &AttemptError) -> &'static str {
    match err {
        AttemptError::Timeout => "timeout",
        AttemptError::Corrupt(_) => "corrupt",
        AttemptError::Mismatch { .. } => "mismatch",
    }
}

impl<T: Transport> std::fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("transport", &self.transport.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_budget_counts_attempts() {
        let mut budget = RetryBudget::new(3);
        assert_eq!(budget.next_attempt(), Some(1));
        assert_eq!(budget.next_attempt(), Some(2));
        assert_eq!(budget.next_attempt(), Some(3));
        assert_eq!(budget.next_attempt(), None);
        assert_eq!(budget.used(), 3);
    }

    #[test]
    fn test_zero_budget_still_allows_one_attempt() {
        let mut budget = RetryBudget::new(0);
        assert_eq!(budget.limit(), 1);
        assert_eq!(budget.next_attempt(), Some(1));
        assert_eq!(budget.next_attempt(), None);
    }

    #[test]
    fn test_worst_case_bound() {
        let config = EngineConfig::default();
        assert_eq!(config.worst_case(1), Duration::from_millis(200));
        assert_eq!(config.worst_case(3), Duration::from_millis(600));
    }
}
