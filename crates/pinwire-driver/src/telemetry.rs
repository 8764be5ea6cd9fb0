//! Logging and metrics plumbing.
//!
//! Logging goes through `tracing`. The subscriber is injected: a driver built
//! with a [`Dispatch`] routes every event it emits to that dispatch, with no
//! reliance on a process-wide default. Metrics go through the `metrics`
//! facade; no exporter is installed here.

use metrics::{describe_counter, describe_histogram, Unit};
use tracing::{Dispatch, Span};

/// Write attempts, labelled by `kind`.
pub const ENGINE_ATTEMPTS: &str = "pinwire.engine.attempts";
/// Failed attempts, labelled by `kind` and `reason`.
pub const ENGINE_ATTEMPT_FAILURES: &str = "pinwire.engine.attempt_failures";
/// Completed `send` calls, labelled by `kind` and `outcome`.
pub const ENGINE_SENDS: &str = "pinwire.engine.sends";
/// Time from first write to decoded response, labelled by `kind`.
pub const ENGINE_ROUND_TRIP: &str = "pinwire.engine.round_trip_seconds";

/// Register descriptions for every metric the driver records.
pub fn describe_metrics() {
    describe_counter!(ENGINE_ATTEMPTS, Unit::Count, "Request frames written to the transport");
    describe_counter!(
        ENGINE_ATTEMPT_FAILURES,
        Unit::Count,
        "Attempts that ended in timeout, corruption or mismatch"
    );
    describe_counter!(ENGINE_SENDS, Unit::Count, "Logical send calls by outcome");
    describe_histogram!(
        ENGINE_ROUND_TRIP,
        Unit::Seconds,
        "Latency of successful send calls including retries"
    );
}

/// Injected logging capability: an optional dispatch plus the span every
/// driver event is recorded under.
#[derive(Clone, Debug)]
pub struct Telemetry {
    dispatch: Option<Dispatch>,
    span: Span,
}

impl Telemetry {
    /// Log to `dispatch` if given, otherwise to the caller's current default.
    pub fn new(dispatch: Option<Dispatch>, port: &str, model: &str) -> Self {
        let make_span = || tracing::info_span!("pinwire", port = %port, model = %model);
        let span = match &dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, make_span),
            None => make_span(),
        };
        Telemetry { dispatch, span }
    }

    /// Log to whatever subscriber is current, under a span for `port`.
    pub fn current(port: &str) -> Self {
        Telemetry::new(None, port, "unknown")
    }

    /// Run `f` with this telemetry's dispatch and span active.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.span.in_scope(f)),
            None => self.span.in_scope(f),
        }
    }
}
