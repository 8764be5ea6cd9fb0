//! Shared helpers for driver integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pinwire_driver::sim::{SimHandle, SimulatedBoard};
use pinwire_driver::{
    DeviceModel, Driver, DriverConfig, DriverResult, Engine, EngineConfig, Telemetry,
};
use tracing_subscriber::fmt::MakeWriter;

/// Port name every simulated board reports.
pub const SIM_PORT: &str = "sim0";

/// Short timeouts so failing paths finish quickly.
pub const FAST_TIMEOUT: Duration = Duration::from_millis(30);

/// Config for a board with no startup grace and short timeouts.
pub fn fast_config() -> DriverConfig {
    DriverConfig::new(SIM_PORT, DeviceModel::Leonardo).with_timeouts(FAST_TIMEOUT, FAST_TIMEOUT)
}

/// Open a driver against a fresh simulated board.
pub fn open_sim(config: DriverConfig) -> (DriverResult<Driver<SimulatedBoard>>, SimHandle) {
    let (board, handle) = SimulatedBoard::new(SIM_PORT);
    (open_board(config, board), handle)
}

/// Open a driver against a prepared board.
pub fn open_board(config: DriverConfig, board: SimulatedBoard) -> DriverResult<Driver<SimulatedBoard>> {
    Driver::open_with(config, move |_, _, _| Ok(board))
}

/// A bare engine over a fresh simulated board.
pub fn sim_engine(read_timeout: Duration) -> (Engine<SimulatedBoard>, SimHandle) {
    let (board, handle) = SimulatedBoard::new(SIM_PORT);
    let config = EngineConfig {
        read_timeout,
        write_timeout: FAST_TIMEOUT,
    };
    (Engine::new(board, config, Telemetry::current(SIM_PORT)), handle)
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).to_string()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
