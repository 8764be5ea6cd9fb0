//! In-memory peer for tests and dry runs.
//!
//! [`SimulatedBoard`] implements [`Transport`] by playing the firmware side of
//! the protocol: request frames written to it are decoded, applied to a small
//! model of the board's pins, and answered with response frames that the next
//! `read` returns. A cloned [`SimHandle`] stays with the caller after the
//! board is moved into a driver, for fault injection and inspection.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pinwire_protocol::*;

use crate::transport::Transport;

/// Pins modelled by the simulator (an Uno has 20).
pub const PIN_COUNT: usize = 20;

/// Misbehaviour to inject. Counters are consumed one response at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// Ignore this many upcoming requests entirely.
    pub silent_requests: u32,
    /// Never answer anything.
    pub mute: bool,
    /// Flip a payload bit in this many upcoming responses.
    pub corrupt_responses: u32,
    /// Answer this many upcoming requests with a response of another kind.
    pub wrong_kind_responses: u32,
    /// Bytes written ahead of every response.
    pub garbage_prefix: Vec<u8>,
    /// Refuse every non-handshake request with this code.
    pub reject_with: Option<PeerErrorCode>,
    /// Make `close` report an error.
    pub fail_close: bool,
}

/// Observable state of the simulated board.
#[derive(Debug, Clone)]
pub struct BoardState {
    /// Version reported in handshake responses.
    pub version: ProtocolVersion,
    /// Current digital level of every pin.
    pub levels: [PinLevel; PIN_COUNT],
    /// Current mode of every pin.
    pub modes: [PinMode; PIN_COUNT],
    /// Analog input reading of every pin.
    pub analog_inputs: [u16; PIN_COUNT],
    /// PWM duty of every pin.
    pub duties: [u8; PIN_COUNT],
    /// Active tones by pin: (frequency, duration).
    pub tones: HashMap<u8, (u16, u32)>,
    /// Bytes received through shift-out, oldest first.
    pub shifted_out: Vec<u8>,
    /// Bytes to return from shift-in, oldest first. Empty yields zero.
    pub shift_in_queue: VecDeque<u8>,
    /// Faults to inject.
    pub faults: Faults,
    /// Every decoded request, in arrival order.
    pub requests: Vec<Request>,
    /// Time of every `write_all` call.
    pub writes: Vec<Instant>,
    /// Whether the transport has been closed.
    pub closed: bool,
}

impl Default for BoardState {
    fn default() -> Self {
        BoardState {
            version: ProtocolVersion::CURRENT,
            levels: [PinLevel::Low; PIN_COUNT],
            modes: [PinMode::Input; PIN_COUNT],
            analog_inputs: [0; PIN_COUNT],
            duties: [0; PIN_COUNT],
            tones: HashMap::new(),
            shifted_out: Vec::new(),
            shift_in_queue: VecDeque::new(),
            faults: Faults::default(),
            requests: Vec::new(),
            writes: Vec::new(),
            closed: false,
        }
    }
}

/// Shared view of a [`SimulatedBoard`].
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    state: Arc<Mutex<BoardState>>,
}

impl SimHandle {
    /// Run `f` with the board state locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Replace the injected faults.
    pub fn set_faults(&self, faults: Faults) {
        self.state.lock().faults = faults;
    }

    /// Set the version reported by handshakes.
    pub fn set_version(&self, version: ProtocolVersion) {
        self.state.lock().version = version;
    }

    /// Drive an input pin from outside the board. Returns `false` if the
    /// board has no such pin.
    pub fn set_input_level(&self, pin: u8, level: PinLevel) -> bool {
        pin_index(pin)
            .map(|i| self.state.lock().levels[i] = level)
            .is_some()
    }

    /// Set the reading an analog pin will report. Returns `false` if the
    /// board has no such pin.
    pub fn set_analog_input(&self, pin: u8, value: u16) -> bool {
        pin_index(pin)
            .map(|i| self.state.lock().analog_inputs[i] = value)
            .is_some()
    }

    /// Number of `write_all` calls so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Time of every `write_all` call.
    pub fn write_times(&self) -> Vec<Instant> {
        self.state.lock().writes.clone()
    }

    /// Every decoded request, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Whether the board's transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// A microcontroller simulated in memory, reachable as a [`Transport`].
#[derive(Debug)]
pub struct SimulatedBoard {
    name: String,
    handle: SimHandle,
    assembler: FrameAssembler,
    outbound: VecDeque<u8>,
    /// Requests arriving before this instant are ignored, as a rebooting
    /// board would.
    ready_at: Instant,
}

impl SimulatedBoard {
    /// A board that answers immediately.
    pub fn new(name: &str) -> (Self, SimHandle) {
        SimulatedBoard::booting(name, Duration::ZERO)
    }

    /// A board that ignores all traffic for `boot_time` after creation.
    pub fn booting(name: &str, boot_time: Duration) -> (Self, SimHandle) {
        let handle = SimHandle::default();
        let board = SimulatedBoard {
            name: name.to_string(),
            handle: handle.clone(),
            assembler: FrameAssembler::new(Direction::HostToPeer),
            outbound: VecDeque::new(),
            ready_at: Instant::now() + boot_time,
        };
        (board, handle)
    }

    fn handle_request(&mut self, request: Request) {
        let mut state = self.handle.state.lock();
        state.requests.push(request);

        if Instant::now() < self.ready_at || state.faults.mute {
            return;
        }
        if state.faults.silent_requests > 0 {
            state.faults.silent_requests -= 1;
            return;
        }

        let mut response = match state.faults.reject_with {
            Some(code) if request != Request::Handshake => Response::Error {
                request_opcode: request.opcode(),
                code,
            },
            _ => apply(&mut state, &request),
        };

        if state.faults.wrong_kind_responses > 0 {
            state.faults.wrong_kind_responses -= 1;
            response = if response.kind() == Some(Kind::NoTone) {
                Response::DigitalRead(DigitalReadResponse { pin: 0, level: PinLevel::Low })
            } else {
                Response::NoTone(NoToneResponse { pin: 0 })
            };
        }

        let mut frame = response.encode();
        if state.faults.corrupt_responses > 0 {
            state.faults.corrupt_responses -= 1;
            // Every response has at least one payload byte.
            frame[HEADER_SIZE] ^= 0x01;
        }

        self.outbound.extend(state.faults.garbage_prefix.iter().copied());
        self.outbound.extend(frame);
    }
}

fn pin_index(pin: u8) -> Option<usize> {
    let index = pin as usize;
    (index < PIN_COUNT).then_some(index)
}

/// Apply a request to the board model and build its answer.
fn apply(state: &mut BoardState, request: &Request) -> Response {
    let invalid_pin = Response::Error {
        request_opcode: request.opcode(),
        code: PeerErrorCode::InvalidPin,
    };

    match *request {
        Request::Handshake => Response::Handshake(HandshakeResponse {
            version: state.version,
        }),

        Request::DigitalRead(req) => match pin_index(req.pin) {
            Some(i) => Response::DigitalRead(DigitalReadResponse {
                pin: req.pin,
                level: state.levels[i],
            }),
            None => invalid_pin,
        },

        Request::DigitalWrite(req) => match pin_index(req.pin) {
            Some(i) => {
                state.levels[i] = req.level;
                Response::DigitalWrite(DigitalWriteResponse {
                    pin: req.pin,
                    level: req.level,
                })
            }
            None => invalid_pin,
        },

        Request::AnalogRead(req) => match pin_index(req.pin) {
            Some(i) => Response::AnalogRead(AnalogReadResponse {
                pin: req.pin,
                value: state.analog_inputs[i].min(ANALOG_READ_MAX),
            }),
            None => invalid_pin,
        },

        Request::AnalogWrite(req) => match pin_index(req.pin) {
            Some(i) => {
                state.duties[i] = req.duty;
                Response::AnalogWrite(AnalogWriteResponse {
                    pin: req.pin,
                    duty: req.duty,
                })
            }
            None => invalid_pin,
        },

        Request::PinMode(req) => match pin_index(req.pin) {
            Some(i) => {
                state.modes[i] = req.mode;
                if req.mode == PinMode::InputPullup {
                    state.levels[i] = PinLevel::High;
                }
                Response::PinMode(PinModeResponse {
                    pin: req.pin,
                    mode: req.mode,
                })
            }
            None => invalid_pin,
        },

        Request::Tone(req) => match pin_index(req.pin) {
            Some(_) if req.frequency_hz == 0 => Response::Error {
                request_opcode: request.opcode(),
                code: PeerErrorCode::InvalidArgument,
            },
            Some(_) => {
                state.tones.insert(req.pin, (req.frequency_hz, req.duration_ms));
                Response::Tone(ToneResponse {
                    pin: req.pin,
                    frequency_hz: req.frequency_hz,
                    duration_ms: req.duration_ms,
                })
            }
            None => invalid_pin,
        },

        Request::NoTone(req) => match pin_index(req.pin) {
            Some(_) => {
                state.tones.remove(&req.pin);
                Response::NoTone(NoToneResponse { pin: req.pin })
            }
            None => invalid_pin,
        },

        Request::ShiftOut(req) => match (pin_index(req.data_pin), pin_index(req.clock_pin)) {
            (Some(_), Some(_)) => {
                state.shifted_out.push(req.value);
                Response::ShiftOut(ShiftOutResponse {
                    data_pin: req.data_pin,
                    clock_pin: req.clock_pin,
                    bit_order: req.bit_order,
                    value: req.value,
                })
            }
            _ => invalid_pin,
        },

        Request::ShiftIn(req) => match (pin_index(req.data_pin), pin_index(req.clock_pin)) {
            (Some(_), Some(_)) => Response::ShiftIn(ShiftInResponse {
                data_pin: req.data_pin,
                clock_pin: req.clock_pin,
                bit_order: req.bit_order,
                value: state.shift_in_queue.pop_front().unwrap_or(0),
            }),
            _ => invalid_pin,
        },
    }
}

impl Transport for SimulatedBoard {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, bytes: &[u8], _timeout: Duration) -> io::Result<()> {
        {
            let mut state = self.handle.state.lock();
            if state.closed {
                return Err(io::ErrorKind::NotConnected.into());
            }
            state.writes.push(Instant::now());
        }

        self.assembler.push(bytes);
        while let Some(result) = self.assembler.next_frame() {
            // Firmware drops frames it cannot verify and waits for the next.
            if let Ok(request) = result.and_then(|frame| Request::from_frame(&frame)) {
                self.handle_request(request);
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if self.handle.is_closed() {
            return Err(io::ErrorKind::NotConnected.into());
        }
        if self.outbound.is_empty() {
            thread::sleep(timeout);
            return Err(io::ErrorKind::TimedOut.into());
        }
        let n = buf.len().min(self.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.outbound.clear();
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let mut state = self.handle.state.lock();
        state.closed = true;
        if state.faults.fail_close {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated close failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(board: &mut SimulatedBoard, request: Request) -> Response {
        board.write_all(&request.encode(), Duration::ZERO).unwrap();
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let n = board.read(&mut buf, Duration::from_millis(1)).unwrap();
        decode_response(&buf[..n]).unwrap()
    }

    #[test]
    fn test_board_tracks_pin_state() {
        let (mut board, handle) = SimulatedBoard::new("sim0");
        exchange(
            &mut board,
            PinModeRequest { pin: 7, mode: PinMode::Output }.into(),
        );
        exchange(
            &mut board,
            DigitalWriteRequest { pin: 7, level: PinLevel::High }.into(),
        );
        let read = exchange(&mut board, DigitalReadRequest { pin: 7 }.into());
        assert_eq!(
            read,
            Response::DigitalRead(DigitalReadResponse { pin: 7, level: PinLevel::High })
        );
        handle.with_state(|s| assert_eq!(s.modes[7], PinMode::Output));
        assert_eq!(handle.write_count(), 3);
    }

    #[test]
    fn test_board_rejects_bad_pin() {
        let (mut board, _handle) = SimulatedBoard::new("sim0");
        let response = exchange(&mut board, AnalogReadRequest { pin: 42 }.into());
        assert_eq!(
            response,
            Response::Error {
                request_opcode: OP_ANALOG_READ,
                code: PeerErrorCode::InvalidPin
            }
        );
    }

    #[test]
    fn test_handle_ignores_missing_pins() {
        let (mut board, handle) = SimulatedBoard::new("sim0");
        assert!(!handle.set_input_level(PIN_COUNT as u8, PinLevel::High));
        assert!(!handle.set_analog_input(200, 512));

        assert!(handle.set_input_level(3, PinLevel::High));
        assert!(handle.set_analog_input(0, 2000));
        let read = exchange(&mut board, DigitalReadRequest { pin: 3 }.into());
        assert_eq!(
            read,
            Response::DigitalRead(DigitalReadResponse { pin: 3, level: PinLevel::High })
        );
        let sample = exchange(&mut board, AnalogReadRequest { pin: 0 }.into());
        assert_eq!(
            sample,
            Response::AnalogRead(AnalogReadResponse { pin: 0, value: ANALOG_READ_MAX })
        );
    }

    #[test]
    fn test_silent_board_times_out() {
        let (mut board, handle) = SimulatedBoard::new("sim0");
        handle.set_faults(Faults { mute: true, ..Faults::default() });
        board.write_all(&Request::Handshake.encode(), Duration::ZERO).unwrap();
        let mut buf = [0u8; 8];
        let err = board.read(&mut buf, Duration::from_millis(5)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
