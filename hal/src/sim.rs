//! Host-side peripheral implementations for tests and simulation.
//!
//! Every type here is a cheap handle: clones observe and drive the same
//! underlying state, so a test can keep one clone while the node owns another.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{HalError, HalResult};
use crate::gpio::{InputPin, Level, OutputPin};
use crate::serial::{SerialConfig, SerialPort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Input pin that plays back a fixed level sequence, then holds the last one.
#[derive(Debug, Clone)]
pub struct ScriptedPin {
    pin: u32,
    script: VecDeque<Level>,
    last: Level,
}

impl ScriptedPin {
    /// Idle level before and after the script is `High` (pulled up).
    pub fn new(pin: u32, levels: impl IntoIterator<Item = Level>) -> Self {
        Self {
            pin,
            script: levels.into_iter().collect(),
            last: Level::High,
        }
    }

    /// Builds the script from `0`/`1` samples.
    pub fn from_bits(pin: u32, bits: &[u8]) -> Self {
        Self::new(pin, bits.iter().map(|bit| Level::from(*bit != 0)))
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl InputPin for ScriptedPin {
    fn read(&mut self) -> HalResult<Level> {
        if let Some(level) = self.script.pop_front() {
            self.last = level;
        }
        Ok(self.last)
    }

    fn pin_number(&self) -> u32 {
        self.pin
    }
}

/// Input pin whose level is set from outside, e.g. by a test or a simulated
/// push button.
#[derive(Debug, Clone)]
pub struct SharedPin {
    pin: u32,
    high: Arc<AtomicBool>,
}

impl SharedPin {
    pub fn new(pin: u32, initial: Level) -> Self {
        Self {
            pin,
            high: Arc::new(AtomicBool::new(initial.is_high())),
        }
    }

    pub fn set(&self, level: Level) {
        self.high.store(level.is_high(), Ordering::SeqCst);
    }

    pub fn level(&self) -> Level {
        Level::from(self.high.load(Ordering::SeqCst))
    }
}

impl InputPin for SharedPin {
    fn read(&mut self) -> HalResult<Level> {
        Ok(self.level())
    }

    fn pin_number(&self) -> u32 {
        self.pin
    }
}

/// Output pin that records every level written to it.
#[derive(Debug, Clone)]
pub struct RecordingPin {
    pin: u32,
    writes: Arc<Mutex<Vec<Level>>>,
}

impl RecordingPin {
    pub fn new(pin: u32) -> Self {
        Self {
            pin,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn writes(&self) -> Vec<Level> {
        lock(&self.writes).clone()
    }

    /// Number of low-to-high transitions written so far.
    pub fn rising_edges(&self) -> usize {
        let writes = lock(&self.writes);
        let mut previous = Level::Low;
        let mut edges = 0;
        for level in writes.iter() {
            if previous.is_low() && level.is_high() {
                edges += 1;
            }
            previous = *level;
        }
        edges
    }
}

impl OutputPin for RecordingPin {
    fn write(&mut self, level: Level) -> HalResult<()> {
        lock(&self.writes).push(level);
        Ok(())
    }

    fn output_level(&self) -> Level {
        lock(&self.writes).last().copied().unwrap_or(Level::Low)
    }

    fn pin_number(&self) -> u32 {
        self.pin
    }
}

#[derive(Debug, Default)]
struct CaptureState {
    config: Option<SerialConfig>,
    bytes: Vec<u8>,
    failing: bool,
}

/// Serial port that captures transmitted bytes in memory.
#[derive(Debug, Clone, Default)]
pub struct CaptureSerial {
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        lock(&self.state).bytes.clone()
    }

    /// Captured output decoded as UTF-8 (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&lock(&self.state).bytes).into_owned()
    }

    pub fn config(&self) -> Option<SerialConfig> {
        lock(&self.state).config.clone()
    }

    pub fn clear(&self) {
        lock(&self.state).bytes.clear();
    }

    /// Makes every following transmission fail with a hardware error.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}

impl SerialPort for CaptureSerial {
    fn configure(&mut self, config: &SerialConfig) -> HalResult<()> {
        config.validate()?;
        lock(&self.state).config = Some(config.clone());
        Ok(())
    }

    fn put_char(&mut self, byte: u8) -> HalResult<()> {
        self.write(&[byte]).map(|_| ())
    }

    fn write(&mut self, data: &[u8]) -> HalResult<usize> {
        let mut state = lock(&self.state);
        if state.config.is_none() {
            return Err(HalError::NotConfigured);
        }
        if state.failing {
            return Err(HalError::HardwareError);
        }
        state.bytes.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Serial port forwarding transmitted bytes to any writer, e.g. stdout.
#[derive(Debug)]
pub struct WriterSerial<W> {
    writer: W,
    config: Option<SerialConfig>,
}

impl<W: Write + Send> WriterSerial<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            config: None,
        }
    }

    pub fn config(&self) -> Option<&SerialConfig> {
        self.config.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SerialPort for WriterSerial<W> {
    fn configure(&mut self, config: &SerialConfig) -> HalResult<()> {
        config.validate()?;
        self.config = Some(config.clone());
        Ok(())
    }

    fn put_char(&mut self, byte: u8) -> HalResult<()> {
        self.write(&[byte]).map(|_| ())
    }

    fn write(&mut self, data: &[u8]) -> HalResult<usize> {
        if self.config.is_none() {
            return Err(HalError::NotConfigured);
        }
        self.writer.write_all(data).map_err(|_| HalError::Io)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> HalResult<()> {
        self.writer.flush().map_err(|_| HalError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_pin_holds_last_level() {
        let mut pin = ScriptedPin::from_bits(1, &[1, 0, 0]);
        let read: Vec<Level> = (0..5).map(|_| pin.read().unwrap()).collect();
        assert_eq!(
            read,
            vec![Level::High, Level::Low, Level::Low, Level::Low, Level::Low]
        );
        assert_eq!(pin.remaining(), 0);
    }

    #[test]
    fn shared_pin_reflects_external_changes() {
        let probe = SharedPin::new(2, Level::High);
        let mut pin = probe.clone();
        assert_eq!(pin.read(), Ok(Level::High));
        probe.set(Level::Low);
        assert_eq!(pin.read(), Ok(Level::Low));
    }

    #[test]
    fn recording_pin_counts_pulses() {
        let probe = RecordingPin::new(1);
        let mut pin = probe.clone();
        for _ in 0..3 {
            pin.write(Level::High).unwrap();
            pin.write(Level::Low).unwrap();
        }
        pin.toggle().unwrap();
        assert_eq!(probe.rising_edges(), 4);
        assert_eq!(pin.output_level(), Level::High);
    }

    #[test]
    fn capture_serial_requires_configuration() {
        let probe = CaptureSerial::new();
        let mut port = probe.clone();
        assert_eq!(port.put_char(b'x'), Err(HalError::NotConfigured));

        port.configure(&SerialConfig::default()).unwrap();
        port.write(b"hello").unwrap();
        port.put_char(b'\n').unwrap();
        assert_eq!(probe.text(), "hello\n");
        assert_eq!(probe.config().map(|c| c.baud_rate), Some(115200));

        probe.set_failing(true);
        assert_eq!(port.write(b"lost"), Err(HalError::HardwareError));
        assert_eq!(probe.bytes(), b"hello\n".to_vec());
    }

    #[test]
    fn zero_baud_is_rejected() {
        let mut port = CaptureSerial::new();
        assert_eq!(
            port.configure(&SerialConfig::with_baud_rate(0)),
            Err(HalError::ConfigurationError)
        );
    }

    #[test]
    fn writer_serial_forwards_bytes() {
        let mut port = WriterSerial::new(Vec::new());
        port.configure(&SerialConfig::default()).unwrap();
        port.write(b"abc").unwrap();
        port.put_char(b'd').unwrap();
        port.flush().unwrap();
        assert_eq!(port.into_inner(), b"abcd".to_vec());
    }
}
