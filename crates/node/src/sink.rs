//! Serial output shared by the log consumer and the statistics reporter.

use core::sync::atomic::{AtomicU64, Ordering};

use hal::{HalResult, SerialConfig, SerialPort};
use log::warn;
use rtk::sync::{Arc, Mutex};

/// Cloneable handle to the node's serial port.
///
/// Transmission failures are logged and counted but never propagated: no
/// task can do anything useful about a broken serial line.
#[derive(Clone)]
pub struct SerialSink {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    failures: Arc<AtomicU64>,
}

impl SerialSink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port: Arc::new(Mutex::new(port)),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn configure(&self, config: &SerialConfig) -> HalResult<()> {
        self.port.lock().configure(config)
    }

    pub fn put_char(&self, byte: u8) {
        if let Err(err) = self.port.lock().put_char(byte) {
            self.record_failure(err);
        }
    }

    pub fn write(&self, bytes: &[u8]) {
        if let Err(err) = self.port.lock().write(bytes) {
            self.record_failure(err);
        }
    }

    pub fn flush(&self) {
        if let Err(err) = self.port.lock().flush() {
            self.record_failure(err);
        }
    }

    /// Number of failed transmissions so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record_failure(&self, err: hal::HalError) {
        let count = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        warn!("serial write failed ({count} so far): {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::sim::CaptureSerial;

    #[test]
    fn failures_are_counted_not_propagated() {
        let capture = CaptureSerial::new();
        let sink = SerialSink::new(Box::new(capture.clone()));

        sink.write(b"early");
        assert_eq!(sink.failures(), 1);

        sink.configure(&SerialConfig::default()).unwrap();
        sink.write(b"ok");
        sink.put_char(b'\n');
        sink.flush();
        assert_eq!(capture.text(), "ok\n");
        assert_eq!(sink.failures(), 1);
    }
}
