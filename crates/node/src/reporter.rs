//! Run-time statistics report written to the serial port.

use core::fmt;

use log::debug;
use rtk::TaskContext;

use crate::sink::SerialSink;

/// Default size of the report buffer in bytes.
pub const DEFAULT_REPORT_LEN: usize = 512;

/// Formats the kernel's per-task run-time table into a fixed buffer and
/// sends it, preceded by a newline, to the serial sink.
///
/// A table longer than `N` bytes is cut at the buffer boundary.
pub struct StatsReporter<const N: usize = DEFAULT_REPORT_LEN> {
    sink: SerialSink,
    buffer: heapless::String<N>,
    reports: u64,
}

impl<const N: usize> StatsReporter<N> {
    pub fn new(sink: SerialSink) -> Self {
        Self {
            sink,
            buffer: heapless::String::new(),
            reports: 0,
        }
    }

    /// Queries the kernel and transmits one report.
    pub fn report(&mut self, ctx: &TaskContext<'_>) {
        self.buffer.clear();
        let mut writer = Truncating {
            buffer: &mut self.buffer,
            truncated: false,
        };
        // Running out of room is the only way this write fails.
        let _ = ctx.write_runtime_stats(&mut writer);
        if writer.truncated {
            debug!("{}: runtime report truncated to {N} bytes", ctx.name());
        }

        self.sink.put_char(b'\n');
        self.sink.write(self.buffer.as_bytes());
        self.reports += 1;
    }

    /// Text of the most recent report.
    pub fn last_report(&self) -> &str {
        &self.buffer
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }
}

struct Truncating<'a, const N: usize> {
    buffer: &'a mut heapless::String<N>,
    truncated: bool,
}

impl<const N: usize> fmt::Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.buffer.push(c).is_err() {
                self.truncated = true;
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}
