//! Serial transmitter abstraction

use alloc::boxed::Box;

use crate::error::{HalError, HalResult};

/// Serial data bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Serial stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Serial line configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl SerialConfig {
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Rejects configurations no transmitter can honour.
    pub fn validate(&self) -> HalResult<()> {
        if self.baud_rate == 0 {
            return Err(HalError::ConfigurationError);
        }
        Ok(())
    }
}

/// Serial transmitter (object-safe)
pub trait SerialPort: Send {
    /// Configure line parameters
    fn configure(&mut self, config: &SerialConfig) -> HalResult<()>;

    /// Transmit a single byte (blocking)
    fn put_char(&mut self, byte: u8) -> HalResult<()>;

    /// Transmit a buffer (blocking), returning the number of bytes sent
    fn write(&mut self, data: &[u8]) -> HalResult<usize> {
        for byte in data {
            self.put_char(*byte)?;
        }
        Ok(data.len())
    }

    /// Flush TX buffer
    fn flush(&mut self) -> HalResult<()> {
        Ok(())
    }
}

impl<S: SerialPort + ?Sized> SerialPort for Box<S> {
    fn configure(&mut self, config: &SerialConfig) -> HalResult<()> {
        (**self).configure(config)
    }

    fn put_char(&mut self, byte: u8) -> HalResult<()> {
        (**self).put_char(byte)
    }

    fn write(&mut self, data: &[u8]) -> HalResult<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> HalResult<()> {
        (**self).flush()
    }
}
