//! Common error types for HAL operations

use core::fmt;

/// HAL operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Peripheral used before it was configured
    NotConfigured,
    /// Configuration rejected by the peripheral
    ConfigurationError,
    /// Hardware error occurred
    HardwareError,
    /// Host I/O failure behind a simulated peripheral
    Io,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "peripheral not configured"),
            Self::ConfigurationError => write!(f, "configuration error"),
            Self::HardwareError => write!(f, "hardware error"),
            Self::Io => write!(f, "host i/o error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;
