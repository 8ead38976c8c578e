//! Node error type.

use hal::HalError;
use rtk::KernelError;
use thiserror::Error;

/// Errors that stop the node from starting.
///
/// Once running, the node has no fatal errors: deadline misses are counted,
/// full queues drop or wait, and serial failures are logged.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("peripheral error: {0}")]
    Hal(#[from] HalError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
