//! Hardware Abstraction Layer (HAL) for the control node
//!
//! This crate provides vendor-agnostic traits for the peripherals the node
//! touches: digital input and output pins and a serial transmitter. With the
//! `std` feature, the [`sim`] module adds host-side implementations used by
//! tests and the simulator.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod gpio;
pub mod serial;

#[cfg(feature = "std")]
pub mod sim;

// Re-export commonly used types
pub use error::{HalError, HalResult};
pub use gpio::{InputPin, Level, OutputPin};
pub use serial::{DataBits, Parity, SerialConfig, SerialPort, StopBits};
