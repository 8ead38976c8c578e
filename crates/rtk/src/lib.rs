//! # rtk
//!
//! A deterministic host model of a preemptive, priority-based real-time
//! kernel. Time advances in whole ticks under the caller's control, which
//! makes task timing reproducible in tests and simulations.
//!
//! ## Module Overview
//! - [`task`]      – Task descriptors and the resumable task body.
//! - [`context`]   – Services a task uses while it runs.
//! - [`kernel`]    – Configuration, builder and the tick dispatcher.
//! - [`queue`]     – Bounded queues with blocking and timed waits.
//! - [`stats`]     – Per-task run-time accounting.
//! - [`hooks`]     – Tick and task-switch callbacks.
//! - [`time`]      – Tick arithmetic.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod context;
pub mod hooks;
pub mod kernel;
pub mod queue;
mod scheduler;
pub mod stats;
pub mod sync;
pub mod task;
pub mod time;

pub use context::TaskContext;
pub use hooks::{KernelHooks, TaskSwitch};
pub use kernel::{Kernel, KernelBuilder, KernelConfig, KernelConfigBuilder, KernelError};
pub use queue::{BoundedQueue, QueueError, WaitPolicy};
pub use stats::{RuntimeStats, TaskStats};
pub use task::{Suspend, TaskBody, TaskConfig, TaskHandle, TaskId, TaskState, MAX_PRIORITY};
pub use time::Tick;
