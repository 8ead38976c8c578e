//! # node
//!
//! Application layer of a real-time control node running on the `rtk` kernel.
//!
//! Two kinds of work share the CPU:
//! - periodic workloads ([`periodic`]) with deadline supervision
//!   ([`deadline`]), one of which also reports run-time statistics
//!   ([`reporter`]);
//! - an event pipeline where edge detectors ([`edge`]) and a heartbeat
//!   ([`heartbeat`]) feed a bounded queue drained to the serial port by the
//!   log consumer ([`logger`]).
//!
//! [`Node`] wires everything from a [`NodeConfig`] and a set of
//! [`Peripherals`].

pub mod config;
pub mod deadline;
pub mod edge;
pub mod error;
pub mod heartbeat;
pub mod load;
pub mod logger;
pub mod message;
pub mod node;
pub mod periodic;
pub mod pulse;
pub mod reporter;
pub mod sink;
pub mod workload;

pub use config::{EdgeConfig, HeartbeatConfig, LoggerConfig, NodeConfig, NodeConfigBuilder, WorkloadConfig};
pub use deadline::{DeadlineRecord, DeadlineSupervisor, MissCounter};
pub use edge::{Edge, EdgeCounters, EdgeDetector, EdgeState};
pub use error::NodeError;
pub use heartbeat::PeriodicEventSource;
pub use load::LoadMonitor;
pub use logger::EventLogConsumer;
pub use message::{EventMessage, MESSAGE_LEN};
pub use node::{EdgeSnapshot, Node, NodeSnapshot, Peripherals, WorkloadSnapshot};
pub use periodic::PeriodicWorkload;
pub use pulse::TickPulse;
pub use reporter::StatsReporter;
pub use sink::SerialSink;
pub use workload::{BusyLoop, FixedTicks, Workload};
