//! Node configuration.
//!
//! Defaults reproduce the reference board: two push buttons polled every 10
//! ticks, a heartbeat every 100 ticks, a serial logger settling 20 ticks after
//! each message, and two periodic workloads of 60 and 80 ticks, the second
//! also reporting run-time statistics.

use std::collections::BTreeSet;

use rtk::{Tick, MAX_PRIORITY};

use crate::error::NodeError;
use crate::message::MESSAGE_LEN;
use crate::workload::DEFAULT_ITERATIONS_PER_TICK;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Digital input watched by an edge detector.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct EdgeConfig {
    /// Task name.
    pub name: String,
    /// Label used in the event text, e.g. `B1`.
    pub source: String,
    pub priority: u8,
    pub poll_interval: Tick,
}

impl EdgeConfig {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            ..Self::default()
        }
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            name: "Button".into(),
            source: "B".into(),
            priority: 1,
            poll_interval: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct HeartbeatConfig {
    pub name: String,
    /// Message text, at most 32 bytes.
    pub text: String,
    pub priority: u8,
    pub interval: Tick,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            name: "Periodic".into(),
            text: "\n randomstring \n".into(),
            priority: 1,
            interval: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LoggerConfig {
    pub name: String,
    pub priority: u8,
    /// Delay after every forwarded message.
    pub settle: Tick,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: "UART".into(),
            priority: 1,
            settle: 20,
        }
    }
}

/// Periodic workload task.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct WorkloadConfig {
    pub name: String,
    /// Correlates the task with its deadline bookkeeping and load figures.
    pub tag: u32,
    pub period: Tick,
    pub priority: u8,
    /// Busy-loop iterations per release.
    pub iterations: u32,
    pub iterations_per_tick: u32,
    /// Runs the statistics reporter after the workload.
    pub report_stats: bool,
}

impl WorkloadConfig {
    pub fn new(name: impl Into<String>, tag: u32, period: Tick, priority: u8) -> Self {
        Self {
            name: name.into(),
            tag,
            period,
            priority,
            ..Self::default()
        }
    }

    pub fn with_stats(mut self) -> Self {
        self.report_stats = true;
        self
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: "Task".into(),
            tag: 0,
            period: 100,
            priority: 1,
            iterations: 100_000,
            iterations_per_tick: DEFAULT_ITERATIONS_PER_TICK,
            report_stats: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct NodeConfig {
    pub tick_rate_hz: u32,
    pub heap_bytes: usize,
    /// Stack budget of every application task, in words.
    pub stack_words: u16,
    pub queue_capacity: usize,
    pub baud_rate: u32,
    pub edges: Vec<EdgeConfig>,
    pub heartbeat: HeartbeatConfig,
    pub logger: LoggerConfig,
    pub workloads: Vec<WorkloadConfig>,
    /// Pulse the tick pin from the tick hook when a pin is supplied.
    pub tick_pulse: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1000,
            heap_bytes: 16 * 1024,
            stack_words: 100,
            queue_capacity: 10,
            baud_rate: 115_200,
            edges: vec![
                EdgeConfig::new("Button1", "B1"),
                EdgeConfig::new("Button2", "B2"),
            ],
            heartbeat: HeartbeatConfig::default(),
            logger: LoggerConfig::default(),
            workloads: vec![
                WorkloadConfig::new("Task1", 1, 60, 1),
                WorkloadConfig::new("Task2", 2, 80, 2).with_stats(),
            ],
            tick_pulse: true,
        }
    }
}

impl NodeConfig {
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    /// Checks the configuration for values the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        let invalid = |reason: String| Err(NodeError::Config(reason));

        if self.tick_rate_hz == 0 {
            return invalid("tick rate must be non-zero".into());
        }
        if self.queue_capacity == 0 {
            return invalid("queue capacity must be non-zero".into());
        }
        if self.baud_rate == 0 {
            return invalid("baud rate must be non-zero".into());
        }
        if self.heartbeat.text.is_empty() || self.heartbeat.text.len() > MESSAGE_LEN {
            return invalid(format!(
                "heartbeat text must be 1..={MESSAGE_LEN} bytes, got {}",
                self.heartbeat.text.len()
            ));
        }
        if self.heartbeat.interval == 0 {
            return invalid("heartbeat interval must be non-zero".into());
        }

        let mut priorities = vec![
            (self.heartbeat.name.as_str(), self.heartbeat.priority),
            (self.logger.name.as_str(), self.logger.priority),
        ];
        for edge in &self.edges {
            if edge.source.is_empty() {
                return invalid(format!("edge detector '{}' has no source label", edge.name));
            }
            if edge.poll_interval == 0 {
                return invalid(format!("edge detector '{}' needs a poll interval", edge.name));
            }
            priorities.push((edge.name.as_str(), edge.priority));
        }

        let mut tags = BTreeSet::new();
        let mut reporters = 0;
        for workload in &self.workloads {
            if workload.period == 0 {
                return invalid(format!("workload '{}' needs a period", workload.name));
            }
            if !tags.insert(workload.tag) {
                return invalid(format!("workload tag {} used twice", workload.tag));
            }
            if workload.report_stats {
                reporters += 1;
            }
            priorities.push((workload.name.as_str(), workload.priority));
        }
        if reporters > 1 {
            return invalid("at most one workload may report statistics".into());
        }

        for (name, priority) in priorities {
            if priority > MAX_PRIORITY {
                return invalid(format!(
                    "task '{name}' priority {priority} exceeds {MAX_PRIORITY}"
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`NodeConfig`].
#[derive(Debug, Clone, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn heap_bytes(mut self, bytes: usize) -> Self {
        self.config.heap_bytes = bytes;
        self
    }

    pub fn stack_words(mut self, words: u16) -> Self {
        self.config.stack_words = words;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    /// Replaces the edge detectors.
    pub fn edges(mut self, edges: Vec<EdgeConfig>) -> Self {
        self.config.edges = edges;
        self
    }

    pub fn heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.config.heartbeat = heartbeat;
        self
    }

    pub fn logger(mut self, logger: LoggerConfig) -> Self {
        self.config.logger = logger;
        self
    }

    /// Replaces the periodic workloads.
    pub fn workloads(mut self, workloads: Vec<WorkloadConfig>) -> Self {
        self.config.workloads = workloads;
        self
    }

    pub fn tick_pulse(mut self, enabled: bool) -> Self {
        self.config.tick_pulse = enabled;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_board() {
        let config = NodeConfig::default();
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.edges.len(), 2);
        assert_eq!(config.edges[0].poll_interval, 10);
        assert_eq!(config.heartbeat.interval, 100);
        assert_eq!(config.logger.settle, 20);

        let periods: Vec<(u32, Tick, u8)> = config
            .workloads
            .iter()
            .map(|w| (w.tag, w.period, w.priority))
            .collect();
        assert_eq!(periods, vec![(1, 60, 1), (2, 80, 2)]);
        assert!(config.workloads[1].report_stats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides_fields() {
        let config = NodeConfig::builder()
            .queue_capacity(4)
            .baud_rate(9600)
            .edges(vec![EdgeConfig::new("Door", "D")])
            .workloads(vec![WorkloadConfig::new("Solo", 7, 25, 3)])
            .tick_pulse(false)
            .build();
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.edges[0].source, "D");
        assert_eq!(config.workloads[0].tag, 7);
        assert!(!config.tick_pulse);
    }

    #[test]
    fn rejects_duplicate_tags() {
        let config = NodeConfig::builder()
            .workloads(vec![
                WorkloadConfig::new("A", 1, 10, 1),
                WorkloadConfig::new("B", 1, 20, 1),
            ])
            .build();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn rejects_oversized_heartbeat() {
        let config = NodeConfig::builder()
            .heartbeat(HeartbeatConfig {
                text: "x".repeat(MESSAGE_LEN + 1),
                ..HeartbeatConfig::default()
            })
            .build();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let config = NodeConfig::builder()
            .logger(LoggerConfig {
                priority: 64,
                ..LoggerConfig::default()
            })
            .build();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }
}
