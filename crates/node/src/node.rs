//! Node assembly: queue, tasks, hooks and serial port.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use hal::{InputPin, OutputPin, SerialConfig, SerialPort};
use log::info;
use rtk::sync::Arc;
use rtk::{
    BoundedQueue, Kernel, KernelBuilder, KernelConfig, KernelHooks, RuntimeStats, TaskConfig, TaskId,
    Tick,
};

use crate::config::{NodeConfig, WorkloadConfig};
use crate::deadline::MissCounter;
use crate::edge::{EdgeCounters, EdgeDetector};
use crate::error::NodeError;
use crate::heartbeat::PeriodicEventSource;
use crate::load::LoadMonitor;
use crate::logger::EventLogConsumer;
use crate::message::EventMessage;
use crate::periodic::PeriodicWorkload;
use crate::pulse::TickPulse;
use crate::reporter::StatsReporter;
use crate::sink::SerialSink;
use crate::workload::{BusyLoop, Workload};

/// Hardware handed to the node.
pub struct Peripherals {
    /// One input per configured edge detector, in the same order.
    pub inputs: Vec<Box<dyn InputPin>>,
    pub serial: Box<dyn SerialPort>,
    /// Pin pulsed on every tick, if any.
    pub tick_pin: Option<Box<dyn OutputPin>>,
}

struct WorkloadProbe {
    name: String,
    tag: u32,
    id: TaskId,
    misses: MissCounter,
}

struct EdgeProbe {
    source: String,
    counters: Arc<EdgeCounters>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSnapshot {
    pub name: String,
    pub tag: u32,
    pub misses: u64,
    pub runtime: Tick,
    pub deadline: Option<Tick>,
    pub busy_time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSnapshot {
    pub source: String,
    pub emitted: u64,
    pub dropped: u64,
}

/// Point-in-time view of the node's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub now: Tick,
    pub workloads: Vec<WorkloadSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub heartbeats: u64,
    pub forwarded: u64,
    pub queue_depth: usize,
    /// Share of time spent in the periodic workloads, in percent.
    pub cpu_load: f32,
    pub serial_failures: u64,
}

impl NodeSnapshot {
    pub fn workload(&self, name: &str) -> Option<&WorkloadSnapshot> {
        self.workloads.iter().find(|w| w.name == name)
    }

    pub fn total_misses(&self) -> u64 {
        self.workloads.iter().map(|w| w.misses).sum()
    }
}

/// The assembled control node.
pub struct Node {
    kernel: Kernel,
    queue: BoundedQueue<EventMessage>,
    sink: SerialSink,
    load: LoadMonitor,
    workloads: Vec<WorkloadProbe>,
    edges: Vec<EdgeProbe>,
    heartbeats: Arc<AtomicU64>,
    forwarded: Arc<AtomicU64>,
}

impl Node {
    /// Builds the node with busy-loop workloads sized from the configuration.
    pub fn build(config: &NodeConfig, peripherals: Peripherals) -> Result<Self, NodeError> {
        Self::build_with_workloads(config, peripherals, |workload| {
            Box::new(BusyLoop::with_rate(
                workload.iterations,
                workload.iterations_per_tick,
            ))
        })
    }

    /// Builds the node, asking `make_workload` for each workload's strategy.
    pub fn build_with_workloads<F>(
        config: &NodeConfig,
        peripherals: Peripherals,
        mut make_workload: F,
    ) -> Result<Self, NodeError>
    where
        F: FnMut(&WorkloadConfig) -> Box<dyn Workload>,
    {
        config.validate()?;
        if peripherals.inputs.len() != config.edges.len() {
            return Err(NodeError::Config(format!(
                "{} edge detectors configured but {} input pins supplied",
                config.edges.len(),
                peripherals.inputs.len()
            )));
        }

        let sink = SerialSink::new(peripherals.serial);
        sink.configure(&SerialConfig::with_baud_rate(config.baud_rate))?;

        let load = LoadMonitor::new();
        let mut hooks = load.attach(KernelHooks::new());
        if let (true, Some(pin)) = (config.tick_pulse, peripherals.tick_pin) {
            hooks = TickPulse::new(pin).attach(hooks);
        }

        let kernel_config = KernelConfig::builder()
            .name("node")
            .tick_rate_hz(config.tick_rate_hz)
            .heap_bytes(config.heap_bytes)
            .build();
        let mut builder = Kernel::with_config(kernel_config).with_hooks(hooks);
        let queue = builder.queue::<EventMessage>(config.queue_capacity)?;

        let mut workloads = Vec::with_capacity(config.workloads.len());
        for workload in &config.workloads {
            let probe = spawn_workload(
                &mut builder,
                config,
                workload,
                make_workload(workload),
                &sink,
            )?;
            workloads.push(probe);
        }

        let mut edges = Vec::with_capacity(config.edges.len());
        for (edge, pin) in config.edges.iter().zip(peripherals.inputs) {
            let detector = EdgeDetector::new(edge.source.clone(), pin, queue.clone(), edge.poll_interval);
            edges.push(EdgeProbe {
                source: edge.source.clone(),
                counters: detector.counters(),
            });
            builder.spawn(
                TaskConfig::new(edge.name.clone(), edge.priority)
                    .with_stack_words(config.stack_words),
                detector,
            )?;
        }

        let heartbeat = &config.heartbeat;
        let source = PeriodicEventSource::new(
            EventMessage::new(&heartbeat.text),
            queue.clone(),
            heartbeat.interval,
        );
        let heartbeats = source.sent_counter();
        builder.spawn(
            TaskConfig::new(heartbeat.name.clone(), heartbeat.priority)
                .with_stack_words(config.stack_words),
            source,
        )?;

        let logger = &config.logger;
        let consumer = EventLogConsumer::new(queue.clone(), sink.clone(), logger.settle);
        let forwarded = consumer.forwarded_counter();
        builder.spawn(
            TaskConfig::new(logger.name.clone(), logger.priority)
                .with_stack_words(config.stack_words),
            consumer,
        )?;

        let heap_used = builder.heap_used();
        let kernel = builder.build()?;
        info!(
            "node ready: {} workloads, {} edge detectors, queue {}x{} bytes, {heap_used} heap bytes used",
            workloads.len(),
            edges.len(),
            config.queue_capacity,
            crate::message::MESSAGE_LEN
        );

        Ok(Self {
            kernel,
            queue,
            sink,
            load,
            workloads,
            edges,
            heartbeats,
            forwarded,
        })
    }

    pub fn now(&self) -> Tick {
        self.kernel.now()
    }

    pub fn step_tick(&mut self) {
        self.kernel.step_tick();
    }

    pub fn run_for(&mut self, ticks: Tick) {
        self.kernel.run_for(ticks);
    }

    pub fn run_until(&mut self, tick: Tick) {
        self.kernel.run_until(tick);
    }

    /// Hands control to the kernel for good.
    pub fn run_forever(self, pace: Option<std::time::Duration>) -> ! {
        self.kernel.run_forever(pace)
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn queue(&self) -> &BoundedQueue<EventMessage> {
        &self.queue
    }

    pub fn runtime_stats(&self) -> RuntimeStats {
        self.kernel.runtime_stats()
    }

    /// Flushes pending serial output.
    pub fn flush(&self) {
        self.sink.flush();
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let now = self.kernel.now();
        let workloads = self
            .workloads
            .iter()
            .map(|probe| WorkloadSnapshot {
                name: probe.name.clone(),
                tag: probe.tag,
                misses: probe.misses.get(),
                runtime: self.kernel.task(probe.id).map(|t| t.runtime).unwrap_or(0),
                deadline: self.kernel.deadline(probe.id).unwrap_or(None),
                busy_time: self.load.busy_time(probe.tag, now),
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|probe| EdgeSnapshot {
                source: probe.source.clone(),
                emitted: probe.counters.emitted(),
                dropped: probe.counters.dropped(),
            })
            .collect();

        NodeSnapshot {
            now,
            workloads,
            edges,
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            queue_depth: self.queue.len(),
            cpu_load: self.load.load_percent(now),
            serial_failures: self.sink.failures(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kernel", &self.kernel)
            .field("queue", &self.queue)
            .finish()
    }
}

fn spawn_workload(
    builder: &mut KernelBuilder,
    config: &NodeConfig,
    workload: &WorkloadConfig,
    strategy: Box<dyn Workload>,
    sink: &SerialSink,
) -> Result<WorkloadProbe, NodeError> {
    let mut task = PeriodicWorkload::new(workload.tag, workload.period, strategy);
    if workload.report_stats {
        task = task.with_reporter(StatsReporter::new(sink.clone()));
    }
    let misses = task.misses();
    let handle = builder.spawn(
        TaskConfig::new(workload.name.clone(), workload.priority)
            .periodic(workload.period)
            .with_tag(workload.tag)
            .with_stack_words(config.stack_words),
        task,
    )?;
    Ok(WorkloadProbe {
        name: workload.name.clone(),
        tag: workload.tag,
        id: handle.id,
        misses,
    })
}
