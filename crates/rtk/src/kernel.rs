//! Preemptive fixed-priority kernel on a simulated tick clock.
//!
//! Every call to [`Kernel::step_tick`] advances time by one tick. Within a
//! tick the kernel first releases tasks whose delay or wait has expired, then
//! dispatches ready tasks in priority order. Steps that do not consume time
//! (queue operations, bookkeeping) run back-to-back; the first task asking
//! for CPU time with [`Suspend::Busy`] consumes the tick. When no
//! application task is ready the idle task consumes it.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, info, warn};

use crate::context::TaskContext;
use crate::hooks::{KernelHooks, TaskSwitch};
use crate::queue::{BoundedQueue, WaitQueue};
use crate::scheduler::ReadyQueue;
use crate::stats::{RuntimeStats, TaskStats};
use crate::sync::Arc;
use crate::task::{BoxedTask, Suspend, TaskBody, TaskConfig, TaskHandle, TaskId, TaskState, MAX_PRIORITY};
use crate::time::Tick;

/// Kernel sizing and timing parameters.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub name: &'static str,
    pub tick_rate_hz: u32,
    /// Bytes available for task stacks, control blocks and queue storage.
    pub heap_bytes: usize,
    pub stack_word_bytes: usize,
    /// Control block overhead charged per task.
    pub tcb_bytes: usize,
    /// Fixed overhead charged per queue on top of its storage.
    pub queue_overhead_bytes: usize,
    /// Upper bound on zero-time steps dispatched within one tick.
    pub max_steps_per_tick: u32,
    pub idle_name: &'static str,
    pub idle_stack_words: u16,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "rtk",
            tick_rate_hz: 1000,
            heap_bytes: 16 * 1024,
            stack_word_bytes: 4,
            tcb_bytes: 96,
            queue_overhead_bytes: 80,
            max_steps_per_tick: 1024,
            idle_name: "IDLE",
            idle_stack_words: 100,
        }
    }
}

impl KernelConfig {
    pub fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder::default()
    }

    fn validate(&self) -> Result<(), KernelError> {
        if self.tick_rate_hz == 0 {
            return Err(KernelError::InvalidConfig("tick rate must be non-zero"));
        }
        if self.max_steps_per_tick == 0 {
            return Err(KernelError::InvalidConfig("step limit must be non-zero"));
        }
        Ok(())
    }

    fn task_cost(&self, stack_words: u16) -> usize {
        usize::from(stack_words) * self.stack_word_bytes + self.tcb_bytes
    }
}

#[derive(Debug, Clone, Default)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Sets the total heap budget in bytes.
    pub fn heap_bytes(mut self, bytes: usize) -> Self {
        self.config.heap_bytes = bytes;
        self
    }

    pub fn stack_word_bytes(mut self, bytes: usize) -> Self {
        self.config.stack_word_bytes = bytes;
        self
    }

    pub fn tcb_bytes(mut self, bytes: usize) -> Self {
        self.config.tcb_bytes = bytes;
        self
    }

    pub fn queue_overhead_bytes(mut self, bytes: usize) -> Self {
        self.config.queue_overhead_bytes = bytes;
        self
    }

    pub fn max_steps_per_tick(mut self, steps: u32) -> Self {
        self.config.max_steps_per_tick = steps;
        self
    }

    /// Sets the name and stack budget of the idle task.
    pub fn idle_task(mut self, name: &'static str, stack_words: u16) -> Self {
        self.config.idle_name = name;
        self.config.idle_stack_words = stack_words;
        self
    }

    pub fn build(self) -> KernelConfig {
        self.config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The heap budget cannot hold the requested object.
    OutOfMemory { requested: usize, available: usize },
    InvalidPriority(u8),
    InvalidConfig(&'static str),
    UnknownTask(TaskId),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of kernel heap: requested {requested} bytes, {available} available"
            ),
            Self::InvalidPriority(prio) => {
                write!(f, "priority {prio} exceeds maximum {MAX_PRIORITY}")
            }
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            Self::UnknownTask(id) => write!(f, "task {id} not found"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KernelError {}

/// Kernel-side bookkeeping for one task.
pub(crate) struct TaskControl {
    pub(crate) id: TaskId,
    pub(crate) config: TaskConfig,
    pub(crate) state: TaskState,
    /// Remaining ticks of a `Busy` request.
    pub(crate) busy: Tick,
    pub(crate) wake_at: Option<Tick>,
    pub(crate) wait: Option<Arc<dyn WaitQueue>>,
    /// Absolute limit of a bounded queue wait, kept across retries.
    pub(crate) wait_deadline: Option<Tick>,
    pub(crate) timed_out: bool,
    pub(crate) deadline: Option<Tick>,
    pub(crate) runtime: Tick,
}

impl TaskControl {
    fn stats(&self) -> TaskStats {
        TaskStats {
            id: self.id,
            name: self.config.name.clone(),
            priority: self.config.priority,
            state: self.state,
            stack_words: self.config.stack_words,
            tag: self.config.tag,
            runtime: self.runtime,
        }
    }
}

pub struct KernelBuilder {
    config: KernelConfig,
    tasks: Vec<(TaskConfig, BoxedTask)>,
    hooks: KernelHooks,
    heap_used: usize,
}

impl KernelBuilder {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            tasks: Vec::new(),
            hooks: KernelHooks::default(),
            heap_used: 0,
        }
    }

    pub fn with_hooks(mut self, hooks: KernelHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Creates a task. Periodic tasks start with a deadline one period
    /// after creation.
    pub fn spawn<B>(&mut self, config: TaskConfig, body: B) -> Result<TaskHandle, KernelError>
    where
        B: TaskBody + 'static,
    {
        self.spawn_boxed(config, Box::new(body))
    }

    pub fn spawn_boxed(
        &mut self,
        config: TaskConfig,
        body: BoxedTask,
    ) -> Result<TaskHandle, KernelError> {
        if config.priority > MAX_PRIORITY {
            return Err(KernelError::InvalidPriority(config.priority));
        }
        if config.period == Some(0) {
            return Err(KernelError::InvalidConfig("task period must be non-zero"));
        }
        // One identifier stays reserved for the idle task.
        if self.tasks.len() >= usize::from(u8::MAX) {
            return Err(KernelError::InvalidConfig("too many tasks"));
        }
        self.charge(self.config.task_cost(config.stack_words))?;

        let handle = TaskHandle {
            id: TaskId(self.tasks.len() as u8),
            priority: config.priority,
            period: config.period,
        };
        debug!(
            "{}: created task {} '{}' prio={} period={:?}",
            self.config.name, handle.id, config.name, config.priority, config.period
        );
        self.tasks.push((config, body));
        Ok(handle)
    }

    /// Creates a bounded queue whose storage is charged to the heap budget.
    pub fn queue<T>(&mut self, capacity: usize) -> Result<BoundedQueue<T>, KernelError>
    where
        T: Copy + Send + 'static,
    {
        if capacity == 0 {
            return Err(KernelError::InvalidConfig("queue capacity must be non-zero"));
        }
        let storage = capacity.saturating_mul(core::mem::size_of::<T>());
        self.charge(storage + self.config.queue_overhead_bytes)?;
        debug!(
            "{}: created queue of {capacity} x {} bytes",
            self.config.name,
            core::mem::size_of::<T>()
        );
        Ok(BoundedQueue::new(capacity))
    }

    pub fn heap_used(&self) -> usize {
        self.heap_used
    }

    pub fn heap_free(&self) -> usize {
        self.config.heap_bytes.saturating_sub(self.heap_used)
    }

    /// Creates the idle task and assembles the kernel.
    pub fn build(mut self) -> Result<Kernel, KernelError> {
        self.config.validate()?;
        self.charge(self.config.task_cost(self.config.idle_stack_words))?;
        let idle = TaskConfig::new(self.config.idle_name, 0)
            .with_stack_words(self.config.idle_stack_words);
        self.tasks.push((idle, Box::new(idle_task)));

        let mut ready = ReadyQueue::new();
        let mut tasks = Vec::with_capacity(self.tasks.len());
        let mut bodies = Vec::with_capacity(self.tasks.len());
        for (index, (config, body)) in self.tasks.into_iter().enumerate() {
            let id = TaskId(index as u8);
            ready.insert(config.priority, id);
            tasks.push(TaskControl {
                id,
                state: TaskState::Ready,
                busy: 0,
                wake_at: None,
                wait: None,
                wait_deadline: None,
                timed_out: false,
                deadline: config.period,
                runtime: 0,
                config,
            });
            bodies.push(body);
        }

        Ok(Kernel {
            core: KernelCore {
                config: self.config,
                now: 0,
                tasks,
                ready,
                hooks: self.hooks,
                running: None,
                consumer: None,
                started: false,
                heap_used: self.heap_used,
            },
            bodies,
        })
    }

    fn charge(&mut self, bytes: usize) -> Result<(), KernelError> {
        let available = self.heap_free();
        if bytes > available {
            warn!(
                "{}: heap exhausted, {bytes} bytes requested, {available} available",
                self.config.name
            );
            return Err(KernelError::OutOfMemory {
                requested: bytes,
                available,
            });
        }
        self.heap_used += bytes;
        Ok(())
    }
}

fn idle_task(_ctx: &mut TaskContext<'_>) -> Suspend {
    Suspend::Busy(Tick::MAX)
}

/// State shared between the dispatcher and the context handed to tasks.
pub(crate) struct KernelCore {
    pub(crate) config: KernelConfig,
    pub(crate) now: Tick,
    pub(crate) tasks: Vec<TaskControl>,
    ready: ReadyQueue,
    hooks: KernelHooks,
    /// Task holding the CPU, including zero-time steps within a tick.
    running: Option<usize>,
    /// Task that consumed the previous tick.
    consumer: Option<usize>,
    started: bool,
    heap_used: usize,
}

impl KernelCore {
    pub(crate) fn runtime_stats(&self) -> RuntimeStats {
        RuntimeStats {
            tasks: self.tasks.iter().map(TaskControl::stats).collect(),
            total: self.tasks.iter().map(|task| task.runtime).sum(),
        }
    }

    fn mark_running(&mut self, index: usize) {
        if let Some(previous) = self.running {
            if previous != index && self.tasks[previous].state == TaskState::Running {
                self.tasks[previous].state = TaskState::Ready;
            }
        }
        self.tasks[index].state = TaskState::Running;
        self.running = Some(index);
    }

    fn make_ready(&mut self, index: usize) {
        let task = &mut self.tasks[index];
        task.state = TaskState::Ready;
        task.wake_at = None;
        task.wait = None;
        self.ready.insert(task.config.priority, task.id);
    }

    fn block(&mut self, index: usize, wake_at: Option<Tick>) {
        let task = &mut self.tasks[index];
        task.state = TaskState::Blocked;
        task.wake_at = wake_at;
        self.ready.remove(task.config.priority, task.id);
    }

    /// Readies tasks woken by queue activity.
    fn collect_signalled(&mut self) {
        for index in 0..self.tasks.len() {
            let task = &self.tasks[index];
            if task.state != TaskState::Blocked {
                continue;
            }
            let signalled = match &task.wait {
                Some(wait) => wait.take_woken(task.id),
                None => false,
            };
            if signalled {
                self.make_ready(index);
            }
        }
    }

    /// Readies tasks whose delay elapsed and times out expired queue waits.
    fn release_expired(&mut self) {
        self.collect_signalled();
        let now = self.now;
        for index in 0..self.tasks.len() {
            let task = &mut self.tasks[index];
            if task.state != TaskState::Blocked {
                continue;
            }
            match task.wake_at {
                Some(at) if at <= now => {}
                _ => continue,
            }
            if let Some(wait) = task.wait.take() {
                wait.cancel_wait(task.id);
                task.timed_out = true;
            }
            self.make_ready(index);
        }
    }

    fn apply(&mut self, index: usize, action: Suspend) {
        let now = self.now;
        if action != Suspend::Blocked {
            let task = &mut self.tasks[index];
            if let Some(wait) = task.wait.take() {
                wait.cancel_wait(task.id);
                task.wait_deadline = None;
            }
        }
        match action {
            Suspend::Continue | Suspend::Busy(0) => {}
            Suspend::Busy(ticks) => self.tasks[index].busy = ticks,
            Suspend::Delay(0) => {
                let prio = self.tasks[index].config.priority;
                self.ready.rotate(prio);
            }
            Suspend::Delay(ticks) => self.block(index, Some(now.saturating_add(ticks))),
            Suspend::Until(at) if at <= now => {}
            Suspend::Until(at) => self.block(index, Some(at)),
            Suspend::Blocked => {
                let task = &self.tasks[index];
                if task.wait.is_some() {
                    let deadline = task.wait_deadline;
                    self.block(index, deadline);
                } else {
                    warn!(
                        "{}: task '{}' blocked without a pending wait",
                        self.config.name, task.config.name
                    );
                    self.block(index, Some(now + 1));
                }
            }
        }
    }

    fn switch_to(&mut self, index: usize) {
        let now = self.now;
        self.mark_running(index);
        if self.consumer == Some(index) {
            return;
        }
        if let Some(previous) = self.consumer {
            let switch = self.switch_record(previous, now);
            self.hooks.switched_out(&switch);
        }
        let switch = self.switch_record(index, now);
        self.hooks.switched_in(&switch);
        self.consumer = Some(index);
    }

    fn switch_record(&self, index: usize, at: Tick) -> TaskSwitch<'_> {
        let task = &self.tasks[index];
        TaskSwitch {
            task: task.id,
            name: &task.config.name,
            tag: task.config.tag,
            at,
        }
    }
}

/// Tick-driven kernel owning every task.
pub struct Kernel {
    core: KernelCore,
    bodies: Vec<BoxedTask>,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> KernelBuilder {
        KernelBuilder::new(config)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.core.config
    }

    /// Current tick count.
    pub fn now(&self) -> Tick {
        self.core.now
    }

    pub fn is_started(&self) -> bool {
        self.core.started
    }

    pub fn heap_free(&self) -> usize {
        self.core.config.heap_bytes.saturating_sub(self.core.heap_used)
    }

    /// Starts the scheduler. Stepping a kernel that was never started
    /// starts it implicitly.
    pub fn start(&mut self) {
        if self.core.started {
            return;
        }
        self.core.started = true;
        info!(
            "{}: scheduler started with {} tasks at {} Hz",
            self.core.config.name,
            self.core.tasks.len(),
            self.core.config.tick_rate_hz
        );
    }

    /// Runs one tick.
    pub fn step_tick(&mut self) {
        self.start();
        let now = self.core.now;
        self.core.hooks.tick(now);
        self.core.release_expired();

        let mut steps = 0u32;
        let consumer = loop {
            self.core.collect_signalled();
            let Some(id) = self.core.ready.highest() else {
                // The idle task never blocks, so the ready queue is never empty.
                break None;
            };
            let index = usize::from(id.0);
            let prio = self.core.tasks[index].config.priority;

            if self.core.tasks[index].busy > 0 {
                self.core.tasks[index].busy -= 1;
                self.core.ready.rotate(prio);
                break Some(index);
            }

            if steps >= self.core.config.max_steps_per_tick {
                warn!(
                    "{}: task '{}' exceeded {} steps in tick {now}",
                    self.core.config.name,
                    self.core.tasks[index].config.name,
                    self.core.config.max_steps_per_tick
                );
                self.core.ready.rotate(prio);
                break Some(index);
            }
            steps += 1;

            self.core.mark_running(index);
            let action = {
                let mut ctx = TaskContext::new(&mut self.core, index);
                self.bodies[index].step(&mut ctx)
            };
            self.core.apply(index, action);
        };

        if let Some(index) = consumer {
            self.core.tasks[index].runtime += 1;
            self.core.switch_to(index);
        }
        self.core.now += 1;
    }

    pub fn run_for(&mut self, ticks: Tick) {
        for _ in 0..ticks {
            self.step_tick();
        }
    }

    /// Runs until the tick counter reaches `tick`.
    pub fn run_until(&mut self, tick: Tick) {
        while self.core.now < tick {
            self.step_tick();
        }
    }

    /// Runs forever, optionally sleeping `pace` after every tick.
    #[cfg(feature = "std")]
    pub fn run_forever(mut self, pace: Option<std::time::Duration>) -> ! {
        loop {
            self.step_tick();
            if let Some(pace) = pace {
                std::thread::sleep(pace);
            }
        }
    }

    pub fn task_stats(&self) -> Vec<TaskStats> {
        self.core.tasks.iter().map(TaskControl::stats).collect()
    }

    pub fn runtime_stats(&self) -> RuntimeStats {
        self.core.runtime_stats()
    }

    pub fn write_runtime_stats(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.core.runtime_stats().write_table(out)
    }

    pub fn task(&self, id: TaskId) -> Result<TaskStats, KernelError> {
        self.control(id).map(TaskControl::stats)
    }

    pub fn find_task(&self, name: &str) -> Option<TaskId> {
        self.core
            .tasks
            .iter()
            .find(|task| task.config.name == name)
            .map(|task| task.id)
    }

    /// Current deadline of a periodic task.
    pub fn deadline(&self, id: TaskId) -> Result<Option<Tick>, KernelError> {
        self.control(id).map(|task| task.deadline)
    }

    fn control(&self, id: TaskId) -> Result<&TaskControl, KernelError> {
        self.core
            .tasks
            .get(usize::from(id.0))
            .ok_or(KernelError::UnknownTask(id))
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.core.config.name)
            .field("now", &self.core.now)
            .field("tasks", &self.core.tasks.len())
            .field("started", &self.core.started)
            .finish()
    }
}
