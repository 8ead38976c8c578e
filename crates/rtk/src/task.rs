//! Task descriptors and the task entry abstraction.
//!
//! Tasks are written as resumable bodies: the kernel calls
//! [`TaskBody::step`] whenever the task is released, and the body answers
//! with a [`Suspend`] telling the kernel how the task gives up the CPU. An
//! infinite `for (;;)` task loop becomes a body that keeps its loop position
//! in its own fields.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use core::fmt;

use crate::context::TaskContext;
use crate::time::Tick;

/// Highest task priority accepted by the kernel.
pub const MAX_PRIORITY: u8 = 63;

/// Kernel-assigned task identifier, also the task's creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u8);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Holding the CPU for the current tick.
    Running,
    /// Waiting for the CPU.
    Ready,
    /// Sleeping on a delay or waiting on a queue.
    Blocked,
}

impl TaskState {
    /// Single-letter code used in the runtime statistics table.
    pub fn code(self) -> char {
        match self {
            Self::Running => 'X',
            Self::Ready => 'R',
            Self::Blocked => 'B',
        }
    }
}

/// How a task body yields the CPU at the end of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// Keep the CPU for `n` ticks of computation, then step again.
    Busy(Tick),
    /// Sleep for `n` ticks relative to now.
    Delay(Tick),
    /// Sleep until the absolute tick.
    Until(Tick),
    /// Wait on the queue operation registered through the context.
    Blocked,
    /// Step again without giving up the CPU.
    Continue,
}

/// Task entry point.
pub trait TaskBody: Send {
    fn step(&mut self, ctx: &mut TaskContext<'_>) -> Suspend;
}

impl<F> TaskBody for F
where
    F: FnMut(&mut TaskContext<'_>) -> Suspend + Send,
{
    fn step(&mut self, ctx: &mut TaskContext<'_>) -> Suspend {
        self(ctx)
    }
}

pub type BoxedTask = Box<dyn TaskBody>;

/// Creation parameters for a task.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub name: Cow<'static, str>,
    pub priority: u8,
    /// Stack budget in words.
    pub stack_words: u16,
    /// Release period for periodic tasks.
    pub period: Option<Tick>,
    /// Opaque application tag.
    pub tag: Option<u32>,
}

impl TaskConfig {
    /// Creates a plain (non-periodic) task configuration.
    pub fn new(name: impl Into<Cow<'static, str>>, priority: u8) -> Self {
        Self {
            name: name.into(),
            priority,
            stack_words: 100,
            period: None,
            tag: None,
        }
    }

    /// Turns the task into a periodic task with kernel deadline tracking.
    pub fn periodic(mut self, period: Tick) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_stack_words(mut self, words: u16) -> Self {
        self.stack_words = words;
        self
    }

    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Handle returned by task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub priority: u8,
    pub period: Option<Tick>,
}
