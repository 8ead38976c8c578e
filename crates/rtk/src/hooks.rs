//! Application hooks invoked by the kernel.

use core::fmt;

use crate::sync::Arc;
use crate::task::TaskId;
use crate::time::Tick;

/// Describes the task entering or leaving the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSwitch<'a> {
    pub task: TaskId,
    pub name: &'a str,
    pub tag: Option<u32>,
    /// Tick at which the switch took effect.
    pub at: Tick,
}

pub type TickHook = Arc<dyn Fn(Tick) + Send + Sync>;
pub type SwitchHook = Arc<dyn Fn(&TaskSwitch<'_>) + Send + Sync>;

/// Optional callbacks run from the kernel's tick and dispatch path.
///
/// Hooks run inside the kernel and must not block.
#[derive(Clone, Default)]
pub struct KernelHooks {
    pub(crate) tick: Option<TickHook>,
    pub(crate) switched_in: Option<SwitchHook>,
    pub(crate) switched_out: Option<SwitchHook>,
}

impl KernelHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called at the start of every tick, before any task is released.
    pub fn on_tick<F>(mut self, hook: F) -> Self
    where
        F: Fn(Tick) + Send + Sync + 'static,
    {
        self.tick = Some(Arc::new(hook));
        self
    }

    /// Called when a task starts consuming ticks.
    pub fn on_switch_in<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskSwitch<'_>) + Send + Sync + 'static,
    {
        self.switched_in = Some(Arc::new(hook));
        self
    }

    /// Called when a task stops consuming ticks.
    pub fn on_switch_out<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskSwitch<'_>) + Send + Sync + 'static,
    {
        self.switched_out = Some(Arc::new(hook));
        self
    }

    pub(crate) fn tick(&self, now: Tick) {
        if let Some(hook) = &self.tick {
            hook(now);
        }
    }

    pub(crate) fn switched_in(&self, switch: &TaskSwitch<'_>) {
        if let Some(hook) = &self.switched_in {
            hook(switch);
        }
    }

    pub(crate) fn switched_out(&self, switch: &TaskSwitch<'_>) {
        if let Some(hook) = &self.switched_out {
            hook(switch);
        }
    }
}

impl fmt::Debug for KernelHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHooks")
            .field("tick", &self.tick.is_some())
            .field("switched_in", &self.switched_in.is_some())
            .field("switched_out", &self.switched_out.is_some())
            .finish()
    }
}
