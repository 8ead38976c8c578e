//! Kernel services available to a running task.

use alloc::vec::Vec;
use core::fmt;

use crate::kernel::{KernelCore, TaskControl};
use crate::queue::{BoundedQueue, QueueError, WaitQueue, WaitPolicy, Waiter};
use crate::stats::{RuntimeStats, TaskStats};
use crate::sync::Arc;
use crate::task::{Suspend, TaskId};
use crate::time::{next_release, Release, Tick};

/// Handle passed to [`TaskBody::step`](crate::TaskBody::step).
pub struct TaskContext<'k> {
    core: &'k mut KernelCore,
    index: usize,
}

impl<'k> TaskContext<'k> {
    pub(crate) fn new(core: &'k mut KernelCore, index: usize) -> Self {
        Self { core, index }
    }

    fn control(&self) -> &TaskControl {
        &self.core.tasks[self.index]
    }

    fn control_mut(&mut self) -> &mut TaskControl {
        &mut self.core.tasks[self.index]
    }

    /// Current tick count.
    pub fn now(&self) -> Tick {
        self.core.now
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.core.config.tick_rate_hz
    }

    pub fn id(&self) -> TaskId {
        self.control().id
    }

    pub fn name(&self) -> &str {
        &self.control().config.name
    }

    pub fn priority(&self) -> u8 {
        self.control().config.priority
    }

    pub fn tag(&self) -> Option<u32> {
        self.control().config.tag
    }

    pub fn set_tag(&mut self, tag: u32) {
        self.control_mut().config.tag = Some(tag);
    }

    pub fn period(&self) -> Option<Tick> {
        self.control().config.period
    }

    /// Deadline of the current release; `None` for non-periodic tasks.
    pub fn deadline(&self) -> Option<Tick> {
        self.control().deadline
    }

    pub fn set_deadline(&mut self, deadline: Tick) {
        self.control_mut().deadline = Some(deadline);
    }

    /// Sleeps for `ticks` relative to now.
    pub fn delay(&self, ticks: Tick) -> Suspend {
        Suspend::Delay(ticks)
    }

    /// Sleeps until `*last_wake + increment` and advances `last_wake`.
    ///
    /// For periodic tasks the deadline moves to one period after the new
    /// release. When the release point has already passed the task keeps
    /// running and [`Suspend::Continue`] is returned.
    pub fn delay_until(&mut self, last_wake: &mut Tick, increment: Tick) -> Suspend {
        let release = next_release(last_wake, increment, self.core.now);
        if let Some(period) = self.period() {
            self.control_mut().deadline = Some(release.at().saturating_add(period));
        }
        match release {
            Release::Pending { at } => Suspend::Until(at),
            Release::Due { .. } => Suspend::Continue,
        }
    }

    /// Sends `item` to `queue`.
    ///
    /// When the queue is full and `policy` allows waiting, the task is
    /// registered as a sender and [`QueueError::WouldBlock`] is returned; the
    /// body should return [`Suspend::Blocked`] and call `send` again once
    /// resumed. A bounded wait that expires yields [`QueueError::Timeout`].
    pub fn send<T>(&mut self, queue: &BoundedQueue<T>, item: T, policy: WaitPolicy) -> Result<(), QueueError>
    where
        T: Copy + Send + 'static,
    {
        if Self::is_immediate(policy) {
            return queue.try_send(item);
        }
        if self.take_timed_out() {
            return queue.try_send(item).map_err(|_| QueueError::Timeout);
        }
        let result = queue.send_or_wait(item, self.waiter());
        self.settle(result, policy, || queue.wait_handle())
    }

    /// Receives the oldest item from `queue`. Waiting follows the same
    /// protocol as [`send`](Self::send).
    pub fn receive<T>(&mut self, queue: &BoundedQueue<T>, policy: WaitPolicy) -> Result<T, QueueError>
    where
        T: Copy + Send + 'static,
    {
        if Self::is_immediate(policy) {
            return queue.try_receive();
        }
        if self.take_timed_out() {
            return queue.try_receive().map_err(|_| QueueError::Timeout);
        }
        let result = queue.receive_or_wait(self.waiter());
        self.settle(result, policy, || queue.wait_handle())
    }

    pub fn task_stats(&self) -> Vec<TaskStats> {
        self.core.runtime_stats().tasks
    }

    pub fn runtime_stats(&self) -> RuntimeStats {
        self.core.runtime_stats()
    }

    /// Writes the per-task run-time table into `out`.
    pub fn write_runtime_stats(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.core.runtime_stats().write_table(out)
    }

    fn is_immediate(policy: WaitPolicy) -> bool {
        matches!(policy, WaitPolicy::NoWait | WaitPolicy::Ticks(0))
    }

    fn waiter(&self) -> Waiter {
        Waiter {
            id: self.control().id,
            priority: self.control().config.priority,
        }
    }

    fn take_timed_out(&mut self) -> bool {
        let task = self.control_mut();
        let timed_out = task.timed_out;
        if timed_out {
            task.timed_out = false;
            task.wait_deadline = None;
        }
        timed_out
    }

    fn settle<R>(
        &mut self,
        result: Result<R, QueueError>,
        policy: WaitPolicy,
        handle: impl FnOnce() -> Arc<dyn WaitQueue>,
    ) -> Result<R, QueueError> {
        let now = self.core.now;
        let task = self.control_mut();
        match &result {
            Ok(_) => task.wait_deadline = None,
            Err(_) => {
                task.wait = Some(handle());
                if let WaitPolicy::Ticks(ticks) = policy {
                    if task.wait_deadline.is_none() {
                        task.wait_deadline = Some(now.saturating_add(ticks));
                    }
                }
            }
        }
        result
    }
}
