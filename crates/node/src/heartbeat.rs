//! Fixed-interval heartbeat producer.

use core::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use rtk::sync::Arc;
use rtk::{BoundedQueue, QueueError, Suspend, TaskBody, TaskContext, Tick, WaitPolicy};

use crate::message::EventMessage;

/// Task queueing the same message once per interval.
///
/// The send waits for as long as the queue stays full, so heartbeats are
/// delayed under back-pressure but never lost.
pub struct PeriodicEventSource {
    message: EventMessage,
    queue: BoundedQueue<EventMessage>,
    interval: Tick,
    sent: Arc<AtomicU64>,
}

impl PeriodicEventSource {
    pub fn new(message: EventMessage, queue: BoundedQueue<EventMessage>, interval: Tick) -> Self {
        Self {
            message,
            queue,
            interval,
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle to the number of heartbeats queued so far.
    pub fn sent_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.sent)
    }
}

impl TaskBody for PeriodicEventSource {
    fn step(&mut self, ctx: &mut TaskContext<'_>) -> Suspend {
        match ctx.send(&self.queue, self.message, WaitPolicy::Forever) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                ctx.delay(self.interval)
            }
            Err(QueueError::WouldBlock) => Suspend::Blocked,
            Err(err) => {
                warn!("{}: heartbeat send failed: {err}", ctx.name());
                ctx.delay(self.interval)
            }
        }
    }
}
