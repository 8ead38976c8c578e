//! Event log consumer draining the queue to the serial port.

use core::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use rtk::sync::Arc;
use rtk::{BoundedQueue, QueueError, Suspend, TaskBody, TaskContext, Tick, WaitPolicy};

use crate::message::EventMessage;
use crate::sink::SerialSink;

/// Single consumer of the event queue.
///
/// Every message is written verbatim (without its NUL padding), followed by
/// a fixed settle delay before the next receive.
pub struct EventLogConsumer {
    queue: BoundedQueue<EventMessage>,
    sink: SerialSink,
    settle: Tick,
    forwarded: Arc<AtomicU64>,
}

impl EventLogConsumer {
    pub fn new(queue: BoundedQueue<EventMessage>, sink: SerialSink, settle: Tick) -> Self {
        Self {
            queue,
            sink,
            settle,
            forwarded: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn forwarded_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.forwarded)
    }
}

impl TaskBody for EventLogConsumer {
    fn step(&mut self, ctx: &mut TaskContext<'_>) -> Suspend {
        match ctx.receive(&self.queue, WaitPolicy::Forever) {
            Ok(message) => {
                self.sink.write(message.as_bytes());
                self.forwarded.fetch_add(1, Ordering::Relaxed);
                ctx.delay(self.settle)
            }
            Err(QueueError::WouldBlock) => Suspend::Blocked,
            Err(err) => {
                warn!("{}: receive failed: {err}", ctx.name());
                ctx.delay(self.settle)
            }
        }
    }
}
