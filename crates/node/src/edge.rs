//! Digital edge detection on polled input pins.

use core::sync::atomic::{AtomicU64, Ordering};

use hal::{InputPin, Level};
use log::{debug, warn};
use rtk::sync::Arc;
use rtk::{BoundedQueue, Suspend, TaskBody, TaskContext, Tick, WaitPolicy};

use crate::message::EventMessage;

/// Direction of a level transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    pub fn label(self) -> &'static str {
        match self {
            Edge::Rising => "Rising",
            Edge::Falling => "Falling",
        }
    }
}

/// Sample state of one pin: the previous stable level and the last reading.
///
/// Starts out `High`, the idle level of a pulled-up button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeState {
    previous: Level,
    last: Level,
}

impl Default for EdgeState {
    fn default() -> Self {
        Self::new(Level::High)
    }
}

impl EdgeState {
    pub fn new(initial: Level) -> Self {
        Self {
            previous: initial,
            last: initial,
        }
    }

    /// Feeds one reading and reports the transition it completes, if any.
    ///
    /// The new level becomes the previous one as soon as an edge is reported,
    /// so a level that persists over several polls yields a single edge.
    pub fn sample(&mut self, level: Level) -> Option<Edge> {
        self.last = level;
        if self.last == self.previous {
            return None;
        }
        let edge = match self.previous {
            Level::High => Edge::Falling,
            Level::Low => Edge::Rising,
        };
        self.previous = self.last;
        Some(edge)
    }

    pub fn previous(&self) -> Level {
        self.previous
    }

    pub fn last(&self) -> Level {
        self.last
    }
}

/// Shared counters of an edge detector.
#[derive(Debug, Default)]
pub struct EdgeCounters {
    emitted: AtomicU64,
    dropped: AtomicU64,
    read_errors: AtomicU64,
}

impl EdgeCounters {
    /// Edges that made it into the queue.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Edges lost because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

/// Task polling one pin and queueing a message per detected edge.
///
/// Messages are sent without waiting: when the queue is full the
/// notification is dropped and counted.
pub struct EdgeDetector<P> {
    source: String,
    pin: P,
    state: EdgeState,
    queue: BoundedQueue<EventMessage>,
    poll_interval: Tick,
    counters: Arc<EdgeCounters>,
}

impl<P: InputPin> EdgeDetector<P> {
    pub fn new(
        source: impl Into<String>,
        pin: P,
        queue: BoundedQueue<EventMessage>,
        poll_interval: Tick,
    ) -> Self {
        Self {
            source: source.into(),
            pin,
            state: EdgeState::default(),
            queue,
            poll_interval,
            counters: Arc::new(EdgeCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<EdgeCounters> {
        Arc::clone(&self.counters)
    }

    fn emit(&self, ctx: &mut TaskContext<'_>, edge: Edge) {
        let message = EventMessage::edge(edge, &self.source);
        match ctx.send(&self.queue, message, WaitPolicy::NoWait) {
            Ok(()) => {
                self.counters.emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "{}: dropped {} edge at tick {}: {err}",
                    self.source,
                    edge.label(),
                    ctx.now()
                );
            }
        }
    }
}

impl<P: InputPin> TaskBody for EdgeDetector<P> {
    fn step(&mut self, ctx: &mut TaskContext<'_>) -> Suspend {
        match self.pin.read() {
            Ok(level) => {
                if let Some(edge) = self.state.sample(level) {
                    self.emit(ctx, edge);
                }
            }
            Err(err) => {
                self.counters.read_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "{}: reading pin {} failed: {err}",
                    self.source,
                    self.pin.pin_number()
                );
            }
        }
        ctx.delay(self.poll_interval)
    }
}
