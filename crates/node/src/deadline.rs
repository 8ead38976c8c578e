//! Per-task deadline bookkeeping for the periodic workloads.

use core::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use rtk::sync::Arc;
use rtk::Tick;

/// Deadline state owned by one workload task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlineRecord {
    /// Deadline of the current release, as last read from the kernel.
    pub last_deadline: Tick,
    /// Completion tick of the most recent iteration.
    pub last_completion: Tick,
    /// Cumulative number of detected misses.
    pub misses: u64,
    /// Release reference for the next absolute delay.
    pub last_wake: Tick,
}

/// Read-only handle to a task's miss count.
#[derive(Debug, Clone, Default)]
pub struct MissCounter(Arc<AtomicU64>);

impl MissCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, misses: u64) {
        self.0.store(misses, Ordering::Relaxed);
    }
}

/// Checks completions against deadlines, one iteration behind.
///
/// Each completion is remembered together with the deadline that was current
/// when it happened. The comparison runs at the next completion, so the
/// overrun of iteration `k` shows up in the counter at iteration `k + 1`.
#[derive(Debug)]
pub struct DeadlineSupervisor {
    tag: u32,
    record: DeadlineRecord,
    pending: Option<(Tick, Tick)>,
    counter: MissCounter,
}

impl DeadlineSupervisor {
    pub fn new(tag: u32) -> Self {
        Self {
            tag,
            record: DeadlineRecord::default(),
            pending: None,
            counter: MissCounter::default(),
        }
    }

    /// Initialises the record when the task first runs.
    pub fn start(&mut self, now: Tick, deadline: Tick) {
        self.record.last_wake = now;
        self.record.last_deadline = deadline;
    }

    /// Records the completion of an iteration at `now`.
    ///
    /// Returns `true` when the previous iteration is found to have missed its
    /// deadline.
    pub fn complete(&mut self, now: Tick) -> bool {
        let mut missed = false;
        if let Some((completion, deadline)) = self.pending {
            if completion > deadline {
                missed = true;
                self.record.misses += 1;
                self.counter.set(self.record.misses);
                debug!(
                    "task tag {}: completion at {completion} missed deadline {deadline} ({} misses)",
                    self.tag, self.record.misses
                );
            }
        }
        self.record.last_completion = now;
        self.pending = Some((now, self.record.last_deadline));
        missed
    }

    /// Takes over the deadline recomputed by the kernel at a release.
    pub fn released(&mut self, deadline: Tick) {
        self.record.last_deadline = deadline;
    }

    pub fn last_wake_mut(&mut self) -> &mut Tick {
        &mut self.record.last_wake
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn record(&self) -> DeadlineRecord {
        self.record
    }

    pub fn misses(&self) -> u64 {
        self.record.misses
    }

    pub fn counter(&self) -> MissCounter {
        self.counter.clone()
    }
}
