//! Periodic workload task with deadline supervision.

use rtk::{Suspend, TaskBody, TaskContext, Tick};

use crate::deadline::{DeadlineRecord, DeadlineSupervisor, MissCounter};
use crate::reporter::StatsReporter;
use crate::workload::Workload;

type ReleaseHook = Box<dyn FnMut(Tick) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// First activation: capture the release reference and initial deadline.
    Init,
    /// Start of an iteration.
    Release,
    /// The workload's CPU time has been consumed.
    Finish,
    /// Back from the absolute delay.
    Resume,
}

/// One iteration per period: run the workload, optionally report run-time
/// statistics, check the deadline, then sleep until the next release.
///
/// Releases follow the grid `start + k * period` no matter how long the
/// workload takes.
pub struct PeriodicWorkload<W> {
    period: Tick,
    workload: W,
    supervisor: DeadlineSupervisor,
    reporter: Option<StatsReporter>,
    on_release: Option<ReleaseHook>,
    phase: Phase,
}

impl<W: Workload> PeriodicWorkload<W> {
    pub fn new(tag: u32, period: Tick, workload: W) -> Self {
        Self {
            period,
            workload,
            supervisor: DeadlineSupervisor::new(tag),
            reporter: None,
            on_release: None,
            phase: Phase::Init,
        }
    }

    /// Colocates the run-time statistics reporter with this task.
    pub fn with_reporter(mut self, reporter: StatsReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Calls `hook` with the tick at which every iteration starts.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Tick) + Send + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn misses(&self) -> MissCounter {
        self.supervisor.counter()
    }

    pub fn record(&self) -> DeadlineRecord {
        self.supervisor.record()
    }

    fn begin_iteration(&mut self, ctx: &mut TaskContext<'_>) -> Option<Suspend> {
        if let Some(hook) = self.on_release.as_mut() {
            hook(ctx.now());
        }
        self.phase = Phase::Finish;
        match self.workload.run() {
            0 => None,
            ticks => Some(Suspend::Busy(ticks)),
        }
    }

    fn finish_iteration(&mut self, ctx: &mut TaskContext<'_>) -> Suspend {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.report(ctx);
        }
        self.supervisor.complete(ctx.now());
        self.phase = Phase::Resume;
        ctx.delay_until(self.supervisor.last_wake_mut(), self.period)
    }
}

impl<W: Workload> TaskBody for PeriodicWorkload<W> {
    fn step(&mut self, ctx: &mut TaskContext<'_>) -> Suspend {
        loop {
            match self.phase {
                Phase::Init => {
                    let now = ctx.now();
                    let deadline = ctx.deadline().unwrap_or(now + self.period);
                    self.supervisor.start(now, deadline);
                    self.phase = Phase::Release;
                }
                Phase::Release => {
                    if let Some(suspend) = self.begin_iteration(ctx) {
                        return suspend;
                    }
                }
                Phase::Finish => return self.finish_iteration(ctx),
                Phase::Resume => {
                    let deadline = ctx.deadline().unwrap_or(ctx.now() + self.period);
                    self.supervisor.released(deadline);
                    self.phase = Phase::Release;
                }
            }
        }
    }
}
