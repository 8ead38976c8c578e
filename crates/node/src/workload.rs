//! Simulated computation run by the periodic workload tasks.

use core::hint::black_box;

use rtk::Tick;

/// Bounded piece of work executed once per period.
///
/// `run` performs the work and returns how many ticks of CPU time it costs;
/// the task then holds the CPU for that many ticks without yielding.
pub trait Workload: Send {
    fn run(&mut self) -> Tick;
}

impl<W: Workload + ?Sized> Workload for Box<W> {
    fn run(&mut self) -> Tick {
        (**self).run()
    }
}

/// Workload backed by a closure returning the tick cost of each run.
#[derive(Debug, Clone, Copy)]
pub struct FromFn<F>(F);

pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> Tick + Send,
{
    FromFn(f)
}

impl<F> Workload for FromFn<F>
where
    F: FnMut() -> Tick + Send,
{
    fn run(&mut self) -> Tick {
        (self.0)()
    }
}

/// Iterations per tick used to price a [`BusyLoop`] when none is given.
pub const DEFAULT_ITERATIONS_PER_TICK: u32 = 20_000;

/// Counting loop the optimiser is not allowed to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyLoop {
    iterations: u32,
    iterations_per_tick: u32,
}

impl BusyLoop {
    pub fn new(iterations: u32) -> Self {
        Self::with_rate(iterations, DEFAULT_ITERATIONS_PER_TICK)
    }

    /// `iterations_per_tick` of zero is treated as one.
    pub fn with_rate(iterations: u32, iterations_per_tick: u32) -> Self {
        Self {
            iterations,
            iterations_per_tick: iterations_per_tick.max(1),
        }
    }

    /// Tick cost of one run, rounded up.
    pub fn cost(&self) -> Tick {
        Tick::from(self.iterations.div_ceil(self.iterations_per_tick))
    }
}

impl Workload for BusyLoop {
    fn run(&mut self) -> Tick {
        let mut counter = 0u32;
        for i in 0..self.iterations {
            counter = black_box(counter.wrapping_add(black_box(i)));
        }
        black_box(counter);
        self.cost()
    }
}

/// Workload with a constant cost and no real computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTicks(pub Tick);

impl Workload for FixedTicks {
    fn run(&mut self) -> Tick {
        self.0
    }
}
