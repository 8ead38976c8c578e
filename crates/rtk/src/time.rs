//! Tick arithmetic shared by the kernel and its tasks.

/// Smallest unit of the kernel's monotonic time base.
///
/// A 64-bit counter at any realistic tick rate outlives the hardware, so no
/// wrap-around handling is attempted anywhere in the kernel.
pub type Tick = u64;

/// Outcome of computing a periodic release point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The release lies in the future; the caller must sleep until `at`.
    Pending { at: Tick },
    /// The release point has already passed; the caller runs immediately.
    Due { at: Tick },
}

impl Release {
    /// The nominal release time regardless of whether sleeping is needed.
    pub fn at(self) -> Tick {
        match self {
            Self::Pending { at } | Self::Due { at } => at,
        }
    }

    pub fn is_due(self) -> bool {
        matches!(self, Self::Due { .. })
    }
}

/// Advances `last_wake` by `increment` and classifies the new release point.
///
/// The release schedule depends only on `last_wake`, never on `now`, so a
/// task that overruns does not shift later releases; it merely starts the
/// next iteration without sleeping.
pub fn next_release(last_wake: &mut Tick, increment: Tick, now: Tick) -> Release {
    let at = last_wake.saturating_add(increment);
    *last_wake = at;
    if at > now {
        Release::Pending { at }
    } else {
        Release::Due { at }
    }
}

/// Converts a tick count into wall-clock milliseconds at `tick_rate_hz`.
pub fn ticks_to_millis(ticks: Tick, tick_rate_hz: u32) -> u64 {
    if tick_rate_hz == 0 {
        return 0;
    }
    ticks.saturating_mul(1000) / u64::from(tick_rate_hz)
}
