//! GPIO (General Purpose Input/Output) abstraction

use alloc::boxed::Box;
use core::ops::Not;

use crate::error::HalResult;

/// GPIO pin levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Low level (0V)
    Low,
    /// High level (VCC)
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Digital input pin (object-safe)
pub trait InputPin: Send {
    /// Read current level
    fn read(&mut self) -> HalResult<Level>;

    /// Get pin number
    fn pin_number(&self) -> u32;
}

/// Digital output pin (object-safe)
pub trait OutputPin: Send {
    /// Drive the pin to `level`
    fn write(&mut self, level: Level) -> HalResult<()>;

    /// Level last driven onto the pin
    fn output_level(&self) -> Level;

    /// Toggle output
    fn toggle(&mut self) -> HalResult<()> {
        let next = !self.output_level();
        self.write(next)
    }

    /// Get pin number
    fn pin_number(&self) -> u32;
}

impl<P: InputPin + ?Sized> InputPin for Box<P> {
    fn read(&mut self) -> HalResult<Level> {
        (**self).read()
    }

    fn pin_number(&self) -> u32 {
        (**self).pin_number()
    }
}

impl<P: OutputPin + ?Sized> OutputPin for Box<P> {
    fn write(&mut self, level: Level) -> HalResult<()> {
        (**self).write(level)
    }

    fn output_level(&self) -> Level {
        (**self).output_level()
    }

    fn pin_number(&self) -> u32 {
        (**self).pin_number()
    }
}
