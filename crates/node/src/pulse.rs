//! Tick pulse on an output pin.

use core::sync::atomic::{AtomicBool, Ordering};

use hal::{Level, OutputPin};
use log::warn;
use rtk::sync::{Arc, Mutex};
use rtk::{KernelHooks, Tick};

/// Drives a pin high then low on every kernel tick, so the tick rate can be
/// watched with a logic analyser.
#[derive(Clone)]
pub struct TickPulse {
    pin: Arc<Mutex<Box<dyn OutputPin>>>,
    failed: Arc<AtomicBool>,
}

impl TickPulse {
    pub fn new(pin: Box<dyn OutputPin>) -> Self {
        Self {
            pin: Arc::new(Mutex::new(pin)),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pulse(&self, now: Tick) {
        let mut pin = self.pin.lock();
        let result = pin.write(Level::High).and_then(|()| pin.write(Level::Low));
        // Only the first failure is logged; the hook runs on every tick.
        if let Err(err) = result {
            if !self.failed.swap(true, Ordering::Relaxed) {
                warn!(
                    "tick pulse on pin {} failed at tick {now}: {err}",
                    pin.pin_number()
                );
            }
        }
    }

    /// Installs the pulse as the tick hook on `hooks`.
    pub fn attach(&self, hooks: KernelHooks) -> KernelHooks {
        let pulse = self.clone();
        hooks.on_tick(move |now| pulse.pulse(now))
    }
}
