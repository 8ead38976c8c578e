//! CPU load accounting driven by the kernel's task-switch hooks.

use rtk::sync::{Arc, Mutex};
use rtk::{KernelHooks, TaskSwitch, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagLoad {
    tag: u32,
    switched_in: Option<Tick>,
    busy: Tick,
}

#[derive(Debug, Default)]
struct LoadState {
    tags: Vec<TagLoad>,
}

impl LoadState {
    fn entry(&mut self, tag: u32) -> &mut TagLoad {
        let index = match self.tags.iter().position(|load| load.tag == tag) {
            Some(index) => index,
            None => {
                self.tags.push(TagLoad {
                    tag,
                    switched_in: None,
                    busy: 0,
                });
                self.tags.len() - 1
            }
        };
        &mut self.tags[index]
    }
}

/// Busy time of tagged tasks, measured between switch-in and switch-out.
///
/// Untagged tasks (the event pipeline, idle) are not counted, so the load
/// figure is the share of time spent in the tagged workloads.
#[derive(Debug, Clone, Default)]
pub struct LoadMonitor {
    state: Arc<Mutex<LoadState>>,
}

impl LoadMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switched_in(&self, switch: &TaskSwitch<'_>) {
        if let Some(tag) = switch.tag {
            self.state.lock().entry(tag).switched_in = Some(switch.at);
        }
    }

    pub fn switched_out(&self, switch: &TaskSwitch<'_>) {
        if let Some(tag) = switch.tag {
            let mut state = self.state.lock();
            let load = state.entry(tag);
            if let Some(since) = load.switched_in.take() {
                load.busy += switch.at.saturating_sub(since);
            }
        }
    }

    /// Installs the switch hooks on `hooks`.
    pub fn attach(&self, hooks: KernelHooks) -> KernelHooks {
        let on_in = self.clone();
        let on_out = self.clone();
        hooks
            .on_switch_in(move |switch| on_in.switched_in(switch))
            .on_switch_out(move |switch| on_out.switched_out(switch))
    }

    /// Busy ticks of the task tagged `tag` up to `now`, including a stretch
    /// that is still running.
    pub fn busy_time(&self, tag: u32, now: Tick) -> Tick {
        let state = self.state.lock();
        state
            .tags
            .iter()
            .find(|load| load.tag == tag)
            .map(|load| Self::busy_until(load, now))
            .unwrap_or(0)
    }

    /// Share of the `now` elapsed ticks spent in tagged tasks, in percent.
    pub fn load_percent(&self, now: Tick) -> f32 {
        if now == 0 {
            return 0.0;
        }
        let state = self.state.lock();
        let busy: Tick = state.tags.iter().map(|load| Self::busy_until(load, now)).sum();
        (busy as f64 * 100.0 / now as f64) as f32
    }

    fn busy_until(load: &TagLoad, now: Tick) -> Tick {
        let open = load
            .switched_in
            .map(|since| now.saturating_sub(since))
            .unwrap_or(0);
        load.busy + open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtk::TaskId;

    fn switch(tag: Option<u32>, at: Tick) -> TaskSwitch<'static> {
        TaskSwitch {
            task: TaskId(0),
            name: "Task",
            tag,
            at,
        }
    }

    #[test]
    fn accumulates_busy_intervals() {
        let monitor = LoadMonitor::new();
        monitor.switched_in(&switch(Some(1), 0));
        monitor.switched_out(&switch(Some(1), 5));
        monitor.switched_in(&switch(Some(1), 60));
        monitor.switched_out(&switch(Some(1), 65));
        monitor.switched_in(&switch(None, 65));

        assert_eq!(monitor.busy_time(1, 100), 10);
        assert_eq!(monitor.busy_time(2, 100), 0);
        assert!((monitor.load_percent(100) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn debug_shows_tracked_tags() {
        let monitor = LoadMonitor::new();
        monitor.switched_in(&switch(Some(4), 0));
        let text = format!("{monitor:?}");
        assert!(text.contains("LoadMonitor"));
        assert!(text.contains("tag: 4"));
    }

    #[test]
    fn open_interval_counts_until_now() {
        let monitor = LoadMonitor::new();
        monitor.switched_in(&switch(Some(2), 10));
        assert_eq!(monitor.busy_time(2, 14), 4);
        assert_eq!(monitor.load_percent(0), 0.0);
    }
}
