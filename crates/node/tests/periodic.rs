//! Release timing and lagged deadline supervision of periodic workloads.

use std::sync::{Arc, Mutex};

use hal::sim::{CaptureSerial, SharedPin};
use hal::{InputPin, Level};
use node::workload::from_fn;
use node::{FixedTicks, Node, NodeConfig, Peripherals, PeriodicWorkload};
use rtk::{Kernel, TaskConfig, Tick};

fn release_log() -> Arc<Mutex<Vec<Tick>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn releases_are_exactly_one_period_apart() {
    let releases = release_log();
    let durations = [1, 9, 4, 7, 2];
    let mut next = 0;
    let workload = from_fn(move || {
        let ticks = durations[next % durations.len()];
        next += 1;
        ticks
    });
    let task = {
        let releases = releases.clone();
        PeriodicWorkload::new(1, 10, workload).on_release(move |now| releases.lock().unwrap().push(now))
    };

    let mut builder = Kernel::builder();
    builder
        .spawn(TaskConfig::new("Task1", 1).periodic(10).with_tag(1), task)
        .unwrap();
    let mut kernel = builder.build().unwrap();
    kernel.run_for(100);

    let releases = releases.lock().unwrap();
    assert_eq!(*releases, (0..10).map(|k| k * 10).collect::<Vec<Tick>>());
}

#[test]
fn overrun_is_counted_one_iteration_later() {
    let releases = release_log();
    let durations = [3, 12, 3, 3, 3, 3];
    let mut next = 0;
    let workload = from_fn(move || {
        let ticks = durations[next.min(durations.len() - 1)];
        next += 1;
        ticks
    });
    let task = {
        let releases = releases.clone();
        PeriodicWorkload::new(1, 10, workload).on_release(move |now| releases.lock().unwrap().push(now))
    };
    let misses = task.misses();

    let mut builder = Kernel::builder();
    let handle = builder
        .spawn(TaskConfig::new("Task1", 1).periodic(10).with_tag(1), task)
        .unwrap();
    let mut kernel = builder.build().unwrap();

    // Iteration 1 is released at 10 and completes at 22, past its deadline
    // of 20; the check at that completion still looks at iteration 0.
    kernel.run_until(23);
    assert_eq!(misses.get(), 0);

    // Iteration 2 starts late at 22 and completes at 25, reporting the miss.
    kernel.run_until(26);
    assert_eq!(misses.get(), 1);

    kernel.run_until(60);
    assert_eq!(misses.get(), 1);
    assert_eq!(*releases.lock().unwrap(), vec![0, 10, 22, 30, 40, 50]);
    assert_eq!(kernel.deadline(handle.id).unwrap(), Some(70));
}

#[test]
fn workload_without_cost_still_runs_every_period() {
    let releases = release_log();
    let task = {
        let releases = releases.clone();
        PeriodicWorkload::new(3, 25, FixedTicks(0)).on_release(move |now| releases.lock().unwrap().push(now))
    };
    let misses = task.misses();

    let mut builder = Kernel::builder();
    builder
        .spawn(TaskConfig::new("Light", 1).periodic(25).with_tag(3), task)
        .unwrap();
    let mut kernel = builder.build().unwrap();
    kernel.run_for(100);

    assert_eq!(*releases.lock().unwrap(), vec![0, 25, 50, 75]);
    assert_eq!(misses.get(), 0);
}

#[test]
fn default_node_meets_every_deadline() {
    let serial = CaptureSerial::new();
    let inputs: Vec<Box<dyn InputPin>> = vec![
        Box::new(SharedPin::new(0, Level::High)),
        Box::new(SharedPin::new(1, Level::High)),
    ];
    let peripherals = Peripherals {
        inputs,
        serial: Box::new(serial.clone()),
        tick_pin: None,
    };
    let mut node = Node::build(&NodeConfig::default(), peripherals).unwrap();

    node.run_for(480);

    let snapshot = node.snapshot();
    assert_eq!(snapshot.total_misses(), 0);

    let task1 = snapshot.workload("Task1").unwrap();
    let task2 = snapshot.workload("Task2").unwrap();
    assert_eq!(task1.runtime, 40);
    assert_eq!(task2.runtime, 30);
    assert_eq!(task1.busy_time, 40);
    assert_eq!(task2.busy_time, 30);
    assert!(snapshot.cpu_load > 14.0 && snapshot.cpu_load < 15.0);
    // Task2 went to sleep after its release at 400; the deadline already
    // belongs to the release at 480.
    assert_eq!(task2.deadline, Some(560));
}
