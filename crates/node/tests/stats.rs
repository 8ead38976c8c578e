//! Run-time statistics reporting over the serial port.

use std::sync::{Arc, Mutex};

use hal::sim::{CaptureSerial, SharedPin};
use hal::{InputPin, Level, SerialConfig};
use node::{Node, NodeConfig, Peripherals, SerialSink, StatsReporter};
use rtk::{Kernel, Suspend, TaskConfig, TaskContext};

fn default_node(serial: &CaptureSerial) -> Node {
    let inputs: Vec<Box<dyn InputPin>> = vec![
        Box::new(SharedPin::new(0, Level::High)),
        Box::new(SharedPin::new(1, Level::High)),
    ];
    let peripherals = Peripherals {
        inputs,
        serial: Box::new(serial.clone()),
        tick_pin: None,
    };
    Node::build(&NodeConfig::default(), peripherals).unwrap()
}

#[test]
fn report_is_cut_at_buffer_size() {
    let serial = CaptureSerial::new();
    let sink = SerialSink::new(Box::new(serial.clone()));
    sink.configure(&SerialConfig::default()).unwrap();

    let seen = Arc::new(Mutex::new(String::new()));
    let mut reporter = StatsReporter::<16>::new(sink);
    let mut builder = Kernel::builder();
    {
        let seen = seen.clone();
        builder
            .spawn(TaskConfig::new("Reporter", 1), move |ctx: &mut TaskContext<'_>| {
                reporter.report(ctx);
                *seen.lock().unwrap() = reporter.last_report().to_owned();
                Suspend::Delay(50)
            })
            .unwrap();
    }
    let mut kernel = builder.build().unwrap();
    kernel.run_for(1);

    let report = seen.lock().unwrap().clone();
    // Name padded to 12 columns, then state and priority.
    assert_eq!(report, "Reporter    \tX\t1");
    assert_eq!(serial.text(), format!("\n{report}"));
}

#[test]
fn default_node_reports_every_task() {
    let serial = CaptureSerial::new();
    let mut node = default_node(&serial);

    // Task2 finishes its first iteration at tick 5 and reports.
    node.run_for(6);
    let text = serial.text();
    for name in ["Task1", "Task2", "Button1", "Button2", "Periodic", "UART", "IDLE"] {
        assert!(text.contains(name), "{name} missing from report:\n{text}");
    }
    assert!(text.starts_with('\n'));
    assert!(text.contains("\r\n"));
}

#[test]
fn report_marks_reporter_as_running() {
    let serial = CaptureSerial::new();
    let mut node = default_node(&serial);
    node.run_for(6);

    let text = serial.text();
    let task2 = text
        .lines()
        .find(|line| line.starts_with("Task2"))
        .expect("Task2 row");
    let columns: Vec<&str> = task2.trim_end().split('\t').collect();
    assert_eq!(columns[1], "X");
    assert_eq!(columns[2], "2");
    assert_eq!(columns[3], "100");
}

#[test]
fn runtime_never_decreases() {
    let serial = CaptureSerial::new();
    let mut node = default_node(&serial);

    let mut previous = node.runtime_stats();
    for _ in 0..6 {
        node.run_for(50);
        let current = node.runtime_stats();
        for task in &current.tasks {
            let before = previous.get(task.id).map(|t| t.runtime).unwrap_or(0);
            assert!(task.runtime >= before, "{} went backwards", task.name);
        }
        // Every tick is charged to exactly one task, idle included.
        assert_eq!(current.total, node.now());
        previous = current;
    }
}
