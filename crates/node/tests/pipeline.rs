//! Edge detectors and heartbeat feeding the serial log through the queue.

use hal::sim::{CaptureSerial, RecordingPin, ScriptedPin, SharedPin};
use hal::{InputPin, Level};
use node::{HeartbeatConfig, LoggerConfig, Node, NodeConfig, NodeError, Peripherals};
use rtk::KernelError;

fn peripherals(inputs: Vec<Box<dyn InputPin>>, serial: &CaptureSerial) -> Peripherals {
    Peripherals {
        inputs,
        serial: Box::new(serial.clone()),
        tick_pin: None,
    }
}

fn pipeline_config() -> NodeConfig {
    NodeConfig::builder().workloads(Vec::new()).tick_pulse(false).build()
}

#[test]
fn edges_and_heartbeat_reach_serial_in_order() {
    let serial = CaptureSerial::new();
    let inputs: Vec<Box<dyn InputPin>> = vec![
        Box::new(ScriptedPin::from_bits(0, &[1, 1, 0, 0, 1])),
        Box::new(ScriptedPin::from_bits(1, &[])),
    ];
    let mut node = Node::build(&pipeline_config(), peripherals(inputs, &serial)).unwrap();

    node.run_for(60);

    assert_eq!(
        serial.text(),
        "\n randomstring \n\n Falling edge detected on B1 \n\n Rising edge detected on B1 \n"
    );
    let snapshot = node.snapshot();
    assert_eq!(snapshot.edges[0].emitted, 2);
    assert_eq!(snapshot.edges[1].emitted, 0);
    assert_eq!(snapshot.heartbeats, 1);
    assert_eq!(snapshot.forwarded, 3);
    assert_eq!(snapshot.queue_depth, 0);
}

#[test]
fn serial_port_is_configured_at_baud_rate() {
    let serial = CaptureSerial::new();
    let inputs: Vec<Box<dyn InputPin>> = vec![
        Box::new(SharedPin::new(0, Level::High)),
        Box::new(SharedPin::new(1, Level::High)),
    ];
    let _node = Node::build(&pipeline_config(), peripherals(inputs, &serial)).unwrap();
    assert_eq!(serial.config().map(|c| c.baud_rate), Some(115_200));
}

#[test]
fn edges_are_dropped_when_queue_is_full() {
    let serial = CaptureSerial::new();
    let button = SharedPin::new(0, Level::High);
    let config = NodeConfig::builder()
        .workloads(Vec::new())
        .edges(vec![node::EdgeConfig::new("Button1", "B1")])
        .queue_capacity(2)
        .heartbeat(HeartbeatConfig {
            interval: 10_000,
            ..HeartbeatConfig::default()
        })
        .logger(LoggerConfig {
            settle: 1_000,
            ..LoggerConfig::default()
        })
        .tick_pulse(false)
        .build();
    let mut node = Node::build(&config, peripherals(vec![Box::new(button.clone())], &serial)).unwrap();

    node.run_for(5);
    button.set(Level::Low);
    node.run_for(10);
    button.set(Level::High);
    node.run_for(10);
    button.set(Level::Low);
    node.run_for(10);

    let snapshot = node.snapshot();
    assert_eq!(snapshot.edges[0].emitted, 2);
    assert_eq!(snapshot.edges[0].dropped, 1);
    assert_eq!(snapshot.queue_depth, 2);
    // Only the heartbeat got out before the logger went to sleep.
    assert_eq!(serial.text(), "\n randomstring \n");
}

#[test]
fn heartbeat_waits_instead_of_dropping() {
    let serial = CaptureSerial::new();
    let config = NodeConfig::builder()
        .workloads(Vec::new())
        .edges(Vec::new())
        .queue_capacity(1)
        .heartbeat(HeartbeatConfig {
            interval: 1,
            ..HeartbeatConfig::default()
        })
        .logger(LoggerConfig {
            settle: 5,
            ..LoggerConfig::default()
        })
        .tick_pulse(false)
        .build();
    let mut node = Node::build(&config, peripherals(Vec::new(), &serial)).unwrap();

    for _ in 0..40 {
        node.run_for(3);
        let snapshot = node.snapshot();
        assert_eq!(
            snapshot.heartbeats,
            snapshot.forwarded + snapshot.queue_depth as u64
        );
    }
    let snapshot = node.snapshot();
    assert!(snapshot.forwarded >= 20);
    assert_eq!(node.queue().waiting_senders(), 1);
}

#[test]
fn tick_pin_pulses_every_tick() {
    let serial = CaptureSerial::new();
    let tick_pin = RecordingPin::new(1);
    let peripherals = Peripherals {
        inputs: vec![
            Box::new(SharedPin::new(0, Level::High)),
            Box::new(SharedPin::new(1, Level::High)),
        ],
        serial: Box::new(serial.clone()),
        tick_pin: Some(Box::new(tick_pin.clone())),
    };
    let mut node = Node::build(&NodeConfig::default(), peripherals).unwrap();

    node.run_for(10);

    assert_eq!(tick_pin.rising_edges(), 10);
    assert_eq!(tick_pin.writes().last(), Some(&Level::Low));
}

#[test]
fn input_count_must_match_configuration() {
    let serial = CaptureSerial::new();
    let inputs: Vec<Box<dyn InputPin>> = vec![Box::new(SharedPin::new(0, Level::High))];
    let result = Node::build(&pipeline_config(), peripherals(inputs, &serial));
    assert!(matches!(result, Err(NodeError::Config(_))));
}

#[test]
fn startup_fails_when_heap_is_exhausted() {
    let serial = CaptureSerial::new();
    let inputs: Vec<Box<dyn InputPin>> = vec![
        Box::new(SharedPin::new(0, Level::High)),
        Box::new(SharedPin::new(1, Level::High)),
    ];
    let config = NodeConfig::builder().heap_bytes(1_000).build();
    let result = Node::build(&config, peripherals(inputs, &serial));
    assert!(matches!(
        result,
        Err(NodeError::Kernel(KernelError::OutOfMemory { .. }))
    ));
}
