//! Tests for KernelConfig builder and functionality.

use rtk::{Kernel, KernelConfig, Suspend, TaskConfig, TaskContext};

#[test]
fn kernel_config_builder() {
    let config = KernelConfig::builder()
        .name("TestKernel")
        .tick_rate_hz(100)
        .heap_bytes(8 * 1024)
        .stack_word_bytes(2)
        .tcb_bytes(64)
        .queue_overhead_bytes(16)
        .max_steps_per_tick(32)
        .idle_task("Idle", 64)
        .build();

    assert_eq!(config.name, "TestKernel");
    assert_eq!(config.tick_rate_hz, 100);
    assert_eq!(config.heap_bytes, 8 * 1024);
    assert_eq!(config.stack_word_bytes, 2);
    assert_eq!(config.tcb_bytes, 64);
    assert_eq!(config.queue_overhead_bytes, 16);
    assert_eq!(config.max_steps_per_tick, 32);
    assert_eq!(config.idle_name, "Idle");
    assert_eq!(config.idle_stack_words, 64);
}

#[test]
fn kernel_config_default() {
    let config = KernelConfig::default();

    assert_eq!(config.name, "rtk");
    assert_eq!(config.tick_rate_hz, 1000);
    assert_eq!(config.heap_bytes, 16 * 1024);
    assert_eq!(config.stack_word_bytes, 4);
    assert_eq!(config.idle_name, "IDLE");
}

#[test]
fn kernel_with_custom_config() {
    let config = KernelConfig::builder()
        .name("CustomKernel")
        .idle_task("Idle", 64)
        .build();

    let kernel = Kernel::with_config(config).build().unwrap();

    assert_eq!(kernel.config().name, "CustomKernel");
    assert!(kernel.find_task("Idle").is_some());
    assert_eq!(kernel.heap_free(), 16 * 1024 - (64 * 4 + 96));
}

#[test]
fn run_until_stops_at_requested_tick() {
    let mut builder = Kernel::builder();
    builder
        .spawn(TaskConfig::new("Sleeper", 1), |ctx: &mut TaskContext<'_>| ctx.delay(7))
        .unwrap();
    let mut kernel = builder.build().unwrap();

    assert!(!kernel.is_started());
    kernel.run_until(42);
    assert!(kernel.is_started());
    assert_eq!(kernel.now(), 42);

    kernel.run_until(10);
    assert_eq!(kernel.now(), 42);
}

#[test]
fn stats_table_lists_every_task() {
    let mut builder = Kernel::builder();
    builder
        .spawn(
            TaskConfig::new("Task1", 1).periodic(60).with_stack_words(120),
            |_ctx: &mut TaskContext<'_>| Suspend::Busy(1),
        )
        .unwrap();
    let mut kernel = builder.build().unwrap();
    kernel.run_for(10);

    let mut table = String::new();
    kernel.write_runtime_stats(&mut table).unwrap();

    assert!(table.contains("Task1"));
    assert!(table.contains("\t120\t"));
    assert!(table.contains("IDLE"));
    assert_eq!(kernel.runtime_stats().total, 10);
}
