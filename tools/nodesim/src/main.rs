use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use hal::sim::{RecordingPin, SharedPin, WriterSerial};
use hal::{InputPin, OutputPin};
use log::{error, info, warn};
use node::{Node, NodeConfig, NodeSnapshot, Peripherals};
use rtk::Tick;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the control node with stdout as its serial port")]
struct Opts {
    /// JSON node configuration; omitted fields keep their defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 1000)]
    ticks: Tick,

    /// Run until interrupted instead of for a fixed number of ticks.
    #[arg(long)]
    forever: bool,

    /// Wall-clock milliseconds per tick; ticks run back to back when omitted.
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Toggle an input at a given tick, e.g. `B1@120`. May be repeated.
    #[arg(long = "press", value_name = "SOURCE@TICK")]
    presses: Vec<Press>,

    #[arg(long)]
    no_summary: bool,
}

/// Scripted toggle of an edge detector's input.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Press {
    source: String,
    at: Tick,
}

impl FromStr for Press {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, at) = s
            .split_once('@')
            .ok_or_else(|| format!("expected SOURCE@TICK, got '{s}'"))?;
        if source.is_empty() {
            return Err(format!("missing source in '{s}'"));
        }
        let at = at
            .parse()
            .map_err(|err| format!("invalid tick in '{s}': {err}"))?;
        Ok(Self {
            source: source.to_string(),
            at,
        })
    }
}

struct Inputs {
    pins: Vec<(String, SharedPin)>,
}

impl Inputs {
    fn for_config(config: &NodeConfig) -> Self {
        let pins = config
            .edges
            .iter()
            .enumerate()
            .map(|(number, edge)| (edge.source.clone(), SharedPin::new(number as u32, hal::Level::High)))
            .collect();
        Self { pins }
    }

    fn boxed(&self) -> Vec<Box<dyn InputPin>> {
        self.pins
            .iter()
            .map(|(_, pin)| Box::new(pin.clone()) as Box<dyn InputPin>)
            .collect()
    }

    fn toggle(&self, source: &str) -> bool {
        match self.pins.iter().find(|(name, _)| name == source) {
            Some((_, pin)) => {
                pin.set(!pin.level());
                true
            }
            None => false,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run(Opts::parse()) {
        error!("{err:#}");
        eprintln!("{} {err:#}", "error:".red().bold());
        process::exit(1);
    }
}

fn run(opts: Opts) -> Result<()> {
    let config = load_config(opts.config.as_ref())?;
    let inputs = Inputs::for_config(&config);
    for press in &opts.presses {
        if !inputs.pins.iter().any(|(source, _)| *source == press.source) {
            bail!("no edge detector watches '{}'", press.source);
        }
    }

    let tick_pin = RecordingPin::new(config.edges.len() as u32);
    let peripherals = Peripherals {
        inputs: inputs.boxed(),
        serial: Box::new(WriterSerial::new(io::stdout())),
        // The recording pin keeps every write, so it is left out of endless runs.
        tick_pin: (!opts.forever).then(|| Box::new(tick_pin.clone()) as Box<dyn OutputPin>),
    };
    let mut node = Node::build(&config, peripherals).context("failed to start the node")?;
    info!(
        "node started: {} Hz, {} workloads, {} edge detectors",
        config.tick_rate_hz,
        config.workloads.len(),
        config.edges.len()
    );

    if opts.forever {
        if !opts.presses.is_empty() {
            warn!("--press is ignored with --forever");
        }
        ctrlc::set_handler(|| process::exit(0)).context("failed to install the Ctrl-C handler")?;
        let pace = Duration::from_millis(opts.tick_ms.unwrap_or(1));
        node.run_forever(Some(pace));
    }

    let pace = opts.tick_ms.map(Duration::from_millis);
    for _ in 0..opts.ticks {
        let now = node.now();
        for press in opts.presses.iter().filter(|press| press.at == now) {
            inputs.toggle(&press.source);
        }
        node.step_tick();
        if let Some(pace) = pace {
            thread::sleep(pace);
        }
    }
    node.flush();

    if !opts.no_summary {
        print_summary(&node.snapshot(), tick_pin.rising_edges());
        println!("{}", node.runtime_stats());
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<NodeConfig> {
    let Some(path) = path else {
        return Ok(NodeConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: NodeConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn print_summary(snapshot: &NodeSnapshot, tick_pulses: usize) {
    println!();
    println!("{}", format!("summary after {} ticks", snapshot.now).bold());
    for workload in &snapshot.workloads {
        let misses = if workload.misses == 0 {
            workload.misses.to_string().green()
        } else {
            workload.misses.to_string().red().bold()
        };
        println!(
            "  {} runtime {:>6}  busy {:>6}  misses {}",
            format!("{:<12}", workload.name).cyan(),
            workload.runtime,
            workload.busy_time,
            misses
        );
    }
    for edge in &snapshot.edges {
        let dropped = if edge.dropped == 0 {
            edge.dropped.to_string().normal()
        } else {
            edge.dropped.to_string().yellow()
        };
        println!(
            "  edge {} emitted {:>4}  dropped {}",
            format!("{:<7}", edge.source).cyan(),
            edge.emitted,
            dropped
        );
    }
    println!(
        "  heartbeats {}  forwarded {}  queued {}",
        snapshot.heartbeats, snapshot.forwarded, snapshot.queue_depth
    );
    println!("  cpu load {:.1}%  tick pulses {tick_pulses}", snapshot.cpu_load);
    if snapshot.serial_failures > 0 {
        println!(
            "  {} {}",
            "serial failures".red(),
            snapshot.serial_failures
        );
    }
}
