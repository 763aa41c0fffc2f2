mod board;

use std::{
    cell::RefCell,
    error::Error,
    io::{self, BufRead},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use board::SimulatedBoard;
use clap::Parser;
use embedded_hal::delay::DelayNs;
use flymouse_core::utils::{
    math::decode::Reading, BoardCommand, BoardController, Clock, FlymouseConfig, ManualTimer,
};
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON-lines file of board commands; stdin when omitted
    #[clap(long)]
    script: Option<PathBuf>,
    /// JSON board configuration
    #[clap(long)]
    config: Option<PathBuf>,
    /// advance a simulated clock instead of sleeping
    #[clap(long)]
    simulated_time: bool,
    /// number of handshake reads the board ignores before answering
    #[clap(long, default_value_t = 0)]
    failed_handshakes: u32,
    /// device ID printed on the banner
    #[clap(long)]
    device_id: Option<u32>,
}

/// Wall-clock timer for running against real time.
struct StdTimer {
    start: Instant,
}

impl Clock for StdTimer {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl DelayNs for StdTimer {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

#[derive(Serialize)]
struct Outcome<'a> {
    command: &'a BoardCommand,
    reading: Option<Reading>,
}

fn run<T: Clock + DelayNs>(
    bus: &RefCell<SimulatedBoard>,
    timer: T,
    config: FlymouseConfig,
    lines: impl Iterator<Item = String>,
) -> Result<(), Box<dyn Error>> {
    let mut ctrl = BoardController::new(bus, timer, config);

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: BoardCommand = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(error) => {
                error!(?error, line, "invalid board command");
                continue;
            }
        };
        let reading = ctrl.handle(command.clone());
        println!(
            "{}",
            serde_json::to_string(&Outcome {
                command: &command,
                reading,
            })?
        );
    }

    let board = bus.borrow();
    info!(
        motors = ?board.motors,
        encoders = ?board.encoders,
        leds = ?board.leds,
        fill_light = board.fill_light,
        display_lines = board.display.len(),
        "simulated board final state"
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => FlymouseConfig::default(),
    };
    if opts.device_id.is_some() {
        config.device_id = opts.device_id;
    }

    let lines: Box<dyn Iterator<Item = String>> = match &opts.script {
        Some(path) => {
            let script = std::fs::read_to_string(path)?;
            Box::new(script.lines().map(str::to_owned).collect::<Vec<_>>().into_iter())
        }
        None => Box::new(io::stdin().lock().lines().map_while(Result::ok)),
    };

    let bus = RefCell::new(SimulatedBoard::new(config.address, opts.failed_handshakes));

    info!("Starting Flymouse bottom board simulation");
    if opts.simulated_time {
        let timer = ManualTimer::new();
        run(&bus, &timer, config, lines)?;
        info!(elapsed_us = timer.now_us(), "simulated time elapsed");
    } else {
        run(
            &bus,
            StdTimer {
                start: Instant::now(),
            },
            config,
            lines,
        )?;
    }
    Ok(())
}
