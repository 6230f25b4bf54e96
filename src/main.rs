//! LED matrix multiplexer
//!
//! Wires matrix header pins to GPIO lines from the command line, then either
//! multiplexes a set of LEDs so they appear lit together, lights them one at
//! a time, or turns the matrix off. Ctrl+C stops a running display between
//! two LEDs and leaves every pin low.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/led-matrix-mux \
//!     --bind 1=17 --bind 3=18 --bind 11=23 --bind 12=22 \
//!     --rows 1,3 --cols 12,11 \
//!     show --pixel 0,0 --pixel 1,1 --refresh-hz 120
//! ```
//!
//! Without the `hardware` feature (or with `--simulate`) writes go to an
//! in-memory backend; run with `RUST_LOG=trace` to see them.

use clap::{Parser, Subcommand};
use led_matrix_mux::output::{OutputDriver, SimulatedOutput};
use led_matrix_mux::{
    Coordinate, DisplayFrame, MatrixDriver, MultiplexConfig, NumberingScheme, PinBinding,
    PinMapper, PinTopology, bind_all, setup_signal_handler,
};
use std::error::Error;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Drive a row/column LED matrix from GPIO lines
#[derive(Parser)]
#[command(name = "led-matrix-mux")]
#[command(about = "Multiplexed single-LED driver for row/column LED matrices")]
#[command(version)]
struct Args {
    /// How the GPIO side of --bind is numbered
    #[arg(long, value_enum, default_value_t = NumberingScheme::Bcm)]
    scheme: NumberingScheme,

    /// Wire a matrix pin to a GPIO pin (repeatable), e.g. --bind 12=22
    #[arg(long = "bind", value_name = "MATRIX=GPIO", required = true)]
    bindings: Vec<PinBinding>,

    /// Matrix pins driving rows, in x order
    #[arg(long, value_delimiter = ',', default_values_t = [1u8, 3, 10, 7, 8])]
    rows: Vec<u8>,

    /// Matrix pins driving columns, in y order
    #[arg(long, value_delimiter = ',', default_values_t = [12u8, 11, 2, 9, 4, 5, 6])]
    cols: Vec<u8>,

    /// Use the in-memory backend instead of real GPIO
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Multiplex LEDs so they appear lit at the same time
    Show {
        /// LED to light (repeatable), e.g. --pixel 0,0
        #[arg(long = "pixel", value_name = "X,Y", required = true)]
        pixels: Vec<Coordinate>,

        /// Full-frame refresh rate in Hz
        #[arg(long, default_value_t = MultiplexConfig::DEFAULT_REFRESH_HZ)]
        refresh_hz: f64,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        hold_secs: Option<f64>,
    },
    /// Light LEDs one after another, each on its own
    Sweep {
        /// LED to include (repeatable); defaults to every LED
        #[arg(long = "pixel", value_name = "X,Y")]
        pixels: Vec<Coordinate>,

        /// How long each LED stays lit
        #[arg(long, default_value_t = 200)]
        step_ms: u64,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        hold_secs: Option<f64>,
    },
    /// Turn every bound pin off
    Clear,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => {
            tracing::info!("Shutting down cleanly.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    tracing::info!("LED matrix multiplexer v{}", env!("CARGO_PKG_VERSION"));

    let topology = PinTopology::new(args.rows, args.cols)?;
    tracing::info!(
        "Matrix: {}x{}, {:?} numbering",
        topology.width(),
        topology.height(),
        args.scheme
    );

    let running = setup_signal_handler()?;

    if args.simulate {
        let mut mapper = PinMapper::new(SimulatedOutput::new(), args.scheme);
        return drive(&mut mapper, topology, &args.bindings, &args.command, &running);
    }
    run_on_gpio(args.scheme, topology, &args.bindings, &args.command, &running)
}

#[cfg(feature = "hardware")]
fn run_on_gpio(
    scheme: NumberingScheme,
    topology: PinTopology,
    bindings: &[PinBinding],
    command: &Command,
    running: &AtomicBool,
) -> Result<(), Box<dyn Error>> {
    let output = led_matrix_mux::output::GpioOutputs::new()?;
    let mut mapper = PinMapper::new(output, scheme);
    drive(&mut mapper, topology, bindings, command, running)
}

#[cfg(not(feature = "hardware"))]
fn run_on_gpio(
    scheme: NumberingScheme,
    topology: PinTopology,
    bindings: &[PinBinding],
    command: &Command,
    running: &AtomicBool,
) -> Result<(), Box<dyn Error>> {
    tracing::warn!("Built without the `hardware` feature, simulating GPIO");
    let mut mapper = PinMapper::new(SimulatedOutput::new(), scheme);
    drive(&mut mapper, topology, bindings, command, running)
}

fn drive<O: OutputDriver>(
    mapper: &mut PinMapper<O>,
    topology: PinTopology,
    bindings: &[PinBinding],
    command: &Command,
    running: &AtomicBool,
) -> Result<(), Box<dyn Error>> {
    bind_all(mapper, bindings)?;
    tracing::info!("Bound {} matrix pins", bindings.len());

    match command {
        Command::Show {
            pixels,
            refresh_hz,
            hold_secs,
        } => {
            let config = MultiplexConfig::new(*refresh_hz)?;
            let frame: DisplayFrame = pixels.iter().copied().collect();
            let hold = hold_duration(*hold_secs)?;
            MatrixDriver::new(topology, mapper)
                .with_config(config)
                .render_frame(&frame, hold, running)?;
        }
        Command::Sweep {
            pixels,
            step_ms,
            hold_secs,
        } => {
            let frame = if pixels.is_empty() {
                every_cell(&topology)
            } else {
                pixels.iter().copied().collect()
            };
            let hold = hold_duration(*hold_secs)?;
            MatrixDriver::new(topology, mapper).sweep(
                &frame,
                Duration::from_millis(*step_ms),
                hold,
                running,
            )?;
        }
        Command::Clear => {
            MatrixDriver::new(topology, mapper).clear()?;
        }
    }

    Ok(())
}

/// All cells, left to right then top to bottom.
fn every_cell(topology: &PinTopology) -> DisplayFrame {
    (0..topology.height())
        .flat_map(|y| (0..topology.width()).map(move |x| Coordinate::new(x, y)))
        .collect()
}

fn hold_duration(secs: Option<f64>) -> Result<Option<Duration>, Box<dyn Error>> {
    match secs {
        None => Ok(None),
        Some(s) => Duration::try_from_secs_f64(s)
            .map(Some)
            .map_err(|_| format!("invalid hold time: {s} seconds").into()),
    }
}
