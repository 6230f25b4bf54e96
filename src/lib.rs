//! Multiplexed driver for row/column LED matrices on plain GPIO lines.
//!
//! The matrix is driven one LED at a time. Several LEDs appear lit at once
//! because the driver cycles through them faster than the eye can follow.
//!
//! - [`mapper`]: binding table from matrix header pins to GPIO lines
//! - [`driver`]: pin topology, single-cell lighting and the refresh loop
//! - [`output`]: the GPIO backends (simulated, `embedded-hal`, Raspberry Pi)
//!
//! It also carries the small helpers the binary and demos share: signal
//! handling for clean shutdown and parsers for command-line values.

pub mod driver;
pub mod error;
pub mod mapper;
pub mod output;

pub use driver::{DisplayFrame, MatrixDriver, MultiplexConfig, PinTopology, RenderReport};
pub use error::MatrixError;
pub use mapper::{NumberingScheme, PinMapper};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pin number on the LED matrix header (1-12 on a 5x7 part).
pub type LogicalPin = u8;

/// Pin identifier on the controller, read according to a [`NumberingScheme`].
pub type PhysicalPin = u8;

// ── Coordinates ────────────────────────────────────────────────────

/// A cell of the matrix. `(0, 0)` is the top-left LED.
///
/// # Rust concept: value types
/// `Copy` plus `Eq`/`Ord` makes a coordinate behave like a plain number:
/// it is compared and copied by value and has no identity of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
}

impl Coordinate {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("expected X,Y but got {0:?}")]
pub struct ParseCoordinateError(String);

/// Parses `"x,y"`, e.g. `"0,3"`.
impl FromStr for Coordinate {
    type Err = ParseCoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCoordinateError(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(err)?;
        let x = x.trim().parse().map_err(|_| err())?;
        let y = y.trim().parse().map_err(|_| err())?;
        Ok(Self { x, y })
    }
}

// ── Bindings ───────────────────────────────────────────────────────

/// One matrix pin wired to one physical pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinBinding {
    pub logical: LogicalPin,
    pub physical: PhysicalPin,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("expected MATRIX_PIN=GPIO_PIN but got {0:?}")]
pub struct ParseBindingError(String);

/// Parses `"matrix=physical"`, e.g. `"12=22"`.
impl FromStr for PinBinding {
    type Err = ParseBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseBindingError(s.to_string());
        let (logical, physical) = s.split_once('=').ok_or_else(err)?;
        Ok(Self {
            logical: logical.trim().parse().map_err(|_| err())?,
            physical: physical.trim().parse().map_err(|_| err())?,
        })
    }
}

/// Bind every entry of `bindings`, stopping at the first failure.
pub fn bind_all<O: output::OutputDriver>(
    mapper: &mut PinMapper<O>,
    bindings: &[PinBinding],
) -> Result<(), MatrixError> {
    for binding in bindings {
        mapper.bind(binding.logical, binding.physical)?;
    }
    Ok(())
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// # Rust concept: Arc and AtomicBool
/// The signal handler runs on another thread, so the flag is shared through
/// an `Arc`. `AtomicBool` needs no mutex for a single bool. The render loop
/// reads it between cells and stops cleanly.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the render loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
