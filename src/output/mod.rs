//! Output backends: the boundary between the matrix driver and real pins.
//!
//! A backend only needs two operations. It must configure a line as a digital
//! output, and it must drive a whole set of lines to one level in a single
//! call. The driver relies on that bulk write to avoid visible intermediate
//! states, so backends validate every line before touching any of them.

mod hal;
mod sim;

#[cfg(feature = "hardware")]
mod gpio;

pub use hal::HalOutputs;
pub use sim::{SimulatedOutput, WriteRecord};

#[cfg(feature = "hardware")]
pub use gpio::GpioOutputs;

use crate::PhysicalPin;

/// A set of digital output lines addressed by controller line number.
pub trait OutputDriver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Configure `line` as a digital output. Configuring a line twice is a no-op.
    fn configure_output(&mut self, line: PhysicalPin) -> Result<(), Self::Error>;

    /// Drive every line in `lines` to the same level.
    fn write_outputs(&mut self, lines: &[PhysicalPin], high: bool) -> Result<(), Self::Error>;
}

/// Errors raised by the backends in this crate.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("GPIO line {0} is not available on this controller")]
    Unavailable(PhysicalPin),

    #[error("GPIO line {0} was never configured as an output")]
    NotConfigured(PhysicalPin),

    #[error("GPIO line {line} failed: {kind:?}")]
    Pin {
        line: PhysicalPin,
        kind: embedded_hal::digital::ErrorKind,
    },

    #[error("simulated write failure")]
    Injected,

    #[cfg(feature = "hardware")]
    #[error(transparent)]
    Gpio(#[from] rppal::gpio::Error),
}
