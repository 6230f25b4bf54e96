//! Error type shared by the pin mapper and the matrix driver.
//!
//! Nothing in this crate retries. A failed write aborts the operation that
//! issued it and the error is handed straight back to the caller.

use crate::{Coordinate, LogicalPin, PhysicalPin};

/// Boxed error coming out of an output backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    /// A lighting or blanking call referenced a matrix pin with no binding.
    #[error("matrix pin {0} has no GPIO binding")]
    UnknownLogicalPin(LogicalPin),

    /// The output backend refused to configure a pin as an output.
    #[error("cannot configure pin {pin} as an output")]
    UnboundHardware {
        pin: PhysicalPin,
        #[source]
        source: BackendError,
    },

    /// The output backend failed while setting levels.
    #[error("failed to write output levels")]
    Write {
        #[source]
        source: BackendError,
    },

    #[error("invalid pin topology: {0}")]
    InvalidTopology(String),

    #[error("coordinate {coordinate} is outside the {width}x{height} matrix")]
    OutOfBounds {
        coordinate: Coordinate,
        width: usize,
        height: usize,
    },

    #[error("refresh rate must be a positive number of hertz, got {0}")]
    InvalidRefreshRate(f64),
}
