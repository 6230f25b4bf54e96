//! Binding table between matrix header pins and controller GPIO lines.
//!
//! The matrix has its own pin numbers (1-12 on a 5x7 part). The controller
//! addresses its lines differently, and on a Raspberry Pi there are two ways
//! to number them. `PinMapper` owns the binding table and the output backend
//! and is the only thing that writes levels.

use crate::error::MatrixError;
use crate::output::OutputDriver;
use crate::{LogicalPin, PhysicalPin};
use std::collections::BTreeMap;

/// How physical pin identifiers passed to [`PinMapper::bind`] are read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NumberingScheme {
    /// Broadcom GPIO numbers, used as controller lines unchanged.
    #[default]
    Bcm,
    /// Positions on the 40-pin header.
    Board,
}

/// BCM line behind each 40-pin header position. `None` marks power, ground
/// and the ID EEPROM pins.
const HEADER_TO_BCM: [Option<u8>; 40] = [
    None,     // 1  3V3
    None,     // 2  5V
    Some(2),  // 3
    None,     // 4  5V
    Some(3),  // 5
    None,     // 6  GND
    Some(4),  // 7
    Some(14), // 8
    None,     // 9  GND
    Some(15), // 10
    Some(17), // 11
    Some(18), // 12
    Some(27), // 13
    None,     // 14 GND
    Some(22), // 15
    Some(23), // 16
    None,     // 17 3V3
    Some(24), // 18
    Some(10), // 19
    None,     // 20 GND
    Some(9),  // 21
    Some(25), // 22
    Some(11), // 23
    Some(8),  // 24
    None,     // 25 GND
    Some(7),  // 26
    None,     // 27 ID_SD
    None,     // 28 ID_SC
    Some(5),  // 29
    None,     // 30 GND
    Some(6),  // 31
    Some(12), // 32
    Some(13), // 33
    None,     // 34 GND
    Some(19), // 35
    Some(16), // 36
    Some(26), // 37
    Some(20), // 38
    None,     // 39 GND
    Some(21), // 40
];

impl NumberingScheme {
    /// Controller line for a physical pin identifier under this scheme.
    pub fn to_line(self, pin: PhysicalPin) -> Option<PhysicalPin> {
        match self {
            Self::Bcm => Some(pin),
            Self::Board => {
                let index = usize::from(pin).checked_sub(1)?;
                HEADER_TO_BCM.get(index).copied().flatten()
            }
        }
    }
}

pub struct PinMapper<O> {
    scheme: NumberingScheme,
    bindings: BTreeMap<LogicalPin, PhysicalPin>,
    output: O,
}

impl<O: OutputDriver> PinMapper<O> {
    pub fn new(output: O, scheme: NumberingScheme) -> Self {
        Self {
            scheme,
            bindings: BTreeMap::new(),
            output,
        }
    }

    pub fn scheme(&self) -> NumberingScheme {
        self.scheme
    }

    /// Bind a matrix pin to a physical pin and configure it as an output.
    ///
    /// Rebinding a matrix pin replaces its previous line. The old line is
    /// driven low unless another matrix pin still uses it; the driver only
    /// ever blanks lines that are bound.
    pub fn bind(&mut self, logical: LogicalPin, physical: PhysicalPin) -> Result<(), MatrixError> {
        let line = self
            .scheme
            .to_line(physical)
            .ok_or_else(|| MatrixError::UnboundHardware {
                pin: physical,
                source: format!("{physical} is not a GPIO pin in {:?} numbering", self.scheme)
                    .into(),
            })?;

        self.output
            .configure_output(line)
            .map_err(|e| MatrixError::UnboundHardware {
                pin: physical,
                source: Box::new(e),
            })?;

        tracing::debug!(logical, physical, line, "bound matrix pin");
        let previous = self.bindings.insert(logical, line);
        if let Some(old) = previous.filter(|&old| old != line) {
            if !self.bindings.values().any(|&bound| bound == old) {
                tracing::debug!(logical, old, "releasing previous line");
                self.output
                    .write_outputs(&[old], false)
                    .map_err(|e| MatrixError::Write {
                        source: Box::new(e),
                    })?;
            }
        }
        Ok(())
    }

    /// Controller line bound to `logical`.
    pub fn line(&self, logical: LogicalPin) -> Option<PhysicalPin> {
        self.bindings.get(&logical).copied()
    }

    /// Matrix pins with a binding, in ascending order.
    pub fn bound_pins(&self) -> Vec<LogicalPin> {
        self.bindings.keys().copied().collect()
    }

    /// Resolve every matrix pin to its line, failing on the first unbound one.
    pub fn resolve(&self, logical: &[LogicalPin]) -> Result<Vec<PhysicalPin>, MatrixError> {
        logical
            .iter()
            .map(|&pin| self.line(pin).ok_or(MatrixError::UnknownLogicalPin(pin)))
            .collect()
    }

    /// Drive the lines behind `logical` to one level in a single bulk write.
    ///
    /// All pins are resolved before the backend is called, so an unbound pin
    /// leaves the hardware untouched.
    pub fn set_levels(&mut self, logical: &[LogicalPin], high: bool) -> Result<(), MatrixError> {
        let lines = self.resolve(logical)?;
        if lines.is_empty() {
            return Ok(());
        }
        tracing::trace!(?logical, ?lines, high, "writing levels");
        self.output
            .write_outputs(&lines, high)
            .map_err(|e| MatrixError::Write {
                source: Box::new(e),
            })
    }

    /// Drive every bound line low.
    pub fn blank(&mut self) -> Result<(), MatrixError> {
        let lines: Vec<PhysicalPin> = self.bindings.values().copied().collect();
        if lines.is_empty() {
            return Ok(());
        }
        self.output
            .write_outputs(&lines, false)
            .map_err(|e| MatrixError::Write {
                source: Box::new(e),
            })
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }
}
