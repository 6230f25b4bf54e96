//! Adapter for boards that expose `embedded-hal` output pins.

use super::{OutputDriver, OutputError};
use crate::PhysicalPin;
use embedded_hal::digital::{Error as _, OutputPin, PinState};
use std::collections::{BTreeMap, BTreeSet};

/// Output lines backed by `embedded_hal::digital::OutputPin` implementations.
///
/// Pins are attached up front under the controller line number the pin
/// mapper will ask for. Configuring a line with no attached pin is rejected,
/// which surfaces as an unbound-hardware error at bind time.
pub struct HalOutputs<P> {
    pins: BTreeMap<PhysicalPin, P>,
    configured: BTreeSet<PhysicalPin>,
}

impl<P: OutputPin> HalOutputs<P> {
    pub fn new() -> Self {
        Self {
            pins: BTreeMap::new(),
            configured: BTreeSet::new(),
        }
    }

    /// Attach `pin` as controller line `line`.
    pub fn with_pin(mut self, line: PhysicalPin, pin: P) -> Self {
        self.pins.insert(line, pin);
        self
    }

    pub fn pin(&self, line: PhysicalPin) -> Option<&P> {
        self.pins.get(&line)
    }
}

impl<P: OutputPin> Default for HalOutputs<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> OutputDriver for HalOutputs<P> {
    type Error = OutputError;

    fn configure_output(&mut self, line: PhysicalPin) -> Result<(), OutputError> {
        let pin = self
            .pins
            .get_mut(&line)
            .ok_or(OutputError::Unavailable(line))?;
        pin.set_low().map_err(|e| OutputError::Pin {
            line,
            kind: e.kind(),
        })?;
        self.configured.insert(line);
        Ok(())
    }

    fn write_outputs(&mut self, lines: &[PhysicalPin], high: bool) -> Result<(), OutputError> {
        if let Some(&line) = lines.iter().find(|line| !self.configured.contains(line)) {
            return Err(OutputError::NotConfigured(line));
        }

        let state = PinState::from(high);
        for &line in lines {
            if let Some(pin) = self.pins.get_mut(&line) {
                pin.set_state(state).map_err(|e| OutputError::Pin {
                    line,
                    kind: e.kind(),
                })?;
            }
        }
        Ok(())
    }
}
