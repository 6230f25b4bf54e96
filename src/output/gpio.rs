//! Raspberry Pi GPIO through `rppal`.
//!
//! Lines are BCM GPIO numbers. Board header numbering is translated by the
//! pin mapper before a line reaches this backend.

use super::{OutputDriver, OutputError};
use crate::PhysicalPin;
use rppal::gpio::{Gpio, OutputPin};
use std::collections::BTreeMap;

pub struct GpioOutputs {
    gpio: Gpio,
    pins: BTreeMap<PhysicalPin, OutputPin>,
}

impl GpioOutputs {
    /// Open the GPIO peripheral. Fails when not running on a Raspberry Pi or
    /// without access to `/dev/gpiomem`.
    pub fn new() -> Result<Self, OutputError> {
        Ok(Self {
            gpio: Gpio::new()?,
            pins: BTreeMap::new(),
        })
    }
}

impl OutputDriver for GpioOutputs {
    type Error = OutputError;

    fn configure_output(&mut self, line: PhysicalPin) -> Result<(), OutputError> {
        if self.pins.contains_key(&line) {
            return Ok(());
        }
        // Pins return to their previous mode when dropped.
        let mut pin = self.gpio.get(line)?.into_output_low();
        pin.set_reset_on_drop(true);
        self.pins.insert(line, pin);
        Ok(())
    }

    fn write_outputs(&mut self, lines: &[PhysicalPin], high: bool) -> Result<(), OutputError> {
        if let Some(&line) = lines.iter().find(|line| !self.pins.contains_key(line)) {
            return Err(OutputError::NotConfigured(line));
        }

        for line in lines {
            if let Some(pin) = self.pins.get_mut(line) {
                if high {
                    pin.set_high();
                } else {
                    pin.set_low();
                }
            }
        }
        Ok(())
    }
}
