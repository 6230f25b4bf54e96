//! In-memory backend for tests and `--simulate` runs.

use super::{OutputDriver, OutputError};
use crate::PhysicalPin;
use std::collections::{BTreeMap, BTreeSet};

/// One bulk write as the backend received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    pub lines: Vec<PhysicalPin>,
    pub high: bool,
}

/// Records configured lines, their current levels and every write.
///
/// Failures can be injected to exercise error paths: a line can be marked as
/// unavailable, and writes can be made to fail after a number of successes.
#[derive(Debug, Default)]
pub struct SimulatedOutput {
    levels: BTreeMap<PhysicalPin, bool>,
    writes: Vec<WriteRecord>,
    unavailable: BTreeSet<PhysicalPin>,
    fail_after: Option<usize>,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `configure_output(line)` fail.
    pub fn with_unavailable(mut self, line: PhysicalPin) -> Self {
        self.unavailable.insert(line);
        self
    }

    /// Let `successes` writes through, then fail every write after that.
    pub fn fail_writes_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }

    pub fn is_configured(&self, line: PhysicalPin) -> bool {
        self.levels.contains_key(&line)
    }

    /// Current level of a configured line.
    pub fn level(&self, line: PhysicalPin) -> Option<bool> {
        self.levels.get(&line).copied()
    }

    /// Configured lines currently driven high, in ascending order.
    pub fn high_lines(&self) -> Vec<PhysicalPin> {
        self.levels
            .iter()
            .filter(|&(_, &high)| high)
            .map(|(&line, _)| line)
            .collect()
    }

    /// Every successful write since construction or the last `clear_log`.
    pub fn writes(&self) -> &[WriteRecord] {
        &self.writes
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
    }
}

impl OutputDriver for SimulatedOutput {
    type Error = OutputError;

    fn configure_output(&mut self, line: PhysicalPin) -> Result<(), OutputError> {
        if self.unavailable.contains(&line) {
            return Err(OutputError::Unavailable(line));
        }
        self.levels.entry(line).or_insert(false);
        Ok(())
    }

    fn write_outputs(&mut self, lines: &[PhysicalPin], high: bool) -> Result<(), OutputError> {
        if let Some(&line) = lines.iter().find(|line| !self.levels.contains_key(line)) {
            return Err(OutputError::NotConfigured(line));
        }
        if self.fail_after.is_some_and(|n| self.writes.len() >= n) {
            return Err(OutputError::Injected);
        }

        for line in lines {
            self.levels.insert(*line, high);
        }
        tracing::trace!(?lines, high, "simulated write");
        self.writes.push(WriteRecord {
            lines: lines.to_vec(),
            high,
        });
        Ok(())
    }
}
