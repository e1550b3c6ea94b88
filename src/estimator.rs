//! Dry-run sizing of a document load.
//!
//! The estimator is a [`LineVisitor`] over the same scan the builder uses, and it charges each
//! logical line exactly what [`Arena::allocate`] will charge for it. Loading a document can
//! therefore reserve one bulk block up front and fill it without opening further chunks.

use std::convert::Infallible;

use crate::arena::Arena;
use crate::document::Line;
use crate::scanner::{self, LineVisitor, ScannedLine};

/// Tallies the arena space a full load of a buffer needs.
#[derive(Debug, Default)]
pub struct MemoryEstimator {
    bytes: usize,
    lines: usize,
}

impl MemoryEstimator {
    #[must_use]
    /// Bytes of arena space accumulated so far.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    #[must_use]
    /// Logical lines counted so far.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

impl LineVisitor for MemoryEstimator {
    type Error = Infallible;

    fn visit_line(&mut self, line: ScannedLine<'_>) -> Result<(), Infallible> {
        self.bytes += Arena::<Line>::record_cost(line.bytes.len());
        self.lines += 1;
        Ok(())
    }
}

/// Scans `input` without storing anything and returns the estimator's tally.
#[must_use]
pub fn estimate(input: &[u8]) -> MemoryEstimator {
    let mut estimator = MemoryEstimator::default();
    let Ok(()) = scanner::scan(input, &mut estimator);
    estimator
}

#[cfg(test)]
#[path = "tests/estimator.rs"]
mod tests;
