//! Lamport logical clock.

/// Logical clock kept by each process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LamportClock(u64);

impl LamportClock {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    /// Advances the clock for a local event and returns the new value.
    ///
    /// Returns `None`, leaving the clock untouched, once it cannot advance any more.
    pub fn tick(&mut self) -> Option<u64> {
        self.0 = self.0.checked_add(1)?;
        Some(self.0)
    }

    /// Merges a timestamp seen on a remote message: `max(local, remote) + 1`.
    ///
    /// Returns `None`, leaving the clock untouched, when the result does not fit.
    pub fn observe(&mut self, remote: u64) -> Option<u64> {
        self.0 = self.0.max(remote).checked_add(1)?;
        Some(self.0)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
