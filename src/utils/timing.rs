//! Per-instance timing counters.
//!
//! Each invertible operator owns its own `Timings`. Aggregating across instances is an explicit
//! reduction by the caller, e.g. `ops.iter().map(|op| op.report_time()).sum::<Timings>()`.

use std::ops::{Add, AddAssign};
use std::time::{Duration, Instant};

/// Time spent in setup, in invert, and in field/vector packing.
///
/// `packing` is also counted inside `invert` whenever it happens during a solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    pub setup: Duration,
    pub invert: Duration,
    pub packing: Duration,
}

/// Which accumulator a measurement goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Invert,
    Packing,
}

impl Timings {
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        match phase {
            Phase::Setup => self.setup += elapsed,
            Phase::Invert => self.invert += elapsed,
            Phase::Packing => self.packing += elapsed,
        }
    }

    /// Return the accumulated times and reset every counter to zero.
    pub fn take(&mut self) -> Timings {
        std::mem::take(self)
    }
}

impl Add for Timings {
    type Output = Timings;
    fn add(self, rhs: Timings) -> Timings {
        Timings {
            setup: self.setup + rhs.setup,
            invert: self.invert + rhs.invert,
            packing: self.packing + rhs.packing,
        }
    }
}

impl AddAssign for Timings {
    fn add_assign(&mut self, rhs: Timings) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Timings {
    fn sum<I: Iterator<Item = Timings>>(iter: I) -> Timings {
        iter.fold(Timings::default(), Add::add)
    }
}

impl std::fmt::Display for Timings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Setup {:.6} , Invert(packing) {:.6}({:.6})",
            self.setup.as_secs_f64(),
            self.invert.as_secs_f64(),
            self.packing.as_secs_f64()
        )
    }
}

/// Measures from creation until `stop`.
pub struct Stopwatch {
    start: Instant,
    phase: Phase,
}

impl Stopwatch {
    pub fn start(phase: Phase) -> Self {
        Self { start: Instant::now(), phase }
    }

    pub fn stop(self, timings: &mut Timings) {
        timings.record(self.phase, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_resets() {
        let mut t = Timings::default();
        t.record(Phase::Setup, Duration::from_millis(3));
        t.record(Phase::Packing, Duration::from_millis(1));
        t.record(Phase::Packing, Duration::from_millis(1));
        let read = t.take();
        assert_eq!(read.setup, Duration::from_millis(3));
        assert_eq!(read.packing, Duration::from_millis(2));
        assert_eq!(t, Timings::default());
    }

    #[test]
    fn explicit_sum_over_instances() {
        let a = Timings { setup: Duration::from_secs(1), ..Default::default() };
        let b = Timings { invert: Duration::from_secs(2), ..Default::default() };
        let total: Timings = [a, b].into_iter().sum();
        assert_eq!(total.setup, Duration::from_secs(1));
        assert_eq!(total.invert, Duration::from_secs(2));
    }
}
