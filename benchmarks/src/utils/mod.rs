//! Timing and number formatting helpers

use std::fmt;
use std::time::{Duration, Instant};

/// Wall-clock stopwatch around a whole phase
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_nanos() as f64 / 1_000_000.0
    }
}

/// Human readable numbers for reports
pub mod format {
    use super::fmt;

    /// Milliseconds with at most three decimals and no trailing zeros
    pub struct Millis(pub f64);

    impl fmt::Display for Millis {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let rounded = format!("{:.3}", self.0);
            let trimmed = if rounded.contains('.') {
                rounded.trim_end_matches('0').trim_end_matches('.')
            } else {
                rounded.as_str()
            };
            // "-0" can appear after rounding tiny negative values
            if trimmed == "-0" {
                f.write_str("0")
            } else {
                f.write_str(trimmed)
            }
        }
    }

    /// Items per millisecond with one decimal, `∞` when unbounded
    pub struct Rate(pub Option<f64>);

    impl fmt::Display for Rate {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.0 {
                Some(rate) => write!(f, "{:.1}", rate),
                None => f.write_str("∞"),
            }
        }
    }
}
