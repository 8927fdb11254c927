//! Wall-clock timing for diagnostic operations.
//!
//! Every public detector returns its elapsed time in seconds alongside its
//! result; the timer also emits the measurement as a structured tracing
//! event so long runs are observable without changing the API.

use std::time::Instant;
use tracing::{debug, info};

/// Measures one diagnostic operation and logs its duration.
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing a named operation.
    pub fn start(name: &'static str) -> Self {
        debug!(target: "mesh_diagnostics::timing", operation = name, "starting operation");
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Elapsed wall-clock seconds since the timer started.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer, log the duration, and return elapsed seconds.
    pub fn finish(self) -> f64 {
        let elapsed = self.elapsed_secs();
        info!(
            target: "mesh_diagnostics::timing",
            operation = self.name,
            elapsed_secs = format!("{:.6}", elapsed),
            "operation completed"
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = OperationTimer::start("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let elapsed = timer.finish();
        assert!(elapsed >= 0.005);
    }
}
