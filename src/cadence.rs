//! Refresh-rate gating for the host tick.
//!
//! The host calls [`CadenceController::tick`] as often as it likes (every
//! rendered frame, every loop iteration) with the time elapsed since the last
//! call. The controller answers whether a processing cycle is due.

/// Outcome of one host tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A processing cycle is due.
    Run,
    /// Not yet time for another cycle.
    Skip,
}

/// Accumulates elapsed time and releases at most one cycle per tick.
///
/// When a cycle is released exactly one interval is subtracted from the
/// accumulator, so the remainder carries into the next tick. A delayed tick
/// therefore leaves a backlog that later ticks work off one cycle at a time.
/// After a long pause (a suspended host, a debugger break) call
/// [`reset`](Self::reset), or every following tick runs until the backlog drains.
#[derive(Debug, Clone)]
pub struct CadenceController {
    /// Seconds between cycles; `None` when the controller is disabled.
    interval: Option<f64>,
    accumulated: f64,
}

impl CadenceController {
    /// Create a controller for the given refresh rate in Hz.
    ///
    /// A rate that is not strictly positive and finite disables the
    /// controller: it will never signal [`Tick::Run`].
    pub fn new(refresh_rate_hz: f64) -> Self {
        let interval = if refresh_rate_hz.is_finite() && refresh_rate_hz > 0.0 {
            Some(1.0 / refresh_rate_hz)
        } else {
            tracing::warn!(
                "Refresh rate {} Hz is not positive, cadence disabled",
                refresh_rate_hz
            );
            None
        };
        Self {
            interval,
            accumulated: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Seconds between cycles, if enabled.
    pub fn interval(&self) -> Option<f64> {
        self.interval
    }

    /// Time accumulated towards the next cycle.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Advance by `elapsed` seconds and report whether a cycle should run.
    pub fn tick(&mut self, elapsed: f64) -> Tick {
        let Some(interval) = self.interval else {
            return Tick::Skip;
        };

        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulated += elapsed;
        }

        if self.accumulated >= interval {
            self.accumulated -= interval;
            Tick::Run
        } else {
            Tick::Skip
        }
    }

    /// Drop any accumulated time.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_once_interval_elapsed() {
        let mut cadence = CadenceController::new(10.0);
        assert_eq!(cadence.tick(0.05), Tick::Skip);
        assert_eq!(cadence.tick(0.06), Tick::Run);
        // Remainder is kept, not reset to zero.
        assert!((cadence.accumulated() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn thirty_hz_with_twenty_ms_ticks() {
        let mut cadence = CadenceController::new(30.0);
        let interval = cadence.interval().unwrap();

        let mut runs = 0;
        let mut pattern = Vec::new();
        for _ in 0..1000 {
            let tick = cadence.tick(0.02);
            if tick == Tick::Run {
                runs += 1;
            }
            pattern.push(tick);
            assert!(cadence.accumulated() >= 0.0);
            assert!(cadence.accumulated() < interval + 1e-9);
        }

        // 1000 * 0.02 s at 30 Hz = 600 cycles.
        assert!((599..=600).contains(&runs), "runs = {}", runs);

        // One cycle per 1.5 ticks: a skip is always followed by a run.
        for window in pattern.windows(2) {
            assert!(!(window[0] == Tick::Skip && window[1] == Tick::Skip));
        }
    }

    #[test]
    fn at_most_one_run_per_tick_with_catch_up() {
        let mut cadence = CadenceController::new(10.0);
        // A stalled host delivers 0.35 s at once.
        assert_eq!(cadence.tick(0.35), Tick::Run);
        assert!((cadence.accumulated() - 0.25).abs() < 1e-9);

        // Backlog is worked off on following ticks even with no new time.
        assert_eq!(cadence.tick(0.0), Tick::Run);
        assert_eq!(cadence.tick(0.0), Tick::Run);
        assert_eq!(cadence.tick(0.0), Tick::Skip);
    }

    #[test]
    fn non_positive_rate_never_runs() {
        for rate in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let mut cadence = CadenceController::new(rate);
            assert!(!cadence.is_enabled());
            for _ in 0..100 {
                assert_eq!(cadence.tick(1.0), Tick::Skip);
            }
        }
    }

    #[test]
    fn ignores_negative_elapsed() {
        let mut cadence = CadenceController::new(10.0);
        cadence.tick(-5.0);
        cadence.tick(f64::NAN);
        assert_eq!(cadence.accumulated(), 0.0);
    }

    #[test]
    fn reset_clears_backlog() {
        let mut cadence = CadenceController::new(10.0);
        cadence.tick(0.09);
        cadence.reset();
        assert_eq!(cadence.tick(0.05), Tick::Skip);
    }

    #[test]
    fn stall_backlog_runs_every_tick_until_reset() {
        let mut cadence = CadenceController::new(30.0);
        assert_eq!(cadence.tick(3600.0), Tick::Run);
        for _ in 0..100 {
            assert_eq!(cadence.tick(0.0), Tick::Run);
        }
        assert!(cadence.accumulated() > 3500.0);

        cadence.reset();
        assert_eq!(cadence.tick(0.0), Tick::Skip);
        assert_eq!(cadence.tick(0.01), Tick::Skip);
    }
}
