use std::time::Duration;

/// Knobs for the interpreter and the loop that drives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Seed for CXNN's random numbers; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Log a trace record before every step.
    pub trace: bool,
    /// How long the driver sleeps after each step. Timers count down once
    /// per step, so this also sets how fast they run.
    pub cycle_delay: Duration,
    /// Stop the driver after this many steps.
    pub max_cycles: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            trace: false,
            cycle_delay: Duration::from_millis(2),
            max_cycles: None,
        }
    }
}
