// src/realtime.rs
//
// Deadline accounting for the audio-rate context.

use std::time::{Duration, Instant};

use log::warn;

/// Called when an audio block takes longer than its period.
///
/// The policy (mute, skip, escalate) belongs to the implementor; the engine
/// only reports.
pub trait OverrunHook: Send {
    fn on_overrun(&mut self, elapsed: Duration, budget: Duration);
}

/// Default hook: log a warning and carry on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOverrun;

impl OverrunHook for LogOverrun {
    fn on_overrun(&mut self, elapsed: Duration, budget: Duration) {
        warn!(
            "Audio block overran its deadline: {:?} (budget {:?})",
            elapsed, budget
        );
    }
}

/// Measures block processing time against the block period.
#[derive(Debug)]
pub struct DeadlineMonitor<H = LogOverrun> {
    budget: Duration,
    overruns: u64,
    hook: H,
}

impl DeadlineMonitor {
    pub fn new(budget: Duration) -> Self {
        Self::with_hook(budget, LogOverrun)
    }
}

impl<H: OverrunHook> DeadlineMonitor<H> {
    pub fn with_hook(budget: Duration, hook: H) -> Self {
        Self {
            budget,
            overruns: 0,
            hook,
        }
    }

    /// Swap the hook, keeping budget and counters.
    pub fn replace_hook<H2: OverrunHook>(self, hook: H2) -> DeadlineMonitor<H2> {
        DeadlineMonitor {
            budget: self.budget,
            overruns: self.overruns,
            hook,
        }
    }

    /// Run `block` and account for its duration.
    #[inline]
    pub fn measure<R>(&mut self, block: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = block();
        self.record(started.elapsed());
        result
    }

    /// Account for one block that took `elapsed`.
    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        if elapsed > self.budget {
            self.overruns += 1;
            self.hook.on_overrun(elapsed, self.budget);
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }
}
