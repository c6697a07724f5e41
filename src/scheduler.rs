//! Per-tick scheduling of broadcast messages.
//!
//! A tick turns the current [`ToggleState`](crate::toggles::ToggleState) and
//! peer count into zero or more [`Signal`]s. In order:
//!
//! 1. No peers connected: nothing happens, not even counter updates.
//! 2. Every pending one-shot action is consumed and emitted, in the fixed
//!    order rickroll, sleep, notification.
//! 3. With `subtle` on and `pissoff` off, the suppression counter advances.
//!    Ticks 1 through `threshold` stop here; the next one resets the counter
//!    and continues.
//! 4. Each active probabilistic behavior emits with its configured chance,
//!    or always while `pissoff` is on.
//!
//! The scheduler holds configuration and a random source only. The state it
//! reads and mutates is borrowed from the [`Console`] for the duration of one
//! tick.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::broker::Broadcaster;
use crate::console::{Console, ConsoleEvent, ConsoleState};
use crate::protocol::Signal;
use crate::toggles::{Action, Behavior};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1000);
pub const DEFAULT_SUPPRESSION_THRESHOLD: u32 = 10;

/// Behaviors evaluated in step 4, in evaluation order.
const PROBABILISTIC: [Behavior; 3] = [Behavior::Wiggle, Behavior::Click, Behavior::Capitalize];

/// Source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource: Send {
    fn next(&mut self) -> f64;
}

/// Production random source backed by a `StdRng`.
pub struct ThreadRandom {
    rng: StdRng,
}

impl ThreadRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandom {
    fn next(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of values, then repeats `fallback` forever.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
    fallback: f64,
    drawn: usize,
}

impl ScriptedRandom {
    /// The default fallback (0.99) is above every chance below 1.0, so an
    /// exhausted script stops probabilistic emissions.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self::with_fallback(values, 0.99)
    }

    pub fn with_fallback(values: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback,
            drawn: 0,
        }
    }

    /// How many values have been requested so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl RandomSource for ScriptedRandom {
    fn next(&mut self) -> f64 {
        self.drawn += 1;
        self.values.pop_front().unwrap_or(self.fallback)
    }
}

/// Emission probability per probabilistic behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Chances {
    pub wiggle: f64,
    pub click: f64,
    pub capitalize: f64,
}

impl Default for Chances {
    fn default() -> Self {
        Self {
            wiggle: 0.4,
            click: 0.2,
            capitalize: 0.2,
        }
    }
}

impl Chances {
    pub fn for_behavior(&self, behavior: Behavior) -> f64 {
        match behavior {
            Behavior::Wiggle => self.wiggle,
            Behavior::Click => self.click,
            Behavior::Capitalize => self.capitalize,
            Behavior::Subtle | Behavior::Pissoff | Behavior::KeyboardShare => 0.0,
        }
    }
}

/// Timing and probability constants for the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub period: Duration,
    pub suppression_threshold: u32,
    pub chances: Chances,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_TICK_PERIOD,
            suppression_threshold: DEFAULT_SUPPRESSION_THRESHOLD,
            chances: Chances::default(),
        }
    }
}

/// Rate limiter for the probabilistic channel while subtle mode is on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionCounter {
    count: u32,
}

impl SuppressionCounter {
    pub fn value(&self) -> u32 {
        self.count
    }

    /// Count one qualifying tick. Returns true when this tick may proceed,
    /// which happens once the count exceeds `threshold`; the count then
    /// restarts from zero.
    pub fn advance(&mut self, threshold: u32) -> bool {
        self.count = self.count.saturating_add(1);
        if self.count <= threshold {
            return false;
        }
        self.count = 0;
        true
    }
}

/// How far a tick got through the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No peers connected; nothing was read or changed.
    NoPeers,
    /// Subtle mode held back the probabilistic step.
    Suppressed,
    /// All steps ran.
    Completed,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// One-shot actions consumed this tick, in firing order.
    pub consumed: Vec<Action>,
    /// Every signal to broadcast, one-shots first.
    pub signals: Vec<Signal>,
}

impl TickReport {
    fn idle() -> Self {
        Self {
            outcome: TickOutcome::NoPeers,
            consumed: Vec::new(),
            signals: Vec::new(),
        }
    }
}

pub struct TickScheduler {
    config: ScheduleConfig,
    rng: Box<dyn RandomSource>,
}

impl TickScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self::with_random(config, ThreadRandom::new())
    }

    pub fn with_random(config: ScheduleConfig, rng: impl RandomSource + 'static) -> Self {
        Self {
            config,
            rng: Box::new(rng),
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Decide this tick's signals and apply its state changes.
    ///
    /// Nothing is sent; see [`TickScheduler::tick`] for the full cycle.
    pub fn evaluate(&mut self, state: &mut ConsoleState) -> TickReport {
        if state.sessions.is_empty() {
            return TickReport::idle();
        }

        let mut report = TickReport {
            outcome: TickOutcome::Completed,
            consumed: Vec::new(),
            signals: Vec::new(),
        };

        for action in Action::ALL {
            if state.toggles.consume_if_pending(action) {
                report.consumed.push(action);
                report.signals.push(Signal::from(action));
            }
        }

        let pissoff = state.toggles.is_on(Behavior::Pissoff);
        if state.toggles.is_on(Behavior::Subtle)
            && !pissoff
            && !state.suppression.advance(self.config.suppression_threshold)
        {
            report.outcome = TickOutcome::Suppressed;
            return report;
        }

        for behavior in PROBABILISTIC {
            if !state.toggles.is_on(behavior) {
                continue;
            }
            let hit = pissoff || self.rng.next() < self.config.chances.for_behavior(behavior);
            if hit {
                if let Some(signal) = Signal::for_behavior(behavior) {
                    report.signals.push(signal);
                }
            }
        }

        report
    }

    /// Run one full tick: evaluate under the console lock, then broadcast.
    ///
    /// The lock is released before anything is sent. Each signal is an
    /// independent best-effort broadcast.
    pub fn tick(&mut self, console: &Console, out: &dyn Broadcaster) -> TickReport {
        let report = {
            let mut state = console.lock();
            self.evaluate(&mut state)
        };

        for signal in &report.signals {
            out.message(*signal);
        }

        if !report.consumed.is_empty() {
            console.notify(ConsoleEvent::Fired {
                signals: report.consumed.iter().copied().map(Signal::from).collect(),
            });
        }
        if !report.signals.is_empty() {
            tracing::debug!(outcome = ?report.outcome, signals = ?report.signals, "tick emitted");
        }
        report
    }
}
