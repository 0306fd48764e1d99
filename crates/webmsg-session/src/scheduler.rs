use std::collections::HashMap;
use std::time::Duration;

/// The timers a messenger owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Periodic keep-alive send.
    KeepAlive,
    /// One-shot reconnect after a fatal error.
    Restart,
}

/// Timer service injected into a messenger.
///
/// At most one timer of each kind is armed; arming again replaces it.
/// When a timer fires, the owner calls `Messenger::on_timer`.
pub trait Scheduler {
    /// Fire `kind` after `delay`, and every `delay` after that if `repeat`.
    fn arm(&mut self, kind: TimerKind, delay: Duration, repeat: bool);

    /// Disarm `kind`. No-op if it is not armed.
    fn cancel(&mut self, kind: TimerKind);
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    deadline: Duration,
    period: Option<Duration>,
}

/// Virtual-time scheduler; time only moves when told to.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    timers: HashMap<TimerKind, Armed>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// When `kind` fires next.
    pub fn deadline(&self, kind: TimerKind) -> Option<Duration> {
        self.timers.get(&kind).map(|armed| armed.deadline)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline. Repeating timers are re-armed one period later.
    pub fn pop_due(&mut self, until: Duration) -> Option<TimerKind> {
        let (kind, armed) = self
            .timers
            .iter()
            .filter(|(_, armed)| armed.deadline <= until)
            .min_by_key(|(kind, armed)| (armed.deadline, **kind))
            .map(|(kind, armed)| (*kind, *armed))?;

        self.now = self.now.max(armed.deadline);
        match armed.period {
            Some(period) => {
                self.timers.insert(
                    kind,
                    Armed {
                        deadline: armed.deadline + period,
                        period: Some(period),
                    },
                );
            }
            None => {
                self.timers.remove(&kind);
            }
        }
        Some(kind)
    }

    /// Move the clock forward to `until` without firing anything.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Advance by `by`, returning every timer that fired, in order.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerKind> {
        let until = self.now + by;
        let mut fired = Vec::new();
        while let Some(kind) = self.pop_due(until) {
            fired.push(kind);
        }
        self.settle(until);
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, kind: TimerKind, delay: Duration, repeat: bool) {
        // A zero period would fire forever without time passing.
        let period = (repeat && !delay.is_zero()).then_some(delay);
        self.timers.insert(
            kind,
            Armed {
                deadline: self.now + delay,
                period,
            },
        );
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.timers.remove(&kind);
    }
}
