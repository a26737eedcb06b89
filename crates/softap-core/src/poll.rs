//! Poll-with-timeout primitive and the injectable clock behind it.
//!
//! The controller has no event notification from the kernel or the
//! service manager; every synchronization point is a bounded poll with a
//! fixed interval. Modelling that as one primitive parameterized by
//! (interval, timeout, probe) keeps the timing testable: production code
//! uses [`SystemClock`], tests inject [`FakeClock`] and assert on the
//! recorded sleeps instead of waiting out real deadlines.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{ControlError, ControlResult};

/// Source of time and sleeps.
///
/// Implementations must be cheap to clone; the production clock is a
/// zero-sized type and the fake shares its state across clones.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock time and blocking sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Interval and deadline for one bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSpec {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Polls `probe` until it resolves or the deadline passes.
///
/// The probe is evaluated immediately, then once per interval. It returns
/// `None` to keep waiting, `Some(Ok(v))` to succeed, or `Some(Err(e))` to
/// fail early without exhausting the deadline (e.g. crash-on-start
/// detection). Deadline exhaustion yields [`ControlError::Timeout`]
/// labelled with `what`.
pub fn poll_until<C, T, F>(clock: &C, spec: PollSpec, what: &str, mut probe: F) -> ControlResult<T>
where
    C: Clock,
    F: FnMut() -> Option<ControlResult<T>>,
{
    let start = clock.now();
    let deadline = start + spec.timeout;

    loop {
        if let Some(outcome) = probe() {
            return outcome;
        }
        if clock.now() >= deadline {
            warn!(what, timeout = ?spec.timeout, "poll deadline exhausted");
            return Err(ControlError::Timeout {
                what: what.to_string(),
                waited: spec.timeout,
            });
        }
        clock.sleep(spec.interval);
    }
}

/// Deterministic clock for tests.
///
/// `sleep` advances virtual time instantly and records the requested
/// duration. Clones share state, so a clock handed to a component can be
/// inspected from the test afterwards.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Rc<RefCell<FakeClockInner>>,
}

#[derive(Debug)]
struct FakeClockInner {
    now: Instant,
    sleeps: Vec<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(FakeClockInner {
                now: Instant::now(),
                sleeps: Vec::new(),
            })),
        }
    }

    /// All sleep durations requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.borrow().sleeps.clone()
    }

    /// Total virtual time slept.
    pub fn total_slept(&self) -> Duration {
        self.inner.borrow().sleeps.iter().sum()
    }

    /// Forgets recorded sleeps without touching virtual time.
    pub fn clear_sleeps(&self) {
        self.inner.borrow_mut().sleeps.clear();
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.borrow().now
    }

    fn sleep(&self, duration: Duration) {
        let mut inner = self.inner.borrow_mut();
        inner.now += duration;
        inner.sleeps.push(duration);
    }
}
