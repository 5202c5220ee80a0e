use std::time::Duration;

use log::{debug, trace};

use crate::driver::Driver;
use crate::error::{PageError, PageResult};
use crate::query::{ElementPoller, ElementPollerTicker};

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Satisfied(T),
    TimedOut,
}

impl<T> Outcome<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::Satisfied(_))
    }
}

/// What a terminal does with a timed-out wait.
///
/// `wait_*` style calls raise, `is_*` style calls report `false`. Both run the same loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Raise,
    Falsy,
}

impl FailurePolicy {
    /// `Ok(Some(value))` when satisfied. On timeout either the error built by `on_timeout`
    /// or `Ok(None)`, depending on the policy.
    pub fn settle<T, F>(self, outcome: Outcome<T>, on_timeout: F) -> PageResult<Option<T>>
    where
        F: FnOnce() -> PageError,
    {
        match (outcome, self) {
            (Outcome::Satisfied(v), _) => Ok(Some(v)),
            (Outcome::TimedOut, FailurePolicy::Raise) => Err(on_timeout()),
            (Outcome::TimedOut, FailurePolicy::Falsy) => Ok(None),
        }
    }
}

/// The polling core shared by every explicit wait.
///
/// Each poll runs the condition against the driver. `Ok(Some(_))` ends the wait, `Ok(None)`
/// schedules another poll. Transient errors (stale handles, connection hiccups) count as an
/// unsatisfied poll; any other error aborts the wait and is returned as is.
#[derive(Debug, Clone)]
pub struct WaitEngine<'d> {
    driver: &'d dyn Driver,
    poller: ElementPoller,
}

impl<'d> WaitEngine<'d> {
    pub fn new(driver: &'d dyn Driver, poller: ElementPoller) -> Self {
        Self {
            driver,
            poller,
        }
    }

    pub fn poller(&self) -> &ElementPoller {
        &self.poller
    }

    pub fn poll<T, F>(&self, what: &str, mut condition: F) -> PageResult<Outcome<T>>
    where
        F: FnMut(&dyn Driver) -> PageResult<Option<T>>,
    {
        let mut ticker = ElementPollerTicker::new(self.poller.clone());
        loop {
            match condition(self.driver) {
                Ok(Some(value)) => {
                    debug!("{}: satisfied after {} poll(s)", what, ticker.tries() + 1);
                    return Ok(Outcome::Satisfied(value));
                }
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    trace!("{}: ignoring transient error: {}", what, e);
                }
                Err(e) => {
                    debug!("{}: aborted: {}", what, e);
                    return Err(e);
                }
            }

            if !ticker.tick() {
                debug!("{}: timed out after {:?}", what, ticker.elapsed());
                return Ok(Outcome::TimedOut);
            }
        }
    }
}

/// The message raised when a wait on `remark` times out.
pub(crate) fn timeout_message(remark: &str, status: &str, poller: &ElementPoller) -> String {
    match poller.timeout() {
        Some(t) => format!(
            "Waiting for element \"{}\" to become \"{}\" timed out after {} seconds.",
            remark,
            status,
            seconds(t)
        ),
        None => format!("Element \"{}\" did not become \"{}\".", remark, status),
    }
}

fn seconds(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{}", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use std::cell::Cell;

    fn quick() -> ElementPoller {
        ElementPoller::TimeoutWithInterval(Duration::from_millis(200), Duration::from_millis(10))
    }

    #[test]
    fn satisfied_on_third_poll() {
        let driver = MockDriver::new();
        let engine = WaitEngine::new(&driver, quick());
        let calls = Cell::new(0);
        let outcome = engine
            .poll("counter", |_| {
                calls.set(calls.get() + 1);
                Ok(if calls.get() == 3 { Some(calls.get()) } else { None })
            })
            .unwrap();
        assert_eq!(outcome, Outcome::Satisfied(3));
    }

    #[test]
    fn transient_errors_are_retried() {
        let driver = MockDriver::new();
        let engine = WaitEngine::new(&driver, quick());
        let calls = Cell::new(0);
        let outcome = engine
            .poll("flaky", |_| {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(PageError::StaleElement(String::from("re-rendered")))
                } else {
                    Ok(Some(()))
                }
            })
            .unwrap();
        assert!(outcome.is_satisfied());
    }

    #[test]
    fn fatal_errors_abort_immediately() {
        let driver = MockDriver::new();
        let engine = WaitEngine::new(&driver, quick());
        let calls = Cell::new(0);
        let result: PageResult<Outcome<()>> = engine.poll("fatal", |_| {
            calls.set(calls.get() + 1);
            Err(PageError::FatalDriver(String::from("session deleted")))
        });
        assert!(matches!(result, Err(PageError::FatalDriver(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn policies_differ_only_on_timeout() {
        let raised = FailurePolicy::Raise
            .settle(Outcome::<()>::TimedOut, || PageError::Timeout(String::from("late")));
        assert!(matches!(raised, Err(PageError::Timeout(_))));
        let falsy = FailurePolicy::Falsy
            .settle(Outcome::<()>::TimedOut, || PageError::Timeout(String::from("late")));
        assert!(matches!(falsy, Ok(None)));
        let ok = FailurePolicy::Falsy.settle(Outcome::Satisfied(1), || unreachable!());
        assert_eq!(ok.unwrap(), Some(1));
    }

    #[test]
    fn timeout_message_format() {
        let p = ElementPoller::TimeoutWithInterval(Duration::from_secs(3), Duration::from_millis(500));
        assert_eq!(
            timeout_message("save", "clickable", &p),
            "Waiting for element \"save\" to become \"clickable\" timed out after 3 seconds."
        );
        let p = ElementPoller::TimeoutWithInterval(Duration::from_millis(1500), Duration::from_millis(500));
        assert!(timeout_message("save", "visible", &p).ends_with("after 1.5 seconds."));
    }
}
